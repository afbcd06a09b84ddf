//! PNG snapshots of a flame graph, rendered offscreen through `egui-wgpu`.

use std::path::{Path, PathBuf};

use egui_wgpu::wgpu;

use crate::error::{Result, TimelineError};
use crate::graph::FlameGraph;
use crate::themes;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const BYTES_PER_PIXEL: u32 = 4;

#[derive(Clone, Debug)]
pub struct CaptureOptions {
    pub output: PathBuf,
    /// Logical size of the capture.
    pub size: egui::Vec2,
    pub pixels_per_point: f32,
    /// Frames to run before reading back, so passes scheduled by the first
    /// frame land in the image.
    pub frames: usize,
}

impl CaptureOptions {
    pub fn new(output: impl Into<PathBuf>, size: egui::Vec2) -> Self {
        Self {
            output: output.into(),
            size,
            pixels_per_point: 1.0,
            frames: 3,
        }
    }
}

fn headless_error(err: impl std::fmt::Display) -> TimelineError {
    TimelineError::Headless(err.to_string())
}

/// Renders `graph` offscreen and writes the last frame to `options.output`.
/// The image has the surface's physical size.
pub fn capture_png(graph: &mut FlameGraph, options: &CaptureOptions) -> Result<()> {
    let _span = tracing::info_span!("headless_capture", output = %options.output.display()).entered();
    let ctx = egui::Context::default();
    themes::install(&ctx);
    graph.start_passes()?;

    let output = run_frames(&ctx, graph, options);
    let [width, height] = graph.surface().physical_size();
    let (width, height) = (width.max(1), height.max(1));
    let pixels = Gpu::open()?.render(&ctx, output, width, height)?;
    write_png(&options.output, width, height, &pixels)?;
    log::info!(
        "captured {width}x{height} flame graph to {}",
        options.output.display()
    );
    Ok(())
}

/// The last frame's output, carrying the texture updates of every frame.
fn run_frames(ctx: &egui::Context, graph: &mut FlameGraph, options: &CaptureOptions) -> egui::FullOutput {
    let screen = egui::Rect::from_min_size(egui::Pos2::ZERO, options.size);
    let mut textures = egui::TexturesDelta::default();
    let mut output = egui::FullOutput::default();
    for frame in 0..options.frames.max(1) {
        let mut input = egui::RawInput {
            screen_rect: Some(screen),
            time: Some(frame as f64 / 60.0),
            ..Default::default()
        };
        input
            .viewports
            .entry(input.viewport_id)
            .or_default()
            .native_pixels_per_point = Some(options.pixels_per_point);

        output = ctx.run(input, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    graph.show(ui);
                });
        });
        textures.append(std::mem::take(&mut output.textures_delta));
    }
    output.textures_delta = textures;
    output
}

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Gpu {
    fn open() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .map_err(|err| headless_error(format!("no GPU adapter: {err}")))?;
        log::debug!("capturing on {}", adapter.get_info().name);
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("hermes_flame_capture"),
            ..Default::default()
        }))
        .map_err(headless_error)?;
        Ok(Self { device, queue })
    }

    /// Tightly packed RGBA rows of the rendered frame.
    fn render(
        &self,
        ctx: &egui::Context,
        output: egui::FullOutput,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hermes_flame_capture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let stride = padded_stride(width);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hermes_flame_readback"),
            size: u64::from(stride) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut renderer =
            egui_wgpu::Renderer::new(&self.device, FORMAT, egui_wgpu::RendererOptions::default());
        for (id, delta) in &output.textures_delta.set {
            renderer.update_texture(&self.device, &self.queue, *id, delta);
        }
        let primitives = ctx.tessellate(output.shapes, output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: output.pixels_per_point,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("hermes_flame_capture"),
            });
        let mut commands =
            renderer.update_buffers(&self.device, &self.queue, &mut encoder, &primitives, &screen);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("hermes_flame_capture"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear_color(themes::SURFACE_BACKGROUND)),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            renderer.render(&mut pass, &primitives, &screen);
        }
        encoder.copy_texture_to_buffer(
            target.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(stride),
                    rows_per_image: Some(height),
                },
            },
            target.size(),
        );
        commands.push(encoder.finish());
        self.queue.submit(commands);

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |mapped| {
            let _ = sender.send(mapped);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(headless_error)?;
        receiver
            .recv()
            .map_err(headless_error)?
            .map_err(headless_error)?;
        let pixels = unpad_rows(&slice.get_mapped_range(), width * BYTES_PER_PIXEL, stride);
        readback.unmap();
        Ok(pixels)
    }
}

/// Readback row length. Texture-to-buffer copies need aligned rows.
fn padded_stride(width: u32) -> u32 {
    (width * BYTES_PER_PIXEL).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

fn unpad_rows(data: &[u8], row: u32, stride: u32) -> Vec<u8> {
    data.chunks_exact(stride as usize)
        .flat_map(|line| &line[..row as usize])
        .copied()
        .collect()
}

fn write_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|err| TimelineError::io(path, err))?;
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .write_header()
        .and_then(|mut writer| writer.write_image_data(rgba))
        .map_err(headless_error)
}

fn clear_color(color: egui::Color32) -> wgpu::Color {
    let [r, g, b, a] = color.to_normalized_gamma_f32();
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FollowMode;
    use crate::span::Span;
    use crate::time::TraceTime;

    fn temp_png(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hermes-flame-{}-{name}.png", std::process::id()))
    }

    #[test]
    fn readback_rows_are_aligned_then_stripped() {
        let stride = padded_stride(3);
        assert_eq!(stride, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let mut data = vec![0u8; stride as usize * 2];
        data[..12].fill(1);
        data[stride as usize..stride as usize + 12].fill(2);
        let rows = unpad_rows(&data, 12, stride);
        assert_eq!(rows.len(), 24);
        assert!(rows[..12].iter().all(|b| *b == 1));
        assert!(rows[12..].iter().all(|b| *b == 2));
    }

    #[test]
    fn png_has_signature() {
        let path = temp_png("signature");
        write_png(&path, 2, 1, &[255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn capture_writes_png_or_reports_missing_gpu() {
        let mut graph = FlameGraph::default();
        graph.set_mode(FollowMode::Manual);
        graph.extend([
            Span::new(1, 0, TraceTime(0), TraceTime(1_000), 0, "main"),
            Span::new(2, 1, TraceTime(200), TraceTime(700), 1, "irq"),
        ]);
        let path = temp_png("capture");
        let options = CaptureOptions {
            pixels_per_point: 2.0,
            ..CaptureOptions::new(&path, egui::vec2(320.0, 480.0))
        };
        match capture_png(&mut graph, &options) {
            Ok(()) => {
                let bytes = std::fs::read(&path).unwrap();
                assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
                std::fs::remove_file(&path).unwrap();
            }
            // CI machines without any adapter.
            Err(TimelineError::Headless(message)) => assert!(!message.is_empty()),
            Err(other) => panic!("unexpected capture error: {other}"),
        }
        assert_eq!(graph.surface().physical_size(), [640, 960]);
        assert_eq!(graph.index().len(), 2);
    }
}
