use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use hermes_flame::headless::{self, CaptureOptions};
use hermes_flame::replay::{self, ReplayHandle};
use hermes_flame::time::format_duration;
use hermes_flame::{themes, FlameGraph, FollowMode, SpanFeed, TimelineConfig};

const CONFIG_ENV: &str = "HERMES_FLAME_CONFIG";

/// Flame-graph viewer for recorded execution traces.
#[derive(Parser, Debug)]
#[command(name = "hermes-flame", version)]
struct Cli {
    /// JSON-lines trace file.
    trace: PathBuf,

    /// TOML configuration. Falls back to $HERMES_FLAME_CONFIG.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Stream the trace with its recorded timing instead of loading it at once.
    #[arg(long)]
    live: bool,

    /// Replay speed factor for --live. 0 streams without delays.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Render one frame offscreen to this PNG and exit.
    #[arg(long, value_name = "PNG")]
    capture: Option<PathBuf>,

    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    #[arg(long, default_value_t = 600.0)]
    height: f32,

    /// Pixel density for --capture.
    #[arg(long, default_value_t = 1.0)]
    pixels_per_point: f32,
}

impl Cli {
    fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }
}

struct Viewer {
    graph: FlameGraph,
    replay: Option<ReplayHandle>,
}

impl Viewer {
    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let current = self.graph.core_filter();
            let mut selected = current;
            egui::ComboBox::from_label("Cores")
                .selected_text(current.to_string())
                .show_ui(ui, |ui| {
                    for option in self.graph.core_options() {
                        ui.selectable_value(&mut selected, option, option.to_string());
                    }
                });
            if selected != current {
                self.graph.set_core_filter(selected);
            }

            ui.separator();
            let mode = match self.graph.mode() {
                FollowMode::Auto => "following",
                FollowMode::Manual => "manual",
            };
            ui.label(format!("{} spans, {mode}", self.graph.spans().len()));
            if self.graph.is_connected() {
                ui.label("streaming");
            }
        });
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let response = self.graph.show(ui);
                if let Some(span) = self.graph.inspected().cloned() {
                    let units = self.graph.config().units_per_second;
                    response.on_hover_ui_at_pointer(|ui| {
                        ui.strong(span.display_name());
                        ui.label(format!("core {}, depth {}", span.core_id, span.depth));
                        ui.label(format!("start {}", span.start_time));
                        ui.label(format!("end {}", span.end_time));
                        ui.label(format!("duration {}", format_duration(span.duration(), units)));
                    });
                }
            });

        // Nothing else wakes the UI while the replay thread is between spans.
        if self.replay.as_ref().is_some_and(|replay| !replay.is_finished()) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match cli.config_path() {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig::default(),
    };
    let units_per_second = config.units_per_second;
    let spans = replay::load(&cli.trace)?;

    if let Some(output) = &cli.capture {
        let mut graph = FlameGraph::new(config)?;
        graph.set_mode(FollowMode::Manual);
        graph.extend(spans);
        let options = CaptureOptions {
            pixels_per_point: cli.pixels_per_point,
            ..CaptureOptions::new(output, egui::vec2(cli.width, cli.height))
        };
        headless::capture_png(&mut graph, &options)?;
        return Ok(());
    }

    let viewer = if cli.live {
        let feed = SpanFeed::new();
        let graph = FlameGraph::new(config)?.with_feed(feed.clone());
        let replay = replay::spawn(spans, feed, cli.speed, units_per_second)?;
        Viewer {
            graph,
            replay: Some(replay),
        }
    } else {
        let mut graph = FlameGraph::new(config)?;
        graph.set_mode(FollowMode::Manual);
        graph.extend(spans);
        Viewer {
            graph,
            replay: None,
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Hermes flame graph")
            .with_inner_size([cli.width, cli.height]),
        ..Default::default()
    };
    eframe::run_native(
        "hermes-flame",
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            if let Err(err) =
                ctrlc::set_handler(move || ctx.send_viewport_cmd(egui::ViewportCommand::Close))
            {
                log::warn!("failed to set exit signal handler: {err}");
            }
            themes::install(&cc.egui_ctx);
            Ok(Box::new(viewer))
        }),
    )?;
    Ok(())
}
