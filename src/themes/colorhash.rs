use egui::Color32;
use egui::Stroke;

/// A small, deterministic hash for turning span names into a stable palette
/// index. Not cryptographic.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 1469598103934665603;
    const PRIME: u64 = 1099511628211;

    pub fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut hash = self.0;
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(Self::PRIME);
        }
        self.0 = hash;
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hash64(bytes: &[u8]) -> u64 {
    let mut h = Fnv1a64::new();
    h.update(bytes);
    h.finish()
}

pub fn palette_index(hash: u64, palette_len: usize) -> usize {
    if palette_len == 0 {
        0
    } else {
        (hash % palette_len as u64) as usize
    }
}

pub const TONES_PER_PALETTE: usize = 5;

/// Five warm-to-cool families, each graded from saturated to pale so nested
/// frames of the same function stay distinguishable.
pub const PALETTES: [[Color32; TONES_PER_PALETTE]; 5] = [
    // oranges
    [
        Color32::from_rgb(0xff, 0x8e, 0x25),
        Color32::from_rgb(0xff, 0xaa, 0x25),
        Color32::from_rgb(0xff, 0xc5, 0x25),
        Color32::from_rgb(0xff, 0xe0, 0x25),
        Color32::from_rgb(0xea, 0xff, 0x25),
    ],
    // blues
    [
        Color32::from_rgb(0x25, 0x48, 0xff),
        Color32::from_rgb(0x25, 0x76, 0xff),
        Color32::from_rgb(0x25, 0xaa, 0xff),
        Color32::from_rgb(0x25, 0xd5, 0xff),
        Color32::from_rgb(0x25, 0xfa, 0xff),
    ],
    // reds
    [
        Color32::from_rgb(0xff, 0x25, 0x25),
        Color32::from_rgb(0xff, 0x54, 0x25),
        Color32::from_rgb(0xff, 0x8e, 0x25),
        Color32::from_rgb(0xff, 0xc5, 0x25),
        Color32::from_rgb(0xff, 0xe0, 0x25),
    ],
    // purples
    [
        Color32::from_rgb(0x5e, 0x25, 0xff),
        Color32::from_rgb(0x8e, 0x25, 0xff),
        Color32::from_rgb(0xbe, 0x25, 0xff),
        Color32::from_rgb(0xe0, 0x25, 0xff),
        Color32::from_rgb(0xf5, 0x25, 0xff),
    ],
    // greens
    [
        Color32::from_rgb(0x00, 0x8f, 0x39),
        Color32::from_rgb(0x25, 0xb3, 0x4b),
        Color32::from_rgb(0x4c, 0xd7, 0x5f),
        Color32::from_rgb(0x8a, 0xf5, 0x9a),
        Color32::from_rgb(0xc2, 0xff, 0xcc),
    ],
];

/// Fill color for a span: the name picks the palette, the depth picks the tone.
pub fn span_color(name: &str, depth: u32) -> Color32 {
    let palette = &PALETTES[palette_index(hash64(name.as_bytes()), PALETTES.len())];
    palette[depth as usize % TONES_PER_PALETTE]
}

pub fn luma(color: Color32) -> f32 {
    // Cheap, perceptual-ish luma in sRGB space.
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;
    0.299 * r + 0.587 * g + 0.114 * b
}

pub fn text_color_on(background: Color32) -> Color32 {
    if luma(background) > 0.55 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

/// Outline for the inspected span.
pub fn highlight_stroke(fill: Color32) -> Stroke {
    Stroke::new(2.0, text_color_on(fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(hash64(b""), 0xcbf29ce484222325);
        assert_eq!(hash64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn span_color_is_pure() {
        let first = span_color("foo", 2);
        for _ in 0..8 {
            assert_eq!(span_color("foo", 2), first);
        }
        assert_eq!(span_color("foo", 2), span_color("foo", 7));
    }

    #[test]
    fn depth_walks_the_tones() {
        let palette = PALETTES
            .iter()
            .position(|p| p[0] == span_color("main", 0))
            .unwrap();
        for depth in 0..TONES_PER_PALETTE as u32 {
            assert_eq!(span_color("main", depth), PALETTES[palette][depth as usize]);
        }
    }

    #[test]
    fn contrast_picks_dark_text_on_light_fill() {
        assert_eq!(text_color_on(Color32::from_rgb(0xff, 0xe0, 0x25)), Color32::BLACK);
        assert_eq!(text_color_on(Color32::from_rgb(0x25, 0x48, 0xff)), Color32::WHITE);
    }
}
