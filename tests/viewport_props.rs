use proptest::prelude::*;

use hermes_flame::{TraceDuration, TraceTime, Viewport};

const LEFT_MARGIN: f32 = 40.0;
const USABLE: f64 = 800.0;

fn viewport(offset: i64, zoom: f64) -> Viewport {
    let mut viewport = Viewport::new(0.00001, 100.0, LEFT_MARGIN);
    viewport.set_offset(TraceTime(offset));
    viewport.set_zoom(zoom);
    viewport
}

proptest! {
    #[test]
    fn pixel_round_trip_stays_within_one_unit(
        offset in 0i64..(1i64 << 62),
        zoom in 0.001f64..100.0,
        delta in -1_000_000i64..1_000_000,
    ) {
        let viewport = viewport(offset, zoom);
        let t = TraceTime(offset) + TraceDuration(delta);
        let back = viewport.pixel_to_time(viewport.time_to_pixel(t));
        prop_assert!((back - t).units().abs() <= 1, "{t} came back as {back}");
    }

    #[test]
    fn zoom_keeps_the_anchor_pixel(
        offset in 0i64..(1i64 << 62),
        zoom in 0.001f64..50.0,
        anchor_px in 0.0f64..USABLE,
        factor in prop_oneof![Just(1.2f64), Just(1.0 / 1.2), 0.5f64..2.0],
        steps in 1usize..20,
    ) {
        let mut viewport = viewport(offset, zoom);
        let anchor = viewport.pixel_to_time(anchor_px + f64::from(LEFT_MARGIN));
        let before = viewport.time_to_pixel(anchor);
        for _ in 0..steps {
            viewport.zoom_by(factor, anchor);
        }
        let after = viewport.time_to_pixel(anchor);
        prop_assert!((before - after).abs() < 1.0, "anchor drifted from {before} to {after}");
    }
}
