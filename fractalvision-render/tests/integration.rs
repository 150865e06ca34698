use std::sync::Arc;
use std::thread;

use fractalvision_core::{Complex, EscapeTimeEngine, FractalParams, ViewHistory, Viewport};
use fractalvision_render::{
    ColorScheme, Palette, RenderEvent, RenderPipeline, RenderQuality, RenderSettings,
    INTERIOR_COLOR,
};

#[test]
fn end_to_end_mandelbrot_render() {
    let pipeline = RenderPipeline::new(Viewport::with_size(200, 150).unwrap(), RenderSettings::default());

    let result = pipeline.refresh().unwrap().expect("idle pipeline renders");

    assert_eq!(result.buffer.width, 200);
    assert_eq!(result.buffer.height, 150);
    assert_eq!(result.buffer.pixels.len(), 200 * 150 * 4);
    assert!(result.interior_pixels > 0);

    let has_non_black = result
        .buffer
        .pixels
        .chunks_exact(4)
        .any(|px| px[0] > 0 || px[1] > 0 || px[2] > 0);
    assert!(has_non_black, "rendered image should contain non-black pixels");
}

#[test]
fn end_to_end_julia_render() {
    let engine = EscapeTimeEngine::julia(Complex::new(-0.7, 0.27015), FractalParams::default());
    let settings = RenderSettings {
        engine,
        palette: Palette::from_scheme(ColorScheme::Ocean),
        quality: RenderQuality::Standard,
    };
    let pipeline = RenderPipeline::new(Viewport::with_size(100, 100).unwrap(), settings);

    let result = pipeline.refresh().unwrap().unwrap();

    let black = result
        .buffer
        .pixels
        .chunks_exact(4)
        .filter(|px| *px == INTERIOR_COLOR)
        .count();
    assert_eq!(black, result.interior_pixels);
    assert!(black > 0 && black < 100 * 100);
}

#[test]
fn concurrent_requests_never_overlap() {
    let pipeline = Arc::new(RenderPipeline::new(
        Viewport::with_size(240, 180).unwrap(),
        RenderSettings::default(),
    ));
    let rx = pipeline.subscribe();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || pipeline.refresh().unwrap())
        })
        .collect();
    let published = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Option::is_some)
        .count();

    assert!(published >= 1);
    assert!(!pipeline.is_rendering());

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), published * 2);
    for pair in events.chunks(2) {
        assert_eq!(pair, [RenderEvent::Started, RenderEvent::Finished { published: true }]);
    }
}

#[test]
fn preview_then_standard() {
    let pipeline = RenderPipeline::new(Viewport::with_size(640, 480).unwrap(), RenderSettings::default());
    let rx = pipeline.subscribe();

    pipeline.set_quality(RenderQuality::Preview);
    let preview = pipeline.refresh().unwrap().unwrap();
    pipeline.set_quality(RenderQuality::Standard);
    let full = pipeline.refresh().unwrap().unwrap();

    assert_eq!((preview.buffer.width, preview.buffer.height), (400, 300));
    assert_eq!((full.buffer.width, full.buffer.height), (640, 480));
    assert!(Arc::ptr_eq(&pipeline.latest().unwrap(), &full));
    assert_eq!(rx.try_iter().count(), 4);
}

#[test]
fn navigation_with_history() {
    let pipeline = RenderPipeline::new(Viewport::with_size(80, 60).unwrap(), RenderSettings::default());
    let mut history = ViewHistory::new(&pipeline.viewport());

    pipeline.zoom_to_point(20, 15, 2.0).unwrap().unwrap();
    history.push_state(&pipeline.viewport());
    pipeline.zoom_to_point(60, 45, 3.0).unwrap().unwrap();
    history.push_state(&pipeline.viewport());
    assert_eq!(history.undo_len(), 2);

    let back = history.undo();
    pipeline.set_viewport(&back);
    let frame = pipeline.refresh().unwrap().unwrap();
    assert_eq!(frame.viewport, back);
    assert!((frame.viewport.zoom() - 2.0).abs() < 1e-12);

    pipeline.reset_view().unwrap().unwrap();
    assert_eq!(pipeline.viewport().zoom(), 1.0);
}
