use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use fractalvision_core::{Complex, EscapeTimeEngine, PixelRect, Viewport};

use crate::palette::Palette;
use crate::renderer::{self, RenderQuality, RenderResult};
use crate::RenderError;

// ---------------------------------------------------------------------------
// Messages & settings
// ---------------------------------------------------------------------------

/// Whether a render pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Rendering,
}

/// Lifecycle notification, sent after the corresponding phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    Started,
    /// `published` is false when the compute phase failed.
    Finished { published: bool },
}

/// Everything besides the viewport that shapes a frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub engine: EscapeTimeEngine,
    pub palette: Palette,
    pub quality: RenderQuality,
}

/// Result of a render request: `None` when the request was dropped because
/// another pass was already running.
pub type RenderOutcome = crate::Result<Option<Arc<RenderResult>>>;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Owns the live viewport and settings and serializes render passes.
///
/// At most one pass runs at a time. A request that arrives while a pass is in
/// flight is dropped, not queued. Every pass that starts sends exactly one
/// [`RenderEvent::Started`] and one [`RenderEvent::Finished`], in that order,
/// and the pipeline is back to [`RenderPhase::Idle`] before `Finished` is sent
/// even if the compute phase panics.
#[derive(Debug)]
pub struct RenderPipeline {
    rendering: AtomicBool,
    viewport: Mutex<Viewport>,
    settings: Mutex<RenderSettings>,
    latest: Mutex<Option<Arc<RenderResult>>>,
    /// Also held across the phase flip in [`RenderTicket::drop`] so events
    /// from consecutive passes never interleave.
    listeners: Mutex<Vec<mpsc::Sender<RenderEvent>>>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Viewport::default(), RenderSettings::default())
    }
}

impl RenderPipeline {
    pub fn new(viewport: Viewport, settings: RenderSettings) -> Self {
        Self {
            rendering: AtomicBool::new(false),
            viewport: Mutex::new(viewport),
            settings: Mutex::new(settings),
            latest: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> mpsc::Receiver<RenderEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.listeners).push(tx);
        rx
    }

    pub fn phase(&self) -> RenderPhase {
        if self.is_rendering() {
            RenderPhase::Rendering
        } else {
            RenderPhase::Idle
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    // -- live state ---------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        lock(&self.viewport).clone()
    }

    pub fn set_viewport(&self, viewport: &Viewport) {
        *lock(&self.viewport) = viewport.clone();
    }

    /// Change the target raster size.
    pub fn resize(&self, width: u32, height: u32) -> crate::Result<()> {
        lock(&self.viewport).resize(width, height)?;
        Ok(())
    }

    /// Plane coordinate under pixel `(px, py)` of the live viewport.
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        lock(&self.viewport).pixel_to_complex(px, py)
    }

    pub fn settings(&self) -> RenderSettings {
        lock(&self.settings).clone()
    }

    pub fn set_settings(&self, settings: RenderSettings) {
        *lock(&self.settings) = settings;
    }

    pub fn set_engine(&self, engine: EscapeTimeEngine) {
        lock(&self.settings).engine = engine;
    }

    pub fn set_palette(&self, palette: Palette) {
        lock(&self.settings).palette = palette;
    }

    pub fn set_quality(&self, quality: RenderQuality) {
        lock(&self.settings).quality = quality;
    }

    /// Most recently published frame.
    pub fn latest(&self) -> Option<Arc<RenderResult>> {
        lock(&self.latest).clone()
    }

    // -- rendering ----------------------------------------------------------

    /// Render an explicit viewport and settings.
    ///
    /// Blocks until the frame is done. Returns `Ok(None)` without doing any
    /// work if another pass is running.
    pub fn render(
        &self,
        viewport: &Viewport,
        engine: &EscapeTimeEngine,
        palette: &Palette,
        quality: RenderQuality,
    ) -> RenderOutcome {
        let Some(ticket) = self.try_begin() else {
            return Ok(None);
        };
        self.publish(ticket, quality, || {
            renderer::render(viewport, engine, palette, quality)
        })
    }

    /// Render the live viewport with the live settings.
    pub fn refresh(&self) -> RenderOutcome {
        let Some(ticket) = self.try_begin() else {
            return Ok(None);
        };
        self.render_live(ticket)
    }

    /// Recenter on pixel `(px, py)`, scale the zoom by `factor`, then render.
    ///
    /// Does nothing while a pass is running. A factor that would make the
    /// zoom non-positive or non-finite is logged; the view is still recentered
    /// at the old zoom and rendered.
    pub fn zoom_to_point(&self, px: u32, py: u32, factor: f64) -> RenderOutcome {
        let Some(ticket) = self.try_begin() else {
            return Ok(None);
        };
        {
            let mut viewport = lock(&self.viewport);
            if let Err(e) = viewport.zoom_to_point(px, py, factor) {
                warn!(factor, kept = viewport.zoom(), "{e}");
            }
        }
        self.render_live(ticket)
    }

    /// Back to the origin at zoom 1, then render.
    pub fn reset_view(&self) -> RenderOutcome {
        let Some(ticket) = self.try_begin() else {
            return Ok(None);
        };
        lock(&self.viewport).reset();
        self.render_live(ticket)
    }

    /// Zoom so that `rect` roughly fills the view, then render.
    ///
    /// The factor is `max(W / w, H / h) · 0.8`, centered on the rectangle.
    /// Empty rectangles are ignored.
    pub fn zoom_to_rectangle(&self, rect: PixelRect) -> RenderOutcome {
        if rect.is_empty() {
            debug!(?rect, "Ignoring empty zoom rectangle");
            return Ok(None);
        }
        let Some(ticket) = self.try_begin() else {
            return Ok(None);
        };
        {
            let mut viewport = lock(&self.viewport);
            let factor = (viewport.width() as f64 / rect.width as f64)
                .max(viewport.height() as f64 / rect.height as f64)
                * 0.8;
            let (cx, cy) = rect.center();
            if let Err(e) = viewport.zoom_to_point(cx, cy, factor) {
                warn!(factor, kept = viewport.zoom(), "{e}");
            }
        }
        self.render_live(ticket)
    }

    /// Run [`refresh`](Self::refresh) on a named background thread.
    pub fn spawn_render(self: &Arc<Self>) -> std::io::Result<JoinHandle<RenderOutcome>> {
        let pipeline = Arc::clone(self);
        thread::Builder::new()
            .name("fractalvision-render".into())
            .spawn(move || pipeline.refresh())
    }

    fn render_live(&self, ticket: RenderTicket<'_>) -> RenderOutcome {
        self.render_live_with(ticket, |viewport, settings| {
            renderer::render(viewport, &settings.engine, &settings.palette, settings.quality)
        })
    }

    /// Snapshot the live viewport and settings, then hand the copies to
    /// `compute`. Changes made to the live state while it runs do not reach
    /// the frame.
    fn render_live_with<F>(&self, ticket: RenderTicket<'_>, compute: F) -> RenderOutcome
    where
        F: FnOnce(&Viewport, &RenderSettings) -> RenderResult,
    {
        let viewport = self.viewport();
        let settings = self.settings();
        self.publish(ticket, settings.quality, || compute(&viewport, &settings))
    }

    /// Enter the Rendering phase, or `None` if a pass is already running.
    pub(crate) fn try_begin(&self) -> Option<RenderTicket<'_>> {
        if self
            .rendering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Render already in progress, request dropped");
            return None;
        }
        send_all(&lock(&self.listeners), RenderEvent::Started);
        Some(RenderTicket {
            pipeline: self,
            published: false,
        })
    }

    /// Run `compute` and, if it completes, make its frame the latest one.
    ///
    /// A panic inside `compute` is reported as
    /// [`RenderError::WorkerPanicked`] and nothing is published.
    pub(crate) fn publish<F>(
        &self,
        mut ticket: RenderTicket<'_>,
        quality: RenderQuality,
        compute: F,
    ) -> RenderOutcome
    where
        F: FnOnce() -> RenderResult,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(compute)) {
            Ok(result) => Arc::new(result),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!("Render failed: {msg}");
                return Err(RenderError::WorkerPanicked(msg));
            }
        };

        // Replacing the slot drops our hold on the previous frame.
        *lock(&self.latest) = Some(Arc::clone(&result));
        if quality == RenderQuality::Standard {
            let (w, h) = (result.buffer.width, result.buffer.height);
            if let Err(e) = lock(&self.viewport).resize(w, h) {
                warn!("Could not sync viewport to {w}×{h}: {e}");
            }
        }
        ticket.published = true;
        Ok(Some(result))
    }
}

/// Proof of being in the Rendering phase; dropping it returns to Idle.
pub(crate) struct RenderTicket<'a> {
    pipeline: &'a RenderPipeline,
    published: bool,
}

impl Drop for RenderTicket<'_> {
    fn drop(&mut self) {
        let mut listeners = lock(&self.pipeline.listeners);
        self.pipeline.rendering.store(false, Ordering::Release);
        listeners.retain(|tx| {
            tx.send(RenderEvent::Finished {
                published: self.published,
            })
            .is_ok()
        });
    }
}

fn send_all(listeners: &[mpsc::Sender<RenderEvent>], event: RenderEvent) {
    for tx in listeners {
        let _ = tx.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
