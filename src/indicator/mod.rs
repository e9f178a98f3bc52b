//! Indicator surfaces that number each output.
//!
//! A surface runs its own loop on a dedicated thread and owns all of its
//! window state.  The daemon holds an [`IndicatorHandle`] and only ever
//! posts [`IndicatorEvent`]s into that loop; nothing is called across
//! threads directly.
//!
//! When the `indicator-gtk` feature is enabled, [`gtk::GtkIndicators`]
//! draws a layer-shell overlay on every output.  [`headless::HeadlessIndicators`]
//! only logs what it would show.

#[cfg(feature = "indicator-gtk")]
pub mod gtk;
pub mod headless;

use crate::command::Position;
use crate::traits::{IndicatorEvent, IndicatorSurface};
use log::{error, warn};
use std::sync::mpsc;
use std::thread::JoinHandle;

/// The indicator surface could not be started.
#[derive(Debug, thiserror::Error)]
#[error("indicator error: {0}")]
pub struct IndicatorError(pub String);

/// Handle to an [`IndicatorSurface`] running on its own thread.
///
/// [`show`](Self::show) and [`refresh`](Self::refresh) return immediately.
/// [`stop`](Self::stop) waits for the surface thread to finish; dropping
/// the handle stops it as well.
pub struct IndicatorHandle {
    tx: mpsc::Sender<IndicatorEvent>,
    thread: Option<JoinHandle<()>>,
}

impl IndicatorHandle {
    /// Start `surface` on a new thread.
    ///
    /// Blocks until the surface has initialised.  If that fails the
    /// thread is joined and the error returned.
    pub fn spawn<S: IndicatorSurface>(mut surface: S) -> Result<Self, IndicatorError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread = std::thread::spawn(move || {
            let ready = surface.init();
            let ok = ready.is_ok();
            let _ = ready_tx.send(ready);
            if ok {
                surface.run(rx);
            }
        });

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(IndicatorError(
                "indicator thread exited during startup".into(),
            ))
        });
        if let Err(e) = ready {
            if thread.join().is_err() {
                error!("indicator thread panicked");
            }
            return Err(e);
        }

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    fn post(&self, event: IndicatorEvent) {
        if self.tx.send(event).is_err() {
            warn!("indicator surface has exited, dropping event");
        }
    }

    /// Show one numbered indicator per position.
    pub fn show(&self, positions: Vec<Position>) {
        self.post(IndicatorEvent::Show(positions));
    }

    /// Replace all indicators with one per position.
    pub fn refresh(&self, positions: Vec<Position>) {
        self.post(IndicatorEvent::Refresh(positions));
    }

    /// Whether the surface thread has not been stopped yet.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Close all indicators and wait for the surface thread to exit.
    /// Later calls do nothing.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The surface may already be gone; joining is what matters.
            let _ = self.tx.send(IndicatorEvent::Stop);
            if thread.join().is_err() {
                error!("indicator thread panicked");
            }
        }
    }
}

impl Drop for IndicatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Render positions as `"1@x,y 2@x,y …"` for logging.
pub(crate) fn describe(positions: &[Position]) -> String {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}@{}", i + 1, p))
        .collect::<Vec<_>>()
        .join(" ")
}

//  Tests
