//! Core traits that decouple qkdisplays from any specific compositor or
//! overlay toolkit.
//!
//! Every concrete backend (sway IPC, a GTK overlay, a test harness, …)
//! implements one of these traits.  The
//! [`Arrangement`](crate::arrangement::Arrangement) only depends on
//! [`Compositor`]; the [`Daemon`](crate::daemon::Daemon) only talks to an
//! [`IndicatorSurface`] through the events it posts.

use crate::command::{OutputInfo, Position};
use crate::indicator::IndicatorError;
use std::sync::mpsc;

/// Abstraction over a compositor that reports output geometry and accepts
/// output placement and focus commands.
///
/// An implementation might talk to sway via IPC, or it might be a
/// recording stub used in tests.  All calls are synchronous.
pub trait Compositor {
    /// The error type produced by this compositor.
    type Error: std::error::Error + Send + 'static;

    /// Return every **active** output.
    ///
    /// Outputs that are disabled must be omitted entirely, including ones
    /// that were toggled off since a previous call.
    fn active_outputs(&self) -> Result<Vec<OutputInfo>, Self::Error>;

    /// Move the output called `name` so its top-left corner is at `(x, y)`.
    fn set_output_position(&self, name: &str, x: i32, y: i32) -> Result<(), Self::Error>;

    /// Give input focus to the output called `name`.
    fn focus_output(&self, name: &str) -> Result<(), Self::Error>;
}

//  Indicator surface

/// Deferred tasks posted into an [`IndicatorSurface`]'s own loop.
///
/// Positions are in display-number order: the indicator at `positions[i]`
/// shows the number `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorEvent {
    /// Show one indicator per position.
    Show(Vec<Position>),
    /// Close every current indicator, then show one per position.
    Refresh(Vec<Position>),
    /// Close every indicator and leave the loop.
    Stop,
}

/// An overlay that numbers each output.
///
/// The surface owns all of its window state and runs its own loop on a
/// dedicated thread (see [`IndicatorHandle`](crate::indicator::IndicatorHandle)).
/// Callers never touch the surface directly: they post
/// [`IndicatorEvent`]s into `events`.
///
/// # Contract
///
/// * [`init`](IndicatorSurface::init) runs first, on the surface thread.
///   An error there is reported to whoever spawned the surface and
///   [`run`](IndicatorSurface::run) is never called.
/// * [`run`](IndicatorSurface::run) **blocks** until an
///   [`IndicatorEvent::Stop`] arrives or the sender side is dropped.
/// * The surface never calls back into the caller.
pub trait IndicatorSurface: Send + 'static {
    /// Prepare the surface (open the display, load styles).
    fn init(&mut self) -> Result<(), IndicatorError> {
        Ok(())
    }

    /// Run the surface loop, handling events until told to stop.
    fn run(self, events: mpsc::Receiver<IndicatorEvent>);
}
