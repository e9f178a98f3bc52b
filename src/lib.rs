//! **qkdisplays** — number your outputs, then move, swap or focus them by
//! number.
//!
//! Outputs are treated as a single left-to-right row.  `qkdisplays show`
//! draws a number on every output and stays running as a small daemon;
//! one-shot commands such as `move left` or `place 3` rearrange the outputs
//! directly and then ask the daemon (if any) to redraw.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Compositor`] — abstracts reading output geometry and
//!   issuing placement / focus commands, so the arrangement logic is not
//!   coupled to any specific compositor.
//! * [`traits::IndicatorSurface`] — abstracts the overlay that draws the
//!   numbers, so the daemon is not coupled to any UI toolkit.
//!
//! [`arrangement`] holds the layout logic, [`daemon`] the command loop.
//! Concrete implementations live in [`sway`] (sway IPC), [`indicator`]
//! (GTK overlay) and [`ipc`] (the daemon's Unix socket).

pub mod arrangement;
pub mod command;
pub mod config;
pub mod daemon;
pub mod indicator;
pub mod ipc;
pub mod sway;
pub mod traits;
