//! Sway-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`Compositor`](crate::traits::Compositor) trait, powered by sway's
//! i3-compatible IPC socket.
//!
//! Nothing outside this module should reference sway directly.

pub mod ipc;
