//! The local command channel of the `show` daemon.
//!
//! A single Unix stream socket per user session carries one request and one
//! response per connection.  [`socket`] owns the listening side and
//! guarantees that only one daemon can bind it; [`client`] is what one-shot
//! invocations use to reach a running daemon.

pub mod client;
pub mod socket;
