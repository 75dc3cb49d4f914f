//! # plumbing-rs
//!
//! In-process byte-stream plumbing. A [`Plumbing`] joins any number of
//! producers (inlets) to any number of consumers (outlets): every chunk an
//! inlet produces is delivered, in order, to each outlet attached at that
//! moment. When the last inlet goes away, every outlet sees end-of-stream.
//!
//! Inlets come in two flavours:
//! - [`PushInlet`]: a write port; each flush becomes one chunk
//! - pull inlets: a background thread drains a reader
//!
//! Outlets come in three:
//! - synchronous push outlets write the destination from the producing thread
//! - asynchronous push outlets queue chunks for a feeder thread
//! - [`PullOutlet`]: a read port with its own queue
//!
//! The [`combinators`] module builds the common shapes (tee, pipe, pump,
//! tap) in one call.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//!
//! let (mut inlets, mut outlets) = plumbing_rs::make_pipe(1, 2).unwrap();
//! let mut writer = inlets.remove(0);
//! writer.write_all(b"to everyone").unwrap();
//! writer.close();
//!
//! for reader in &mut outlets {
//!     let mut out = String::new();
//!     reader.read_to_string(&mut out).unwrap();
//!     assert_eq!(out, "to everyone");
//! }
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber;
//! that is left to the application.

pub mod combinators;
pub mod endpoint;
pub mod error;
pub mod inlet;
pub mod outlet;
pub mod plumbing;
pub mod registry;
pub mod stats;

#[cfg(test)]
mod test_util;

pub use combinators::{
    broadcast_writer, broadcast_writer_with_config, make_pipe, make_pipe_with_config, make_pump,
    make_pump_with_config, make_tap, make_tap_with_config, Destination,
};
pub use endpoint::{ReadEndpoint, WriteEndpoint};
pub use error::{Error, Result};
pub use inlet::PushInlet;
pub use outlet::{OutletOptions, PullOutlet};
pub use plumbing::Plumbing;
pub use registry::{Chunk, EndpointId, EndpointKind, EndpointRef, PlumbingConfig};
pub use stats::PlumbingStats;
