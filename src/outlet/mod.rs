//! Outlet adapters
//!
//! Every consumer registered with a plumbing is reached through one
//! delivery/shutdown capability with three implementations:
//!
//! - synchronous push outlets write the destination directly, inside the
//!   registry lock
//! - asynchronous push outlets enqueue; a feeder thread writes the destination
//! - [`PullOutlet`]s enqueue; the user reads through the returned port
//!
//! The registry calls both methods while holding its lock, so neither may
//! call back into the registry.

pub(crate) mod feeder;
pub mod options;
pub mod pull;
pub(crate) mod sync;

use std::io;

use crate::registry::Chunk;

pub(crate) use feeder::AsyncOutlet;
pub use options::OutletOptions;
pub use pull::PullOutlet;
pub(crate) use sync::SyncOutlet;

/// Outcome of signalling end-of-stream to an outlet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shutdown {
    /// The outlet is done; the registry removes it right away
    Finished,
    /// The outlet removes itself once it has drained its queue
    Pending,
}

/// Delivery/shutdown capability of a registered consumer
pub(crate) trait Outlet: Send + Sync {
    /// Hand one chunk to the outlet.
    ///
    /// An error means the outlet can no longer accept data; the registry
    /// removes it.
    fn deliver(&self, chunk: &Chunk) -> io::Result<()>;

    /// Signal end-of-stream.
    fn shutdown(&self) -> Shutdown;
}

/// Item in an outlet queue
#[derive(Debug, Clone)]
pub(crate) enum Delivery {
    Chunk(Chunk),
    EndOfStream,
}
