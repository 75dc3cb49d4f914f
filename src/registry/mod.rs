//! Plumbing registry
//!
//! The registry holds the inlets and outlets of one plumbing and moves every
//! chunk from whichever inlet produced it to all outlets registered at that
//! moment.
//!
//! # Architecture
//!
//! ```text
//!      [PushInlet]        [pull-inlet thread]
//!      write()+flush()     source.read()
//!           │                    │
//!           └──► Registry::broadcast(chunk) ◄──┘
//!                ┌──────────────────────────┐
//!                │ Mutex<{                  │
//!                │   inlets:  Vec<Inlet>,   │
//!                │   outlets: Vec<Outlet>,  │
//!                │ }>                       │
//!                └────────────┬─────────────┘
//!         ┌───────────────────┼────────────────────┐
//!         ▼                   ▼                    ▼
//!   [SyncOutlet]        [AsyncOutlet]         [PullOutlet]
//!   dest.write()        queue ─► feeder        queue ─► read()
//!   (under lock)        thread ─► dest
//! ```
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` uses reference counting, so all outlets share the same
//! allocation for a chunk. A pull outlet that is read with a small buffer
//! re-queues a view over the unread remainder rather than a copy.
//!
//! # Shutdown
//!
//! Shutdown only flows downstream: when the last inlet goes away every
//! outlet is signalled end-of-stream exactly once. Outlets never close
//! inlets. There is no back-pressure; queues are unbounded.

pub mod chunk;
pub mod config;
pub mod entry;
pub(crate) mod store;

pub use chunk::Chunk;
pub use config::PlumbingConfig;
pub use entry::{EndpointId, EndpointKind, EndpointRef};
pub(crate) use store::Registry;
