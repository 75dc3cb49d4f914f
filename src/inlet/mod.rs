//! Inlet adapters
//!
//! - [`PushInlet`]: a write port; each flush becomes one broadcast chunk
//! - pull inlets: a background thread reads a user-supplied source

pub(crate) mod pull;
pub mod push;

pub use push::PushInlet;
