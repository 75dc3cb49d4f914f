//! Endpoint references and per-endpoint records
//!
//! This module defines the identity of inlets and outlets and the records
//! stored in the registry for each of them.

use std::fmt;
use std::sync::Arc;

use crate::outlet::Outlet;

/// Identifier of an endpoint, unique within its plumbing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub(crate) u64);

impl EndpointId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of endpoint a reference denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Writer handed to the user; each flush is broadcast
    PushInlet,
    /// User-supplied reader drained by a background thread
    PullInlet,
    /// User-supplied writer, written inside the registry lock
    SyncPushOutlet,
    /// User-supplied writer, written from a feeder thread
    AsyncPushOutlet,
    /// Reader handed to the user, backed by a queue
    PullOutlet,
}

impl EndpointKind {
    /// Whether this is a producer-side endpoint
    pub fn is_inlet(&self) -> bool {
        matches!(self, EndpointKind::PushInlet | EndpointKind::PullInlet)
    }

    /// Whether this is a consumer-side endpoint
    pub fn is_outlet(&self) -> bool {
        !self.is_inlet()
    }

    /// Short label used in logs and thread names
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::PushInlet => "push-inlet",
            EndpointKind::PullInlet => "pull-inlet",
            EndpointKind::SyncPushOutlet => "sync-outlet",
            EndpointKind::AsyncPushOutlet => "async-outlet",
            EndpointKind::PullOutlet => "pull-outlet",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an inlet or outlet of a specific plumbing
///
/// Returned by introspection and by the ports themselves. Holding a
/// reference does not keep the endpoint alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointRef {
    pub(crate) plumbing: u64,
    pub(crate) id: EndpointId,
    pub(crate) kind: EndpointKind,
}

impl EndpointRef {
    /// Id of the plumbing this endpoint was created on
    pub fn plumbing_id(&self) -> u64 {
        self.plumbing
    }

    /// Endpoint id
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Endpoint kind
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}@{}", self.kind, self.id, self.plumbing)
    }
}

/// Registry record for a producer
pub(crate) struct InletEntry {
    pub endpoint: EndpointRef,
}

/// Registry record for a consumer
pub(crate) struct OutletEntry {
    pub endpoint: EndpointRef,

    /// Delivery/shutdown capability
    pub outlet: Arc<dyn Outlet>,

    /// Set once the cascade has signalled this outlet.
    /// Signalled outlets receive no further chunks and are never signalled twice.
    pub shutdown_signalled: bool,
}
