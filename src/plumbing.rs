//! Plumbing handle
//!
//! The user-facing side of a registry: attach producers and consumers,
//! inspect what is attached, read counters.

use std::fmt;
use std::sync::Arc;

use crate::endpoint::{ReadEndpoint, WriteEndpoint};
use crate::error::{Error, Result};
use crate::inlet::{pull, PushInlet};
use crate::outlet::{AsyncOutlet, OutletOptions, PullOutlet, SyncOutlet};
use crate::registry::{EndpointKind, EndpointRef, PlumbingConfig, Registry};
use crate::stats::PlumbingStats;

/// Handle to one plumbing instance
///
/// Bytes produced by any inlet are delivered to every outlet attached at
/// that moment. When the last inlet is removed, every outlet is signalled
/// end-of-stream. Outlets never shut inlets down.
///
/// Clones refer to the same plumbing. The plumbing stays alive while any
/// handle, port, or running pull-inlet thread refers to it.
///
/// # Example
/// ```
/// use std::io::{Read, Write};
/// use plumbing_rs::Plumbing;
///
/// let plumbing = Plumbing::new();
/// let mut reader = plumbing.open_pull_outlet();
/// let mut writer = plumbing.open_push_inlet();
///
/// writer.write_all(b"hello").unwrap();
/// writer.close();
///
/// let mut out = String::new();
/// reader.read_to_string(&mut out).unwrap();
/// assert_eq!(out, "hello");
/// ```
#[derive(Clone)]
pub struct Plumbing {
    registry: Arc<Registry>,
}

impl Plumbing {
    /// Create a plumbing with default configuration
    pub fn new() -> Self {
        Self::with_config(PlumbingConfig::default())
    }

    /// Create a plumbing with custom configuration
    pub fn with_config(config: PlumbingConfig) -> Self {
        let registry = Arc::new(Registry::new(config));
        tracing::debug!(plumbing = registry.id(), "Plumbing created");
        Self { registry }
    }

    pub(crate) fn from_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Process-unique id of this plumbing
    pub fn id(&self) -> u64 {
        self.registry.id()
    }

    /// Get the plumbing configuration
    pub fn config(&self) -> &PlumbingConfig {
        self.registry.config()
    }

    /// Open a write port whose flushed bytes go to every outlet
    pub fn open_push_inlet(&self) -> PushInlet {
        PushInlet::open(&self.registry)
    }

    /// Drain `source` on a background thread into every outlet
    ///
    /// When the source reports end-of-stream (or a read error) the inlet
    /// is removed.
    pub fn attach_pull_inlet<R: ReadEndpoint>(&self, source: R) -> Result<EndpointRef> {
        let mut endpoints = pull::attach_all(&self.registry, [source])?;
        endpoints
            .pop()
            .ok_or_else(|| Error::InvalidArgument("no source attached".into()))
    }

    /// Deliver everything broadcast from now on to `destination`
    ///
    /// With `options.asynchronous` the destination is written from a
    /// dedicated feeder thread; otherwise it is written by the producing
    /// thread while the plumbing is locked. With `options.close_on_eof` the
    /// destination is closed once the plumbing has no inlets left.
    pub fn attach_push_outlet<W: WriteEndpoint>(
        &self,
        destination: W,
        options: OutletOptions,
    ) -> Result<EndpointRef> {
        if options.asynchronous {
            let endpoint = self.registry.allocate(EndpointKind::AsyncPushOutlet);
            let (outlet, handle) = AsyncOutlet::spawn(
                &self.registry,
                endpoint,
                destination,
                options.close_on_eof,
            )
            .map_err(Error::Spawn)?;

            self.registry.add_outlet(endpoint, Arc::new(outlet));
            self.registry.track_worker(handle);
            Ok(endpoint)
        } else {
            let endpoint = self.registry.allocate(EndpointKind::SyncPushOutlet);
            let outlet = SyncOutlet::new(endpoint, destination, options.close_on_eof);

            self.registry.add_outlet(endpoint, Arc::new(outlet));
            Ok(endpoint)
        }
    }

    /// Open a read port that receives everything broadcast from now on
    pub fn open_pull_outlet(&self) -> PullOutlet {
        PullOutlet::open(&self.registry)
    }

    /// Producers currently attached
    pub fn inlets(&self) -> Vec<EndpointRef> {
        self.registry.inlets()
    }

    /// Consumers currently attached
    pub fn outlets(&self) -> Vec<EndpointRef> {
        self.registry.outlets()
    }

    /// Kind of a live endpoint of this plumbing
    ///
    /// Returns `Ok(None)` if the endpoint has already been removed, and
    /// [`Error::ForeignEndpoint`] if it was created on another plumbing.
    pub fn endpoint_kind(&self, endpoint: &EndpointRef) -> Result<Option<EndpointKind>> {
        if endpoint.plumbing_id() != self.id() {
            return Err(Error::ForeignEndpoint {
                endpoint: endpoint.id(),
                plumbing: self.id(),
            });
        }

        Ok(self
            .registry
            .contains(endpoint.id())
            .then_some(endpoint.kind()))
    }

    /// Counter snapshot; for display only
    pub fn stats(&self) -> PlumbingStats {
        self.registry.counters().snapshot()
    }

    /// Wait for every background thread started so far to finish
    ///
    /// Pull-inlet threads finish when their source ends; feeder threads when
    /// they have written everything up to end-of-stream. This never cancels
    /// anything: with an open push inlet, feeder threads never finish and
    /// neither does this call. Must not be called from a plumbing thread.
    pub fn join(&self) {
        self.registry.join_workers();
    }
}

impl Default for Plumbing {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Plumbing {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Plumbing {}

impl fmt::Debug for Plumbing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plumbing")
            .field("id", &self.id())
            .field("stats", &self.stats())
            .finish()
    }
}
