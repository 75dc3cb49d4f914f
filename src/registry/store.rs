//! Plumbing registry implementation
//!
//! The registry owns the inlet and outlet sets of one plumbing and routes
//! every chunk produced by an inlet to all outlets registered at that moment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::outlet::{Outlet, Shutdown};
use crate::stats::PlumbingCounters;

use super::chunk::Chunk;
use super::config::PlumbingConfig;
use super::entry::{EndpointId, EndpointKind, EndpointRef, InletEntry, OutletEntry};

static NEXT_PLUMBING_ID: AtomicU64 = AtomicU64::new(1);

/// Inlet and outlet sets, guarded by the registry lock
#[derive(Default)]
struct RegistryState {
    inlets: Vec<InletEntry>,
    outlets: Vec<OutletEntry>,
}

impl RegistryState {
    fn take_inlet(&mut self, id: EndpointId) -> Option<InletEntry> {
        let pos = self.inlets.iter().position(|e| e.endpoint.id == id)?;
        Some(self.inlets.remove(pos))
    }

    fn take_outlet(&mut self, id: EndpointId) -> Option<OutletEntry> {
        let pos = self.outlets.iter().position(|e| e.endpoint.id == id)?;
        Some(self.outlets.remove(pos))
    }
}

/// Coordinator for one plumbing instance
///
/// Every mutation and enumeration of the inlet/outlet sets happens under a
/// single mutex. Synchronous outlets are written while that mutex is held,
/// so a slow synchronous destination stalls every producer and every
/// registration change on this plumbing. Asynchronous and pull outlets only
/// enqueue under the lock.
pub(crate) struct Registry {
    id: u64,
    config: PlumbingConfig,
    state: Mutex<RegistryState>,
    next_endpoint_id: AtomicU64,
    counters: PlumbingCounters,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Registry {
    pub(crate) fn new(config: PlumbingConfig) -> Self {
        Self {
            id: NEXT_PLUMBING_ID.fetch_add(1, Ordering::Relaxed),
            config,
            state: Mutex::new(RegistryState::default()),
            next_endpoint_id: AtomicU64::new(1),
            counters: PlumbingCounters::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn config(&self) -> &PlumbingConfig {
        &self.config
    }

    pub(crate) fn counters(&self) -> &PlumbingCounters {
        &self.counters
    }

    /// Allocate a reference for an endpoint about to be attached
    pub(crate) fn allocate(&self, kind: EndpointKind) -> EndpointRef {
        EndpointRef {
            plumbing: self.id,
            id: EndpointId(self.next_endpoint_id.fetch_add(1, Ordering::Relaxed)),
            kind,
        }
    }

    /// Register a producer
    pub(crate) fn add_inlet(&self, endpoint: EndpointRef) {
        let mut state = self.state.lock();
        state.inlets.push(InletEntry { endpoint });
        self.counters.inlet_added();

        tracing::debug!(
            plumbing = self.id,
            endpoint = %endpoint.id,
            kind = %endpoint.kind,
            inlets = state.inlets.len(),
            "Inlet added"
        );
    }

    /// Unregister a producer without applying the cascade rule
    ///
    /// Returns false if the inlet was not registered.
    pub(crate) fn remove_inlet(&self, id: EndpointId) -> bool {
        let mut state = self.state.lock();
        self.remove_inlet_locked(&mut state, id)
    }

    /// Register a consumer
    pub(crate) fn add_outlet(&self, endpoint: EndpointRef, outlet: Arc<dyn Outlet>) {
        let mut state = self.state.lock();
        state.outlets.push(OutletEntry {
            endpoint,
            outlet,
            shutdown_signalled: false,
        });
        self.counters.outlet_added();

        tracing::debug!(
            plumbing = self.id,
            endpoint = %endpoint.id,
            kind = %endpoint.kind,
            outlets = state.outlets.len(),
            "Outlet added"
        );
    }

    /// Unregister a consumer
    ///
    /// Returns false if the outlet was not registered.
    pub(crate) fn remove_outlet(&self, id: EndpointId) -> bool {
        let mut state = self.state.lock();
        self.remove_outlet_locked(&mut state, id)
    }

    /// Deliver a chunk to every outlet registered right now
    ///
    /// Outlets whose delivery fails are removed before the lock is released.
    pub(crate) fn broadcast(&self, chunk: &Chunk) {
        let mut state = self.state.lock();
        let mut failed = Vec::new();

        for entry in state.outlets.iter().filter(|e| !e.shutdown_signalled) {
            if let Err(e) = entry.outlet.deliver(chunk) {
                tracing::warn!(
                    plumbing = self.id,
                    endpoint = %entry.endpoint.id,
                    kind = %entry.endpoint.kind,
                    error = %e,
                    "Delivery failed, removing outlet"
                );
                failed.push(entry.endpoint.id);
            }
        }

        for id in failed {
            self.remove_outlet_locked(&mut state, id);
        }

        self.counters.record_chunk(chunk.len());

        tracing::trace!(
            plumbing = self.id,
            bytes = chunk.len(),
            outlets = state.outlets.len(),
            "Chunk broadcast"
        );
    }

    /// Signal end-of-stream to every outlet if no inlet is left
    pub(crate) fn cascade_close_if_no_inlets(&self) {
        let mut state = self.state.lock();
        self.cascade_locked(&mut state);
    }

    /// Remove an inlet and apply the cascade rule, atomically
    pub(crate) fn close_inlet(&self, id: EndpointId) {
        let mut state = self.state.lock();
        if self.remove_inlet_locked(&mut state, id) {
            self.cascade_locked(&mut state);
        }
    }

    /// Snapshot of registered producers
    pub(crate) fn inlets(&self) -> Vec<EndpointRef> {
        self.state.lock().inlets.iter().map(|e| e.endpoint).collect()
    }

    /// Snapshot of registered consumers
    pub(crate) fn outlets(&self) -> Vec<EndpointRef> {
        self.state.lock().outlets.iter().map(|e| e.endpoint).collect()
    }

    /// Whether the given endpoint is currently registered
    pub(crate) fn contains(&self, id: EndpointId) -> bool {
        let state = self.state.lock();
        state.inlets.iter().any(|e| e.endpoint.id == id)
            || state.outlets.iter().any(|e| e.endpoint.id == id)
    }

    /// Keep a background thread handle for [`Registry::join_workers`]
    ///
    /// Handles of threads that already finished are dropped here, which
    /// detaches them, so a long-lived plumbing does not accumulate them.
    pub(crate) fn track_worker(&self, handle: JoinHandle<()>) {
        let mut workers = self.workers.lock();
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
    }

    #[cfg(test)]
    pub(crate) fn tracked_workers(&self) -> usize {
        self.workers.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn running_workers(&self) -> usize {
        self.workers.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every tracked background thread to finish
    pub(crate) fn join_workers(&self) {
        loop {
            let handles = std::mem::take(&mut *self.workers.lock());
            if handles.is_empty() {
                return;
            }

            for handle in handles {
                let name = handle.thread().name().map(str::to_owned);
                if handle.join().is_err() {
                    tracing::warn!(plumbing = self.id, thread = ?name, "Plumbing thread panicked");
                }
            }
        }
    }

    fn remove_inlet_locked(&self, state: &mut RegistryState, id: EndpointId) -> bool {
        let Some(entry) = state.take_inlet(id) else {
            return false;
        };
        self.counters.inlet_removed();

        tracing::debug!(
            plumbing = self.id,
            endpoint = %entry.endpoint.id,
            kind = %entry.endpoint.kind,
            inlets = state.inlets.len(),
            "Inlet removed"
        );
        true
    }

    fn remove_outlet_locked(&self, state: &mut RegistryState, id: EndpointId) -> bool {
        let Some(entry) = state.take_outlet(id) else {
            return false;
        };
        self.counters.outlet_removed();

        tracing::debug!(
            plumbing = self.id,
            endpoint = %entry.endpoint.id,
            kind = %entry.endpoint.kind,
            outlets = state.outlets.len(),
            "Outlet removed"
        );
        true
    }

    fn cascade_locked(&self, state: &mut RegistryState) {
        if !state.inlets.is_empty() {
            return;
        }

        let mut signalled = 0;
        let mut finished = Vec::new();

        for entry in state.outlets.iter_mut().filter(|e| !e.shutdown_signalled) {
            entry.shutdown_signalled = true;
            signalled += 1;

            if entry.outlet.shutdown() == Shutdown::Finished {
                finished.push(entry.endpoint.id);
            }
        }

        for id in finished {
            self.remove_outlet_locked(state, id);
        }

        if signalled > 0 {
            tracing::info!(
                plumbing = self.id,
                outlets = signalled,
                "Last inlet closed, outlets signalled end-of-stream"
            );
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        tracing::debug!(plumbing = self.id, "Plumbing dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Outlet that records what it sees
    #[derive(Default)]
    struct RecordingOutlet {
        chunks: Mutex<Vec<Chunk>>,
        shutdowns: AtomicUsize,
        fail: bool,
        pending: bool,
    }

    impl Outlet for RecordingOutlet {
        fn deliver(&self, chunk: &Chunk) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            self.chunks.lock().push(chunk.clone());
            Ok(())
        }

        fn shutdown(&self) -> Shutdown {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.pending {
                Shutdown::Pending
            } else {
                Shutdown::Finished
            }
        }
    }

    fn attach(registry: &Registry, outlet: Arc<RecordingOutlet>) -> EndpointRef {
        let endpoint = registry.allocate(EndpointKind::SyncPushOutlet);
        registry.add_outlet(endpoint, outlet);
        endpoint
    }

    #[test]
    fn test_broadcast_reaches_all_outlets() {
        let registry = Registry::new(PlumbingConfig::default());
        let a = Arc::new(RecordingOutlet::default());
        let b = Arc::new(RecordingOutlet::default());
        attach(&registry, a.clone());
        attach(&registry, b.clone());

        let chunk = Chunk::copy_from_slice(b"hello");
        registry.broadcast(&chunk);

        assert_eq!(a.chunks.lock().as_slice(), &[chunk.clone()]);
        assert_eq!(b.chunks.lock().as_slice(), &[chunk]);
    }

    #[test]
    fn test_late_outlet_misses_earlier_chunks() {
        let registry = Registry::new(PlumbingConfig::default());
        let early = Arc::new(RecordingOutlet::default());
        attach(&registry, early.clone());

        registry.broadcast(&Chunk::copy_from_slice(b"one"));

        let late = Arc::new(RecordingOutlet::default());
        attach(&registry, late.clone());
        registry.broadcast(&Chunk::copy_from_slice(b"two"));

        assert_eq!(early.chunks.lock().len(), 2);
        assert_eq!(late.chunks.lock().len(), 1);
        assert_eq!(late.chunks.lock()[0].as_slice(), b"two");
    }

    #[test]
    fn test_failed_outlet_removed() {
        let registry = Registry::new(PlumbingConfig::default());
        let bad = Arc::new(RecordingOutlet {
            fail: true,
            ..Default::default()
        });
        let good = Arc::new(RecordingOutlet::default());
        let bad_ref = attach(&registry, bad);
        attach(&registry, good.clone());

        registry.broadcast(&Chunk::copy_from_slice(b"x"));

        assert!(!registry.contains(bad_ref.id));
        assert_eq!(registry.outlets().len(), 1);
        assert_eq!(good.chunks.lock().len(), 1);
        assert_eq!(registry.counters().snapshot().outlet_count, 1);
    }

    #[test]
    fn test_cascade_only_after_last_inlet() {
        let registry = Registry::new(PlumbingConfig::default());
        let outlet = Arc::new(RecordingOutlet::default());
        attach(&registry, outlet.clone());

        let first = registry.allocate(EndpointKind::PushInlet);
        let second = registry.allocate(EndpointKind::PushInlet);
        registry.add_inlet(first);
        registry.add_inlet(second);

        registry.close_inlet(first.id);
        assert_eq!(outlet.shutdowns.load(Ordering::SeqCst), 0);
        assert_eq!(registry.outlets().len(), 1);

        registry.close_inlet(second.id);
        assert_eq!(outlet.shutdowns.load(Ordering::SeqCst), 1);
        assert!(registry.outlets().is_empty());
    }

    #[test]
    fn test_pending_outlet_signalled_once() {
        let registry = Registry::new(PlumbingConfig::default());
        let outlet = Arc::new(RecordingOutlet {
            pending: true,
            ..Default::default()
        });
        let outlet_ref = attach(&registry, outlet.clone());

        let inlet = registry.allocate(EndpointKind::PushInlet);
        registry.add_inlet(inlet);
        registry.close_inlet(inlet.id);

        // A second producer comes and goes before the outlet drained
        let again = registry.allocate(EndpointKind::PushInlet);
        registry.add_inlet(again);
        registry.broadcast(&Chunk::copy_from_slice(b"late"));
        registry.close_inlet(again.id);

        assert_eq!(outlet.shutdowns.load(Ordering::SeqCst), 1);
        assert!(outlet.chunks.lock().is_empty());
        assert!(registry.contains(outlet_ref.id));

        assert!(registry.remove_outlet(outlet_ref.id));
        assert!(!registry.remove_outlet(outlet_ref.id));
    }

    #[test]
    fn test_remove_inlet_does_not_cascade() {
        let registry = Registry::new(PlumbingConfig::default());
        let outlet = Arc::new(RecordingOutlet::default());
        attach(&registry, outlet.clone());

        let inlet = registry.allocate(EndpointKind::PullInlet);
        registry.add_inlet(inlet);
        assert!(registry.remove_inlet(inlet.id));
        assert_eq!(outlet.shutdowns.load(Ordering::SeqCst), 0);

        registry.cascade_close_if_no_inlets();
        assert_eq!(outlet.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_endpoint_ids_unique() {
        let registry = Registry::new(PlumbingConfig::default());
        let a = registry.allocate(EndpointKind::PushInlet);
        let b = registry.allocate(EndpointKind::PullOutlet);

        assert_ne!(a.id, b.id);
        assert_eq!(a.plumbing, registry.id());
        assert_ne!(Registry::new(PlumbingConfig::default()).id(), registry.id());
    }
}
