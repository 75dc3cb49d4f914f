//! Pull inlet
//!
//! Drains a user-supplied reader on a dedicated thread, broadcasting each
//! read as one chunk. The thread stops only when the source reports
//! end-of-stream (or fails); it cannot be cancelled from outside.

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::endpoint::ReadEndpoint;
use crate::error::{Error, Result};
use crate::registry::{Chunk, EndpointKind, EndpointRef, Registry};

/// Holds freshly spawned pump threads until all of their siblings exist
#[derive(Default)]
struct StartGate {
    decision: Mutex<Option<bool>>,
    decided: Condvar,
}

impl StartGate {
    fn release(&self, start: bool) {
        *self.decision.lock() = Some(start);
        self.decided.notify_all();
    }

    fn wait(&self) -> bool {
        let mut decision = self.decision.lock();
        loop {
            if let Some(start) = *decision {
                return start;
            }
            self.decided.wait(&mut decision);
        }
    }
}

/// Attach every source as a pull inlet and start their threads
///
/// All inlets are registered before any thread starts, so an empty source
/// cannot trigger the cascade while its siblings are still being attached.
/// Threads read nothing until every one of them has been spawned. If a
/// spawn fails, the threads already spawned exit without reading, every
/// inlet is unregistered without cascading, and the error is returned.
pub(crate) fn attach_all<R, I>(registry: &Arc<Registry>, sources: I) -> Result<Vec<EndpointRef>>
where
    R: ReadEndpoint,
    I: IntoIterator<Item = R>,
{
    let pending: Vec<(EndpointRef, R)> = sources
        .into_iter()
        .map(|source| {
            let endpoint = registry.allocate(EndpointKind::PullInlet);
            registry.add_inlet(endpoint);
            (endpoint, source)
        })
        .collect();

    let endpoints: Vec<EndpointRef> = pending.iter().map(|(endpoint, _)| *endpoint).collect();
    let gate = Arc::new(StartGate::default());
    let mut handles = Vec::with_capacity(pending.len());

    for (endpoint, source) in pending {
        match spawn(registry, endpoint, source, Arc::clone(&gate)) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                gate.release(false);
                for endpoint in &endpoints {
                    registry.remove_inlet(endpoint.id());
                }
                handles.into_iter().for_each(|h| registry.track_worker(h));
                return Err(Error::Spawn(e));
            }
        }
    }

    gate.release(true);
    handles.into_iter().for_each(|h| registry.track_worker(h));
    Ok(endpoints)
}

fn spawn<R: ReadEndpoint>(
    registry: &Arc<Registry>,
    endpoint: EndpointRef,
    source: R,
    gate: Arc<StartGate>,
) -> io::Result<JoinHandle<()>> {
    let name = format!(
        "{}-{}-inlet-{}",
        registry.config().thread_name_prefix,
        registry.id(),
        endpoint.id().as_u64()
    );
    let registry = Arc::clone(registry);

    thread::Builder::new().name(name).spawn(move || {
        if gate.wait() {
            pump(registry, endpoint, source);
        } else {
            tracing::debug!(
                plumbing = registry.id(),
                endpoint = %endpoint.id(),
                "Pull inlet abandoned before start"
            );
        }
    })
}

fn pump<R: ReadEndpoint>(registry: Arc<Registry>, endpoint: EndpointRef, mut source: R) {
    let mut buf = vec![0u8; registry.config().read_buffer_size.max(1)];

    tracing::debug!(
        plumbing = registry.id(),
        endpoint = %endpoint.id(),
        "Pull inlet started"
    );

    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => registry.broadcast(&Chunk::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                // Handled like end-of-stream; only the counter tells them apart
                tracing::warn!(
                    plumbing = registry.id(),
                    endpoint = %endpoint.id(),
                    error = %e,
                    "Source read failed, treating as end-of-stream"
                );
                registry.counters().record_source_error();
                break;
            }
        }
    }

    registry.close_inlet(endpoint.id());

    tracing::debug!(
        plumbing = registry.id(),
        endpoint = %endpoint.id(),
        "Pull inlet finished"
    );
}
