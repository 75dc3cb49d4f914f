//! Pull outlet
//!
//! A read port handed to the user. Broadcast chunks are queued without
//! limit; `read` dequeues them, splitting a chunk that does not fit the
//! caller's buffer and putting the unread remainder back at the front.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::endpoint::ReadEndpoint;
use crate::plumbing::Plumbing;
use crate::registry::{Chunk, EndpointKind, EndpointRef, Registry};

use super::{Delivery, Outlet, Shutdown};

#[derive(Default)]
struct QueueState {
    items: VecDeque<Delivery>,
    eof_reached: bool,
}

/// Queue side of a pull outlet, registered with the registry
#[derive(Default)]
pub(crate) struct PullQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Outlet for PullQueue {
    fn deliver(&self, chunk: &Chunk) -> io::Result<()> {
        self.state
            .lock()
            .items
            .push_back(Delivery::Chunk(chunk.clone()));
        self.available.notify_one();
        Ok(())
    }

    fn shutdown(&self) -> Shutdown {
        self.state.lock().items.push_back(Delivery::EndOfStream);
        self.available.notify_one();
        Shutdown::Pending
    }
}

struct PullOutletInner {
    registry: Arc<Registry>,
    endpoint: EndpointRef,
    queue: Arc<PullQueue>,
}

impl Drop for PullOutletInner {
    fn drop(&mut self) {
        // Nobody can read any more; stop queueing for this outlet
        self.registry.remove_outlet(self.endpoint.id());
    }
}

/// Read port of a plumbing
///
/// Returns the bytes broadcast by the plumbing's inlets, in order, and
/// end-of-stream (`Ok(0)`) once every inlet has closed. After end-of-stream
/// has been returned once, every further read returns it again.
///
/// Handles are cheap to clone; clones read from the same queue. Dropping
/// the last handle detaches the outlet from its plumbing.
///
/// # Example
/// ```
/// use std::io::{Read, Write};
///
/// let (mut inlets, mut outlets) = plumbing_rs::make_pipe(1, 1).unwrap();
/// let mut writer = inlets.remove(0);
/// let mut reader = outlets.remove(0);
///
/// writer.write_all(b"abc").unwrap();
/// writer.close();
///
/// let mut out = String::new();
/// reader.read_to_string(&mut out).unwrap();
/// assert_eq!(out, "abc");
/// ```
#[derive(Clone)]
pub struct PullOutlet {
    inner: Arc<PullOutletInner>,
}

impl PullOutlet {
    /// Create the port and register its queue with `registry`
    pub(crate) fn open(registry: &Arc<Registry>) -> Self {
        let endpoint = registry.allocate(EndpointKind::PullOutlet);
        let queue = Arc::new(PullQueue::default());
        registry.add_outlet(endpoint, queue.clone());

        Self {
            inner: Arc::new(PullOutletInner {
                registry: Arc::clone(registry),
                endpoint,
                queue,
            }),
        }
    }

    /// Reference to this outlet in its plumbing
    pub fn endpoint(&self) -> EndpointRef {
        self.inner.endpoint
    }

    /// The plumbing this port belongs to
    pub fn plumbing(&self) -> Plumbing {
        Plumbing::from_registry(Arc::clone(&self.inner.registry))
    }

    /// Whether a read would return without blocking
    ///
    /// True once end-of-stream has been observed or while anything (data or
    /// the end-of-stream marker) is queued.
    pub fn is_ready(&self) -> bool {
        let state = self.inner.queue.state.lock();
        state.eof_reached || !state.items.is_empty()
    }

    /// Whether end-of-stream has been returned by a read
    pub fn is_eof(&self) -> bool {
        self.inner.queue.state.lock().eof_reached
    }

    /// Stop reading: drop anything queued and detach from the plumbing
    ///
    /// Subsequent reads return end-of-stream. Inlets are not affected.
    pub fn close(&self) {
        {
            let mut state = self.inner.queue.state.lock();
            state.items.clear();
            state.eof_reached = true;
        }
        self.inner.queue.available.notify_all();
        self.inner.registry.remove_outlet(self.inner.endpoint.id());
    }

    fn read_queued(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let queue = &self.inner.queue;
        let mut state = queue.state.lock();

        loop {
            if state.eof_reached {
                return Ok(0);
            }

            match state.items.pop_front() {
                None => queue.available.wait(&mut state),
                Some(Delivery::EndOfStream) => {
                    state.eof_reached = true;
                    drop(state);
                    queue.available.notify_all();

                    self.inner.registry.remove_outlet(self.inner.endpoint.id());
                    tracing::debug!(
                        plumbing = self.inner.endpoint.plumbing_id(),
                        endpoint = %self.inner.endpoint.id(),
                        "Pull outlet reached end-of-stream"
                    );
                    return Ok(0);
                }
                // An empty read would look like end-of-stream
                Some(Delivery::Chunk(chunk)) if chunk.is_empty() => continue,
                Some(Delivery::Chunk(chunk)) if chunk.len() <= buf.len() => {
                    let len = chunk.len();
                    buf[..len].copy_from_slice(chunk.as_slice());
                    return Ok(len);
                }
                Some(Delivery::Chunk(chunk)) => {
                    let (head, rest) = chunk.split_at(buf.len());
                    buf.copy_from_slice(head.as_slice());
                    state.items.push_front(Delivery::Chunk(rest));
                    drop(state);
                    // Another reader may be waiting for the remainder
                    queue.available.notify_one();
                    return Ok(buf.len());
                }
            }
        }
    }
}

impl Read for PullOutlet {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_queued(buf)
    }
}

impl Read for &PullOutlet {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_queued(buf)
    }
}

impl ReadEndpoint for PullOutlet {
    fn close(&mut self) -> io::Result<()> {
        PullOutlet::close(self);
        Ok(())
    }
}

impl fmt::Debug for PullOutlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullOutlet")
            .field("endpoint", &self.inner.endpoint)
            .field("ready", &self.is_ready())
            .finish()
    }
}
