//! Push inlet
//!
//! A write port handed to the user. Writes are buffered; every flush turns
//! the buffered bytes into one immutable chunk and broadcasts it.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::endpoint::WriteEndpoint;
use crate::plumbing::Plumbing;
use crate::registry::{Chunk, EndpointKind, EndpointRef, Registry};

struct InletBuffer {
    pending: BytesMut,
    closed: bool,
}

struct PushInletInner {
    registry: Arc<Registry>,
    endpoint: EndpointRef,
    capacity: usize,
    buffer: Mutex<InletBuffer>,
}

impl PushInletInner {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock();
        if buffer.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "inlet is closed",
            ));
        }

        buffer.pending.extend_from_slice(data);
        if buffer.pending.len() >= self.capacity {
            self.flush_locked(&mut buffer);
        }

        Ok(data.len())
    }

    fn flush(&self) -> io::Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "inlet is closed",
            ));
        }

        self.flush_locked(&mut buffer);
        Ok(())
    }

    /// The buffer lock is held across the broadcast so that chunks from one
    /// inlet reach the registry in write order, even when the port is shared.
    fn flush_locked(&self, buffer: &mut InletBuffer) {
        if buffer.pending.is_empty() {
            return;
        }

        let chunk = Chunk::from(buffer.pending.split().freeze());
        self.registry.broadcast(&chunk);
    }

    fn close(&self) {
        {
            let mut buffer = self.buffer.lock();
            if buffer.closed {
                return;
            }
            self.flush_locked(&mut buffer);
            buffer.closed = true;
        }

        self.registry.close_inlet(self.endpoint.id());
    }
}

impl Drop for PushInletInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Write port of a plumbing
///
/// Everything written is delivered to every outlet of the plumbing once it
/// is flushed. Closing the port removes it from the plumbing; when the last
/// inlet is gone every outlet sees end-of-stream.
///
/// Handles are cheap to clone; clones write to the same port and share its
/// buffer. The port closes when [`PushInlet::close`] is called or the last
/// handle is dropped.
///
/// # Example
/// ```
/// use std::io::Write;
/// use plumbing_rs::{OutletOptions, Plumbing};
///
/// let plumbing = Plumbing::new();
/// plumbing
///     .attach_push_outlet(Vec::new(), OutletOptions::new())
///     .unwrap();
///
/// let mut inlet = plumbing.open_push_inlet();
/// inlet.write_all(b"hello").unwrap();
/// inlet.flush().unwrap();
/// assert_eq!(plumbing.stats().bytes_broadcast, 5);
/// ```
#[derive(Clone)]
pub struct PushInlet {
    inner: Arc<PushInletInner>,
}

impl PushInlet {
    /// Create the port and register it with `registry`
    pub(crate) fn open(registry: &Arc<Registry>) -> Self {
        let endpoint = registry.allocate(EndpointKind::PushInlet);
        registry.add_inlet(endpoint);

        let capacity = registry.config().inlet_buffer_size;
        Self {
            inner: Arc::new(PushInletInner {
                registry: Arc::clone(registry),
                endpoint,
                capacity,
                buffer: Mutex::new(InletBuffer {
                    pending: BytesMut::with_capacity(capacity),
                    closed: false,
                }),
            }),
        }
    }

    /// Reference to this inlet in its plumbing
    pub fn endpoint(&self) -> EndpointRef {
        self.inner.endpoint
    }

    /// The plumbing this port belongs to
    pub fn plumbing(&self) -> Plumbing {
        Plumbing::from_registry(Arc::clone(&self.inner.registry))
    }

    /// Whether the port has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.buffer.lock().closed
    }

    /// Flush buffered bytes and remove the inlet from its plumbing
    ///
    /// Closing twice is a no-op. Writes after closing fail with
    /// `ErrorKind::BrokenPipe`.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Write for PushInlet {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Write for &PushInlet {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl WriteEndpoint for PushInlet {
    fn close(&mut self) -> io::Result<()> {
        PushInlet::close(self);
        Ok(())
    }
}

impl fmt::Debug for PushInlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushInlet")
            .field("endpoint", &self.inner.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}
