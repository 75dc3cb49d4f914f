//! Synchronous push outlet
//!
//! Writes each chunk straight to the destination from whichever thread is
//! broadcasting, while the registry lock is held.

use std::io;

use parking_lot::Mutex;

use crate::endpoint::WriteEndpoint;
use crate::registry::{Chunk, EndpointRef};

use super::{Outlet, Shutdown};

pub(crate) struct SyncOutlet<W> {
    endpoint: EndpointRef,
    destination: Mutex<Option<W>>,
    close_on_eof: bool,
}

impl<W: WriteEndpoint> SyncOutlet<W> {
    pub(crate) fn new(endpoint: EndpointRef, destination: W, close_on_eof: bool) -> Self {
        Self {
            endpoint,
            destination: Mutex::new(Some(destination)),
            close_on_eof,
        }
    }
}

impl<W: WriteEndpoint> Outlet for SyncOutlet<W> {
    fn deliver(&self, chunk: &Chunk) -> io::Result<()> {
        let mut destination = self.destination.lock();
        let Some(dest) = destination.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "destination already released",
            ));
        };

        dest.write_all(chunk.as_slice())?;
        dest.flush()
    }

    fn shutdown(&self) -> Shutdown {
        // Release the destination now; the registry drops this outlet next
        let Some(mut dest) = self.destination.lock().take() else {
            return Shutdown::Finished;
        };

        let result = if self.close_on_eof {
            dest.close()
        } else {
            dest.flush()
        };

        if let Err(e) = result {
            tracing::warn!(
                plumbing = self.endpoint.plumbing_id(),
                endpoint = %self.endpoint.id(),
                close = self.close_on_eof,
                error = %e,
                "Failed to finish destination"
            );
        }

        Shutdown::Finished
    }
}
