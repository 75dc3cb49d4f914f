//! Asynchronous push outlet
//!
//! Delivery only enqueues. A dedicated feeder thread drains the queue in
//! FIFO order and writes the destination outside the registry lock, so a
//! slow destination does not stall other producers.

use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::endpoint::WriteEndpoint;
use crate::registry::{Chunk, EndpointRef, Registry};

use super::{Delivery, Outlet, Shutdown};

pub(crate) struct AsyncOutlet {
    tx: Sender<Delivery>,
}

impl AsyncOutlet {
    /// Start the feeder thread for `destination`
    ///
    /// The feeder holds only a weak reference to the registry. If the queue
    /// disconnects before end-of-stream (the outlet was detached, or the
    /// whole plumbing dropped) the feeder releases the destination without
    /// closing it.
    pub(crate) fn spawn<W: WriteEndpoint>(
        registry: &Arc<Registry>,
        endpoint: EndpointRef,
        destination: W,
        close_on_eof: bool,
    ) -> io::Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let name = format!(
            "{}-{}-feeder-{}",
            registry.config().thread_name_prefix,
            registry.id(),
            endpoint.id().as_u64()
        );

        let feeder = Feeder {
            registry: Arc::downgrade(registry),
            endpoint,
            close_on_eof,
        };
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || feeder.run(destination, rx))?;

        Ok((Self { tx }, handle))
    }
}

impl Outlet for AsyncOutlet {
    fn deliver(&self, chunk: &Chunk) -> io::Result<()> {
        self.tx
            .send(Delivery::Chunk(chunk.clone()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "feeder thread stopped"))
    }

    fn shutdown(&self) -> Shutdown {
        match self.tx.send(Delivery::EndOfStream) {
            Ok(()) => Shutdown::Pending,
            // Feeder already gone; nobody else will remove the outlet
            Err(_) => Shutdown::Finished,
        }
    }
}

struct Feeder {
    registry: Weak<Registry>,
    endpoint: EndpointRef,
    close_on_eof: bool,
}

impl Feeder {
    fn run<W: WriteEndpoint>(self, mut destination: W, rx: Receiver<Delivery>) {
        tracing::debug!(
            plumbing = self.endpoint.plumbing_id(),
            endpoint = %self.endpoint.id(),
            "Feeder started"
        );

        let reached_eof = loop {
            let chunk = match rx.recv() {
                Ok(Delivery::Chunk(chunk)) => chunk,
                Ok(Delivery::EndOfStream) => break true,
                Err(_) => break false,
            };

            let written = destination
                .write_all(chunk.as_slice())
                .and_then(|_| destination.flush());

            if let Err(e) = written {
                tracing::warn!(
                    plumbing = self.endpoint.plumbing_id(),
                    endpoint = %self.endpoint.id(),
                    error = %e,
                    "Destination write failed, removing outlet"
                );
                self.detach();
                return;
            }
        };

        if !reached_eof {
            tracing::debug!(
                plumbing = self.endpoint.plumbing_id(),
                endpoint = %self.endpoint.id(),
                "Feeder detached before end-of-stream"
            );
            return;
        }

        let finished = if self.close_on_eof {
            destination.close()
        } else {
            destination.flush()
        };
        if let Err(e) = finished {
            tracing::warn!(
                plumbing = self.endpoint.plumbing_id(),
                endpoint = %self.endpoint.id(),
                close = self.close_on_eof,
                error = %e,
                "Failed to finish destination"
            );
        }

        self.detach();

        tracing::debug!(
            plumbing = self.endpoint.plumbing_id(),
            endpoint = %self.endpoint.id(),
            "Feeder finished"
        );
    }

    fn detach(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_outlet(self.endpoint.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EndpointKind, PlumbingConfig};
    use crate::test_util::{init_tracing, FailingWriter, SharedBuffer};

    fn attach<W: WriteEndpoint>(
        registry: &Arc<Registry>,
        destination: W,
        close_on_eof: bool,
    ) -> (Arc<AsyncOutlet>, EndpointRef, JoinHandle<()>) {
        let endpoint = registry.allocate(EndpointKind::AsyncPushOutlet);
        let (outlet, handle) =
            AsyncOutlet::spawn(registry, endpoint, destination, close_on_eof).unwrap();
        let outlet = Arc::new(outlet);
        registry.add_outlet(endpoint, outlet.clone());
        (outlet, endpoint, handle)
    }

    #[test]
    fn test_feeder_preserves_order() {
        init_tracing();
        let registry = Arc::new(Registry::new(PlumbingConfig::default()));
        let buffer = SharedBuffer::new();
        let (outlet, endpoint, handle) = attach(&registry, buffer.clone(), true);

        outlet.deliver(&Chunk::copy_from_slice(b"A")).unwrap();
        outlet.deliver(&Chunk::copy_from_slice(b"B")).unwrap();
        assert_eq!(outlet.shutdown(), Shutdown::Pending);
        handle.join().unwrap();

        assert_eq!(buffer.contents(), b"AB");
        assert!(buffer.is_closed());
        assert!(!registry.contains(endpoint.id()));
    }

    #[test]
    fn test_feeder_leaves_destination_open() {
        let registry = Arc::new(Registry::new(PlumbingConfig::default()));
        let buffer = SharedBuffer::new();
        let (outlet, _, handle) = attach(&registry, buffer.clone(), false);

        outlet.shutdown();
        handle.join().unwrap();

        assert!(!buffer.is_closed());
    }

    #[test]
    fn test_write_failure_removes_outlet() {
        let registry = Arc::new(Registry::new(PlumbingConfig::default()));
        let (outlet, endpoint, handle) = attach(&registry, FailingWriter, false);

        outlet.deliver(&Chunk::copy_from_slice(b"x")).unwrap();
        handle.join().unwrap();

        assert!(!registry.contains(endpoint.id()));
        // Queue receiver is gone with the thread
        assert!(outlet.deliver(&Chunk::copy_from_slice(b"y")).is_err());
        assert_eq!(outlet.shutdown(), Shutdown::Finished);
    }

    #[test]
    fn test_feeder_exits_when_plumbing_dropped() {
        let registry = Arc::new(Registry::new(PlumbingConfig::default()));
        let buffer = SharedBuffer::new();
        let (outlet, _, handle) = attach(&registry, buffer.clone(), true);

        outlet.deliver(&Chunk::copy_from_slice(b"kept")).unwrap();
        drop(outlet);
        drop(registry);
        handle.join().unwrap();

        // No end-of-stream was signalled, so the destination stays open
        assert_eq!(buffer.contents(), b"kept");
        assert!(!buffer.is_closed());
    }

    #[test]
    fn test_detached_feeder_releases_destination() {
        let registry = Arc::new(Registry::new(PlumbingConfig::default()));
        let buffer = SharedBuffer::new();
        let (outlet, endpoint, handle) = attach(&registry, buffer.clone(), true);
        drop(outlet);

        assert!(registry.remove_outlet(endpoint.id()));
        handle.join().unwrap();

        assert!(!buffer.is_closed());
        assert!(registry.outlets().is_empty());
    }

    #[test]
    fn test_thread_name() {
        let config = PlumbingConfig::default().thread_name_prefix("tee");
        let registry = Arc::new(Registry::new(config));
        let (outlet, endpoint, handle) = attach(&registry, SharedBuffer::new(), false);

        let expected = format!("tee-{}-feeder-{}", registry.id(), endpoint.id().as_u64());
        assert_eq!(handle.thread().name(), Some(expected.as_str()));

        outlet.shutdown();
        handle.join().unwrap();
    }
}
