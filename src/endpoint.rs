//! Stream endpoint capability
//!
//! A plumbing only needs three things from the streams at its edges:
//! write, read and close. Reading and writing come from `std::io`; the two
//! traits here add `close` and the `Send + 'static` bounds required to hand
//! an endpoint to a background thread.
//!
//! Closing is distinct from dropping. An outlet configured without
//! close-on-eof only releases its handle, which for a cloned or shared
//! stream (a `TcpStream::try_clone`, a cloned [`PushInlet`]) leaves the
//! stream open for its other owners.
//!
//! [`PushInlet`]: crate::PushInlet

use std::fs::File;
use std::io::{self, Cursor, Empty, Read, Sink, Stderr, Stdin, Stdout, Write};
use std::net::{Shutdown, TcpStream};
use std::process::{ChildStderr, ChildStdin, ChildStdout};

/// A destination a plumbing can write to
pub trait WriteEndpoint: Write + Send + 'static {
    /// Close the stream for every owner.
    ///
    /// The default flushes; streams with a notion of half-close override it.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// A source a plumbing can read from
pub trait ReadEndpoint: Read + Send + 'static {
    /// Close the stream for every owner.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteEndpoint for Vec<u8> {}

impl WriteEndpoint for Sink {}

impl WriteEndpoint for Stdout {}

impl WriteEndpoint for Stderr {}

impl WriteEndpoint for ChildStdin {}

impl WriteEndpoint for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl WriteEndpoint for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.shutdown(Shutdown::Write)
    }
}

impl WriteEndpoint for Cursor<Vec<u8>> {}

impl WriteEndpoint for Box<dyn WriteEndpoint> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<W: WriteEndpoint> WriteEndpoint for io::BufWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

impl ReadEndpoint for File {}

impl ReadEndpoint for Stdin {}

impl ReadEndpoint for Empty {}

impl ReadEndpoint for ChildStdout {}

impl ReadEndpoint for ChildStderr {}

impl ReadEndpoint for &'static [u8] {}

impl<T: AsRef<[u8]> + Send + 'static> ReadEndpoint for Cursor<T> {}

impl ReadEndpoint for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Read)
    }
}

impl ReadEndpoint for Box<dyn ReadEndpoint> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<R: ReadEndpoint> ReadEndpoint for io::BufReader<R> {
    fn close(&mut self) -> io::Result<()> {
        self.get_mut().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_close_flushes() {
        let mut writer = io::BufWriter::new(Vec::new());
        writer.write_all(b"pending").unwrap();

        WriteEndpoint::close(&mut writer).unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"pending");
    }

    #[test]
    fn test_boxed_endpoints() {
        let mut writer: Box<dyn WriteEndpoint> = Box::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        assert!(WriteEndpoint::close(&mut writer).is_ok());

        let mut reader: Box<dyn ReadEndpoint> = Box::new(Cursor::new(b"xyz".to_vec()));
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "xyz");
        assert!(ReadEndpoint::close(&mut reader).is_ok());
    }
}
