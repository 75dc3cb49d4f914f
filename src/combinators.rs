//! Ready-made plumbing shapes
//!
//! - [`broadcast_writer`]: one write port fanned out to N destinations
//! - [`make_pipe`]: M write ports joined to N read ports
//! - [`make_pump`]: readers drained into destinations by background threads
//! - [`make_tap`]: a reader mirrored to a destination and re-exposed for reading
//!
//! Every combinator validates all of its arguments before it creates
//! anything, so a misconfigured call fails without starting a thread. If a
//! thread cannot be started, the outlets already attached are detached
//! again: their destinations are released without being written or closed.

use std::fmt;

use crate::endpoint::{ReadEndpoint, WriteEndpoint};
use crate::error::{Error, Result};
use crate::inlet::{pull, PushInlet};
use crate::outlet::{OutletOptions, PullOutlet};
use crate::plumbing::Plumbing;
use crate::registry::{EndpointRef, PlumbingConfig};

enum OptionSpec {
    Options(OutletOptions),
    Flags(Vec<String>),
}

/// A destination handed to a combinator, with its outlet options
pub struct Destination {
    endpoint: Box<dyn WriteEndpoint>,
    spec: OptionSpec,
}

impl Destination {
    /// Destination with typed options
    pub fn new<W: WriteEndpoint>(endpoint: W, options: OutletOptions) -> Self {
        Self {
            endpoint: Box::new(endpoint),
            spec: OptionSpec::Options(options),
        }
    }

    /// Destination with flag names (`"close-on-eof"`, `"async"`)
    ///
    /// Flags are checked when the destination is handed to a combinator;
    /// an unknown flag fails the whole combinator.
    pub fn with_flags<W, I, S>(endpoint: W, flags: I) -> Self
    where
        W: WriteEndpoint,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoint: Box::new(endpoint),
            spec: OptionSpec::Flags(flags.into_iter().map(Into::into).collect()),
        }
    }

    fn resolve(self, index: usize) -> Result<(Box<dyn WriteEndpoint>, OutletOptions)> {
        let options = match self.spec {
            OptionSpec::Options(options) => options,
            OptionSpec::Flags(flags) => {
                OutletOptions::from_flags(&flags).map_err(|e| match e {
                    Error::UnrecognizedOption { option, .. } => Error::UnrecognizedOption {
                        destination: index,
                        option,
                    },
                    other => other,
                })?
            }
        };

        Ok((self.endpoint, options))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Destination");
        match &self.spec {
            OptionSpec::Options(options) => s.field("options", options),
            OptionSpec::Flags(flags) => s.field("flags", flags),
        };
        s.finish_non_exhaustive()
    }
}

fn resolve_all<I>(destinations: I) -> Result<Vec<(Box<dyn WriteEndpoint>, OutletOptions)>>
where
    I: IntoIterator<Item = Destination>,
{
    destinations
        .into_iter()
        .enumerate()
        .map(|(index, destination)| destination.resolve(index))
        .collect()
}

fn attach_outlets(
    plumbing: &Plumbing,
    destinations: Vec<(Box<dyn WriteEndpoint>, OutletOptions)>,
) -> Result<Vec<EndpointRef>> {
    let mut attached = Vec::with_capacity(destinations.len());

    for (endpoint, options) in destinations {
        match plumbing.attach_push_outlet(endpoint, options) {
            Ok(outlet) => attached.push(outlet),
            Err(e) => {
                detach_outlets(plumbing, &attached);
                return Err(e);
            }
        }
    }

    Ok(attached)
}

/// Undo [`attach_outlets`]; no end-of-stream is signalled
fn detach_outlets(plumbing: &Plumbing, outlets: &[EndpointRef]) {
    for outlet in outlets {
        plumbing.registry().remove_outlet(outlet.id());
    }
}

/// Write port that copies everything to each destination
///
/// # Example
/// ```
/// use std::io::Write;
/// use plumbing_rs::{broadcast_writer, Destination, OutletOptions};
///
/// let mut writer = broadcast_writer([
///     Destination::new(Vec::new(), OutletOptions::new()),
///     Destination::with_flags(std::io::sink(), ["async", "close-on-eof"]),
/// ])
/// .unwrap();
///
/// writer.write_all(b"hello").unwrap();
/// writer.close();
/// writer.plumbing().join();
/// ```
pub fn broadcast_writer<I>(destinations: I) -> Result<PushInlet>
where
    I: IntoIterator<Item = Destination>,
{
    broadcast_writer_with_config(PlumbingConfig::default(), destinations)
}

/// [`broadcast_writer`] with custom configuration
pub fn broadcast_writer_with_config<I>(config: PlumbingConfig, destinations: I) -> Result<PushInlet>
where
    I: IntoIterator<Item = Destination>,
{
    let destinations = resolve_all(destinations)?;

    let plumbing = Plumbing::with_config(config);
    attach_outlets(&plumbing, destinations)?;
    Ok(plumbing.open_push_inlet())
}

/// In-process many-to-many pipe
///
/// Bytes written to any of the `num_inlets` write ports can be read from
/// each of the `num_outlets` read ports. The read ports see end-of-stream
/// once every write port is closed.
pub fn make_pipe(num_inlets: usize, num_outlets: usize) -> Result<(Vec<PushInlet>, Vec<PullOutlet>)> {
    make_pipe_with_config(PlumbingConfig::default(), num_inlets, num_outlets)
}

/// [`make_pipe`] with custom configuration
pub fn make_pipe_with_config(
    config: PlumbingConfig,
    num_inlets: usize,
    num_outlets: usize,
) -> Result<(Vec<PushInlet>, Vec<PullOutlet>)> {
    if num_inlets == 0 {
        return Err(Error::InvalidArgument(
            "a pipe needs at least one inlet".into(),
        ));
    }
    if num_outlets == 0 {
        return Err(Error::InvalidArgument(
            "a pipe needs at least one outlet".into(),
        ));
    }

    let plumbing = Plumbing::with_config(config);
    let inlets = (0..num_inlets).map(|_| plumbing.open_push_inlet()).collect();
    let outlets = (0..num_outlets)
        .map(|_| plumbing.open_pull_outlet())
        .collect();

    Ok((inlets, outlets))
}

/// Move bytes from `sources` to `destinations` on background threads
///
/// Each source gets its own reader thread. No port is handed out; the
/// returned handle is for introspection and [`Plumbing::join`].
///
/// At least one source is required: without an inlet the destinations
/// would never see end-of-stream.
pub fn make_pump<R, S, D>(sources: S, destinations: D) -> Result<Plumbing>
where
    R: ReadEndpoint,
    S: IntoIterator<Item = R>,
    D: IntoIterator<Item = Destination>,
{
    make_pump_with_config(PlumbingConfig::default(), sources, destinations)
}

/// [`make_pump`] with custom configuration
pub fn make_pump_with_config<R, S, D>(
    config: PlumbingConfig,
    sources: S,
    destinations: D,
) -> Result<Plumbing>
where
    R: ReadEndpoint,
    S: IntoIterator<Item = R>,
    D: IntoIterator<Item = Destination>,
{
    let sources: Vec<R> = sources.into_iter().collect();
    if sources.is_empty() {
        return Err(Error::InvalidArgument(
            "a pump needs at least one source".into(),
        ));
    }
    let destinations = resolve_all(destinations)?;

    let plumbing = Plumbing::with_config(config);
    // Destinations first, so nothing read is lost before they are attached
    let outlets = attach_outlets(&plumbing, destinations)?;
    if let Err(e) = pull::attach_all(plumbing.registry(), sources) {
        detach_outlets(&plumbing, &outlets);
        return Err(e);
    }

    Ok(plumbing)
}

/// Mirror `source` into `destination` while exposing it for reading
///
/// The destination is written synchronously. The returned port sees the
/// same bytes, independently of the destination.
pub fn make_tap<R, W>(source: R, destination: W, close_on_eof: bool) -> Result<PullOutlet>
where
    R: ReadEndpoint,
    W: WriteEndpoint,
{
    make_tap_with_config(PlumbingConfig::default(), source, destination, close_on_eof)
}

/// [`make_tap`] with custom configuration
pub fn make_tap_with_config<R, W>(
    config: PlumbingConfig,
    source: R,
    destination: W,
    close_on_eof: bool,
) -> Result<PullOutlet>
where
    R: ReadEndpoint,
    W: WriteEndpoint,
{
    let plumbing = Plumbing::with_config(config);
    let mirror =
        plumbing.attach_push_outlet(destination, OutletOptions::new().close_on_eof(close_on_eof))?;
    let outlet = plumbing.open_pull_outlet();
    if let Err(e) = plumbing.attach_pull_inlet(source) {
        detach_outlets(&plumbing, &[mirror]);
        return Err(e);
    }

    Ok(outlet)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};

    use super::*;
    use crate::test_util::{init_tracing, SharedBuffer};

    #[test]
    fn test_broadcast_writer_fans_out() {
        init_tracing();
        let buffers: Vec<SharedBuffer> = (0..3).map(|_| SharedBuffer::new()).collect();
        let destinations = vec![
            Destination::new(buffers[0].clone(), OutletOptions::new()),
            Destination::new(buffers[1].clone(), OutletOptions::new().asynchronous(true)),
            Destination::with_flags(buffers[2].clone(), ["close-on-eof"]),
        ];

        let mut writer = broadcast_writer(destinations).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.close();
        writer.plumbing().join();

        for buffer in &buffers {
            assert_eq!(buffer.contents(), b"hello");
        }
        assert!(!buffers[0].is_closed());
        assert!(buffers[2].is_closed());
    }

    #[test]
    fn test_broadcast_writer_rejects_unknown_flag() {
        let first = SharedBuffer::new();
        let result = broadcast_writer([
            Destination::new(first.clone(), OutletOptions::new()),
            Destination::with_flags(SharedBuffer::new(), ["async", "eventually"]),
        ]);

        match result {
            Err(Error::UnrecognizedOption {
                destination,
                option,
            }) => {
                assert_eq!(destination, 1);
                assert_eq!(option, "eventually");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // Nothing was attached, so nothing was closed
        assert!(!first.is_closed());
    }

    #[test]
    fn test_pipe_counts_validated() {
        assert!(matches!(make_pipe(0, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(make_pipe(1, 0), Err(Error::InvalidArgument(_))));

        let (inlets, outlets) = make_pipe(2, 3).unwrap();
        assert_eq!(inlets.len(), 2);
        assert_eq!(outlets.len(), 3);

        let plumbing = inlets[0].plumbing();
        assert_eq!(outlets[2].plumbing(), plumbing);
        assert_eq!(plumbing.inlets().len(), 2);
        assert_eq!(plumbing.outlets().len(), 3);
    }

    #[test]
    fn test_pump_moves_all_sources() {
        let a = SharedBuffer::new();
        let b = SharedBuffer::new();
        let sources = vec![Cursor::new(b"one".to_vec()), Cursor::new(b"two".to_vec())];

        let plumbing = make_pump(
            sources,
            [
                Destination::new(a.clone(), OutletOptions::new().close_on_eof(true)),
                Destination::with_flags(b.clone(), ["async", "close-on-eof"]),
            ],
        )
        .unwrap();
        plumbing.join();

        // Interleaving across sources is unspecified; contents per source are not
        for buffer in [&a, &b] {
            let got = buffer.contents();
            assert_eq!(got.len(), 6);
            assert!(got == b"onetwo" || got == b"twoone");
            assert!(buffer.is_closed());
        }
        assert!(plumbing.inlets().is_empty());
        assert!(plumbing.outlets().is_empty());
    }

    #[test]
    fn test_pump_rejects_before_spawning() {
        let result = make_pump(
            [Cursor::new(b"never read".to_vec())],
            [Destination::with_flags(SharedBuffer::new(), ["fast"])],
        );

        assert!(matches!(
            result,
            Err(Error::UnrecognizedOption { destination: 0, .. })
        ));
    }

    #[test]
    fn test_pump_needs_a_source() {
        let destination = SharedBuffer::new();
        let result = make_pump(
            Vec::<Cursor<Vec<u8>>>::new(),
            [Destination::with_flags(destination.clone(), ["async", "close-on-eof"])],
        );

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(!destination.is_closed());
    }

    #[test]
    fn test_detached_outlets_are_released_not_closed() {
        let sync = SharedBuffer::new();
        let feeder = SharedBuffer::new();
        let destinations = resolve_all([
            Destination::new(sync.clone(), OutletOptions::new().close_on_eof(true)),
            Destination::with_flags(feeder.clone(), ["async", "close-on-eof"]),
        ])
        .unwrap();

        let plumbing = Plumbing::new();
        let outlets = attach_outlets(&plumbing, destinations).unwrap();
        assert_eq!(outlets.len(), 2);

        detach_outlets(&plumbing, &outlets);
        plumbing.join();

        assert!(plumbing.outlets().is_empty());
        assert!(!sync.is_closed());
        assert!(!feeder.is_closed());
        assert!(sync.contents().is_empty());
        assert!(feeder.contents().is_empty());
    }

    #[test]
    fn test_tap_mirrors_and_exposes() {
        let mirror = SharedBuffer::new();
        let mut tap = make_tap(Cursor::new(b"tapped stream".to_vec()), mirror.clone(), true).unwrap();

        let mut out = String::new();
        tap.read_to_string(&mut out).unwrap();

        assert_eq!(out, "tapped stream");
        assert_eq!(mirror.contents(), b"tapped stream");
        assert!(mirror.is_closed());
    }

    #[test]
    fn test_destination_debug() {
        let destination = Destination::with_flags(Vec::new(), ["async"]);
        let text = format!("{:?}", destination);

        assert!(text.contains("async"));
    }
}
