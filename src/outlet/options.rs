//! Push-outlet options

use crate::error::{Error, Result};

/// Flag name for [`OutletOptions::close_on_eof`]
pub const FLAG_CLOSE_ON_EOF: &str = "close-on-eof";

/// Flag name for [`OutletOptions::asynchronous`]
pub const FLAG_ASYNC: &str = "async";

/// How a push outlet treats its destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutletOptions {
    /// Close the destination once the plumbing has no inlets left
    pub close_on_eof: bool,

    /// Write the destination from a dedicated feeder thread instead of
    /// inside the registry lock
    pub asynchronous: bool,
}

impl OutletOptions {
    /// Synchronous outlet that leaves its destination open
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the destination is closed on end-of-stream
    pub fn close_on_eof(mut self, close: bool) -> Self {
        self.close_on_eof = close;
        self
    }

    /// Set whether the outlet uses a feeder thread
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Build options from flag names.
    ///
    /// Accepts `"close-on-eof"` and `"async"`; any other flag is rejected.
    /// The error reports destination index 0; combinators rewrite it to the
    /// index of the destination being validated.
    pub fn from_flags<I, S>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();

        for flag in flags {
            match flag.as_ref() {
                FLAG_CLOSE_ON_EOF => options.close_on_eof = true,
                FLAG_ASYNC => options.asynchronous = true,
                other => {
                    return Err(Error::UnrecognizedOption {
                        destination: 0,
                        option: other.to_string(),
                    })
                }
            }
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = OutletOptions::default();

        assert!(!options.close_on_eof);
        assert!(!options.asynchronous);
    }

    #[test]
    fn test_builder() {
        let options = OutletOptions::new().close_on_eof(true).asynchronous(true);

        assert!(options.close_on_eof);
        assert!(options.asynchronous);
    }

    #[test]
    fn test_from_flags() {
        let options = OutletOptions::from_flags(["async", "close-on-eof"]).unwrap();
        assert_eq!(options, OutletOptions::new().close_on_eof(true).asynchronous(true));

        let options = OutletOptions::from_flags(Vec::<String>::new()).unwrap();
        assert_eq!(options, OutletOptions::default());
    }

    #[test]
    fn test_from_flags_unrecognized() {
        let result = OutletOptions::from_flags(["close-on-eof", "lazy"]);

        match result {
            Err(Error::UnrecognizedOption { option, .. }) => assert_eq!(option, "lazy"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
