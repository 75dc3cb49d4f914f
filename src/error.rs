//! Error types
//!
//! Errors are only ever returned synchronously from construction calls
//! (attaching endpoints, building combinators). A running plumbing never
//! reports failures to unrelated callers; a failing endpoint is removed
//! and the event is logged instead.

use std::io;

use thiserror::Error;

use crate::registry::EndpointId;

/// Result type for plumbing construction
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for plumbing construction and introspection
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed argument (e.g. a zero inlet or outlet count)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A destination specification carried a flag outside the defined set
    #[error("unrecognized option {option:?} in destination #{destination}")]
    UnrecognizedOption {
        /// Index of the offending destination in the list passed to the combinator
        destination: usize,
        /// The flag as given
        option: String,
    },

    /// The endpoint reference belongs to a different plumbing
    #[error("endpoint {endpoint} does not belong to plumbing #{plumbing}")]
    ForeignEndpoint {
        /// Endpoint that was queried
        endpoint: EndpointId,
        /// Plumbing that was asked
        plumbing: u64,
    },

    /// A background thread could not be started
    #[error("failed to spawn plumbing thread: {0}")]
    Spawn(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_option_display() {
        let err = Error::UnrecognizedOption {
            destination: 2,
            option: "lazy".into(),
        };

        assert_eq!(
            err.to_string(),
            "unrecognized option \"lazy\" in destination #2"
        );
    }

    #[test]
    fn test_spawn_source() {
        use std::error::Error as _;

        let err = Error::Spawn(io::Error::new(io::ErrorKind::Other, "no threads"));
        assert!(err.source().is_some());
    }
}
