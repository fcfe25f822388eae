//! Bridge error taxonomy
//!
//! Strict conversion surfaces these through `Result`; safe conversion
//! renders them into a warning plus the guest null sentinel. Crossing back
//! into the host, every bridge error maps onto a host exception so callers
//! can use the host's native propagation.

use tether_engine::{EngineError, Value};
use tether_host::HostException;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors produced by the conversion core.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The host value's runtime type has no defined guest mapping.
    #[error("cannot convert host values of type: {type_name}")]
    Unsupported {
        /// Runtime type name of the rejected value.
        type_name: String,
    },

    /// A plain integer outside the guest's exact-integer range.
    #[error(
        "absolute value of the integer exceeds the guest safe-integer range; \
         use the big-integer type instead"
    )]
    Overflow,

    /// An exception instance could not be mapped across the boundary.
    #[error("error translation failed: {detail}")]
    Translation {
        /// What could not be translated.
        detail: String,
    },

    /// A guest engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A host exception crossed into a bridged operation.
    #[error(transparent)]
    Host(#[from] HostException),

    /// A guest error object was thrown during a bridged call.
    #[error("guest exception thrown during a bridged call")]
    Thrown {
        /// The thrown guest error value.
        error: Value,
    },
}

impl From<BridgeError> for HostException {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Overflow => HostException::overflow(err.to_string()),
            BridgeError::Unsupported { .. } | BridgeError::Translation { .. } => {
                HostException::type_error(err.to_string())
            }
            BridgeError::Host(exc) => exc,
            BridgeError::Engine(_) | BridgeError::Thrown { .. } => {
                HostException::runtime(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_host::ExceptionKind;

    #[test]
    fn test_unsupported_names_the_type() {
        let err = BridgeError::Unsupported {
            type_name: "socket".into(),
        };
        assert_eq!(err.to_string(), "cannot convert host values of type: socket");
    }

    #[test]
    fn test_host_exception_mapping() {
        let exc = HostException::from(BridgeError::Overflow);
        assert_eq!(exc.kind(), &ExceptionKind::Overflow);

        let exc = HostException::from(BridgeError::Unsupported {
            type_name: "socket".into(),
        });
        assert_eq!(exc.kind(), &ExceptionKind::Type);

        let original = HostException::value_error("boom");
        let exc = HostException::from(BridgeError::Host(original.clone()));
        assert_eq!(exc, original);
    }
}
