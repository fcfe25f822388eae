//! Error translation
//!
//! A host exception becomes a guest error object carrying the same message
//! and displayable type name; a guest error becomes a host exception of the
//! mapped kind. Translation failure is fatal to the enclosing conversion —
//! it never degrades on its own, so a failing error path cannot produce a
//! silent second failure.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tether_engine::Handle;
use tether_host::{ExceptionKind, HostException};

use crate::errors::{BridgeError, BridgeResult};
use crate::Bridge;

/// Guest error names with a designated host exception kind. Names outside
/// this table keep their spelling as a custom kind.
static GUEST_ERROR_KINDS: Lazy<FxHashMap<&'static str, ExceptionKind>> = Lazy::new(|| {
    let mut kinds = FxHashMap::default();
    kinds.insert("TypeError", ExceptionKind::Type);
    kinds.insert("RangeError", ExceptionKind::Value);
    kinds.insert("SyntaxError", ExceptionKind::Syntax);
    kinds.insert("ReferenceError", ExceptionKind::Runtime);
    kinds.insert("Error", ExceptionKind::Runtime);
    kinds
});

impl Bridge {
    /// Build a guest error object from a host exception.
    pub(crate) fn guest_error_from_host(
        &mut self,
        exception: &HostException,
    ) -> BridgeResult<Handle> {
        Ok(self
            .engine
            .new_error(exception.kind_name(), exception.message())?)
    }

    /// Build a host exception from a guest error object.
    pub(crate) fn host_exception_from_guest(
        &self,
        handle: Handle,
    ) -> BridgeResult<HostException> {
        let error = self
            .engine
            .error(handle)
            .map_err(|err| BridgeError::Translation {
                detail: err.to_string(),
            })?;
        let kind = GUEST_ERROR_KINDS
            .get(error.name.as_str())
            .cloned()
            .unwrap_or_else(|| ExceptionKind::Other(error.name.clone()));
        Ok(HostException::new(kind, error.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bridge;

    #[test]
    fn test_host_exception_to_guest_error() {
        let mut bridge = Bridge::new();
        let exc = HostException::value_error("boom");
        let handle = bridge.guest_error_from_host(&exc).unwrap();

        let error = bridge.engine().error(handle).unwrap();
        assert_eq!(error.name, "ValueError");
        assert_eq!(error.message, "boom");
    }

    #[test]
    fn test_guest_error_to_mapped_host_kind() {
        let mut bridge = Bridge::new();
        let handle = bridge
            .engine_mut()
            .new_error("TypeError", "not a function")
            .unwrap();
        let exc = bridge.host_exception_from_guest(handle).unwrap();
        assert_eq!(exc.kind(), &ExceptionKind::Type);
        assert_eq!(exc.message(), "not a function");
    }

    #[test]
    fn test_unknown_guest_error_name_is_preserved() {
        let mut bridge = Bridge::new();
        let handle = bridge
            .engine_mut()
            .new_error("AggregateError", "all failed")
            .unwrap();
        let exc = bridge.host_exception_from_guest(handle).unwrap();
        assert_eq!(exc.kind_name(), "AggregateError");
    }

    #[test]
    fn test_non_error_object_is_fatal() {
        let mut bridge = Bridge::new();
        let handle = bridge.engine_mut().new_plain().unwrap();
        let err = bridge.host_exception_from_guest(handle).unwrap_err();
        assert!(matches!(err, BridgeError::Translation { .. }));
    }
}
