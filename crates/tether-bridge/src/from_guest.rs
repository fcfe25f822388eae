//! The reverse dispatcher: guest values into host values
//!
//! Symmetric to host->guest conversion: a guest proxy backed by a host
//! value unwraps to the original (identity preserved), errors translate,
//! and anything else heap-backed becomes a rooted host-visible guest
//! reference.

use std::rc::Rc;

use tether_engine::{Handle, Value};
use tether_host::{HostStr, HostValue};

use crate::errors::BridgeResult;
use crate::proxy::{GuestFnProxy, GuestObjProxy};
use crate::transcode;
use crate::Bridge;

impl Bridge {
    /// Convert a guest value to a host value.
    pub fn host_from_guest(&mut self, value: &Value) -> BridgeResult<HostValue> {
        match value {
            Value::Bool(b) => Ok(HostValue::Bool(*b)),
            Value::Number(n) => Ok(number_to_host(*n)),
            Value::BigInt(i) => Ok(HostValue::bigint(*i)),
            Value::Null => Ok(HostValue::Null),
            Value::Undefined => Ok(HostValue::None),
            Value::String(handle) => {
                let units = self.engine.string_units(*handle)?;
                let scalars = transcode::utf16_to_scalars(&units);
                Ok(HostValue::Str(HostStr::from_scalars(&scalars)))
            }
            Value::Object(handle) => self.host_from_guest_object(*handle),
        }
    }

    fn host_from_guest_object(&mut self, handle: Handle) -> BridgeResult<HostValue> {
        // A host-backed proxy passed back: unwrap to the original host
        // value instead of wrapping the wrapper.
        if self.engine.is_proxy(handle) {
            if let Ok(target) = self.proxy_target(handle) {
                return Ok(target.to_host_value());
            }
        }

        if self.engine.is_error(handle) {
            return Ok(HostValue::Exception(
                self.host_exception_from_guest(handle)?,
            ));
        }

        if self.engine.is_function(handle) {
            let root = self.engine.root(handle);
            return Ok(HostValue::Embedded(Rc::new(GuestFnProxy::new(root))));
        }

        let root = self.engine.root(handle);
        Ok(HostValue::Embedded(Rc::new(GuestObjProxy::new(root))))
    }
}

/// A finite number with no fractional part in machine-integer range reads
/// back as a host integer; everything else stays a float.
fn number_to_host(n: f64) -> HostValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
        HostValue::int(n as i64)
    } else {
        HostValue::Float(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_host_integrality() {
        assert!(matches!(number_to_host(3.0), HostValue::Int(i) if i.value() == 3));
        assert!(matches!(number_to_host(-0.0), HostValue::Int(i) if i.value() == 0));
        assert!(matches!(number_to_host(3.5), HostValue::Float(_)));
        assert!(matches!(number_to_host(f64::NAN), HostValue::Float(_)));
        assert!(matches!(number_to_host(f64::INFINITY), HostValue::Float(_)));
        assert!(matches!(number_to_host(1e300), HostValue::Float(_)));
    }
}
