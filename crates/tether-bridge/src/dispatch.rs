//! The value dispatcher
//!
//! One closed match over the host value kinds, routing each to its
//! conversion strategy. Ordering matters and mirrors the host's runtime
//! type predicates, where some types satisfy more than one test (a big
//! integer is also an integer; a previously-bridged guest reference is also
//! an object):
//!
//! 1. boolean                      8. buffer-protocol object
//! 2. integer (big or plain)       9. bridged guest object (unwrap)
//! 3. float                       10. sequence / mapping (live proxy)
//! 4. string                      11. absence sentinel -> undefined
//! 5. bridged guest fn (unwrap)   12. null object -> null
//! 6. host callable               13. awaitable
//! 7. exception                   14. anything else -> unsupported

use tether_engine::{ElemKind, Value};
use tether_host::{HostBuffer, HostValue, ItemFormat, WarningCategory};

use crate::errors::{BridgeError, BridgeResult};
use crate::proxy::guest_ref_handle;
use crate::Bridge;

impl Bridge {
    /// Convert a host value to a guest value.
    ///
    /// Wrapper-allocating cases (strings, callables, buffers) register
    /// their pins with the lifetime registry before returning.
    pub fn convert(&mut self, value: &HostValue) -> BridgeResult<Value> {
        match value {
            HostValue::Bool(b) => Ok(Value::Bool(*b)),

            HostValue::Int(int) => {
                if int.is_big() {
                    Ok(Value::BigInt(int.value()))
                } else if int.fits_safe_integer() {
                    Ok(Value::Number(int.value() as f64))
                } else {
                    Err(BridgeError::Overflow)
                }
            }

            HostValue::Float(f) => Ok(Value::Number(*f)),

            HostValue::Str(s) => self.convert_string(s),

            // A guest reference passed back: unwrap to the original handle
            // instead of building a proxy over a proxy.
            HostValue::Embedded(embedded) => match guest_ref_handle(value) {
                Some(handle) => Ok(Value::Object(handle)),
                None => Err(BridgeError::Unsupported {
                    type_name: embedded.type_name().to_string(),
                }),
            },

            HostValue::Function(func) => self.convert_function(func),

            HostValue::Exception(exception) => {
                let error = self.guest_error_from_host(exception)?;
                Ok(Value::Object(error))
            }

            HostValue::Buffer(buffer) => self.convert_buffer(buffer),

            HostValue::List(list) => self.convert_sequence(list),
            HostValue::Dict(dict) => self.convert_mapping(dict),

            HostValue::None => Ok(Value::Undefined),
            HostValue::Null => Ok(Value::Null),

            HostValue::Awaitable(awaitable) => Ok(self.bridge_awaitable(awaitable)),

            HostValue::Foreign(name) => Err(BridgeError::Unsupported {
                type_name: name.to_string(),
            }),
        }
    }

    /// Convert a host value, degrading any failure to a warning.
    ///
    /// Never fails: a conversion error is rendered, emitted once on the
    /// host warning channel, and replaced by the guest null sentinel. A
    /// null return therefore may mean either "the value was null" or "the
    /// conversion failed"; the warning channel distinguishes.
    pub fn convert_safe(&mut self, value: &HostValue) -> Value {
        match self.convert(value) {
            Ok(converted) => converted,
            Err(err) => {
                self.warnings.warn(WarningCategory::Runtime, err.to_string());
                Value::Null
            }
        }
    }

    /// Convert a buffer-protocol object to a typed-array view over the same
    /// bytes. An unexposable item format, or a failed view construction,
    /// yields the null sentinel by contract rather than an error; the
    /// result is memoized either way.
    fn convert_buffer(&mut self, buffer: &HostBuffer) -> BridgeResult<Value> {
        let host = HostValue::Buffer(buffer.clone());
        if let Some(hit) = self.registry.lookup(&host) {
            return Ok(hit);
        }

        let guest = match elem_kind(buffer.format()) {
            Some(elem) => match self.engine.new_typed_array(elem, buffer.bytes()) {
                Ok(handle) => Value::Object(handle),
                Err(_) => Value::Null,
            },
            None => Value::Null,
        };

        match guest.handle() {
            Some(handle) => self.registry.pin(&host, handle),
            None => self.registry.pin_detached(&host),
        }
        self.registry.memoize(&host, guest.clone());
        Ok(guest)
    }
}

/// Typed-array element kind for a buffer item format, if it has one.
fn elem_kind(format: &ItemFormat) -> Option<ElemKind> {
    match format {
        ItemFormat::U8 => Some(ElemKind::U8),
        ItemFormat::I8 => Some(ElemKind::I8),
        ItemFormat::U16 => Some(ElemKind::U16),
        ItemFormat::I16 => Some(ElemKind::I16),
        ItemFormat::U32 => Some(ElemKind::U32),
        ItemFormat::I32 => Some(ElemKind::I32),
        ItemFormat::F32 => Some(ElemKind::F32),
        ItemFormat::F64 => Some(ElemKind::F64),
        ItemFormat::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_kind_table() {
        assert_eq!(elem_kind(&ItemFormat::F64), Some(ElemKind::F64));
        assert_eq!(elem_kind(&ItemFormat::U8), Some(ElemKind::U8));
        assert_eq!(elem_kind(&ItemFormat::Other("q".into())), None);
    }
}
