//! Proxy bridging
//!
//! Guest-visible proxies carry their backing host container or callable in
//! the engine's opaque embedder slot; every operation reads the live host
//! object at access time, and writes mutate it in place. Host-visible
//! proxies hold a rooted guest handle and forward attribute access and
//! calls into the engine.
//!
//! A proxy's backing never changes for its lifetime, and converting a proxy
//! back across the boundary unwraps the original value rather than
//! re-wrapping.

use std::any::Any;
use std::rc::Rc;

use tether_engine::{EngineError, Handle, RootGuard, Value};
use tether_host::{HostDict, HostEmbedded, HostException, HostFunction, HostList, HostValue};

use crate::errors::{BridgeError, BridgeResult};
use crate::Bridge;

/// A property key on a guest proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    /// A numeric index.
    Index(usize),
    /// A named property.
    Name(String),
}

impl PropKey {
    /// A named key.
    pub fn name(name: impl Into<String>) -> Self {
        PropKey::Name(name.into())
    }

    /// Mapping keys are always strings; indices stringify.
    fn as_mapping_key(&self) -> String {
        match self {
            PropKey::Index(i) => i.to_string(),
            PropKey::Name(n) => n.clone(),
        }
    }
}

/// The backing of a guest-visible proxy, stored in the engine's embedder
/// slot.
pub(crate) enum ProxyTarget {
    /// A live host ordered sequence.
    Sequence(HostList),
    /// A live host key/value mapping.
    Mapping(HostDict),
    /// A live host callable.
    Callable(HostFunction),
}

impl ProxyTarget {
    /// The backing value as a host value; shares the original allocation,
    /// so identity is preserved on unwrap.
    pub(crate) fn to_host_value(&self) -> HostValue {
        match self {
            ProxyTarget::Sequence(list) => HostValue::List(list.clone()),
            ProxyTarget::Mapping(dict) => HostValue::Dict(dict.clone()),
            ProxyTarget::Callable(func) => HostValue::Function(func.clone()),
        }
    }
}

/// A host-visible reference to a guest object; attribute access forwards to
/// the engine. The guest handle stays rooted for the proxy's lifetime.
#[derive(Debug)]
pub struct GuestObjProxy {
    root: RootGuard,
}

impl GuestObjProxy {
    pub(crate) fn new(root: RootGuard) -> Self {
        Self { root }
    }

    /// The underlying guest handle.
    pub fn handle(&self) -> Handle {
        self.root.handle()
    }
}

impl HostEmbedded for GuestObjProxy {
    fn type_name(&self) -> &str {
        "guest.Object"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A host-visible reference to a guest function; calls forward to the
/// engine. The guest handle stays rooted for the proxy's lifetime.
#[derive(Debug)]
pub struct GuestFnProxy {
    root: RootGuard,
}

impl GuestFnProxy {
    pub(crate) fn new(root: RootGuard) -> Self {
        Self { root }
    }

    /// The underlying guest handle.
    pub fn handle(&self) -> Handle {
        self.root.handle()
    }
}

impl HostEmbedded for GuestFnProxy {
    fn type_name(&self) -> &str {
        "guest.Function"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The guest handle behind a previously-bridged guest reference, if `value`
/// is one.
pub(crate) fn guest_ref_handle(value: &HostValue) -> Option<Handle> {
    let HostValue::Embedded(embedded) = value else {
        return None;
    };
    if let Some(func) = embedded.as_any().downcast_ref::<GuestFnProxy>() {
        Some(func.handle())
    } else {
        embedded
            .as_any()
            .downcast_ref::<GuestObjProxy>()
            .map(GuestObjProxy::handle)
    }
}

impl Bridge {
    /// Build a fresh sequence proxy over a live host list.
    pub(crate) fn convert_sequence(&mut self, list: &HostList) -> BridgeResult<Value> {
        let slot: Rc<dyn Any> = Rc::new(ProxyTarget::Sequence(list.clone()));
        Ok(Value::Object(self.engine.new_proxy(slot)?))
    }

    /// Build a fresh mapping proxy over a live host dict.
    pub(crate) fn convert_mapping(&mut self, dict: &HostDict) -> BridgeResult<Value> {
        let slot: Rc<dyn Any> = Rc::new(ProxyTarget::Mapping(dict.clone()));
        Ok(Value::Object(self.engine.new_proxy(slot)?))
    }

    /// Wrap a host callable in a guest callable proxy and pin it: the
    /// callable survives host-side scope exit until this wrapper is
    /// finalized.
    pub(crate) fn convert_function(&mut self, func: &HostFunction) -> BridgeResult<Value> {
        let slot: Rc<dyn Any> = Rc::new(ProxyTarget::Callable(func.clone()));
        let handle = self.engine.new_proxy(slot)?;
        self.registry.pin(&HostValue::Function(func.clone()), handle);
        Ok(Value::Object(handle))
    }

    pub(crate) fn proxy_target(&self, handle: Handle) -> BridgeResult<Rc<ProxyTarget>> {
        let slot = self.engine.proxy_slot(handle)?;
        slot.downcast::<ProxyTarget>()
            .map_err(|_| {
                BridgeError::Engine(EngineError::KindMismatch {
                    expected: "bridge proxy",
                    got: "foreign proxy",
                })
            })
    }

    /// Element or entry count of a container proxy.
    pub fn proxy_len(&mut self, handle: Handle) -> BridgeResult<usize> {
        match &*self.proxy_target(handle)? {
            ProxyTarget::Sequence(list) => Ok(list.len()),
            ProxyTarget::Mapping(dict) => Ok(dict.len()),
            ProxyTarget::Callable(_) => Err(BridgeError::Engine(EngineError::KindMismatch {
                expected: "container proxy",
                got: "callable proxy",
            })),
        }
    }

    /// Read through a container proxy. Missing members read as undefined.
    pub fn proxy_get(&mut self, handle: Handle, key: &PropKey) -> BridgeResult<Value> {
        let target = self.proxy_target(handle)?;
        match (&*target, key) {
            (ProxyTarget::Sequence(list), PropKey::Index(index)) => match list.get(*index) {
                Some(item) => self.convert(&item),
                None => Ok(Value::Undefined),
            },
            (ProxyTarget::Sequence(list), PropKey::Name(name)) if name == "length" => {
                Ok(Value::Number(list.len() as f64))
            }
            (ProxyTarget::Sequence(_), PropKey::Name(_)) => Ok(Value::Undefined),
            (ProxyTarget::Mapping(dict), key) => match dict.get(&key.as_mapping_key()) {
                Some(item) => self.convert(&item),
                None => Ok(Value::Undefined),
            },
            (ProxyTarget::Callable(_), _) => Ok(Value::Undefined),
        }
    }

    /// Write through a container proxy, mutating the backing host container
    /// in place.
    pub fn proxy_set(&mut self, handle: Handle, key: &PropKey, value: &Value) -> BridgeResult<()> {
        let target = self.proxy_target(handle)?;
        let host_value = self.host_from_guest(value)?;
        match (&*target, key) {
            (ProxyTarget::Sequence(list), PropKey::Index(index)) => {
                if list.set(*index, host_value.clone()) {
                    Ok(())
                } else if *index == list.len() {
                    list.push(host_value);
                    Ok(())
                } else {
                    Err(BridgeError::Host(HostException::index(
                        "sequence assignment index out of range",
                    )))
                }
            }
            (ProxyTarget::Sequence(_), PropKey::Name(_)) => {
                Err(BridgeError::Host(HostException::type_error(
                    "sequence proxies only accept numeric indices",
                )))
            }
            (ProxyTarget::Mapping(dict), key) => {
                dict.set(key.as_mapping_key(), host_value);
                Ok(())
            }
            (ProxyTarget::Callable(_), _) => {
                Err(BridgeError::Engine(EngineError::KindMismatch {
                    expected: "container proxy",
                    got: "callable proxy",
                }))
            }
        }
    }

    /// Membership test through a container proxy.
    pub fn proxy_has(&mut self, handle: Handle, key: &PropKey) -> BridgeResult<bool> {
        match (&*self.proxy_target(handle)?, key) {
            (ProxyTarget::Sequence(list), PropKey::Index(index)) => Ok(*index < list.len()),
            (ProxyTarget::Sequence(_), PropKey::Name(name)) => Ok(name == "length"),
            (ProxyTarget::Mapping(dict), key) => Ok(dict.contains_key(&key.as_mapping_key())),
            (ProxyTarget::Callable(_), _) => Ok(false),
        }
    }

    /// Delete through a mapping proxy; deletion is not defined for
    /// sequences.
    pub fn proxy_delete(&mut self, handle: Handle, key: &PropKey) -> BridgeResult<bool> {
        match &*self.proxy_target(handle)? {
            ProxyTarget::Mapping(dict) => Ok(dict.remove(&key.as_mapping_key())),
            ProxyTarget::Sequence(_) => Err(BridgeError::Host(HostException::type_error(
                "cannot delete items of a sequence proxy",
            ))),
            ProxyTarget::Callable(_) => Err(BridgeError::Engine(EngineError::KindMismatch {
                expected: "container proxy",
                got: "callable proxy",
            })),
        }
    }

    /// Enumerate the keys of a container proxy, computed from the live
    /// backing container.
    pub fn proxy_keys(&mut self, handle: Handle) -> BridgeResult<Vec<PropKey>> {
        match &*self.proxy_target(handle)? {
            ProxyTarget::Sequence(list) => Ok((0..list.len()).map(PropKey::Index).collect()),
            ProxyTarget::Mapping(dict) => {
                Ok(dict.keys().into_iter().map(PropKey::Name).collect())
            }
            ProxyTarget::Callable(_) => Ok(Vec::new()),
        }
    }

    /// Call a guest callable: either a callable proxy over a host function
    /// (arguments convert guest→host, the result converts back) or a
    /// guest-native function. A host exception surfaces as a thrown guest
    /// error.
    pub fn call(&mut self, target: &Value, args: &[Value]) -> BridgeResult<Value> {
        let handle = target
            .handle()
            .ok_or(BridgeError::Engine(EngineError::NotCallable))?;

        if self.engine.is_proxy(handle) {
            let target = self.proxy_target(handle)?;
            let ProxyTarget::Callable(func) = &*target else {
                return Err(BridgeError::Engine(EngineError::NotCallable));
            };
            let mut host_args = Vec::with_capacity(args.len());
            for arg in args {
                host_args.push(self.host_from_guest(arg)?);
            }
            return match func.call(&host_args) {
                Ok(result) => self.convert(&result),
                Err(exception) => {
                    let error = self.guest_error_from_host(&exception)?;
                    Err(BridgeError::Thrown {
                        error: Value::Object(error),
                    })
                }
            };
        }

        Ok(self.engine.call(handle, args)?)
    }

    /// Read an attribute of a bridged guest object.
    pub fn guest_attr(&mut self, value: &HostValue, name: &str) -> BridgeResult<HostValue> {
        let handle = guest_ref_handle(value).ok_or_else(|| BridgeError::Unsupported {
            type_name: value.type_name().to_string(),
        })?;
        let attr = self.engine.plain_get(handle, name)?.unwrap_or(Value::Undefined);
        self.host_from_guest(&attr)
    }

    /// Write an attribute of a bridged guest object.
    pub fn guest_set_attr(
        &mut self,
        value: &HostValue,
        name: &str,
        attr: &HostValue,
    ) -> BridgeResult<()> {
        let handle = guest_ref_handle(value).ok_or_else(|| BridgeError::Unsupported {
            type_name: value.type_name().to_string(),
        })?;
        let converted = self.convert(attr)?;
        self.engine.plain_set(handle, name, converted)?;
        Ok(())
    }

    /// Call a bridged guest function with host arguments.
    pub fn guest_call(
        &mut self,
        value: &HostValue,
        args: &[HostValue],
    ) -> BridgeResult<HostValue> {
        let handle = guest_ref_handle(value).ok_or_else(|| BridgeError::Unsupported {
            type_name: value.type_name().to_string(),
        })?;
        let mut guest_args = Vec::with_capacity(args.len());
        for arg in args {
            guest_args.push(self.convert(arg)?);
        }
        let result = self.engine.call(handle, &guest_args)?;
        self.host_from_guest(&result)
    }
}
