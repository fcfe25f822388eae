//! The lifetime registry
//!
//! The registry is the only place that holds host references on behalf of
//! the guest engine. Pinning stores an `Rc` clone keyed by the guest
//! wrapper's handle; the engine's finalization hook releases every hold for
//! a swept handle. Nothing outside this module touches refcounts at the
//! boundary.
//!
//! The memo table gives identity-idempotent conversions for the kinds that
//! opt in (strings, buffers): repeated conversion of the same host object
//! returns the recorded guest value until the wrapper is finalized.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tether_engine::{Handle, Value};
use tether_host::{HostId, HostValue};

#[derive(Default)]
struct PinTable {
    /// Host references held while the keyed guest handle is reachable.
    pins: FxHashMap<Handle, Vec<HostValue>>,
    /// Host identity -> recorded guest value for idempotent conversions.
    memo: FxHashMap<HostId, Value>,
    /// Which memo entries a guest handle owns, for release on finalize.
    memo_owners: FxHashMap<Handle, Vec<HostId>>,
    /// Holds with no guest handle to key them on; released at teardown.
    detached: Vec<HostValue>,
}

impl PinTable {
    fn release(&mut self, handle: Handle) {
        self.pins.remove(&handle);
        if let Some(ids) = self.memo_owners.remove(&handle) {
            for id in ids {
                self.memo.remove(&id);
            }
        }
    }
}

/// Pinning and memoization table coupling the two collectors.
///
/// Bridge-scoped: constructed with the bridge, emptied by [`teardown`].
/// Single-threaded by contract; never consulted concurrently.
///
/// [`teardown`]: LifetimeRegistry::teardown
#[derive(Default)]
pub struct LifetimeRegistry {
    table: Rc<RefCell<PinTable>>,
}

impl LifetimeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The finalization hook to install on the guest engine.
    pub(crate) fn finalize_hook(&self) -> impl Fn(Handle) + 'static {
        let table = Rc::clone(&self.table);
        move |handle| table.borrow_mut().release(handle)
    }

    /// Record that `handle`'s reachability keeps `value` alive. Safe to
    /// call repeatedly for the same pair; every call adds one hold.
    pub fn pin(&self, value: &HostValue, handle: Handle) {
        self.table
            .borrow_mut()
            .pins
            .entry(handle)
            .or_default()
            .push(value.clone());
    }

    /// Hold `value` with no guest handle to key it on; released only at
    /// teardown.
    pub fn pin_detached(&self, value: &HostValue) {
        self.table.borrow_mut().detached.push(value.clone());
    }

    /// Record the guest value produced for a host object, keyed by host
    /// identity. Entries keyed to a guest handle are dropped when that
    /// handle is finalized; handle-less entries live until teardown.
    pub fn memoize(&self, value: &HostValue, guest: Value) {
        let Some(id) = value.identity() else { return };
        let mut table = self.table.borrow_mut();
        if let Some(handle) = guest.handle() {
            table.memo_owners.entry(handle).or_default().push(id);
        }
        table.memo.insert(id, guest);
    }

    /// The recorded guest value for a host object, if any.
    pub fn lookup(&self, value: &HostValue) -> Option<Value> {
        let id = value.identity()?;
        self.table.borrow().memo.get(&id).cloned()
    }

    /// Release every hold recorded for `handle`.
    pub fn unpin(&self, handle: Handle) {
        self.table.borrow_mut().release(handle);
    }

    /// Whether any hold is recorded for `handle`.
    pub fn is_pinned(&self, handle: Handle) -> bool {
        self.table.borrow().pins.contains_key(&handle)
    }

    /// Number of guest handles with recorded holds.
    pub fn pinned_handles(&self) -> usize {
        self.table.borrow().pins.len()
    }

    /// Total number of host references currently held.
    pub fn held_refs(&self) -> usize {
        let table = self.table.borrow();
        table.pins.values().map(Vec::len).sum::<usize>() + table.detached.len()
    }

    /// Drop every pin and memo entry.
    pub fn teardown(&self) {
        let mut table = self.table.borrow_mut();
        table.pins.clear();
        table.memo.clear();
        table.memo_owners.clear();
        table.detached.clear();
    }
}

impl std::fmt::Debug for LifetimeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.borrow();
        f.debug_struct("LifetimeRegistry")
            .field("pinned_handles", &table.pins.len())
            .field("memo_entries", &table.memo.len())
            .field("detached_holds", &table.detached.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> Handle {
        // Handles are opaque; tests mint them through an engine.
        let mut engine = tether_engine::Engine::new();
        engine.new_plain().unwrap()
    }

    #[test]
    fn test_pin_and_release() {
        let registry = LifetimeRegistry::new();
        let value = HostValue::str("pinned");
        let h = handle();

        registry.pin(&value, h);
        registry.pin(&value, h);
        assert!(registry.is_pinned(h));
        assert_eq!(registry.held_refs(), 2);

        registry.unpin(h);
        assert!(!registry.is_pinned(h));
        assert_eq!(registry.held_refs(), 0);
    }

    #[test]
    fn test_memo_round_trip() {
        let registry = LifetimeRegistry::new();
        let value = HostValue::str("memo");
        let h = handle();

        assert!(registry.lookup(&value).is_none());
        registry.memoize(&value, Value::String(h));
        assert_eq!(registry.lookup(&value), Some(Value::String(h)));

        // A distinct string with equal contents is a different identity.
        let other = HostValue::str("memo");
        assert!(registry.lookup(&other).is_none());

        registry.unpin(h);
        assert!(registry.lookup(&value).is_none());
    }

    #[test]
    fn test_handleless_memo_survives_unpin() {
        let registry = LifetimeRegistry::new();
        let value = HostValue::Buffer(tether_host::HostBuffer::new(
            vec![1],
            tether_host::ItemFormat::Other("q".into()),
        ));
        registry.memoize(&value, Value::Null);
        registry.pin_detached(&value);

        registry.unpin(handle());
        assert_eq!(registry.lookup(&value), Some(Value::Null));
        assert_eq!(registry.held_refs(), 1);

        registry.teardown();
        assert!(registry.lookup(&value).is_none());
        assert_eq!(registry.held_refs(), 0);
    }

    #[test]
    fn test_primitives_are_not_memoized() {
        let registry = LifetimeRegistry::new();
        registry.memoize(&HostValue::int(3), Value::Number(3.0));
        assert!(registry.lookup(&HostValue::int(3)).is_none());
    }
}
