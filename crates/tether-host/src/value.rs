//! Host value model
//!
//! `HostValue` is the closed set of runtime type tags the bridge dispatches
//! over. Heap-backed kinds are `Rc`-based; cloning a `HostValue` bumps the
//! refcount of the same underlying object, and identity (`HostId`) is the
//! allocation address, which is what the memoization table keys on.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::awaitable::HostAwaitable;
use crate::buffer::HostBuffer;
use crate::exception::HostException;
use crate::function::HostFunction;
use crate::string::HostStr;

/// Stable identity of a heap-backed host value (allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(usize);

/// A host integer: a plain machine integer, or the designated big-integer
/// subtype that escapes the guest safe-integer restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInt {
    value: i128,
    big: bool,
}

impl HostInt {
    /// A plain host integer.
    pub fn new(value: i64) -> Self {
        Self {
            value: i128::from(value),
            big: false,
        }
    }

    /// The big-integer subtype.
    pub fn big(value: i128) -> Self {
        Self { value, big: true }
    }

    /// Whether this is the big-integer subtype.
    pub fn is_big(&self) -> bool {
        self.big
    }

    /// The integer value.
    pub fn value(&self) -> i128 {
        self.value
    }

    /// Whether the magnitude fits the guest's exact-integer range of a
    /// double (53 bits).
    pub fn fits_safe_integer(&self) -> bool {
        self.value.unsigned_abs() < (1u128 << 53)
    }
}

/// An ordered host sequence with interior mutability; cloning shares the
/// same backing storage.
#[derive(Debug, Clone, Default)]
pub struct HostList {
    items: Rc<RefCell<Vec<HostValue>>>,
}

impl HostList {
    /// Create a list from initial items.
    pub fn new(items: Vec<HostValue>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.items.borrow().get(index).cloned()
    }

    /// Replace the element at `index`; false if out of range.
    pub fn set(&self, index: usize, value: HostValue) -> bool {
        let mut items = self.items.borrow_mut();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append an element.
    pub fn push(&self, value: HostValue) {
        self.items.borrow_mut().push(value);
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.items) as usize
    }

    /// Whether two handles refer to the same list object.
    pub fn same_object(&self, other: &HostList) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

/// A string-keyed host mapping preserving insertion order; cloning shares
/// the same backing storage.
#[derive(Debug, Clone, Default)]
pub struct HostDict {
    entries: Rc<RefCell<Vec<(String, HostValue)>>>,
}

impl HostDict {
    /// Create a mapping from initial entries.
    pub fn new(entries: Vec<(String, HostValue)>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(entries)),
        }
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<HostValue> {
        self.entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert or replace `key`, preserving the position of existing keys.
    pub fn set(&self, key: impl Into<String>, value: HostValue) {
        let key = key.into();
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key, value)),
        }
    }

    /// Remove `key`; true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().iter().any(|(k, _)| k == key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.entries) as usize
    }

    /// Whether two handles refer to the same mapping object.
    pub fn same_object(&self, other: &HostDict) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Extension point for host types defined outside this crate.
///
/// The bridge registers its guest-reference proxy types through this trait,
/// the way an extension module registers new types with the host runtime.
pub trait HostEmbedded: 'static {
    /// The runtime type name of the embedded object.
    fn type_name(&self) -> &str;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn HostEmbedded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HostEmbedded({})", self.type_name())
    }
}

/// A host runtime value, tagged by runtime type.
#[derive(Debug, Clone)]
pub enum HostValue {
    /// Host boolean.
    Bool(bool),
    /// Host integer (plain or the big-integer subtype).
    Int(HostInt),
    /// Host float.
    Float(f64),
    /// Host unicode string.
    Str(HostStr),
    /// Host callable.
    Function(HostFunction),
    /// Host exception instance.
    Exception(HostException),
    /// Buffer-protocol object.
    Buffer(HostBuffer),
    /// Ordered sequence.
    List(HostList),
    /// Key/value mapping.
    Dict(HostDict),
    /// The absence sentinel (no value).
    None,
    /// The explicit null value object, distinct from [`HostValue::None`].
    Null,
    /// An awaitable.
    Awaitable(HostAwaitable),
    /// An embedded (extension-defined) object.
    Embedded(Rc<dyn HostEmbedded>),
    /// A host object with no defined bridge mapping, carrying its type name.
    Foreign(Rc<str>),
}

impl HostValue {
    /// A plain host integer.
    pub fn int(value: i64) -> Self {
        HostValue::Int(HostInt::new(value))
    }

    /// The big-integer subtype.
    pub fn bigint(value: i128) -> Self {
        HostValue::Int(HostInt::big(value))
    }

    /// A host string from Rust text.
    pub fn str(text: &str) -> Self {
        HostValue::Str(HostStr::new(text))
    }

    /// A host list from initial items.
    pub fn list(items: Vec<HostValue>) -> Self {
        HostValue::List(HostList::new(items))
    }

    /// A host mapping from initial entries.
    pub fn dict(entries: Vec<(String, HostValue)>) -> Self {
        HostValue::Dict(HostDict::new(entries))
    }

    /// A named host callable.
    pub fn function(
        name: impl Into<String>,
        body: impl Fn(&[HostValue]) -> crate::exception::HostResult<HostValue> + 'static,
    ) -> Self {
        HostValue::Function(HostFunction::new(name, body))
    }

    /// A foreign value with only a type name.
    pub fn foreign(type_name: &str) -> Self {
        HostValue::Foreign(Rc::from(type_name))
    }

    /// The runtime type name, as the host would render it.
    pub fn type_name(&self) -> &str {
        match self {
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "str",
            HostValue::Function(_) => "function",
            HostValue::Exception(_) => "exception",
            HostValue::Buffer(_) => "buffer",
            HostValue::List(_) => "list",
            HostValue::Dict(_) => "dict",
            HostValue::None => "NoneType",
            HostValue::Null => "null",
            HostValue::Awaitable(_) => "awaitable",
            HostValue::Embedded(e) => e.type_name(),
            HostValue::Foreign(name) => name,
        }
    }

    /// Identity of the underlying allocation, for heap-backed kinds.
    pub fn identity(&self) -> Option<HostId> {
        let raw = match self {
            HostValue::Str(s) => s.identity(),
            HostValue::Function(f) => f.identity(),
            HostValue::Buffer(b) => b.identity(),
            HostValue::List(l) => l.identity(),
            HostValue::Dict(d) => d.identity(),
            HostValue::Awaitable(a) => a.identity(),
            HostValue::Embedded(e) => Rc::as_ptr(e) as *const () as usize,
            _ => return None,
        };
        Some(HostId(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(HostValue::Bool(true).type_name(), "bool");
        assert_eq!(HostValue::None.type_name(), "NoneType");
        assert_eq!(HostValue::Null.type_name(), "null");
        assert_eq!(HostValue::foreign("socket").type_name(), "socket");
    }

    #[test]
    fn test_safe_integer_boundary() {
        assert!(HostInt::new((1i64 << 53) - 1).fits_safe_integer());
        assert!(!HostInt::new(1i64 << 53).fits_safe_integer());
        assert!(!HostInt::new(-(1i64 << 53)).fits_safe_integer());
        assert!(HostInt::new(-((1i64 << 53) - 1)).fits_safe_integer());
    }

    #[test]
    fn test_identity_shared_by_clone() {
        let list = HostValue::list(vec![HostValue::int(1)]);
        let alias = list.clone();
        assert_eq!(list.identity(), alias.identity());

        let other = HostValue::list(vec![HostValue::int(1)]);
        assert_ne!(list.identity(), other.identity());
    }

    #[test]
    fn test_primitives_have_no_identity() {
        assert!(HostValue::Bool(true).identity().is_none());
        assert!(HostValue::int(3).identity().is_none());
        assert!(HostValue::None.identity().is_none());
    }

    #[test]
    fn test_dict_preserves_insertion_order() {
        let d = HostDict::new(vec![]);
        d.set("b", HostValue::int(1));
        d.set("a", HostValue::int(2));
        d.set("b", HostValue::int(3));
        assert_eq!(d.keys(), vec!["b".to_string(), "a".to_string()]);
        assert!(matches!(d.get("b"), Some(HostValue::Int(i)) if i.value() == 3));
    }

    #[test]
    fn test_list_mutation_shared() {
        let l = HostList::new(vec![HostValue::int(1)]);
        let alias = l.clone();
        alias.push(HostValue::int(2));
        assert_eq!(l.len(), 2);
    }
}
