//! Host callables
//!
//! A host function is a named, reference-counted closure over host values.
//! Weak handles exist so embedders can observe when the last strong
//! reference (including registry pins) is gone.

use std::rc::{Rc, Weak};

use crate::exception::HostResult;
use crate::value::HostValue;

type HostFnBody = Box<dyn Fn(&[HostValue]) -> HostResult<HostValue>>;

struct FunctionData {
    name: String,
    body: HostFnBody,
}

impl std::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A reference-counted host callable.
#[derive(Debug, Clone)]
pub struct HostFunction {
    data: Rc<FunctionData>,
}

impl HostFunction {
    /// Create a named callable from a closure.
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[HostValue]) -> HostResult<HostValue> + 'static,
    ) -> Self {
        Self {
            data: Rc::new(FunctionData {
                name: name.into(),
                body: Box::new(body),
            }),
        }
    }

    /// The callable's name.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Invoke the callable.
    pub fn call(&self, args: &[HostValue]) -> HostResult<HostValue> {
        (self.data.body)(args)
    }

    /// Downgrade to a weak handle that does not keep the callable alive.
    pub fn downgrade(&self) -> WeakHostFunction {
        WeakHostFunction {
            data: Rc::downgrade(&self.data),
        }
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    /// Whether two handles refer to the same callable object.
    pub fn same_object(&self, other: &HostFunction) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

/// A weak handle to a host callable.
#[derive(Debug, Clone)]
pub struct WeakHostFunction {
    data: Weak<FunctionData>,
}

impl WeakHostFunction {
    /// Whether any strong reference to the callable still exists.
    pub fn is_alive(&self) -> bool {
        self.data.strong_count() > 0
    }

    /// Recover a strong handle if the callable is still alive.
    pub fn upgrade(&self) -> Option<HostFunction> {
        self.data.upgrade().map(|data| HostFunction { data })
    }
}
