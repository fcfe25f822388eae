//! Host awaitables
//!
//! An awaitable is a shared cell that starts pending and settles exactly
//! once, either with a host value or with a host exception. The bridge polls
//! it from a guest job; the host side drives settlement.

use std::cell::RefCell;
use std::rc::Rc;

use crate::exception::HostException;
use crate::value::HostValue;

/// Settlement state of an awaitable.
#[derive(Debug, Clone)]
pub enum AwaitableState {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Resolved(HostValue),
    /// Settled with an exception.
    Failed(HostException),
}

/// A reference-counted host awaitable.
#[derive(Debug, Clone)]
pub struct HostAwaitable {
    state: Rc<RefCell<AwaitableState>>,
}

impl Default for HostAwaitable {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAwaitable {
    /// Create a pending awaitable.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(AwaitableState::Pending)),
        }
    }

    /// Settle with a value. Later settlements are ignored.
    pub fn resolve(&self, value: HostValue) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, AwaitableState::Pending) {
            *state = AwaitableState::Resolved(value);
        }
    }

    /// Settle with an exception. Later settlements are ignored.
    pub fn fail(&self, exception: HostException) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, AwaitableState::Pending) {
            *state = AwaitableState::Failed(exception);
        }
    }

    /// Snapshot the current state.
    pub fn state(&self) -> AwaitableState {
        self.state.borrow().clone()
    }

    /// Whether the awaitable has settled.
    pub fn is_settled(&self) -> bool {
        !matches!(self.state(), AwaitableState::Pending)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.state) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_once() {
        let a = HostAwaitable::new();
        assert!(!a.is_settled());

        a.resolve(HostValue::int(1));
        a.resolve(HostValue::int(2));
        match a.state() {
            AwaitableState::Resolved(HostValue::Int(i)) => assert_eq!(i.value(), 1),
            other => panic!("unexpected state: {other:?}"),
        }

        a.fail(HostException::runtime("late"));
        assert!(matches!(a.state(), AwaitableState::Resolved(_)));
    }

    #[test]
    fn test_failure_state() {
        let a = HostAwaitable::new();
        a.fail(HostException::runtime("boom"));
        assert!(matches!(a.state(), AwaitableState::Failed(e) if e.message() == "boom"));
    }

    #[test]
    fn test_clones_share_the_cell() {
        let a = HostAwaitable::new();
        let alias = a.clone();
        alias.resolve(HostValue::Bool(true));
        assert!(a.is_settled());
    }
}
