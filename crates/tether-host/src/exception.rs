//! Host exceptions and the warning channel
//!
//! Host errors propagate as ordinary Rust values (`Result`/`?`); the warning
//! channel carries non-fatal diagnostics, which is what safe conversion
//! degrades failures into.

use std::cell::RefCell;
use std::rc::Rc;

/// Result type for host-side operations.
pub type HostResult<T> = Result<T, HostException>;

/// Host exception kinds, named the way the host runtime renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Wrong runtime type for an operation.
    Type,
    /// Right type, unacceptable value.
    Value,
    /// Arithmetic result outside the representable range.
    Overflow,
    /// Generic runtime failure.
    Runtime,
    /// Missing mapping key.
    Key,
    /// Sequence index out of range.
    Index,
    /// Malformed input.
    Syntax,
    /// A kind outside the built-in set, preserved by name.
    Other(String),
}

impl ExceptionKind {
    /// Displayable kind name, e.g. `ValueError`.
    pub fn name(&self) -> &str {
        match self {
            ExceptionKind::Type => "TypeError",
            ExceptionKind::Value => "ValueError",
            ExceptionKind::Overflow => "OverflowError",
            ExceptionKind::Runtime => "RuntimeError",
            ExceptionKind::Key => "KeyError",
            ExceptionKind::Index => "IndexError",
            ExceptionKind::Syntax => "SyntaxError",
            ExceptionKind::Other(name) => name,
        }
    }
}

/// A host exception instance: a kind plus a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}", .kind.name(), .message)]
pub struct HostException {
    kind: ExceptionKind,
    message: String,
}

impl HostException {
    /// Create an exception of an arbitrary kind.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Type, message)
    }

    /// Shorthand for a `ValueError`.
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Value, message)
    }

    /// Shorthand for an `OverflowError`.
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Overflow, message)
    }

    /// Shorthand for a `RuntimeError`.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Runtime, message)
    }

    /// Shorthand for an `IndexError`.
    pub fn index(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Index, message)
    }

    /// The exception kind.
    pub fn kind(&self) -> &ExceptionKind {
        &self.kind
    }

    /// Displayable kind name, e.g. `ValueError`.
    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    /// The exception message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Warning categories understood by the host warning channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCategory {
    /// Non-fatal runtime condition.
    Runtime,
    /// Use of a deprecated surface.
    Deprecation,
}

impl WarningCategory {
    /// Displayable category name.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::Runtime => "RuntimeWarning",
            WarningCategory::Deprecation => "DeprecationWarning",
        }
    }
}

/// A single emitted warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The warning category.
    pub category: WarningCategory,
    /// Rendered warning text.
    pub message: String,
}

/// The host's non-fatal warning channel.
///
/// Cloning produces another handle to the same channel. Warnings accumulate
/// until drained, so callers of safe conversion can check whether a returned
/// null actually meant "conversion failed".
#[derive(Debug, Clone, Default)]
pub struct WarningSink {
    emitted: Rc<RefCell<Vec<Warning>>>,
}

impl WarningSink {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a warning.
    pub fn warn(&self, category: WarningCategory, message: impl Into<String>) {
        self.emitted.borrow_mut().push(Warning {
            category,
            message: message.into(),
        });
    }

    /// Number of warnings currently pending.
    pub fn len(&self) -> usize {
        self.emitted.borrow().len()
    }

    /// Whether the channel is empty.
    pub fn is_empty(&self) -> bool {
        self.emitted.borrow().is_empty()
    }

    /// Take all pending warnings, leaving the channel empty.
    pub fn drain(&self) -> Vec<Warning> {
        self.emitted.borrow_mut().drain(..).collect()
    }
}
