//! Tether guest engine model
//!
//! This crate models the garbage-collected "guest" side of the bridge: a
//! handle-based heap with mark-and-sweep collection, explicit rooting and
//! finalization hooks, UTF-16 strings (owned and externally backed),
//! promises driven by an embedder-pumped job queue, typed-array views and
//! proxy objects carrying an opaque embedder slot.
//!
//! The engine is single-threaded; the embedder drives collection and the
//! job queue explicitly.

#![warn(missing_docs)]

pub mod error;
pub mod heap;
pub mod job;
pub mod object;
pub mod string;
pub mod value;

pub use error::{EngineError, EngineResult};
pub use heap::{Engine, ResourceLimits, RootGuard};
pub use job::{Job, JobQueue};
pub use object::{ElemKind, ErrorObject, ObjectKind, PromiseState};
pub use string::GuestString;
pub use value::{Handle, Value};
