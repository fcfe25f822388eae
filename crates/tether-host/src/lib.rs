//! Tether host runtime model
//!
//! This crate models the reference-counted "host" side of the bridge: tagged
//! runtime values built on `Rc`, strings with 1/2/4-byte-per-codepoint
//! storage, callables, buffer-protocol objects, awaitables, exceptions and
//! the non-fatal warning channel.
//!
//! Everything here is single-threaded by construction (`Rc`/`RefCell`); none
//! of these types are `Send` or `Sync`.

#![warn(missing_docs)]

pub mod awaitable;
pub mod buffer;
pub mod exception;
pub mod function;
pub mod string;
pub mod value;

pub use awaitable::{AwaitableState, HostAwaitable};
pub use buffer::{HostBuffer, ItemFormat, WeakHostBuffer};
pub use exception::{
    ExceptionKind, HostException, HostResult, Warning, WarningCategory, WarningSink,
};
pub use function::{HostFunction, WeakHostFunction};
pub use string::{HostStr, StrStorageView, StrWidth};
pub use value::{HostDict, HostEmbedded, HostId, HostInt, HostList, HostValue};
