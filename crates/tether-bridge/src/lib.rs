//! Tether bridge core
//!
//! The bidirectional value bridge between the reference-counted host
//! runtime ([`tether_host`]) and the garbage-collected guest engine
//! ([`tether_engine`]): a type dispatcher in each direction, live container
//! and callable proxies, a lifetime registry coupling the two collectors, a
//! string transcoder and error translation.
//!
//! Two entry points are exposed to collaborators:
//!
//! - [`Bridge::convert`] — strict conversion; failures propagate.
//! - [`Bridge::convert_safe`] — never fails; a failure becomes one warning
//!   on the host warning channel plus the guest null sentinel.
//!
//! All bridge state is single-threaded by construction; callers serialize
//! every entry point onto one logical thread.

#![warn(missing_docs)]

pub mod dispatch;
pub mod errors;
pub mod from_guest;
pub mod promise;
pub mod proxy;
pub mod registry;
pub mod transcode;
pub mod translate;

use rustc_hash::FxHashMap;
use tether_engine::RootGuard;
use tether_host::{HostAwaitable, WarningSink};

pub use errors::{BridgeError, BridgeResult};
pub use proxy::{GuestFnProxy, GuestObjProxy, PropKey};
pub use registry::LifetimeRegistry;
pub use transcode::{ucs4_to_utf16, utf16_to_scalars};

// Re-export the coupled runtimes' surface types (canonical definitions live
// in tether-host / tether-engine).
pub use tether_engine::{Engine, EngineError, Handle, PromiseState, ResourceLimits, Value};
pub use tether_host::{HostException, HostValue, Warning, WarningCategory};

/// A bridged awaitable waiting to settle its guest promise.
pub(crate) struct AwaitableBinding {
    pub(crate) awaitable: HostAwaitable,
    pub(crate) promise: Handle,
    /// Keeps the pending promise reachable until settlement.
    pub(crate) _root: RootGuard,
}

/// The value bridge: guest engine, lifetime registry, warning channel and
/// pending awaitable continuations.
pub struct Bridge {
    pub(crate) engine: Engine,
    pub(crate) registry: LifetimeRegistry,
    pub(crate) warnings: WarningSink,
    pub(crate) continuations: FxHashMap<u64, AwaitableBinding>,
    pub(crate) next_token: u64,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    /// Create a bridge over a fresh engine.
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    /// Create a bridge over an existing engine. The bridge installs its
    /// finalization hook so wrapper death releases registry pins.
    pub fn with_engine(mut engine: Engine) -> Self {
        let registry = LifetimeRegistry::new();
        engine.add_finalizer(registry.finalize_hook());
        Self {
            engine,
            registry,
            warnings: WarningSink::new(),
            continuations: FxHashMap::default(),
            next_token: 1,
        }
    }

    /// The guest engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The guest engine, mutably.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The lifetime registry.
    pub fn registry(&self) -> &LifetimeRegistry {
        &self.registry
    }

    /// The host warning channel this bridge emits on.
    pub fn warnings(&self) -> &WarningSink {
        &self.warnings
    }

    /// Drive a guest collection cycle; finalized wrappers release their
    /// registry pins. Returns the number of objects swept.
    pub fn collect(&mut self) -> usize {
        self.engine.collect()
    }

    /// Drop every pin, memo entry and pending continuation. The bridge
    /// remains usable; state is simply rebuilt from scratch.
    pub fn teardown(&mut self) {
        self.continuations.clear();
        self.registry.teardown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("engine", &self.engine)
            .field("registry", &self.registry)
            .field("pending_awaitables", &self.continuations.len())
            .finish()
    }
}
