//! The engine heap and collector
//!
//! Objects live in a handle table. Reachability starts from the external
//! root set (RAII guards held by the embedder) and from pending jobs, then
//! traces through plain objects and promises. Swept handles are reported to
//! finalization hooks, which is how the bridge's lifetime registry learns
//! that a wrapper died.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, EngineResult};
use crate::job::JobQueue;
use crate::object::{
    ElemKind, ErrorObject, GuestFunction, ObjectKind, PlainObject, Promise, PromiseState,
    ProxyObject, Reaction, TypedArray,
};
use crate::string::GuestString;
use crate::value::{Handle, Value};

/// Engine resource limits.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    /// Maximum number of live heap objects.
    pub max_objects: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_objects: usize::MAX,
        }
    }
}

type RootTable = Rc<RefCell<FxHashMap<u64, usize>>>;

/// RAII root: keeps a handle reachable until dropped.
#[derive(Debug)]
pub struct RootGuard {
    handle: Handle,
    roots: RootTable,
}

impl RootGuard {
    /// The rooted handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        let mut roots = self.roots.borrow_mut();
        if let Some(count) = roots.get_mut(&self.handle.raw()) {
            *count -= 1;
            if *count == 0 {
                roots.remove(&self.handle.raw());
            }
        }
    }
}

/// The guest engine: heap, roots, collector and job queue.
pub struct Engine {
    heap: FxHashMap<Handle, ObjectKind>,
    next_handle: u64,
    roots: RootTable,
    finalizers: Vec<Box<dyn Fn(Handle)>>,
    jobs: JobQueue,
    limits: ResourceLimits,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with default limits.
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// Create an engine with explicit limits.
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            heap: FxHashMap::default(),
            next_handle: 1,
            roots: Rc::new(RefCell::new(FxHashMap::default())),
            finalizers: Vec::new(),
            jobs: JobQueue::new(),
            limits,
        }
    }

    /// A handle to the engine's job queue.
    pub fn jobs(&self) -> JobQueue {
        self.jobs.clone()
    }

    /// Register a hook called with each handle the collector sweeps.
    pub fn add_finalizer(&mut self, hook: impl Fn(Handle) + 'static) {
        self.finalizers.push(Box::new(hook));
    }

    /// Number of live heap objects.
    pub fn live_objects(&self) -> usize {
        self.heap.len()
    }

    /// Whether `handle` refers to a live object.
    pub fn contains(&self, handle: Handle) -> bool {
        self.heap.contains_key(&handle)
    }

    fn alloc(&mut self, kind: ObjectKind) -> EngineResult<Handle> {
        if self.heap.len() >= self.limits.max_objects {
            return Err(EngineError::HeapLimit {
                limit: self.limits.max_objects,
            });
        }
        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        self.heap.insert(handle, kind);
        Ok(handle)
    }

    fn object(&self, handle: Handle) -> EngineResult<&ObjectKind> {
        self.heap.get(&handle).ok_or(EngineError::BadHandle(handle))
    }

    fn object_mut(&mut self, handle: Handle) -> EngineResult<&mut ObjectKind> {
        self.heap
            .get_mut(&handle)
            .ok_or(EngineError::BadHandle(handle))
    }

    /// Kind name of a live object, for diagnostics.
    pub fn kind_name(&self, handle: Handle) -> EngineResult<&'static str> {
        Ok(self.object(handle)?.kind_name())
    }

    // ========================================================================
    // Rooting
    // ========================================================================

    /// Root a handle; the object stays reachable until the guard drops.
    pub fn root(&self, handle: Handle) -> RootGuard {
        *self.roots.borrow_mut().entry(handle.raw()).or_insert(0) += 1;
        RootGuard {
            handle,
            roots: Rc::clone(&self.roots),
        }
    }

    /// Number of externally rooted handles.
    pub fn root_count(&self) -> usize {
        self.roots.borrow().len()
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Allocate an engine-owned string from UTF-16 units.
    pub fn new_string(&mut self, units: Vec<u16>) -> EngineResult<Value> {
        let handle = self.alloc(ObjectKind::String(GuestString::owned(units)))?;
        Ok(Value::String(handle))
    }

    /// Allocate an external string over two-byte units.
    pub fn new_external_string_two_byte(&mut self, units: Rc<[u16]>) -> EngineResult<Value> {
        let handle = self.alloc(ObjectKind::String(GuestString::external_two_byte(units)))?;
        Ok(Value::String(handle))
    }

    /// Allocate an external string over one-byte units; the width-indicator
    /// bit is forced on the header.
    pub fn new_external_string_one_byte(&mut self, units: Rc<[u8]>) -> EngineResult<Value> {
        let handle = self.alloc(ObjectKind::String(GuestString::external_one_byte(units)))?;
        Ok(Value::String(handle))
    }

    /// Borrow a live string.
    pub fn string(&self, handle: Handle) -> EngineResult<&GuestString> {
        match self.object(handle)? {
            ObjectKind::String(s) => Ok(s),
            other => Err(EngineError::KindMismatch {
                expected: "string",
                got: other.kind_name(),
            }),
        }
    }

    /// Code units of a live string.
    pub fn string_units(&self, handle: Handle) -> EngineResult<Vec<u16>> {
        Ok(self.string(handle)?.code_units())
    }

    /// Decode a live string to Rust text.
    pub fn string_text(&self, handle: Handle) -> EngineResult<String> {
        Ok(self.string(handle)?.to_rust_string())
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Allocate an error object.
    pub fn new_error(
        &mut self,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> EngineResult<Handle> {
        self.alloc(ObjectKind::Error(ErrorObject {
            name: name.into(),
            message: message.into(),
        }))
    }

    /// Borrow a live error object.
    pub fn error(&self, handle: Handle) -> EngineResult<&ErrorObject> {
        match self.object(handle)? {
            ObjectKind::Error(e) => Ok(e),
            other => Err(EngineError::KindMismatch {
                expected: "error",
                got: other.kind_name(),
            }),
        }
    }

    /// Whether a handle is an error object.
    pub fn is_error(&self, handle: Handle) -> bool {
        matches!(self.heap.get(&handle), Some(ObjectKind::Error(_)))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Allocate a guest-native function.
    pub fn new_function(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> EngineResult<Value> + 'static,
    ) -> EngineResult<Handle> {
        self.alloc(ObjectKind::Function(GuestFunction {
            name: name.into(),
            body: Rc::new(body),
        }))
    }

    /// Whether a handle is a guest-native function.
    pub fn is_function(&self, handle: Handle) -> bool {
        matches!(self.heap.get(&handle), Some(ObjectKind::Function(_)))
    }

    /// Call a guest-native function.
    pub fn call(&mut self, handle: Handle, args: &[Value]) -> EngineResult<Value> {
        let body = match self.object(handle)? {
            ObjectKind::Function(f) => Rc::clone(&f.body),
            _ => return Err(EngineError::NotCallable),
        };
        body(args)
    }

    // ========================================================================
    // Plain objects
    // ========================================================================

    /// Allocate an empty plain object.
    pub fn new_plain(&mut self) -> EngineResult<Handle> {
        self.alloc(ObjectKind::Plain(PlainObject::default()))
    }

    /// Read a property of a plain object.
    pub fn plain_get(&self, handle: Handle, name: &str) -> EngineResult<Option<Value>> {
        match self.object(handle)? {
            ObjectKind::Plain(obj) => Ok(obj.get(name)),
            other => Err(EngineError::KindMismatch {
                expected: "plain",
                got: other.kind_name(),
            }),
        }
    }

    /// Write a property of a plain object.
    pub fn plain_set(&mut self, handle: Handle, name: &str, value: Value) -> EngineResult<()> {
        match self.object_mut(handle)? {
            ObjectKind::Plain(obj) => {
                obj.set(name, value);
                Ok(())
            }
            other => Err(EngineError::KindMismatch {
                expected: "plain",
                got: other.kind_name(),
            }),
        }
    }

    /// Property names of a plain object.
    pub fn plain_keys(&self, handle: Handle) -> EngineResult<Vec<String>> {
        match self.object(handle)? {
            ObjectKind::Plain(obj) => Ok(obj.keys()),
            other => Err(EngineError::KindMismatch {
                expected: "plain",
                got: other.kind_name(),
            }),
        }
    }

    // ========================================================================
    // Promises
    // ========================================================================

    /// Allocate a pending promise.
    pub fn new_promise(&mut self) -> EngineResult<Handle> {
        self.alloc(ObjectKind::Promise(Promise::new()))
    }

    fn promise_mut(&mut self, handle: Handle) -> EngineResult<&mut Promise> {
        match self.object_mut(handle)? {
            ObjectKind::Promise(p) => Ok(p),
            other => Err(EngineError::KindMismatch {
                expected: "promise",
                got: other.kind_name(),
            }),
        }
    }

    /// Current state of a promise.
    pub fn promise_state(&self, handle: Handle) -> EngineResult<PromiseState> {
        match self.object(handle)? {
            ObjectKind::Promise(p) => Ok(p.state().clone()),
            other => Err(EngineError::KindMismatch {
                expected: "promise",
                got: other.kind_name(),
            }),
        }
    }

    /// Fulfill a pending promise; reactions are scheduled on the job queue.
    /// Settling twice is a no-op.
    pub fn resolve_promise(&mut self, handle: Handle, value: Value) -> EngineResult<()> {
        let jobs = self.jobs.clone();
        let promise = self.promise_mut(handle)?;
        if promise.state != PromiseState::Pending {
            return Ok(());
        }
        promise.state = PromiseState::Fulfilled(value.clone());
        for reaction in promise.reactions.drain(..) {
            if let Some(func) = reaction.on_fulfilled {
                jobs.enqueue(crate::job::Job::Call {
                    func,
                    args: vec![value.clone()],
                });
            }
        }
        Ok(())
    }

    /// Reject a pending promise; reactions are scheduled on the job queue.
    /// Settling twice is a no-op.
    pub fn reject_promise(&mut self, handle: Handle, reason: Value) -> EngineResult<()> {
        let jobs = self.jobs.clone();
        let promise = self.promise_mut(handle)?;
        if promise.state != PromiseState::Pending {
            return Ok(());
        }
        promise.state = PromiseState::Rejected(reason.clone());
        for reaction in promise.reactions.drain(..) {
            if let Some(func) = reaction.on_rejected {
                jobs.enqueue(crate::job::Job::Call {
                    func,
                    args: vec![reason.clone()],
                });
            }
        }
        Ok(())
    }

    /// Register reactions; fires immediately (via the job queue) on an
    /// already-settled promise.
    pub fn promise_then(
        &mut self,
        handle: Handle,
        on_fulfilled: Option<Handle>,
        on_rejected: Option<Handle>,
    ) -> EngineResult<()> {
        let jobs = self.jobs.clone();
        let promise = self.promise_mut(handle)?;
        match promise.state.clone() {
            PromiseState::Pending => {
                promise.reactions.push(Reaction {
                    on_fulfilled,
                    on_rejected,
                });
            }
            PromiseState::Fulfilled(value) => {
                if let Some(func) = on_fulfilled {
                    jobs.enqueue(crate::job::Job::Call {
                        func,
                        args: vec![value],
                    });
                }
            }
            PromiseState::Rejected(reason) => {
                if let Some(func) = on_rejected {
                    jobs.enqueue(crate::job::Job::Call {
                        func,
                        args: vec![reason],
                    });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Typed arrays
    // ========================================================================

    /// Allocate a typed-array view over shared bytes.
    pub fn new_typed_array(
        &mut self,
        elem: ElemKind,
        bytes: Rc<RefCell<Vec<u8>>>,
    ) -> EngineResult<Handle> {
        self.alloc(ObjectKind::TypedArray(TypedArray { elem, bytes }))
    }

    /// Borrow a live typed-array view.
    pub fn typed_array(&self, handle: Handle) -> EngineResult<&TypedArray> {
        match self.object(handle)? {
            ObjectKind::TypedArray(t) => Ok(t),
            other => Err(EngineError::KindMismatch {
                expected: "typed-array",
                got: other.kind_name(),
            }),
        }
    }

    // ========================================================================
    // Proxies
    // ========================================================================

    /// Allocate a proxy with an opaque embedder slot.
    pub fn new_proxy(&mut self, slot: Rc<dyn Any>) -> EngineResult<Handle> {
        self.alloc(ObjectKind::Proxy(ProxyObject { slot }))
    }

    /// The embedder slot of a live proxy.
    pub fn proxy_slot(&self, handle: Handle) -> EngineResult<Rc<dyn Any>> {
        match self.object(handle)? {
            ObjectKind::Proxy(p) => Ok(Rc::clone(&p.slot)),
            other => Err(EngineError::KindMismatch {
                expected: "proxy",
                got: other.kind_name(),
            }),
        }
    }

    /// Whether a handle is a proxy.
    pub fn is_proxy(&self, handle: Handle) -> bool {
        matches!(self.heap.get(&handle), Some(ObjectKind::Proxy(_)))
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Run a full mark-and-sweep collection. Returns the number of objects
    /// swept. Finalization hooks run once per swept handle, after the sweep.
    pub fn collect(&mut self) -> usize {
        let mut marked: FxHashSet<Handle> = FxHashSet::default();
        let mut worklist: Vec<Handle> = self
            .roots
            .borrow()
            .keys()
            .map(|&raw| Handle::new(raw))
            .collect();
        worklist.extend(self.jobs.referenced_handles());

        while let Some(handle) = worklist.pop() {
            if !marked.insert(handle) {
                continue;
            }
            match self.heap.get(&handle) {
                Some(ObjectKind::Plain(obj)) => {
                    worklist.extend(obj.values().filter_map(Value::handle));
                }
                Some(ObjectKind::Promise(p)) => {
                    match p.state() {
                        PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => {
                            worklist.extend(v.handle());
                        }
                        PromiseState::Pending => {}
                    }
                    for reaction in &p.reactions {
                        worklist.extend(reaction.on_fulfilled);
                        worklist.extend(reaction.on_rejected);
                    }
                }
                _ => {}
            }
        }

        let dead: Vec<Handle> = self
            .heap
            .keys()
            .filter(|h| !marked.contains(h))
            .copied()
            .collect();
        for handle in &dead {
            self.heap.remove(handle);
        }
        for handle in &dead {
            for hook in &self.finalizers {
                hook(*handle);
            }
        }
        dead.len()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("live_objects", &self.heap.len())
            .field("roots", &self.roots.borrow().len())
            .field("pending_jobs", &self.jobs.len())
            .finish()
    }
}
