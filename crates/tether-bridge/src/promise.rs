//! Awaitable bridging
//!
//! Converting a host awaitable returns a pending guest promise immediately;
//! a continuation token goes on the guest job queue, and pumping the queue
//! re-enters the conversion machinery with the awaitable's settled value.
//! Awaitables are deliberately not pinned or memoized: once settled, a
//! nested awaitable is unreachable host garbage, and pinning it again would
//! leak.

use tether_engine::{Job, Value};
use tether_host::{AwaitableState, HostAwaitable, HostException};

use crate::errors::BridgeResult;
use crate::{AwaitableBinding, Bridge};

enum SettleOutcome {
    Settled,
    StillPending,
}

impl Bridge {
    /// Convert a host awaitable into a pending guest promise. Promise
    /// construction failure yields the null sentinel by contract.
    pub(crate) fn bridge_awaitable(&mut self, awaitable: &HostAwaitable) -> Value {
        let Ok(promise) = self.engine.new_promise() else {
            return Value::Null;
        };
        let root = self.engine.root(promise);
        let token = self.next_token;
        self.next_token += 1;
        self.continuations.insert(
            token,
            AwaitableBinding {
                awaitable: awaitable.clone(),
                promise,
                _root: root,
            },
        );
        self.engine.jobs().enqueue(Job::External(token));
        Value::Object(promise)
    }

    /// Pump the guest job queue until it drains. Reaction jobs run guest
    /// functions; continuation jobs settle bridged awaitables, re-entering
    /// the conversion machinery for the settled value. Continuations whose
    /// awaitable is still pending are re-queued for the next pump. Returns
    /// the number of jobs that ran.
    pub fn run_jobs(&mut self) -> BridgeResult<usize> {
        let jobs = self.engine.jobs();
        let mut deferred = Vec::new();
        let mut ran = 0;

        while let Some(job) = jobs.dequeue() {
            match job {
                Job::Call { func, args } => {
                    self.engine.call(func, &args)?;
                    ran += 1;
                }
                Job::External(token) => match self.settle_awaitable(token)? {
                    SettleOutcome::Settled => ran += 1,
                    SettleOutcome::StillPending => deferred.push(Job::External(token)),
                },
            }
        }

        for job in deferred {
            jobs.enqueue(job);
        }
        Ok(ran)
    }

    /// Whether any bridged awaitable is still waiting to settle.
    pub fn has_pending_awaitables(&self) -> bool {
        !self.continuations.is_empty()
    }

    fn settle_awaitable(&mut self, token: u64) -> BridgeResult<SettleOutcome> {
        let Some(binding) = self.continuations.remove(&token) else {
            return Ok(SettleOutcome::Settled);
        };

        match binding.awaitable.state() {
            AwaitableState::Pending => {
                self.continuations.insert(token, binding);
                Ok(SettleOutcome::StillPending)
            }
            AwaitableState::Resolved(value) => {
                match self.convert(&value) {
                    Ok(converted) => {
                        self.engine.resolve_promise(binding.promise, converted)?;
                    }
                    Err(err) => {
                        // A failed conversion of the settled value must not
                        // escape the job pump; it rejects the promise.
                        let exception = HostException::from(err);
                        let error = self.guest_error_from_host(&exception)?;
                        self.engine
                            .reject_promise(binding.promise, Value::Object(error))?;
                    }
                }
                Ok(SettleOutcome::Settled)
            }
            AwaitableState::Failed(exception) => {
                let error = self.guest_error_from_host(&exception)?;
                self.engine
                    .reject_promise(binding.promise, Value::Object(error))?;
                Ok(SettleOutcome::Settled)
            }
        }
    }
}
