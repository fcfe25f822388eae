//! Awaitable bridging: pending promises, settlement through the job queue,
//! and the degraded paths under heap pressure.

use tether_bridge::{Bridge, Engine, PromiseState, ResourceLimits, Value};
use tether_host::{HostAwaitable, HostException, HostValue};

#[test]
fn test_conversion_returns_a_pending_promise_immediately() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge.convert(&HostValue::Awaitable(awaitable)).unwrap();

    let promise = out.handle().expect("promise handle");
    assert_eq!(
        bridge.engine().promise_state(promise).unwrap(),
        PromiseState::Pending
    );
    assert!(bridge.has_pending_awaitables());
}

#[test]
fn test_resolution_converts_the_settled_value_on_the_job_pump() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    let promise = out.handle().unwrap();

    // Pumping before settlement leaves the continuation queued.
    bridge.run_jobs().unwrap();
    assert_eq!(
        bridge.engine().promise_state(promise).unwrap(),
        PromiseState::Pending
    );
    assert!(bridge.has_pending_awaitables());

    awaitable.resolve(HostValue::int(5));
    bridge.run_jobs().unwrap();
    assert_eq!(
        bridge.engine().promise_state(promise).unwrap(),
        PromiseState::Fulfilled(Value::Number(5.0))
    );
    assert!(!bridge.has_pending_awaitables());
}

#[test]
fn test_rejection_translates_the_host_exception() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    let promise = out.handle().unwrap();

    awaitable.fail(HostException::value_error("boom"));
    bridge.run_jobs().unwrap();

    match bridge.engine().promise_state(promise).unwrap() {
        PromiseState::Rejected(reason) => {
            let error = bridge.engine().error(reason.handle().unwrap()).unwrap();
            assert_eq!(error.name, "ValueError");
            assert_eq!(error.message, "boom");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[test]
fn test_unconvertible_settled_value_rejects_instead_of_escaping() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    let promise = out.handle().unwrap();

    awaitable.resolve(HostValue::foreign("socket"));
    bridge.run_jobs().unwrap();

    match bridge.engine().promise_state(promise).unwrap() {
        PromiseState::Rejected(reason) => {
            let error = bridge.engine().error(reason.handle().unwrap()).unwrap();
            assert!(error.message.contains("socket"));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[test]
fn test_settlement_runs_registered_reactions() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    let promise = out.handle().unwrap();

    let seen = std::rc::Rc::new(std::cell::Cell::new(f64::NAN));
    let reaction = {
        let seen = std::rc::Rc::clone(&seen);
        bridge
            .engine_mut()
            .new_function("record", move |args| {
                seen.set(args.first().and_then(Value::as_number).unwrap_or(f64::NAN));
                Ok(Value::Undefined)
            })
            .unwrap()
    };
    bridge
        .engine_mut()
        .promise_then(promise, Some(reaction), None)
        .unwrap();

    awaitable.resolve(HostValue::int(9));
    let ran = bridge.run_jobs().unwrap();
    // One continuation plus one reaction job.
    assert_eq!(ran, 2);
    assert_eq!(seen.get(), 9.0);
}

#[test]
fn test_nested_awaitables_are_not_pinned() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();

    // Awaitable bridging registers no pins and no memo entry; repeated
    // conversion builds a fresh promise.
    assert_eq!(bridge.registry().held_refs(), 0);
    let again = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    assert_ne!(out.handle(), again.handle());
}

#[test]
fn test_promise_construction_failure_yields_null() {
    let engine = Engine::with_limits(ResourceLimits { max_objects: 0 });
    let mut bridge = Bridge::with_engine(engine);

    let out = bridge
        .convert(&HostValue::Awaitable(HostAwaitable::new()))
        .unwrap();
    assert_eq!(out, Value::Null);
    assert!(!bridge.has_pending_awaitables());
}

#[test]
fn test_typed_array_construction_failure_yields_null_but_strings_error() {
    let engine = Engine::with_limits(ResourceLimits { max_objects: 0 });
    let mut bridge = Bridge::with_engine(engine);

    let buffer = tether_host::HostBuffer::new(vec![0; 4], tether_host::ItemFormat::U8);
    let out = bridge.convert(&HostValue::Buffer(buffer)).unwrap();
    assert_eq!(out, Value::Null);

    // Outside the two null-contract cases, heap exhaustion is an error.
    assert!(bridge.convert(&HostValue::str("text")).is_err());

    // And the safe variant degrades it to a warning.
    assert_eq!(bridge.convert_safe(&HostValue::str("text")), Value::Null);
    assert_eq!(bridge.warnings().len(), 1);
}

#[test]
fn test_pending_promise_survives_collection_until_settled() {
    let mut bridge = Bridge::new();
    let awaitable = HostAwaitable::new();
    let out = bridge
        .convert(&HostValue::Awaitable(awaitable.clone()))
        .unwrap();
    let promise = out.handle().unwrap();

    // The continuation's root keeps the pending promise alive.
    bridge.collect();
    assert!(bridge.engine().contains(promise));

    awaitable.resolve(HostValue::Bool(true));
    bridge.run_jobs().unwrap();

    // Settled and unrooted: the promise is ordinary garbage now.
    bridge.collect();
    assert!(!bridge.engine().contains(promise));
}
