//! Conversion of primitives, sentinels and failure modes.

use tether_bridge::{Bridge, BridgeError, Value};
use tether_host::{HostValue, WarningCategory};

#[test]
fn test_booleans_and_floats_pass_through() {
    let mut bridge = Bridge::new();
    assert_eq!(bridge.convert(&HostValue::Bool(true)).unwrap(), Value::Bool(true));
    assert_eq!(bridge.convert(&HostValue::Bool(false)).unwrap(), Value::Bool(false));
    assert_eq!(
        bridge.convert(&HostValue::Float(2.75)).unwrap(),
        Value::Number(2.75)
    );
    // No range check on floats.
    assert_eq!(
        bridge.convert(&HostValue::Float(1e300)).unwrap(),
        Value::Number(1e300)
    );
}

#[test]
fn test_safe_integers_become_numbers() {
    let mut bridge = Bridge::new();
    for n in [0i64, 1, -1, 42, (1 << 53) - 1, -((1 << 53) - 1)] {
        assert_eq!(
            bridge.convert(&HostValue::int(n)).unwrap(),
            Value::Number(n as f64),
            "n = {n}"
        );
    }
}

#[test]
fn test_oversized_plain_integer_overflows() {
    let mut bridge = Bridge::new();
    for n in [1i64 << 53, -(1i64 << 53), i64::MAX, i64::MIN] {
        assert!(
            matches!(bridge.convert(&HostValue::int(n)), Err(BridgeError::Overflow)),
            "n = {n}"
        );
    }
}

#[test]
fn test_big_integer_subtype_is_lossless() {
    let mut bridge = Bridge::new();
    let huge = (1i128 << 53) + 1;
    assert_eq!(
        bridge.convert(&HostValue::bigint(huge)).unwrap(),
        Value::BigInt(huge)
    );
    // Small values through the big-integer subtype stay big integers.
    assert_eq!(
        bridge.convert(&HostValue::bigint(7)).unwrap(),
        Value::BigInt(7)
    );

    // And they round-trip exactly through the reverse dispatcher.
    let back = bridge.host_from_guest(&Value::BigInt(huge)).unwrap();
    assert!(matches!(back, HostValue::Int(i) if i.is_big() && i.value() == huge));
}

#[test]
fn test_absence_and_null_are_distinguishable() {
    let mut bridge = Bridge::new();
    let none = bridge.convert(&HostValue::None).unwrap();
    let null = bridge.convert(&HostValue::Null).unwrap();
    assert_eq!(none, Value::Undefined);
    assert_eq!(null, Value::Null);
    assert_ne!(none, null);
}

#[test]
fn test_unsupported_type_names_the_host_type() {
    let mut bridge = Bridge::new();
    let err = bridge.convert(&HostValue::foreign("socket")).unwrap_err();
    match err {
        BridgeError::Unsupported { type_name } => assert_eq!(type_name, "socket"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_convert_safe_degrades_to_warning_and_null() {
    let mut bridge = Bridge::new();
    let out = bridge.convert_safe(&HostValue::foreign("socket"));
    assert_eq!(out, Value::Null);

    let warnings = bridge.warnings().drain();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].category, WarningCategory::Runtime);
    assert_eq!(
        warnings[0].message,
        "cannot convert host values of type: socket"
    );
}

#[test]
fn test_convert_safe_passes_successes_through_unchanged() {
    let mut bridge = Bridge::new();
    assert_eq!(bridge.convert_safe(&HostValue::int(5)), Value::Number(5.0));
    // A genuine host null also comes back as the null sentinel; only the
    // warning channel tells the two cases apart.
    assert_eq!(bridge.convert_safe(&HostValue::Null), Value::Null);
    assert!(bridge.warnings().is_empty());
}

#[test]
fn test_exception_instances_become_guest_errors() {
    let mut bridge = Bridge::new();
    let exc = tether_host::HostException::value_error("boom");
    let out = bridge.convert(&HostValue::Exception(exc)).unwrap();
    let handle = out.handle().expect("error object");
    let error = bridge.engine().error(handle).unwrap();
    assert_eq!(error.name, "ValueError");
    assert_eq!(error.message, "boom");
}

#[test]
fn test_reverse_dispatch_covers_primitives() {
    let mut bridge = Bridge::new();
    assert!(matches!(
        bridge.host_from_guest(&Value::Bool(true)).unwrap(),
        HostValue::Bool(true)
    ));
    assert!(matches!(
        bridge.host_from_guest(&Value::Number(4.0)).unwrap(),
        HostValue::Int(i) if i.value() == 4 && !i.is_big()
    ));
    assert!(matches!(
        bridge.host_from_guest(&Value::Number(4.5)).unwrap(),
        HostValue::Float(f) if f == 4.5
    ));
    assert!(matches!(
        bridge.host_from_guest(&Value::Null).unwrap(),
        HostValue::Null
    ));
    assert!(matches!(
        bridge.host_from_guest(&Value::Undefined).unwrap(),
        HostValue::None
    ));
}
