use crate::mach::val::{f2i32, f2i64, format_float, Value};

#[test]
fn test_same_kind_stays_same_kind() {
    let v = Value::add(Value::Int(1), Value::Int(2)).unwrap();
    assert_eq!(v, Value::Int(3));
    let v = Value::add(Value::Uint8(1), Value::Uint8(2)).unwrap();
    assert_eq!(v, Value::Uint8(3));
    let v = Value::add(Value::Int64(1), Value::Int64(2)).unwrap();
    assert_eq!(v, Value::Int64(3));
}

#[test]
fn test_mixed_kinds_widen() {
    let v = Value::add(Value::Uint8(1), Value::Int(2)).unwrap();
    assert_eq!(v, Value::Int(3));
    let v = Value::mul(Value::Int(2), Value::Int64(3)).unwrap();
    assert_eq!(v, Value::Int64(6));
    let v = Value::add(Value::Int(1), Value::Float(0.5)).unwrap();
    assert_eq!(v, Value::Float(1.5));
}

#[test]
fn test_widening_commutes() {
    for (a, b) in [
        (Value::Uint8(3), Value::Int(4)),
        (Value::Int(3), Value::Int64(4)),
        (Value::Int64(3), Value::Float(4.0)),
    ] {
        let ab = Value::add(a.clone(), b.clone()).unwrap();
        let ba = Value::add(b.clone(), a.clone()).unwrap();
        assert_eq!(ab, ba);
        let ab = Value::mul(a.clone(), b.clone()).unwrap();
        let ba = Value::mul(b, a).unwrap();
        assert_eq!(ab, ba);
    }
}

#[test]
fn test_integer_arithmetic_wraps() {
    let v = Value::add(Value::Int(i32::max_value()), Value::Int(1)).unwrap();
    assert_eq!(v, Value::Int(i32::min_value()));
}

#[test]
fn test_float_conversion_ranges() {
    assert_eq!(f2i32(2147483647.0).unwrap(), 2147483647);
    assert!(f2i32(2147483648.0).is_err());
    assert!(f2i32(-2147483648.0).is_ok());
    assert!(f2i32(-2147483649.0).is_err());
    assert!(f2i64(9.3e18).is_err());
    assert!(f2i64(-9.3e18).is_err());
    assert_eq!(f2i64(1e15).unwrap(), 1_000_000_000_000_000);
}

#[test]
fn test_division_always_floats() {
    let v = Value::div(Value::Int(7), Value::Int(2)).unwrap();
    assert_eq!(v, Value::Float(3.5));
    assert!(Value::div(Value::Int(1), Value::Int(0)).is_err());
}

#[test]
fn test_string_comparison_is_bytewise() {
    use std::cmp::Ordering;
    let order = Value::compare(
        Value::Str("abc".to_string()),
        Value::Str("abd".to_string()),
    )
    .unwrap();
    assert_eq!(order, Ordering::Less);
    assert!(Value::compare(Value::Str("a".to_string()), Value::Int(1)).is_err());
}

#[test]
fn test_float_formatting() {
    assert_eq!(format_float(0.0), "0");
    assert_eq!(format_float(2.0), "2");
    assert_eq!(format_float(3.5), "3.5");
    assert_eq!(format_float(1e20), "1E20");
    assert_eq!(format_float(0.001), "1E-3");
    // Nine significant figures in total, not nine decimal places.
    assert_eq!(format_float(100.0 / 7.0), "14.2857143");
    assert_eq!(format_float(123.456), "123.456");
    assert_eq!(format_float(1234567890.5), "1234567891");
}
