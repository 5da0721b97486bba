use crate::mach::stack::{Frame, Stack};
use crate::mach::val::Value;

#[test]
fn test_push_pop_returns_the_value_pushed() {
    let mut stack = Stack::new();
    stack.push_value(Value::Int(42)).unwrap();
    assert_eq!(stack.pop_value().unwrap(), Value::Int(42));
    stack.push_value(Value::Str("hi".to_string())).unwrap();
    assert_eq!(stack.pop_value().unwrap(), Value::Str("hi".to_string()));
    stack.push_value(Value::Float(2.5)).unwrap();
    assert_eq!(stack.pop_value().unwrap(), Value::Float(2.5));
}

#[test]
fn test_mismatched_pop_is_fatal() {
    let mut stack = Stack::new();
    stack.push(Frame::Repeat { body: 7 }).unwrap();
    let error = stack.pop_value().unwrap_err();
    assert!(error.is_fatal());
    // The frame is still there for the closer to find.
    assert!(matches!(stack.top(), Some(Frame::Repeat { body: 7 })));
}

#[test]
fn test_empty_pop_is_fatal() {
    let mut stack = Stack::new();
    assert!(stack.pop_value().unwrap_err().is_fatal());
}

#[test]
fn test_subprogram_detection() {
    let mut stack = Stack::new();
    assert!(!stack.in_subprogram());
    stack.push(Frame::Gosub { ret: 0 }).unwrap();
    assert!(!stack.in_subprogram());
    stack
        .push(Frame::Proc {
            ret: 0,
            name: "PROCx".into(),
            parms: 0,
        })
        .unwrap();
    assert!(stack.in_subprogram());
}

#[test]
fn test_balanced_loops_restore_stack_depth() {
    use super::*;
    let mut r = Runtime::default();
    r.enter("X%=0:REPEAT X%=X%+1:UNTIL X%=3:PRINT X%");
    assert_eq!(exec(&mut r), "3\n");
    // A second direct command starts at the same depth: an unbalanced
    // frame would make this UNTIL see a stale REPEAT.
    r.enter("UNTIL TRUE");
    assert_eq!(exec(&mut r), "Not in a REPEAT loop\n");
}
