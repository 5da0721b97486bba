mod common;
use beebasic::mach::{Event, Runtime};
use common::*;

#[test]
fn test_input_prompts_and_assigns() {
    let mut r = Runtime::default();
    r.enter("INPUT \"name\" a$,n%:PRINT a$;\" \";n%");
    assert_eq!(r.execute(100), Event::Input("name".to_string()));
    r.enter("bob, 41");
    assert_eq!(exec(&mut r), "bob 41\n");
}

#[test]
fn test_input_default_prompt_is_question_mark() {
    let mut r = Runtime::default();
    r.enter("INPUT n%:PRINT n%*2");
    assert_eq!(r.execute(100), Event::Input("?".to_string()));
    r.enter("21");
    assert_eq!(exec(&mut r), "42\n");
}

#[test]
fn test_input_reprompts_for_missing_values() {
    let mut r = Runtime::default();
    r.enter("INPUT a%,b%:PRINT a%+b%");
    assert_eq!(r.execute(100), Event::Input("?".to_string()));
    r.enter("1");
    assert_eq!(r.execute(100), Event::Input("?".to_string()));
    r.enter("2");
    assert_eq!(exec(&mut r), "3\n");
}

#[test]
fn test_input_line_takes_the_whole_reply() {
    let mut r = Runtime::default();
    r.enter("INPUT LINE a$:PRINT a$");
    assert_eq!(r.execute(100), Event::Input("?".to_string()));
    r.enter("one, two, three");
    assert_eq!(exec(&mut r), "one, two, three\n");
}

#[test]
fn test_input_expression_reply() {
    // Numeric INPUT evaluates its reply as an expression.
    let mut r = Runtime::default();
    r.enter("INPUT n%:PRINT n%");
    assert_eq!(r.execute(100), Event::Input("?".to_string()));
    r.enter("6*7");
    assert_eq!(exec(&mut r), "42\n");
}
