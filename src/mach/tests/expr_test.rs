use super::*;

#[test]
fn test_precedence() {
    let mut r = Runtime::default();
    r.enter("PRINT 2+3*4");
    assert_eq!(exec(&mut r), "14\n");
    r.enter("PRINT (2+3)*4");
    assert_eq!(exec(&mut r), "20\n");
    r.enter("PRINT 10-2-3");
    assert_eq!(exec(&mut r), "5\n");
}

#[test]
fn test_relational_results_are_minus_one() {
    let mut r = Runtime::default();
    r.enter("PRINT 1=1");
    assert_eq!(exec(&mut r), "-1\n");
    r.enter("PRINT 1=2");
    assert_eq!(exec(&mut r), "0\n");
    r.enter("PRINT 2>1 AND 3>2");
    assert_eq!(exec(&mut r), "-1\n");
}

#[test]
fn test_division_kinds() {
    let mut r = Runtime::default();
    r.enter("PRINT 7/2");
    assert_eq!(exec(&mut r), "3.5\n");
    r.enter("PRINT 7 DIV 2");
    assert_eq!(exec(&mut r), "3\n");
    r.enter("PRINT 7 MOD 2");
    assert_eq!(exec(&mut r), "1\n");
    r.enter("PRINT -7 DIV 2");
    assert_eq!(exec(&mut r), "-3\n");
}

#[test]
fn test_division_by_zero() {
    let mut r = Runtime::default();
    r.enter("PRINT 1/0");
    assert_eq!(exec(&mut r), "Division by zero\n");
    r.enter("PRINT 1 DIV 0");
    assert_eq!(exec(&mut r), "Division by zero\n");
}

#[test]
fn test_string_concat_and_compare() {
    let mut r = Runtime::default();
    r.enter("PRINT \"ab\"+\"cd\"");
    assert_eq!(exec(&mut r), "abcd\n");
    r.enter("PRINT \"abc\"<\"abd\"");
    assert_eq!(exec(&mut r), "-1\n");
    r.enter("PRINT \"a\"+1");
    assert_eq!(exec(&mut r), "Type mismatch\n");
}

#[test]
fn test_string_functions() {
    let mut r = Runtime::default();
    r.enter("PRINT LEFT$(\"hello\",2)");
    assert_eq!(exec(&mut r), "he\n");
    r.enter("PRINT RIGHT$(\"hello\",3)");
    assert_eq!(exec(&mut r), "llo\n");
    r.enter("PRINT MID$(\"hello\",2,3)");
    assert_eq!(exec(&mut r), "ell\n");
    r.enter("PRINT LEN\"hello\"");
    assert_eq!(exec(&mut r), "5\n");
    r.enter("PRINT INSTR(\"hello\",\"ll\")");
    assert_eq!(exec(&mut r), "3\n");
    r.enter("PRINT STRING$(3,\"ab\")");
    assert_eq!(exec(&mut r), "ababab\n");
    r.enter("PRINT CHR$(65);ASC\"A\"");
    assert_eq!(exec(&mut r), "A65\n");
    r.enter("PRINT STR$(12);VAL\"34x\"");
    assert_eq!(exec(&mut r), "1234\n");
}

#[test]
fn test_numeric_functions() {
    let mut r = Runtime::default();
    r.enter("PRINT ABS(-5);SGN(-5);INT(2.7);INT(-2.7)");
    assert_eq!(exec(&mut r), "5-12-3\n");
    r.enter("PRINT SQR 16");
    assert_eq!(exec(&mut r), "4\n");
    r.enter("PRINT SQR -1");
    assert_eq!(exec(&mut r), "Negative root\n");
    r.enter("PRINT LN 0");
    assert_eq!(exec(&mut r), "Logarithm range\n");
}

#[test]
fn test_float_to_int_range() {
    let mut r = Runtime::default();
    r.enter("A%=2E9:PRINT A%");
    assert_eq!(exec(&mut r), "2000000000\n");
    r.enter("A%=3E9");
    assert_eq!(exec(&mut r), "Number too big\n");
    r.enter("z%%=1E18:PRINT z%%");
    assert_eq!(exec(&mut r), "1000000000000000000\n");
    r.enter("z%%=1E19");
    assert_eq!(exec(&mut r), "Number too big\n");
}

#[test]
fn test_promotion_is_order_independent() {
    let mut r = Runtime::default();
    r.enter("PRINT 2+1.5;1.5+2");
    assert_eq!(exec(&mut r), "3.53.5\n");
    r.enter("z%%=4000000000:PRINT z%%*2;2*z%%");
    assert_eq!(exec(&mut r), "80000000008000000000\n");
    r.enter("PRINT 1.5=1.5;2=2.0");
    assert_eq!(exec(&mut r), "-1-1\n");
}

#[test]
fn test_uint8_wraps() {
    let mut r = Runtime::default();
    r.enter("a&=250:a&=a&+10:PRINT a&");
    assert_eq!(exec(&mut r), "4\n");
}

#[test]
fn test_shifts() {
    let mut r = Runtime::default();
    r.enter("PRINT 1<<4;16>>2");
    assert_eq!(exec(&mut r), "164\n");
    r.enter("PRINT -1>>>28");
    assert_eq!(exec(&mut r), "15\n");
}

#[test]
fn test_hex_output() {
    let mut r = Runtime::default();
    r.enter("PRINT ~255");
    assert_eq!(exec(&mut r), "FF\n");
    r.enter("PRINT STR$~(255)");
    assert_eq!(exec(&mut r), "FF\n");
}

#[test]
fn test_missing_variable_reports() {
    let mut r = Runtime::default();
    r.enter("PRINT nowhere");
    assert_eq!(exec(&mut r), "No such variable nowhere\n");
}
