mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_separators() {
    let mut r = Runtime::default();
    r.enter("PRINT \"a\";\"b\"");
    assert_eq!(exec(&mut r), "ab\n");
    r.enter("PRINT \"a\"'\"b\"");
    assert_eq!(exec(&mut r), "a\nb\n");
    r.enter("PRINT \"a\";");
    assert_eq!(exec(&mut r), "a");
}

#[test]
fn test_comma_advances_to_the_next_zone() {
    let mut r = Runtime::default();
    r.enter("PRINT 1,2");
    assert_eq!(exec(&mut r), "1         2\n");
}

#[test]
fn test_tab_and_spc() {
    let mut r = Runtime::default();
    r.enter("PRINT TAB(5);\"x\"");
    assert_eq!(exec(&mut r), "     x\n");
    r.enter("PRINT \"a\";SPC 3;\"b\"");
    assert_eq!(exec(&mut r), "a   b\n");
}

#[test]
fn test_tab_before_current_column_starts_a_new_line() {
    let mut r = Runtime::default();
    r.enter("PRINT \"abcdef\";TAB(2);\"x\"");
    assert_eq!(exec(&mut r), "abcdef\n  x\n");
}

#[test]
fn test_at_percent_field_width() {
    let mut r = Runtime::default();
    r.enter("@%=6:PRINT 42;\"!\"");
    assert_eq!(exec(&mut r), "    42!\n");
    r.enter("@%=0:PRINT 42;\"!\"");
    assert_eq!(exec(&mut r), "42!\n");
}

#[test]
fn test_count_tracks_the_column() {
    let mut r = Runtime::default();
    r.enter("PRINT \"abc\";COUNT");
    assert_eq!(exec(&mut r), "abc3\n");
}

#[test]
fn test_float_rendering() {
    let mut r = Runtime::default();
    r.enter("PRINT 1/3");
    assert_eq!(exec(&mut r), "0.333333333\n");
    r.enter("PRINT 100/7");
    assert_eq!(exec(&mut r), "14.2857143\n");
    r.enter("PRINT 123.456");
    assert_eq!(exec(&mut r), "123.456\n");
    r.enter("PRINT 1E20");
    assert_eq!(exec(&mut r), "1E20\n");
}
