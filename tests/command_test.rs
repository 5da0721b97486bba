mod common;
use beebasic::mach::{Event, Runtime};
use common::*;

#[test]
fn test_quit_reports_its_code() {
    let mut r = Runtime::default();
    r.enter("QUIT 3");
    assert_eq!(r.execute(100), Event::Quit(3));
    let mut r = Runtime::default();
    r.enter("QUIT");
    assert_eq!(r.execute(100), Event::Quit(0));
}

#[test]
fn test_stop_reports() {
    assert_eq!(
        run_program(&["10 PRINT \"before\"", "20 STOP", "30 PRINT \"after\""]),
        "before\nSTOP at line 20\n"
    );
}

#[test]
fn test_end_is_silent() {
    assert_eq!(
        run_program(&["10 PRINT \"only\"", "20 END", "30 PRINT \"never\""]),
        "only\n"
    );
}

#[test]
fn test_clear_discards_variables_but_not_statics() {
    let mut r = Runtime::default();
    r.enter("A%=7:dyn%=8");
    assert_eq!(exec(&mut r), "");
    r.enter("CLEAR");
    assert_eq!(exec(&mut r), "");
    r.enter("PRINT A%");
    assert_eq!(exec(&mut r), "7\n");
    r.enter("PRINT dyn%");
    assert_eq!(exec(&mut r), "No such variable dyn%\n");
}

#[test]
fn test_statics_survive_run() {
    let mut r = Runtime::default();
    r.enter("Z%=123");
    assert_eq!(exec(&mut r), "");
    r.enter("10 PRINT Z%");
    r.enter("RUN");
    assert_eq!(exec(&mut r), "123\n");
}

#[test]
fn test_oscli_runs_a_host_command() {
    let mut r = Runtime::default();
    r.enter("OSCLI \"echo hi\"");
    assert_eq!(exec(&mut r), "hi\n");
    let mut r = Runtime::default();
    r.enter("*echo star");
    assert_eq!(exec(&mut r), "star\n");
}

#[test]
fn test_assembler_is_unsupported() {
    assert_eq!(
        run_program(&["10 [", "20 ]"]),
        "Unsupported statement at line 10\n"
    );
}

#[test]
fn test_deleting_a_line_edits_the_program() {
    let mut r = Runtime::default();
    r.enter("10 PRINT \"a\"");
    r.enter("20 PRINT \"b\"");
    r.enter("20");
    r.enter("RUN");
    assert_eq!(exec(&mut r), "a\n");
}

#[test]
fn test_time_pseudo_variable() {
    let mut r = Runtime::default();
    r.enter("TIME=5000:PRINT TIME>=5000 AND TIME<5100");
    assert_eq!(exec(&mut r), "-1\n");
}

#[test]
fn test_trace_is_accepted_and_ignored() {
    let mut r = Runtime::default();
    r.enter("TRACE ON:PRINT 1:TRACE OFF");
    assert_eq!(exec(&mut r), "1\n");
}
