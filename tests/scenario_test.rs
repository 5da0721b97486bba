//! End-to-end behavior of the interpreter's showcase statements.

mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_for_loop_prints_one_two_three() {
    let mut r = Runtime::default();
    r.enter("FOR I%=1 TO 3:PRINT I%;\" \";:NEXT");
    assert_eq!(exec(&mut r), "1 2 3 ");
}

#[test]
fn test_repeat_until() {
    let mut r = Runtime::default();
    r.enter("A%=0:REPEAT A%+=1:UNTIL A%=5:PRINT A%");
    assert_eq!(exec(&mut r), "5\n");
}

#[test]
fn test_single_line_case() {
    let mut r = Runtime::default();
    r.enter("CASE 2 OF WHEN 1:PRINT \"a\" WHEN 2,3:PRINT \"b\" OTHERWISE:PRINT \"c\" ENDCASE");
    assert_eq!(exec(&mut r), "b\n");
}

#[test]
fn test_return_parameter_writes_back() {
    assert_eq!(
        run_program(&[
            "10 y%=10",
            "20 d%=FNf(y%)",
            "30 PRINT y%",
            "40 DEF FNf(RETURN x%) x%=x%*2:=0",
        ]),
        "20\n"
    );
}

#[test]
fn test_on_error_catches_missing_proc() {
    assert_eq!(
        run_program(&[
            "10 ON ERROR PRINT \"caught\":END",
            "20 PROC_nothere",
        ]),
        "caught\n"
    );
}

#[test]
fn test_swap_array_elements() {
    let mut r = Runtime::default();
    r.enter("DIM a%(2):a%(0)=10:a%(1)=20:a%(2)=30:SWAP a%(0),a%(2):PRINT a%(0);\" \";a%(2)");
    assert_eq!(exec(&mut r), "30 10\n");
}
