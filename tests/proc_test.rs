mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_proc_with_parameters() {
    assert_eq!(
        run_program(&[
            "10 PROCgreet(\"world\",2)",
            "20 END",
            "30 DEF PROCgreet(who$,n%)",
            "40 FOR I%=1 TO n%:PRINT \"hi \";who$:NEXT",
            "50 ENDPROC",
        ]),
        "hi world\nhi world\n"
    );
}

#[test]
fn test_parameters_are_saved_and_restored() {
    assert_eq!(
        run_program(&[
            "10 x%=7",
            "20 PROCshadow(99)",
            "30 PRINT x%",
            "40 END",
            "50 DEF PROCshadow(x%)",
            "60 PRINT x%",
            "70 ENDPROC",
        ]),
        "99\n7\n"
    );
}

#[test]
fn test_local_restores_on_endproc() {
    assert_eq!(
        run_program(&[
            "10 v%=5:s$=\"keep\"",
            "20 PROCtouch",
            "30 PRINT v%;\" \";s$",
            "40 END",
            "50 DEF PROCtouch",
            "60 LOCAL v%,s$",
            "70 v%=1:s$=\"gone\"",
            "80 ENDPROC",
        ]),
        "5 keep\n"
    );
}

#[test]
fn test_local_outside_subprogram() {
    let mut r = Runtime::default();
    r.enter("LOCAL x%");
    assert_eq!(exec(&mut r), "Not LOCAL\n");
}

#[test]
fn test_fn_result_and_recursion() {
    assert_eq!(
        run_program(&[
            "10 PRINT FNfact(5)",
            "20 END",
            "30 DEF FNfact(n%)",
            "40 IF n%=0 THEN =1",
            "50 =n%*FNfact(n%-1)",
        ]),
        "120\n"
    );
}

#[test]
fn test_single_line_fn() {
    assert_eq!(
        run_program(&[
            "10 PRINT FNdouble(21)",
            "20 END",
            "30 DEF FNdouble(n%)=n%*2",
        ]),
        "42\n"
    );
}

#[test]
fn test_return_parameter_of_unset_variable_starts_at_zero() {
    assert_eq!(
        run_program(&[
            "10 PROCpoke(RETURN fresh%)",
            "20 PRINT fresh%",
            "30 END",
            "40 DEF PROCpoke(RETURN x%)",
            "50 PRINT x%",
            "60 x%=31",
            "70 ENDPROC",
        ]),
        "0\n31\n"
    );
}

#[test]
fn test_argument_count_errors() {
    assert_eq!(
        run_program(&[
            "10 PROCone(1,2)",
            "20 END",
            "30 DEF PROCone(a%)",
            "40 ENDPROC",
        ]),
        "Arguments one at line 10\n"
    );
    assert_eq!(
        run_program(&[
            "10 PROCone",
            "20 END",
            "30 DEF PROCone(a%)",
            "40 ENDPROC",
        ]),
        "Arguments one at line 10\n"
    );
}

#[test]
fn test_missing_proc_reports() {
    assert_eq!(
        run_program(&["10 PROCnowhere"]),
        "No such FN/PROC nowhere at line 10\n"
    );
}

#[test]
fn test_fn_used_as_statement_is_bad_call() {
    assert_eq!(
        run_program(&["10 FNx", "20 DEF FNx=1"]),
        "Bad call at line 10\n"
    );
}

#[test]
fn test_endproc_outside_procedure() {
    let mut r = Runtime::default();
    r.enter("ENDPROC");
    assert_eq!(exec(&mut r), "Not in a procedure\n");
}

#[test]
fn test_array_return_parameter_copies_back() {
    assert_eq!(
        run_program(&[
            "10 DIM a%(2):a%(1)=5",
            "20 PROCfill(RETURN a%())",
            "30 PRINT a%(0);a%(1);a%(2)",
            "40 END",
            "50 DEF PROCfill(RETURN t%())",
            "60 t%(0)=7:t%(2)=9",
            "70 ENDPROC",
        ]),
        "759\n"
    );
}

#[test]
fn test_gosub_and_return() {
    assert_eq!(
        run_program(&[
            "10 GOSUB 40",
            "20 PRINT \"back\"",
            "30 END",
            "40 PRINT \"sub\"",
            "50 RETURN",
        ]),
        "sub\nback\n"
    );
    let mut r = Runtime::default();
    r.enter("RETURN");
    assert_eq!(exec(&mut r), "Not in a subroutine\n");
}

#[test]
fn test_on_goto_gosub() {
    assert_eq!(
        run_program(&[
            "10 FOR I%=1 TO 4",
            "20 ON I% GOSUB 60,70 ELSE PRINT \"high\";I%",
            "30 NEXT",
            "40 END",
            "60 PRINT \"one\":RETURN",
            "70 PRINT \"two\":RETURN",
        ]),
        "one\ntwo\nhigh3\nhigh4\n"
    );
}

#[test]
fn test_on_proc() {
    assert_eq!(
        run_program(&[
            "10 ON 2 PROCa,PROCb",
            "20 END",
            "30 DEF PROCa:PRINT \"a\":ENDPROC",
            "40 DEF PROCb:PRINT \"b\":ENDPROC",
        ]),
        "b\n"
    );
}
