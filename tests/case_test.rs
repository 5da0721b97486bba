mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_block_case() {
    let program = |x: &str| {
        let assign = format!("10 X$=\"{}\"", x);
        run_program(&[
            assign.as_str(),
            "20 CASE X$ OF",
            "30 WHEN \"a\":PRINT \"first\"",
            "40 WHEN \"b\",\"c\":PRINT \"second\"",
            "50 OTHERWISE:PRINT \"rest\"",
            "60 ENDCASE",
            "70 PRINT \"out\"",
        ])
    };
    assert_eq!(program("a"), "first\nout\n");
    assert_eq!(program("b"), "second\nout\n");
    assert_eq!(program("c"), "second\nout\n");
    assert_eq!(program("z"), "rest\nout\n");
}

#[test]
fn test_case_without_otherwise_falls_through() {
    assert_eq!(
        run_program(&[
            "10 CASE 9 OF",
            "20 WHEN 1:PRINT \"one\"",
            "30 ENDCASE",
            "40 PRINT \"after\"",
        ]),
        "after\n"
    );
}

#[test]
fn test_case_integer_float_promotion() {
    assert_eq!(
        run_program(&[
            "10 CASE 2 OF",
            "20 WHEN 2.0:PRINT \"float matched\"",
            "30 ENDCASE",
        ]),
        "float matched\n"
    );
    assert_eq!(
        run_program(&[
            "10 CASE 2.5 OF",
            "20 WHEN 2:PRINT \"no\"",
            "30 WHEN 2.5:PRINT \"yes\"",
            "40 ENDCASE",
        ]),
        "yes\n"
    );
}

#[test]
fn test_case_type_mismatch() {
    assert_eq!(
        run_program(&[
            "10 CASE 1 OF",
            "20 WHEN \"one\":PRINT \"no\"",
            "30 ENDCASE",
        ]),
        "Type mismatch at line 20\n"
    );
}

#[test]
fn test_nested_case() {
    assert_eq!(
        run_program(&[
            "10 CASE 1 OF",
            "20 WHEN 1",
            "30 CASE 2 OF",
            "40 WHEN 2:PRINT \"inner\"",
            "50 ENDCASE",
            "60 PRINT \"outer\"",
            "70 WHEN 2:PRINT \"wrong\"",
            "80 ENDCASE",
        ]),
        "inner\nouter\n"
    );
}

#[test]
fn test_case_resolution_is_idempotent() {
    let mut r = Runtime::default();
    for line in &[
        "10 FOR I%=1 TO 3",
        "20 CASE I% OF",
        "30 WHEN 1:PRINT \"a\";",
        "40 WHEN 2:PRINT \"b\";",
        "50 OTHERWISE:PRINT \"?\";",
        "60 ENDCASE",
        "70 NEXT",
    ] {
        r.enter(line);
    }
    r.enter("RUN");
    assert_eq!(exec(&mut r), "ab?");
    // Case tables survive the rerun and take the table fast path.
    r.enter("RUN");
    assert_eq!(exec(&mut r), "ab?");
}

#[test]
fn test_missing_endcase() {
    assert_eq!(
        run_program(&["10 CASE 1 OF", "20 WHEN 1:PRINT \"x\""]),
        "Missing ENDCASE at line 10\n"
    );
}

#[test]
fn test_missing_of() {
    assert_eq!(
        run_program(&["10 CASE 1", "20 ENDCASE"]),
        "Missing OF at line 10\n"
    );
}
