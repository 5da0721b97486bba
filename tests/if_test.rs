mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_single_line_if() {
    let mut r = Runtime::default();
    r.enter("IF 1 THEN PRINT \"one\"");
    assert_eq!(exec(&mut r), "one\n");
    r.enter("IF 0 THEN PRINT \"one\"");
    assert_eq!(exec(&mut r), "");
    r.enter("IF 1 PRINT \"no then\"");
    assert_eq!(exec(&mut r), "no then\n");
}

#[test]
fn test_single_line_if_else() {
    let mut r = Runtime::default();
    r.enter("IF 0 THEN PRINT \"one\" ELSE PRINT \"two\";:PRINT 2");
    assert_eq!(exec(&mut r), "two2\n");
    r.enter("IF 1 THEN PRINT \"one\" ELSE PRINT \"two\"");
    assert_eq!(exec(&mut r), "one\n");
}

#[test]
fn test_if_with_line_number_targets() {
    assert_eq!(
        run_program(&[
            "10 IF 1 THEN 40",
            "20 PRINT \"fell\"",
            "30 END",
            "40 PRINT \"jumped\"",
        ]),
        "jumped\n"
    );
    assert_eq!(
        run_program(&[
            "10 IF 0 THEN 40 ELSE 50",
            "20 END",
            "40 PRINT \"then\"",
            "45 END",
            "50 PRINT \"else\"",
        ]),
        "else\n"
    );
}

#[test]
fn test_block_if_true() {
    assert_eq!(
        run_program(&[
            "10 X%=1",
            "20 IF X%=1 THEN",
            "30 PRINT \"one\"",
            "40 ELSE",
            "50 PRINT \"two\"",
            "60 ENDIF",
            "70 PRINT \"done\"",
        ]),
        "one\ndone\n"
    );
}

#[test]
fn test_block_if_false() {
    assert_eq!(
        run_program(&[
            "10 X%=2",
            "20 IF X%=1 THEN",
            "30 PRINT \"one\"",
            "40 ELSE",
            "50 PRINT \"two\"",
            "60 ENDIF",
            "70 PRINT \"done\"",
        ]),
        "two\ndone\n"
    );
}

#[test]
fn test_block_if_without_else() {
    assert_eq!(
        run_program(&[
            "10 IF 0 THEN",
            "20 PRINT \"body\"",
            "30 ENDIF",
            "40 PRINT \"after\"",
        ]),
        "after\n"
    );
}

#[test]
fn test_nested_block_ifs() {
    assert_eq!(
        run_program(&[
            "10 IF 1 THEN",
            "20 IF 0 THEN",
            "30 PRINT \"inner\"",
            "40 ELSE",
            "50 PRINT \"inner else\"",
            "60 ENDIF",
            "70 ELSE",
            "80 PRINT \"outer else\"",
            "90 ENDIF",
            "95 PRINT \"done\"",
        ]),
        "inner else\ndone\n"
    );
}

#[test]
fn test_block_if_false_without_endif_reports() {
    assert_eq!(
        run_program(&["10 IF 0 THEN", "20 PRINT \"body\""]),
        "Missing ENDIF at line 10\n"
    );
}

#[test]
fn test_block_if_true_without_endif_runs_to_end() {
    assert_eq!(
        run_program(&["10 IF 1 THEN", "20 PRINT \"body\""]),
        "body\n"
    );
}

#[test]
fn test_block_if_resolution_is_idempotent() {
    let mut r = Runtime::default();
    for line in &[
        "10 FOR I%=1 TO 3",
        "20 IF I%=2 THEN",
        "30 PRINT \"=2\";",
        "40 ELSE",
        "50 PRINT \".\";",
        "60 ENDIF",
        "70 NEXT",
    ] {
        r.enter(line);
    }
    r.enter("RUN");
    assert_eq!(exec(&mut r), ".=2.");
}

#[test]
fn test_cascade_if_searches_for_endif() {
    let mut r = Runtime::default();
    r.set_cascade_if(true);
    for line in &[
        "10 IF 0 THEN PRINT \"same line\"",
        "20 PRINT \"body\"",
        "30 ENDIF",
        "40 PRINT \"after\"",
    ] {
        r.enter(line);
    }
    r.enter("RUN");
    assert_eq!(exec(&mut r), "after\n");
}
