mod common;
use common::*;

#[test]
fn test_read_numeric_and_string_fields() {
    assert_eq!(
        run_program(&[
            "10 READ A%,B$,C",
            "20 PRINT A%;\" \";B$;\" \";C",
            "30 DATA 6, plain text, 1.5",
        ]),
        "6 plain text 1.5\n"
    );
}

#[test]
fn test_numeric_fields_evaluate_as_expressions() {
    assert_eq!(
        run_program(&[
            "10 X%=4",
            "20 READ A%",
            "30 PRINT A%",
            "40 DATA 2*3+X%",
        ]),
        "10\n"
    );
}

#[test]
fn test_quoted_strings_fold_doubled_quotes() {
    assert_eq!(
        run_program(&[
            "10 READ A$,B$",
            "20 PRINT A$;\"|\";B$",
            "30 DATA \"say \"\"hi\"\", with, comma\", tail",
        ]),
        "say \"hi\", with, comma|tail\n"
    );
}

#[test]
fn test_read_spans_data_lines() {
    assert_eq!(
        run_program(&[
            "10 DATA 1",
            "20 DATA 2,3",
            "30 READ A%,B%,C%",
            "40 PRINT A%;B%;C%",
        ]),
        "123\n"
    );
}

#[test]
fn test_out_of_data() {
    assert_eq!(
        run_program(&["10 DATA 1", "20 READ A%,B%"]),
        "Out of data at line 20\n"
    );
    assert_eq!(
        run_program(&["10 READ A%"]),
        "Out of data at line 10\n"
    );
}

#[test]
fn test_restore_to_line() {
    assert_eq!(
        run_program(&[
            "10 DATA 1",
            "20 DATA 2",
            "30 READ A%:RESTORE 20:READ B%:RESTORE:READ C%",
            "40 PRINT A%;B%;C%",
        ]),
        "121\n"
    );
}

#[test]
fn test_local_data_and_restore_data() {
    assert_eq!(
        run_program(&[
            "10 DATA 7,8",
            "20 READ A%",
            "30 LOCAL DATA",
            "40 READ B%",
            "50 RESTORE DATA",
            "60 READ C%",
            "70 PRINT A%;B%;C%",
        ]),
        "788\n"
    );
}

#[test]
fn test_data_statement_is_skipped_in_flow() {
    assert_eq!(
        run_program(&[
            "10 PRINT \"a\";:DATA 9",
            "20 PRINT \"b\"",
            "30 READ X%:PRINT X%",
        ]),
        "ab\n9\n"
    );
}
