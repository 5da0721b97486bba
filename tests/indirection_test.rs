mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_byte_and_word_indirection() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 16",
            "20 !P%=&12345678",
            "30 PRINT ~?P%;\" \";~P%?3",
        ]),
        "78 12\n"
    );
}

#[test]
fn test_long_and_float_indirection() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 16",
            "20 ]P%=123456789012345",
            "30 PRINT ]P%",
            "40 |P%=2.5",
            "50 PRINT |P%",
        ]),
        "123456789012345\n2.5\n"
    );
}

#[test]
fn test_string_indirection_uses_cr_terminator() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 32",
            "20 $P%=\"HI THERE\"",
            "30 PRINT $P%;\" \";LEN($P%)",
        ]),
        "HI THERE 8\n"
    );
}

#[test]
fn test_dyadic_indirection_as_value_and_target() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 16",
            "20 P%?5=200",
            "30 PRINT ?(P%+5);\" \";P%?5",
        ]),
        "200 200\n"
    );
}

#[test]
fn test_indirection_via_for_loop() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 8",
            "20 FOR I%=0 TO 7:P%?I%=I%*2:NEXT",
            "30 T%=0",
            "40 FOR I%=0 TO 7:T%=T%+P%?I%:NEXT",
            "50 PRINT T%",
        ]),
        "56\n"
    );
}

#[test]
fn test_dim_block_addresses_do_not_overlap() {
    assert_eq!(
        run_program(&[
            "10 DIM A% 9, B% 9",
            "20 PRINT B%-A%",
        ]),
        "10\n"
    );
}

#[test]
fn test_offheap_blocks() {
    assert_eq!(
        run_program(&[
            "10 DIM HIMEM K% 100",
            "20 ?K%=7:PRINT ?K%",
            "30 DIM HIMEM K% -1",
        ]),
        "7\n"
    );
}

#[test]
fn test_clear_himem_releases_everything() {
    let mut r = Runtime::default();
    r.enter("DIM HIMEM A% 50");
    assert_eq!(exec(&mut r), "");
    r.enter("CLEAR HIMEM");
    assert_eq!(exec(&mut r), "");
    // Freeing an already-released block reports.
    r.enter("DIM HIMEM A% -1");
    assert_eq!(exec(&mut r), "Bad HIMEM\n");
}

#[test]
fn test_out_of_range_indirection_reports() {
    let mut r = Runtime::default();
    r.enter("PRINT ?99999999");
    assert_eq!(exec(&mut r), "Number is out of range\n");
}
