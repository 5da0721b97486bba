mod common;
use beebasic::mach::Runtime;
use common::*;

#[test]
fn test_swap_integers() {
    let mut r = Runtime::default();
    r.enter("A%=1:B%=2:SWAP A%,B%:PRINT A%;B%");
    assert_eq!(exec(&mut r), "21\n");
}

#[test]
fn test_swap_twice_is_identity() {
    let mut r = Runtime::default();
    r.enter("a$=\"x\":b$=\"y\":SWAP a$,b$:SWAP a$,b$:PRINT a$;b$");
    assert_eq!(exec(&mut r), "xy\n");
}

#[test]
fn test_swap_whole_arrays_exchange_descriptors() {
    assert_eq!(
        run_program(&[
            "10 DIM a%(1):DIM b%(5)",
            "20 a%(0)=1:b%(5)=6",
            "30 SWAP a%(),b%()",
            "40 PRINT a%(5);\" \";b%(0)",
            "50 SWAP a%(),b%()",
            "60 PRINT a%(0);\" \";b%(5)",
        ]),
        "6 1\n1 6\n"
    );
}

#[test]
fn test_swap_memory_string() {
    assert_eq!(
        run_program(&[
            "10 DIM P% 32:DIM Q% 32",
            "20 $P%=\"AB\":$Q%=\"CD\"",
            "30 SWAP $P%,$Q%",
            "40 PRINT $P%;$Q%",
        ]),
        "CDAB\n"
    );
}

#[test]
fn test_swap_type_mismatch() {
    let mut r = Runtime::default();
    r.enter("A%=1:x$=\"s\":SWAP A%,x$");
    assert_eq!(exec(&mut r), "Type mismatch\n");
    r.enter("n%%=1:SWAP A%,n%%");
    assert_eq!(exec(&mut r), "Type mismatch\n");
}
