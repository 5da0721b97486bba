//! # Beeb BASIC
//!
//! An interpreter for the BBC BASIC V/VI dialect: line-numbered
//! programs, PROC/FN subprograms with RETURN parameters, block
//! IF/CASE/WHILE structures, error trapping with ON ERROR, and the
//! classic indirection operators over a flat workspace.
//!
//! The `lang` module turns source lines into executable tokens; the
//! `mach` module owns the machine that runs them. The engine performs
//! no terminal I/O of its own: `term` is the stock front-end that
//! drives a `mach::Runtime` and renders its events.

#[path = "doc/introduction.rs"]
#[allow(non_snake_case)]
pub mod _Introduction;

#[path = "doc/statements.rs"]
#[allow(non_snake_case)]
pub mod __Statements;

#[macro_use]
pub mod lang;
pub mod mach;
pub mod term;
