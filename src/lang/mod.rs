#[macro_use]
pub mod error;
pub mod lex;
pub mod token;

pub use error::{Error, ErrorCode};
pub use token::{Func, Operator, Token, Word};

#[cfg(test)]
mod tests;

/// Highest line number the tokenizer accepts.
pub const MAX_LINE: u16 = 65279;

/// Static slot index of `@%`; slots 1..=26 are `A%..Z%` and slot 0 is
/// reserved.
pub const ATPC: u8 = 27;
