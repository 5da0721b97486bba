use crate::lang::lex;
use crate::lang::{Error, Token};
use std::collections::{BTreeMap, HashMap};

type Result<T> = std::result::Result<T, Error>;

/// ## The tokenized program
///
/// All executable tokens live in one flat stream: the numbered program
/// lines first, then one segment per loaded library, then whatever
/// direct-mode commands have been entered this session. Each line ends
/// with `Eol`; each segment ends with `EndProg`. Addresses are indices
/// into the stream and stay valid until the program is edited, which
/// rebuilds everything and discards every resolution.
///
/// The resolver's rewrites (`LineNum` → `LineAddr`, `Call` → `CallIdx`,
/// `Case` → `CaseTable`, ...) mutate tokens in place; case tables live
/// here so a rewritten token can refer to one by index.

#[derive(Debug)]
pub struct Program {
    tokens: Vec<Token>,
    lines: Vec<LineSpan>,
    main_lines: usize,
    main_end: usize,
    pub case_tables: Vec<CaseTable>,
    pub while_exits: HashMap<usize, usize>,
    /// Line index where the last DEF scan stopped (§ resolver).
    pub last_search: usize,
    libraries: Vec<Library>,
}

#[derive(Debug, Clone)]
pub struct LineSpan {
    pub number: u16,
    /// Address of the first executable token.
    pub start: usize,
    /// Address of the line's Eol token.
    pub end: usize,
}

#[derive(Debug)]
pub struct Library {
    pub lib: usize,
    pub name: String,
    /// Range of indices into `lines`.
    pub first: usize,
    pub last: usize,
    pub scanned: bool,
}

#[derive(Debug)]
pub struct CaseTable {
    /// (expression address, body address) per WHEN clause.
    pub whens: Vec<(usize, usize)>,
    /// OTHERWISE body, or the token after ENDCASE.
    pub default: usize,
}

impl Program {
    pub fn build(source: &BTreeMap<u16, String>) -> Result<Program> {
        let mut tokens = Vec::new();
        let mut lines = Vec::new();
        for (number, text) in source {
            let lexed = lex::lex_fragment(text).map_err(|e| e.in_line(Some(*number)))?;
            let start = tokens.len();
            tokens.extend(lexed);
            lines.push(LineSpan {
                number: *number,
                start,
                end: tokens.len(),
            });
            tokens.push(Token::Eol);
        }
        tokens.push(Token::EndProg);
        let main_lines = lines.len();
        let main_end = tokens.len();
        Ok(Program {
            tokens,
            lines,
            main_lines,
            main_end,
            case_tables: Vec::new(),
            while_exits: HashMap::new(),
            last_search: 0,
            libraries: Vec::new(),
        })
    }

    pub fn token(&self, addr: usize) -> &Token {
        self.tokens.get(addr).unwrap_or(&Token::EndProg)
    }

    pub fn set_token(&mut self, addr: usize, token: Token) {
        self.tokens[addr] = token;
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn truncate(&mut self, len: usize) {
        self.tokens.truncate(len);
    }

    /// First executable token of the program, or the end marker when
    /// the program is empty.
    pub fn start(&self) -> usize {
        match self.lines.first() {
            Some(span) => span.start,
            None => self.main_end - 1,
        }
    }

    pub fn main_lines(&self) -> usize {
        self.main_lines
    }

    pub fn line(&self, index: usize) -> &LineSpan {
        &self.lines[index]
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Index of the line containing `addr`, if any numbered line does.
    pub fn line_index_of(&self, addr: usize) -> Option<usize> {
        match self
            .lines
            .binary_search_by(|span| span.start.cmp(&addr))
        {
            Ok(index) => Some(index),
            Err(0) => None,
            Err(index) => {
                let span = &self.lines[index - 1];
                if addr <= span.end {
                    Some(index - 1)
                } else {
                    None
                }
            }
        }
    }

    pub fn line_for(&self, addr: usize) -> Option<u16> {
        self.line_index_of(addr).map(|index| self.lines[index].number)
    }

    /// Locate a line by number with the original's linear scan. Only
    /// the main program is addressable by line number.
    pub fn find_line(&self, number: u16) -> Result<usize> {
        for index in 0..self.main_lines {
            if self.lines[index].number == number {
                return Ok(index);
            }
        }
        Err(error!(NoSuchLine))
    }

    /// The library whose segment contains `addr`; decides symbol table
    /// search order.
    pub fn library_at(&self, addr: usize) -> Option<usize> {
        let index = self.line_index_of(addr)?;
        self.libraries
            .iter()
            .find(|lib| index >= lib.first && index <= lib.last)
            .map(|lib| lib.lib)
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn library_mut(&mut self, at: usize) -> &mut Library {
        &mut self.libraries[at]
    }

    /// Append a library segment. Unnumbered lines are numbered
    /// sequentially; the text is otherwise tokenized like program text.
    pub fn attach_library(&mut self, lib: usize, name: &str, text: &str) -> Result<()> {
        let first = self.lines.len();
        let mut auto = 0u16;
        for raw in text.lines() {
            if raw.trim().is_empty() {
                continue;
            }
            let (number, tokens) = lex::lex(raw).map_err(|e| e.with_detail(name))?;
            let number = match number {
                Some(n) => n,
                None => {
                    auto += 1;
                    auto
                }
            };
            let start = self.tokens.len();
            self.tokens.extend(tokens);
            self.lines.push(LineSpan {
                number,
                start,
                end: self.tokens.len(),
            });
            self.tokens.push(Token::Eol);
        }
        if self.lines.len() == first {
            return Err(error!(BadLibrary; name));
        }
        self.tokens.push(Token::EndProg);
        self.libraries.push(Library {
            lib,
            name: name.to_string(),
            first,
            last: self.lines.len() - 1,
            scanned: false,
        });
        Ok(())
    }

    /// Append a direct-mode command and return its start address.
    pub fn append_direct(&mut self, tokens: Vec<Token>) -> usize {
        let start = self.tokens.len();
        self.tokens.extend(tokens);
        self.tokens.push(Token::Eol);
        self.tokens.push(Token::EndProg);
        start
    }

    pub fn push_case_table(&mut self, table: CaseTable) -> usize {
        self.case_tables.push(table);
        self.case_tables.len() - 1
    }

    /// Revert resolved PROC/FN call sites to their unresolved form and
    /// forget library scans. Needed whenever the variable arena is
    /// discarded: the embedded record indices die with it, and the
    /// libraries' private variables need recreating.
    pub fn clear_call_fixups(&mut self) {
        for token in self.tokens.iter_mut() {
            if let Token::CallIdx(name, _) = token {
                *token = Token::Call(name.clone());
            }
        }
        for library in self.libraries.iter_mut() {
            library.scanned = false;
        }
    }

    /// First main-program line at or after `number` containing a DATA
    /// token, for RESTORE.
    pub fn data_line_from(&self, number: u16) -> Option<(usize, usize)> {
        for index in 0..self.main_lines {
            let span = &self.lines[index];
            if span.number < number {
                continue;
            }
            if let Some(addr) = self.data_token_in(index) {
                return Some((index, addr));
            }
        }
        None
    }

    /// Next DATA line strictly after line `index`.
    pub fn next_data_line(&self, index: usize) -> Option<(usize, usize)> {
        for next in index + 1..self.main_lines {
            if let Some(addr) = self.data_token_in(next) {
                return Some((next, addr));
            }
        }
        None
    }

    fn data_token_in(&self, index: usize) -> Option<usize> {
        let span = &self.lines[index];
        (span.start..span.end).find(|addr| matches!(self.tokens[*addr], Token::Data(_)))
    }
}
