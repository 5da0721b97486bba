//! ## The machine
//!
//! `Runtime` owns the whole interpreter: program, variables, the Basic
//! stack, the byte window, the cursor, and the error handler chain. The
//! host drives it with `enter` and `execute`; the engine never touches
//! the terminal itself, it hands `Event`s back instead.

pub mod eval;
pub mod exec;
pub mod memory;
pub mod program;
pub mod resolve;
pub mod stack;
pub mod val;
pub mod var;

#[cfg(test)]
mod tests;

use crate::lang::{lex, Error, ErrorCode, Token};
use memory::Memory;
use program::Program;
use stack::{Frame, Stack};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use val::Value;
use var::{Lvalue, Saved, VarBody, Variables};

type Result<T> = std::result::Result<T, Error>;

/// What `execute` hands back to the host.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Nothing left to run; give me a command line.
    Stopped,
    /// The cycle budget ran out; call again (and poll for escape).
    Running,
    Print(String),
    /// INPUT wants a reply fed through `enter`.
    Input(String),
    Errors(Vec<Error>),
    Quit(i32),
}

/// The installed error handler. `Local` remembers the stack depth at
/// installation; transfer resets the stack to that snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Handler {
    None,
    Global { addr: usize },
    Local { addr: usize, depth: usize },
}

/// DATA cursor: line index and byte offset into that line's DATA text.
pub type DataPtr = (usize, usize);

#[derive(Debug)]
pub(crate) struct Pending {
    pub prompt: String,
    pub targets: Vec<Lvalue>,
    pub filled: usize,
    pub line_mode: bool,
}

pub struct Runtime {
    source: BTreeMap<u16, String>,
    installed: Vec<(String, String)>,
    dirty: bool,
    pub(crate) program: Program,
    pub(crate) stack: Stack,
    pub(crate) vars: Variables,
    pub(crate) memory: Memory,
    pub(crate) cursor: usize,
    running: bool,
    escape: Arc<AtomicBool>,
    pub(crate) handler: Handler,
    pub(crate) last_error: Option<Error>,
    pub(crate) data_ptr: Option<DataPtr>,
    out: String,
    pub(crate) count: usize,
    pub(crate) pending: Option<Pending>,
    pending_error: Option<Error>,
    pub(crate) quit: Option<i32>,
    pub(crate) rnd: u64,
    pub(crate) last_rnd1: f64,
    epoch: Instant,
    pub(crate) time_offset: i64,
    cascade_if: bool,
    pub(crate) fn_return: bool,
    pub(crate) fn_depth: usize,
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime {
            source: BTreeMap::new(),
            installed: Vec::new(),
            dirty: false,
            program: Program::build(&BTreeMap::new()).unwrap_or_else(|_| unreachable!()),
            stack: Stack::new(),
            vars: Variables::new(),
            memory: Memory::new(),
            cursor: 0,
            running: false,
            escape: Arc::new(AtomicBool::new(false)),
            handler: Handler::None,
            last_error: None,
            data_ptr: None,
            out: String::new(),
            count: 0,
            pending: None,
            pending_error: None,
            quit: None,
            rnd: 0x2545F4914F6CDD1D,
            last_rnd1: 0.0,
            epoch: Instant::now(),
            time_offset: 0,
            cascade_if: false,
            fn_return: false,
            fn_depth: 0,
        }
    }

    /// The escape flag is shared so a signal handler thread can set it
    /// while the engine is deep inside a loop.
    pub fn escape_flag(&self) -> Arc<AtomicBool> {
        self.escape.clone()
    }

    pub fn interrupt(&mut self) {
        self.escape.store(true, Ordering::SeqCst);
    }

    /// The cascade IF tweak: a block IF whose THEN is not last on the
    /// line searches for ENDIF instead of ELSE.
    pub fn set_cascade_if(&mut self, on: bool) {
        self.cascade_if = on;
    }

    pub(crate) fn cascade_if(&self) -> bool {
        self.cascade_if
    }

    /// Make a library available without going through the filesystem.
    /// Installed libraries survive program edits.
    pub fn install_library(&mut self, name: &str, text: &str) -> std::result::Result<(), Error> {
        let lib = self.vars.add_lib();
        self.program.attach_library(lib, name, text)?;
        self.installed.push((name.to_string(), text.to_string()));
        Ok(())
    }

    /// Accept one line from the host: a numbered line edits the
    /// program, an unnumbered line executes immediately, and when an
    /// INPUT is pending the line is its reply. Returns false when there
    /// was nothing to do.
    pub fn enter(&mut self, line: &str) -> bool {
        if self.pending.is_some() {
            if let Err(error) = self.feed_input(line) {
                self.pending = None;
                self.pending_error = Some(error);
            }
            return true;
        }
        let (number, rest) = lex::split_line_number(line);
        if let Some(number) = number {
            if rest.trim().is_empty() {
                self.source.remove(&number);
            } else {
                if let Err(error) = lex::lex_fragment(rest) {
                    self.pending_error = Some(error.in_line(Some(number)));
                    return true;
                }
                self.source.insert(number, rest.to_string());
            }
            self.dirty = true;
            return true;
        }
        let tokens = match lex::lex_fragment(line) {
            Ok(tokens) => tokens,
            Err(error) => {
                self.pending_error = Some(error);
                return true;
            }
        };
        if tokens.is_empty() {
            return false;
        }
        if self.dirty {
            if let Err(error) = self.rebuild() {
                self.pending_error = Some(error);
                return true;
            }
        }
        // Per-command state, as the original resets it for each direct
        // line.
        self.program.last_search = 0;
        self.data_ptr = None;
        self.last_error = None;
        self.cursor = self.program.append_direct(tokens);
        self.running = true;
        true
    }

    /// Run up to `cycles` statements and report what happened.
    pub fn execute(&mut self, mut cycles: usize) -> Event {
        loop {
            if !self.out.is_empty() {
                return Event::Print(std::mem::take(&mut self.out));
            }
            if let Some(error) = self.pending_error.take() {
                return Event::Errors(vec![error]);
            }
            if let Some(code) = self.quit.take() {
                self.running = false;
                return Event::Quit(code);
            }
            if let Some(pending) = &self.pending {
                return Event::Input(pending.prompt.clone());
            }
            if !self.running {
                return Event::Stopped;
            }
            if cycles == 0 {
                return Event::Running;
            }
            cycles -= 1;
            if let Err(error) = self.guarded_step(0) {
                self.running = false;
                self.pending_error = Some(error);
            }
        }
    }

    /// One statement plus error routing. `base_depth` is nonzero while
    /// running inside a function body: a handler installed beneath it
    /// cannot catch here and the error propagates out to the level that
    /// installed it.
    pub(crate) fn guarded_step(&mut self, base_depth: usize) -> Result<()> {
        if self.escape.swap(false, Ordering::SeqCst) {
            return self.trap(error!(Escape), base_depth);
        }
        match self.step() {
            Ok(()) => Ok(()),
            Err(error) => self.trap(error, base_depth),
        }
    }

    fn trap(&mut self, error: Error, base_depth: usize) -> Result<()> {
        let error = error.in_line(self.program.line_for(self.cursor));
        if error.is_fatal() {
            return Err(error);
        }
        self.last_error = Some(error.clone());
        match self.handler {
            Handler::Local { addr, depth } if depth >= base_depth => {
                self.unwind_to_depth(depth);
                self.cursor = addr;
                Ok(())
            }
            Handler::Global { addr } if base_depth == 0 => {
                // A global trap starts afresh at the handler: the whole
                // stack is discarded (with cleanup) first.
                self.unwind_to_depth(0);
                self.cursor = addr;
                Ok(())
            }
            _ => Err(error),
        }
    }

    /// Dispatch on the token under the cursor.
    fn step(&mut self) -> Result<()> {
        use crate::lang::Operator;
        let token = self.program.token(self.cursor).clone();
        match token {
            Token::Eol | Token::Colon => {
                self.cursor += 1;
                Ok(())
            }
            Token::EndProg => {
                self.end_run();
                Ok(())
            }
            Token::Word(word) => self.statement(word),
            Token::If => self.resolve_if(),
            Token::SingleIf => self.single_if(),
            Token::BlockIf(then_at, else_at) => self.block_if(then_at, else_at),
            Token::Else => self.resolve_else(),
            Token::ElseJump(addr) | Token::WhenJump(addr) | Token::OtherwiseJump(addr) => {
                self.cursor = addr;
                Ok(())
            }
            Token::Case => self.resolve_case(),
            Token::CaseTable(table) => self.case_statement(table),
            Token::When | Token::Otherwise => self.resolve_when_skip(),
            Token::Data(_) => {
                self.skip_to_eol();
                Ok(())
            }
            Token::OsCmd(cmd) => {
                self.cursor += 1;
                self.host_command(&cmd)
            }
            Token::Call(_) | Token::CallIdx(..) => self.proc_statement(),
            Token::Var(_) | Token::Static(_) => self.assignment(),
            Token::Operator(Operator::Query)
            | Token::Operator(Operator::Pling)
            | Token::Operator(Operator::Long)
            | Token::Operator(Operator::Bar)
            | Token::Operator(Operator::Dollar) => self.assignment(),
            Token::Operator(Operator::Eq) => self.fn_return_statement(),
            Token::Func(func) => self.pseudo_assignment(func),
            Token::LBracket => Err(error!(Unsupported)),
            _ => Err(error!(Syntax)),
        }
    }

    pub(crate) fn end_run(&mut self) {
        self.running = false;
        self.handler = Handler::None;
        self.escape.store(false, Ordering::SeqCst);
    }

    /// RUN (and its direct command): fresh variables, fresh stack,
    /// cursor at the first line. Static integers and off-heap blocks
    /// survive by contract.
    pub(crate) fn start_run(&mut self) -> Result<()> {
        if self.dirty {
            self.rebuild()?;
        }
        self.vars.clear();
        self.program.clear_call_fixups();
        self.program.last_search = 0;
        self.stack.clear();
        self.memory.reset();
        self.handler = Handler::None;
        self.data_ptr = None;
        self.last_error = None;
        self.count = 0;
        self.cursor = self.program.start();
        self.running = true;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.program = Program::build(&self.source)?;
        self.vars.clear();
        for (name, text) in self.installed.clone() {
            let lib = self.vars.add_lib();
            self.program.attach_library(lib, &name, &text)?;
        }
        self.stack.clear();
        self.memory.reset();
        self.handler = Handler::None;
        self.data_ptr = None;
        self.dirty = false;
        Ok(())
    }

    // ----- cursor helpers -----

    pub(crate) fn tok(&self) -> Token {
        self.program.token(self.cursor).clone()
    }

    pub(crate) fn at_eos(&self) -> bool {
        self.program.token(self.cursor).at_eos()
    }

    pub(crate) fn check_eos(&self) -> Result<()> {
        if self.at_eos() {
            Ok(())
        } else {
            Err(error!(Syntax))
        }
    }

    pub(crate) fn skip_to_eol(&mut self) {
        while !matches!(
            self.program.token(self.cursor),
            Token::Eol | Token::EndProg
        ) {
            self.cursor += 1;
        }
    }

    /// Address of the next statement: past one ':' or end-of-line.
    pub(crate) fn next_statement_addr(&self) -> usize {
        match self.program.token(self.cursor) {
            Token::Colon | Token::Eol => self.cursor + 1,
            _ => self.cursor,
        }
    }

    // ----- stack helpers -----

    pub(crate) fn push_value(&mut self, value: Value) -> Result<()> {
        self.stack.push_value(value)
    }

    pub(crate) fn unwind_to_depth(&mut self, depth: usize) {
        while self.stack.len() > depth {
            if let Some(frame) = self.stack.pop() {
                self.cleanup(frame);
            }
        }
    }

    /// Kind-specific cleanup when a frame is discarded during an
    /// unwind.
    pub(crate) fn cleanup(&mut self, frame: Frame) {
        match frame {
            Frame::Value(_)
            | Frame::While { .. }
            | Frame::Repeat { .. }
            | Frame::For { .. }
            | Frame::Gosub { .. }
            | Frame::Proc { .. }
            | Frame::Fn { .. } => {}
            Frame::Local { target, old } => self.restore_saved(target, old),
            Frame::RetParm { target, old, .. } => self.restore_saved(target, old),
            Frame::ErrorFrame { prev } => self.handler = prev,
            Frame::DataFrame { ptr } => self.data_ptr = ptr,
        }
    }

    /// Write a saved value back, bypassing assignment coercion.
    pub(crate) fn restore_saved(&mut self, target: Lvalue, old: Saved) {
        match (target, old) {
            (Lvalue::Static(slot), Saved::Int(value)) => self.vars.static_set(slot, value),
            (Lvalue::Scalar(id), old) => {
                let body = &mut self.vars.get_mut(id).body;
                match (body, old) {
                    (VarBody::Uint8(slot), Saved::Uint8(value)) => *slot = value,
                    (VarBody::Int(slot), Saved::Int(value)) => *slot = value,
                    (VarBody::Int64(slot), Saved::Int64(value)) => *slot = value,
                    (VarBody::Float(slot), Saved::Float(value)) => *slot = value,
                    (VarBody::Str(slot), Saved::Str(value)) => *slot = value,
                    (VarBody::Array { desc, .. }, Saved::Desc(value)) => *desc = value,
                    _ => {}
                }
            }
            (Lvalue::WholeArray(id), Saved::Desc(value)) => {
                if let VarBody::Array { desc, .. } = &mut self.vars.get_mut(id).body {
                    *desc = value;
                }
            }
            (Lvalue::Elem(id, index), old) => {
                if let VarBody::Array {
                    desc: Some(desc), ..
                } = &mut self.vars.get_mut(id).body
                {
                    match (&mut desc.data, old) {
                        (var::ArrayData::Uint8(v), Saved::Uint8(value)) => v[index] = value,
                        (var::ArrayData::Int(v), Saved::Int(value)) => v[index] = value,
                        (var::ArrayData::Int64(v), Saved::Int64(value)) => v[index] = value,
                        (var::ArrayData::Float(v), Saved::Float(value)) => v[index] = value,
                        (var::ArrayData::Str(v), Saved::Str(value)) => v[index] = value,
                        _ => {}
                    }
                }
            }
            (Lvalue::ByteMem(offset), Saved::Uint8(value)) => {
                let _ = self.memory.write_u8(offset, value);
            }
            (Lvalue::WordMem(offset), Saved::Int(value)) => {
                let _ = self.memory.write_i32(offset, value);
            }
            (Lvalue::LongMem(offset), Saved::Int64(value)) => {
                let _ = self.memory.write_i64(offset, value);
            }
            (Lvalue::FloatMem(offset), Saved::Float(value)) => {
                let _ = self.memory.write_f64(offset, value);
            }
            (Lvalue::StrMem(offset), Saved::Str(value)) => {
                let _ = self.memory.write_string(offset, &value);
            }
            _ => {}
        }
    }

    // ----- output -----

    pub(crate) fn emit(&mut self, text: &str) {
        for ch in text.chars() {
            self.out.push(ch);
            if ch == '\n' {
                self.count = 0;
            } else {
                self.count += 1;
            }
        }
    }

    /// Centiseconds for TIME.
    pub(crate) fn time_cs(&self) -> i64 {
        (self.epoch.elapsed().as_millis() / 10) as i64 + self.time_offset
    }

    pub(crate) fn set_time_cs(&mut self, value: i64) {
        self.time_offset = value - (self.epoch.elapsed().as_millis() / 10) as i64;
    }

    pub(crate) fn err_code(&self) -> i64 {
        self.last_error
            .as_ref()
            .map(|error| error.code() as i64)
            .unwrap_or(0)
    }

    pub(crate) fn erl(&self) -> i64 {
        self.last_error
            .as_ref()
            .and_then(|error| error.line())
            .unwrap_or(0) as i64
    }

    pub(crate) fn report_text(&self) -> String {
        self.last_error
            .as_ref()
            .map(|error| error.message())
            .unwrap_or_default()
    }

    pub(crate) fn stop_error(&self) -> Error {
        Error::from_code(ErrorCode::Stop)
    }
}
