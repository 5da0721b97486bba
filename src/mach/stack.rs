use super::val::Value;
use super::var::{Lvalue, Saved};
use crate::lang::Error;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Everything pushed between a statement and its closer must fit; the
/// limit is generous but finite so runaway recursion reports "Stack
/// full" instead of aborting.
const STACK_LIMIT: usize = 100_000;

/// ## The Basic stack
///
/// One stack holds both operand values and the control frames of every
/// construct. Closers find their opener by popping; anything between a
/// closer and its frame is unwound silently, which is what gives an
/// `ENDWHILE` its historical power to abandon an unterminated inner
/// `REPEAT`.
///
/// Frames that save variable state (`Local`, `RetParm`, `ErrorFrame`,
/// `DataFrame`) need interpreter context to clean up, so the stack
/// itself only stores and pops; the owner restores.

#[derive(Debug)]
pub enum Frame {
    Value(Value),
    While {
        cond: usize,
        body: usize,
    },
    Repeat {
        body: usize,
    },
    For {
        target: Lvalue,
        body: usize,
        limit: Value,
        step: Value,
        simple: bool,
    },
    Gosub {
        ret: usize,
    },
    Proc {
        ret: usize,
        name: Rc<str>,
        parms: usize,
    },
    Fn {
        ret: usize,
        name: Rc<str>,
        parms: usize,
    },
    Local {
        target: Lvalue,
        old: Saved,
    },
    RetParm {
        ret_to: Lvalue,
        target: Lvalue,
        old: Saved,
    },
    ErrorFrame {
        prev: super::Handler,
    },
    DataFrame {
        ptr: Option<super::DataPtr>,
    },
}

#[derive(Debug)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack { frames: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= STACK_LIMIT {
            return Err(error!(StackFull));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn push_value(&mut self, value: Value) -> Result<()> {
        self.push(Frame::Value(value))
    }

    /// A mismatched pop is an engine invariant violation, not a user
    /// error.
    pub fn pop_value(&mut self) -> Result<Value> {
        match self.frames.pop() {
            Some(Frame::Value(value)) => Ok(value),
            Some(other) => {
                self.frames.push(other);
                Err(error!(Broken; "stack"))
            }
            None => Err(error!(Broken; "stack")),
        }
    }

    /// True when a PROC or FN frame is live anywhere on the stack.
    pub fn in_subprogram(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| matches!(frame, Frame::Proc { .. } | Frame::Fn { .. }))
    }

    /// True when an FN frame is live: `=` has somewhere to return to.
    pub fn in_function(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| matches!(frame, Frame::Fn { .. }))
    }
}
