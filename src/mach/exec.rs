use super::stack::Frame;
use super::val::Value;
use super::var::{ArrayDesc, ElemType, Lvalue, ParmSlot, Saved, VarBody};
use super::{Handler, Pending, Runtime};
use crate::lang::{Error, Operator, Token, Word};
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Statement handlers
///
/// One method per statement, dispatched from `step`. Every handler is
/// entered with the cursor on its keyword token and leaves it at the
/// end of the statement (or wherever it branched to).

impl Runtime {
    pub(crate) fn statement(&mut self, word: Word) -> Result<()> {
        use Word::*;
        match word {
            Clear => self.r#clear(),
            Def => {
                self.skip_to_eol();
                Ok(())
            }
            Dim => self.r#dim(),
            End => self.r#end(),
            Endcase | Endif => {
                self.cursor += 1;
                self.check_eos()
            }
            Endproc => self.r#endproc(),
            Endwhile => self.r#endwhile(),
            Error => self.r#error(),
            For => self.r#for(),
            Gosub => self.r#gosub(),
            Goto => self.r#goto(),
            Himem => self.assign_himem(),
            Input => self.r#input(),
            Let => {
                self.cursor += 1;
                self.assignment()
            }
            Library => self.r#library(),
            Local => self.r#local(),
            Lomem => self.assign_lomem(),
            Next => self.r#next(),
            On => self.r#on(),
            Oscli => self.r#oscli(),
            Print => self.r#print(),
            Quit => self.r#quit(),
            Read => self.r#read(),
            Rem => {
                self.skip_to_eol();
                Ok(())
            }
            Repeat => self.r#repeat(),
            Report => self.r#report(),
            Restore => self.r#restore(),
            Return => self.r#return(),
            Run => {
                self.cursor += 1;
                self.start_run()
            }
            Stop => Err(self.stop_error()),
            Swap => self.r#swap(),
            Trace => self.r#trace(),
            Until => self.r#until(),
            Wait => self.r#wait(),
            While => self.r#while(),
            Line | Of | Off | Page | Spc | Step | Tab | Then | To | Top => Err(error!(Syntax)),
        }
    }

    // ----- assignment -----

    pub(crate) fn assignment(&mut self) -> Result<()> {
        let target = self.get_lvalue()?;
        match self.tok() {
            Token::Operator(Operator::Eq) => {
                self.cursor += 1;
                let value = self.expression()?;
                self.store_lvalue(&target, value)?;
            }
            Token::Operator(Operator::PlusEq) => {
                self.cursor += 1;
                let rhs = self.expression()?;
                let lhs = self.read_lvalue(&target)?;
                let value = Value::add(lhs, rhs)?;
                self.store_lvalue(&target, value)?;
            }
            Token::Operator(Operator::MinusEq) => {
                self.cursor += 1;
                let rhs = self.expression()?;
                let lhs = self.read_lvalue(&target)?;
                let value = Value::sub(lhs, rhs)?;
                self.store_lvalue(&target, value)?;
            }
            _ => return Err(error!(MissingEq)),
        }
        self.check_eos()
    }

    /// TIME= and TIME$= are the assignable pseudo-variables that lex as
    /// functions.
    pub(crate) fn pseudo_assignment(&mut self, func: crate::lang::Func) -> Result<()> {
        use crate::lang::Func;
        match func {
            Func::Time => {
                self.cursor += 1;
                self.expect_eq()?;
                let value = self.eval_any_int()?;
                self.set_time_cs(value);
                self.check_eos()
            }
            Func::TimeS => {
                // Accepted and ignored: there is no clock to set.
                self.cursor += 1;
                self.expect_eq()?;
                let _ = self.eval_str()?;
                self.check_eos()
            }
            _ => Err(error!(Syntax)),
        }
    }

    fn assign_himem(&mut self) -> Result<()> {
        self.cursor += 1;
        self.expect_eq()?;
        let value = self.eval_any_int()?;
        if self.stack.len() != 0 {
            return Err(error!(BadHimem));
        }
        self.memory.set_himem(value.max(0) as usize)?;
        self.check_eos()
    }

    fn assign_lomem(&mut self) -> Result<()> {
        self.cursor += 1;
        self.expect_eq()?;
        let value = self.eval_any_int()?;
        if self.stack.len() != 0 || self.stack.in_subprogram() {
            return Err(error!(BadHimem));
        }
        self.memory.set_lomem(value.max(0) as usize)?;
        self.check_eos()
    }

    fn expect_eq(&mut self) -> Result<()> {
        if matches!(self.tok(), Token::Operator(Operator::Eq)) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(error!(MissingEq))
        }
    }

    /// Store with assignment coercion: integers truncate floats, the
    /// byte kind wraps, strings only take strings.
    pub(crate) fn store_lvalue(&mut self, target: &Lvalue, value: Value) -> Result<()> {
        match target {
            Lvalue::Static(slot) => {
                let n = value.any_num32()?;
                self.vars.static_set(*slot, n);
                Ok(())
            }
            Lvalue::Scalar(id) => {
                let saved = match &self.vars.get(*id).body {
                    VarBody::Uint8(_) => Saved::Uint8(value.any_num64()? as u8),
                    VarBody::Int(_) => Saved::Int(value.any_num32()?),
                    VarBody::Int64(_) => Saved::Int64(value.any_num64()?),
                    VarBody::Float(_) => Saved::Float(value.any_num_f64()?),
                    VarBody::Str(_) => Saved::Str(value.into_string()?),
                    _ => return Err(error!(TypeMismatch)),
                };
                self.restore_saved(Lvalue::Scalar(*id), saved);
                Ok(())
            }
            Lvalue::Elem(id, index) => {
                let saved = match &self.vars.get(*id).body {
                    VarBody::Array { elem, .. } => match elem {
                        ElemType::Uint8 => Saved::Uint8(value.any_num64()? as u8),
                        ElemType::Int => Saved::Int(value.any_num32()?),
                        ElemType::Int64 => Saved::Int64(value.any_num64()?),
                        ElemType::Float => Saved::Float(value.any_num_f64()?),
                        ElemType::Str => Saved::Str(value.into_string()?),
                    },
                    _ => return Err(error!(ArrayMissing)),
                };
                self.restore_saved(Lvalue::Elem(*id, *index), saved);
                Ok(())
            }
            Lvalue::WholeArray(id) => self.store_whole_array(*id, value),
            Lvalue::ByteMem(offset) => {
                let n = value.any_num64()? as u8;
                self.memory.write_u8(*offset, n)
            }
            Lvalue::WordMem(offset) => {
                let n = value.any_num32()?;
                self.memory.write_i32(*offset, n)
            }
            Lvalue::LongMem(offset) => {
                let n = value.any_num64()?;
                self.memory.write_i64(*offset, n)
            }
            Lvalue::FloatMem(offset) => {
                let f = value.any_num_f64()?;
                self.memory.write_f64(*offset, f)
            }
            Lvalue::StrMem(offset) => {
                let s = value.into_string()?;
                self.memory.write_string(*offset, &s)
            }
        }
    }

    /// `a() = value`: a scalar fills every element, another array of
    /// the same shape copies element-wise.
    fn store_whole_array(&mut self, id: usize, value: Value) -> Result<()> {
        if let Value::Array(src) = value {
            let src_desc = match &self.vars.get(src).body {
                VarBody::Array {
                    desc: Some(desc), ..
                } => desc.clone(),
                _ => return Err(error!(ArrayMissing)),
            };
            match &mut self.vars.get_mut(id).body {
                VarBody::Array {
                    desc: Some(desc), ..
                } => {
                    if desc.len() != src_desc.len()
                        || std::mem::discriminant(&desc.data)
                            != std::mem::discriminant(&src_desc.data)
                    {
                        return Err(error!(TypeMismatch));
                    }
                    desc.data = src_desc.data;
                    Ok(())
                }
                _ => Err(error!(ArrayMissing)),
            }
        } else {
            let total = match &self.vars.get(id).body {
                VarBody::Array {
                    desc: Some(desc), ..
                } => desc.len(),
                _ => return Err(error!(ArrayMissing)),
            };
            for index in 0..total {
                self.store_lvalue(&Lvalue::Elem(id, index), value.clone())?;
            }
            Ok(())
        }
    }

    /// The current typed value of a location, for LOCAL and parameter
    /// frames.
    pub(crate) fn save_of(&mut self, target: &Lvalue) -> Result<Saved> {
        Ok(match target {
            Lvalue::Static(slot) => Saved::Int(self.vars.static_get(*slot)),
            Lvalue::Scalar(id) => match &self.vars.get(*id).body {
                VarBody::Uint8(n) => Saved::Uint8(*n),
                VarBody::Int(n) => Saved::Int(*n),
                VarBody::Int64(n) => Saved::Int64(*n),
                VarBody::Float(f) => Saved::Float(*f),
                VarBody::Str(s) => Saved::Str(s.clone()),
                VarBody::Array { desc, .. } => Saved::Desc(desc.clone()),
                _ => return Err(error!(TypeMismatch)),
            },
            Lvalue::WholeArray(id) => match &self.vars.get(*id).body {
                VarBody::Array { desc, .. } => Saved::Desc(desc.clone()),
                _ => return Err(error!(ArrayMissing)),
            },
            Lvalue::Elem(..) => match self.read_lvalue(target)? {
                Value::Uint8(n) => Saved::Uint8(n),
                Value::Int(n) => Saved::Int(n),
                Value::Int64(n) => Saved::Int64(n),
                Value::Float(f) => Saved::Float(f),
                Value::Str(s) => Saved::Str(s),
                Value::Array(_) => return Err(error!(TypeMismatch)),
            },
            Lvalue::ByteMem(offset) => Saved::Uint8(self.memory.read_u8(*offset)?),
            Lvalue::WordMem(offset) => Saved::Int(self.memory.read_i32(*offset)?),
            Lvalue::LongMem(offset) => Saved::Int64(self.memory.read_i64(*offset)?),
            Lvalue::FloatMem(offset) => Saved::Float(self.memory.read_f64(*offset)?),
            Lvalue::StrMem(offset) => Saved::Str(self.memory.read_string(*offset)?),
        })
    }

    fn zero_lvalue(&mut self, target: &Lvalue) -> Result<()> {
        if let Lvalue::WholeArray(id) = target {
            if let VarBody::Array { desc, .. } = &mut self.vars.get_mut(*id).body {
                *desc = None;
            }
            return Ok(());
        }
        let zero = if self.lv_is_string(target) {
            Value::Str(String::new())
        } else {
            Value::Int(0)
        };
        self.store_lvalue(target, zero)
    }

    pub(crate) fn lv_is_string(&self, target: &Lvalue) -> bool {
        match target {
            Lvalue::Scalar(id) => matches!(self.vars.get(*id).body, VarBody::Str(_)),
            Lvalue::Elem(id, _) => matches!(
                self.vars.get(*id).body,
                VarBody::Array {
                    elem: ElemType::Str,
                    ..
                }
            ),
            Lvalue::StrMem(_) => true,
            _ => false,
        }
    }

    /// Comparable kind for SWAP's same-type rule.
    fn lv_kind(&self, target: &Lvalue) -> Result<(ElemType, bool)> {
        Ok(match target {
            Lvalue::Static(_) | Lvalue::WordMem(_) => (ElemType::Int, false),
            Lvalue::ByteMem(_) => (ElemType::Uint8, false),
            Lvalue::LongMem(_) => (ElemType::Int64, false),
            Lvalue::FloatMem(_) => (ElemType::Float, false),
            Lvalue::StrMem(_) => (ElemType::Str, false),
            Lvalue::Scalar(id) => match &self.vars.get(*id).body {
                VarBody::Uint8(_) => (ElemType::Uint8, false),
                VarBody::Int(_) => (ElemType::Int, false),
                VarBody::Int64(_) => (ElemType::Int64, false),
                VarBody::Float(_) => (ElemType::Float, false),
                VarBody::Str(_) => (ElemType::Str, false),
                VarBody::Array { elem, .. } => (*elem, true),
                _ => return Err(error!(TypeMismatch)),
            },
            Lvalue::Elem(id, _) => match &self.vars.get(*id).body {
                VarBody::Array { elem, .. } => (*elem, false),
                _ => return Err(error!(ArrayMissing)),
            },
            Lvalue::WholeArray(id) => match &self.vars.get(*id).body {
                VarBody::Array { elem, .. } => (*elem, true),
                _ => return Err(error!(ArrayMissing)),
            },
        })
    }

    // ----- PRINT -----

    fn r#print(&mut self) -> Result<()> {
        self.cursor += 1;
        let mut newline = true;
        let mut hex = false;
        loop {
            let token = self.tok();
            if token.at_eos() {
                break;
            }
            match token {
                Token::Semicolon => {
                    self.cursor += 1;
                    newline = false;
                    hex = false;
                }
                Token::Comma => {
                    self.cursor += 1;
                    let zone = 10;
                    let pad = zone - self.count % zone;
                    self.emit(&" ".repeat(pad));
                    newline = false;
                    hex = false;
                }
                Token::Apostrophe => {
                    self.cursor += 1;
                    self.emit("\n");
                    newline = true;
                }
                Token::Operator(Operator::Tilde) => {
                    self.cursor += 1;
                    hex = true;
                }
                Token::Word(Word::Spc) => {
                    self.cursor += 1;
                    let n = self.expression()?.any_num64()?.max(0) as usize;
                    self.emit(&" ".repeat(n));
                    newline = true;
                }
                Token::Word(Word::Tab) => {
                    self.cursor += 1;
                    if !matches!(self.tok(), Token::LParen) {
                        return Err(error!(MissingLParen));
                    }
                    self.cursor += 1;
                    let column = self.eval_any_int()?.max(0) as usize;
                    if matches!(self.tok(), Token::Comma) {
                        self.cursor += 1;
                        let _ = self.eval_any_int()?;
                    }
                    self.expect_rparen()?;
                    if self.count > column {
                        self.emit("\n");
                    }
                    let pad = column - self.count;
                    self.emit(&" ".repeat(pad));
                    newline = true;
                }
                _ => {
                    let value = self.expression()?;
                    let text = if hex {
                        format!("{:X}", value.any_num64()?)
                    } else {
                        self.format_value(value)
                    };
                    self.emit(&text);
                    newline = true;
                }
            }
        }
        if newline {
            self.emit("\n");
        }
        Ok(())
    }

    /// Numbers honor the `@%` field width (right-justified) when one is
    /// set; the default is the compact form.
    fn format_value(&self, value: Value) -> String {
        let width = (self.vars.static_get(crate::lang::ATPC) & 0xFF) as usize;
        let text = value.to_print();
        if width > 0 && value.is_numeric() && text.len() < width {
            format!("{:>width$}", text, width = width)
        } else {
            text
        }
    }

    // ----- INPUT -----

    fn r#input(&mut self) -> Result<()> {
        self.cursor += 1;
        if self.fn_depth > 0 {
            return Err(error!(Unsupported));
        }
        let line_mode = if matches!(self.tok(), Token::Word(Word::Line)) {
            self.cursor += 1;
            true
        } else {
            false
        };
        let mut prompt = String::new();
        let mut targets = Vec::new();
        loop {
            let token = self.tok();
            if token.at_eos() {
                break;
            }
            match token {
                Token::StrLit(s) => {
                    prompt.push_str(&s);
                    self.cursor += 1;
                }
                Token::Comma | Token::Semicolon => {
                    self.cursor += 1;
                }
                _ => targets.push(self.get_lvalue()?),
            }
        }
        if targets.is_empty() {
            return Ok(());
        }
        if prompt.is_empty() {
            prompt.push('?');
        }
        self.pending = Some(Pending {
            prompt,
            targets,
            filled: 0,
            line_mode,
        });
        Ok(())
    }

    /// A reply line for the pending INPUT. Unfilled targets re-prompt.
    pub(crate) fn feed_input(&mut self, reply: &str) -> Result<()> {
        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Ok(()),
        };
        if pending.line_mode {
            let target = pending.targets[pending.filled].clone();
            self.store_lvalue(&target, Value::Str(reply.to_string()))?;
            pending.filled += 1;
        } else {
            let mut pieces = reply.split(',');
            while pending.filled < pending.targets.len() {
                let piece = match pieces.next() {
                    Some(piece) => piece,
                    None => break,
                };
                let target = pending.targets[pending.filled].clone();
                if self.lv_is_string(&target) {
                    self.store_lvalue(&target, Value::Str(piece.trim_start().to_string()))?;
                } else {
                    let value = self.eval_fragment(piece).unwrap_or(Value::Int(0));
                    self.store_lvalue(&target, value)?;
                }
                pending.filled += 1;
            }
        }
        if pending.filled < pending.targets.len() {
            pending.prompt = "?".to_string();
            self.pending = Some(pending);
        }
        Ok(())
    }

    // ----- loops -----

    fn r#for(&mut self) -> Result<()> {
        self.cursor += 1;
        let target = self.get_lvalue()?;
        let (kind, is_array) = self.lv_kind(&target)?;
        if is_array || kind == ElemType::Str {
            return Err(error!(ForVariable));
        }
        let is_int = kind != ElemType::Float;
        self.expect_eq()?;
        let init = self.expression()?;
        self.store_lvalue(&target, init)?;
        if !matches!(self.tok(), Token::Word(Word::To)) {
            return Err(error!(MissingTo));
        }
        self.cursor += 1;
        let limit = if is_int {
            Value::Int64(self.eval_any_int()?)
        } else {
            Value::Float(self.eval_f64()?)
        };
        let step = if matches!(self.tok(), Token::Word(Word::Step)) {
            self.cursor += 1;
            if is_int {
                let step = self.eval_any_int()?;
                if step == 0 {
                    return Err(error!(Silly));
                }
                Value::Int64(step)
            } else {
                let step = self.eval_f64()?;
                if step == 0.0 {
                    return Err(error!(Silly));
                }
                Value::Float(step)
            }
        } else if is_int {
            Value::Int64(1)
        } else {
            Value::Float(1.0)
        };
        self.check_eos()?;
        let simple = matches!(step, Value::Int64(1))
            && match &target {
                Lvalue::Static(_) => true,
                Lvalue::Scalar(id) => matches!(self.vars.get(*id).body, VarBody::Int(_)),
                _ => false,
            };
        let body = self.next_statement_addr();
        self.stack.push(Frame::For {
            target,
            body,
            limit,
            step,
            simple,
        })
    }

    fn r#next(&mut self) -> Result<()> {
        self.cursor += 1;
        loop {
            self.unwind_to_for()?;
            if !self.at_eos() && !matches!(self.tok(), Token::Comma) {
                let named = self.get_lvalue()?;
                loop {
                    match self.stack.top() {
                        Some(Frame::For { target, .. }) if *target == named => break,
                        Some(Frame::For { .. }) => {
                            self.stack.pop();
                            if self.unwind_to_for().is_err() {
                                return Err(error!(CantMatchFor));
                            }
                        }
                        _ => return Err(error!(CantMatchFor)),
                    }
                }
            }
            let (target, body, limit, step, simple) = match self.stack.top() {
                Some(Frame::For {
                    target,
                    body,
                    limit,
                    step,
                    simple,
                }) => (target.clone(), *body, limit.clone(), step.clone(), *simple),
                _ => return Err(error!(NoFor)),
            };
            let value = if simple {
                // The common case: int32 control, step one.
                match &target {
                    Lvalue::Static(slot) => {
                        let v = self.vars.static_get(*slot).wrapping_add(1);
                        self.vars.static_set(*slot, v);
                        Value::Int(v)
                    }
                    Lvalue::Scalar(id) => {
                        if let VarBody::Int(n) = &mut self.vars.get_mut(*id).body {
                            *n = n.wrapping_add(1);
                            Value::Int(*n)
                        } else {
                            return Err(error!(Broken; "exec"));
                        }
                    }
                    _ => return Err(error!(Broken; "exec")),
                }
            } else {
                let current = self.read_lvalue(&target)?;
                let value = Value::add(current, step.clone())?;
                self.store_lvalue(&target, value.clone())?;
                value
            };
            let ascending = match &step {
                Value::Int64(s) => *s > 0,
                Value::Float(s) => *s > 0.0,
                _ => true,
            };
            let order = Value::compare(value, limit)?;
            let keep_going = if ascending {
                order != std::cmp::Ordering::Greater
            } else {
                order != std::cmp::Ordering::Less
            };
            if keep_going {
                self.cursor = body;
                return Ok(());
            }
            self.stack.pop();
            if matches!(self.tok(), Token::Comma) {
                self.cursor += 1;
                continue;
            }
            break;
        }
        self.check_eos()
    }

    fn r#repeat(&mut self) -> Result<()> {
        self.cursor += 1;
        let body = self.next_statement_addr();
        self.stack.push(Frame::Repeat { body })
    }

    fn r#until(&mut self) -> Result<()> {
        self.cursor += 1;
        let body = self.unwind_to_repeat()?;
        let done = self.expression()?.any_num64()? != 0;
        self.check_eos()?;
        if done {
            self.stack.pop();
        } else {
            self.cursor = body;
        }
        Ok(())
    }

    fn r#while(&mut self) -> Result<()> {
        let site = self.cursor;
        self.cursor += 1;
        let cond = self.cursor;
        let taken = self.expression()?.any_num64()? != 0;
        if taken {
            let body = self.next_statement_addr();
            self.stack.push(Frame::While { cond, body })?;
            Ok(())
        } else {
            let exit = self.find_endwhile(site)?;
            self.cursor = exit;
            Ok(())
        }
    }

    fn r#endwhile(&mut self) -> Result<()> {
        let resume = self.cursor + 1;
        if !self.program.token(resume).at_eos() {
            return Err(error!(Syntax));
        }
        let (cond, body) = self.unwind_to_while()?;
        self.cursor = cond;
        let again = self.expression()?.any_num64()? != 0;
        if again {
            self.cursor = body;
        } else {
            self.stack.pop();
            self.cursor = resume;
        }
        Ok(())
    }

    /// Silent unwinds: anything piled above the wanted loop frame is
    /// discarded with its cleanup, the way an ENDWHILE abandons an
    /// unterminated inner REPEAT. Subprogram frames are a hard floor.
    fn unwind_to_while(&mut self) -> Result<(usize, usize)> {
        loop {
            match self.stack.top() {
                Some(Frame::While { cond, body }) => return Ok((*cond, *body)),
                Some(Frame::Proc { .. }) | Some(Frame::Fn { .. }) | None => {
                    return Err(error!(NoWhile))
                }
                Some(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
            }
        }
    }

    fn unwind_to_repeat(&mut self) -> Result<usize> {
        loop {
            match self.stack.top() {
                Some(Frame::Repeat { body }) => return Ok(*body),
                Some(Frame::Proc { .. }) | Some(Frame::Fn { .. }) | None => {
                    return Err(error!(NoRepeat))
                }
                Some(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
            }
        }
    }

    fn unwind_to_for(&mut self) -> Result<()> {
        loop {
            match self.stack.top() {
                Some(Frame::For { .. }) => return Ok(()),
                Some(Frame::Proc { .. }) | Some(Frame::Fn { .. }) | None => {
                    return Err(error!(NoFor))
                }
                Some(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
            }
        }
    }

    // ----- branches -----

    fn r#goto(&mut self) -> Result<()> {
        self.cursor += 1;
        let target = self.line_operand()?;
        self.check_eos()?;
        self.cursor = target;
        Ok(())
    }

    fn r#gosub(&mut self) -> Result<()> {
        self.cursor += 1;
        let target = self.line_operand()?;
        self.check_eos()?;
        self.stack.push(Frame::Gosub { ret: self.cursor })?;
        self.cursor = target;
        Ok(())
    }

    fn r#return(&mut self) -> Result<()> {
        self.cursor += 1;
        self.check_eos()?;
        loop {
            match self.stack.pop() {
                Some(Frame::Gosub { ret }) => {
                    self.cursor = ret;
                    return Ok(());
                }
                Some(frame @ Frame::Proc { .. }) | Some(frame @ Frame::Fn { .. }) => {
                    self.stack.push(frame)?;
                    return Err(error!(NoGosub));
                }
                Some(frame) => self.cleanup(frame),
                None => return Err(error!(NoGosub)),
            }
        }
    }

    fn r#on(&mut self) -> Result<()> {
        self.cursor += 1;
        if matches!(self.tok(), Token::Word(Word::Error)) {
            return self.on_error();
        }
        self.on_branch()
    }

    fn on_error(&mut self) -> Result<()> {
        self.cursor += 1;
        match self.tok() {
            Token::Word(Word::Off) => {
                self.cursor += 1;
                self.handler = Handler::None;
                self.check_eos()
            }
            Token::Word(Word::Local) => {
                self.cursor += 1;
                self.stack.push(Frame::ErrorFrame { prev: self.handler })?;
                self.handler = Handler::Local {
                    addr: self.cursor,
                    depth: self.stack.len(),
                };
                self.skip_to_eol();
                Ok(())
            }
            _ => {
                if matches!(self.handler, Handler::Local { .. }) {
                    self.stack.push(Frame::ErrorFrame { prev: self.handler })?;
                    self.handler = Handler::Local {
                        addr: self.cursor,
                        depth: self.stack.len(),
                    };
                } else {
                    self.handler = Handler::Global { addr: self.cursor };
                }
                self.skip_to_eol();
                Ok(())
            }
        }
    }

    /// ON expr GOTO/GOSUB/PROC entry [, entry]... [ELSE statements]
    fn on_branch(&mut self) -> Result<()> {
        let index = self.eval_i32()?;
        match self.tok() {
            Token::Word(word @ Word::Goto) | Token::Word(word @ Word::Gosub) => {
                self.cursor += 1;
                if index < 1 || !self.seek_on_entry(index as usize) {
                    return self.on_else(index);
                }
                let target = self.line_operand()?;
                if word == Word::Gosub {
                    self.skip_on_rest();
                    self.stack.push(Frame::Gosub { ret: self.cursor })?;
                }
                self.cursor = target;
                Ok(())
            }
            Token::Call(_) | Token::CallIdx(..) => {
                if index < 1 || !self.seek_on_entry(index as usize) {
                    return self.on_else(index);
                }
                let (name, id) = self.resolve_call_at_cursor()?;
                if !name.starts_with("PROC") {
                    return Err(error!(BadCall));
                }
                let parms = self.bind_parameters(id, &name)?;
                self.skip_on_rest();
                self.stack.push(Frame::Proc {
                    ret: self.cursor,
                    name,
                    parms,
                })?;
                self.cursor = self.proc_entry(id)?;
                Ok(())
            }
            _ => Err(error!(Syntax)),
        }
    }

    /// Leave the cursor on the `index`th comma-separated entry, false
    /// when the list is too short.
    fn seek_on_entry(&mut self, index: usize) -> bool {
        let mut remaining = index - 1;
        let mut depth = 0usize;
        while remaining > 0 {
            loop {
                let token = self.tok();
                match token {
                    Token::LParen => depth += 1,
                    Token::RParen => depth = depth.saturating_sub(1),
                    Token::Comma if depth == 0 => break,
                    Token::Else | Token::ElseJump(_) => return false,
                    _ => {
                        if token.at_eos() {
                            return false;
                        }
                    }
                }
                self.cursor += 1;
            }
            self.cursor += 1;
            remaining -= 1;
        }
        true
    }

    /// Out-of-range ON index: run the ELSE clause if there is one.
    fn on_else(&mut self, index: i32) -> Result<()> {
        loop {
            let token = self.tok();
            if matches!(token, Token::Else | Token::ElseJump(_)) {
                self.cursor += 1;
                return Ok(());
            }
            if matches!(token, Token::Eol | Token::EndProg | Token::Colon) {
                return Err(error!(OnRange; index.to_string()));
            }
            self.cursor += 1;
        }
    }

    /// Skip the rest of an ON statement so a GOSUB/PROC return resumes
    /// after the whole list.
    fn skip_on_rest(&mut self) {
        while !matches!(self.tok(), Token::Eol | Token::EndProg | Token::Colon) {
            self.cursor += 1;
        }
    }

    // ----- PROC / FN -----

    pub(crate) fn proc_statement(&mut self) -> Result<()> {
        let (name, id) = self.resolve_call_at_cursor()?;
        if !name.starts_with("PROC") {
            return Err(error!(BadCall));
        }
        let parms = self.bind_parameters(id, &name)?;
        self.check_eos()?;
        self.stack.push(Frame::Proc {
            ret: self.cursor,
            name,
            parms,
        })?;
        self.cursor = self.proc_entry(id)?;
        Ok(())
    }

    /// An FN call from the evaluator: push the frame, run the body in a
    /// nested loop until its `=` fires, and take the result off the
    /// stack.
    pub(crate) fn subprogram_call(&mut self) -> Result<Value> {
        let (name, id) = self.resolve_call_at_cursor()?;
        let parms = self.bind_parameters(id, &name)?;
        self.stack.push(Frame::Fn {
            ret: self.cursor,
            name,
            parms,
        })?;
        let base_depth = self.stack.len();
        self.cursor = self.proc_entry(id)?;
        self.fn_depth += 1;
        let result = loop {
            if self.fn_return {
                self.fn_return = false;
                break self.stack.pop_value();
            }
            if !self.running {
                break Err(error!(NotInFunction));
            }
            if let Err(error) = self.guarded_step(base_depth) {
                break Err(error);
            }
        };
        self.fn_depth -= 1;
        result
    }

    fn resolve_call_at_cursor(&mut self) -> Result<(Rc<str>, usize)> {
        match self.tok() {
            Token::CallIdx(name, id) => {
                self.cursor += 1;
                Ok((name, id))
            }
            Token::Call(name) => {
                let site = self.cursor;
                let id = self.resolve_fnproc(&name)?;
                self.program
                    .set_token(site, Token::CallIdx(name.clone(), id));
                self.cursor += 1;
                Ok((name, id))
            }
            _ => Err(error!(Broken; "exec")),
        }
    }

    fn proc_entry(&self, id: usize) -> Result<usize> {
        match &self.vars.get(id).body {
            VarBody::Proc(def) => Ok(def.entry),
            _ => Err(error!(Broken; "exec")),
        }
    }

    /// Evaluate every actual left to right, then bind each formal:
    /// save its old value to a LOCAL frame (or a RETPARM frame for a
    /// RETURN formal) and assign the actual. Returns the frame count
    /// for the matching restore on exit.
    fn bind_parameters(&mut self, id: usize, name: &str) -> Result<usize> {
        let def = match &self.vars.get(id).body {
            VarBody::Proc(def) => def.clone(),
            _ => return Err(error!(Broken; "exec")),
        };
        if !matches!(self.tok(), Token::LParen) {
            if def.parms.is_empty() {
                return Ok(0);
            }
            return Err(error!(Arguments; bare_name(name)));
        }
        if def.parms.is_empty() {
            return Err(error!(Arguments; bare_name(name)));
        }
        self.cursor += 1;
        let mut actuals: Vec<(Value, Option<Lvalue>)> = Vec::with_capacity(def.parms.len());
        for (at, parm) in def.parms.iter().enumerate() {
            if parm.is_return {
                let place = self.get_lvalue()?;
                let value = self.read_lvalue(&place)?;
                actuals.push((value, Some(place)));
            } else {
                actuals.push((self.expression()?, None));
            }
            if at + 1 < def.parms.len() {
                if !matches!(self.tok(), Token::Comma) {
                    return Err(error!(Arguments; bare_name(name)));
                }
                self.cursor += 1;
            }
        }
        if matches!(self.tok(), Token::Comma) {
            return Err(error!(Arguments; bare_name(name)));
        }
        self.expect_rparen()?;
        let context = {
            let entry = def.entry;
            self.program.library_at(entry)
        };
        for (parm, (value, ret_to)) in def.parms.iter().zip(actuals) {
            let target = match &parm.slot {
                ParmSlot::Static(slot) => Lvalue::Static(*slot),
                ParmSlot::Var(formal) => {
                    let id = match self.vars.find(formal, context) {
                        Some(id) => id,
                        None => self.vars.create(formal, context),
                    };
                    if formal.ends_with('(') {
                        Lvalue::WholeArray(id)
                    } else {
                        Lvalue::Scalar(id)
                    }
                }
            };
            let old = self.save_of(&target)?;
            match ret_to {
                Some(ret_to) => self.stack.push(Frame::RetParm {
                    ret_to,
                    target: target.clone(),
                    old,
                })?,
                None => self.stack.push(Frame::Local {
                    target: target.clone(),
                    old,
                })?,
            }
            match (&target, value) {
                // Array formals copy the whole array in; a RETURN
                // formal copies it back out on exit.
                (Lvalue::WholeArray(to), Value::Array(from)) => {
                    let desc = match &self.vars.get(from).body {
                        VarBody::Array {
                            desc: Some(desc), ..
                        } => desc.clone(),
                        _ => return Err(error!(ArrayMissing)),
                    };
                    if let VarBody::Array { desc: slot, .. } = &mut self.vars.get_mut(*to).body {
                        *slot = Some(desc);
                    }
                }
                (target, value) => self.store_lvalue(target, value)?,
            }
        }
        Ok(def.parms.len())
    }

    fn r#endproc(&mut self) -> Result<()> {
        self.cursor += 1;
        if !self.stack.in_subprogram() {
            return Err(error!(NotInProcedure));
        }
        let (ret, parms) = loop {
            match self.stack.top() {
                Some(Frame::Proc { ret, parms, .. }) => {
                    let out = (*ret, *parms);
                    self.stack.pop();
                    break out;
                }
                Some(Frame::Fn { .. }) | None => return Err(error!(NotInProcedure)),
                Some(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
            }
        };
        self.restore_parameters(parms)?;
        self.cursor = ret;
        Ok(())
    }

    /// `=expr`: the FN return. Result is computed first, the frames
    /// above and including the FN frame are unwound, parameters are
    /// restored, and the result goes back on the stack for the waiting
    /// evaluator.
    pub(crate) fn fn_return_statement(&mut self) -> Result<()> {
        self.cursor += 1;
        if !self.stack.in_function() {
            return Err(error!(NotInFunction));
        }
        let result = self.expression()?;
        self.check_eos()?;
        // Everything above the FN frame goes, intermediate PROC frames
        // included; their parameter saves below them restore as they
        // pop.
        let (ret, parms) = loop {
            match self.stack.top() {
                Some(Frame::Fn { ret, parms, .. }) => {
                    let out = (*ret, *parms);
                    self.stack.pop();
                    break out;
                }
                None => return Err(error!(NotInFunction)),
                Some(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
            }
        };
        self.restore_parameters(parms)?;
        self.push_value(result)?;
        self.cursor = ret;
        self.fn_return = true;
        Ok(())
    }

    /// Pop the parameter save-frames pushed at call time: RETURN
    /// formals copy their final value out to the caller's lvalue, then
    /// every formal gets its old value back.
    fn restore_parameters(&mut self, parms: usize) -> Result<()> {
        for _ in 0..parms {
            match self.stack.pop() {
                Some(Frame::Local { target, old }) => self.restore_saved(target, old),
                Some(Frame::RetParm {
                    ret_to,
                    target,
                    old,
                }) => {
                    // Detach the formal's final value before its old
                    // one comes back; a whole array moves its
                    // descriptor out.
                    if let Lvalue::WholeArray(from) = &target {
                        let desc = match &mut self.vars.get_mut(*from).body {
                            VarBody::Array { desc, .. } => desc.take(),
                            _ => None,
                        };
                        self.restore_saved(target, old);
                        match &ret_to {
                            Lvalue::WholeArray(to) => {
                                if let VarBody::Array { desc: slot, .. } =
                                    &mut self.vars.get_mut(*to).body
                                {
                                    *slot = desc;
                                }
                            }
                            _ => return Err(error!(TypeMismatch)),
                        }
                    } else {
                        let current = self.read_lvalue(&target)?;
                        self.restore_saved(target, old);
                        self.store_lvalue(&ret_to, current)?;
                    }
                }
                _ => return Err(error!(Broken; "exec")),
            }
        }
        Ok(())
    }

    fn r#local(&mut self) -> Result<()> {
        self.cursor += 1;
        if matches!(self.tok(), Token::Word(Word::Error)) {
            self.cursor += 1;
            self.stack.push(Frame::ErrorFrame { prev: self.handler })?;
            return self.check_eos();
        }
        if let Token::Data(_) = self.tok() {
            self.cursor += 1;
            self.stack.push(Frame::DataFrame { ptr: self.data_ptr })?;
            return Ok(());
        }
        if !self.stack.in_subprogram() {
            return Err(error!(NotLocal));
        }
        loop {
            let target = self.get_lvalue()?;
            let old = self.save_of(&target)?;
            self.stack.push(Frame::Local {
                target: target.clone(),
                old,
            })?;
            self.zero_lvalue(&target)?;
            if matches!(self.tok(), Token::Comma) {
                self.cursor += 1;
            } else {
                break;
            }
        }
        self.check_eos()
    }

    // ----- DATA / READ / RESTORE -----

    fn r#read(&mut self) -> Result<()> {
        self.cursor += 1;
        loop {
            let target = self.get_lvalue()?;
            let field = self.next_data_field()?;
            if self.lv_is_string(&target) {
                self.store_lvalue(&target, Value::Str(unquote(&field)))?;
            } else {
                let value = self.eval_fragment(&field)?;
                self.store_lvalue(&target, value)?;
            }
            if matches!(self.tok(), Token::Comma) {
                self.cursor += 1;
            } else {
                break;
            }
        }
        self.check_eos()
    }

    /// The next raw DATA field: comma-separated, quote-aware, crossing
    /// into the next DATA line when the current one is exhausted.
    fn next_data_field(&mut self) -> Result<String> {
        loop {
            let (line_idx, pos) = match self.data_ptr {
                Some(ptr) => ptr,
                None => match self.program.data_line_from(0) {
                    Some((index, _)) => {
                        self.data_ptr = Some((index, 0));
                        (index, 0)
                    }
                    None => return Err(error!(OutOfData)),
                },
            };
            if line_idx == usize::MAX {
                return Err(error!(OutOfData));
            }
            let text = match self.data_text(line_idx) {
                Some(text) => text,
                None => return Err(error!(Broken; "exec")),
            };
            let bytes = text.as_bytes();
            let mut p = pos;
            while p < bytes.len() && bytes[p] == b' ' {
                p += 1;
            }
            if p >= bytes.len() {
                match self.program.next_data_line(line_idx) {
                    Some((index, _)) => {
                        self.data_ptr = Some((index, 0));
                        continue;
                    }
                    None => {
                        self.data_ptr = Some((usize::MAX, 0));
                        return Err(error!(OutOfData));
                    }
                }
            }
            let mut q = p;
            let mut in_quotes = false;
            while q < bytes.len() {
                match bytes[q] {
                    b'"' => in_quotes = !in_quotes,
                    b',' if !in_quotes => break,
                    _ => {}
                }
                q += 1;
            }
            let field = text[p..q].trim_end().to_string();
            let next = if q < bytes.len() { q + 1 } else { q };
            self.data_ptr = Some((line_idx, next));
            return Ok(field);
        }
    }

    fn data_text(&self, line_idx: usize) -> Option<Rc<str>> {
        let span = self.program.line(line_idx).clone();
        (span.start..span.end).find_map(|addr| match self.program.token(addr) {
            Token::Data(text) => Some(text.clone()),
            _ => None,
        })
    }

    fn r#restore(&mut self) -> Result<()> {
        self.cursor += 1;
        match self.tok() {
            Token::Data(_) => {
                self.cursor += 1;
                match self.stack.pop() {
                    Some(Frame::DataFrame { ptr }) => {
                        self.data_ptr = ptr;
                        Ok(())
                    }
                    Some(frame) => {
                        self.stack.push(frame)?;
                        Err(error!(Syntax))
                    }
                    None => Err(error!(Syntax)),
                }
            }
            Token::Word(Word::Error) => {
                self.cursor += 1;
                match self.stack.pop() {
                    Some(Frame::ErrorFrame { prev }) => {
                        self.handler = prev;
                        Ok(())
                    }
                    Some(frame) => {
                        self.stack.push(frame)?;
                        Err(error!(Syntax))
                    }
                    None => Err(error!(Syntax)),
                }
            }
            Token::Word(Word::Local) => {
                self.cursor += 1;
                while matches!(self.stack.top(), Some(Frame::Local { .. })) {
                    if let Some(frame) = self.stack.pop() {
                        self.cleanup(frame);
                    }
                }
                Ok(())
            }
            token if token.at_eos() => {
                self.data_ptr = self
                    .program
                    .data_line_from(0)
                    .map(|(index, _)| (index, 0));
                Ok(())
            }
            _ => {
                let target = self.line_operand()?;
                self.check_eos()?;
                let number = self
                    .program
                    .line_for(target)
                    .ok_or_else(|| error!(NoSuchLine))?;
                self.data_ptr = match self.program.data_line_from(number) {
                    Some((index, _)) => Some((index, 0)),
                    None => Some((usize::MAX, 0)),
                };
                Ok(())
            }
        }
    }

    // ----- DIM -----

    fn r#dim(&mut self) -> Result<()> {
        self.cursor += 1;
        loop {
            let offheap = if matches!(self.tok(), Token::Word(Word::Himem)) {
                self.cursor += 1;
                true
            } else {
                false
            };
            let context = self.program.library_at(self.cursor);
            match self.tok() {
                Token::Var(name) if name.ends_with('(') => {
                    if offheap {
                        return Err(error!(BadDim));
                    }
                    let id = match self.vars.find(&name, context) {
                        Some(id) => id,
                        None => self.vars.create(&name, context),
                    };
                    self.cursor += 1;
                    let mut dims = Vec::new();
                    loop {
                        let bound = self.eval_any_int()?;
                        if bound < 0 {
                            return Err(error!(NegativeDim));
                        }
                        dims.push(bound as usize + 1);
                        match self.tok() {
                            Token::Comma => self.cursor += 1,
                            Token::RParen => {
                                self.cursor += 1;
                                break;
                            }
                            _ => return Err(error!(MissingRParen)),
                        }
                    }
                    match &mut self.vars.get_mut(id).body {
                        VarBody::Array { elem, desc } => {
                            if desc.is_some() {
                                return Err(error!(BadDim; name.trim_end_matches('(')));
                            }
                            *desc = Some(ArrayDesc::new(*elem, dims));
                        }
                        _ => return Err(error!(BadDim)),
                    }
                }
                Token::Var(_) | Token::Static(_) => {
                    let target = self.get_lvalue()?;
                    let (kind, is_array) = self.lv_kind(&target)?;
                    if is_array || kind == ElemType::Str {
                        return Err(error!(BadDim));
                    }
                    let size = self.eval_any_int()?;
                    if offheap {
                        if size == -1 {
                            let base = self.read_lvalue(&target)?.any_num64()?;
                            if base < 0 {
                                return Err(error!(BadHimem));
                            }
                            self.memory.free_himem(base as usize)?;
                        } else {
                            let base = self.memory.alloc_himem(size)?;
                            self.store_lvalue(&target, Value::Int64(base as i64))?;
                        }
                    } else {
                        let base = self.memory.alloc(size)?;
                        self.store_lvalue(&target, Value::Int64(base as i64))?;
                    }
                }
                _ => return Err(error!(BadDim)),
            }
            if matches!(self.tok(), Token::Comma) {
                self.cursor += 1;
            } else {
                break;
            }
        }
        self.check_eos()
    }

    // ----- SWAP -----

    fn r#swap(&mut self) -> Result<()> {
        self.cursor += 1;
        let first = self.get_lvalue()?;
        self.expect_comma()?;
        let second = self.get_lvalue()?;
        self.check_eos()?;
        if self.lv_kind(&first)? != self.lv_kind(&second)? {
            return Err(error!(TypeMismatch));
        }
        if let (Lvalue::WholeArray(a), Lvalue::WholeArray(b)) = (&first, &second) {
            // Whole arrays swap descriptors, keeping element storage
            // intact.
            let desc_a = match &mut self.vars.get_mut(*a).body {
                VarBody::Array { desc, .. } => desc.take(),
                _ => return Err(error!(ArrayMissing)),
            };
            let desc_b = match &mut self.vars.get_mut(*b).body {
                VarBody::Array { desc, .. } => std::mem::replace(desc, desc_a),
                _ => return Err(error!(ArrayMissing)),
            };
            if let VarBody::Array { desc, .. } = &mut self.vars.get_mut(*a).body {
                *desc = desc_b;
            }
            return Ok(());
        }
        let value_a = self.read_lvalue(&first)?;
        let value_b = self.read_lvalue(&second)?;
        self.store_lvalue(&first, value_b)?;
        self.store_lvalue(&second, value_a)?;
        Ok(())
    }

    // ----- errors, host, misc -----

    fn r#error(&mut self) -> Result<()> {
        self.cursor += 1;
        let number = self.eval_any_int()?;
        self.expect_comma()?;
        let text = self.eval_str()?;
        self.check_eos()?;
        Err(Error::custom(number as u16, &text))
    }

    fn r#report(&mut self) -> Result<()> {
        self.cursor += 1;
        let text = self.report_text();
        self.emit(&text);
        self.check_eos()
    }

    pub(crate) fn host_command(&mut self, command: &str) -> Result<()> {
        if command.is_empty() {
            return Ok(());
        }
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|_| error!(CommandFailed))?;
        self.emit(&String::from_utf8_lossy(&output.stdout));
        self.emit(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(error!(CommandFailed; command));
        }
        Ok(())
    }

    fn r#oscli(&mut self) -> Result<()> {
        self.cursor += 1;
        let command = self.eval_str()?;
        if matches!(self.tok(), Token::Word(Word::To)) {
            return Err(error!(Unsupported));
        }
        self.check_eos()?;
        self.host_command(&command)
    }

    fn r#wait(&mut self) -> Result<()> {
        self.cursor += 1;
        let centis = if self.at_eos() {
            0
        } else {
            self.eval_any_int()?.max(0)
        };
        self.check_eos()?;
        std::thread::sleep(std::time::Duration::from_millis(centis as u64 * 10));
        Ok(())
    }

    fn r#quit(&mut self) -> Result<()> {
        self.cursor += 1;
        let code = if self.at_eos() { 0 } else { self.eval_i32()? };
        self.check_eos()?;
        self.quit = Some(code);
        Ok(())
    }

    fn r#end(&mut self) -> Result<()> {
        self.cursor += 1;
        self.check_eos()?;
        self.end_run();
        Ok(())
    }

    fn r#clear(&mut self) -> Result<()> {
        self.cursor += 1;
        if matches!(self.tok(), Token::Word(Word::Himem)) {
            self.cursor += 1;
            self.check_eos()?;
            self.memory.clear_himem();
            return Ok(());
        }
        self.check_eos()?;
        self.vars.clear();
        self.program.clear_call_fixups();
        self.program.last_search = 0;
        self.stack.clear();
        self.memory.reset();
        self.data_ptr = None;
        Ok(())
    }

    /// Tracing is a debugger concern; the options are parsed and
    /// dropped.
    fn r#trace(&mut self) -> Result<()> {
        self.cursor += 1;
        while matches!(
            self.tok(),
            Token::Word(Word::On) | Token::Word(Word::Off) | Token::IntLit(_)
        ) {
            self.cursor += 1;
        }
        self.check_eos()
    }

    fn r#library(&mut self) -> Result<()> {
        self.cursor += 1;
        if matches!(self.tok(), Token::Word(Word::Local)) {
            return Err(error!(BadLibrary));
        }
        let name = self.eval_str()?;
        self.check_eos()?;
        let text =
            std::fs::read_to_string(&name).map_err(|_| error!(NoLibrary; name.clone()))?;
        let lib = self.vars.add_lib();
        self.program.attach_library(lib, &name, &text)
    }
}

fn bare_name(name: &str) -> String {
    name.trim_start_matches("PROC")
        .trim_start_matches("FN")
        .to_string()
}

/// DATA string fields: strip one layer of quotes and fold doubled
/// quotes.
fn unquote(field: &str) -> String {
    let trimmed = field.trim_start();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }
    let inner = &trimmed[1..];
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    inner.replace("\"\"", "\"")
}
