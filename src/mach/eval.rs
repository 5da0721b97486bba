use super::val::{self, Value};
use super::var::{ArrayData, Lvalue, VarBody};
use super::Runtime;
use crate::lang::{lex, Error, Func, Operator, Token, Word};
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, Error>;

/// ## Expression evaluator
///
/// Plain recursive descent, one method per priority level, everything
/// evaluated left to right. Operator priorities are the Basic V set:
/// `OR`/`EOR`, then `AND`, then the relationals and shifts, then `+ -`,
/// then `* / DIV MOD`, then `^`, with unary operators and indirection
/// binding tightest.

impl Runtime {
    pub(crate) fn expression(&mut self) -> Result<Value> {
        let mut lhs = self.and_level()?;
        loop {
            match self.tok() {
                Token::Operator(Operator::Or) => {
                    self.cursor += 1;
                    let rhs = self.and_level()?;
                    lhs = Value::or(lhs, rhs)?;
                }
                Token::Operator(Operator::Eor) => {
                    self.cursor += 1;
                    let rhs = self.and_level()?;
                    lhs = Value::eor(lhs, rhs)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn and_level(&mut self) -> Result<Value> {
        let mut lhs = self.cmp_level()?;
        while let Token::Operator(Operator::And) = self.tok() {
            self.cursor += 1;
            let rhs = self.cmp_level()?;
            lhs = Value::and(lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn cmp_level(&mut self) -> Result<Value> {
        use Operator::*;
        let mut lhs = self.add_level()?;
        loop {
            let op = match self.tok() {
                Token::Operator(op) => op,
                _ => return Ok(lhs),
            };
            match op {
                Eq | NotEq | Less | LessEq | Greater | GreaterEq => {
                    self.cursor += 1;
                    let rhs = self.add_level()?;
                    let order = Value::compare(lhs, rhs)?;
                    lhs = Value::truth(match op {
                        Eq => order == Ordering::Equal,
                        NotEq => order != Ordering::Equal,
                        Less => order == Ordering::Less,
                        LessEq => order != Ordering::Greater,
                        Greater => order == Ordering::Greater,
                        GreaterEq => order != Ordering::Less,
                        _ => unreachable!(),
                    });
                }
                Shl => {
                    self.cursor += 1;
                    let rhs = self.add_level()?;
                    lhs = Value::shl(lhs, rhs)?;
                }
                Shr => {
                    self.cursor += 1;
                    let rhs = self.add_level()?;
                    lhs = Value::shr(lhs, rhs)?;
                }
                Shru => {
                    self.cursor += 1;
                    let rhs = self.add_level()?;
                    lhs = Value::shru(lhs, rhs)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn add_level(&mut self) -> Result<Value> {
        let mut lhs = self.mul_level()?;
        loop {
            match self.tok() {
                Token::Operator(Operator::Plus) => {
                    self.cursor += 1;
                    let rhs = self.mul_level()?;
                    lhs = Value::add(lhs, rhs)?;
                }
                Token::Operator(Operator::Minus) => {
                    self.cursor += 1;
                    let rhs = self.mul_level()?;
                    lhs = Value::sub(lhs, rhs)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn mul_level(&mut self) -> Result<Value> {
        let mut lhs = self.pow_level()?;
        loop {
            match self.tok() {
                Token::Operator(Operator::Multiply) => {
                    self.cursor += 1;
                    let rhs = self.pow_level()?;
                    lhs = Value::mul(lhs, rhs)?;
                }
                Token::Operator(Operator::Divide) => {
                    self.cursor += 1;
                    let rhs = self.pow_level()?;
                    lhs = Value::div(lhs, rhs)?;
                }
                Token::Operator(Operator::Div) => {
                    self.cursor += 1;
                    let rhs = self.pow_level()?;
                    lhs = Value::int_div(lhs, rhs)?;
                }
                Token::Operator(Operator::Mod) => {
                    self.cursor += 1;
                    let rhs = self.pow_level()?;
                    lhs = Value::modulo(lhs, rhs)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn pow_level(&mut self) -> Result<Value> {
        let mut lhs = self.factor()?;
        while let Token::Operator(Operator::Caret) = self.tok() {
            self.cursor += 1;
            let rhs = self.factor()?;
            lhs = Value::pow(lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Value> {
        use Operator::*;
        let value = match self.tok() {
            Token::IntLit(n) => {
                self.cursor += 1;
                if n >= i32::min_value() as i64 && n <= i32::max_value() as i64 {
                    Value::Int(n as i32)
                } else {
                    Value::Int64(n)
                }
            }
            Token::FloatLit(f) => {
                self.cursor += 1;
                Value::Float(f)
            }
            Token::StrLit(s) => {
                self.cursor += 1;
                Value::Str(s.to_string())
            }
            Token::LParen => {
                self.cursor += 1;
                let value = self.expression()?;
                if !matches!(self.tok(), Token::RParen) {
                    return Err(error!(MissingRParen));
                }
                self.cursor += 1;
                value
            }
            Token::Operator(Minus) => {
                self.cursor += 1;
                Value::neg(self.factor()?)?
            }
            Token::Operator(Plus) => {
                self.cursor += 1;
                self.factor()?
            }
            Token::Operator(Not) => {
                self.cursor += 1;
                Value::not(self.factor()?)?
            }
            Token::Operator(Query) => {
                self.cursor += 1;
                let offset = self.factor_offset()?;
                Value::Int(self.memory.read_u8(offset)? as i32)
            }
            Token::Operator(Pling) => {
                self.cursor += 1;
                let offset = self.factor_offset()?;
                Value::Int(self.memory.read_i32(offset)?)
            }
            Token::Operator(Long) => {
                self.cursor += 1;
                let offset = self.factor_offset()?;
                Value::Int64(self.memory.read_i64(offset)?)
            }
            Token::Operator(Bar) => {
                self.cursor += 1;
                let offset = self.factor_offset()?;
                Value::Float(self.memory.read_f64(offset)?)
            }
            Token::Operator(Dollar) => {
                self.cursor += 1;
                let offset = self.factor_offset()?;
                Value::Str(self.memory.read_string(offset)?)
            }
            Token::Static(slot) => {
                self.cursor += 1;
                Value::Int(self.vars.static_get(slot))
            }
            Token::Var(name) => self.variable_value(&name)?,
            Token::Call(_) | Token::CallIdx(..) => self.fn_call_value()?,
            Token::Func(func) => self.builtin(func)?,
            Token::Word(Word::Himem) => {
                self.cursor += 1;
                Value::Int(self.memory.himem() as i32)
            }
            Token::Word(Word::Lomem) => {
                self.cursor += 1;
                Value::Int(self.memory.lomem() as i32)
            }
            Token::Word(Word::Page) => {
                self.cursor += 1;
                Value::Int(self.memory.page() as i32)
            }
            Token::Word(Word::Top) => {
                self.cursor += 1;
                Value::Int(self.memory.vartop() as i32)
            }
            _ => return Err(error!(Syntax)),
        };
        self.postfix_indirection(value)
    }

    /// `?x` style operands: the address expression binds as a factor.
    fn factor_offset(&mut self) -> Result<usize> {
        let addr = self.factor()?.any_num64()?;
        if addr < 0 {
            return Err(error!(OutOfRange));
        }
        Ok(addr as usize)
    }

    /// Dyadic `base?offset` and `base!offset` after any numeric value.
    fn postfix_indirection(&mut self, value: Value) -> Result<Value> {
        let mut value = value;
        loop {
            match self.tok() {
                Token::Operator(Operator::Query) if value.is_numeric() => {
                    self.cursor += 1;
                    let base = value.any_num64()?;
                    let offset = self.factor()?.any_num64()?;
                    let addr = checked_addr(base, offset)?;
                    value = Value::Int(self.memory.read_u8(addr)? as i32);
                }
                Token::Operator(Operator::Pling) if value.is_numeric() => {
                    self.cursor += 1;
                    let base = value.any_num64()?;
                    let offset = self.factor()?.any_num64()?;
                    let addr = checked_addr(base, offset)?;
                    value = Value::Int(self.memory.read_i32(addr)?);
                }
                _ => return Ok(value),
            }
        }
    }

    fn variable_value(&mut self, name: &str) -> Result<Value> {
        let context = self.program.library_at(self.cursor);
        if name.ends_with('(') {
            let id = match self.vars.find(name, context) {
                Some(id) => id,
                None => return Err(error!(ArrayMissing; name.trim_end_matches('('))),
            };
            self.cursor += 1;
            if matches!(self.tok(), Token::RParen) {
                // Whole-array reference.
                self.cursor += 1;
                return Ok(Value::Array(id));
            }
            let index = self.subscripts(id)?;
            let var = self.vars.get(id);
            match &var.body {
                VarBody::Array {
                    desc: Some(desc), ..
                } => Ok(match &desc.data {
                    ArrayData::Uint8(v) => Value::Uint8(v[index]),
                    ArrayData::Int(v) => Value::Int(v[index]),
                    ArrayData::Int64(v) => Value::Int64(v[index]),
                    ArrayData::Float(v) => Value::Float(v[index]),
                    ArrayData::Str(v) => Value::Str(v[index].clone()),
                }),
                _ => Err(error!(ArrayMissing; name.trim_end_matches('('))),
            }
        } else {
            let id = match self.vars.find(name, context) {
                Some(id) => id,
                None => return Err(error!(NoSuchVariable; name)),
            };
            self.cursor += 1;
            Ok(match &self.vars.get(id).body {
                VarBody::Uint8(n) => Value::Uint8(*n),
                VarBody::Int(n) => Value::Int(*n),
                VarBody::Int64(n) => Value::Int64(*n),
                VarBody::Float(f) => Value::Float(*f),
                VarBody::Str(s) => Value::Str(s.clone()),
                VarBody::Array { .. } | VarBody::Proc(_) | VarBody::Marker(_) => {
                    return Err(error!(TypeMismatch))
                }
            })
        }
    }

    /// Parse the comma-separated subscripts up to `)` and fold them to
    /// a linear index. The cursor sits on the first subscript.
    pub(crate) fn subscripts(&mut self, id: usize) -> Result<usize> {
        let mut subs = Vec::new();
        loop {
            subs.push(self.expression()?.any_num64()?);
            match self.tok() {
                Token::Comma => self.cursor += 1,
                Token::RParen => {
                    self.cursor += 1;
                    break;
                }
                _ => return Err(error!(MissingRParen)),
            }
        }
        match &self.vars.get(id).body {
            VarBody::Array {
                desc: Some(desc), ..
            } => desc.index(&subs),
            _ => Err(error!(ArrayMissing)),
        }
    }

    /// An FN call in expression position. The function body runs to its
    /// `=` statement, which leaves the result on the Basic stack.
    fn fn_call_value(&mut self) -> Result<Value> {
        let name = match self.tok() {
            Token::Call(name) => name,
            Token::CallIdx(name, _) => name,
            _ => return Err(error!(Broken; "eval")),
        };
        if !name.starts_with("FN") {
            return Err(error!(BadCall));
        }
        self.subprogram_call()
    }

    // ----- numeric/string convenience -----

    pub(crate) fn eval_any_int(&mut self) -> Result<i64> {
        self.expression()?.any_num64()
    }

    pub(crate) fn eval_i32(&mut self) -> Result<i32> {
        self.expression()?.any_num32()
    }

    pub(crate) fn eval_f64(&mut self) -> Result<f64> {
        self.expression()?.any_num_f64()
    }

    pub(crate) fn eval_str(&mut self) -> Result<String> {
        self.expression()?.into_string()
    }

    /// Evaluate a detached scrap of text (a READ field, an INPUT reply)
    /// by appending it to the stream, running the evaluator there, and
    /// trimming the stream back.
    pub(crate) fn eval_fragment(&mut self, text: &str) -> Result<Value> {
        let tokens = lex::lex_fragment(text)?;
        if tokens.is_empty() {
            return Err(error!(Syntax));
        }
        let saved_cursor = self.cursor;
        let saved_len = self.program.len();
        self.cursor = self.program.append_direct(tokens);
        let result = self.expression();
        self.cursor = saved_cursor;
        self.program.truncate(saved_len);
        result
    }

    // ----- lvalues -----

    /// Parse an assignable location at the cursor. Scalar variables are
    /// created on first assignment; arrays must be DIMmed before an
    /// element can be addressed.
    pub(crate) fn get_lvalue(&mut self) -> Result<Lvalue> {
        use Operator::*;
        let context = self.program.library_at(self.cursor);
        let base = match self.tok() {
            Token::Static(slot) => {
                self.cursor += 1;
                Lvalue::Static(slot)
            }
            Token::Var(name) => {
                let id = match self.vars.find(&name, context) {
                    Some(id) => id,
                    None => self.vars.create(&name, context),
                };
                self.cursor += 1;
                if name.ends_with('(') {
                    if matches!(self.tok(), Token::RParen) {
                        self.cursor += 1;
                        Lvalue::WholeArray(id)
                    } else {
                        let index = self.subscripts(id)?;
                        Lvalue::Elem(id, index)
                    }
                } else {
                    Lvalue::Scalar(id)
                }
            }
            Token::Operator(Query) => {
                self.cursor += 1;
                Lvalue::ByteMem(self.factor_offset()?)
            }
            Token::Operator(Pling) => {
                self.cursor += 1;
                Lvalue::WordMem(self.factor_offset()?)
            }
            Token::Operator(Long) => {
                self.cursor += 1;
                Lvalue::LongMem(self.factor_offset()?)
            }
            Token::Operator(Bar) => {
                self.cursor += 1;
                Lvalue::FloatMem(self.factor_offset()?)
            }
            Token::Operator(Dollar) => {
                self.cursor += 1;
                Lvalue::StrMem(self.factor_offset()?)
            }
            _ => return Err(error!(NoSuchVariable)),
        };
        // `var?off` / `var!off` turn the variable's value into a base
        // address.
        match self.tok() {
            Token::Operator(Query) => {
                self.cursor += 1;
                let base = self.read_lvalue(&base)?.any_num64()?;
                let offset = self.factor()?.any_num64()?;
                Ok(Lvalue::ByteMem(checked_addr(base, offset)?))
            }
            Token::Operator(Pling) => {
                self.cursor += 1;
                let base = self.read_lvalue(&base)?.any_num64()?;
                let offset = self.factor()?.any_num64()?;
                Ok(Lvalue::WordMem(checked_addr(base, offset)?))
            }
            _ => Ok(base),
        }
    }

    pub(crate) fn read_lvalue(&mut self, lvalue: &Lvalue) -> Result<Value> {
        Ok(match lvalue {
            Lvalue::Static(slot) => Value::Int(self.vars.static_get(*slot)),
            Lvalue::Scalar(id) => match &self.vars.get(*id).body {
                VarBody::Uint8(n) => Value::Uint8(*n),
                VarBody::Int(n) => Value::Int(*n),
                VarBody::Int64(n) => Value::Int64(*n),
                VarBody::Float(f) => Value::Float(*f),
                VarBody::Str(s) => Value::Str(s.clone()),
                _ => return Err(error!(TypeMismatch)),
            },
            Lvalue::Elem(id, index) => match &self.vars.get(*id).body {
                VarBody::Array {
                    desc: Some(desc), ..
                } => match &desc.data {
                    ArrayData::Uint8(v) => Value::Uint8(v[*index]),
                    ArrayData::Int(v) => Value::Int(v[*index]),
                    ArrayData::Int64(v) => Value::Int64(v[*index]),
                    ArrayData::Float(v) => Value::Float(v[*index]),
                    ArrayData::Str(v) => Value::Str(v[*index].clone()),
                },
                _ => return Err(error!(ArrayMissing)),
            },
            Lvalue::WholeArray(id) => Value::Array(*id),
            Lvalue::ByteMem(offset) => Value::Int(self.memory.read_u8(*offset)? as i32),
            Lvalue::WordMem(offset) => Value::Int(self.memory.read_i32(*offset)?),
            Lvalue::LongMem(offset) => Value::Int64(self.memory.read_i64(*offset)?),
            Lvalue::FloatMem(offset) => Value::Float(self.memory.read_f64(*offset)?),
            Lvalue::StrMem(offset) => Value::Str(self.memory.read_string(*offset)?),
        })
    }

    // ----- built-in functions -----

    fn builtin(&mut self, func: Func) -> Result<Value> {
        self.cursor += 1;
        Ok(match func {
            Func::Pi => Value::Float(std::f64::consts::PI),
            Func::Time => Value::Int(self.time_cs() as i32),
            Func::TimeS => Value::Str(
                chrono::Local::now()
                    .format("%a,%d %b %Y.%H:%M:%S")
                    .to_string(),
            ),
            Func::Err => Value::Int(self.err_code() as i32),
            Func::Erl => Value::Int(self.erl() as i32),
            Func::ReportS => Value::Str(self.report_text()),
            Func::Count => Value::Int(self.count as i32),
            Func::Rnd => return self.rnd_value(),
            Func::Abs => match self.factor()? {
                Value::Uint8(n) => Value::Uint8(n),
                Value::Int(n) => Value::Int(n.wrapping_abs()),
                Value::Int64(n) => Value::Int64(n.wrapping_abs()),
                Value::Float(f) => Value::Float(f.abs()),
                _ => return Err(error!(TypeMismatch)),
            },
            Func::Int => {
                let f = self.factor()?.any_num_f64()?;
                Value::Int64(val::f2i64(f.floor())?)
            }
            Func::Sgn => {
                let f = self.factor()?.any_num_f64()?;
                Value::Int(if f > 0.0 {
                    1
                } else if f < 0.0 {
                    -1
                } else {
                    0
                })
            }
            Func::Sqr => {
                let f = self.factor()?.any_num_f64()?;
                if f < 0.0 {
                    return Err(error!(NegativeRoot));
                }
                Value::Float(f.sqrt())
            }
            Func::Ln => {
                let f = self.factor()?.any_num_f64()?;
                if f <= 0.0 {
                    return Err(error!(LogRange));
                }
                Value::Float(f.ln())
            }
            Func::Log => {
                let f = self.factor()?.any_num_f64()?;
                if f <= 0.0 {
                    return Err(error!(LogRange));
                }
                Value::Float(f.log10())
            }
            Func::Exp => Value::Float(self.factor()?.any_num_f64()?.exp()),
            Func::Sin => Value::Float(self.factor()?.any_num_f64()?.sin()),
            Func::Cos => Value::Float(self.factor()?.any_num_f64()?.cos()),
            Func::Tan => Value::Float(self.factor()?.any_num_f64()?.tan()),
            Func::Asn => Value::Float(self.factor()?.any_num_f64()?.asin()),
            Func::Acs => Value::Float(self.factor()?.any_num_f64()?.acos()),
            Func::Atn => Value::Float(self.factor()?.any_num_f64()?.atan()),
            Func::Deg => Value::Float(self.factor()?.any_num_f64()?.to_degrees()),
            Func::Rad => Value::Float(self.factor()?.any_num_f64()?.to_radians()),
            Func::Len => Value::Int(self.factor()?.into_string()?.len() as i32),
            Func::Chr => {
                let n = self.factor()?.any_num32()?;
                Value::Str(((n & 0xFF) as u8 as char).to_string())
            }
            Func::Asc => {
                let s = self.factor()?.into_string()?;
                Value::Int(s.bytes().next().map(|b| b as i32).unwrap_or(-1))
            }
            Func::Str => {
                let hex = if matches!(self.tok(), Token::Operator(Operator::Tilde)) {
                    self.cursor += 1;
                    true
                } else {
                    false
                };
                let value = self.factor()?;
                if hex {
                    Value::Str(format!("{:X}", value.any_num64()?))
                } else {
                    Value::Str(value.to_print())
                }
            }
            Func::Val => Value::from_val_text(&self.factor()?.into_string()?),
            Func::Left => {
                let s = self.expression()?.into_string()?;
                self.expect_comma()?;
                let n = self.eval_any_int()?.max(0) as usize;
                self.expect_rparen()?;
                Value::Str(take_bytes(&s, 0, n))
            }
            Func::Right => {
                let s = self.expression()?.into_string()?;
                self.expect_comma()?;
                let n = self.eval_any_int()?.max(0) as usize;
                self.expect_rparen()?;
                let skip = s.len().saturating_sub(n);
                Value::Str(take_bytes(&s, skip, n))
            }
            Func::Mid => {
                let s = self.expression()?.into_string()?;
                self.expect_comma()?;
                let start = self.eval_any_int()?.max(1) as usize - 1;
                let len = if matches!(self.tok(), Token::Comma) {
                    self.cursor += 1;
                    self.eval_any_int()?.max(0) as usize
                } else {
                    s.len()
                };
                self.expect_rparen()?;
                Value::Str(take_bytes(&s, start, len))
            }
            Func::StringS => {
                let n = self.eval_any_int()?.max(0) as usize;
                self.expect_comma()?;
                let s = self.expression()?.into_string()?;
                self.expect_rparen()?;
                Value::Str(s.repeat(n))
            }
            Func::Instr => {
                let hay = self.expression()?.into_string()?;
                self.expect_comma()?;
                let needle = self.expression()?.into_string()?;
                let start = if matches!(self.tok(), Token::Comma) {
                    self.cursor += 1;
                    self.eval_any_int()?.max(1) as usize - 1
                } else {
                    0
                };
                self.expect_rparen()?;
                let found = if start > hay.len() {
                    None
                } else if needle.is_empty() {
                    Some(start)
                } else {
                    hay[start..].find(&needle).map(|at| at + start)
                };
                Value::Int(found.map(|at| at as i32 + 1).unwrap_or(0))
            }
        })
    }

    fn rnd_value(&mut self) -> Result<Value> {
        if matches!(self.tok(), Token::LParen) {
            self.cursor += 1;
            let n = self.eval_any_int()?;
            self.expect_rparen()?;
            if n < 0 {
                self.rnd = n.unsigned_abs();
                return Ok(Value::Int(n as i32));
            }
            if n == 0 {
                return Ok(Value::Float(self.last_rnd1));
            }
            if n == 1 {
                let f = (self.next_rnd() >> 11) as f64 / (1u64 << 53) as f64;
                self.last_rnd1 = f;
                return Ok(Value::Float(f));
            }
            return Ok(Value::Int((self.next_rnd() % n as u64) as i32 + 1));
        }
        Ok(Value::Int(self.next_rnd() as u32 as i32))
    }

    fn next_rnd(&mut self) -> u64 {
        self.rnd = self
            .rnd
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.rnd >> 1
    }

    pub(crate) fn expect_comma(&mut self) -> Result<()> {
        if matches!(self.tok(), Token::Comma) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(error!(MissingComma))
        }
    }

    pub(crate) fn expect_rparen(&mut self) -> Result<()> {
        if matches!(self.tok(), Token::RParen) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(error!(MissingRParen))
        }
    }
}

fn checked_addr(base: i64, offset: i64) -> Result<usize> {
    let addr = base.wrapping_add(offset);
    if addr < 0 {
        Err(error!(OutOfRange))
    } else {
        Ok(addr as usize)
    }
}

fn take_bytes(s: &str, skip: usize, len: usize) -> String {
    s.bytes().skip(skip).take(len).map(|b| b as char).collect()
}

impl Value {
    /// VAL: the numeric value of the longest leading number, 0 when
    /// there is none.
    fn from_val_text(text: &str) -> Value {
        let trimmed = text.trim_start();
        let mut end = 0;
        let bytes = trimmed.as_bytes();
        if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
            end += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while end < bytes.len() {
            match bytes[end] {
                b'0'..=b'9' => {
                    seen_digit = true;
                    end += 1;
                }
                b'.' if !seen_dot => {
                    seen_dot = true;
                    end += 1;
                }
                _ => break,
            }
        }
        if !seen_digit {
            return Value::Int(0);
        }
        let number = &trimmed[..end];
        if !seen_dot {
            if let Ok(n) = number.parse::<i64>() {
                return if n >= i32::min_value() as i64 && n <= i32::max_value() as i64 {
                    Value::Int(n as i32)
                } else {
                    Value::Int64(n)
                };
            }
        }
        Value::Float(number.parse::<f64>().unwrap_or(0.0))
    }
}
