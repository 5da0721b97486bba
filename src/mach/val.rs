use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Operand values
///
/// The four numeric widths promote in the order
/// `uint8 < int32 < int64 < float`. An operation on two values of the
/// same kind stays in that kind (integer arithmetic wraps, as the
/// original's C arithmetic does); mixed operands are promoted to the
/// wider kind first. Converting a float back down to an integer range
/// checks and reports "Number too big".

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint8(u8),
    Int(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    /// Reference to an array variable's record.
    Array(usize),
}

pub const BAS_TRUE: i32 = -1;
pub const BAS_FALSE: i32 = 0;

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Uint8(_) | Value::Int(_) | Value::Int64(_) | Value::Float(_)
        )
    }

    pub fn truth(n: bool) -> Value {
        Value::Int(if n { BAS_TRUE } else { BAS_FALSE })
    }

    /// Any of the three integer kinds, widened. Floats are rejected.
    pub fn any_int(self) -> Result<i64> {
        match self {
            Value::Uint8(n) => Ok(n as i64),
            Value::Int(n) => Ok(n as i64),
            Value::Int64(n) => Ok(n),
            Value::Float(_) | Value::Str(_) | Value::Array(_) => Err(error!(TypeMismatch)),
        }
    }

    /// Any numeric, rounded into an i64 with a range check.
    pub fn any_num64(self) -> Result<i64> {
        match self {
            Value::Float(f) => f2i64(f),
            other => other.any_int(),
        }
    }

    pub fn any_num32(self) -> Result<i32> {
        match self {
            Value::Uint8(n) => Ok(n as i32),
            Value::Int(n) => Ok(n),
            Value::Int64(n) => {
                if n >= i32::min_value() as i64 && n <= i32::max_value() as i64 {
                    Ok(n as i32)
                } else {
                    Err(error!(TooBig))
                }
            }
            Value::Float(f) => f2i32(f),
            Value::Str(_) | Value::Array(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn any_num_f64(self) -> Result<f64> {
        match self {
            Value::Uint8(n) => Ok(n as f64),
            Value::Int(n) => Ok(n as f64),
            Value::Int64(n) => Ok(n as f64),
            Value::Float(f) => Ok(f),
            Value::Str(_) | Value::Array(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(error!(TypeMismatch)),
        }
    }

    fn widen(lhs: Value, rhs: Value) -> Result<(Value, Value)> {
        use Value::*;
        Ok(match (lhs, rhs) {
            (Float(l), r) => (Float(l), Float(r.any_num_f64()?)),
            (l, Float(r)) => (Float(l.any_num_f64()?), Float(r)),
            (Int64(l), r) => (Int64(l), Int64(r.any_int()?)),
            (l, Int64(r)) => (Int64(l.any_int()?), Int64(r)),
            (Int(l), r) => (Int(l), Int(r.any_num32()?)),
            (l, Int(r)) => (Int(l.any_num32()?), Int(r)),
            (Uint8(l), Uint8(r)) => (Uint8(l), Uint8(r)),
            _ => return Err(error!(TypeMismatch)),
        })
    }

    pub fn add(lhs: Value, rhs: Value) -> Result<Value> {
        use Value::*;
        if let (Str(l), r) = (&lhs, &rhs) {
            if let Str(r) = r {
                let mut s = l.clone();
                s.push_str(r);
                return Ok(Str(s));
            }
            return Err(error!(TypeMismatch));
        }
        Ok(match Value::widen(lhs, rhs)? {
            (Uint8(l), Uint8(r)) => Uint8(l.wrapping_add(r)),
            (Int(l), Int(r)) => Int(l.wrapping_add(r)),
            (Int64(l), Int64(r)) => Int64(l.wrapping_add(r)),
            (Float(l), Float(r)) => Float(l + r),
            _ => return Err(error!(Broken; "val")),
        })
    }

    pub fn sub(lhs: Value, rhs: Value) -> Result<Value> {
        use Value::*;
        Ok(match Value::widen(lhs, rhs)? {
            (Uint8(l), Uint8(r)) => Uint8(l.wrapping_sub(r)),
            (Int(l), Int(r)) => Int(l.wrapping_sub(r)),
            (Int64(l), Int64(r)) => Int64(l.wrapping_sub(r)),
            (Float(l), Float(r)) => Float(l - r),
            _ => return Err(error!(Broken; "val")),
        })
    }

    pub fn mul(lhs: Value, rhs: Value) -> Result<Value> {
        use Value::*;
        Ok(match Value::widen(lhs, rhs)? {
            (Uint8(l), Uint8(r)) => Uint8(l.wrapping_mul(r)),
            (Int(l), Int(r)) => Int(l.wrapping_mul(r)),
            (Int64(l), Int64(r)) => Int64(l.wrapping_mul(r)),
            (Float(l), Float(r)) => Float(l * r),
            _ => return Err(error!(Broken; "val")),
        })
    }

    /// `/` always yields a float.
    pub fn div(lhs: Value, rhs: Value) -> Result<Value> {
        let l = lhs.any_num_f64()?;
        let r = rhs.any_num_f64()?;
        if r == 0.0 {
            return Err(error!(DivideByZero));
        }
        Ok(Value::Float(l / r))
    }

    pub fn int_div(lhs: Value, rhs: Value) -> Result<Value> {
        let wide = matches!(lhs, Value::Int64(_)) || matches!(rhs, Value::Int64(_));
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()?;
        if r == 0 {
            return Err(error!(DivideByZero));
        }
        let q = l.wrapping_div(r);
        Ok(if wide { Value::Int64(q) } else { Value::Int(q as i32) })
    }

    pub fn modulo(lhs: Value, rhs: Value) -> Result<Value> {
        let wide = matches!(lhs, Value::Int64(_)) || matches!(rhs, Value::Int64(_));
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()?;
        if r == 0 {
            return Err(error!(DivideByZero));
        }
        let m = l.wrapping_rem(r);
        Ok(if wide { Value::Int64(m) } else { Value::Int(m as i32) })
    }

    pub fn pow(lhs: Value, rhs: Value) -> Result<Value> {
        let l = lhs.any_num_f64()?;
        let r = rhs.any_num_f64()?;
        Ok(Value::Float(l.powf(r)))
    }

    pub fn neg(val: Value) -> Result<Value> {
        use Value::*;
        Ok(match val {
            Uint8(n) => Int(-(n as i32)),
            Int(n) => Int(n.wrapping_neg()),
            Int64(n) => Int64(n.wrapping_neg()),
            Float(f) => Float(-f),
            Str(_) | Array(_) => return Err(error!(TypeMismatch)),
        })
    }

    pub fn not(val: Value) -> Result<Value> {
        use Value::*;
        Ok(match val {
            Uint8(n) => Int(!(n as i32)),
            Int(n) => Int(!n),
            Int64(n) => Int64(!n),
            Float(f) => Int64(!f2i64(f)?),
            Str(_) | Array(_) => return Err(error!(TypeMismatch)),
        })
    }

    fn bitwise(lhs: Value, rhs: Value, op: fn(i64, i64) -> i64) -> Result<Value> {
        let wide = matches!(lhs, Value::Int64(_) | Value::Float(_))
            || matches!(rhs, Value::Int64(_) | Value::Float(_));
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()?;
        let v = op(l, r);
        Ok(if wide { Value::Int64(v) } else { Value::Int(v as i32) })
    }

    pub fn and(lhs: Value, rhs: Value) -> Result<Value> {
        Value::bitwise(lhs, rhs, |l, r| l & r)
    }

    pub fn or(lhs: Value, rhs: Value) -> Result<Value> {
        Value::bitwise(lhs, rhs, |l, r| l | r)
    }

    pub fn eor(lhs: Value, rhs: Value) -> Result<Value> {
        Value::bitwise(lhs, rhs, |l, r| l ^ r)
    }

    /// Shifts work at the width of their operands: 32-bit unless an
    /// int64 or float is involved.
    pub fn shl(lhs: Value, rhs: Value) -> Result<Value> {
        let wide = Value::wide_pair(&lhs, &rhs);
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()? as u32;
        Ok(if wide {
            Value::Int64(l.wrapping_shl(r & 63))
        } else {
            Value::Int((l as i32).wrapping_shl(r & 31))
        })
    }

    pub fn shr(lhs: Value, rhs: Value) -> Result<Value> {
        let wide = Value::wide_pair(&lhs, &rhs);
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()? as u32;
        Ok(if wide {
            Value::Int64(l.wrapping_shr(r & 63))
        } else {
            Value::Int((l as i32).wrapping_shr(r & 31))
        })
    }

    pub fn shru(lhs: Value, rhs: Value) -> Result<Value> {
        let wide = Value::wide_pair(&lhs, &rhs);
        let l = lhs.any_num64()?;
        let r = rhs.any_num64()? as u32;
        Ok(if wide {
            Value::Int64(((l as u64).wrapping_shr(r & 63)) as i64)
        } else {
            Value::Int(((l as u32).wrapping_shr(r & 31)) as i32)
        })
    }

    fn wide_pair(lhs: &Value, rhs: &Value) -> bool {
        matches!(lhs, Value::Int64(_) | Value::Float(_))
            || matches!(rhs, Value::Int64(_) | Value::Float(_))
    }

    pub fn compare(lhs: Value, rhs: Value) -> Result<std::cmp::Ordering> {
        use std::cmp::Ordering;
        use Value::*;
        match (&lhs, &rhs) {
            (Str(l), Str(r)) => Ok(l.as_bytes().cmp(r.as_bytes())),
            (Str(_), _) | (_, Str(_)) => Err(error!(TypeMismatch)),
            _ => {
                let l = lhs.any_num_f64()?;
                let r = rhs.any_num_f64()?;
                Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal))
            }
        }
    }

    /// The compact form PRINT uses when `@%` sets no field width.
    pub fn to_print(&self) -> String {
        match self {
            Value::Uint8(n) => n.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::Array(_) => String::new(),
        }
    }
}

/// Float to int32 with the `[-2^31, 2^31)` range check.
pub fn f2i32(f: f64) -> Result<i32> {
    if f >= -2147483648.0 && f < 2147483648.0 {
        Ok(f as i32)
    } else {
        Err(error!(TooBig))
    }
}

/// Float to int64. The open range check reconciles the sign with the
/// truncated value: anything at or beyond 2^63 in either direction is
/// unrepresentable.
pub fn f2i64(f: f64) -> Result<i64> {
    if f > -9223372036854775808.0 && f < 9223372036854775808.0 {
        Ok(f as i64)
    } else {
        Err(error!(TooBig))
    }
}

/// Nine significant figures, exponent form outside 1e-2..1e10, the way
/// the Acorn interpreter renders G format. The integer part counts
/// toward the nine, so the fraction gets whatever places remain.
pub fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let mag = f.abs();
    if mag >= 1e10 || mag < 0.01 {
        let s = format!("{:E}", f);
        // Rust prints 1E20 as "1E20" already; trim a "+" if one appears.
        s.replace("E+", "E")
    } else {
        let int_digits = if mag < 1.0 {
            0
        } else {
            mag.log10().floor() as usize + 1
        };
        let places = 9usize.saturating_sub(int_digits);
        let mut s = format!("{:.places$}", f, places = places);
        if s.contains('.') {
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        s
    }
}
