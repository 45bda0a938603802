//! Binary expression evaluation.
use log::trace;

use crate::{
    error::{StrandError, StrandResult},
    function::Frame,
    lex::{Token, TokenKind},
    program::Program,
    scope::VarRef,
    types::Type,
    value::Value,
};

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(Self::Add),
            TokenKind::Minus => Some(Self::Sub),
            TokenKind::Star => Some(Self::Mul),
            TokenKind::Slash => Some(Self::Div),
            _ => None,
        }
    }

    fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Integer arithmetic wraps on overflow.
    fn apply_int(&self, a: i64, b: i64) -> StrandResult<i64> {
        match self {
            Self::Add => Ok(a.wrapping_add(b)),
            Self::Sub => Ok(a.wrapping_sub(b)),
            Self::Mul => Ok(a.wrapping_mul(b)),
            Self::Div if b == 0 => Err(StrandError::runtime("integer division by zero")),
            Self::Div => Ok(a.wrapping_div(b)),
        }
    }

    fn apply_float(&self, a: f64, b: f64) -> StrandResult<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Sub => Ok(a - b),
            Self::Mul => Ok(a * b),
            Self::Div if b == 0.0 => Err(StrandError::runtime("float division by zero")),
            Self::Div => Ok(a / b),
        }
    }
}

/// Expression of exactly one operator between two operands.
#[derive(Debug, Clone, Copy)]
pub struct Binary<'a> {
    pub lhs: &'a Token,
    pub op: BinOp,
    pub rhs: &'a Token,
}

impl<'a> Binary<'a> {
    /// Recognise `operand operator operand` at the start of the slice.
    pub fn parse(tokens: &'a [Token]) -> Option<Self> {
        match tokens {
            [lhs, op, rhs, ..] if lhs.is_operand() && rhs.is_operand() => Some(Binary {
                lhs,
                op: BinOp::from_token(op.kind)?,
                rhs,
            }),
            _ => None,
        }
    }
}

/// Evaluate the expression in the frame, and store the result in `dest`.
///
/// Both operands must have the same type, which becomes the type of
/// `dest` if it doesn't have one yet. A destination that is already
/// typed receives the result converted to its own numeric type.
pub fn eval_binary(program: &mut Program, frame: Frame, expr: Binary, dest: VarRef) -> StrandResult<()> {
    let lhs_ty = program.infer_type(frame, &expr.lhs.text)?;
    let rhs_ty = program.infer_type(frame, &expr.rhs.text)?;

    if lhs_ty != rhs_ty {
        return Err(StrandError::type_error(format!(
            "operand types don't match: {} {} {}",
            lhs_ty,
            expr.op.symbol(),
            rhs_ty
        )));
    }
    if !lhs_ty.is_numeric() {
        return Err(StrandError::type_error(format!(
            "operator '{}' is not supported for strings",
            expr.op.symbol()
        )));
    }

    let lhs = program.operand_value(frame, expr.lhs)?;
    let rhs = program.operand_value(frame, expr.rhs)?;

    let result = match (lhs, rhs) {
        (Value::F64(a), Value::F64(b)) => Value::F64(expr.op.apply_float(a, b)?),
        (a, b) => {
            let n = expr.op.apply_int(as_int(&a)?, as_int(&b)?)?;
            int_as(n, lhs_ty)
        }
    };
    trace!(
        "{} {} {} = {:?}",
        expr.lhs.text,
        expr.op.symbol(),
        expr.rhs.text,
        result
    );

    let dest_ty = program.scopes().var(dest).ty;
    match dest_ty {
        Some(ty) if ty != result.ty() => {
            let converted = convert(&result, ty).ok_or_else(|| {
                StrandError::type_error(format!(
                    "{} result {result:?} doesn't fit {ty} variable '{}'",
                    result.ty(),
                    program.scopes().var(dest).name
                ))
            })?;
            program.store(dest, &converted)
        }
        _ => program.store(dest, &result),
    }
}

/// Integer domain value of a numeric operand.
///
/// Unsigned values above `i64::MAX` have no signed counterpart
/// and are rejected.
fn as_int(value: &Value) -> StrandResult<i64> {
    match value {
        Value::U8(v) => Ok(i64::from(*v)),
        Value::U64(v) => i64::try_from(*v).map_err(|_| {
            StrandError::type_error(format!("{v} is out of range for integer arithmetic"))
        }),
        Value::S64(v) => Ok(*v),
        Value::F64(_) | Value::Str(_) => Err(StrandError::type_error(format!(
            "{} is not an integer operand",
            value.ty()
        ))),
    }
}

/// Narrow an integer result back to the operand type.
///
/// Results wrap like the arithmetic itself.
fn int_as(n: i64, ty: Type) -> Value {
    match ty {
        Type::U8 => Value::U8(n as u8),
        Type::U64 => Value::U64(n as u64),
        _ => Value::S64(n),
    }
}

/// Conversion of a result into a differently typed destination.
///
/// Integers convert when the value is in range of the destination.
/// Floats never convert to integers.
fn convert(value: &Value, ty: Type) -> Option<Value> {
    let n = match value {
        Value::U8(v) => i128::from(*v),
        Value::U64(v) => i128::from(*v),
        Value::S64(v) => i128::from(*v),
        Value::F64(_) | Value::Str(_) => return None,
    };

    match ty {
        Type::U8 => u8::try_from(n).ok().map(Value::U8),
        Type::U64 => u64::try_from(n).ok().map(Value::U64),
        Type::S64 => i64::try_from(n).ok().map(Value::S64),
        Type::F64 => Some(Value::F64(n as f64)),
        Type::String => None,
    }
}
