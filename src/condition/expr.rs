//! Typed expression tree for device conditions and its evaluator.

use thiserror::Error;

use crate::device::{DeviceRegistry, DeviceVariable, Value};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character {ch:?} at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected {found} at offset {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression longer than {0} tokens")]
    TooLong(usize),
    #[error("unknown variable {0:?}")]
    UnknownVariable(String),
    #[error("integer literal {0} out of range")]
    LiteralOutOfRange(String),
    #[error("{op} expects {expected}, got {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} has no value")]
    Unbound(DeviceVariable),
    #[error("condition evaluates to {0}, not bool")]
    NotBoolean(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Lit(Value),
    Var(DeviceVariable),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against current device state. `&&` and `||` short-circuit.
    pub fn eval(&self, registry: &dyn DeviceRegistry) -> Result<Value, ExprError> {
        match self {
            Expr::Lit(v) => Ok(*v),
            Expr::Var(var) => registry.get(*var).ok_or(ExprError::Unbound(*var)),
            Expr::Not(inner) => Ok(Value::Bool(!as_bool("!", inner.eval(registry)?)?)),
            Expr::Neg(inner) => {
                let n = as_int("-", inner.eval(registry)?)?;
                n.checked_neg().map(Value::Int).ok_or(ExprError::Overflow("-"))
            }
            Expr::Binary(BinOp::And, lhs, rhs) => {
                if !as_bool("&&", lhs.eval(registry)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(as_bool("&&", rhs.eval(registry)?)?))
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                if as_bool("||", lhs.eval(registry)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(as_bool("||", rhs.eval(registry)?)?))
            }
            Expr::Binary(op, lhs, rhs) => apply(*op, lhs.eval(registry)?, rhs.eval(registry)?),
        }
    }

    /// Variables referenced anywhere in the tree, in first-seen order.
    pub fn variables(&self) -> Vec<DeviceVariable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<DeviceVariable>) {
        match self {
            Expr::Lit(_) => {}
            Expr::Var(var) => {
                if !out.contains(var) {
                    out.push(*var);
                }
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.collect_variables(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}

fn as_bool(op: &'static str, v: Value) -> Result<bool, ExprError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::TypeMismatch {
            op,
            expected: "bool",
            found: other.type_name(),
        }),
    }
}

fn as_int(op: &'static str, v: Value) -> Result<i64, ExprError> {
    match v {
        Value::Int(n) => Ok(n),
        other => Err(ExprError::TypeMismatch {
            op,
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn apply(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    let sym = op.symbol();
    match op {
        BinOp::Eq | BinOp::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Int(a), Value::Int(b)) => a == b,
                (a, b) => {
                    return Err(ExprError::TypeMismatch {
                        op: sym,
                        expected: a.type_name(),
                        found: b.type_name(),
                    })
                }
            };
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (a, b) = (as_int(sym, lhs)?, as_int(sym, rhs)?);
            let result = match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                _ => a >= b,
            };
            Ok(Value::Bool(result))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            let (a, b) = (as_int(sym, lhs)?, as_int(sym, rhs)?);
            if matches!(op, BinOp::Div | BinOp::Rem) && b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                BinOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Value::Int).ok_or(ExprError::Overflow(sym))
        }
        BinOp::And | BinOp::Or => {
            let (a, b) = (as_bool(sym, lhs)?, as_bool(sym, rhs)?);
            Ok(Value::Bool(if op == BinOp::And { a && b } else { a || b }))
        }
    }
}
