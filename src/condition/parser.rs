//! Tokenizer and recursive-descent parser for condition expressions.
//!
//! Precedence, loosest first: `||`, `&&`, comparisons, `+ -`, `* / %`, unary `! -`.
//! All binary operators are left-associative.

use super::expr::{BinOp, Expr, ExprError};
use crate::device::{DeviceVariable, Value};

/// Maximum nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 128;
/// Maximum token count. Bounds the depth of left-associative operator chains.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Int(String),
    Ident(String),
    Op(BinOp),
    Not,
    LParen,
    RParen,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Int(s) => format!("integer {s}"),
            Tok::Ident(s) => format!("identifier {s:?}"),
            Tok::Op(op) => format!("operator {:?}", op.symbol()),
            Tok::Not => "operator \"!\"".into(),
            Tok::LParen => "\"(\"".into(),
            Tok::RParen => "\")\"".into(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<(Tok, usize)>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            tokens.push((Tok::Int(text), pos));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            tokens.push((Tok::Ident(text), pos));
            continue;
        }

        let (tok, width) = match (c, next) {
            ('|', Some('|')) => (Tok::Op(BinOp::Or), 2),
            ('&', Some('&')) => (Tok::Op(BinOp::And), 2),
            ('=', Some('=')) => (Tok::Op(BinOp::Eq), 2),
            ('!', Some('=')) => (Tok::Op(BinOp::Ne), 2),
            ('<', Some('=')) => (Tok::Op(BinOp::Le), 2),
            ('>', Some('=')) => (Tok::Op(BinOp::Ge), 2),
            ('<', _) => (Tok::Op(BinOp::Lt), 1),
            ('>', _) => (Tok::Op(BinOp::Gt), 1),
            ('+', _) => (Tok::Op(BinOp::Add), 1),
            ('-', _) => (Tok::Op(BinOp::Sub), 1),
            ('*', _) => (Tok::Op(BinOp::Mul), 1),
            ('/', _) => (Tok::Op(BinOp::Div), 1),
            ('%', _) => (Tok::Op(BinOp::Rem), 1),
            ('!', _) => (Tok::Not, 1),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            _ => return Err(ExprError::UnexpectedChar { ch: c, pos }),
        };
        tokens.push((tok, pos));
        i += width;
    }

    Ok(tokens)
}

/// Parse a condition expression into a tree.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong(MAX_TOKENS));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some((tok, pos)) => Err(ExprError::UnexpectedToken {
            found: tok.describe(),
            pos: *pos,
        }),
    }
}

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Tok, usize)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<(Tok, usize), ExprError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    /// Run `rule` one nesting level deeper.
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let expr = rule(self);
        self.depth -= 1;
        expr
    }

    /// Consume the next token if it is one of `ops`.
    fn eat_op(&mut self, ops: &[BinOp]) -> Option<BinOp> {
        match self.peek() {
            Some((Tok::Op(op), _)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[BinOp],
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = operand(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Or], Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::And], Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[BinOp::Eq, BinOp::Ne, BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Add, BinOp::Sub], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Mul, BinOp::Div, BinOp::Rem], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some((Tok::Not, _)) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.nested(Self::unary)?)))
            }
            Some((Tok::Op(BinOp::Sub), _)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let (tok, pos) = self.next()?;
        match tok {
            Tok::Int(text) => text
                .parse::<i64>()
                .map(|n| Expr::Lit(Value::Int(n)))
                .map_err(|_| ExprError::LiteralOutOfRange(text)),
            Tok::Ident(name) if name == "true" => Ok(Expr::Lit(Value::Bool(true))),
            Tok::Ident(name) if name == "false" => Ok(Expr::Lit(Value::Bool(false))),
            Tok::Ident(name) => name
                .parse::<DeviceVariable>()
                .map(Expr::Var)
                .map_err(|_| ExprError::UnknownVariable(name)),
            Tok::LParen => {
                let inner = self.nested(Self::or)?;
                match self.next()? {
                    (Tok::RParen, _) => Ok(inner),
                    (other, pos) => Err(ExprError::UnexpectedToken {
                        found: other.describe(),
                        pos,
                    }),
                }
            }
            other => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                pos,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: i64) -> Box<Expr> {
        Box::new(Expr::Lit(Value::Int(n)))
    }

    #[test]
    fn multiplication_binds_tighter() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinOp::Add,
                lit(1),
                Box::new(Expr::Binary(BinOp::Mul, lit(2), lit(3)))
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("true || false && false").unwrap();
        match expr {
            Expr::Binary(BinOp::Or, _, rhs) => {
                assert!(matches!(*rhs, Expr::Binary(BinOp::And, _, _)))
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn variables_resolve_by_whole_name() {
        let expr = parse("sound_volume > 3 && !sound_muted").unwrap();
        assert_eq!(
            expr.variables(),
            vec![DeviceVariable::SoundVolume, DeviceVariable::SoundMuted]
        );
    }

    #[test]
    fn rejects_unknown_identifiers() {
        assert_eq!(
            parse("battery < 20"),
            Err(ExprError::UnknownVariable("battery".into()))
        );
        // a known name with a suffix is a different identifier
        assert_eq!(
            parse("battery_level2 < 20"),
            Err(ExprError::UnknownVariable("battery_level2".into()))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse(""), Err(ExprError::Empty));
        assert_eq!(parse("   "), Err(ExprError::Empty));
        assert_eq!(parse("battery_level <"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(parse("(1 < 2"), Err(ExprError::UnexpectedEnd)));
        assert!(matches!(parse("1 < 2)"), Err(ExprError::UnexpectedToken { pos: 5, .. })));
        assert!(matches!(parse("1 = 2"), Err(ExprError::UnexpectedChar { ch: '=', .. })));
        assert!(matches!(parse("99999999999999999999 > 1"), Err(ExprError::LiteralOutOfRange(_))));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}true{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&parens), Err(ExprError::TooDeep(MAX_DEPTH)));

        let nots = format!("{}true", "!".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&nots), Err(ExprError::TooDeep(MAX_DEPTH)));

        let ok = format!("{}true{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(parse(&ok), Ok(Expr::Lit(Value::Bool(true))));
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let chain = format!("{}1 > 0", "1 + ".repeat(MAX_TOKENS));
        assert_eq!(parse(&chain), Err(ExprError::TooLong(MAX_TOKENS)));
    }
}
