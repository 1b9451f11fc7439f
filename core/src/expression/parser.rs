//! # Expression Parser
//!
//! Splits composite expressions (`text ${expr} text`) into parts and parses
//! each `${...}` body into an [`Expr`] tree.

use serde_json::{Number, Value};

/// Result of a parse step; the error is a human readable message.
pub(crate) type ParseResult<T> = Result<T, String>;

/// One piece of a composite expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Literal text copied as is.
    Text(String),
    /// A `${...}` expression.
    Eval(Expr),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!` / `not`
    Not,
    /// `-`
    Negate,
    /// `empty`
    Empty,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` / `div`
    Div,
    /// `%` / `mod`
    Rem,
    /// `==` / `eq`
    Eq,
    /// `!=` / `ne`
    Ne,
    /// `<` / `lt`
    Lt,
    /// `>` / `gt`
    Gt,
    /// `<=` / `le`
    Le,
    /// `>=` / `ge`
    Ge,
    /// `&&` / `and`
    And,
    /// `||` / `or`
    Or,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string, number, boolean or null literal.
    Literal(Value),
    /// A top-level identifier such as `instance`.
    Ident(String),
    /// `target.name`
    Member(Box<Expr>, String),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// Prefix operator.
    Unary(UnaryOp, Box<Expr>),
    /// Infix operator.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `cond ? a : b`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Value),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Question,
    Colon,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
}

/// Splits `input` into literal text and parsed `${...}` expressions.
pub fn parse_composite(input: &str) -> ParseResult<Vec<Part>> {
    let mut parts = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while let Some(start) = rest.find("${") {
        if start > 0 {
            parts.push(Part::Text(rest[..start].to_string()));
        }
        let body_start = offset + start + 2;
        let (tokens, end) = tokenize(input, body_start)?;
        parts.push(Part::Eval(Parser::new(tokens).parse()?));
        offset = end;
        rest = &input[end..];
    }

    if !rest.is_empty() {
        parts.push(Part::Text(rest.to_string()));
    }
    Ok(parts)
}

/// Lexes from `start` up to the closing `}`; returns the tokens and the byte
/// position just past the brace.
fn tokenize(input: &str, start: usize) -> ParseResult<(Vec<Token>, usize)> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = start;

    while pos < bytes.len() {
        let c = bytes[pos];
        let next = bytes.get(pos + 1).copied();
        let (token, width) = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'}' => return Ok((tokens, pos + 1)),
            b'.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let (value, width) = lex_number(&input[pos..])?;
                (Token::Literal(value), width)
            }
            b'.' => (Token::Dot, 1),
            b'[' => (Token::LBracket, 1),
            b']' => (Token::RBracket, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'?' => (Token::Question, 1),
            b':' => (Token::Colon, 1),
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Star, 1),
            b'/' => (Token::Slash, 1),
            b'%' => (Token::Percent, 1),
            b'=' if next == Some(b'=') => (Token::EqEq, 2),
            b'!' if next == Some(b'=') => (Token::NotEq, 2),
            b'!' => (Token::Not, 1),
            b'<' if next == Some(b'=') => (Token::Le, 2),
            b'<' => (Token::Lt, 1),
            b'>' if next == Some(b'=') => (Token::Ge, 2),
            b'>' => (Token::Gt, 1),
            b'&' if next == Some(b'&') => (Token::AndAnd, 2),
            b'|' if next == Some(b'|') => (Token::OrOr, 2),
            b'\'' | b'"' => {
                let (text, width) = lex_string(&input[pos..])?;
                (Token::Literal(Value::String(text)), width)
            }
            c if c.is_ascii_digit() => {
                let (value, width) = lex_number(&input[pos..])?;
                (Token::Literal(value), width)
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                let word: String = input[pos..]
                    .chars()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '$')
                    .collect();
                let width = word.len();
                (keyword(word), width)
            }
            _ => {
                let ch = input[pos..].chars().next().unwrap_or_default();
                return Err(format!("unexpected character '{}' at {}", ch, pos));
            }
        };
        tokens.push(token);
        pos += width;
    }

    Err("missing closing '}'".to_string())
}

fn keyword(word: String) -> Token {
    match word.as_str() {
        "true" => Token::Literal(Value::Bool(true)),
        "false" => Token::Literal(Value::Bool(false)),
        "null" => Token::Literal(Value::Null),
        "and" => Token::AndAnd,
        "or" => Token::OrOr,
        "not" => Token::Not,
        "eq" => Token::EqEq,
        "ne" => Token::NotEq,
        "lt" => Token::Lt,
        "gt" => Token::Gt,
        "le" => Token::Le,
        "ge" => Token::Ge,
        "div" => Token::Slash,
        "mod" => Token::Percent,
        _ => Token::Ident(word),
    }
}

fn lex_string(input: &str) -> ParseResult<(String, usize)> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err("expected string literal".to_string()),
    };
    let mut text = String::new();
    let mut escaped = false;
    for (idx, ch) in chars {
        if escaped {
            text.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Ok((text, idx + ch.len_utf8()));
        } else {
            text.push(ch);
        }
    }
    Err("unterminated string literal".to_string())
}

fn lex_number(input: &str) -> ParseResult<(Value, usize)> {
    let literal: String = input
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E'))
        .collect();
    let width = literal.len();
    let value = if literal.contains(['.', 'e', 'E']) {
        literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    } else {
        literal.parse::<i64>().ok().map(|n| Value::Number(n.into()))
    };
    value
        .map(|v| (v, width))
        .ok_or_else(|| format!("invalid number literal '{}'", literal))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse(mut self) -> ParseResult<Expr> {
        if self.tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        let expr = self.conditional()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected token {:?}", token)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", token, self.peek()))
        }
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let cond = self.or()?;
        if self.eat(&Token::Question) {
            let then = self.conditional()?;
            self.expect(Token::Colon)?;
            let otherwise = self.conditional()?;
            return Ok(Expr::Conditional(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let rhs = next(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[(Token::OrOr, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[(Token::AndAnd, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                (Token::Le, BinaryOp::Le),
                (Token::Ge, BinaryOp::Ge),
                (Token::Lt, BinaryOp::Lt),
                (Token::Gt, BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = if self.eat(&Token::Not) {
            UnaryOp::Not
        } else if self.eat(&Token::Minus) {
            UnaryOp::Negate
        } else if self.peek() == Some(&Token::Ident("empty".to_string())) {
            self.pos += 1;
            UnaryOp::Empty
        } else {
            return self.postfix();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.tokens.get(self.pos).cloned() {
                    Some(Token::Ident(name)) => {
                        self.pos += 1;
                        expr = Expr::Member(Box::new(expr), name);
                    }
                    other => return Err(format!("expected property name, found {:?}", other)),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.conditional()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let expr = self.conditional()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            None => Err("unexpected end of expression".to_string()),
            Some(other) => Err(format!("unexpected token {:?}", other)),
        }
    }
}
