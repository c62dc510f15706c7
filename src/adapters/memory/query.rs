//! SQL subset understood by the in-memory store
//!
//! ```text
//! SELECT [TOP n] * | path [AS name] [, ...]
//! FROM collection [[AS] alias]
//! [WHERE expr]
//! ```
//!
//! `expr` combines comparisons (`=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`) over
//! property paths, literals and `@parameters` with `AND`, `OR`, `NOT` and
//! parentheses. A missing property or a comparison between different JSON
//! types is undefined, and only documents for which the filter is `true`
//! match. `JOIN`, `ORDER BY`, `VALUE` and functions are rejected.

use crate::domain::{Document, SqlQuerySpec};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(Value),
    Param(String),
    Star,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Op(CmpOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Property path below the FROM alias; empty means the document itself
    Path(Vec<String>),
    Literal(Value),
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Compare(Operand, CmpOp, Operand),
    Truthy(Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
struct ProjectedField {
    path: Vec<String>,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Projection {
    All,
    Fields(Vec<ProjectedField>),
}

/// A parsed, parameter-bound query
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectQuery {
    top: Option<usize>,
    projection: Projection,
    filter: Option<Expr>,
}

impl SelectQuery {
    /// Parses the query text and binds its parameters
    pub(crate) fn parse(spec: &SqlQuerySpec) -> Result<Self, String> {
        let tokens = tokenize(&spec.query)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let raw = parser.parse_query()?;
        raw.bind(spec)
    }

    /// Maximum number of results, from `TOP n`
    pub(crate) fn top(&self) -> Option<usize> {
        self.top
    }

    /// Whether the WHERE clause evaluates to `true` for the document
    pub(crate) fn matches(&self, doc: &Document) -> bool {
        match &self.filter {
            None => true,
            Some(expr) => eval(expr, doc) == Some(true),
        }
    }

    /// Shapes a matching document according to the SELECT list
    pub(crate) fn project(&self, doc: &Document) -> Document {
        match &self.projection {
            Projection::All => doc.clone(),
            Projection::Fields(fields) => {
                let mut map = Map::new();
                for field in fields {
                    if let Some(value) = resolve(doc, &field.path) {
                        map.insert(field.name.clone(), value.clone());
                    }
                }
                Document::from_value(Value::Object(map)).unwrap_or_default()
            }
        }
    }

    /// Property paths referenced by the WHERE clause, as `/a/b`
    pub(crate) fn filter_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if let Some(expr) = &self.filter {
            collect_paths(expr, &mut paths);
        }
        paths
    }
}

fn push_path(operand: &Operand, out: &mut Vec<String>) {
    if let Operand::Path(segments) = operand {
        if !segments.is_empty() {
            let path = format!("/{}", segments.join("/"));
            if !out.contains(&path) {
                out.push(path);
            }
        }
    }
}

fn collect_paths(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Compare(left, _, right) => {
            push_path(left, out);
            push_path(right, out);
        }
        Expr::Truthy(operand) => push_path(operand, out),
        Expr::And(a, b) | Expr::Or(a, b) => {
            collect_paths(a, out);
            collect_paths(b, out);
        }
        Expr::Not(inner) => collect_paths(inner, out),
    }
}

fn resolve<'a>(doc: &'a Document, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn operand_value<'a>(doc: &'a Document, operand: &'a Operand) -> Option<&'a Value> {
    match operand {
        Operand::Path(path) => resolve(doc, path),
        Operand::Literal(value) => Some(value),
        // Parameters are bound before evaluation
        Operand::Parameter(_) => None,
    }
}

fn eval(expr: &Expr, doc: &Document) -> Option<bool> {
    match expr {
        Expr::Compare(left, op, right) => {
            compare(operand_value(doc, left)?, *op, operand_value(doc, right)?)
        }
        Expr::Truthy(operand) => match operand_value(doc, operand)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        },
        Expr::And(a, b) => match (eval(a, doc), eval(b, doc)) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        Expr::Or(a, b) => match (eval(a, doc), eval(b, doc)) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        Expr::Not(inner) => eval(inner, doc).map(|b| !b),
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?)?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            return match op {
                CmpOp::Eq => Some(left == right),
                CmpOp::Ne => Some(left != right),
                _ => None,
            };
        }
        _ => return None,
    };
    Some(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CmpOp::Le));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CmpOp::Lt));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(format!("Unterminated string literal in query: {input}")),
                        Some('\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| "Unterminated escape sequence".to_string())?;
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => *other,
                            });
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '@' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i == start + 1 {
                    return Err("Expected a parameter name after '@'".to_string());
                }
                tokens.push(Token::Param(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || matches!(chars[i], '.' | 'e' | 'E')
                        || (matches!(chars[i], '+' | '-') && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value: Value = serde_json::from_str(&text)
                    .map_err(|_| format!("Invalid number literal '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("Syntax error, unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

/// Parse result before the FROM alias is resolved and parameters are bound
struct RawQuery {
    top: Option<usize>,
    projection: Option<Vec<(Vec<String>, Option<String>)>>,
    alias: String,
    filter: Option<RawExpr>,
}

enum RawExpr {
    Compare(RawOperand, CmpOp, RawOperand),
    Truthy(RawOperand),
    And(Box<RawExpr>, Box<RawExpr>),
    Or(Box<RawExpr>, Box<RawExpr>),
    Not(Box<RawExpr>),
}

enum RawOperand {
    /// Full path including the root identifier
    Path(Vec<String>),
    Literal(Value),
    Parameter(String),
}

impl RawQuery {
    fn bind(self, spec: &SqlQuerySpec) -> Result<SelectQuery, String> {
        let alias = self.alias;
        let projection = match self.projection {
            None => Projection::All,
            Some(items) => {
                let mut fields = Vec::with_capacity(items.len());
                for (index, (path, name)) in items.into_iter().enumerate() {
                    let relative = strip_alias(&alias, path)?;
                    let name = name
                        .or_else(|| relative.last().cloned())
                        .unwrap_or_else(|| format!("${}", index + 1));
                    fields.push(ProjectedField {
                        path: relative,
                        name,
                    });
                }
                Projection::Fields(fields)
            }
        };
        let filter = self
            .filter
            .map(|expr| bind_expr(expr, &alias, spec))
            .transpose()?;
        Ok(SelectQuery {
            top: self.top,
            projection,
            filter,
        })
    }
}

fn strip_alias(alias: &str, path: Vec<String>) -> Result<Vec<String>, String> {
    match path.split_first() {
        Some((root, rest)) if root == alias => Ok(rest.to_vec()),
        Some((root, _)) => Err(format!("Identifier '{root}' could not be resolved")),
        None => Err("Empty property path".to_string()),
    }
}

fn bind_operand(operand: RawOperand, alias: &str, spec: &SqlQuerySpec) -> Result<Operand, String> {
    match operand {
        RawOperand::Path(path) => Ok(Operand::Path(strip_alias(alias, path)?)),
        RawOperand::Literal(value) => Ok(Operand::Literal(value)),
        RawOperand::Parameter(name) => spec
            .parameter(&name)
            .cloned()
            .map(Operand::Literal)
            .ok_or_else(|| format!("Parameter '{name}' is referenced but not defined")),
    }
}

fn bind_expr(expr: RawExpr, alias: &str, spec: &SqlQuerySpec) -> Result<Expr, String> {
    Ok(match expr {
        RawExpr::Compare(left, op, right) => Expr::Compare(
            bind_operand(left, alias, spec)?,
            op,
            bind_operand(right, alias, spec)?,
        ),
        RawExpr::Truthy(operand) => Expr::Truthy(bind_operand(operand, alias, spec)?),
        RawExpr::And(a, b) => Expr::And(
            Box::new(bind_expr(*a, alias, spec)?),
            Box::new(bind_expr(*b, alias, spec)?),
        ),
        RawExpr::Or(a, b) => Expr::Or(
            Box::new(bind_expr(*a, alias, spec)?),
            Box::new(bind_expr(*b, alias, spec)?),
        ),
        RawExpr::Not(inner) => Expr::Not(Box::new(bind_expr(*inner, alias, spec)?)),
    })
}

const RESERVED: [&str; 14] = [
    "SELECT", "TOP", "FROM", "WHERE", "AND", "OR", "NOT", "AS", "JOIN", "IN", "ORDER", "BY",
    "VALUE", "DISTINCT",
];

fn is_reserved(ident: &str) -> bool {
    RESERVED.iter().any(|kw| kw.eq_ignore_ascii_case(ident))
}

/// Deepest nesting of parentheses and `NOT` accepted in a filter
const MAX_NESTING: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Enters one nesting level; the caller leaves it with `depth -= 1`
    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(format!(
                "Query is nested too deeply (more than {MAX_NESTING} levels)"
            ));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(format!(
                "Syntax error, expected '{keyword}' near {}",
                self.describe_current()
            ))
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(ref token) if *token == expected => Ok(()),
            _ => Err(format!("Syntax error, expected {expected:?}")),
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of query".to_string(),
            Some(Token::Ident(id)) => format!("'{id}'"),
            Some(other) => format!("{other:?}"),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(id)) if !is_reserved(&id) => Ok(id),
            Some(Token::Ident(id)) => Err(format!("Syntax error, unexpected keyword '{id}'")),
            _ => Err("Syntax error, expected an identifier".to_string()),
        }
    }

    fn parse_query(&mut self) -> Result<RawQuery, String> {
        self.expect_keyword("SELECT")?;

        if self.peek_keyword("VALUE") || self.peek_keyword("DISTINCT") {
            return Err(format!(
                "{} is not supported by the in-memory store",
                self.describe_current()
            ));
        }

        let top = if self.eat_keyword("TOP") {
            match self.next() {
                Some(Token::Number(Value::Number(n))) => Some(
                    n.as_u64()
                        .ok_or_else(|| "TOP requires a non-negative integer".to_string())?
                        as usize,
                ),
                _ => return Err("TOP requires a non-negative integer".to_string()),
            }
        } else {
            None
        };

        let projection = if matches!(self.peek(), Some(Token::Star)) {
            self.pos += 1;
            None
        } else {
            let mut items = Vec::new();
            loop {
                let path = self.parse_path()?;
                let name = if self.eat_keyword("AS") {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                items.push((path, name));
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            Some(items)
        };

        self.expect_keyword("FROM")?;
        let source = self.expect_identifier()?;
        self.eat_keyword("AS");
        let alias = match self.peek() {
            Some(Token::Ident(id)) if !is_reserved(id) => {
                let id = id.clone();
                self.pos += 1;
                id
            }
            _ => source,
        };

        if self.peek_keyword("JOIN") {
            return Err("JOIN is not supported by the in-memory store".to_string());
        }

        let filter = if self.eat_keyword("WHERE") {
            Some(self.parse_or()?)
        } else {
            None
        };

        if self.peek_keyword("ORDER") {
            return Err("ORDER BY is not supported by the in-memory store".to_string());
        }

        if self.peek().is_some() {
            return Err(format!(
                "Syntax error, unexpected {} at end of query",
                self.describe_current()
            ));
        }

        Ok(RawQuery {
            top,
            projection,
            alias,
            filter,
        })
    }

    fn parse_path(&mut self) -> Result<Vec<String>, String> {
        let mut path = vec![self.expect_identifier()?];
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(id)) => path.push(id),
                        _ => return Err("Syntax error, expected a property name after '.'".to_string()),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Str(name)) => path.push(name),
                        Some(Token::Number(Value::Number(n))) if n.is_u64() => {
                            path.push(n.to_string())
                        }
                        _ => return Err("Syntax error, expected a property name or index inside '[]'".to_string()),
                    }
                    self.expect(Token::RBracket)?;
                }
                Some(Token::LParen) => {
                    return Err(format!(
                        "Function '{}' is not supported by the in-memory store",
                        path.join(".")
                    ))
                }
                _ => return Ok(path),
            }
        }
    }

    fn parse_or(&mut self) -> Result<RawExpr, String> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = RawExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<RawExpr, String> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = RawExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<RawExpr, String> {
        if self.eat_keyword("NOT") {
            self.enter()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(RawExpr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<RawExpr, String> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }

        let left = self.parse_operand()?;
        match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.parse_operand()?;
                Ok(RawExpr::Compare(left, op, right))
            }
            _ => Ok(RawExpr::Truthy(left)),
        }
    }

    fn parse_operand(&mut self) -> Result<RawOperand, String> {
        match self.peek().cloned() {
            Some(Token::Str(text)) => {
                self.pos += 1;
                Ok(RawOperand::Literal(Value::String(text)))
            }
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(RawOperand::Literal(value))
            }
            Some(Token::Param(name)) => {
                self.pos += 1;
                Ok(RawOperand::Parameter(name))
            }
            Some(Token::Ident(id)) if id.eq_ignore_ascii_case("true") => {
                self.pos += 1;
                Ok(RawOperand::Literal(Value::Bool(true)))
            }
            Some(Token::Ident(id)) if id.eq_ignore_ascii_case("false") => {
                self.pos += 1;
                Ok(RawOperand::Literal(Value::Bool(false)))
            }
            Some(Token::Ident(id)) if id.eq_ignore_ascii_case("null") => {
                self.pos += 1;
                Ok(RawOperand::Literal(Value::Null))
            }
            Some(Token::Ident(_)) => Ok(RawOperand::Path(self.parse_path()?)),
            _ => Err(format!(
                "Syntax error, expected a value near {}",
                self.describe_current()
            )),
        }
    }
}
