//! Parser for the statement subset the in-memory store executes.
//!
//! Supported forms:
//!
//! ```text
//! SELECT * | "a", "b" FROM "T"[."index"] [WHERE cond [AND cond]...]
//! INSERT INTO "T" VALUE {'k': literal, ...}
//! UPDATE "T" SET "a" = literal[, ...] [REMOVE "b"[, ...]] WHERE cond [AND cond]...
//! DELETE FROM "T" WHERE cond [AND cond]...
//! ```
//!
//! Conditions are comparisons (`= <> != < <= > >=`), `IS [NOT] MISSING`,
//! `begins_with(a, lit)` and `contains(a, lit)`. Keywords are case-insensitive.

use std::collections::BTreeMap;
use std::fmt;

use dyno_core::{Item, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        table: String,
        projection: Projection,
        conditions: Vec<Condition>,
    },
    Insert {
        table: String,
        item: Item,
    },
    Update {
        table: String,
        set: Vec<(String, Value)>,
        remove: Vec<String>,
        conditions: Vec<Condition>,
    },
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Self::Select { table, .. }
            | Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Attributes(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        attribute: String,
        op: CompareOp,
        value: Value,
    },
    Missing {
        attribute: String,
        negated: bool,
    },
    BeginsWith {
        attribute: String,
        prefix: String,
    },
    Contains {
        attribute: String,
        needle: Value,
    },
}

impl Condition {
    /// Evaluate against an item. Comparisons across types are false.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
            } => item
                .get(attribute)
                .is_some_and(|actual| compare(actual, *op, value)),
            Self::Missing { attribute, negated } => item.contains_key(attribute) == *negated,
            Self::BeginsWith { attribute, prefix } => item
                .get(attribute)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Self::Contains { attribute, needle } => match (item.get(attribute), needle) {
                (Some(Value::String(s)), Value::String(n)) => s.contains(n.as_str()),
                (Some(Value::List(items)), n) => items.iter().any(|v| values_equal(v, n)),
                _ => false,
            },
        }
    }

    /// `attribute = value`, when this condition is a plain equality.
    pub fn equality(&self) -> Option<(&str, &Value)> {
        match self {
            Self::Compare {
                attribute,
                op: CompareOp::Eq,
                value,
            } => Some((attribute, value)),
            _ => None,
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.to_plain_decimal() == y.to_plain_decimal(),
        _ => a == b,
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if a.to_plain_decimal() == b.to_plain_decimal() {
                Some(Ordering::Equal)
            } else {
                a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y))
            }
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return match op {
                CompareOp::Eq => values_equal(actual, expected),
                CompareOp::Ne => !values_equal(actual, expected),
                _ => false,
            }
        }
    };

    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

/// The statement text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn err<T>(message: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError {
        message: message.into(),
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Str(String),
    Num(String),
    Sym(&'static str),
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '"' | '\'' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return err("unterminated quoted text"),
                        Some(&ch) if ch == quote => {
                            if chars.get(i + 1) == Some(&quote) {
                                s.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(if quote == '"' {
                    Token::Quoted(s)
                } else {
                    Token::Str(s)
                });
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '.')
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while let Some(&ch) = chars.get(i) {
                    let exponent_sign = (ch == '-' || ch == '+')
                        && matches!(chars.get(i - 1), Some('e') | Some('E'));
                    if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|ch| ch.is_alphanumeric() || *ch == '_')
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            _ => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let sym = match two.as_str() {
                    "<>" => Some("<>"),
                    "!=" => Some("<>"),
                    "<=" => Some("<="),
                    ">=" => Some(">="),
                    "<<" => Some("<<"),
                    ">>" => Some(">>"),
                    _ => None,
                };
                if let Some(sym) = sym {
                    tokens.push(Token::Sym(sym));
                    i += 2;
                    continue;
                }
                let sym = match c {
                    '*' => "*",
                    ',' => ",",
                    '.' => ".",
                    '=' => "=",
                    '<' => "<",
                    '>' => ">",
                    '(' => "(",
                    ')' => ")",
                    '{' => "{",
                    '}' => "}",
                    '[' => "[",
                    ']' => "]",
                    ':' => ":",
                    ';' => ";",
                    other => return err(format!("unexpected character '{other}'")),
                };
                tokens.push(Token::Sym(sym));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            err(format!("expected {keyword}"))
        }
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if matches!(self.peek(), Some(Token::Sym(s)) if *s == sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> Result<(), ParseError> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            err(format!("expected '{sym}'"))
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Token::Quoted(s)) | Some(Token::Word(s)) => Ok(s),
            other => err(format!("expected identifier, found {other:?}")),
        }
    }

    fn table(&mut self) -> Result<String, ParseError> {
        let table = self.identifier()?;
        // `"T"."index"` reads an index; the store only tracks the base table.
        if self.eat_sym(".") {
            self.identifier()?;
        }
        Ok(table)
    }

    fn literal(&mut self) -> Result<Value, ParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Num(n)) => Number::parse(&n)
                .map(Value::Number)
                .or_else(|e| err(e.to_string())),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("null") => Ok(Value::Null),
            Some(Token::Sym("{")) => {
                let mut map = BTreeMap::new();
                if !self.eat_sym("}") {
                    loop {
                        let key = match self.next() {
                            Some(Token::Str(k)) | Some(Token::Quoted(k)) => k,
                            other => return err(format!("expected map key, found {other:?}")),
                        };
                        self.expect_sym(":")?;
                        map.insert(key, self.literal()?);
                        if self.eat_sym("}") {
                            break;
                        }
                        self.expect_sym(",")?;
                    }
                }
                Ok(Value::Map(map))
            }
            Some(Token::Sym(open @ ("[" | "<<"))) => {
                let close = if open == "[" { "]" } else { ">>" };
                let mut items = Vec::new();
                if !self.eat_sym(close) {
                    loop {
                        items.push(self.literal()?);
                        if self.eat_sym(close) {
                            break;
                        }
                        self.expect_sym(",")?;
                    }
                }
                Ok(Value::List(items))
            }
            other => err(format!("expected literal, found {other:?}")),
        }
    }

    fn conditions(&mut self) -> Result<Vec<Condition>, ParseError> {
        let mut conditions = vec![self.condition()?];
        while self.eat_keyword("AND") {
            conditions.push(self.condition()?);
        }
        Ok(conditions)
    }

    fn condition(&mut self) -> Result<Condition, ParseError> {
        for function in ["begins_with", "contains"] {
            if self.at_keyword(function) {
                self.pos += 1;
                self.expect_sym("(")?;
                let attribute = self.identifier()?;
                self.expect_sym(",")?;
                let value = self.literal()?;
                self.expect_sym(")")?;
                return if function == "contains" {
                    Ok(Condition::Contains {
                        attribute,
                        needle: value,
                    })
                } else {
                    match value {
                        Value::String(prefix) => Ok(Condition::BeginsWith { attribute, prefix }),
                        _ => err("begins_with expects a string"),
                    }
                };
            }
        }

        let attribute = self.identifier()?;
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("MISSING")?;
            return Ok(Condition::Missing { attribute, negated });
        }

        let op = match self.next() {
            Some(Token::Sym("=")) => CompareOp::Eq,
            Some(Token::Sym("<>")) => CompareOp::Ne,
            Some(Token::Sym("<")) => CompareOp::Lt,
            Some(Token::Sym("<=")) => CompareOp::Le,
            Some(Token::Sym(">")) => CompareOp::Gt,
            Some(Token::Sym(">=")) => CompareOp::Ge,
            other => return err(format!("expected comparison operator, found {other:?}")),
        };
        let value = self.literal()?;
        Ok(Condition::Compare {
            attribute,
            op,
            value,
        })
    }

    fn optional_where(&mut self) -> Result<Vec<Condition>, ParseError> {
        if self.eat_keyword("WHERE") {
            self.conditions()
        } else {
            Ok(Vec::new())
        }
    }

    fn select(&mut self) -> Result<Statement, ParseError> {
        let projection = if self.eat_sym("*") {
            Projection::All
        } else {
            let mut attrs = vec![self.identifier()?];
            while self.eat_sym(",") {
                attrs.push(self.identifier()?);
            }
            Projection::Attributes(attrs)
        };
        self.expect_keyword("FROM")?;
        let table = self.table()?;
        let conditions = self.optional_where()?;
        Ok(Statement::Select {
            table,
            projection,
            conditions,
        })
    }

    fn insert(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("INTO")?;
        let table = self.table()?;
        self.expect_keyword("VALUE")?;
        match self.literal()? {
            Value::Map(item) => Ok(Statement::Insert { table, item }),
            _ => err("INSERT expects a map literal"),
        }
    }

    fn update(&mut self) -> Result<Statement, ParseError> {
        let table = self.table()?;
        let mut set = Vec::new();
        let mut remove = Vec::new();
        loop {
            if self.eat_keyword("SET") {
                loop {
                    let attribute = self.identifier()?;
                    self.expect_sym("=")?;
                    set.push((attribute, self.literal()?));
                    if !self.eat_sym(",") {
                        break;
                    }
                }
            } else if self.eat_keyword("REMOVE") {
                loop {
                    remove.push(self.identifier()?);
                    if !self.eat_sym(",") {
                        break;
                    }
                }
            } else {
                break;
            }
        }
        if set.is_empty() && remove.is_empty() {
            return err("UPDATE requires SET or REMOVE");
        }
        self.expect_keyword("WHERE")?;
        let conditions = self.conditions()?;
        Ok(Statement::Update {
            table,
            set,
            remove,
            conditions,
        })
    }

    fn delete(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("FROM")?;
        let table = self.table()?;
        self.expect_keyword("WHERE")?;
        let conditions = self.conditions()?;
        Ok(Statement::Delete { table, conditions })
    }
}

pub fn parse(text: &str) -> Result<Statement, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let statement = if parser.eat_keyword("SELECT") {
        parser.select()?
    } else if parser.eat_keyword("INSERT") {
        parser.insert()?
    } else if parser.eat_keyword("UPDATE") {
        parser.update()?
    } else if parser.eat_keyword("DELETE") {
        parser.delete()?
    } else {
        return err("statement must start with SELECT, INSERT, UPDATE, or DELETE");
    };
    parser.eat_sym(";");
    if let Some(extra) = parser.peek() {
        return err(format!("unexpected trailing token {extra:?}"));
    }
    Ok(statement)
}
