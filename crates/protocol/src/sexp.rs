//! Minimal Emacs Lisp s-expression model.
//!
//! Only what the bridge sends is modelled: atoms, lists and the quote
//! reader macro. Rendering follows the Emacs reader: strings escape `"`
//! and `\`, floats always carry a decimal point or exponent, booleans map
//! to `t` / `nil`, and JSON objects become property lists keyed by bare
//! symbols.

use std::fmt::{self, Write};

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Nil,
    T,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Str(String),
    Symbol(String),
    List(Vec<Sexp>),
    Quote(Box<Sexp>),
}

impl Sexp {
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn quote(inner: Sexp) -> Self {
        Self::Quote(Box::new(inner))
    }

    /// A call form `(head args...)`.
    pub fn call(head: &str, args: impl IntoIterator<Item = Sexp>) -> Self {
        let mut items = vec![Self::symbol(head)];
        items.extend(args);
        Self::List(items)
    }

    /// Quoted list of strings, e.g. column names or table names.
    pub fn quoted_strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::quote(Self::List(items.into_iter().map(Self::string).collect()))
    }
}

impl From<&Value> for Sexp {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Self::Nil,
            Value::Bool(true) => Self::T,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Unsigned(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::List(
                map.iter()
                    .flat_map(|(k, v)| [Self::Symbol(k.clone()), Self::from(v)])
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::T => f.write_str("t"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Unsigned(u) => write!(f, "{u}"),
            Self::Float(x) => write_float(f, *x),
            Self::Str(s) => write_string(f, s),
            Self::Symbol(s) => write_symbol(f, s),
            Self::List(items) => {
                f.write_char('(')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(')')
            }
            Self::Quote(inner) => write!(f, "'{inner}"),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("0.0e+NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "1.0e+INF" } else { "-1.0e+INF" })
    } else {
        // Debug keeps a trailing `.0` on integral values, which the reader needs.
        write!(f, "{x:?}")
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

fn write_symbol(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    for c in s.chars() {
        if !(c.is_alphanumeric() || "-+=*/_~!@$%^&:<>{}?.".contains(c)) {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}
