use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());

/// A literal value on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Literal>),
}

impl Literal {
    /// Coerces one raw value token: matching quotes are stripped and the
    /// content kept as a string; unquoted numeric-looking tokens become
    /// numbers; `true`/`false` become booleans; anything else stays a
    /// string token.
    pub fn coerce(token: &str) -> Literal {
        let token = token.trim();

        if token.len() >= 2 {
            let first = token.chars().next().unwrap_or('\0');
            let last = token.chars().last().unwrap_or('\0');
            if (first == '\'' || first == '"') && first == last {
                return Literal::Str(token[1..token.len() - 1].to_string());
            }
        }

        if NUMERIC.is_match(token) {
            if let Ok(int) = token.parse::<i64>() {
                return Literal::Int(int);
            }
            if let Ok(float) = token.parse::<f64>() {
                return Literal::Float(float);
            }
        }

        if token.eq_ignore_ascii_case("true") {
            return Literal::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return Literal::Bool(false);
        }

        Literal::Str(token.to_string())
    }

    /// Parses a full value expression: bracketed/parenthesized lists split
    /// on commas with each element re-coerced, everything else coerced as a
    /// single token.
    pub fn parse_value(text: &str) -> Literal {
        let text = text.trim();

        let inner = if text.starts_with('[') && text.ends_with(']') {
            Some(&text[1..text.len() - 1])
        } else if text.starts_with('(') && text.ends_with(')') {
            Some(&text[1..text.len() - 1])
        } else {
            None
        };

        if let Some(inner) = inner {
            let items = split_list(inner).iter().map(|item| Literal::coerce(item)).collect();
            return Literal::List(items);
        }

        Literal::coerce(text)
    }

    pub fn as_json(&self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.clone()),
            Literal::Int(i) => Value::Number(Number::from(*i)),
            Literal::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::List(items) => Value::Array(items.iter().map(Literal::as_json).collect()),
        }
    }

    /// Renders the literal the way SQL expects it: strings single-quoted
    /// with embedded quotes doubled, numbers and booleans bare, lists
    /// parenthesized.
    pub fn as_sql(&self) -> String {
        match self {
            Literal::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            Literal::List(items) => {
                let rendered: Vec<String> = items.iter().map(Literal::as_sql).collect();
                format!("({})", rendered.join(", "))
            }
        }
    }

    /// Plain text rendering used for key synthesis and module commands.
    pub fn as_plain(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::List(items) => {
                let rendered: Vec<String> = items.iter().map(Literal::as_plain).collect();
                rendered.join(",")
            }
        }
    }
}

/// Splits a list body on commas, respecting quoted regions.
fn split_list(text: &str) -> Vec<String> {
    let mut items: Vec<String> = vec![];
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                current.push(ch);
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                    current.push(ch);
                } else if ch == ',' {
                    items.push(current.trim().to_string());
                    current = String::new();
                } else {
                    current.push(ch);
                }
            }
        }
    }

    let last = current.trim().to_string();
    if !last.is_empty() {
        items.push(last);
    }

    items
}
