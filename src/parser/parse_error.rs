use std::fmt::Display;

/// Parse failures. Every variant carries the offending fragment so callers
/// can surface it verbatim. Parsing is all-or-nothing: any error aborts the
/// whole parse with no partial query returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnknownClause { found: String },
    MalformedCondition { fragment: String },
    MalformedLimit { value: String },
    MalformedJoin { fragment: String },
    MalformedAggregate { fragment: String },
    MalformedHint { key: String, value: String },
}

impl ParseError {
    pub fn err<T>(self) -> Result<T, ParseError> {
        Err(self)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownClause { found } =>
                write!(f, "ParseError: unknown clause '{}'", found),
            ParseError::MalformedCondition { fragment } =>
                write!(f, "ParseError: malformed condition '{}'", fragment),
            ParseError::MalformedLimit { value } =>
                write!(f, "ParseError: malformed limit/offset '{}'", value),
            ParseError::MalformedJoin { fragment } =>
                write!(f, "ParseError: malformed join '{}'", fragment),
            ParseError::MalformedAggregate { fragment } =>
                write!(f, "ParseError: malformed aggregate '{}'", fragment),
            ParseError::MalformedHint { key, value } =>
                write!(f, "ParseError: malformed hint '{}={}'", key, value),
        }
    }
}

impl std::error::Error for ParseError {}
