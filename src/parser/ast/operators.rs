use std::fmt;

/// The shared condition operator lexicon.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    In,
    NotIn,
    Like,
    ILike,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::NotEq => write!(f, "!="),
            Operator::Gt => write!(f, ">"),
            Operator::Lt => write!(f, "<"),
            Operator::GtEq => write!(f, ">="),
            Operator::LtEq => write!(f, "<="),
            Operator::In => write!(f, "IN"),
            Operator::NotIn => write!(f, "NOT IN"),
            Operator::Like => write!(f, "LIKE"),
            Operator::ILike => write!(f, "ILIKE"),
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operator({})", self)
    }
}

/// Word operators that must match whole words, longest first so `NOT IN`
/// wins over `IN` and `ILIKE` over `LIKE`.
const WORD_OPERATORS: [(&str, Operator); 4] = [
    ("NOT IN", Operator::NotIn),
    ("ILIKE", Operator::ILike),
    ("LIKE", Operator::Like),
    ("IN", Operator::In),
];

/// Symbolic operators, longest first so `>=` wins over `>`.
const SYMBOL_OPERATORS: [(&str, Operator); 6] = [
    (">=", Operator::GtEq),
    ("<=", Operator::LtEq),
    ("!=", Operator::NotEq),
    (">", Operator::Gt),
    ("<", Operator::Lt),
    ("=", Operator::Eq),
];

impl Operator {
    pub fn is_negated(&self) -> bool {
        matches!(self, Operator::NotEq | Operator::NotIn)
    }

    pub fn expects_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Finds the leftmost operator in `chars`, longest-match-first at each
    /// position, skipping quoted regions. Returns `(start, operator, end)`
    /// where `end` is the index just past the operator token.
    pub fn scan(chars: &[char]) -> Option<(usize, Operator, usize)> {
        let mut quote: Option<char> = None;
        let mut position = 0;

        while position < chars.len() {
            let current = chars[position];

            if let Some(open) = quote {
                if current == open {
                    quote = None;
                }
                position += 1;
                continue;
            }
            if current == '\'' || current == '"' {
                quote = Some(current);
                position += 1;
                continue;
            }

            for (token, op) in WORD_OPERATORS {
                if Self::word_matches(chars, position, token) {
                    return Some((position, op, position + token.len()));
                }
            }
            for (token, op) in SYMBOL_OPERATORS {
                if Self::symbol_matches(chars, position, token) {
                    return Some((position, op, position + token.len()));
                }
            }

            position += 1;
        }

        None
    }

    fn word_matches(chars: &[char], position: usize, token: &str) -> bool {
        let token: Vec<char> = token.chars().collect();
        if position + token.len() > chars.len() {
            return false;
        }
        // word boundary on both sides
        if position > 0 && is_word_char(chars[position - 1]) {
            return false;
        }
        if let Some(next) = chars.get(position + token.len()) {
            if is_word_char(*next) {
                return false;
            }
        }
        token.iter().enumerate().all(|(i, ch)| chars[position + i].to_ascii_uppercase() == *ch)
    }

    fn symbol_matches(chars: &[char], position: usize, token: &str) -> bool {
        let token: Vec<char> = token.chars().collect();
        if position + token.len() > chars.len() {
            return false;
        }
        token.iter().enumerate().all(|(i, ch)| chars[position + i] == *ch)
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
