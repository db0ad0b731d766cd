use std::fmt;

use crate::parser::{ParseError, ast::{Literal, Operator}};

/// Connector attached to a condition; it joins that condition to the one
/// that follows it. The last condition's connector is never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

/// One `field <operator> value` condition from a WHERE or HAVING clause.
/// Conditions never nest; backends fold the list left-to-right with no
/// precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Literal,
    pub connector: Connector,
}

impl Condition {
    /// Parses a whole WHERE/HAVING body into an ordered condition list.
    /// A fragment without a recognized operator fails the parse.
    pub fn parse_list(body: &str) -> Result<Vec<Condition>, ParseError> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(vec![]);
        }

        let fragments = split_connectors(body);
        let mut conditions: Vec<Condition> = Vec::with_capacity(fragments.len());

        for (fragment, connector) in fragments {
            let mut condition = Condition::parse_single(&fragment)?;
            condition.connector = connector;
            conditions.push(condition);
        }

        Ok(conditions)
    }

    /// Parses one `field <operator> value` fragment, scanning the operator
    /// lexicon longest-match-first.
    pub fn parse_single(fragment: &str) -> Result<Condition, ParseError> {
        let chars: Vec<char> = fragment.chars().collect();

        let Some((start, operator, end)) = Operator::scan(&chars) else {
            return ParseError::MalformedCondition { fragment: fragment.to_string() }.err();
        };

        let field: String = chars[..start].iter().collect::<String>().trim().to_string();
        let value_text: String = chars[end..].iter().collect::<String>().trim().to_string();

        if field.is_empty() || value_text.is_empty() {
            return ParseError::MalformedCondition { fragment: fragment.to_string() }.err();
        }

        let value = if operator.expects_list() {
            match Literal::parse_value(&value_text) {
                list @ Literal::List(_) => list,
                // a bare comma-separated membership list is accepted too
                _ => Literal::parse_value(&format!("({})", value_text)),
            }
        } else {
            Literal::parse_value(&value_text)
        };

        Ok(Condition {
            field,
            operator,
            value,
            connector: Connector::And,
        })
    }
}

/// Splits on ` AND ` / ` OR ` (case-insensitive, whole-word) outside quotes
/// and brackets, pairing each fragment with the connector that follows it.
fn split_connectors(body: &str) -> Vec<(String, Connector)> {
    let chars: Vec<char> = body.chars().collect();
    let mut fragments: Vec<(String, Connector)> = vec![];
    let mut pivot = 0;
    let mut position = 0;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    while position < chars.len() {
        let current = chars[position];

        if let Some(open) = quote {
            if current == open {
                quote = None;
            }
            position += 1;
            continue;
        }

        match current {
            '\'' | '"' => {
                quote = Some(current);
                position += 1;
                continue;
            }
            '(' | '[' => {
                depth += 1;
                position += 1;
                continue;
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                position += 1;
                continue;
            }
            _ => {}
        }

        if depth == 0 {
            if let Some(width) = connector_at(&chars, position, "AND") {
                let fragment: String = chars[pivot..position].iter().collect();
                fragments.push((fragment.trim().to_string(), Connector::And));
                position += width;
                pivot = position;
                continue;
            }
            if let Some(width) = connector_at(&chars, position, "OR") {
                let fragment: String = chars[pivot..position].iter().collect();
                fragments.push((fragment.trim().to_string(), Connector::Or));
                position += width;
                pivot = position;
                continue;
            }
        }

        position += 1;
    }

    let last: String = chars[pivot..].iter().collect();
    fragments.push((last.trim().to_string(), Connector::And));
    fragments
}

/// Matches a whole-word connector at `position`; both sides must be word
/// boundaries. Returns the token width on match.
fn connector_at(chars: &[char], position: usize, word: &str) -> Option<usize> {
    let word: Vec<char> = word.chars().collect();
    if position + word.len() > chars.len() {
        return None;
    }
    if position > 0 && is_word_char(chars[position - 1]) {
        return None;
    }
    if let Some(next) = chars.get(position + word.len()) {
        if is_word_char(*next) {
            return None;
        }
    }
    let matches = word
        .iter()
        .enumerate()
        .all(|(i, ch)| chars[position + i].to_ascii_uppercase() == *ch);
    if matches { Some(word.len()) } else { None }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
