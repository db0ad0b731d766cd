use std::fmt;

use crate::parser::{ParseError, QueryParser, ast::Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL OUTER JOIN"),
        }
    }
}

impl JoinType {
    /// Consumes an optional `INNER|LEFT|RIGHT|FULL [OUTER]` prefix plus the
    /// `JOIN` keyword at the scanner position. `None` means the position
    /// does not start a join clause.
    pub fn check(parser: &mut QueryParser) -> Option<JoinType> {
        let comparers = parser.comparers;

        if comparers.inner_join.compare(parser) {
            parser.jump(comparers.inner_join.length);
            return Some(JoinType::Inner);
        }
        if comparers.left_outer_join.compare(parser) {
            parser.jump(comparers.left_outer_join.length);
            return Some(JoinType::Left);
        }
        if comparers.left_join.compare(parser) {
            parser.jump(comparers.left_join.length);
            return Some(JoinType::Left);
        }
        if comparers.right_outer_join.compare(parser) {
            parser.jump(comparers.right_outer_join.length);
            return Some(JoinType::Right);
        }
        if comparers.right_join.compare(parser) {
            parser.jump(comparers.right_join.length);
            return Some(JoinType::Right);
        }
        if comparers.full_outer_join.compare(parser) {
            parser.jump(comparers.full_outer_join.length);
            return Some(JoinType::Full);
        }
        if comparers.full_join.compare(parser) {
            parser.jump(comparers.full_join.length);
            return Some(JoinType::Full);
        }
        if comparers.join.compare(parser) {
            parser.jump(comparers.join.length);
            return Some(JoinType::Inner);
        }

        None
    }
}

/// The `ON left <op> right` constraint of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left: String,
    pub operator: Operator,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub on: JoinOn,
}

impl Join {
    /// Parses a join clause body: `table [AS alias] ON left <op> right`.
    /// The join keyword itself was already consumed by `JoinType::check`.
    pub fn parse_body(join_type: JoinType, body: &str) -> Result<Join, ParseError> {
        let Some((target, constraint)) = split_on(body) else {
            return ParseError::MalformedJoin { fragment: body.to_string() }.err();
        };

        let mut words = target.split_whitespace();
        let Some(table) = words.next() else {
            return ParseError::MalformedJoin { fragment: body.to_string() }.err();
        };

        let alias = match (words.next(), words.next()) {
            (None, _) => None,
            (Some(word), None) if !word.eq_ignore_ascii_case("AS") => Some(word.to_string()),
            (Some(word), Some(alias)) if word.eq_ignore_ascii_case("AS") => Some(alias.to_string()),
            _ => return ParseError::MalformedJoin { fragment: body.to_string() }.err(),
        };

        let chars: Vec<char> = constraint.chars().collect();
        let Some((start, operator, end)) = Operator::scan(&chars) else {
            return ParseError::MalformedJoin { fragment: body.to_string() }.err();
        };

        let left: String = chars[..start].iter().collect::<String>().trim().to_string();
        let right: String = chars[end..].iter().collect::<String>().trim().to_string();
        if left.is_empty() || right.is_empty() {
            return ParseError::MalformedJoin { fragment: body.to_string() }.err();
        }

        Ok(Join {
            join_type,
            table: table.to_string(),
            alias,
            on: JoinOn { left, operator, right },
        })
    }
}

/// Splits a join body at the whole-word `ON` keyword.
fn split_on(body: &str) -> Option<(String, String)> {
    let chars: Vec<char> = body.chars().collect();
    let mut position = 0;

    while position + 2 <= chars.len() {
        let boundary_before = position == 0 || chars[position - 1].is_whitespace();
        let boundary_after = chars
            .get(position + 2)
            .map(|ch| ch.is_whitespace())
            .unwrap_or(false);
        if boundary_before
            && boundary_after
            && chars[position].to_ascii_uppercase() == 'O'
            && chars[position + 1].to_ascii_uppercase() == 'N'
        {
            let left: String = chars[..position].iter().collect();
            let right: String = chars[position + 2..].iter().collect();
            return Some((left.trim().to_string(), right.trim().to_string()));
        }
        position += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::parser::ParseError;
    use crate::parser::ast::{Join, JoinType, Operator};

    #[test]
    pub fn test_parse_simple_join() {
        let join =
            Join::parse_body(JoinType::Left, "orders ON users.id = orders.user_id").unwrap();

        assert_eq!(join.table, "orders");
        assert_eq!(join.alias, None);
        assert_eq!(join.on.left, "users.id");
        assert_eq!(join.on.operator, Operator::Eq);
        assert_eq!(join.on.right, "orders.user_id");
    }

    #[test]
    pub fn test_parse_join_with_alias() {
        let join =
            Join::parse_body(JoinType::Inner, "orders AS o ON users.id = o.user_id").unwrap();

        assert_eq!(join.alias, Some("o".into()));
    }

    #[test]
    pub fn test_parse_join_with_bare_alias() {
        let join = Join::parse_body(JoinType::Inner, "orders o ON users.id = o.user_id").unwrap();

        assert_eq!(join.alias, Some("o".into()));
    }

    #[test]
    pub fn test_join_without_on_fails() {
        let result = Join::parse_body(JoinType::Inner, "orders");

        assert_eq!(result, ParseError::MalformedJoin { fragment: "orders".into() }.err());
    }

    #[test]
    pub fn test_join_with_unparseable_constraint_fails() {
        let result = Join::parse_body(JoinType::Inner, "orders ON users.id orders.user_id");

        assert!(matches!(result, Err(ParseError::MalformedJoin { .. })));
    }
}
