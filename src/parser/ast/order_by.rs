use std::fmt;

use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Parses an ORDER BY body: comma-separated `field [ASC|DESC]` entries.
    pub fn parse_list(body: &str) -> Result<Vec<OrderBy>, ParseError> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(vec![]);
        }

        let mut orders: Vec<OrderBy> = vec![];
        for entry in body.split(',') {
            let mut words = entry.split_whitespace();
            let Some(field) = words.next() else {
                return ParseError::UnknownClause { found: entry.trim().to_string() }.err();
            };

            let direction = match words.next() {
                None => Direction::Asc,
                Some(word) if word.eq_ignore_ascii_case("ASC") => Direction::Asc,
                Some(word) if word.eq_ignore_ascii_case("DESC") => Direction::Desc,
                Some(word) => {
                    return ParseError::UnknownClause { found: word.to_string() }.err();
                }
            };

            orders.push(OrderBy { field: field.to_string(), direction });
        }

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::{Direction, OrderBy};

    #[test]
    pub fn test_parse_single_default_asc() {
        let orders = OrderBy::parse_list("age").unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].field, "age");
        assert_eq!(orders[0].direction, Direction::Asc);
    }

    #[test]
    pub fn test_parse_multiple_with_directions() {
        let orders = OrderBy::parse_list("age DESC, name asc, id").unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].direction, Direction::Desc);
        assert_eq!(orders[1].direction, Direction::Asc);
        assert_eq!(orders[2].field, "id");
    }

    #[test]
    pub fn test_parse_invalid_direction_fails() {
        assert!(OrderBy::parse_list("age SIDEWAYS").is_err());
    }
}
