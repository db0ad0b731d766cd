use std::fmt;

use crate::parser::ParseError;

/// Closed aggregate function set; every backend maps all five.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<AggregateFunction> {
        match name.trim().to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn lower(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// One `AGGREGATE` entry. Accepted forms: `alias: FUNC(field)`,
/// `FUNC(field) AS alias` and bare `FUNC(field)` (alias derived as
/// `func_field`).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub field: String,
    pub alias: String,
}

impl Aggregate {
    pub fn parse_list(body: &str) -> Result<Vec<Aggregate>, ParseError> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(vec![]);
        }

        split_entries(body)
            .iter()
            .map(|entry| Aggregate::parse_entry(entry))
            .collect()
    }

    pub fn parse_entry(entry: &str) -> Result<Aggregate, ParseError> {
        let entry = entry.trim();

        let malformed = || ParseError::MalformedAggregate { fragment: entry.to_string() };

        // leading `alias:` form
        let (alias_prefix, call) = match entry.split_once(':') {
            Some((alias, rest)) if !alias.contains('(') && !alias.trim().is_empty() => {
                (Some(alias.trim().to_string()), rest.trim().to_string())
            }
            _ => (None, entry.to_string()),
        };

        // trailing `AS alias` form
        let (call, alias_suffix) = match split_as(&call) {
            Some((call, alias)) => (call, Some(alias)),
            None => (call, None),
        };

        let open = call.find('(').ok_or_else(malformed)?;
        if !call.trim_end().ends_with(')') {
            return Err(malformed());
        }
        let close = call.rfind(')').ok_or_else(malformed)?;
        if close <= open {
            return Err(malformed());
        }

        let function = AggregateFunction::parse(&call[..open]).ok_or_else(malformed)?;
        let field = call[open + 1..close].trim().to_string();
        if field.is_empty() {
            return Err(malformed());
        }

        let alias = alias_prefix
            .or(alias_suffix)
            .unwrap_or_else(|| format!("{}_{}", function.lower(), field.replace('*', "all")));

        Ok(Aggregate { function, field, alias })
    }
}

/// Splits an AGGREGATE body on commas outside parentheses.
fn split_entries(body: &str) -> Vec<String> {
    let mut entries: Vec<String> = vec![];
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                entries.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    let last = current.trim().to_string();
    if !last.is_empty() {
        entries.push(last);
    }

    entries
}

/// Splits `FUNC(field) AS alias` at the whole-word `AS`.
fn split_as(entry: &str) -> Option<(String, String)> {
    let chars: Vec<char> = entry.chars().collect();
    let mut index = 0;

    while index + 2 <= chars.len() {
        let boundary_before = index == 0 || chars[index - 1].is_whitespace();
        let boundary_after = chars
            .get(index + 2)
            .map(|ch| ch.is_whitespace())
            .unwrap_or(false);
        if boundary_before
            && boundary_after
            && chars[index].to_ascii_uppercase() == 'A'
            && chars[index + 1].to_ascii_uppercase() == 'S'
        {
            let call: String = chars[..index].iter().collect();
            let alias: String = chars[index + 3..].iter().collect();
            let alias = alias.trim().to_string();
            if !alias.is_empty() {
                return Some((call.trim().to_string(), alias));
            }
        }
        index += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::parser::ParseError;
    use crate::parser::ast::{Aggregate, AggregateFunction};

    #[test]
    pub fn test_parse_colon_form() {
        let entries = Aggregate::parse_list("order_count: COUNT(id), total: SUM(amount)").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].function, AggregateFunction::Count);
        assert_eq!(entries[0].field, "id");
        assert_eq!(entries[0].alias, "order_count");
        assert_eq!(entries[1].function, AggregateFunction::Sum);
        assert_eq!(entries[1].alias, "total");
    }

    #[test]
    pub fn test_parse_as_form() {
        let entries = Aggregate::parse_list("COUNT(id) AS order_count").unwrap();

        assert_eq!(entries[0].alias, "order_count");
        assert_eq!(entries[0].field, "id");
    }

    #[test]
    pub fn test_parse_non_ascii_field() {
        let entries = Aggregate::parse_list("SUM(preço) AS total").unwrap();

        assert_eq!(entries[0].function, AggregateFunction::Sum);
        assert_eq!(entries[0].field, "preço");
        assert_eq!(entries[0].alias, "total");
    }

    #[test]
    pub fn test_parse_bare_form_derives_alias() {
        let entries = Aggregate::parse_list("AVG(price)").unwrap();

        assert_eq!(entries[0].alias, "avg_price");
    }

    #[test]
    pub fn test_parse_count_star() {
        let entries = Aggregate::parse_list("COUNT(*)").unwrap();

        assert_eq!(entries[0].field, "*");
        assert_eq!(entries[0].alias, "count_all");
    }

    #[test]
    pub fn test_unknown_function_fails() {
        let result = Aggregate::parse_list("MEDIAN(price)");

        assert_eq!(
            result,
            ParseError::MalformedAggregate { fragment: "MEDIAN(price)".into() }.err()
        );
    }

    #[test]
    pub fn test_missing_parentheses_fails() {
        let result = Aggregate::parse_list("count_id: COUNT id");

        assert!(matches!(result, Err(ParseError::MalformedAggregate { .. })));
    }
}
