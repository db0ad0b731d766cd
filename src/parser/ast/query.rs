use std::fmt;

use tracing::debug;

use crate::parser::{ParseError, QueryParser};
use crate::parser::ast::{Aggregate, Condition, DbSpecific, Join, JoinType, OrderBy};

/// The only operation the DSL currently supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Find,
}

/// Primary target identifier, with one optional dot-qualifier kept verbatim
/// (`schema.table`, `database.collection`, `alias.index`). The parser never
/// interprets the qualifier; each generator reads the part it cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub namespace: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn parse(token: &str) -> TableRef {
        match token.split_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => TableRef {
                namespace: Some(namespace.to_string()),
                name: name.to_string(),
            },
            _ => TableRef { namespace: None, name: token.to_string() },
        }
    }

    /// `namespace.name`, or just `name` when unqualified.
    pub fn qualified(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

/// The backend-agnostic AST. Produced once per parse, never mutated;
/// every generator receives it by read-only reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniversalQuery {
    pub operation: Operation,
    pub table: TableRef,
    pub fields: Vec<String>,
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub aggregates: Vec<Aggregate>,
    pub group_by: Vec<String>,
    pub having: Vec<Condition>,
    pub joins: Vec<Join>,
    pub db_specific: DbSpecific,
}

impl Default for TableRef {
    fn default() -> Self {
        TableRef { namespace: None, name: String::new() }
    }
}

impl UniversalQuery {
    /// Parses one DSL source string. All-or-nothing: any error aborts with
    /// no partial query.
    pub fn parse(source: &str) -> Result<UniversalQuery, ParseError> {
        let mut parser = QueryParser::new(source);
        let comparers = parser.comparers;

        parser.next_non_whitespace();
        if parser.eof() || !comparers.find.compare(&parser) {
            let found = parser.take_word();
            return ParseError::UnknownClause { found }.err();
        }
        parser.jump(comparers.find.length);

        let table_token = parser.take_word();
        if table_token.is_empty() {
            return ParseError::UnknownClause { found: "FIND".to_string() }.err();
        }

        let mut query = UniversalQuery {
            table: TableRef::parse(&table_token),
            ..Default::default()
        };

        loop {
            parser.next_non_whitespace();
            if parser.eof() {
                break;
            }

            if let Some(join_type) = JoinType::check(&mut parser) {
                let body = parser.take_clause_body();
                query.joins.push(Join::parse_body(join_type, &body)?);
                continue;
            }

            if comparers.fields.compare(&parser) {
                parser.jump(comparers.fields.length);
                let body = parser.take_clause_body();
                query.fields = split_names(&body);
                continue;
            }

            if comparers.r#where.compare(&parser) {
                parser.jump(comparers.r#where.length);
                let body = parser.take_clause_body();
                query.conditions = Condition::parse_list(&body)?;
                continue;
            }

            if comparers.group_by.compare(&parser) {
                parser.jump(comparers.group_by.length);
                let body = parser.take_clause_body();
                query.group_by = split_names(&body);
                continue;
            }

            if comparers.having.compare(&parser) {
                parser.jump(comparers.having.length);
                let body = parser.take_clause_body();
                query.having = Condition::parse_list(&body)?;
                continue;
            }

            if comparers.order_by.compare(&parser) {
                parser.jump(comparers.order_by.length);
                let body = parser.take_clause_body();
                query.order_by = OrderBy::parse_list(&body)?;
                continue;
            }

            if comparers.limit.compare(&parser) {
                parser.jump(comparers.limit.length);
                let body = parser.take_clause_body();
                query.limit = Some(parse_count(&body)?);
                continue;
            }

            if comparers.offset.compare(&parser) {
                parser.jump(comparers.offset.length);
                let body = parser.take_clause_body();
                query.offset = Some(parse_count(&body)?);
                continue;
            }

            if comparers.aggregate.compare(&parser) {
                parser.jump(comparers.aggregate.length);
                let body = parser.take_clause_body();
                query.aggregates = Aggregate::parse_list(&body)?;
                continue;
            }

            if comparers.db_specific.compare(&parser) {
                parser.jump(comparers.db_specific.length);
                if parser.current() == ':' {
                    parser.next();
                }
                let body = parser.take_clause_body();
                query.db_specific.apply_body(&body)?;
                continue;
            }

            let found = parser.take_word();
            return ParseError::UnknownClause { found }.err();
        }

        debug!(
            table = %query.table,
            conditions = query.conditions.len(),
            joins = query.joins.len(),
            "parsed query"
        );

        Ok(query)
    }
}

/// The sole ingestion point: DSL text in, `UniversalQuery` out.
pub fn parse(source: &str) -> Result<UniversalQuery, ParseError> {
    UniversalQuery::parse(source)
}

fn split_names(body: &str) -> Vec<String> {
    body.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn parse_count(body: &str) -> Result<u64, ParseError> {
    body.trim()
        .parse::<u64>()
        .map_err(|_| ParseError::MalformedLimit { value: body.trim().to_string() })
}
