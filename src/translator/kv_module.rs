use std::fmt::Display;

use serde::Serialize;
use tracing::debug;

use crate::parser::UniversalQuery;
use crate::parser::ast::{
    Condition, Connector, JoinType, Literal, ModuleDataType, ModuleOperation, Operator,
};
use crate::translator::{Backend, TranslateError};

const DEFAULT_SCAN_COUNT: u64 = 100;

/// One module-family command, tagged by command kind. `Display` renders
/// the wire command text an execution adapter would send verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ModuleQuery {
    Get { key: String },
    MGet { keys: Vec<String> },
    Scan { pattern: String, count: u64 },
    FtSearch { index: String, query: String, offset: u64, limit: u64 },
    HGetAll { key: String },
    SMembers { key: String },
    ZRangeByScore { key: String, min: String, max: String },
    LRange { key: String, start: i64, stop: i64 },
    XRange { key: String, count: Option<u64> },
    XReadGroup { group: String, consumer: String, stream: String, count: Option<u64> },
    GeoRadius { key: String, longitude: f64, latitude: f64, radius: f64, unit: String },
    PfCount { keys: Vec<String> },
    Subscribe { channel: String },
    PSubscribe { pattern: String },
    Graph { name: String, query: String },
}

impl Display for ModuleQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleQuery::Get { key } => write!(f, "GET {}", key),
            ModuleQuery::MGet { keys } => write!(f, "MGET {}", keys.join(" ")),
            ModuleQuery::Scan { pattern, count } => {
                write!(f, "SCAN 0 MATCH {} COUNT {}", pattern, count)
            }
            ModuleQuery::FtSearch { index, query, offset, limit } => {
                write!(f, "FT.SEARCH {} \"{}\" LIMIT {} {}", index, query, offset, limit)
            }
            ModuleQuery::HGetAll { key } => write!(f, "HGETALL {}", key),
            ModuleQuery::SMembers { key } => write!(f, "SMEMBERS {}", key),
            ModuleQuery::ZRangeByScore { key, min, max } => {
                write!(f, "ZRANGEBYSCORE {} {} {}", key, min, max)
            }
            ModuleQuery::LRange { key, start, stop } => {
                write!(f, "LRANGE {} {} {}", key, start, stop)
            }
            ModuleQuery::XRange { key, count } => {
                write!(f, "XRANGE {} - +", key)?;
                if let Some(count) = count {
                    write!(f, " COUNT {}", count)?;
                }
                Ok(())
            }
            ModuleQuery::XReadGroup { group, consumer, stream, count } => {
                write!(f, "XREADGROUP GROUP {} {}", group, consumer)?;
                if let Some(count) = count {
                    write!(f, " COUNT {}", count)?;
                }
                write!(f, " STREAMS {} >", stream)
            }
            ModuleQuery::GeoRadius { key, longitude, latitude, radius, unit } => {
                write!(f, "GEORADIUS {} {} {} {} {}", key, longitude, latitude, radius, unit)
            }
            ModuleQuery::PfCount { keys } => write!(f, "PFCOUNT {}", keys.join(" ")),
            ModuleQuery::Subscribe { channel } => write!(f, "SUBSCRIBE {}", channel),
            ModuleQuery::PSubscribe { pattern } => write!(f, "PSUBSCRIBE {}", pattern),
            ModuleQuery::Graph { name, query } => {
                write!(f, "GRAPH.QUERY {} \"{}\"", name, query)
            }
        }
    }
}

/// Command selection, in precedence order: explicit `operation` hint,
/// `data_type` hint, `search_index` hint, batch lookup, point lookup,
/// prefix scan.
pub fn translate_kv_module(query: &UniversalQuery) -> Result<ModuleQuery, TranslateError> {
    let module = &query.db_specific.module;
    let key_field = module.key_field.as_deref().unwrap_or("id");

    if let Some(operation) = module.operation {
        let Some(channel) = module.channel.clone() else {
            return TranslateError::MissingRequiredHint {
                hint: "channel",
                backend: Backend::KvModule,
            }
            .err();
        };
        debug!(?operation, "module command: pub/sub");
        return Ok(match operation {
            ModuleOperation::Subscribe => ModuleQuery::Subscribe { channel },
            ModuleOperation::PSubscribe => ModuleQuery::PSubscribe { pattern: channel },
        });
    }

    if let Some(data_type) = module.data_type {
        debug!(?data_type, "module command: data-structure");
        return structure_command(query, data_type, key_field);
    }

    if let Some(index) = &module.search_index {
        debug!(index = %index, "module command: structured search");
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(10);
        return Ok(ModuleQuery::FtSearch {
            index: index.clone(),
            query: search_syntax(&query.conditions),
            offset,
            limit,
        });
    }

    if let Some(condition) = key_condition(&query.conditions, key_field, Operator::In) {
        reject_residual(&query.conditions, Some(condition))?;
        let items = match &condition.value {
            Literal::List(items) => items.clone(),
            other => vec![other.clone()],
        };
        let keys = items
            .iter()
            .map(|item| format!("{}:{}", query.table.name, item.as_plain()))
            .collect();
        debug!("module command: batch lookup");
        return Ok(ModuleQuery::MGet { keys });
    }

    if let Some(condition) = key_condition(&query.conditions, key_field, Operator::Eq) {
        reject_residual(&query.conditions, Some(condition))?;
        debug!("module command: point lookup");
        return Ok(ModuleQuery::Get {
            key: format!("{}:{}", query.table.name, condition.value.as_plain()),
        });
    }

    reject_residual(&query.conditions, None)?;
    debug!("module command: prefix scan");
    Ok(ModuleQuery::Scan {
        pattern: module
            .pattern
            .clone()
            .unwrap_or_else(|| format!("{}:*", query.table.name)),
        count: scan_count(query),
    })
}

fn structure_command(
    query: &UniversalQuery,
    data_type: ModuleDataType,
    key_field: &str,
) -> Result<ModuleQuery, TranslateError> {
    let module = &query.db_specific.module;
    let key = structure_key(query, key_field);

    match data_type {
        ModuleDataType::Hash => Ok(ModuleQuery::HGetAll { key }),
        ModuleDataType::Set => Ok(ModuleQuery::SMembers { key }),
        ModuleDataType::SortedSet => {
            let (min, max) = score_range(&query.conditions);
            if min.is_none() && max.is_none() {
                return TranslateError::MissingRequiredHint {
                    hint: "min/max",
                    backend: Backend::KvModule,
                }
                .err();
            }
            Ok(ModuleQuery::ZRangeByScore {
                key,
                min: min.unwrap_or_else(|| "-inf".to_string()),
                max: max.unwrap_or_else(|| "+inf".to_string()),
            })
        }
        ModuleDataType::List => {
            let start = query.offset.unwrap_or(0) as i64;
            let stop = match query.limit {
                Some(limit) => start + limit as i64 - 1,
                None => -1,
            };
            Ok(ModuleQuery::LRange { key, start, stop })
        }
        ModuleDataType::Stream => {
            if let Some(group) = module.group.clone() {
                let Some(consumer) = module.consumer.clone() else {
                    return TranslateError::MissingRequiredHint {
                        hint: "consumer",
                        backend: Backend::KvModule,
                    }
                    .err();
                };
                return Ok(ModuleQuery::XReadGroup {
                    group,
                    consumer,
                    stream: key,
                    count: query.limit,
                });
            }
            Ok(ModuleQuery::XRange { key, count: query.limit })
        }
        ModuleDataType::Geo => {
            let longitude = require_coordinate(module.longitude, "longitude")?;
            let latitude = require_coordinate(module.latitude, "latitude")?;
            let radius = require_coordinate(module.radius, "radius")?;
            Ok(ModuleQuery::GeoRadius {
                key,
                longitude,
                latitude,
                radius,
                unit: module.unit.clone().unwrap_or_else(|| "m".to_string()),
            })
        }
        ModuleDataType::HyperLogLog => Ok(ModuleQuery::PfCount { keys: vec![key] }),
        ModuleDataType::Graph => Ok(ModuleQuery::Graph {
            name: query.table.name.clone(),
            query: cypher(query),
        }),
    }
}

fn require_coordinate(
    value: Option<f64>,
    hint: &'static str,
) -> Result<f64, TranslateError> {
    value.ok_or(TranslateError::MissingRequiredHint { hint, backend: Backend::KvModule })
}

/// The structure key: `table:id` when an id equality is present, otherwise
/// the bare table name.
fn structure_key(query: &UniversalQuery, key_field: &str) -> String {
    match key_condition(&query.conditions, key_field, Operator::Eq) {
        Some(condition) => format!("{}:{}", query.table.name, condition.value.as_plain()),
        None => query.table.name.clone(),
    }
}

fn key_condition<'a>(
    conditions: &'a [Condition],
    key_field: &str,
    operator: Operator,
) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|condition| condition.field == key_field && condition.operator == operator)
}

/// Plain GET/MGET/SCAN commands carry no filter clause, so any condition
/// beyond the consumed key condition is unexpressible.
fn reject_residual(
    conditions: &[Condition],
    consumed: Option<&Condition>,
) -> Result<(), TranslateError> {
    for condition in conditions {
        if consumed.is_some_and(|key| std::ptr::eq(key, condition)) {
            continue;
        }
        return TranslateError::UnsupportedOperator {
            operator: condition.operator,
            backend: Backend::KvModule,
        }
        .err();
    }
    Ok(())
}

fn scan_count(query: &UniversalQuery) -> u64 {
    query
        .db_specific
        .module
        .count
        .or(query.limit)
        .unwrap_or(DEFAULT_SCAN_COUNT)
}

/// ZRANGEBYSCORE bounds from range conditions, exclusive bounds prefixed
/// with `(`.
fn score_range(conditions: &[Condition]) -> (Option<String>, Option<String>) {
    let mut min = None;
    let mut max = None;
    for condition in conditions {
        let value = condition.value.as_plain();
        match condition.operator {
            Operator::Gt => min = Some(format!("({}", value)),
            Operator::GtEq => min = Some(value),
            Operator::Lt => max = Some(format!("({}", value)),
            Operator::LtEq => max = Some(value),
            _ => {}
        }
    }
    (min, max)
}

/// Folds conditions into module search syntax: `@field:[lo hi]` ranges,
/// `@field:{a|b}` membership, quoted phrases for text equality, `*`
/// suffix for prefix matches, `-` prefix for negation.
fn search_syntax(conditions: &[Condition]) -> String {
    if conditions.is_empty() {
        return "*".to_string();
    }

    let mut out = String::new();
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            let connector = &conditions[index - 1].connector;
            out.push_str(if *connector == Connector::Or { " | " } else { " " });
        }
        out.push_str(&search_term(condition));
    }
    out
}

fn search_term(condition: &Condition) -> String {
    let field = &condition.field;
    match condition.operator {
        Operator::Eq => match &condition.value {
            Literal::Str(text) => format!("@{}:\"{}\"", field, text),
            other => {
                let value = other.as_plain();
                format!("@{}:[{} {}]", field, value, value)
            }
        },
        Operator::NotEq => format!("-@{}:\"{}\"", field, condition.value.as_plain()),
        Operator::Gt => format!("@{}:[({} +inf]", field, condition.value.as_plain()),
        Operator::GtEq => format!("@{}:[{} +inf]", field, condition.value.as_plain()),
        Operator::Lt => format!("@{}:[-inf ({}]", field, condition.value.as_plain()),
        Operator::LtEq => format!("@{}:[-inf {}]", field, condition.value.as_plain()),
        Operator::In | Operator::NotIn => {
            let items = match &condition.value {
                Literal::List(items) => items.clone(),
                other => vec![other.clone()],
            };
            let joined = items
                .iter()
                .map(Literal::as_plain)
                .collect::<Vec<String>>()
                .join("|");
            let sign = if condition.operator == Operator::NotIn { "-" } else { "" };
            format!("{}@{}:{{{}}}", sign, field, joined)
        }
        Operator::Like | Operator::ILike => {
            let pattern = condition.value.as_plain();
            if pattern.ends_with('%') {
                format!("@{}:{}*", field, pattern.trim_matches('%'))
            } else {
                format!("@{}:{}", field, pattern.trim_matches('%'))
            }
        }
    }
}

/// Cypher rendering for the graph module: the main table binds as a node,
/// inner joins become `MATCH`, outer joins `OPTIONAL MATCH`, conditions go
/// under `WHERE` and aggregates/fields under `RETURN ... AS alias`.
fn cypher(query: &UniversalQuery) -> String {
    let root = &query.table.name;
    let mut parts = vec![format!("MATCH ({}:{})", root, root)];

    let mut constraints: Vec<String> = Vec::new();
    for join in &query.joins {
        let node = join.alias.as_deref().unwrap_or(&join.table);
        parts.push(format!("{} ({}:{})", cypher_match(join.join_type), node, join.table));
        constraints.push(format!(
            "{} {} {}",
            qualify(&join.on.left, root),
            join.on.operator,
            qualify(&join.on.right, root)
        ));
    }

    if !query.conditions.is_empty() {
        let mut folded = String::new();
        for (index, condition) in query.conditions.iter().enumerate() {
            if index > 0 {
                let connector = &query.conditions[index - 1].connector;
                folded.push_str(if *connector == Connector::Or { " OR " } else { " AND " });
            }
            folded.push_str(&cypher_condition(condition, root));
        }
        constraints.push(folded);
    }
    if !constraints.is_empty() {
        parts.push(format!("WHERE {}", constraints.join(" AND ")));
    }

    let mut returns: Vec<String> = Vec::new();
    for aggregate in &query.aggregates {
        let target = if aggregate.field == "*" {
            root.clone()
        } else {
            qualify(&aggregate.field, root)
        };
        returns.push(format!("{}({}) AS {}", aggregate.function.lower(), target, aggregate.alias));
    }
    if returns.is_empty() {
        if query.fields.is_empty() {
            returns.push(root.clone());
        } else {
            for field in &query.fields {
                returns.push(qualify(field, root));
            }
        }
    }
    parts.push(format!("RETURN {}", returns.join(", ")));

    if !query.order_by.is_empty() {
        let order: Vec<String> = query
            .order_by
            .iter()
            .map(|entry| format!("{} {}", qualify(&entry.field, root), entry.direction))
            .collect();
        parts.push(format!("ORDER BY {}", order.join(", ")));
    }
    if let Some(offset) = query.offset {
        parts.push(format!("SKIP {}", offset));
    }
    if let Some(limit) = query.limit {
        parts.push(format!("LIMIT {}", limit));
    }

    parts.join(" ")
}

fn cypher_match(join_type: JoinType) -> &'static str {
    match join_type {
        JoinType::Inner | JoinType::Right => "MATCH",
        JoinType::Left | JoinType::Full => "OPTIONAL MATCH",
    }
}

fn qualify(field: &str, root: &str) -> String {
    if field.contains('.') {
        field.to_string()
    } else {
        format!("{}.{}", root, field)
    }
}

fn cypher_condition(condition: &Condition, root: &str) -> String {
    let field = qualify(&condition.field, root);
    match condition.operator {
        Operator::Eq => format!("{} = {}", field, cypher_literal(&condition.value)),
        Operator::NotEq => format!("{} <> {}", field, cypher_literal(&condition.value)),
        Operator::Gt | Operator::Lt | Operator::GtEq | Operator::LtEq => format!(
            "{} {} {}",
            field,
            condition.operator,
            cypher_literal(&condition.value)
        ),
        Operator::In => format!("{} IN {}", field, cypher_literal(&condition.value)),
        Operator::NotIn => format!("NOT {} IN {}", field, cypher_literal(&condition.value)),
        Operator::Like | Operator::ILike => {
            let pattern = condition.value.as_plain();
            let flag = if condition.operator == Operator::ILike { "(?i)" } else { "" };
            let regex = pattern
                .split('%')
                .map(regex::escape)
                .collect::<Vec<String>>()
                .join(".*");
            format!("{} =~ '{}{}'", field, flag, regex)
        }
    }
}

fn cypher_literal(value: &Literal) -> String {
    match value {
        Literal::Str(text) => format!("'{}'", text.replace('\'', "\\'")),
        Literal::Int(number) => number.to_string(),
        Literal::Float(number) => number.to_string(),
        Literal::Bool(flag) => flag.to_string(),
        Literal::List(items) => {
            let rendered: Vec<String> = items.iter().map(cypher_literal).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;
    use crate::translator::{ModuleQuery, TranslateError, translate_kv_module};

    #[test]
    pub fn test_key_equality_becomes_get() {
        let query = parse("FIND sessions WHERE id = 'abc'").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command, ModuleQuery::Get { key: "sessions:abc".into() });
        assert_eq!(command.to_string(), "GET sessions:abc");
    }

    #[test]
    pub fn test_in_on_key_becomes_mget() {
        let query = parse("FIND sessions WHERE id IN ('a', 'b')").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(
            command,
            ModuleQuery::MGet { keys: vec!["sessions:a".into(), "sessions:b".into()] }
        );
        assert_eq!(command.to_string(), "MGET sessions:a sessions:b");
    }

    #[test]
    pub fn test_key_field_hint_overrides_id() {
        let query = parse(
            "FIND sessions WHERE token = 't1' DB_SPECIFIC: key_field=\"token\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command, ModuleQuery::Get { key: "sessions:t1".into() });
    }

    #[test]
    pub fn test_no_conditions_becomes_scan() {
        let query = parse("FIND sessions LIMIT 25").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "SCAN 0 MATCH sessions:* COUNT 25");
    }

    #[test]
    pub fn test_count_hint_beats_limit() {
        let query = parse("FIND sessions LIMIT 25 DB_SPECIFIC: count=500").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "SCAN 0 MATCH sessions:* COUNT 500");
    }

    #[test]
    pub fn test_residual_condition_is_unsupported() {
        let query = parse("FIND sessions WHERE id = 'abc' AND status = 'open'").unwrap();

        let result = translate_kv_module(&query);

        assert!(matches!(result, Err(TranslateError::UnsupportedOperator { .. })));
    }

    #[test]
    pub fn test_search_index_builds_ft_query() {
        let query = parse(
            "FIND products WHERE price >= 10 AND price <= 100 AND tag IN ('a', 'b') \
             AND name LIKE 'wid%' LIMIT 20 \
             DB_SPECIFIC: search_index=\"products-idx\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(
            command.to_string(),
            "FT.SEARCH products-idx \
             \"@price:[10 +inf] @price:[-inf 100] @tag:{a|b} @name:wid*\" LIMIT 0 20"
        );
    }

    #[test]
    pub fn test_search_negation_and_or() {
        let query = parse(
            "FIND products WHERE status != 'gone' OR title = 'sale' \
             DB_SPECIFIC: search_index=\"idx\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(
            command.to_string(),
            "FT.SEARCH idx \"-@status:\"gone\" | @title:\"sale\"\" LIMIT 0 10"
        );
    }

    #[test]
    pub fn test_hash_data_type() {
        let query =
            parse("FIND users WHERE id = 'u1' DB_SPECIFIC: data_type=\"hash\"").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "HGETALL users:u1");
    }

    #[test]
    pub fn test_sorted_set_range() {
        let query = parse(
            "FIND scores WHERE score > 10 AND score <= 90 DB_SPECIFIC: data_type=\"zset\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "ZRANGEBYSCORE scores (10 90");
    }

    #[test]
    pub fn test_sorted_set_without_range_fails() {
        let query = parse("FIND scores DB_SPECIFIC: data_type=\"sorted-set\"").unwrap();

        let result = translate_kv_module(&query);

        assert!(matches!(result, Err(TranslateError::MissingRequiredHint { hint, .. })
            if hint == "min/max"));
    }

    #[test]
    pub fn test_list_start_stop_from_paging() {
        let query =
            parse("FIND feed LIMIT 10 OFFSET 20 DB_SPECIFIC: data_type=\"list\"").unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "LRANGE feed 20 29");
    }

    #[test]
    pub fn test_stream_group_requires_consumer() {
        let query = parse(
            "FIND events DB_SPECIFIC: data_type=\"stream\", group=\"workers\"",
        )
        .unwrap();

        let result = translate_kv_module(&query);

        assert!(matches!(result, Err(TranslateError::MissingRequiredHint { hint, .. })
            if hint == "consumer"));
    }

    #[test]
    pub fn test_stream_group_read() {
        let query = parse(
            "FIND events LIMIT 5 \
             DB_SPECIFIC: data_type=\"stream\", group=\"workers\", consumer=\"w1\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(
            command.to_string(),
            "XREADGROUP GROUP workers w1 COUNT 5 STREAMS events >"
        );
    }

    #[test]
    pub fn test_geo_requires_coordinates() {
        let query = parse(
            "FIND stores DB_SPECIFIC: data_type=\"geo\", longitude=2.35, latitude=48.85",
        )
        .unwrap();

        let result = translate_kv_module(&query);

        assert!(matches!(result, Err(TranslateError::MissingRequiredHint { hint, .. })
            if hint == "radius"));
    }

    #[test]
    pub fn test_geo_radius() {
        let query = parse(
            "FIND stores DB_SPECIFIC: data_type=\"geo\", longitude=2.35, latitude=48.85, \
             radius=500, unit=\"km\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(command.to_string(), "GEORADIUS stores 2.35 48.85 500 km");
    }

    #[test]
    pub fn test_pubsub_requires_channel() {
        let query = parse("FIND events DB_SPECIFIC: operation=\"subscribe\"").unwrap();

        let result = translate_kv_module(&query);

        assert!(matches!(result, Err(TranslateError::MissingRequiredHint { hint, .. })
            if hint == "channel"));
    }

    #[test]
    pub fn test_pubsub_commands() {
        let subscribe = parse(
            "FIND events DB_SPECIFIC: operation=\"subscribe\", channel=\"orders\"",
        )
        .unwrap();
        let psubscribe = parse(
            "FIND events DB_SPECIFIC: operation=\"psubscribe\", channel=\"orders.*\"",
        )
        .unwrap();

        assert_eq!(translate_kv_module(&subscribe).unwrap().to_string(), "SUBSCRIBE orders");
        assert_eq!(
            translate_kv_module(&psubscribe).unwrap().to_string(),
            "PSUBSCRIBE orders.*"
        );
    }

    #[test]
    pub fn test_graph_cypher() {
        let query = parse(
            "FIND users INNER JOIN orders o ON users.id = o.user_id \
             WHERE status = 'active' AGGREGATE n: COUNT(*) \
             DB_SPECIFIC: data_type=\"graph\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert_eq!(
            command.to_string(),
            "GRAPH.QUERY users \"MATCH (users:users) MATCH (o:orders) \
             WHERE users.id = o.user_id AND users.status = 'active' \
             RETURN count(users) AS n\""
        );
    }

    #[test]
    pub fn test_graph_left_join_is_optional_match() {
        let query = parse(
            "FIND users LEFT JOIN orders o ON users.id = o.user_id \
             DB_SPECIFIC: data_type=\"graph\"",
        )
        .unwrap();

        let command = translate_kv_module(&query).unwrap();

        assert!(command.to_string().contains("OPTIONAL MATCH (o:orders)"));
    }
}
