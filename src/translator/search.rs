use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::parser::UniversalQuery;
use crate::parser::ast::{AggregateFunction, Condition, Connector, Literal, Operator};

/// A search-engine request: target index plus a JSON body in the usual
/// `query`/`aggs`/`sort` layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub index: String,
    pub body: Value,
}

/// Builds the search body. Positive clauses land under `bool.must`,
/// OR-adjacent ones under `bool.should`, negated operators under
/// `bool.must_not`; hints decorate the finished body without reshaping it.
pub fn translate_search(query: &UniversalQuery) -> SearchQuery {
    let hints = &query.db_specific.search;
    let mut body = Map::new();

    body.insert("query".to_string(), build_query(query));

    if !query.fields.is_empty() {
        body.insert("_source".to_string(), json!(query.fields));
    }
    if !query.order_by.is_empty() {
        let sort: Vec<Value> = query
            .order_by
            .iter()
            .map(|entry| {
                json!({ &entry.field: { "order": entry.direction.to_string().to_lowercase() } })
            })
            .collect();
        body.insert("sort".to_string(), Value::Array(sort));
    }
    if let Some(limit) = query.limit {
        body.insert("size".to_string(), json!(limit));
    }
    if let Some(offset) = query.offset {
        body.insert("from".to_string(), json!(offset));
    }

    if !query.aggregates.is_empty() {
        body.insert("aggs".to_string(), build_aggregations(query));
        if hints.metrics_only {
            body.insert("size".to_string(), json!(0));
        }
    }

    if hints.highlight {
        let fields: Map<String, Value> = if query.fields.is_empty() {
            Map::from_iter([("*".to_string(), json!({}))])
        } else {
            query.fields.iter().map(|field| (field.clone(), json!({}))).collect()
        };
        body.insert("highlight".to_string(), json!({ "fields": fields }));
    }

    debug!(index = %query.table.name, "built search body");

    SearchQuery {
        index: query.table.name.clone(),
        body: Value::Object(body),
    }
}

fn build_query(query: &UniversalQuery) -> Value {
    let hints = &query.db_specific.search;

    if query.conditions.is_empty() {
        if let Some(boost) = hints.boost {
            return json!({ "bool": { "must": [{ "match_all": {} }], "boost": boost } });
        }
        return json!({ "match_all": {} });
    }

    let mut must: Vec<Value> = Vec::new();
    let mut must_not: Vec<Value> = Vec::new();
    let mut should: Vec<Value> = Vec::new();

    for (index, condition) in query.conditions.iter().enumerate() {
        let clause = render_clause(condition, hints.fuzzy);
        let negated = condition.operator.is_negated();
        if or_adjacent(&query.conditions, index) {
            if negated {
                should.push(json!({ "bool": { "must_not": [clause] } }));
            } else {
                should.push(clause);
            }
        } else if negated {
            must_not.push(clause);
        } else {
            must.push(clause);
        }
    }

    let mut bool_body = Map::new();
    if !must.is_empty() {
        bool_body.insert("must".to_string(), Value::Array(must));
    }
    if !must_not.is_empty() {
        bool_body.insert("must_not".to_string(), Value::Array(must_not));
    }
    if !should.is_empty() {
        bool_body.insert("should".to_string(), Value::Array(should));
        bool_body.insert("minimum_should_match".to_string(), json!(1));
    }
    if let Some(boost) = hints.boost {
        bool_body.insert("boost".to_string(), json!(boost));
    }

    json!({ "bool": bool_body })
}

/// A condition joins the `should` group when the connector on either side
/// of it is OR.
fn or_adjacent(conditions: &[Condition], index: usize) -> bool {
    let before = index > 0 && conditions[index - 1].connector == Connector::Or;
    let after =
        index + 1 < conditions.len() && conditions[index].connector == Connector::Or;
    before || after
}

fn render_clause(condition: &Condition, fuzzy: bool) -> Value {
    let field = &condition.field;
    let value = condition.value.as_json();

    match condition.operator {
        Operator::Eq if fuzzy && matches!(condition.value, Literal::Str(_)) => {
            json!({ "match": { field: { "query": value, "fuzziness": "AUTO" } } })
        }
        Operator::Eq | Operator::NotEq => json!({ "term": { field: value } }),
        Operator::Gt => json!({ "range": { field: { "gt": value } } }),
        Operator::Lt => json!({ "range": { field: { "lt": value } } }),
        Operator::GtEq => json!({ "range": { field: { "gte": value } } }),
        Operator::LtEq => json!({ "range": { field: { "lte": value } } }),
        Operator::In | Operator::NotIn => json!({ "terms": { field: list_values(condition) } }),
        Operator::Like => {
            json!({ "wildcard": { field: { "value": wildcard_pattern(condition) } } })
        }
        Operator::ILike => json!({
            "wildcard": { field: { "value": wildcard_pattern(condition), "case_insensitive": true } }
        }),
    }
}

fn list_values(condition: &Condition) -> Value {
    match &condition.value {
        Literal::List(items) => Value::Array(items.iter().map(Literal::as_json).collect()),
        other => Value::Array(vec![other.as_json()]),
    }
}

fn wildcard_pattern(condition: &Condition) -> String {
    condition.value.as_plain().replace('%', "*")
}

/// One `terms` bucket per GROUP BY field (nested when several), with the
/// metric aggregations at the innermost level.
fn build_aggregations(query: &UniversalQuery) -> Value {
    let mut metrics = Map::new();
    for aggregate in &query.aggregates {
        let field = if aggregate.field == "*" { "_id" } else { aggregate.field.as_str() };
        let kind = match aggregate.function {
            AggregateFunction::Count => "value_count",
            other => other.lower(),
        };
        metrics.insert(aggregate.alias.clone(), json!({ kind: { "field": field } }));
    }

    let mut aggs = Value::Object(metrics);
    for group_field in query.group_by.iter().rev() {
        aggs = json!({
            format!("group_by_{}", group_field): {
                "terms": { "field": group_field },
                "aggs": aggs,
            }
        });
    }
    aggs
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::parse;
    use crate::translator::translate_search;

    #[test]
    pub fn test_no_conditions_is_match_all() {
        let query = parse("FIND articles").unwrap();

        let search = translate_search(&query);

        assert_eq!(search.index, "articles");
        assert_eq!(search.body["query"], json!({ "match_all": {} }));
    }

    #[test]
    pub fn test_range_pair_yields_two_range_clauses() {
        let query = parse("FIND products WHERE price >= 10 AND price <= 100").unwrap();

        let search = translate_search(&query);

        assert_eq!(
            search.body["query"],
            json!({ "bool": { "must": [
                { "range": { "price": { "gte": 10 } } },
                { "range": { "price": { "lte": 100 } } },
            ] } })
        );
    }

    #[test]
    pub fn test_operator_mapping() {
        let query = parse(
            "FIND products WHERE status = 'live' AND stock != 0 \
             AND tag IN ('a', 'b') AND brand NOT IN ('x') AND name LIKE 'wid%'",
        )
        .unwrap();

        let search = translate_search(&query);
        let bool_query = &search.body["query"]["bool"];

        assert_eq!(
            bool_query["must"],
            json!([
                { "term": { "status": "live" } },
                { "terms": { "tag": ["a", "b"] } },
                { "wildcard": { "name": { "value": "wid*" } } },
            ])
        );
        assert_eq!(
            bool_query["must_not"],
            json!([
                { "term": { "stock": 0 } },
                { "terms": { "brand": ["x"] } },
            ])
        );
    }

    #[test]
    pub fn test_or_conditions_become_should() {
        let query =
            parse("FIND products WHERE status = 'live' OR status = 'preview'").unwrap();

        let search = translate_search(&query);
        let bool_query = &search.body["query"]["bool"];

        assert_eq!(
            bool_query["should"],
            json!([
                { "term": { "status": "live" } },
                { "term": { "status": "preview" } },
            ])
        );
        assert_eq!(bool_query["minimum_should_match"], json!(1));
    }

    #[test]
    pub fn test_projection_sort_and_paging() {
        let query = parse(
            "FIND products FIELDS name, price WHERE price > 5 \
             ORDER BY price DESC LIMIT 20 OFFSET 40",
        )
        .unwrap();

        let search = translate_search(&query);

        assert_eq!(search.body["_source"], json!(["name", "price"]));
        assert_eq!(search.body["sort"], json!([{ "price": { "order": "desc" } }]));
        assert_eq!(search.body["size"], json!(20));
        assert_eq!(search.body["from"], json!(40));
    }

    #[test]
    pub fn test_grouped_aggregation() {
        let query = parse(
            "FIND orders AGGREGATE total: SUM(amount), n: COUNT(*) GROUP BY region",
        )
        .unwrap();

        let search = translate_search(&query);

        assert_eq!(
            search.body["aggs"],
            json!({ "group_by_region": {
                "terms": { "field": "region" },
                "aggs": {
                    "total": { "sum": { "field": "amount" } },
                    "n": { "value_count": { "field": "_id" } },
                },
            } })
        );
    }

    #[test]
    pub fn test_decorations() {
        let query = parse(
            "FIND articles WHERE title = 'rust' \
             DB_SPECIFIC: boost=2.0, fuzzy=true, highlight=true",
        )
        .unwrap();

        let search = translate_search(&query);
        let bool_query = &search.body["query"]["bool"];

        assert_eq!(bool_query["boost"], json!(2.0));
        assert_eq!(
            bool_query["must"],
            json!([{ "match": { "title": { "query": "rust", "fuzziness": "AUTO" } } }])
        );
        assert_eq!(search.body["highlight"], json!({ "fields": { "*": {} } }));
    }

    #[test]
    pub fn test_metrics_only_zeroes_size() {
        let query = parse(
            "FIND orders AGGREGATE n: COUNT(*) DB_SPECIFIC: metrics_only=true",
        )
        .unwrap();

        let search = translate_search(&query);

        assert_eq!(search.body["size"], json!(0));
    }
}
