use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::parser::UniversalQuery;
use crate::parser::ast::{Aggregate, AggregateFunction, Condition, Connector, Direction, Operator};

/// Document-store query: a plain find, or an aggregation pipeline when
/// grouping, aggregates or joins are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum DocQuery {
    Find {
        collection: String,
        filter: Value,
        projection: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        sort: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        skip: Option<u64>,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Value>,
    },
}

/// Every lexicon operator maps onto the document query language, so this
/// generator cannot fail.
pub fn translate_document(query: &UniversalQuery) -> DocQuery {
    // a `database.collection` qualifier addresses the collection part
    let collection = query.table.name.clone();

    if query.group_by.is_empty() && query.aggregates.is_empty() && query.joins.is_empty() {
        return DocQuery::Find {
            collection,
            filter: fold_filter(&query.conditions),
            projection: projection(&query.fields),
            sort: sort_spec(query),
            limit: query.limit,
            skip: query.offset,
        };
    }

    DocQuery::Aggregate { collection, pipeline: pipeline(query) }
}

/// Pipeline stage order: `$match`, one `$lookup` per join (join order),
/// `$group`, `$sort`, `$limit`, `$skip`.
fn pipeline(query: &UniversalQuery) -> Vec<Value> {
    let mut stages: Vec<Value> = vec![];

    let filter = fold_filter(&query.conditions);
    if filter.as_object().map(|object| !object.is_empty()).unwrap_or(false) {
        stages.push(json!({ "$match": filter }));
    }

    for join in &query.joins {
        stages.push(json!({
            "$lookup": {
                "from": join.table,
                "localField": strip_prefix(&join.on.left),
                "foreignField": strip_prefix(&join.on.right),
                "as": join.table,
            }
        }));
    }

    if !query.group_by.is_empty() || !query.aggregates.is_empty() {
        stages.push(json!({ "$group": group_stage(query) }));
    }

    if let Some(sort) = sort_spec(query) {
        stages.push(json!({ "$sort": sort }));
    }
    if let Some(limit) = query.limit {
        stages.push(json!({ "$limit": limit }));
    }
    if let Some(skip) = query.offset {
        stages.push(json!({ "$skip": skip }));
    }

    stages
}

fn group_stage(query: &UniversalQuery) -> Value {
    let id = match query.group_by.len() {
        0 => Value::Null,
        1 => Value::String(format!("${}", query.group_by[0])),
        _ => {
            let mut keys = Map::new();
            for field in &query.group_by {
                keys.insert(field.clone(), Value::String(format!("${}", field)));
            }
            Value::Object(keys)
        }
    };

    let mut stage = Map::new();
    stage.insert("_id".to_string(), id);
    for aggregate in &query.aggregates {
        stage.insert(aggregate.alias.clone(), accumulator(aggregate));
    }

    Value::Object(stage)
}

fn accumulator(aggregate: &Aggregate) -> Value {
    let field = format!("${}", aggregate.field);
    match aggregate.function {
        AggregateFunction::Count => json!({ "$sum": 1 }),
        AggregateFunction::Sum => json!({ "$sum": field }),
        AggregateFunction::Avg => json!({ "$avg": field }),
        AggregateFunction::Min => json!({ "$min": field }),
        AggregateFunction::Max => json!({ "$max": field }),
    }
}

/// Drops a `table.` qualifier from a join-constraint field.
fn strip_prefix(field: &str) -> String {
    field.rsplit('.').next().unwrap_or(field).to_string()
}

fn projection(fields: &[String]) -> Value {
    let mut map = Map::new();
    for field in fields {
        map.insert(field.clone(), json!(1));
    }
    Value::Object(map)
}

fn sort_spec(query: &UniversalQuery) -> Option<Value> {
    if query.order_by.is_empty() {
        return None;
    }
    let mut map = Map::new();
    for order in &query.order_by {
        let direction = match order.direction {
            Direction::Asc => 1,
            Direction::Desc => -1,
        };
        map.insert(order.field.clone(), json!(direction));
    }
    Some(Value::Object(map))
}

/// Folds conditions left-to-right. An all-AND chain merges into one filter
/// document (per-field operator maps merged); any OR produces a left-folded
/// `$and`/`$or` tree with same-connector flattening.
fn fold_filter(conditions: &[Condition]) -> Value {
    if conditions.is_empty() {
        return json!({});
    }

    let all_and = conditions[..conditions.len() - 1]
        .iter()
        .all(|condition| condition.connector == Connector::And);

    if all_and {
        if let Some(merged) = merge_all(conditions) {
            return merged;
        }
    }

    let mut folded = condition_doc(&conditions[0]);
    for (index, condition) in conditions.iter().enumerate().skip(1) {
        let connector = conditions[index - 1].connector;
        let key = match connector {
            Connector::And => "$and",
            Connector::Or => "$or",
        };
        let next = condition_doc(condition);

        // flatten when the accumulator is already the same connector
        folded = match folded.get(key).and_then(Value::as_array) {
            Some(existing) if folded.as_object().map(Map::len) == Some(1) => {
                let mut branches = existing.clone();
                branches.push(next);
                json!({ key: branches })
            }
            _ => json!({ key: [folded, next] }),
        };
    }

    folded
}

/// Attempts to merge an all-AND chain into a single filter document.
/// Returns None when two conditions on the same field collide.
fn merge_all(conditions: &[Condition]) -> Option<Value> {
    let mut filter = Map::new();

    for condition in conditions {
        let fragment = condition_value(condition);
        match filter.get_mut(&condition.field) {
            None => {
                filter.insert(condition.field.clone(), fragment);
            }
            Some(existing) => {
                let (Some(current), Some(addition)) =
                    (existing.as_object_mut(), fragment.as_object())
                else {
                    return None;
                };
                for (key, value) in addition {
                    if current.contains_key(key) {
                        return None;
                    }
                    current.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Some(Value::Object(filter))
}

fn condition_doc(condition: &Condition) -> Value {
    json!({ condition.field.clone(): condition_value(condition) })
}

/// The per-operator mapping table.
fn condition_value(condition: &Condition) -> Value {
    let value = condition.value.as_json();
    match condition.operator {
        Operator::Eq => value,
        Operator::NotEq => json!({ "$ne": value }),
        Operator::Gt => json!({ "$gt": value }),
        Operator::Lt => json!({ "$lt": value }),
        Operator::GtEq => json!({ "$gte": value }),
        Operator::LtEq => json!({ "$lte": value }),
        Operator::In => json!({ "$in": value }),
        Operator::NotIn => json!({ "$nin": value }),
        Operator::Like | Operator::ILike => {
            let pattern = condition.value.as_plain();
            json!({ "$regex": like_to_regex(&pattern), "$options": "i" })
        }
    }
}

/// `LIKE 'abc%'` becomes the anchored prefix regex `^abc`; literal chunks
/// are escaped, inner wildcards become `.*`.
fn like_to_regex(pattern: &str) -> String {
    let trimmed = pattern.trim_end_matches('%');
    let escaped: Vec<String> = trimmed.split('%').map(|chunk| regex::escape(chunk)).collect();
    format!("^{}", escaped.join(".*"))
}
