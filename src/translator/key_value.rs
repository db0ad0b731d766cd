use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::parser::UniversalQuery;
use crate::parser::ast::{Condition, KvHints, Literal, Operator};
use crate::translator::{Backend, SchemaHints, TranslateError};

/// Table names the entity-scan branch recognizes out of the box; callers
/// extend the list through `SchemaHints::entities`.
static KNOWN_ENTITIES: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["users", "orders", "products", "customers", "sessions", "events"]);

const DEFAULT_PARTITION_ATTRIBUTE: &str = "PK";
const DEFAULT_SORT_ATTRIBUTE: &str = "SK";
const DEFAULT_TENANT: &str = "TENANT#default";

/// One single-table KV request. Field names are the stable wire contract an
/// execution adapter binds directly onto the live SDK call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KvQuery {
    Get(KvGet),
    Query(KvQueryOp),
    Scan(KvScan),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvGet {
    pub table_name: String,
    pub key: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvQueryOp {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub key_condition_expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    pub expression_attribute_names: IndexMap<String, String>,
    pub expression_attribute_values: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvScan {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Placeholder tables shared by key condition, projection and filter.
/// Names are reused per attribute, values get a fresh `:valN` per
/// occurrence; both tables keep insertion order.
#[derive(Default)]
struct ExprBuilder {
    names: IndexMap<String, String>,
    values: IndexMap<String, Value>,
    field_seq: usize,
    value_seq: usize,
}

impl ExprBuilder {
    fn bind_name(&mut self, attribute: &str) -> String {
        for (placeholder, bound) in &self.names {
            if bound == attribute {
                return placeholder.clone();
            }
        }
        let placeholder = format!("#field{}", self.field_seq);
        self.field_seq += 1;
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn bind_fixed_name(&mut self, placeholder: &str, attribute: &str) {
        self.names.insert(placeholder.to_string(), attribute.to_string());
    }

    fn bind_value(&mut self, value: Value) -> String {
        let placeholder = format!(":val{}", self.value_seq);
        self.value_seq += 1;
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn bind_fixed_value(&mut self, placeholder: &str, value: Value) {
        self.values.insert(placeholder.to_string(), value);
    }
}

/// Chooses the cheapest access path the query allows, in priority order:
/// explicit GSI, explicit key values, `id` point lookup, entity-prefix
/// query, full scan.
pub fn translate_key_value(
    query: &UniversalQuery,
    schema: &SchemaHints,
) -> Result<KvQuery, TranslateError> {
    let kv = &query.db_specific.key_value;
    let table = query.table.qualified();

    let pk_attr = kv
        .partition_key_attribute
        .clone()
        .or_else(|| schema.partition_key.clone())
        .unwrap_or_else(|| DEFAULT_PARTITION_ATTRIBUTE.to_string());
    let sk_attr = kv
        .sort_key_attribute
        .clone()
        .or_else(|| schema.sort_key.clone())
        .unwrap_or_else(|| DEFAULT_SORT_ATTRIBUTE.to_string());
    let tenant = kv
        .tenant
        .clone()
        .or_else(|| schema.tenant.clone())
        .unwrap_or_else(|| DEFAULT_TENANT.to_string());

    // 1. explicit secondary index
    if let Some(gsi) = &kv.gsi_name {
        if kv.partition_key.is_none() {
            return TranslateError::MissingRequiredHint {
                hint: "partition_key",
                backend: Backend::SingleTableKv,
            }
            .err();
        }
        debug!(index = %gsi, "kv access path: gsi query");

        let mut builder = ExprBuilder::default();
        let key_condition = hint_key_condition(kv, &pk_attr, &sk_attr, &mut builder);
        let projection = projection_expression(&query.fields, &mut builder);
        let filter = fold_filter(&retained(&query.conditions, |_| true), &mut builder)?;

        return Ok(KvQuery::Query(KvQueryOp {
            table_name: table,
            index_name: Some(gsi.clone()),
            key_condition_expression: key_condition,
            filter_expression: filter,
            projection_expression: projection,
            expression_attribute_names: builder.names,
            expression_attribute_values: builder.values,
            limit: query.limit,
        }));
    }

    // 2. explicit key values
    if kv.partition_key.is_some() {
        if let (Some(pk_value), Some(sk_value), None, true) = (
            &kv.partition_key,
            &kv.sort_key,
            kv.sort_key_prefix.as_ref(),
            query.conditions.is_empty(),
        ) {
            debug!("kv access path: get item");

            let mut builder = ExprBuilder::default();
            let projection = projection_expression(&query.fields, &mut builder);
            let mut key = IndexMap::new();
            key.insert(pk_attr, Value::String(pk_value.clone()));
            key.insert(sk_attr, Value::String(sk_value.clone()));

            return Ok(KvQuery::Get(KvGet {
                table_name: table,
                key,
                projection_expression: projection,
                expression_attribute_names: builder.names,
            }));
        }

        debug!("kv access path: hinted key query");

        let mut builder = ExprBuilder::default();
        let key_condition = hint_key_condition(kv, &pk_attr, &sk_attr, &mut builder);
        let projection = projection_expression(&query.fields, &mut builder);
        let filter = fold_filter(&retained(&query.conditions, |_| true), &mut builder)?;

        return Ok(KvQuery::Query(KvQueryOp {
            table_name: table,
            index_name: None,
            key_condition_expression: key_condition,
            filter_expression: filter,
            projection_expression: projection,
            expression_attribute_names: builder.names,
            expression_attribute_values: builder.values,
            limit: query.limit,
        }));
    }

    // a sort-key hint without a partition key cannot form a key condition
    if kv.sort_key.is_some() || kv.sort_key_prefix.is_some() {
        return TranslateError::MissingRequiredHint {
            hint: "partition_key",
            backend: Backend::SingleTableKv,
        }
        .err();
    }

    // 3. equality on the id field becomes a synthesized point lookup
    let id_position = query.conditions.iter().position(|condition| {
        condition.operator == Operator::Eq
            && (condition.field == "id" || condition.field == pk_attr)
    });
    if let Some(position) = id_position {
        debug!("kv access path: point lookup");

        let entity = entity_prefix(&query.table.name);
        let id_value = query.conditions[position].value.as_plain();

        let mut builder = ExprBuilder::default();
        builder.bind_fixed_name("#pk", &pk_attr);
        builder.bind_fixed_name("#sk", &sk_attr);
        builder.bind_fixed_value(":pk", Value::String(tenant));
        builder.bind_fixed_value(":sk", Value::String(format!("{}#{}", entity, id_value)));

        let projection = projection_expression(&query.fields, &mut builder);
        let residual = retained(&query.conditions, |(index, condition)| {
            index != position && condition.field != "entity_type"
        });
        let filter = fold_filter(&residual, &mut builder)?;

        return Ok(KvQuery::Query(KvQueryOp {
            table_name: table,
            index_name: None,
            key_condition_expression: "#pk = :pk AND #sk = :sk".to_string(),
            filter_expression: filter,
            projection_expression: projection,
            expression_attribute_names: builder.names,
            expression_attribute_values: builder.values,
            limit: query.limit,
        }));
    }

    // 4. known entity type: prefix query plus entity_type assertion
    if is_known_entity(&query.table.name, schema) {
        debug!("kv access path: entity prefix query");

        let entity = entity_prefix(&query.table.name);

        let mut builder = ExprBuilder::default();
        builder.bind_fixed_name("#pk", &pk_attr);
        builder.bind_fixed_name("#sk", &sk_attr);
        builder.bind_fixed_value(":pk", Value::String(tenant));
        builder.bind_fixed_value(":sk_prefix", Value::String(format!("{}#", entity)));

        let projection = projection_expression(&query.fields, &mut builder);
        let folded = fold_filter(&retained(&query.conditions, |_| true), &mut builder)?;

        let entity_name = builder.bind_name("entity_type");
        let entity_value = builder.bind_value(Value::String(entity.to_lowercase()));
        let assertion = format!("{} = {}", entity_name, entity_value);
        let filter = match folded {
            Some(folded) => format!("{} AND {}", folded, assertion),
            None => assertion,
        };

        return Ok(KvQuery::Query(KvQueryOp {
            table_name: table,
            index_name: None,
            key_condition_expression: "#pk = :pk AND begins_with(#sk, :sk_prefix)".to_string(),
            filter_expression: Some(filter),
            projection_expression: projection,
            expression_attribute_names: builder.names,
            expression_attribute_values: builder.values,
            limit: query.limit,
        }));
    }

    // 5. full scan
    debug!("kv access path: scan");

    let mut builder = ExprBuilder::default();
    let projection = projection_expression(&query.fields, &mut builder);
    let filter = fold_filter(&retained(&query.conditions, |_| true), &mut builder)?;

    Ok(KvQuery::Scan(KvScan {
        table_name: table,
        filter_expression: filter,
        projection_expression: projection,
        expression_attribute_names: builder.names,
        expression_attribute_values: builder.values,
        limit: query.limit,
    }))
}

/// Key condition from explicit hint values: `#pk = :pk`, optionally
/// extended with an exact or `begins_with` sort-key clause.
fn hint_key_condition(
    kv: &KvHints,
    pk_attr: &str,
    sk_attr: &str,
    builder: &mut ExprBuilder,
) -> String {
    builder.bind_fixed_name("#pk", pk_attr);
    builder.bind_fixed_value(
        ":pk",
        Value::String(kv.partition_key.clone().unwrap_or_default()),
    );

    if let Some(sort_key) = &kv.sort_key {
        builder.bind_fixed_name("#sk", sk_attr);
        builder.bind_fixed_value(":sk", Value::String(sort_key.clone()));
        return "#pk = :pk AND #sk = :sk".to_string();
    }
    if let Some(prefix) = &kv.sort_key_prefix {
        builder.bind_fixed_name("#sk", sk_attr);
        builder.bind_fixed_value(":sk_prefix", Value::String(prefix.clone()));
        return "#pk = :pk AND begins_with(#sk, :sk_prefix)".to_string();
    }

    "#pk = :pk".to_string()
}

fn retained<'a>(
    conditions: &'a [Condition],
    keep: impl Fn((usize, &Condition)) -> bool,
) -> Vec<&'a Condition> {
    conditions
        .iter()
        .enumerate()
        .filter(|(index, condition)| keep((*index, condition)))
        .map(|(_, condition)| condition)
        .collect()
}

fn projection_expression(fields: &[String], builder: &mut ExprBuilder) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let placeholders: Vec<String> =
        fields.iter().map(|field| builder.bind_name(field)).collect();
    Some(placeholders.join(", "))
}

/// Folds residual conditions into a FilterExpression, binding every literal
/// through a numbered placeholder in left-to-right order.
fn fold_filter(
    conditions: &[&Condition],
    builder: &mut ExprBuilder,
) -> Result<Option<String>, TranslateError> {
    if conditions.is_empty() {
        return Ok(None);
    }

    let mut expression = String::new();
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            expression.push(' ');
            expression.push_str(&conditions[index - 1].connector.to_string());
            expression.push(' ');
        }
        expression.push_str(&render_condition(condition, builder)?);
    }

    Ok(Some(expression))
}

fn render_condition(
    condition: &Condition,
    builder: &mut ExprBuilder,
) -> Result<String, TranslateError> {
    let name = builder.bind_name(&condition.field);

    match condition.operator {
        Operator::Eq => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} = {}", name, value))
        }
        Operator::NotEq => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} <> {}", name, value))
        }
        Operator::Gt => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} > {}", name, value))
        }
        Operator::Lt => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} < {}", name, value))
        }
        Operator::GtEq => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} >= {}", name, value))
        }
        Operator::LtEq => {
            let value = builder.bind_value(condition.value.as_json());
            Ok(format!("{} <= {}", name, value))
        }
        Operator::In | Operator::NotIn => {
            let items = match &condition.value {
                Literal::List(items) => items.clone(),
                other => vec![other.clone()],
            };
            let placeholders: Vec<String> = items
                .iter()
                .map(|item| builder.bind_value(item.as_json()))
                .collect();
            let membership = format!("{} IN ({})", name, placeholders.join(", "));
            if condition.operator == Operator::NotIn {
                Ok(format!("NOT {}", membership))
            } else {
                Ok(membership)
            }
        }
        Operator::Like => {
            let pattern = condition.value.as_plain();
            let inner_wildcard = pattern.trim_end_matches('%').contains('%');
            if pattern.ends_with('%') && !inner_wildcard && !pattern.starts_with('%') {
                let prefix = pattern.trim_end_matches('%');
                let value = builder.bind_value(Value::String(prefix.to_string()));
                Ok(format!("begins_with({}, {})", name, value))
            } else {
                let needle = pattern.replace('%', "");
                let value = builder.bind_value(Value::String(needle));
                Ok(format!("contains({}, {})", name, value))
            }
        }
        Operator::ILike => TranslateError::UnsupportedOperator {
            operator: Operator::ILike,
            backend: Backend::SingleTableKv,
        }
        .err(),
    }
}

/// Entity prefix derived from the table name: singularized (one trailing
/// `s` stripped) and upper-cased.
fn entity_prefix(name: &str) -> String {
    let singular = name.strip_suffix('s').or_else(|| name.strip_suffix('S')).unwrap_or(name);
    if singular.is_empty() {
        return name.to_uppercase();
    }
    singular.to_uppercase()
}

fn is_known_entity(name: &str, schema: &SchemaHints) -> bool {
    let lower = name.to_ascii_lowercase();
    KNOWN_ENTITIES.contains(&lower.as_str())
        || schema.entities.iter().any(|entity| entity.eq_ignore_ascii_case(name))
}
