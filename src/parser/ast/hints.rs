use indexmap::IndexMap;

use crate::parser::ParseError;

/// Single-table KV hints: explicit key values, key attribute-name overrides
/// and index selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvHints {
    pub partition_key: Option<String>,
    pub sort_key: Option<String>,
    pub sort_key_prefix: Option<String>,
    pub partition_key_attribute: Option<String>,
    pub sort_key_attribute: Option<String>,
    pub gsi_name: Option<String>,
    pub tenant: Option<String>,
}

/// Search-engine decorations; applied on top of the built query without
/// altering its base structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHints {
    pub boost: Option<f64>,
    pub fuzzy: bool,
    pub highlight: bool,
    pub metrics_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleDataType {
    Hash,
    Set,
    SortedSet,
    List,
    Stream,
    Geo,
    HyperLogLog,
    Graph,
}

impl ModuleDataType {
    pub fn parse(value: &str) -> Option<ModuleDataType> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hash" => Some(ModuleDataType::Hash),
            "set" => Some(ModuleDataType::Set),
            "sorted-set" | "sorted_set" | "zset" => Some(ModuleDataType::SortedSet),
            "list" => Some(ModuleDataType::List),
            "stream" => Some(ModuleDataType::Stream),
            "geo" => Some(ModuleDataType::Geo),
            "hyperloglog" | "hll" => Some(ModuleDataType::HyperLogLog),
            "graph" => Some(ModuleDataType::Graph),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOperation {
    Subscribe,
    PSubscribe,
}

/// KV/search-module hints: data-structure selection, search index, key
/// naming and pub/sub routing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleHints {
    pub data_type: Option<ModuleDataType>,
    pub search_index: Option<String>,
    pub key_field: Option<String>,
    pub pattern: Option<String>,
    pub count: Option<u64>,
    pub group: Option<String>,
    pub consumer: Option<String>,
    pub operation: Option<ModuleOperation>,
    pub channel: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub radius: Option<f64>,
    pub unit: Option<String>,
}

/// The parsed DB_SPECIFIC bag. Keys route into backend-scoped buckets by
/// name-substring matching; keys no bucket claims are kept in `extra` in
/// source order. Repeated DB_SPECIFIC clauses merge into the same bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbSpecific {
    pub key_value: KvHints,
    pub search: SearchHints,
    pub module: ModuleHints,
    pub extra: IndexMap<String, String>,
}

impl DbSpecific {
    pub fn is_empty(&self) -> bool {
        self == &DbSpecific::default()
    }

    /// Merges one DB_SPECIFIC body (single-line `key="value", ...` or one
    /// pair per line) into the bag. Later pairs win over earlier ones for
    /// the same key.
    pub fn apply_body(&mut self, body: &str) -> Result<(), ParseError> {
        for pair in split_pairs(body) {
            let Some((key, value)) = pair.split_once('=') else {
                return ParseError::MalformedHint { key: pair.clone(), value: String::new() }.err();
            };
            let key = key.trim();
            let value = unquote(value.trim());
            self.apply_pair(key, &value)?;
        }
        Ok(())
    }

    /// Routes one `key=value` pair into its bucket. Attribute-name keys are
    /// tested before plain key-value keys so that `partition_key_attribute`
    /// never lands in `partition_key`.
    pub fn apply_pair(&mut self, key: &str, value: &str) -> Result<(), ParseError> {
        let lower = key.to_ascii_lowercase();
        let malformed = || ParseError::MalformedHint {
            key: key.to_string(),
            value: value.to_string(),
        };

        if lower.contains("partition_key_attribute") {
            self.key_value.partition_key_attribute = Some(value.to_string());
        } else if lower.contains("sort_key_attribute") {
            self.key_value.sort_key_attribute = Some(value.to_string());
        } else if lower.contains("sort_key_prefix") {
            self.key_value.sort_key_prefix = Some(value.to_string());
        } else if lower.contains("partition_key") {
            self.key_value.partition_key = Some(value.to_string());
        } else if lower.contains("sort_key") {
            self.key_value.sort_key = Some(value.to_string());
        } else if lower.contains("gsi") || lower.contains("index_name") || lower == "index" {
            self.key_value.gsi_name = Some(value.to_string());
        } else if lower.contains("tenant") {
            self.key_value.tenant = Some(value.to_string());
        } else if lower.contains("boost") {
            self.search.boost = Some(value.parse::<f64>().map_err(|_| malformed())?);
        } else if lower.contains("fuzzy") {
            self.search.fuzzy = parse_bool(value).ok_or_else(malformed)?;
        } else if lower.contains("highlight") {
            self.search.highlight = parse_bool(value).ok_or_else(malformed)?;
        } else if lower.contains("metrics") {
            self.search.metrics_only = parse_bool(value).ok_or_else(malformed)?;
        } else if lower.contains("data_type") {
            self.module.data_type = Some(ModuleDataType::parse(value).ok_or_else(malformed)?);
        } else if lower.contains("search_index") || lower.contains("ft_index") {
            self.module.search_index = Some(value.to_string());
        } else if lower.contains("key_field") {
            self.module.key_field = Some(value.to_string());
        } else if lower.contains("pattern") {
            self.module.pattern = Some(value.to_string());
        } else if lower.contains("count") {
            self.module.count = Some(value.parse::<u64>().map_err(|_| malformed())?);
        } else if lower.contains("consumer") {
            self.module.consumer = Some(value.to_string());
        } else if lower.contains("group") {
            self.module.group = Some(value.to_string());
        } else if lower.contains("operation") {
            self.module.operation = Some(match value.to_ascii_lowercase().as_str() {
                "subscribe" => ModuleOperation::Subscribe,
                "psubscribe" => ModuleOperation::PSubscribe,
                _ => return Err(malformed()),
            });
        } else if lower.contains("channel") {
            self.module.channel = Some(value.to_string());
        } else if lower.contains("lon") {
            self.module.longitude = Some(value.parse::<f64>().map_err(|_| malformed())?);
        } else if lower.contains("lat") {
            self.module.latitude = Some(value.parse::<f64>().map_err(|_| malformed())?);
        } else if lower.contains("radius") {
            self.module.radius = Some(value.parse::<f64>().map_err(|_| malformed())?);
        } else if lower.contains("unit") {
            self.module.unit = Some(value.to_string());
        } else {
            self.extra.insert(key.to_string(), value.to_string());
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        let first = value.chars().next().unwrap_or('\0');
        let last = value.chars().last().unwrap_or('\0');
        if (first == '\'' || first == '"') && first == last {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// Splits a DB_SPECIFIC body into `key=value` tokens on commas and line
/// breaks outside quotes.
fn split_pairs(body: &str) -> Vec<String> {
    let mut pairs: Vec<String> = vec![];
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                current.push(ch);
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                    current.push(ch);
                } else if ch == ',' || ch == '\n' || ch == '\r' {
                    let pair = current.trim().to_string();
                    if !pair.is_empty() {
                        pairs.push(pair);
                    }
                    current = String::new();
                } else {
                    current.push(ch);
                }
            }
        }
    }

    let last = current.trim().to_string();
    if !last.is_empty() {
        pairs.push(last);
    }

    pairs
}

#[cfg(test)]
mod tests {
    use crate::parser::ParseError;
    use crate::parser::ast::{DbSpecific, ModuleDataType, ModuleOperation};

    #[test]
    pub fn test_single_line_pairs() {
        let mut bag = DbSpecific::default();
        bag.apply_body(r#"partition_key="TENANT#42", sort_key_prefix="ORDER#""#).unwrap();

        assert_eq!(bag.key_value.partition_key, Some("TENANT#42".into()));
        assert_eq!(bag.key_value.sort_key_prefix, Some("ORDER#".into()));
        assert_eq!(bag.key_value.sort_key, None);
    }

    #[test]
    pub fn test_attribute_keys_do_not_shadow_value_keys() {
        let mut bag = DbSpecific::default();
        bag.apply_body(r#"partition_key_attribute="custom_pk""#).unwrap();

        assert_eq!(bag.key_value.partition_key_attribute, Some("custom_pk".into()));
        assert_eq!(bag.key_value.partition_key, None);
    }

    #[test]
    pub fn test_multi_line_bodies_merge() {
        let mut bag = DbSpecific::default();
        bag.apply_body("boost=2.5\nfuzzy=true").unwrap();
        bag.apply_body("highlight=true").unwrap();

        assert_eq!(bag.search.boost, Some(2.5));
        assert!(bag.search.fuzzy);
        assert!(bag.search.highlight);
    }

    #[test]
    pub fn test_module_bucket() {
        let mut bag = DbSpecific::default();
        bag.apply_body(r#"data_type="sorted-set", key_field="user_id""#).unwrap();

        assert_eq!(bag.module.data_type, Some(ModuleDataType::SortedSet));
        assert_eq!(bag.module.key_field, Some("user_id".into()));
    }

    #[test]
    pub fn test_operation_hint() {
        let mut bag = DbSpecific::default();
        bag.apply_body(r#"operation="subscribe", channel="alerts""#).unwrap();

        assert_eq!(bag.module.operation, Some(ModuleOperation::Subscribe));
        assert_eq!(bag.module.channel, Some("alerts".into()));
    }

    #[test]
    pub fn test_unclaimed_keys_land_in_extra() {
        let mut bag = DbSpecific::default();
        bag.apply_body(r#"read_preference="secondary""#).unwrap();

        assert_eq!(bag.extra.get("read_preference"), Some(&"secondary".to_string()));
    }

    #[test]
    pub fn test_pair_without_equals_fails() {
        let mut bag = DbSpecific::default();
        let result = bag.apply_body("just_a_key");

        assert!(matches!(result, Err(ParseError::MalformedHint { .. })));
    }

    #[test]
    pub fn test_unknown_data_type_fails() {
        let mut bag = DbSpecific::default();
        let result = bag.apply_body(r#"data_type="bitmap""#);

        assert_eq!(
            result,
            Err(ParseError::MalformedHint { key: "data_type".into(), value: "bitmap".into() })
        );
    }
}
