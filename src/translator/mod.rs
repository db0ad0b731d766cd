use std::fmt::Display;

use tracing::debug;

use crate::parser::UniversalQuery;
use crate::parser::ast::Operator;

pub mod sql;
pub use sql::*;

pub mod document;
pub use document::*;

pub mod key_value;
pub use key_value::*;

pub mod search;
pub use search::*;

pub mod kv_module;
pub use kv_module::*;


/// The five destination query representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sql,
    Document,
    SingleTableKv,
    Search,
    KvModule,
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sql => write!(f, "sql"),
            Backend::Document => write!(f, "document"),
            Backend::SingleTableKv => write!(f, "single-table-kv"),
            Backend::Search => write!(f, "search"),
            Backend::KvModule => write!(f, "kv-module"),
        }
    }
}

/// Caller-supplied backend naming, independent of per-query DB_SPECIFIC
/// overrides. Inline hints always win over these; the hard defaults
/// (`PK`/`SK`, `TENANT#default`) lose to both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaHints {
    pub partition_key: Option<String>,
    pub sort_key: Option<String>,
    pub tenant: Option<String>,
    pub entities: Vec<String>,
}

/// One translated query, as plain data the respective execution adapter
/// binds onto a live driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendQuery {
    Sql(String),
    Document(DocQuery),
    KeyValue(KvQuery),
    Search(SearchQuery),
    Module(ModuleQuery),
}

/// Translation failures. Values, never panics; translation is
/// all-or-nothing per backend.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    UnsupportedOperator { operator: Operator, backend: Backend },
    MissingRequiredHint { hint: &'static str, backend: Backend },
}

impl TranslateError {
    pub fn err<T>(self) -> Result<T, TranslateError> {
        Err(self)
    }
}

impl Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::UnsupportedOperator { operator, backend } =>
                write!(f, "TranslateError: operator '{}' is not supported by the {} backend", operator, backend),
            TranslateError::MissingRequiredHint { hint, backend } =>
                write!(f, "TranslateError: the {} backend requires the '{}' hint", backend, hint),
        }
    }
}

impl std::error::Error for TranslateError {}

/// Routes one parsed query to its backend generator. Pure: same inputs,
/// same output, no side effects.
pub fn translate(
    query: &UniversalQuery,
    target: Backend,
    schema: &SchemaHints,
) -> Result<BackendQuery, TranslateError> {
    debug!(%target, table = %query.table, "translating query");

    match target {
        Backend::Sql => Ok(BackendQuery::Sql(translate_sql(query))),
        Backend::Document => Ok(BackendQuery::Document(translate_document(query))),
        Backend::SingleTableKv => translate_key_value(query, schema).map(BackendQuery::KeyValue),
        Backend::Search => Ok(BackendQuery::Search(translate_search(query))),
        Backend::KvModule => translate_kv_module(query).map(BackendQuery::Module),
    }
}
