pub mod parser;
pub use parser::{ParseError, UniversalQuery, parse};

pub mod translator;
pub use translator::{Backend, BackendQuery, SchemaHints, TranslateError, translate};
