pub mod query;
pub use query::*;

pub mod operators;
pub use operators::*;

pub mod literal;
pub use literal::*;

pub mod condition;
pub use condition::*;

pub mod join;
pub use join::*;

pub mod aggregate;
pub use aggregate::*;

pub mod order_by;
pub use order_by::*;

pub mod hints;
pub use hints::*;
