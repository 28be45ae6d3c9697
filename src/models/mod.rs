//! Models module
//!
//! Static description of every relation the pipeline manages: names, columns,
//! types, nullability and storage placement directives.

pub mod column;
pub mod relation;

pub use column::{ColumnDef, ColumnType};
pub use relation::{Distribution, Relation, RelationKind};
