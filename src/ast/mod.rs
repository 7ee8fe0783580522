/// BQL front end, optimizer and backend generators.
///
/// ```text
/// BQL text
///       ↓
/// Parser                  (parser.rs, dialect.rs: sqlparser MySQL plus BQL operators)
///       ↓
/// BQL AST                 (types.rs)  → Metadata (metadata.rs)
///       ↓
/// Optimizer               (optimizer.rs, resolves :name options)
///       ↓
/// Generators              (generator.rs)
///       ├── SQL           (sql.rs)
///       └── Search query  (search.rs)
/// ```
pub mod dialect;
pub mod generator;
pub mod metadata;
pub mod optimizer;
pub mod parser;
pub mod search;
pub mod sql;
pub mod types;

// Re-export key types for convenience
pub use generator::{Generator, Target};
pub use metadata::{collect, ColumnMeta, Metadata};
pub use optimizer::{optimize, Policy};
pub use parser::parse;
pub use search::SearchGenerator;
pub use sql::SqlGenerator;
pub use types::*;
