//! Compile → optimize → generate, as one reusable pipeline.
//!
//! A [`CompiledStatement`] holds the parsed tree and its metadata. Each call
//! to [`CompiledStatement::optimize`] works on its own copy of the tree, so
//! one compiled statement can be optimized against many option maps.
use serde::Serialize;
use tracing::debug;

use crate::ast::{self, Metadata, Statement, Target};
use crate::error::Result;
use crate::options::{BoundOption, Options};

#[derive(Debug, Default, Clone, Copy)]
pub struct BqlCompiler;

impl BqlCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Parse `bql` and collect its metadata.
    pub fn compile(&self, bql: &str) -> Result<CompiledStatement> {
        let statement = ast::parse(bql)?;
        let metadata = ast::collect(&statement);
        debug!(kind = statement.kind(), table = %metadata.table, "compiled statement");
        Ok(CompiledStatement {
            bql: bql.to_string(),
            statement,
            metadata,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledStatement {
    pub bql: String,
    pub statement: Statement,
    pub metadata: Metadata,
}

impl CompiledStatement {
    pub fn optimize(&self, options: &Options) -> Result<OptimizedStatement> {
        let (statement, bound_options) = ast::optimize(self.statement.clone(), options)?;
        debug!(bound = bound_options.len(), "optimized statement");
        Ok(OptimizedStatement {
            statement,
            bound_options,
            options: options.clone(),
        })
    }
}

/// An optimized tree plus the values for its bind marks.
#[derive(Debug, Clone)]
pub struct OptimizedStatement {
    pub statement: Statement,
    pub bound_options: Vec<BoundOption>,
    options: Options,
}

impl OptimizedStatement {
    pub fn generate(&self, target: Target) -> String {
        let generator = target.generator(&self.options);
        let text = generator.generate(&self.statement);
        debug!(target = generator.name(), len = text.len(), "generated");
        text
    }

    pub fn to_sql(&self) -> String {
        self.generate(Target::Sql)
    }

    pub fn to_search_query(&self) -> String {
        self.generate(Target::Search)
    }

    pub fn output(&self, target: Target) -> Output<'_> {
        Output {
            target,
            text: self.generate(target),
            bound_options: match target {
                Target::Sql => &self.bound_options,
                Target::Search => &[],
            },
        }
    }
}

/// Serializable result of one generation, used by `--format json`.
#[derive(Debug, Serialize)]
pub struct Output<'a> {
    pub target: Target,
    pub text: String,
    pub bound_options: &'a [BoundOption],
}
