pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod options;
