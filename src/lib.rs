//! Toolchain for the Kconfig configuration language: parser, menu tree,
//! constraint evaluator, configuration reader/writer, rename handling,
//! style checker, documentation generator and a line-delimited JSON
//! protocol for IDE integration.

pub mod ast;
pub mod checker;
pub mod config;
pub mod docs;
pub mod error;
pub mod eval;
pub mod expr;
pub mod lexer;
pub mod menu;
pub mod parser;
pub mod renames;
pub mod report;
pub mod server;
pub mod symbol;
pub mod world;

pub use error::{KconfigError, Result};
pub use world::World;
