//! Tolerant SQL scanning.
//!
//! This is not a SQL parser. [`splitter`] cuts a script into statements and
//! [`classifier`] recognizes a handful of statement shapes that change
//! cached catalog entities. Both share the byte-level [`lexer`].

mod lexer;

pub mod classifier;
pub mod splitter;

pub use classifier::{CronAction, QualifiedName, StatementEffect, classify, try_classify};
pub use splitter::split;
