#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! docsearch-core
//!
//! Shared domain types, configuration, the document loader and the
//! section-aware segmenter used by the keyword and vector indexes.

pub mod config;
pub mod error;
pub mod loader;
pub mod segmenter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
