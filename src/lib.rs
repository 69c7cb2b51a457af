//! Person-entity tagging and relation extraction for a single long novel.
//!
//! Raw sentence → [`nlp::features`] → [`nlp::crf`] → [`nlp::bio`] spans →
//! [`nlp::normalize`] → [`nlp::pipeline`] (keyword rules, then
//! [`nlp::relclf`]) → triples.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;

pub use error::{ExtractError, Result};
