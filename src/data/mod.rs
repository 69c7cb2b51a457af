//! Dataset construction and artifact persistence.

pub mod artifact;
pub mod corpus;
pub mod dataset;
