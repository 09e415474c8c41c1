//! Data models for the Inkwell content site.
//!
//! Field names are serialized in camelCase to match the frontend contract.

mod article;
mod category;
mod comment;
mod pagination;
mod project;

pub use article::*;
pub use category::*;
pub use comment::*;
pub use pagination::*;
pub use project::*;
