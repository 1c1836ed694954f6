//! Request-scoped services over the repository traits.

pub mod comments;
pub mod context;
pub mod engine;
pub mod error;
pub mod navigation;
pub mod pagination;
pub mod posts;
pub mod related;
pub mod render;
pub mod repos;
pub mod search;
