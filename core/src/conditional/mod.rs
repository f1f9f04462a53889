// etapa/src/conditional/mod.rs

//! Steps that dispatch to one of several scoped sub-pipelines.
//!
//! Each scope pairs a condition over the parent context with a
//! `Pipeline<SData, Err>` and an extractor that builds its `ContextData<SData>`.

pub mod builder;
pub(crate) mod scope;

pub use builder::{ConditionalScopeBuilder, ConditionalScopeConfigurator};
