// etapa/src/lib.rs

//! Etapa: async step pipelines for multi-step business workflows.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step can carry
//! `before`, `on` and `after` handlers, a skip condition, and can be marked
//! optional. Handlers receive a shared [`ContextData`] and return a
//! [`PipelineControl`] to continue or stop the run.
//!
//! A step can also host conditional scopes: alternative sub-pipelines over
//! their own context type, of which the first whose condition holds is run.
//! The [`Registry`] keys pipelines by their context type so callers can run
//! a workflow by handing over nothing but its context.
//!
//! Typical use:
//! 1. Define a context struct for the workflow.
//! 2. Build a `Pipeline<Ctx, AppErr>` and register handlers for its steps.
//! 3. Register the pipeline in a `Registry<AppErr>` at startup.
//! 4. Per request, wrap a fresh context in `ContextData::new` and call
//!    `registry.run(ctx.clone()).await`, then read results back from `ctx`.

pub mod conditional;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::conditional::builder::{ConditionalScopeBuilder, ConditionalScopeConfigurator};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{EtapaError, EtapaResult};
pub use crate::pipeline::definition::Pipeline;
pub use crate::registry::Registry;
