// etapa/src/core/handler.rs
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A boxed step handler.
///
/// Takes a clone of the run's `ContextData<TData>` and resolves to a flow
/// signal or the pipeline's error type. Handlers copy what they need out of
/// the context, drop the guard, then await.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>> + Send + Sync,
>;
