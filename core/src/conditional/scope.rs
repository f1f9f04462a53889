// etapa/src/conditional/scope.rs

//! One branch of a conditional step and its type-erased form.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::EtapaError;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub(crate) type ScopeExtractor<TData, SData> =
  Arc<dyn Fn(ContextData<TData>) -> Result<ContextData<SData>, EtapaError> + Send + Sync + 'static>;

pub(crate) type ScopeCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// A condition on the parent context, the sub-pipeline to run when it holds,
/// and the extractor that builds the sub-pipeline's context.
pub(crate) struct ConditionalScope<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  pub(crate) step_name: String,
  pub(crate) pipeline: Arc<Pipeline<SData, Err>>,
  pub(crate) extractor: ScopeExtractor<TData, SData>,
  pub(crate) condition: ScopeCondition<TData>,
}

/// Erases `SData` so scopes over different sub-contexts share one list.
#[async_trait]
pub(crate) trait AnyConditionalScope<TData, Err>: Send + Sync
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  fn is_condition_met(&self, ctx_data: ContextData<TData>) -> bool;

  /// Extracts the sub-context and runs the scoped pipeline.
  ///
  /// A completed sub-run continues the parent; a stopped one stops it.
  async fn execute(&self, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err>;
}

#[async_trait]
impl<TData, SData, Err> AnyConditionalScope<TData, Err> for ConditionalScope<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  fn is_condition_met(&self, ctx_data: ContextData<TData>) -> bool {
    (self.condition)(ctx_data)
  }

  #[instrument(
    name = "ConditionalScope::execute",
    skip_all,
    fields(step_name = %self.step_name, scoped_context_type = %std::any::type_name::<SData>()),
    err(Display)
  )]
  async fn execute(&self, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    let sub_ctx = (self.extractor)(ctx_data).map_err(|e| {
      event!(Level::ERROR, error = %e, "Scope extractor failed.");
      let enriched = match e {
        EtapaError::HandlerError { source } | EtapaError::ExtractorFailure { source, .. } => {
          EtapaError::ExtractorFailure {
            step_name: self.step_name.clone(),
            source,
          }
        }
        other => other,
      };
      Err::from(enriched)
    })?;

    match self.pipeline.run(sub_ctx).await? {
      PipelineResult::Completed => Ok(PipelineControl::Continue),
      PipelineResult::Stopped => {
        event!(Level::INFO, "Scoped pipeline stopped.");
        Ok(PipelineControl::Stop)
      }
    }
  }
}
