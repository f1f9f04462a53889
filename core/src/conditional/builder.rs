// etapa/src/conditional/builder.rs

//! Fluent configuration of a conditional step.
//!
//! ```ignore
//! pipeline
//!   .conditional_scopes_for_step("apply")
//!   .add_scope(confirm_pipeline, |ctx| Ok(ContextData::new(ConfirmCtx::from(&*ctx.read()))))
//!   .on_condition(|ctx| ctx.read().is_approved())
//!   .if_no_scope_matches(PipelineControl::Continue)
//!   .finalize_conditional_step(false);
//! ```

use crate::conditional::scope::{AnyConditionalScope, ConditionalScope};
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::EtapaError;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy)]
enum NoMatch {
  Control(PipelineControl),
  Fail,
}

/// Collects the scopes of one step. The first scope whose condition holds runs.
pub struct ConditionalScopeBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  pipeline: &'pipeline mut Pipeline<TData, Err>,
  step_name: String,
  scopes: Vec<Arc<dyn AnyConditionalScope<TData, Err>>>,
  no_match: NoMatch,
}

impl<'pipeline, TData, Err> ConditionalScopeBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  pub(crate) fn new(pipeline: &'pipeline mut Pipeline<TData, Err>, step_name: String) -> Self {
    Self {
      pipeline,
      step_name,
      scopes: Vec::new(),
      no_match: NoMatch::Control(PipelineControl::Continue),
    }
  }

  /// Adds a scope running `pipeline` over the context built by `extractor`.
  /// Finish it with [`ConditionalScopeConfigurator::on_condition`].
  pub fn add_scope<SData>(
    self,
    pipeline: Arc<Pipeline<SData, Err>>,
    extractor: impl Fn(ContextData<TData>) -> Result<ContextData<SData>, EtapaError> + Send + Sync + 'static,
  ) -> ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
  where
    SData: 'static + Send + Sync,
  {
    ConditionalScopeConfigurator {
      builder: self,
      pipeline,
      extractor: Arc::new(extractor),
    }
  }

  /// What the step returns when no condition holds. Defaults to `Continue`.
  pub fn if_no_scope_matches(mut self, control: PipelineControl) -> Self {
    self.no_match = NoMatch::Control(control);
    self
  }

  /// Makes an unmatched step fail with [`EtapaError::NoConditionalScopeMatched`].
  pub fn fail_if_no_scope_matches(mut self) -> Self {
    self.no_match = NoMatch::Fail;
    self
  }

  /// Installs the dispatching handler as the step's only `on` handler.
  ///
  /// When `optional` is true a failing scope is logged and the parent continues.
  pub fn finalize_conditional_step(self, optional: bool) {
    let scopes = Arc::new(self.scopes);
    let step_name = self.step_name.clone();
    let no_match = self.no_match;
    let scope_count = scopes.len();

    let dispatcher: Handler<TData, Err> = Box::new(move |ctx_data: ContextData<TData>| {
      let scopes = scopes.clone();
      let step_name = step_name.clone();
      Box::pin(async move {
        let Some(scope) = scopes.iter().find(|s| s.is_condition_met(ctx_data.clone())) else {
          return match no_match {
            NoMatch::Control(control) => {
              event!(Level::DEBUG, %step_name, ?control, "No conditional scope matched.");
              Ok(control)
            }
            NoMatch::Fail => Err(Err::from(EtapaError::NoConditionalScopeMatched { step_name })),
          };
        };

        match scope.execute(ctx_data).await {
          Ok(control) => Ok(control),
          Err(e) if optional => {
            event!(Level::WARN, %step_name, error = %e, "Optional conditional step failed, continuing.");
            Ok(PipelineControl::Continue)
          }
          Err(e) => Err(e),
        }
      })
    });

    if let Some(step) = self.pipeline.steps.iter_mut().find(|s| s.name == self.step_name) {
      step.optional = optional;
    }
    self.pipeline.on.insert(self.step_name.clone(), vec![dispatcher]);
    event!(Level::DEBUG, step_name = %self.step_name, scope_count, "Conditional step finalized.");
  }
}

/// A scope waiting for its condition.
pub struct ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  builder: ConditionalScopeBuilder<'pipeline, TData, Err>,
  pipeline: Arc<Pipeline<SData, Err>>,
  extractor: crate::conditional::scope::ScopeExtractor<TData, SData>,
}

impl<'pipeline, TData, SData, Err> ConditionalScopeConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<EtapaError> + Send + Sync + 'static,
{
  pub fn on_condition(
    mut self,
    condition: impl Fn(ContextData<TData>) -> bool + Send + Sync + 'static,
  ) -> ConditionalScopeBuilder<'pipeline, TData, Err> {
    let scope = ConditionalScope {
      step_name: self.builder.step_name.clone(),
      pipeline: self.pipeline,
      extractor: self.extractor,
      condition: Arc::new(condition),
    };
    self.builder.scopes.push(Arc::new(scope));
    self.builder
  }
}
