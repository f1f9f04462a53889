// tests/common/mod.rs
#![allow(dead_code)]

use etapa::{ContextData, EtapaError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// A parcel moving through a small fulfilment flow.
#[derive(Clone, Debug, Default)]
pub struct ParcelFlow {
  pub weight_grams: u32,
  pub label: String,
  pub steps_executed: Vec<String>,
  pub stop_at: Option<String>,
  pub express: bool,
  pub route: Option<String>,
}

/// Sub-context for the express branch. Holds the parent so writes land there.
#[derive(Clone, Debug)]
pub struct ExpressRoute {
  pub parent: ContextData<ParcelFlow>,
  pub hub: String,
}

#[derive(Clone, Debug)]
pub struct GroundRoute {
  pub parent: ContextData<ParcelFlow>,
  pub days: u32,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine error: {0}")]
  Engine(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<EtapaError> for TestError {
  fn from(e: EtapaError) -> Self {
    TestError::Engine(format!("{:?}", e))
  }
}

/// Records the step and stops if `stop_at` names it.
pub fn recording_handler(step_name: &'static str) -> Handler<ParcelFlow, TestError> {
  Box::new(move |ctx: ContextData<ParcelFlow>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.steps_executed.push(step_name.to_string());
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> Handler<ParcelFlow, TestError> {
  Box::new(move |ctx: ContextData<ParcelFlow>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
