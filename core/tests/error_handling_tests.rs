// tests/error_handling_tests.rs
mod common;

use common::*;
use etapa::{ContextData, EtapaError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn required_step_without_handlers_reports_missing_handler() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None), ("label", false, None)]);
  p.on("weigh", recording_handler("weigh"));

  let err = p.run(ContextData::new(ParcelFlow::default())).await.unwrap_err();

  match err {
    TestError::Engine(msg) => assert!(msg.contains("HandlerMissing") && msg.contains("label"), "{msg}"),
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn user_error_converts_into_pipeline_error() {
  setup_tracing();
  #[derive(Debug)]
  struct ScaleOffline;
  impl From<ScaleOffline> for TestError {
    fn from(_: ScaleOffline) -> Self {
      TestError::Handler("scale offline".into())
    }
  }

  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None)]);
  p.on("weigh", |_ctx: ContextData<ParcelFlow>| async { Err::<PipelineControl, _>(ScaleOffline) });

  let err = p.run(ContextData::new(ParcelFlow::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("scale offline".into()));
}

#[test]
fn anyhow_errors_become_handler_errors() {
  let err: EtapaError = anyhow::anyhow!("carrier down").into();
  assert!(matches!(err, EtapaError::HandlerError { .. }));
  assert_eq!(err.to_string(), "Handler failed: carrier down");
}

#[test]
fn display_names_the_step() {
  let err = EtapaError::NoConditionalScopeMatched {
    step_name: "route".into(),
  };
  assert_eq!(err.to_string(), "No conditional scope matched for step 'route'");
}
