// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use etapa::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use serial_test::serial;
use std::sync::Arc;

fn three_steps() -> Pipeline<ParcelFlow, TestError> {
  let mut p = Pipeline::new(&[("weigh", false, None), ("label", false, None), ("dispatch", false, None)]);
  p.on("weigh", recording_handler("weigh"));
  p.on("label", recording_handler("label"));
  p.on("dispatch", recording_handler("dispatch"));
  p
}

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let pipeline = three_steps();
  let ctx = ContextData::new(ParcelFlow::default());

  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["weigh", "label", "dispatch"]);
}

#[tokio::test]
#[serial]
async fn before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("label", false, None)]);
  p.after("label", recording_handler("after"));
  p.on("label", recording_handler("on"));
  p.before("label", recording_handler("before"));
  p.on("label", recording_handler("on_second"));
  let ctx = ContextData::new(ParcelFlow::default());

  p.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["before", "on", "on_second", "after"]);
}

#[tokio::test]
#[serial]
async fn stop_halts_remaining_steps() {
  setup_tracing();
  let pipeline = three_steps();
  let ctx = ContextData::new(ParcelFlow {
    stop_at: Some("label".to_string()),
    ..Default::default()
  });

  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Stopped);
  assert_eq!(ctx.read().steps_executed, vec!["weigh", "label"]);
}

#[tokio::test]
#[serial]
async fn stop_in_before_skips_on_handlers() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("label", false, None)]);
  p.before("label", |_ctx: ContextData<ParcelFlow>| async { Ok::<_, TestError>(PipelineControl::Stop) });
  p.on("label", recording_handler("on"));
  let ctx = ContextData::new(ParcelFlow::default());

  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn skip_condition_bypasses_step() {
  setup_tracing();
  let light_parcel: SkipCondition<ParcelFlow> = Arc::new(|ctx: ContextData<ParcelFlow>| {
    let weight = ctx.read().weight_grams;
    weight < 100
  });
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[
    ("weigh", false, None),
    ("reinforce_box", false, Some(light_parcel)),
    ("dispatch", false, None),
  ]);
  p.on("weigh", recording_handler("weigh"));
  p.on("reinforce_box", recording_handler("reinforce_box"));
  p.on("dispatch", recording_handler("dispatch"));

  let light = ContextData::new(ParcelFlow {
    weight_grams: 50,
    ..Default::default()
  });
  p.run(light.clone()).await.unwrap();
  assert_eq!(light.read().steps_executed, vec!["weigh", "dispatch"]);

  let heavy = ContextData::new(ParcelFlow {
    weight_grams: 5_000,
    ..Default::default()
  });
  p.run(heavy.clone()).await.unwrap();
  assert_eq!(heavy.read().steps_executed, vec!["weigh", "reinforce_box", "dispatch"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_sees_writes_from_earlier_steps() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None), ("reinforce_box", false, None)]);
  let light_parcel: SkipCondition<ParcelFlow> = Arc::new(|ctx: ContextData<ParcelFlow>| {
    let weight = ctx.read().weight_grams;
    weight < 100
  });
  p.set_skip_condition("reinforce_box", Some(light_parcel));
  p.on("weigh", |ctx: ContextData<ParcelFlow>| async move {
    ctx.write().weight_grams = 10;
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  p.on("reinforce_box", recording_handler("reinforce_box"));
  let ctx = ContextData::new(ParcelFlow::default());

  p.run(ctx.clone()).await.unwrap();

  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None), ("gift_wrap", true, None)]);
  p.on("weigh", recording_handler("weigh"));
  let ctx = ContextData::new(ParcelFlow::default());

  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["weigh"]);
}

#[tokio::test]
#[serial]
async fn set_optional_relaxes_a_required_step() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("gift_wrap", false, None)]);
  p.set_optional("gift_wrap", true);

  assert!(p.run(ContextData::new(ParcelFlow::default())).await.is_ok());
}

#[tokio::test]
#[serial]
async fn handler_error_aborts_the_run() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None), ("label", false, None)]);
  p.on("weigh", failing_handler("weigh", "scale offline"));
  p.on("label", recording_handler("label"));
  let ctx = ContextData::new(ParcelFlow::default());

  let err = p.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("scale offline".to_string()));
  assert_eq!(ctx.read().steps_executed, vec!["weigh"]);
}

#[tokio::test]
#[serial]
async fn step_names_follow_declaration_order() {
  let p = three_steps();
  assert_eq!(p.step_names(), vec!["weigh", "label", "dispatch"]);
}

#[test]
#[should_panic(expected = "not declared")]
fn registering_on_unknown_step_panics() {
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None)]);
  p.on("wiegh", recording_handler("typo"));
}
