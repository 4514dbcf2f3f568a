//! Parallel evaluations share the store safely.

use std::sync::Arc;
use std::time::Duration;

use kiln_lib::error::{ErrorClass, RecipeError};
use kiln_lib::eval::EvaluationRequest;
use kiln_lib::platform::{Arch, BuildType, Os, Platform};

use super::common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_identity_builds_once() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT).with_delay(Duration::from_millis(50));
  let evaluator = Arc::new(fixture.evaluator(build.clone()));

  let results = evaluator.evaluate_all(vec![wasm_request(); 4]).await;

  assert_eq!(build.calls(), 1);
  assert_eq!(build.peak(), 1);
  let reports: Vec<_> = results.into_iter().map(Result::unwrap).collect();
  assert_eq!(reports.iter().filter(|r| !r.cached).count(), 1);
  assert!(reports.iter().all(|r| r.package_id == reports[0].package_id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_identities_build_independently() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT).with_delay(Duration::from_millis(100));
  let evaluator = Arc::new(fixture.evaluator(build.clone()));

  let requests = [BuildType::Release, BuildType::Debug, BuildType::MinSizeRel]
    .into_iter()
    .map(|bt| EvaluationRequest::new(wasm_platform(bt)))
    .collect();
  let results = evaluator.evaluate_all(requests).await;

  assert_eq!(build.calls(), 3);
  assert!(build.peak() > 1, "distinct identities should not wait on each other");
  let reports: Vec<_> = results.into_iter().map(Result::unwrap).collect();
  assert_ne!(reports[0].build_dir, reports[1].build_dir);
  assert_ne!(reports[1].package_id, reports[2].package_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn results_keep_request_order_and_failures_stay_isolated() {
  let fixture = Fixture::video_utils();
  let evaluator = Arc::new(fixture.evaluator(FakeBuild::new(BUILD_OUTPUT)));

  let results = evaluator
    .evaluate_all(vec![
      wasm_request(),
      EvaluationRequest::new(Platform::new(Os::Linux, Arch::X86_64)),
      EvaluationRequest::new(wasm_platform(BuildType::Debug)),
    ])
    .await;

  assert_eq!(results.len(), 3);
  assert_eq!(results[0].as_ref().unwrap().platform.build_type, Some(BuildType::Release));
  assert!(results[1].is_err());
  assert_eq!(results[2].as_ref().unwrap().platform.build_type, Some(BuildType::Debug));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_deploy_directory_is_rejected() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = Arc::new(fixture.evaluator(build.clone()));
  let shared = fixture.temp.path().join("deploy");
  let own = fixture.temp.path().join("deploy-minsize");

  let results = evaluator
    .evaluate_all(vec![
      EvaluationRequest::new(wasm_platform(BuildType::Release)).with_deploy_dir(&shared),
      EvaluationRequest::new(wasm_platform(BuildType::Debug)).with_deploy_dir(&shared),
      EvaluationRequest::new(wasm_platform(BuildType::MinSizeRel)).with_deploy_dir(&own),
    ])
    .await;

  for result in &results[..2] {
    let err = result.as_ref().unwrap_err();
    assert!(matches!(err, RecipeError::DeployConflict { dir } if *dir == shared));
    assert_eq!(err.class(), ErrorClass::Configuration);
  }
  let report = results[2].as_ref().unwrap();
  assert_eq!(report.deployed.len(), 3);
  assert_eq!(build.calls(), 1);
  assert!(!shared.exists());
}
