//! End-to-end evaluations of the video utilities recipe.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use kiln_lib::base::{BaseCapability, StandardBase};
use kiln_lib::build::BuildFailure;
use kiln_lib::error::{ErrorClass, RecipeError};
use kiln_lib::eval::{EvaluationRequest, Hook};
use kiln_lib::identity::{Identity, IdentityComputer};
use kiln_lib::pins::{DependencyPin, PinSet};
use kiln_lib::platform::{Arch, BuildType, Os, Platform};
use kiln_lib::recipe::{BuildOptions, RecipeDef};
use kiln_lib::util::hash::{Fingerprint, HashError};

use super::common::*;

#[tokio::test]
async fn emscripten_evaluation_builds_and_packages() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());

  let report = evaluator.evaluate(wasm_request()).await.unwrap();

  assert_eq!(build.calls(), 1);
  assert_eq!(report.recipe, "vstvideoutils");
  assert_eq!(report.version.as_str(), "1.7.2");
  assert!(!report.package_id.as_str().is_empty());
  assert_ne!(report.package_id, report.build_id);
  assert!(!report.cached);
  assert_eq!(
    report.requires,
    BTreeMap::from([
      ("ffmpeg".to_string(), "4.2.4".to_string()),
      ("opencv".to_string(), "4.5.2".to_string()),
      ("openh264".to_string(), "2.1.0".to_string()),
    ])
  );

  assert_eq!(report.package_dir, fixture.store().package_dir(&report.package_id));
  assert_eq!(
    files_under(&report.package_dir),
    ["wasm/VideoUtils.js", "wasm/VideoUtils.wasm", "wasm/VideoUtils.worker.js"]
  );
  assert!(report.deployed.is_empty());
}

/// Delegates setup and pins to the standard base but hands out fixed identities.
struct FixedIdentityBase(StandardBase);

impl BaseCapability for FixedIdentityBase {
  fn setup(&self, recipe: &RecipeDef, recipe_path: &Path) -> Result<(), RecipeError> {
    self.0.setup(recipe, recipe_path)
  }

  fn common_pins(&self) -> Vec<DependencyPin> {
    self.0.common_pins()
  }

  fn package_id(
    &self,
    _computer: &IdentityComputer,
    _platform: &Platform,
    _pins: &PinSet,
    _options: &BuildOptions,
  ) -> Result<Identity, HashError> {
    Ok(Fingerprint("fixedpackage00000000".to_string()))
  }

  fn build_id(
    &self,
    _computer: &IdentityComputer,
    _platform: &Platform,
    _pins: &PinSet,
    _options: &BuildOptions,
    _build_inputs: &BTreeMap<String, String>,
  ) -> Result<Identity, HashError> {
    Ok(Fingerprint("fixedbuild0000000000".to_string()))
  }
}

#[tokio::test]
async fn store_layout_follows_base_identities() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator_with_base(build.clone(), Arc::new(FixedIdentityBase(StandardBase::default())));

  let report = evaluator.evaluate(wasm_request()).await.unwrap();
  let package_id = Fingerprint("fixedpackage00000000".to_string());
  let build_id = Fingerprint("fixedbuild0000000000".to_string());

  assert_eq!(report.package_id, package_id);
  assert_eq!(report.build_id, build_id);
  assert_eq!(report.build_dir, fixture.store().build_dir(&build_id));
  assert_eq!(report.package_dir, fixture.store().package_dir(&package_id));
  assert!(fixture.store().build_dir(&build_id).join("bin/VideoUtils.wasm").is_file());
  assert!(fixture.store().lock_path(&package_id).exists());

  let identities = evaluator.identities(wasm_request()).await.unwrap();
  assert_eq!(identities.package_id, package_id);
  assert_eq!(identities.build_id, build_id);
}

#[tokio::test]
async fn unsupported_os_fails_before_any_side_effect() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());

  for os in [Os::Linux, Os::Windows, Os::from("OtherOS")] {
    let request = EvaluationRequest::new(Platform::new(os.clone(), Arch::X86_64));
    let err = evaluator.evaluate(request.clone()).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Configuration);
    assert_eq!(
      err.to_string(),
      format!("{} not supported (only available for Emscripten)", os)
    );

    let ctx = evaluator.run_hooks(&[Hook::Init], request.clone()).await.unwrap();
    let err = evaluator.run_hook(Hook::Validate, ctx).await.unwrap_err();
    assert!(matches!(err, RecipeError::UnsupportedPlatform { .. }));
  }

  assert_eq!(build.calls(), 0);
  assert!(!fixture.store().root().exists());
}

#[tokio::test]
async fn pins_are_not_assembled_when_validation_fails() {
  let fixture = Fixture::video_utils();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));

  let request = EvaluationRequest::new(Platform::new(Os::Linux, Arch::X86_64));
  let ctx = evaluator.run_hooks(&[Hook::Init], request).await.unwrap();
  assert!(evaluator.run_hook(Hook::Validate, ctx.clone()).await.is_err());
  assert_eq!(ctx.completed(), [Hook::Init]);
  assert!(ctx.pins(Hook::Build).is_err());
}

#[tokio::test]
async fn second_evaluation_reuses_the_build() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());

  let first = evaluator.evaluate(wasm_request()).await.unwrap();
  let second = evaluator.evaluate(wasm_request()).await.unwrap();

  assert_eq!(build.calls(), 1);
  assert!(second.cached);
  assert_eq!(first.package_id, second.package_id);
  assert_eq!(first.build_id, second.build_id);
}

#[tokio::test]
async fn tooling_change_rebuilds_without_moving_the_package() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());
  let tooling = |v: &str| BTreeMap::from([("emscripten".to_string(), v.to_string())]);

  let old = evaluator
    .evaluate(wasm_request().with_build_inputs(tooling("3.1.8")))
    .await
    .unwrap();
  let new = evaluator
    .evaluate(wasm_request().with_build_inputs(tooling("3.1.9")))
    .await
    .unwrap();

  assert_eq!(build.calls(), 2);
  assert_eq!(old.package_id, new.package_id);
  assert_ne!(old.build_id, new.build_id);
}

#[tokio::test]
async fn option_overrides_change_the_package_identity() {
  let fixture = Fixture::video_utils();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));

  let default = evaluator.identities(wasm_request()).await.unwrap();
  let shared = evaluator
    .identities(wasm_request().with_option("shared", "true"))
    .await
    .unwrap();
  assert_ne!(default.package_id, shared.package_id);

  let err = evaluator
    .identities(wasm_request().with_option("lto", "true"))
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::Configuration);
}

#[tokio::test]
async fn identities_match_the_full_evaluation_without_building() {
  let fixture = Fixture::video_utils();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());

  let ids = evaluator.identities(wasm_request()).await.unwrap();
  assert_eq!(build.calls(), 0);

  let report = evaluator.evaluate(wasm_request()).await.unwrap();
  assert_eq!(ids.package_id, report.package_id);
  assert_eq!(ids.build_id, report.build_id);
}

#[tokio::test]
async fn common_pins_are_overridden_by_recipe_pins() {
  let fixture = Fixture::video_utils();
  let common = vec![
    DependencyPin::new("ffmpeg", "4.1.0").unwrap(),
    DependencyPin::new("zlib", "1.2.11").unwrap(),
  ];
  std::fs::create_dir_all(fixture.registry_root().join("zlib/1.2.11")).unwrap();
  let evaluator = fixture.evaluator_with_common(FakeBuild::new(BUILD_OUTPUT), common);

  let report = evaluator.evaluate(wasm_request()).await.unwrap();
  assert_eq!(report.requires["ffmpeg"], "4.2.4");
  assert_eq!(report.requires["zlib"], "1.2.11");
}

#[tokio::test]
async fn deploy_copies_js_and_wasm_only() {
  let fixture = Fixture::video_utils();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));
  let target = fixture.temp.path().join("webapp/public");

  let report = evaluator
    .evaluate(wasm_request().with_deploy_dir(&target))
    .await
    .unwrap();

  assert_eq!(report.deployed.len(), 3);
  assert_eq!(
    files_under(&target),
    ["bin/VideoUtils.wasm", "bin/VideoUtils.worker.js", "src/VideoUtils.js"]
  );
}

#[tokio::test]
async fn missing_interface_file_is_a_missing_artifact() {
  let fixture = Fixture::video_utils();
  let output: Vec<_> = BUILD_OUTPUT
    .iter()
    .copied()
    .filter(|(rel, _)| *rel != "src/VideoUtils.js")
    .collect();
  let evaluator = fixture.evaluator(FakeBuild::new(&output));

  let err = evaluator.evaluate(wasm_request()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::MissingArtifact);
  assert!(err.to_string().contains("VideoUtils.js"));
}

#[tokio::test]
async fn unresolvable_pin_fails_before_building() {
  let fixture = Fixture::video_utils();
  std::fs::remove_dir_all(fixture.registry_root().join("opencv")).unwrap();
  let build = FakeBuild::new(BUILD_OUTPUT);
  let evaluator = fixture.evaluator(build.clone());

  let err = evaluator.evaluate(wasm_request()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::DependencyResolution);
  assert!(err.class().is_retryable());
  assert!(err.to_string().contains("opencv"));
  assert_eq!(build.calls(), 0);
}

#[tokio::test]
async fn build_failure_detail_is_preserved() {
  let fixture = Fixture::video_utils();
  let detail = "CMake Error at CMakeLists.txt:7 (find_package):\n  Could not find a package configuration file provided by \"OpenCV\"";
  let evaluator = fixture.evaluator(FakeBuild::failing(BuildFailure::new("configure", detail)));

  let err = evaluator.evaluate(wasm_request()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Build);
  match err {
    RecipeError::Build(failure) => {
      assert_eq!(failure.stage, "configure");
      assert_eq!(failure.detail, detail);
    }
    other => panic!("expected build failure, got {other}"),
  }
}

#[tokio::test]
async fn missing_manifest_is_a_manifest_error() {
  let fixture = Fixture::video_utils();
  std::fs::remove_file(fixture.temp.path().join("project/CMakeLists.txt")).unwrap();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));

  let err = evaluator.evaluate(wasm_request()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Manifest);
}

#[tokio::test]
async fn hook_out_of_order_is_reported() {
  let fixture = Fixture::video_utils();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));

  let err = evaluator.run_hooks(&[Hook::Package], wasm_request()).await.unwrap_err();
  assert!(matches!(
    err,
    RecipeError::HookOutOfOrder {
      hook: Hook::Package,
      requires: Hook::Build
    }
  ));
}

#[tokio::test]
async fn build_type_is_identity_relevant() {
  let fixture = Fixture::video_utils();
  let evaluator = fixture.evaluator(FakeBuild::new(BUILD_OUTPUT));

  let release = evaluator.identities(wasm_request()).await.unwrap();
  let debug = evaluator
    .identities(EvaluationRequest::new(wasm_platform(BuildType::Debug)))
    .await
    .unwrap();
  assert_ne!(release.package_id, debug.package_id);
}
