//! Tests for `kiln create`.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

fn create_json(env: &TestEnv, extra: &[&str]) -> Vec<Value> {
  let output = env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm", "-o", "json"])
    .args(extra)
    .output()
    .unwrap();
  assert!(
    output.status.success(),
    "create failed: {}",
    String::from_utf8_lossy(&output.stderr)
  );
  serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn create_builds_and_packages() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();

  let outcomes = create_json(&env, &[]);
  assert_eq!(outcomes.len(), 1);
  let report = &outcomes[0];
  assert_eq!(report["status"], "ok");
  assert_eq!(report["recipe"], "vstvideoutils");
  assert_eq!(report["version"], "1.7.2");
  assert_eq!(report["cached"], false);

  let package_dir = std::path::PathBuf::from(report["package_dir"].as_str().unwrap());
  assert!(package_dir.starts_with(env.store()));
  assert!(package_dir.join("wasm/VideoUtils.js").is_file());
  assert!(package_dir.join("wasm/VideoUtils.wasm").is_file());

  let calls = env.cmake_calls();
  assert_eq!(calls.len(), 2);
  assert!(calls[0].starts_with("-S "));
  assert!(calls[0].contains("-DCMAKE_BUILD_TYPE=Release"));
  assert!(calls[0].contains("-Dopencv_ROOT="));
  assert!(calls[1].starts_with("--build "));
}

#[test]
fn second_create_reuses_the_build() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();

  let first = create_json(&env, &[]);
  let second = create_json(&env, &[]);

  assert_eq!(second[0]["cached"], true);
  assert_eq!(first[0]["package_id"], second[0]["package_id"]);
  assert_eq!(env.cmake_calls().len(), 2);
}

#[test]
fn several_build_types_evaluate_together() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();

  let outcomes = create_json(&env, &["--build-type", "Release", "--build-type", "Debug"]);
  assert_eq!(outcomes.len(), 2);
  assert_ne!(outcomes[0]["package_id"], outcomes[1]["package_id"]);
  assert_eq!(env.cmake_calls().len(), 4);
}

#[test]
fn create_deploys_into_target() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();
  let target = env.temp.path().join("webapp");

  env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm", "--deploy"])
    .arg(&target)
    .assert()
    .success()
    .stdout(predicate::str::contains("vstvideoutils/1.7.2"));

  assert!(target.join("bin/VideoUtils.wasm").is_file());
  assert!(target.join("src/VideoUtils.js").is_file());
}

#[test]
fn unsupported_os_never_runs_cmake() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();

  env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Linux", "--arch", "x86_64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains(
      "Linux not supported (only available for Emscripten)",
    ))
    .stderr(predicate::str::contains("[configuration]"));

  assert!(env.cmake_calls().is_empty());
  assert!(!env.store().join("build").exists());
}

#[test]
fn failed_build_reports_cmake_stderr() {
  use std::os::unix::fs::PermissionsExt;

  let env = TestEnv::video_utils();
  let script = env.temp.path().join("tools/cmake");
  env.write_file(
    "tools/cmake",
    "#!/bin/sh\necho 'CMake Error: Could not find OpenCV' >&2\nexit 1\n",
  );
  std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
  env.write_config(Some(&script));

  env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("build failed during configure"))
    .stderr(predicate::str::contains("CMake Error: Could not find OpenCV"));
}

#[test]
fn missing_dependency_is_retryable_in_json() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();
  std::fs::remove_dir_all(env.registry().join("ffmpeg")).unwrap();

  let output = env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm", "-o", "json"])
    .output()
    .unwrap();
  assert!(!output.status.success());

  let outcomes: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(outcomes[0]["status"], "failed");
  assert_eq!(outcomes[0]["class"], "dependency_resolution");
  assert_eq!(outcomes[0]["retryable"], true);
  assert!(env.cmake_calls().is_empty());
}

#[test]
fn deploy_refuses_several_platforms() {
  let env = TestEnv::video_utils();
  env.install_fake_cmake();
  let target = env.temp.path().join("webapp");

  env
    .kiln()
    .arg("create")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm"])
    .args(["--build-type", "Release", "--build-type", "Debug"])
    .arg("--deploy")
    .arg(&target)
    .assert()
    .failure()
    .stderr(predicate::str::contains("--deploy copies into one directory"));

  assert!(env.cmake_calls().is_empty());
  assert!(!target.exists());
}
