//! Tests for `kiln id`, `kiln validate` and `kiln info` against a recipe.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

fn ids(env: &TestEnv, extra: &[&str]) -> Value {
  let output = env
    .kiln()
    .arg("id")
    .arg(env.project())
    .args(["--os", "Emscripten", "--arch", "wasm", "-o", "json"])
    .args(extra)
    .output()
    .unwrap();
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
  let rows: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
  rows.into_iter().next().unwrap()
}

#[test]
fn id_is_stable_and_does_not_build() {
  let env = TestEnv::video_utils();

  let first = ids(&env, &[]);
  let second = ids(&env, &[]);

  assert_eq!(first["package_id"], second["package_id"]);
  assert_eq!(first["build_id"], second["build_id"]);
  assert_ne!(first["package_id"], first["build_id"]);
  assert!(!env.store().join("build").exists());
}

#[test]
fn options_move_the_package_id() {
  let env = TestEnv::video_utils();
  assert_ne!(
    ids(&env, &[])["package_id"],
    ids(&env, &["-O", "shared=true"])["package_id"]
  );
}

#[test]
fn tooling_moves_only_the_build_id() {
  let env = TestEnv::video_utils();
  let before = ids(&env, &[]);
  env.write_file("config.json", r#"{"tooling": {"emscripten": "3.1.9"}}"#);
  let after = ids(&env, &[]);

  assert_eq!(before["package_id"], after["package_id"]);
  assert_ne!(before["build_id"], after["build_id"]);
}

#[test]
fn cmake_toolchain_and_definitions_move_the_package_id() {
  let env = TestEnv::video_utils();
  let before = ids(&env, &[]);
  env.write_file(
    "config.json",
    r#"{"tooling": {"emscripten": "3.1.8"}, "cmake": {"toolchain_file": "/emsdk/Emscripten.cmake"}}"#,
  );
  let toolchain = ids(&env, &[]);
  env.write_file(
    "config.json",
    r#"{"tooling": {"emscripten": "3.1.8"}, "cmake": {"definitions": {"ENABLE_SIMD": "ON"}}}"#,
  );
  let definitions = ids(&env, &[]);

  assert_ne!(before["package_id"], toolchain["package_id"]);
  assert_ne!(before["build_id"], toolchain["build_id"]);
  assert_ne!(before["package_id"], definitions["package_id"]);
  assert_ne!(toolchain["package_id"], definitions["package_id"]);
}

#[test]
fn cmake_generator_moves_only_the_build_id() {
  let env = TestEnv::video_utils();
  let before = ids(&env, &[]);
  env.write_file(
    "config.json",
    r#"{"tooling": {"emscripten": "3.1.8"}, "cmake": {"generator": "Ninja"}}"#,
  );
  let after = ids(&env, &[]);

  assert_eq!(before["package_id"], after["package_id"]);
  assert_ne!(before["build_id"], after["build_id"]);
}

#[test]
fn validate_accepts_emscripten_and_rejects_others() {
  let env = TestEnv::video_utils();

  env
    .kiln()
    .arg("validate")
    .arg(env.project())
    .args(["--os", "Emscripten"])
    .assert()
    .success()
    .stdout(predicate::str::contains("vstvideoutils accepts"));

  env
    .kiln()
    .arg("validate")
    .arg(env.project())
    .args(["--os", "Windows"])
    .assert()
    .failure()
    .stderr(predicate::str::contains(
      "Windows not supported (only available for Emscripten)",
    ));
}

#[test]
fn unknown_option_fails_validation() {
  let env = TestEnv::video_utils();
  env
    .kiln()
    .arg("validate")
    .arg(env.project())
    .args(["--os", "Emscripten", "-O", "lto=true"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown option"));
}

#[test]
fn info_summarizes_the_recipe() {
  let env = TestEnv::video_utils();
  env
    .kiln()
    .arg("info")
    .arg(env.project())
    .assert()
    .success()
    .stdout(predicate::str::contains("Recipe vstvideoutils"))
    .stdout(predicate::str::contains("Emscripten"))
    .stdout(predicate::str::contains("1.7.2"))
    .stdout(predicate::str::contains("opencv/4.5.2"));
}
