//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const VIDEO_UTILS_RECIPE: &str = r#"
return {
  name = "vstvideoutils",
  supported_os = "Emscripten",
  build_requires = { "openh264/2.1.0", "ffmpeg/4.2.4", "opencv/4.5.2" },
  package = {
    { pattern = "*", src = "bin", dst = "wasm" },
    { pattern = "VideoUtils.js", src = "src", dst = "wasm" },
  },
  deploy = { "*.js", "*.wasm" },
}
"#;

/// Stands in for cmake: the build stage leaves an Emscripten-like tree and
/// every call is appended to `calls.log` next to the script.
#[cfg(unix)]
pub const FAKE_CMAKE: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
if [ "$1" = "--build" ]; then
  mkdir -p "$2/bin" "$2/src"
  printf 'wasm' > "$2/bin/VideoUtils.wasm"
  printf 'loader' > "$2/src/VideoUtils.js"
fi
exit 0
"#;

/// Isolated project, registry, store and config.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn video_utils() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file("project/recipe.lua", VIDEO_UTILS_RECIPE);
    env.write_file("project/CMakeLists.txt", "project(VideoUtils VERSION 1.7.2)\n");
    for dep in ["openh264/2.1.0", "ffmpeg/4.2.4", "opencv/4.5.2"] {
      std::fs::create_dir_all(env.registry().join(dep)).unwrap();
    }
    env.write_config(None);
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Point the config at `cmake` (or leave the default).
  pub fn write_config(&self, cmake: Option<&Path>) {
    let mut config = serde_json::json!({ "tooling": { "emscripten": "3.1.8" } });
    if let Some(program) = cmake {
      config["cmake"] = serde_json::json!({ "program": program });
    }
    std::fs::write(self.config_path(), config.to_string()).unwrap();
  }

  /// Install the fake cmake script and return its path.
  #[cfg(unix)]
  pub fn install_fake_cmake(&self) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = self.temp.path().join("tools/cmake");
    self.write_file("tools/cmake", FAKE_CMAKE);
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    self.write_config(Some(&script));
    script
  }

  pub fn cmake_calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.temp.path().join("tools/calls.log"))
      .map(|s| s.lines().map(str::to_string).collect())
      .unwrap_or_default()
  }

  pub fn project(&self) -> PathBuf {
    self.temp.path().join("project")
  }

  pub fn registry(&self) -> PathBuf {
    self.temp.path().join("registry")
  }

  pub fn store(&self) -> PathBuf {
    self.temp.path().join("store")
  }

  pub fn config_path(&self) -> PathBuf {
    self.temp.path().join("config.json")
  }

  pub fn kiln(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("kiln");
    cmd
      .env("KILN_STORE", self.store())
      .env("KILN_REGISTRY", self.registry())
      .env("KILN_CONFIG", self.config_path())
      .env_remove("RUST_LOG");
    cmd
  }
}
