//! Test utilities for kiln-lib.
//!
//! [`FakeInvoker`] stands in for the native build system: it writes a fixed
//! set of files into the output directory (or fails) and counts its calls.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::build::{BuildFailure, BuildInvoker, BuildRequest, OutputTree};

#[derive(Debug, Clone)]
pub struct FakeInvoker {
  files: Vec<(String, String)>,
  failure: Option<BuildFailure>,
  calls: Arc<AtomicUsize>,
}

impl FakeInvoker {
  /// Succeeds, leaving `files` (relative path, content) in the output tree.
  pub fn writing(files: &[(&str, &str)]) -> Self {
    Self {
      files: files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect(),
      failure: None,
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn failing(failure: BuildFailure) -> Self {
    Self {
      failure: Some(failure),
      ..Self::writing(&[])
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl BuildInvoker for FakeInvoker {
  async fn invoke(&self, request: &BuildRequest) -> Result<OutputTree, BuildFailure> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = &self.failure {
      return Err(failure.clone());
    }
    for (rel, content) in &self.files {
      write_file(&request.output_dir, rel, content);
    }
    Ok(OutputTree::new(&request.output_dir))
  }
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}
