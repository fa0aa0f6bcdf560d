//! Registry of resources to release once a workflow run is over.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type CloseFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// One or more close functions failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to close {} resource(s): {}", .errors.len(), join_errors(.errors))]
pub struct CloseError {
  pub errors: Vec<BoxError>,
}

fn join_errors(errors: &[BoxError]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

/// Collects close functions and runs them in reverse registration order.
#[derive(Default)]
pub struct Closer {
  fns: Mutex<Vec<CloseFn>>,
}

impl Closer {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Vec<CloseFn>> {
    self
      .fns
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Register a close function.
  pub fn add<F>(&self, f: F)
  where
    F: FnOnce() -> Result<(), BoxError> + Send + 'static,
  {
    self.lock().push(Box::new(f));
  }

  /// Create a nested closer, closed as a single entry of this one.
  pub fn add_closer(&self) -> Arc<Closer> {
    let child = Arc::new(Closer::new());
    let nested = Arc::clone(&child);
    self.add(move || nested.close().map_err(Into::into));
    child
  }

  /// Number of close functions waiting to run.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Run every registered close function once, last registered first.
  ///
  /// All functions run even if some fail; failures are collected.
  pub fn close(&self) -> Result<(), CloseError> {
    let fns = std::mem::take(&mut *self.lock());
    debug!(count = fns.len(), "closing resources");

    let errors: Vec<BoxError> = fns.into_iter().rev().filter_map(|f| f().err()).collect();
    if errors.is_empty() {
      Ok(())
    } else {
      Err(CloseError { errors })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Log = Arc<Mutex<Vec<&'static str>>>;

  fn record(log: Log, name: &'static str) -> impl FnOnce() -> Result<(), BoxError> + Send + 'static {
    move || {
      log.lock().unwrap().push(name);
      Ok(())
    }
  }

  #[test]
  fn test_close_runs_in_reverse_order() {
    let log: Log = Arc::default();
    let closer = Closer::new();
    closer.add(record(log.clone(), "first"));
    closer.add(record(log.clone(), "second"));

    closer.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
  }

  #[test]
  fn test_close_drains_registry() {
    let log: Log = Arc::default();
    let closer = Closer::new();
    closer.add(record(log.clone(), "once"));
    assert_eq!(closer.len(), 1);

    closer.close().unwrap();
    closer.close().unwrap();
    assert!(closer.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["once"]);
  }

  #[test]
  fn test_close_collects_every_failure() {
    let log: Log = Arc::default();
    let closer = Closer::new();
    closer.add(|| Err("socket".into()));
    closer.add(record(log.clone(), "file"));
    closer.add(|| Err("decoder".into()));

    let err = closer.close().unwrap_err();
    assert_eq!(err.errors.len(), 2);
    assert_eq!(
      err.to_string(),
      "failed to close 2 resource(s): decoder; socket"
    );
    assert_eq!(*log.lock().unwrap(), vec!["file"]);
  }

  #[test]
  fn test_nested_closer_closes_as_one_entry() {
    let log: Log = Arc::default();
    let closer = Closer::new();
    closer.add(record(log.clone(), "outer"));
    let nested = closer.add_closer();
    nested.add(record(log.clone(), "inner-a"));
    nested.add(record(log.clone(), "inner-b"));

    assert_eq!(closer.len(), 2);
    closer.close().unwrap();
    assert_eq!(
      *log.lock().unwrap(),
      vec!["inner-b", "inner-a", "outer"]
    );
  }
}
