use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::trace;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Creates a new tracked unit of work.
///
/// Nodes receive one of these when they are started and call it exactly once
/// per activation to obtain the task their execution runs under.
pub type TaskFactory = Arc<dyn Fn() -> Task + Send + Sync>;

#[derive(Debug, Default)]
struct TaskState {
  /// Subtasks created but not yet finished.
  pending: usize,
  done: bool,
  finished: bool,
}

struct TaskInner {
  id: u64,
  parent: Option<Task>,
  state: Mutex<TaskState>,
  idle: watch::Sender<usize>,
}

/// A tracked unit of work.
///
/// Cloning a `Task` yields another handle to the same unit.
#[derive(Clone)]
pub struct Task {
  inner: Arc<TaskInner>,
}

impl Task {
  /// Create a root task with no parent.
  pub fn new() -> Self {
    Self::with_parent(None)
  }

  fn with_parent(parent: Option<Task>) -> Self {
    let (idle, _) = watch::channel(0);
    Self {
      inner: Arc::new(TaskInner {
        id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        parent,
        state: Mutex::new(TaskState::default()),
        idle,
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, TaskState> {
    // A poisoned lock only means a holder panicked; the counters stay valid.
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Unique (per process) identifier of this task.
  pub fn id(&self) -> u64 {
    self.inner.id
  }

  /// Create a tracked child of this task.
  ///
  /// The child counts as pending until it is marked done and all of its own
  /// subtasks have finished.
  pub fn new_subtask(&self) -> Task {
    {
      let mut state = self.lock();
      state.pending += 1;
      self.inner.idle.send_replace(state.pending);
    }
    let child = Task::with_parent(Some(self.clone()));
    trace!(task_id = child.id(), parent_id = self.id(), "subtask created");
    child
  }

  /// Returns a factory producing subtasks of this task.
  pub fn factory(&self) -> TaskFactory {
    let task = self.clone();
    Arc::new(move || task.new_subtask())
  }

  /// Mark this unit as complete.
  ///
  /// The unit finishes once its subtasks have finished as well, at which
  /// point its parent is released. Calling `done` more than once is a no-op.
  pub fn done(&self) {
    let finished = {
      let mut state = self.lock();
      if state.done {
        return;
      }
      state.done = true;
      Self::try_finish(&mut state)
    };
    if finished {
      self.finish();
    }
  }

  fn subtask_finished(&self) {
    let finished = {
      let mut state = self.lock();
      state.pending = state.pending.saturating_sub(1);
      self.inner.idle.send_replace(state.pending);
      Self::try_finish(&mut state)
    };
    if finished {
      self.finish();
    }
  }

  fn try_finish(state: &mut TaskState) -> bool {
    if state.done && state.pending == 0 && !state.finished {
      state.finished = true;
      return true;
    }
    false
  }

  fn finish(&self) {
    trace!(task_id = self.id(), "task finished");
    if let Some(parent) = &self.inner.parent {
      parent.subtask_finished();
    }
  }

  /// Wait until every subtask created so far has finished.
  ///
  /// This does not wait for the task itself to be marked done, so a unit may
  /// wait on its own descendants from within its execution.
  pub async fn wait(&self) {
    let mut idle = self.inner.idle.subscribe();
    // The sender lives in `self`, so the channel cannot close while we wait.
    let _ = idle.wait_for(|pending| *pending == 0).await;
  }

  /// Number of subtasks that have not finished yet.
  pub fn pending(&self) -> usize {
    self.lock().pending
  }

  /// Whether this task is done and all of its subtasks have finished.
  pub fn is_finished(&self) -> bool {
    self.lock().finished
  }
}

impl Default for Task {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.lock();
    f.debug_struct("Task")
      .field("id", &self.inner.id)
      .field("pending", &state.pending)
      .field("done", &state.done)
      .field("finished", &state.finished)
      .finish()
  }
}
