//! A minimal recurring-task scheduler over `tokio::time::interval`.

use std::{future::Future, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

/// Handle to a task that runs `tick` every `period`, starting immediately.
///
/// Ticks never overlap: the next one waits for the previous to finish, and
/// ticks missed while a slow run was in progress are skipped rather than
/// replayed back to back. Cancelling only prevents future ticks; a tick in
/// progress runs to completion.
#[derive(Debug)]
pub struct PeriodicTask {
  stop:   watch::Sender<bool>,
  handle: JoinHandle<()>,
}

impl PeriodicTask {
  /// Spawn onto the current tokio runtime.
  pub fn spawn<T, Fut>(period: Duration, mut tick: T) -> Self
  where
    T: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let (stop, mut stopped) = watch::channel(false);
    let handle = tokio::spawn(async move {
      let mut interval = tokio::time::interval(period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        tokio::select! {
          _ = interval.tick() => {}
          _ = stopped.changed() => break,
        }
        if *stopped.borrow() {
          break;
        }
        tick().await;
      }
    });

    Self { stop, handle }
  }

  /// Stop scheduling further ticks. Safe to call repeatedly.
  pub fn cancel(&self) { self.stop.send_replace(true); }

  pub fn is_finished(&self) -> bool { self.handle.is_finished() }
}

impl Drop for PeriodicTask {
  fn drop(&mut self) { self.cancel(); }
}
