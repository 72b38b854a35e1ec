//! Blocking FIFO used as the storage of every mailbox.

use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::time::Duration;
use std::time::Instant;

use crate::consts::CAP_MAILBOX_QUEUE;
use crate::consts::QUEUE_WAIT_SLICE;
use crate::utils::Liveness;
use crate::utils::time;

// -----------------------------------------------------------------------------
// Blocking Queue
// -----------------------------------------------------------------------------

/// Unbounded FIFO with blocking, timed, and non-blocking removal.
///
/// # States
///
/// A queue is *active* on creation. Deactivating it releases every blocked
/// receiver; items enqueued while inactive are kept and become visible once
/// the queue is activated again. Disposal is a permanent deactivation that
/// also drops the remaining items.
///
/// # Waiting
///
/// Blocking receivers wait in slices of at most [`QUEUE_WAIT_SLICE`] and
/// check the node [`Liveness`] between slices, so even an infinite wait
/// ends shortly after the node goes down.
pub struct BlockingQueue<T> {
  state: Mutex<State<T>>,
  ready: Condvar,
  liveness: Liveness,
  slice: Duration,
}

struct State<T> {
  items: VecDeque<T>,
  active: bool,
  disposed: bool,
}

impl<T> BlockingQueue<T> {
  /// Creates an active queue tied to `liveness`.
  #[inline]
  pub fn new(liveness: Liveness) -> Self {
    Self::with_wait_slice(liveness, QUEUE_WAIT_SLICE)
  }

  /// Creates an active queue that waits in slices of `slice`.
  pub fn with_wait_slice(liveness: Liveness, slice: Duration) -> Self {
    Self {
      state: Mutex::new(State {
        items: VecDeque::with_capacity(CAP_MAILBOX_QUEUE),
        active: true,
        disposed: false,
      }),
      ready: Condvar::new(),
      liveness,
      slice: slice.max(Duration::from_millis(1)),
    }
  }

  /// Appends an item.
  ///
  /// Always succeeds, even on an inactive or disposed queue. A waiting
  /// receiver is signalled when the queue goes from empty to non-empty.
  pub fn enqueue(&self, item: T) {
    let mut guard: MutexGuard<'_, State<T>> = self.state.lock();

    guard.items.push_back(item);

    if guard.items.len() == 1 {
      self.ready.notify_one();
    }
  }

  /// Removes the head item without blocking.
  ///
  /// Returns `None` if the queue is inactive or empty.
  pub fn try_dequeue(&self) -> Option<T> {
    let mut guard: MutexGuard<'_, State<T>> = self.state.lock();

    if !guard.active {
      return None;
    }

    guard.items.pop_front()
  }

  /// Removes the head item, blocking until one arrives.
  ///
  /// `None` waits without a deadline, as does a timeout too large to
  /// represent. Returns `None` on timeout, when the
  /// queue is deactivated, or when the liveness flag drops.
  pub fn dequeue(&self, timeout: Option<Duration>) -> Option<T> {
    let deadline: Option<Instant> = timeout.and_then(time::deadline);
    let mut guard: MutexGuard<'_, State<T>> = self.state.lock();

    'wait: loop {
      if !guard.active || !self.liveness.is_alive() {
        break 'wait None;
      }

      if let Some(item) = guard.items.pop_front() {
        // Only the first enqueue signals, so pass the wakeup along.
        if !guard.items.is_empty() {
          self.ready.notify_one();
        }

        break 'wait Some(item);
      }

      let slice: Duration = match deadline {
        None => self.slice,
        Some(deadline) => {
          let now: Instant = Instant::now();

          if now >= deadline {
            break 'wait None;
          }

          (deadline - now).min(self.slice)
        }
      };

      self.ready.wait_for(&mut guard, slice);
    }
  }

  /// Drops every queued item.
  #[inline]
  pub fn clear(&self) {
    self.state.lock().items.clear();
  }

  /// Returns `true` if the queue is active.
  #[inline]
  pub fn is_active(&self) -> bool {
    self.state.lock().active
  }

  /// Returns `true` if the queue has been disposed.
  #[inline]
  pub fn is_disposed(&self) -> bool {
    self.state.lock().disposed
  }

  /// Re-activates the queue. Has no effect once disposed.
  pub fn activate(&self) {
    let mut guard: MutexGuard<'_, State<T>> = self.state.lock();

    if !guard.disposed {
      guard.active = true;
    }
  }

  /// Deactivates the queue, releasing every blocked receiver.
  pub fn deactivate(&self) {
    self.state.lock().active = false;
    self.ready.notify_all();
  }

  /// Permanently deactivates the queue and drops its items.
  pub fn dispose(&self) {
    let mut guard: MutexGuard<'_, State<T>> = self.state.lock();

    guard.active = false;
    guard.disposed = true;
    guard.items.clear();

    drop(guard);

    self.ready.notify_all();
  }

  /// Returns the number of queued items at the time of the call.
  #[inline]
  pub fn len(&self) -> usize {
    self.state.lock().items.len()
  }

  /// Returns `true` if no items are queued.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T> Default for BlockingQueue<T> {
  #[inline]
  fn default() -> Self {
    Self::new(Liveness::detached())
  }
}

impl<T> Debug for BlockingQueue<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    let guard: MutexGuard<'_, State<T>> = self.state.lock();

    f.debug_struct("BlockingQueue")
      .field("len", &guard.items.len())
      .field("active", &guard.active)
      .field("disposed", &guard.disposed)
      .finish()
  }
}
