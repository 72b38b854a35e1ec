use parking_lot::Mutex;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::time::Duration;
use std::time::Instant;

use crate::core::Atom;
use crate::core::Pid;
use crate::core::Term;
use crate::mailbox::BlockingQueue;

/// Addressable endpoint owning a queue of incoming terms.
///
/// A mailbox is identified by its [`Pid`] and may additionally be bound to
/// a registered name. Mailboxes are shared between the registry and their
/// users through [`triomphe::Arc`].
pub struct Mailbox {
  pid: Pid,
  name: Mutex<Option<Atom>>,
  queue: BlockingQueue<Term>,
  last_used: Mutex<Instant>,
}

impl Mailbox {
  pub(crate) fn new(pid: Pid, name: Option<Atom>, queue: BlockingQueue<Term>) -> Self {
    Self {
      pid,
      name: Mutex::new(name),
      queue,
      last_used: Mutex::new(Instant::now()),
    }
  }

  /// Returns the pid of this mailbox.
  #[inline]
  pub const fn pid(&self) -> Pid {
    self.pid
  }

  /// Returns the registered name, if any.
  #[inline]
  pub fn name(&self) -> Option<Atom> {
    *self.name.lock()
  }

  #[inline]
  pub(crate) fn set_name(&self, name: Option<Atom>) {
    *self.name.lock() = name;
  }

  /// Returns the underlying queue.
  #[inline]
  pub fn queue(&self) -> &BlockingQueue<Term> {
    &self.queue
  }

  /// Deposits a term into this mailbox.
  #[inline]
  pub fn deliver(&self, term: Term) {
    self.queue.enqueue(term);
  }

  /// Waits for the next term; see [`BlockingQueue::dequeue`].
  #[inline]
  pub fn receive(&self, timeout: Option<Duration>) -> Option<Term> {
    let term: Option<Term> = self.queue.dequeue(timeout);

    if term.is_some() {
      self.touch();
    }

    term
  }

  /// Returns the next term if one is queued.
  #[inline]
  pub fn try_receive(&self) -> Option<Term> {
    self.queue.try_dequeue()
  }

  /// Returns the number of queued terms.
  #[inline]
  pub fn len(&self) -> usize {
    self.queue.len()
  }

  /// Returns `true` if no terms are queued.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Permanently retires this mailbox. It will never be reused.
  #[inline]
  pub fn dispose(&self) {
    self.queue.dispose();
  }

  /// Returns `true` if this mailbox has been disposed.
  #[inline]
  pub fn is_disposed(&self) -> bool {
    self.queue.is_disposed()
  }

  #[inline]
  pub(crate) fn touch(&self) {
    *self.last_used.lock() = Instant::now();
  }

  /// Returns how long ago this mailbox was last used.
  #[inline]
  pub fn idle_for(&self) -> Duration {
    self.last_used.lock().elapsed()
  }
}

impl Debug for Mailbox {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Mailbox")
      .field("pid", &self.pid)
      .field("name", &self.name())
      .field("queue", &self.queue)
      .finish()
  }
}
