//! Index of live mailboxes by pid and by registered name.
//!
//! Closed mailboxes go onto a free list and may be revived by a later
//! anonymous allocation once they have been idle long enough. Revival keeps
//! the mailbox pid.

use dashmap::DashMap;
use dashmap::Entry;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::time::Duration;
use triomphe::Arc;

use crate::consts::CAP_REGISTERED_MAILBOXES;
use crate::consts::MAILBOX_REUSE_AFTER;
use crate::consts::QUEUE_WAIT_SLICE;
use crate::core::Atom;
use crate::core::Pid;
use crate::mailbox::BlockingQueue;
use crate::mailbox::Mailbox;
use crate::utils::Liveness;

// -----------------------------------------------------------------------------
// Registry Error
// -----------------------------------------------------------------------------

/// Errors returned from mailbox creation.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
  /// A named mailbox was requested with the empty name.
  EmptyName,
}

impl Display for RegistryError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::EmptyName => f.write_str("mailbox name cannot be empty"),
    }
  }
}

impl Error for RegistryError {}

// -----------------------------------------------------------------------------
// Mailbox Registry
// -----------------------------------------------------------------------------

/// Concurrent registry of the mailboxes of one node.
///
/// # Invariants
///
/// - At most one mailbox per pid.
/// - A registered name maps to exactly one mailbox, and that mailbox
///   reports the name.
/// - A disposed mailbox never enters the free list.
pub struct MailboxRegistry {
  by_pid: DashMap<Pid, Arc<Mailbox>>,
  by_name: DashMap<Atom, Arc<Mailbox>>,
  free: Mutex<VecDeque<Arc<Mailbox>>>,
  liveness: Liveness,
  reuse_after: Duration,
  wait_slice: Duration,
}

impl MailboxRegistry {
  /// Creates an empty registry whose mailboxes observe `liveness`.
  #[inline]
  pub fn new(liveness: Liveness) -> Self {
    Self::with_settings(liveness, MAILBOX_REUSE_AFTER, QUEUE_WAIT_SLICE)
  }

  /// Creates an empty registry with explicit reuse and wait settings.
  pub fn with_settings(liveness: Liveness, reuse_after: Duration, wait_slice: Duration) -> Self {
    Self {
      by_pid: DashMap::with_capacity(CAP_REGISTERED_MAILBOXES),
      by_name: DashMap::with_capacity(CAP_REGISTERED_MAILBOXES),
      free: Mutex::new(VecDeque::new()),
      liveness,
      reuse_after,
      wait_slice,
    }
  }

  fn make(&self, pid: Pid, name: Option<Atom>) -> Arc<Mailbox> {
    let queue: BlockingQueue<_> = BlockingQueue::with_wait_slice(self.liveness.clone(), self.wait_slice);

    Arc::new(Mailbox::new(pid, name, queue))
  }

  /// Returns the mailbox registered as `name`, creating it if needed.
  ///
  /// `alloc` is only called when a new mailbox is created. Concurrent calls
  /// with the same name all observe the same mailbox.
  ///
  /// # Errors
  ///
  /// Returns [`RegistryError::EmptyName`] for the empty atom.
  pub fn create_named<F>(&self, name: Atom, alloc: F) -> Result<Arc<Mailbox>, RegistryError>
  where
    F: FnOnce() -> Pid,
  {
    if name.is_empty() {
      return Err(RegistryError::EmptyName);
    }

    match self.by_name.entry(name) {
      Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
      Entry::Vacant(entry) => {
        let mailbox: Arc<Mailbox> = self.make(alloc(), Some(name));

        self.by_pid.insert(mailbox.pid(), Arc::clone(&mailbox));
        entry.insert(Arc::clone(&mailbox));

        Ok(mailbox)
      }
    }
  }

  /// Returns a new unnamed mailbox.
  ///
  /// When `use_cache` is set, free-list entries are examined oldest first:
  /// disposed ones are discarded and the first one idle for at least the
  /// reuse threshold is revived. Otherwise `alloc` provides a fresh pid.
  pub fn create_anonymous<F>(&self, use_cache: bool, alloc: F) -> Arc<Mailbox>
  where
    F: FnOnce() -> Pid,
  {
    if use_cache {
      if let Some(mailbox) = self.revive() {
        return mailbox;
      }
    }

    let mailbox: Arc<Mailbox> = self.make(alloc(), None);

    self.by_pid.insert(mailbox.pid(), Arc::clone(&mailbox));

    mailbox
  }

  fn revive(&self) -> Option<Arc<Mailbox>> {
    let mut free: MutexGuard<'_, VecDeque<Arc<Mailbox>>> = self.free.lock();

    'scan: loop {
      let head: &Arc<Mailbox> = free.front()?;

      if head.is_disposed() {
        free.pop_front();
        continue 'scan;
      }

      if head.idle_for() < self.reuse_after {
        // Entries behind the head were closed later still.
        break 'scan None;
      }

      let mailbox: Arc<Mailbox> = free.pop_front()?;

      drop(free);

      mailbox.queue().clear();
      mailbox.queue().activate();
      mailbox.set_name(None);
      mailbox.touch();

      self.by_pid.insert(mailbox.pid(), Arc::clone(&mailbox));

      break 'scan Some(mailbox);
    }
  }

  /// Adds `mailbox` to the pid index.
  ///
  /// Returns `false` without changes if its pid is already registered.
  pub fn register(&self, mailbox: &Arc<Mailbox>) -> bool {
    match self.by_pid.entry(mailbox.pid()) {
      Entry::Occupied(_) => false,
      Entry::Vacant(entry) => {
        entry.insert(Arc::clone(mailbox));
        true
      }
    }
  }

  /// Binds `name` to `mailbox`.
  ///
  /// Returns `false` without changes if `name` is empty or already taken,
  /// or if `mailbox` is not live in this registry. A previous name of the
  /// mailbox is released.
  pub fn register_name(&self, name: Atom, mailbox: &Arc<Mailbox>) -> bool {
    if name.is_empty() || !self.is_live(mailbox) {
      return false;
    }

    match self.by_name.entry(name) {
      Entry::Occupied(_) => return false,
      Entry::Vacant(entry) => {
        entry.insert(Arc::clone(mailbox));
      }
    }

    if let Some(previous) = mailbox.name() {
      self
        .by_name
        .remove_if(&previous, |_, other| Arc::ptr_eq(other, mailbox));
    }

    mailbox.set_name(Some(name));

    true
  }

  #[inline]
  fn is_live(&self, mailbox: &Arc<Mailbox>) -> bool {
    self
      .by_pid
      .get(&mailbox.pid())
      .is_some_and(|entry| Arc::ptr_eq(entry.value(), mailbox))
  }

  /// Releases the name bound to `name`, keeping the mailbox alive.
  ///
  /// Returns `false` if nothing was bound.
  pub fn unregister_name(&self, name: Atom) -> bool {
    match self.by_name.remove(&name) {
      Some((_, mailbox)) => {
        mailbox.set_name(None);
        true
      }
      None => false,
    }
  }

  /// Removes `mailbox` from both indices.
  ///
  /// Unless disposed, the mailbox is deactivated, emptied, stamped, and put
  /// on the free list.
  pub fn unregister(&self, mailbox: &Arc<Mailbox>) {
    if let Some(name) = mailbox.name() {
      self
        .by_name
        .remove_if(&name, |_, other| Arc::ptr_eq(other, mailbox));

      mailbox.set_name(None);
    }

    let removed: bool = self
      .by_pid
      .remove_if(&mailbox.pid(), |_, other| Arc::ptr_eq(other, mailbox))
      .is_some();

    if !removed || mailbox.is_disposed() {
      return;
    }

    mailbox.queue().deactivate();
    mailbox.queue().clear();
    mailbox.touch();

    self.free.lock().push_back(Arc::clone(mailbox));
  }

  /// Returns the mailbox registered as `name`.
  #[inline]
  pub fn get_name(&self, name: Atom) -> Option<Arc<Mailbox>> {
    self.by_name.get(&name).map(|entry| Arc::clone(entry.value()))
  }

  /// Returns the mailbox with `pid`.
  #[inline]
  pub fn get_pid(&self, pid: Pid) -> Option<Arc<Mailbox>> {
    self.by_pid.get(&pid).map(|entry| Arc::clone(entry.value()))
  }

  /// Returns the number of live mailboxes.
  #[inline]
  pub fn len(&self) -> usize {
    self.by_pid.len()
  }

  /// Returns `true` if no mailbox is live.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.by_pid.is_empty()
  }

  /// Returns the currently registered names.
  pub fn names(&self) -> Vec<Atom> {
    self.by_name.iter().map(|entry| *entry.key()).collect()
  }

  /// Returns the number of mailboxes waiting on the free list.
  #[inline]
  pub fn free_len(&self) -> usize {
    self.free.lock().len()
  }

  /// Empties both indices and the free list.
  ///
  /// Every live mailbox is deactivated so blocked receivers return.
  pub fn clear(&self) {
    for entry in self.by_pid.iter() {
      entry.value().queue().deactivate();
    }

    self.by_name.clear();
    self.by_pid.clear();
    self.free.lock().clear();
  }
}

impl Debug for MailboxRegistry {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("MailboxRegistry")
      .field("mailboxes", &self.by_pid.len())
      .field("names", &self.names())
      .field("free", &self.free_len())
      .finish()
  }
}
