use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use triomphe::Arc;

/// Shared flag reporting whether the owning node is still running.
///
/// Blocking receivers observe this between wait slices and give up once it
/// drops. Cloning yields another handle to the same flag.
#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct Liveness {
  inner: Arc<AtomicBool>,
}

impl Liveness {
  /// Creates a new flag in the alive state.
  #[inline]
  pub fn new() -> Self {
    Self {
      inner: Arc::new(AtomicBool::new(true)),
    }
  }

  /// Creates a flag that is not tied to any node.
  ///
  /// Used by free-standing queues; nothing will ever shut it down unless
  /// the caller does.
  #[inline]
  pub fn detached() -> Self {
    Self::new()
  }

  /// Returns `true` until [`shutdown`] is called on any handle.
  ///
  /// [`shutdown`]: Self::shutdown
  #[inline]
  pub fn is_alive(&self) -> bool {
    self.inner.load(Ordering::Acquire)
  }

  /// Drops the flag. Returns `true` if this call changed the state.
  #[inline]
  pub fn shutdown(&self) -> bool {
    self.inner.swap(false, Ordering::AcqRel)
  }
}

impl Default for Liveness {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use crate::utils::Liveness;

  #[test]
  fn test_shutdown_is_shared() {
    let a: Liveness = Liveness::new();
    let b: Liveness = a.clone();

    assert!(b.is_alive());
    assert!(a.shutdown());
    assert!(!b.is_alive());
    assert!(!b.shutdown());
  }
}
