use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Atom;

/// Error returned when the discovery service rejects a registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryError {
  info: String,
}

impl DiscoveryError {
  #[inline]
  pub fn new(info: impl Into<String>) -> Self {
    Self { info: info.into() }
  }
}

impl Display for DiscoveryError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "discovery failed: {}", self.info)
  }
}

impl Error for DiscoveryError {}

/// Name service mapping node names to listening ports.
pub trait Discovery: Send + Sync + 'static {
  /// Announces that `node` accepts connections on `port`.
  fn publish(&self, node: Atom, port: u16) -> Result<(), DiscoveryError>;

  /// Withdraws the announcement for `node`.
  fn unpublish(&self, node: Atom);
}

/// Discovery that publishes nowhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDiscovery;

impl Discovery for NoDiscovery {
  #[inline]
  fn publish(&self, _node: Atom, _port: u16) -> Result<(), DiscoveryError> {
    Ok(())
  }

  #[inline]
  fn unpublish(&self, _node: Atom) {}
}

impl<T> Discovery for std::sync::Arc<T>
where
  T: Discovery + ?Sized,
{
  #[inline]
  fn publish(&self, node: Atom, port: u16) -> Result<(), DiscoveryError> {
    (**self).publish(node, port)
  }

  #[inline]
  fn unpublish(&self, node: Atom) {
    (**self).unpublish(node);
  }
}
