use tracing::info;
use tracing::warn;

use crate::core::Atom;

/// Callbacks fired by the node on notable events.
///
/// Every method has a default that logs through `tracing`, so implementors
/// only override what they care about. Callbacks run on the thread that
/// observed the event and must not block for long.
pub trait NodeEvents: Send + Sync + 'static {
  /// A node (this one or a peer) came up or went down.
  fn on_node_status_change(&self, node: Atom, up: bool, info: &str) {
    info!(target: "ernode", %node, up, info, "node status changed");
  }

  /// A connection attempt finished; `info` describes a failure.
  fn on_connect_attempt(&self, peer: &str, incoming: bool, info: &str) {
    warn!(target: "ernode", peer, incoming, info, "connection attempt failed");
  }

  /// Text written through the `user` I/O server.
  fn on_io_output(&self, text: &str) {
    info!(target: "ernode", "{text}");
  }
}

/// Event hooks that only log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEvents;

impl NodeEvents for LogEvents {}

impl<T> NodeEvents for std::sync::Arc<T>
where
  T: NodeEvents + ?Sized,
{
  #[inline]
  fn on_node_status_change(&self, node: Atom, up: bool, info: &str) {
    (**self).on_node_status_change(node, up, info);
  }

  #[inline]
  fn on_connect_attempt(&self, peer: &str, incoming: bool, info: &str) {
    (**self).on_connect_attempt(peer, incoming, info);
  }

  #[inline]
  fn on_io_output(&self, text: &str) {
    (**self).on_io_output(text);
  }
}
