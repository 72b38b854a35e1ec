#![allow(dead_code)]

use ernode::core::Atom;
use ernode::node::Discovery;
use ernode::node::DiscoveryError;
use ernode::node::NodeConfig;
use ernode::node::NodeEvents;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns a config with a node name unique to this test binary.
pub fn config(prefix: &str) -> NodeConfig {
  static NEXT: AtomicUsize = AtomicUsize::new(0);

  let index: usize = NEXT.fetch_add(1, Ordering::Relaxed);

  NodeConfig::default()
    .name(format!("{prefix}{index}@localhost"))
    .server_recv_timeout(Duration::from_millis(100))
    .worker_threads(2)
}

/// Polls `condition` until it holds or `RECV_TIMEOUT` passes.
pub fn wait_until<F>(mut condition: F) -> bool
where
  F: FnMut() -> bool,
{
  let deadline: Instant = Instant::now() + RECV_TIMEOUT;

  while Instant::now() < deadline {
    if condition() {
      return true;
    }

    thread::sleep(Duration::from_millis(10));
  }

  condition()
}

/// Records every node event and discovery call.
#[derive(Debug, Default)]
pub struct Recorder {
  pub status: Mutex<Vec<(Atom, bool, String)>>,
  pub attempts: Mutex<Vec<(String, bool, String)>>,
  pub output: Mutex<Vec<String>>,
  pub published: Mutex<Vec<(Atom, u16)>>,
  pub unpublished: Mutex<Vec<Atom>>,
  pub refuse_publish: bool,
}

impl Recorder {
  pub fn output(&self) -> Vec<String> {
    self.output.lock().unwrap().clone()
  }

  pub fn attempts(&self) -> Vec<(String, bool, String)> {
    self.attempts.lock().unwrap().clone()
  }

  pub fn status(&self) -> Vec<(Atom, bool, String)> {
    self.status.lock().unwrap().clone()
  }
}

impl NodeEvents for Recorder {
  fn on_node_status_change(&self, node: Atom, up: bool, info: &str) {
    self.status.lock().unwrap().push((node, up, info.to_owned()));
  }

  fn on_connect_attempt(&self, peer: &str, incoming: bool, info: &str) {
    self.attempts.lock().unwrap().push((peer.to_owned(), incoming, info.to_owned()));
  }

  fn on_io_output(&self, text: &str) {
    self.output.lock().unwrap().push(text.to_owned());
  }
}

impl Discovery for Recorder {
  fn publish(&self, node: Atom, port: u16) -> Result<(), DiscoveryError> {
    if self.refuse_publish {
      return Err(DiscoveryError::new("registration refused"));
    }

    self.published.lock().unwrap().push((node, port));
    Ok(())
  }

  fn unpublish(&self, node: Atom) {
    self.unpublished.lock().unwrap().push(node);
  }
}
