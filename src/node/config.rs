use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use crate::consts;

/// Configuration of a local node.
///
/// All fields are public; the chaining setters cover the common ones.
#[derive(Clone, Debug)]
pub struct NodeConfig {
  // ---------------------------------------------------------------------------
  // Node Identity
  // ---------------------------------------------------------------------------
  pub name: String,
  // ---------------------------------------------------------------------------
  // Acceptor
  // ---------------------------------------------------------------------------
  pub listen: bool,
  pub port: u16,
  pub bind_addr: IpAddr,
  // ---------------------------------------------------------------------------
  // Tables and Mailboxes
  // ---------------------------------------------------------------------------
  pub atom_table_size: usize,
  pub server_recv_timeout: Duration,
  pub queue_wait_slice: Duration,
  pub mailbox_reuse_after: Duration,
  // ---------------------------------------------------------------------------
  // Tokio Runtime Configuration
  // ---------------------------------------------------------------------------
  pub rt_max_blocking_threads: usize,
  pub rt_shutdown_timeout: Duration,
  pub rt_thread_keep_alive: Duration,
  pub rt_thread_stack_size: usize,
  pub rt_worker_threads: usize,
  // ---------------------------------------------------------------------------
  // Tracing Subscriber Configuration
  // ---------------------------------------------------------------------------
  pub install_tracing: bool,
  pub tracing_source_file: bool,
  pub tracing_source_line: bool,
  pub tracing_source_name: bool,
  pub tracing_thread_info: bool,
  pub tracing_verbose: bool,
  pub tracing_very_verbose: bool,
}

impl NodeConfig {
  #[inline]
  pub fn new() -> Self {
    Self {
      name: String::from(consts::DEFAULT_NODE_NAME),
      listen: false,
      port: consts::DEFAULT_LISTEN_PORT,
      bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
      atom_table_size: consts::MAX_ATOM_COUNT,
      server_recv_timeout: consts::SERVER_RECV_TIMEOUT,
      queue_wait_slice: consts::QUEUE_WAIT_SLICE,
      mailbox_reuse_after: consts::MAILBOX_REUSE_AFTER,
      rt_max_blocking_threads: consts::DEFAULT_MAX_BLOCKING_THREADS,
      rt_shutdown_timeout: consts::SHUTDOWN_TIMEOUT,
      rt_thread_keep_alive: consts::DEFAULT_THREAD_KEEP_ALIVE,
      rt_thread_stack_size: consts::DEFAULT_THREAD_STACK_SIZE,
      rt_worker_threads: available_cpus(),
      install_tracing: false,
      tracing_source_file: false,
      tracing_source_line: false,
      tracing_source_name: false,
      tracing_thread_info: true,
      tracing_verbose: true,
      tracing_very_verbose: false,
    }
  }

  /// Sets the node name, e.g. `app@localhost`.
  #[inline]
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Enables the acceptor on `bind_addr:port`. Port 0 picks a free port.
  #[inline]
  pub fn listen(mut self, bind_addr: IpAddr, port: u16) -> Self {
    self.listen = true;
    self.bind_addr = bind_addr;
    self.port = port;
    self
  }

  #[inline]
  pub fn atom_table_size(mut self, size: usize) -> Self {
    self.atom_table_size = size;
    self
  }

  #[inline]
  pub fn server_recv_timeout(mut self, timeout: Duration) -> Self {
    self.server_recv_timeout = timeout;
    self
  }

  #[inline]
  pub fn queue_wait_slice(mut self, slice: Duration) -> Self {
    self.queue_wait_slice = slice;
    self
  }

  #[inline]
  pub fn mailbox_reuse_after(mut self, threshold: Duration) -> Self {
    self.mailbox_reuse_after = threshold;
    self
  }

  #[inline]
  pub fn worker_threads(mut self, count: usize) -> Self {
    self.rt_worker_threads = count.max(1);
    self
  }

  #[inline]
  pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
    self.rt_shutdown_timeout = timeout;
    self
  }

  #[inline]
  pub fn install_tracing(mut self, install: bool) -> Self {
    self.install_tracing = install;
    self
  }

  /// Returns the host part of the node name (after `@`), if any.
  #[inline]
  pub fn host(&self) -> Option<&str> {
    self.name.split_once('@').map(|(_, host)| host)
  }

  #[inline]
  pub const fn tracing_filter(&self) -> tracing::Level {
    if self.tracing_very_verbose {
      tracing::Level::TRACE
    } else if self.tracing_verbose {
      tracing::Level::DEBUG
    } else {
      tracing::Level::INFO
    }
  }
}

impl Default for NodeConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

/// Returns the number of available CPU cores.
///
/// Falls back to [`DEFAULT_PARALLELISM`] if CPU detection fails.
///
/// [`DEFAULT_PARALLELISM`]: consts::DEFAULT_PARALLELISM
fn available_cpus() -> usize {
  match thread::available_parallelism() {
    Ok(count) => count.get(),
    Err(_) => consts::DEFAULT_PARALLELISM,
  }
}
