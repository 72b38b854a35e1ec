//! Listener thread accepting inbound peer connections.
//!
//! # Lifecycle
//!
//! ```text
//! Created -> Publishing -> Running -> Stopping -> Stopped
//! ```
//!
//! The socket is bound in `Created`, the port is announced through the
//! node's [`Discovery`] in `Publishing`, and the accept loop runs in
//! `Running`. Leaving the loop (by [`Acceptor::stop`] or a listener failure)
//! withdraws the announcement before reaching `Stopped`.
//!
//! [`Discovery`]: crate::node::Discovery

use parking_lot::Mutex;
use socket2::Domain;
use socket2::Protocol;
use socket2::SockAddr;
use socket2::SockRef;
use socket2::Socket;
use socket2::Type;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::net::TcpStream;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use tracing::Level;
use tracing::Span;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::span;
use tracing::warn;
use triomphe::Arc;

use crate::consts::ACCEPTOR_WAKE_TIMEOUT;
use crate::consts::LISTEN_BACKLOG;
use crate::error::panic_message;
use crate::node::DiscoveryError;
use crate::node::HandshakeError;
use crate::node::Node;

// -----------------------------------------------------------------------------
// Acceptor Error
// -----------------------------------------------------------------------------

/// Errors returned when starting an [`Acceptor`].
#[derive(Debug)]
#[non_exhaustive]
pub enum AcceptorError {
  /// The listening socket could not be created or bound.
  Bind(io::Error),
  /// The discovery service rejected the port.
  Publish(DiscoveryError),
  /// The accept thread could not be spawned.
  Spawn(io::Error),
}

impl Display for AcceptorError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Bind(error) => write!(f, "failed to bind listener: {error}"),
      Self::Publish(error) => Display::fmt(error, f),
      Self::Spawn(error) => write!(f, "failed to spawn acceptor: {error}"),
    }
  }
}

impl Error for AcceptorError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Bind(error) | Self::Spawn(error) => Some(error),
      Self::Publish(error) => Some(error),
    }
  }
}

// -----------------------------------------------------------------------------
// Acceptor State
// -----------------------------------------------------------------------------

/// Lifecycle state of an [`Acceptor`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AcceptorState {
  Created,
  Publishing,
  Running,
  Stopping,
  Stopped,
}

// -----------------------------------------------------------------------------
// Acceptor
// -----------------------------------------------------------------------------

/// Owns the listening socket and the thread accepting on it.
pub struct Acceptor {
  shared: Arc<Shared>,
  thread: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
  listener: TcpListener,
  local: SocketAddr,
  running: AtomicBool,
  state: Mutex<AcceptorState>,
}

impl Shared {
  #[inline]
  fn set_state(&self, state: AcceptorState) {
    *self.state.lock() = state;
  }

  #[inline]
  fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }
}

impl Acceptor {
  /// Binds `bind_addr:port`, publishes the port, and starts accepting.
  ///
  /// Port 0 binds an ephemeral port; see [`port`] for the result.
  ///
  /// [`port`]: Self::port
  pub fn start(node: &Arc<Node>, bind_addr: IpAddr, port: u16) -> Result<Self, AcceptorError> {
    let listener: TcpListener = bind(SocketAddr::new(bind_addr, port)).map_err(AcceptorError::Bind)?;
    let local: SocketAddr = listener.local_addr().map_err(AcceptorError::Bind)?;

    let shared: Arc<Shared> = Arc::new(Shared {
      listener,
      local,
      running: AtomicBool::new(false),
      state: Mutex::new(AcceptorState::Created),
    });

    shared.set_state(AcceptorState::Publishing);

    if let Err(error) = node.discovery().publish(node.name(), local.port()) {
      shared.set_state(AcceptorState::Stopped);
      return Err(AcceptorError::Publish(error));
    }

    shared.running.store(true, Ordering::Release);
    shared.set_state(AcceptorState::Running);

    let thread: JoinHandle<()> = {
      let shared: Arc<Shared> = Arc::clone(&shared);
      let node: Arc<Node> = Arc::clone(node);

      thread::Builder::new()
        .name(String::from("ernode-acceptor"))
        .spawn(move || run(shared, node))
    }
    .map_err(|error| {
      shared.running.store(false, Ordering::Release);
      node.discovery().unpublish(node.name());
      shared.set_state(AcceptorState::Stopped);
      AcceptorError::Spawn(error)
    })?;

    info!(target: "ernode", addr = %local, "acceptor listening");

    Ok(Self {
      shared,
      thread: Mutex::new(Some(thread)),
    })
  }

  /// Returns the bound port.
  #[inline]
  pub fn port(&self) -> u16 {
    self.shared.local.port()
  }

  /// Returns the bound address.
  #[inline]
  pub fn local_addr(&self) -> SocketAddr {
    self.shared.local
  }

  /// Returns the current lifecycle state.
  #[inline]
  pub fn state(&self) -> AcceptorState {
    *self.shared.state.lock()
  }

  /// Stops accepting and waits for the accept thread to exit.
  ///
  /// Safe to call more than once.
  pub fn stop(&self) {
    if self.shared.running.swap(false, Ordering::AcqRel) {
      self.shared.set_state(AcceptorState::Stopping);

      // Unblock `accept`: shutting down a listening socket suffices on
      // Linux, the wake-up connection covers the other platforms.
      let _ignore: io::Result<()> = SockRef::from(&self.shared.listener).shutdown(Shutdown::Both);
      let _ignore: io::Result<TcpStream> = TcpStream::connect_timeout(&wake_addr(self.shared.local), ACCEPTOR_WAKE_TIMEOUT);
    }

    let handle: Option<JoinHandle<()>> = self.thread.lock().take();

    if let Some(handle) = handle {
      if handle.thread().id() == thread::current().id() {
        return;
      }

      if handle.join().is_err() {
        error!(target: "ernode", "acceptor thread panicked outside its guard");
        self.shared.set_state(AcceptorState::Stopped);
      }
    }
  }
}

impl Debug for Acceptor {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Acceptor")
      .field("addr", &self.shared.local)
      .field("state", &self.state())
      .finish()
  }
}

impl Drop for Acceptor {
  fn drop(&mut self) {
    self.stop();
  }
}

// -----------------------------------------------------------------------------
// Accept Loop
// -----------------------------------------------------------------------------

fn run(shared: Arc<Shared>, node: Arc<Node>) {
  let span: Span = span!(target: "ernode", Level::DEBUG, "acceptor", addr = %shared.local);

  debug!(target: "ernode", parent: &span, "polling");

  let outcome: Result<io::Result<()>, String> =
    panic::catch_unwind(AssertUnwindSafe(|| accept_loop(&shared, &node, &span)))
      .map_err(|payload| panic_message(payload.as_ref()));

  let failure: Option<String> = match outcome {
    Ok(Ok(())) => None,
    Ok(Err(error)) => Some(error.to_string()),
    Err(message) => Some(format!("panic: {message}")),
  };

  if let Some(info) = failure.as_deref() {
    error!(target: "ernode", parent: &span, info, "listener failed");

    shared.running.store(false, Ordering::Release);
    shared.set_state(AcceptorState::Stopping);

    let _ignore: io::Result<()> = SockRef::from(&shared.listener).shutdown(Shutdown::Both);

    node.events().on_node_status_change(node.name(), false, info);
  }

  node.discovery().unpublish(node.name());
  shared.set_state(AcceptorState::Stopped);

  debug!(target: "ernode", parent: &span, "exiting");
}

fn accept_loop(shared: &Shared, node: &Node, span: &Span) -> io::Result<()> {
  'accept: loop {
    let (stream, peer): (TcpStream, SocketAddr) = match shared.listener.accept() {
      Ok(accepted) => accepted,
      Err(_) if !shared.is_running() => break 'accept Ok(()),
      Err(error) if error.kind() == io::ErrorKind::Interrupted => continue 'accept,
      Err(error) => break 'accept Err(error),
    };

    if !shared.is_running() {
      let _ignore: io::Result<()> = stream.shutdown(Shutdown::Both);
      break 'accept Ok(());
    }

    debug!(target: "ernode", parent: span, %peer, "accepted");

    match node.handshake().accept(node, stream) {
      Ok(connection) => {
        debug!(target: "ernode", parent: span, %peer, node = %connection.peer(), "handshake complete");
        node.add_connection(connection);
      }
      Err(error) => {
        // The handshake owned the socket; it is closed by now.
        warn!(target: "ernode", parent: span, %peer, %error, "handshake failed");
        handshake_failed(node, peer, &error);
      }
    }
  }
}

#[inline]
fn handshake_failed(node: &Node, peer: SocketAddr, error: &HandshakeError) {
  node
    .events()
    .on_connect_attempt(&peer.to_string(), true, &error.to_string());
}

// -----------------------------------------------------------------------------
// Socket Helpers
// -----------------------------------------------------------------------------

fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
  let socket: Socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

  socket.set_reuse_address(true)?;
  socket.bind(&SockAddr::from(addr))?;
  socket.listen(LISTEN_BACKLOG)?;

  Ok(socket.into())
}

/// Returns an address that reaches a listener bound to `local`.
fn wake_addr(local: SocketAddr) -> SocketAddr {
  match local.ip() {
    IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port()),
    IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port()),
    _ => local,
  }
}

#[cfg(test)]
mod tests {
  use std::net::IpAddr;
  use std::net::Ipv4Addr;
  use std::net::SocketAddr;
  use std::net::TcpListener;

  use super::bind;
  use super::wake_addr;

  #[test]
  fn test_bind_ephemeral() {
    let listener: TcpListener = bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)).unwrap();

    assert_ne!(listener.local_addr().unwrap().port(), 0);
  }

  #[test]
  fn test_wake_addr_unspecified() {
    let addr: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 4369);

    assert_eq!(wake_addr(addr), SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4369));
  }
}
