use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;

use crate::core::Atom;
use crate::core::Pid;
use crate::core::Term;
use crate::node::Node;

// -----------------------------------------------------------------------------
// Connection Error
// -----------------------------------------------------------------------------

/// Errors returned when writing to a peer connection.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConnectionError {
  /// The connection has been closed.
  Closed,
  /// The transport failed.
  Io(io::Error),
}

impl Display for ConnectionError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Closed => f.write_str("connection closed"),
      Self::Io(error) => write!(f, "connection i/o error: {error}"),
    }
  }
}

impl Error for ConnectionError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Closed => None,
      Self::Io(error) => Some(error),
    }
  }
}

impl From<io::Error> for ConnectionError {
  #[inline]
  fn from(other: io::Error) -> Self {
    Self::Io(other)
  }
}

// -----------------------------------------------------------------------------
// Handshake Error
// -----------------------------------------------------------------------------

/// Errors returned by a [`Handshake`]. All of them concern a single peer.
#[derive(Debug)]
#[non_exhaustive]
pub enum HandshakeError {
  /// The peer failed authentication.
  Auth(String),
  /// The peer violated the handshake protocol.
  Protocol(String),
  /// The peer socket failed during the handshake.
  Io(io::Error),
}

impl Display for HandshakeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Auth(info) => write!(f, "authentication failed: {info}"),
      Self::Protocol(info) => write!(f, "protocol error: {info}"),
      Self::Io(error) => write!(f, "i/o error: {error}"),
    }
  }
}

impl Error for HandshakeError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Auth(_) | Self::Protocol(_) => None,
      Self::Io(error) => Some(error),
    }
  }
}

impl From<io::Error> for HandshakeError {
  #[inline]
  fn from(other: io::Error) -> Self {
    Self::Io(other)
  }
}

// -----------------------------------------------------------------------------
// Connection
// -----------------------------------------------------------------------------

/// An established link to a peer node.
///
/// Implementations own the wire encoding. Inbound messages are handed to
/// [`Node::deliver`].
pub trait Connection: Send + Sync + 'static {
  /// Returns the name of the peer node.
  fn peer(&self) -> Atom;

  /// Sends `term` to the mailbox `to` on the peer.
  fn send(&self, to: Pid, term: Term) -> Result<(), ConnectionError>;

  /// Sends `term` to the mailbox registered as `name` on the peer.
  fn send_name(&self, name: Atom, term: Term) -> Result<(), ConnectionError>;

  /// Closes the connection. Must be idempotent.
  fn close(&self);
}

// -----------------------------------------------------------------------------
// Handshake
// -----------------------------------------------------------------------------

/// Turns an accepted socket into a [`Connection`].
pub trait Handshake: Send + Sync + 'static {
  fn accept(&self, node: &Node, stream: TcpStream) -> Result<Arc<dyn Connection>, HandshakeError>;
}

/// Handshake that refuses every peer.
///
/// Used when a node listens without a real handshake installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectHandshake;

impl Handshake for RejectHandshake {
  fn accept(&self, _node: &Node, _stream: TcpStream) -> Result<Arc<dyn Connection>, HandshakeError> {
    Err(HandshakeError::Protocol(String::from("no handshake configured")))
  }
}

impl<T> Handshake for std::sync::Arc<T>
where
  T: Handshake + ?Sized,
{
  #[inline]
  fn accept(&self, node: &Node, stream: TcpStream) -> Result<Arc<dyn Connection>, HandshakeError> {
    (**self).accept(node, stream)
  }
}
