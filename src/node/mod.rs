//! The local node: mailboxes, routing, peer connections, and services.
//!
//! A [`Node`] owns the mailbox registry, allocates pids and references,
//! routes terms to local mailboxes or peer connections, and runs the `rex`
//! (RPC) and `user` (I/O) servers plus an optional [`Acceptor`].
//!
//! Service threads keep the node alive; call [`Node::close`] to stop them.

mod acceptor;
mod config;
mod connection;
mod discovery;
mod events;

pub use self::acceptor::Acceptor;
pub use self::acceptor::AcceptorError;
pub use self::acceptor::AcceptorState;
pub use self::config::NodeConfig;
pub use self::connection::Connection;
pub use self::connection::ConnectionError;
pub use self::connection::Handshake;
pub use self::connection::HandshakeError;
pub use self::connection::RejectHandshake;
pub use self::discovery::Discovery;
pub use self::discovery::DiscoveryError;
pub use self::discovery::NoDiscovery;
pub use self::events::LogEvents;
pub use self::events::NodeEvents;

use dashmap::DashMap;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::sync::Arc as SharedDyn;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::runtime::Runtime as TokioRuntime;
use tracing::Level;
use tracing::Span;
use tracing::debug;
use tracing::info;
use tracing::span;
use tracing::warn;
use triomphe::Arc;

use crate::core::Atom;
use crate::core::AtomTable;
use crate::core::AtomTableError;
use crate::core::Pid;
use crate::core::Reference;
use crate::core::Term;
use crate::error::Exception;
use crate::init;
use crate::mailbox::Mailbox;
use crate::mailbox::MailboxRegistry;
use crate::mailbox::RegistryError;
use crate::server;
use crate::server::Functions;
use crate::utils::Liveness;
use crate::utils::measure::measure_fn;

// -----------------------------------------------------------------------------
// Node Error
// -----------------------------------------------------------------------------

/// Errors returned from node startup and mailbox creation.
#[derive(Debug)]
#[non_exhaustive]
pub enum NodeError {
  /// A node or mailbox name could not be interned.
  InvalidName(AtomTableError),
  /// The registry rejected a mailbox.
  Registry(RegistryError),
  /// The async runtime could not be built.
  Runtime(Exception),
  /// The acceptor failed to start.
  Acceptor(AcceptorError),
  /// A service thread could not be spawned.
  Spawn(io::Error),
  /// The node has been closed.
  Closed,
}

impl Display for NodeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::InvalidName(error) => write!(f, "invalid name: {error}"),
      Self::Registry(error) => Display::fmt(error, f),
      Self::Runtime(error) => write!(f, "failed to build runtime: {error}"),
      Self::Acceptor(error) => Display::fmt(error, f),
      Self::Spawn(error) => write!(f, "failed to spawn service: {error}"),
      Self::Closed => f.write_str("node is closed"),
    }
  }
}

impl Error for NodeError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::InvalidName(error) => Some(error),
      Self::Registry(error) => Some(error),
      Self::Runtime(error) => Some(error),
      Self::Acceptor(error) => Some(error),
      Self::Spawn(error) => Some(error),
      Self::Closed => None,
    }
  }
}

impl From<AtomTableError> for NodeError {
  #[inline]
  fn from(other: AtomTableError) -> Self {
    Self::InvalidName(other)
  }
}

impl From<RegistryError> for NodeError {
  #[inline]
  fn from(other: RegistryError) -> Self {
    Self::Registry(other)
  }
}

impl From<AcceptorError> for NodeError {
  #[inline]
  fn from(other: AcceptorError) -> Self {
    Self::Acceptor(other)
  }
}

// -----------------------------------------------------------------------------
// Destination
// -----------------------------------------------------------------------------

/// Local delivery target: a pid or a registered name.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Dest {
  Pid(Pid),
  Name(Atom),
}

impl From<Pid> for Dest {
  #[inline]
  fn from(other: Pid) -> Self {
    Self::Pid(other)
  }
}

impl From<Atom> for Dest {
  #[inline]
  fn from(other: Atom) -> Self {
    Self::Name(other)
  }
}

impl Display for Dest {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Pid(pid) => Display::fmt(pid, f),
      Self::Name(name) => Display::fmt(name, f),
    }
  }
}

// -----------------------------------------------------------------------------
// Node Builder
// -----------------------------------------------------------------------------

/// Collects the collaborators of a [`Node`] before starting it.
pub struct NodeBuilder {
  config: NodeConfig,
  functions: Functions,
  handshake: Box<dyn Handshake>,
  discovery: Box<dyn Discovery>,
  events: Box<dyn NodeEvents>,
}

impl NodeBuilder {
  #[inline]
  pub fn new(config: NodeConfig) -> Self {
    Self {
      config,
      functions: Functions::new(),
      handshake: Box::new(RejectHandshake),
      discovery: Box::new(NoDiscovery),
      events: Box::new(LogEvents),
    }
  }

  /// Sets the functions callable through `rex`.
  #[inline]
  pub fn functions(mut self, functions: Functions) -> Self {
    self.functions = functions;
    self
  }

  #[inline]
  pub fn handshake(mut self, handshake: impl Handshake) -> Self {
    self.handshake = Box::new(handshake);
    self
  }

  #[inline]
  pub fn discovery(mut self, discovery: impl Discovery) -> Self {
    self.discovery = Box::new(discovery);
    self
  }

  #[inline]
  pub fn events(mut self, events: impl NodeEvents) -> Self {
    self.events = Box::new(events);
    self
  }

  /// Starts the node; see [`Node::start`].
  pub fn start(self) -> Result<Arc<Node>, NodeError> {
    Node::start_boxed(self)
  }
}

// -----------------------------------------------------------------------------
// Node
// -----------------------------------------------------------------------------

/// A running local node.
pub struct Node {
  name: Atom,
  config: NodeConfig,
  liveness: Liveness,
  registry: MailboxRegistry,
  sequence: AtomicU32,
  connections: DashMap<Atom, SharedDyn<dyn Connection>>,
  handshake: Box<dyn Handshake>,
  discovery: Box<dyn Discovery>,
  events: Box<dyn NodeEvents>,
  runtime: Mutex<Option<TokioRuntime>>,
  handle: Handle,
  services: Mutex<Vec<JoinHandle<()>>>,
  acceptor: Mutex<Option<Acceptor>>,
  closed: AtomicBool,
}

impl Node {
  /// Returns a builder for a node with the given configuration.
  #[inline]
  pub fn builder(config: NodeConfig) -> NodeBuilder {
    NodeBuilder::new(config)
  }

  /// Starts a node.
  ///
  /// Sizes the process-wide atom table (first node only), optionally
  /// installs the tracing subscriber, builds the async runtime, starts the
  /// `rex` and `user` servers, and starts the acceptor if
  /// [`NodeConfig::listen`] is set.
  pub fn start(
    config: NodeConfig,
    functions: Functions,
    handshake: impl Handshake,
    discovery: impl Discovery,
    events: impl NodeEvents,
  ) -> Result<Arc<Self>, NodeError> {
    NodeBuilder::new(config)
      .functions(functions)
      .handshake(handshake)
      .discovery(discovery)
      .events(events)
      .start()
  }

  fn start_boxed(builder: NodeBuilder) -> Result<Arc<Self>, NodeError> {
    let NodeBuilder {
      config,
      functions,
      handshake,
      discovery,
      events,
    } = builder;

    let span: Span = span!(target: "ernode", Level::DEBUG, "node::start", name = %config.name);

    if config.install_tracing {
      if let Err(error) = init::init_tracing_subscriber(&config) {
        eprintln!("failed to set tracing subscriber:");
        eprintln!("    {}", error.error());
      }
    }

    if !AtomTable::init_global(config.atom_table_size) {
      debug!(target: "ernode", parent: &span, "atom table already initialized");
    }

    let name: Atom = Atom::try_new(&config.name)?;
    let runtime: TokioRuntime = init::build_tokio_runtime(&config).map_err(NodeError::Runtime)?;
    let handle: Handle = runtime.handle().clone();
    let liveness: Liveness = Liveness::new();

    let registry: MailboxRegistry = MailboxRegistry::with_settings(
      liveness.clone(),
      config.mailbox_reuse_after,
      config.queue_wait_slice,
    );

    let this: Arc<Self> = Arc::new(Self {
      name,
      config,
      liveness,
      registry,
      sequence: AtomicU32::new(1),
      connections: DashMap::new(),
      handshake,
      discovery,
      events,
      runtime: Mutex::new(Some(runtime)),
      handle,
      services: Mutex::new(Vec::new()),
      acceptor: Mutex::new(None),
      closed: AtomicBool::new(false),
    });

    if let Err(error) = Self::start_services(&this, functions) {
      this.close();
      return Err(error);
    }

    info!(target: "ernode", parent: &span, node = %this.name, "node started");

    this.events.on_node_status_change(this.name, true, "started");

    Ok(this)
  }

  fn start_services(this: &Arc<Self>, functions: Functions) -> Result<(), NodeError> {
    let rex: JoinHandle<()> = server::rpc::spawn(this, functions)?;
    this.services.lock().push(rex);

    let user: JoinHandle<()> = server::io::spawn(this)?;
    this.services.lock().push(user);

    if this.config.listen {
      let acceptor: Acceptor = Acceptor::start(this, this.config.bind_addr, this.config.port)?;
      *this.acceptor.lock() = Some(acceptor);
    }

    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  /// Returns the name of this node.
  #[inline]
  pub fn name(&self) -> Atom {
    self.name
  }

  /// Returns the configuration this node was started with.
  #[inline]
  pub fn config(&self) -> &NodeConfig {
    &self.config
  }

  /// Returns `true` until [`close`] is called.
  ///
  /// [`close`]: Self::close
  #[inline]
  pub fn is_alive(&self) -> bool {
    self.liveness.is_alive()
  }

  /// Returns the mailbox registry.
  #[inline]
  pub fn registry(&self) -> &MailboxRegistry {
    &self.registry
  }

  /// Returns the event hooks.
  #[inline]
  pub fn events(&self) -> &dyn NodeEvents {
    &*self.events
  }

  #[inline]
  pub(crate) fn handshake(&self) -> &dyn Handshake {
    &*self.handshake
  }

  #[inline]
  pub(crate) fn discovery(&self) -> &dyn Discovery {
    &*self.discovery
  }

  /// Returns a handle to the runtime executing RPC work.
  #[inline]
  pub fn runtime_handle(&self) -> &Handle {
    &self.handle
  }

  /// Returns the acceptor port, if the node listens.
  #[inline]
  pub fn port(&self) -> Option<u16> {
    self.acceptor.lock().as_ref().map(Acceptor::port)
  }

  /// Returns the acceptor state, if the node listens.
  #[inline]
  pub fn acceptor_state(&self) -> Option<AcceptorState> {
    self.acceptor.lock().as_ref().map(Acceptor::state)
  }

  // ---------------------------------------------------------------------------
  // Identity Allocation
  // ---------------------------------------------------------------------------

  /// Allocates a new pid on this node.
  #[inline]
  pub fn create_pid(&self) -> Pid {
    Pid::from_sequence(self.name, self.sequence.fetch_add(1, Ordering::Relaxed))
  }

  /// Allocates a new reference on this node.
  #[inline]
  pub fn create_ref(&self) -> Reference {
    Reference::new(self.name)
  }

  // ---------------------------------------------------------------------------
  // Mailboxes
  // ---------------------------------------------------------------------------

  /// Returns the mailbox registered as `name`, creating it if needed.
  pub fn create_mbox(&self, name: &str) -> Result<Arc<Mailbox>, NodeError> {
    if !self.is_alive() {
      return Err(NodeError::Closed);
    }

    let name: Atom = Atom::try_new(name)?;
    let mailbox: Arc<Mailbox> = self.registry.create_named(name, || self.create_pid())?;

    Ok(mailbox)
  }

  /// Returns a new unnamed mailbox, reusing an idle one when possible.
  #[inline]
  pub fn create_anonymous_mbox(&self) -> Arc<Mailbox> {
    self.registry.create_anonymous(true, || self.create_pid())
  }

  /// Closes `mailbox`, returning it to the free list.
  #[inline]
  pub fn close_mbox(&self, mailbox: &Arc<Mailbox>) {
    self.registry.unregister(mailbox);
  }

  /// Binds `name` to `mailbox`. Returns `false` if the name is taken.
  #[inline]
  pub fn register_name(&self, name: Atom, mailbox: &Arc<Mailbox>) -> bool {
    self.registry.register_name(name, mailbox)
  }

  /// Returns the pid registered as `name`.
  #[inline]
  pub fn whereis(&self, name: Atom) -> Option<Pid> {
    self.registry.get_name(name).map(|mailbox| mailbox.pid())
  }

  // ---------------------------------------------------------------------------
  // Routing
  // ---------------------------------------------------------------------------

  /// Sends `term` to `to`, locally or through the peer connection.
  ///
  /// Returns `false` if the term was dropped.
  pub fn send(&self, to: Pid, term: Term) -> bool {
    if to.node() == self.name {
      return self.deliver(to, term);
    }

    match self.connection(to.node()) {
      Some(connection) => match connection.send(to, term) {
        Ok(()) => true,
        Err(error) => {
          warn!(target: "ernode", %to, %error, "remote send failed");
          false
        }
      },
      None => {
        debug!(target: "ernode", %to, "no connection; message dropped");
        false
      }
    }
  }

  /// Sends `term` to the local mailbox registered as `name`.
  #[inline]
  pub fn send_name(&self, name: Atom, term: Term) -> bool {
    self.deliver(name, term)
  }

  /// Sends `term` to the mailbox registered as `name` on `node`.
  pub fn send_remote(&self, node: Atom, name: Atom, term: Term) -> bool {
    if node == self.name {
      return self.send_name(name, term);
    }

    match self.connection(node) {
      Some(connection) => match connection.send_name(name, term) {
        Ok(()) => true,
        Err(error) => {
          warn!(target: "ernode", %node, %name, %error, "remote send failed");
          false
        }
      },
      None => {
        debug!(target: "ernode", %node, %name, "no connection; message dropped");
        false
      }
    }
  }

  /// Deposits `term` into a local mailbox. Used by connections for inbound
  /// traffic.
  ///
  /// Returns `false` if no mailbox matches.
  pub fn deliver(&self, dest: impl Into<Dest>, term: Term) -> bool {
    let dest: Dest = dest.into();

    let mailbox: Option<Arc<Mailbox>> = match dest {
      Dest::Pid(pid) => self.registry.get_pid(pid),
      Dest::Name(name) => self.registry.get_name(name),
    };

    match mailbox {
      Some(mailbox) => {
        mailbox.deliver(term);
        true
      }
      None => {
        debug!(target: "ernode", %dest, "no such mailbox; message dropped");
        false
      }
    }
  }

  // ---------------------------------------------------------------------------
  // Connections
  // ---------------------------------------------------------------------------

  /// Registers a connection, replacing any previous one to the same peer.
  pub fn add_connection(&self, connection: SharedDyn<dyn Connection>) {
    let peer: Atom = connection.peer();

    if let Some(previous) = self.connections.insert(peer, connection) {
      previous.close();
    }

    self.events.on_node_status_change(peer, true, "connected");
  }

  /// Closes and removes the connection to `node`.
  ///
  /// Returns `false` if there was none.
  pub fn remove_connection(&self, node: Atom) -> bool {
    match self.connections.remove(&node) {
      Some((_, connection)) => {
        connection.close();
        self.events.on_node_status_change(node, false, "disconnected");
        true
      }
      None => false,
    }
  }

  /// Returns the connection to `node`.
  #[inline]
  pub fn connection(&self, node: Atom) -> Option<SharedDyn<dyn Connection>> {
    self.connections.get(&node).map(|entry| SharedDyn::clone(entry.value()))
  }

  /// Returns the names of connected peers.
  pub fn connections(&self) -> Vec<Atom> {
    self.connections.iter().map(|entry| *entry.key()).collect()
  }

  // ---------------------------------------------------------------------------
  // Shutdown
  // ---------------------------------------------------------------------------

  /// Stops every service and releases node resources.
  ///
  /// Safe to call more than once and from any thread, including service
  /// threads and RPC handlers.
  pub fn close(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }

    let span: Span = span!(target: "ernode", Level::DEBUG, "node::close", node = %self.name);

    debug!(target: "ernode", parent: &span, "stopping acceptor");

    let acceptor: Option<Acceptor> = self.acceptor.lock().take();

    if let Some(acceptor) = acceptor {
      acceptor.stop();
    }

    debug!(target: "ernode", parent: &span, "stopping services");

    self.liveness.shutdown();

    for entry in self.connections.iter() {
      entry.value().close();
    }

    self.connections.clear();
    self.registry.clear();

    let services: Vec<JoinHandle<()>> = self.services.lock().drain(..).collect();
    let current: thread::ThreadId = thread::current().id();

    let ((), elapsed): ((), Duration) = measure_fn(|| {
      for service in services {
        if service.thread().id() != current {
          let _ignore: thread::Result<()> = service.join();
        }
      }
    });

    debug!(target: "ernode", parent: &span, elapsed = ?elapsed, "services stopped");

    let runtime: Option<TokioRuntime> = self.runtime.lock().take();

    if let Some(runtime) = runtime {
      if Handle::try_current().is_ok() {
        runtime.shutdown_background();
      } else {
        runtime.shutdown_timeout(self.config.rt_shutdown_timeout);
      }
    }

    info!(target: "ernode", parent: &span, "node closed");

    self.events.on_node_status_change(self.name, false, "closed");
  }
}

impl Debug for Node {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Node")
      .field("name", &self.name)
      .field("alive", &self.is_alive())
      .field("registry", &self.registry)
      .field("connections", &self.connections())
      .finish()
  }
}
