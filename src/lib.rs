//! Ernode - An Erlang-style local node runtime for Rust.
//!
//! Ernode hosts the pieces a distributed Erlang peer expects to find on a
//! node: an interned atom table, addressable mailboxes, the `rex` RPC
//! server, the `user` I/O server, and a listener that hands inbound
//! connections to a pluggable handshake.
//!
//! # Quick Start
//!
//! ```no_run
//! use ernode::core::Term;
//! use ernode::node::Node;
//! use ernode::node::NodeConfig;
//! use ernode::server::Functions;
//!
//! fn square(value: i64) -> Result<i64, String> {
//!   Ok(value * value)
//! }
//!
//! let config = NodeConfig::default().name("demo@localhost");
//! let functions = Functions::new().register1("math", "square", square);
//! let node = Node::builder(config).functions(functions).start().unwrap();
//!
//! let mailbox = node.create_anonymous_mbox();
//! node.send(mailbox.pid(), Term::atom("hello"));
//!
//! node.close();
//! ```
//!
//! # Core Modules
//!
//! - [`node`]: Node lifecycle, routing, and the peer-facing traits
//! - [`mailbox`]: Blocking queues, mailboxes, and the mailbox registry
//! - [`server`]: RPC function table and the protocol servers
//! - [`core`]: Core types (atoms, pids, references, terms, patterns)
//! - [`error`]: Exception system
//! - [`init`]: Tracing and runtime setup
//! - [`consts`]: Runtime configuration constants

mod utils;

pub mod consts;
pub mod core;
pub mod error;
pub mod init;
pub mod mailbox;
pub mod node;
pub mod server;

pub use self::utils::Liveness;
