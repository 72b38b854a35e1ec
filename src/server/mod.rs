//! Protocol servers running on every node.
//!
//! Each server owns a registered mailbox and a named OS thread that
//! receives with [`NodeConfig::server_recv_timeout`], hands every term to
//! its handler, and exits once the node shuts down or the mailbox is
//! deactivated. A panicking handler is logged and ends the thread.
//!
//! [`NodeConfig::server_recv_timeout`]: crate::node::NodeConfig::server_recv_timeout

mod format;
mod functions;

pub(crate) mod io;
pub(crate) mod rpc;

pub use self::functions::Functions;
pub use self::functions::RpcError;

use std::panic;
use std::panic::AssertUnwindSafe;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::Level;
use tracing::Span;
use tracing::debug;
use tracing::error;
use tracing::span;
use triomphe::Arc;

use crate::core::Term;
use crate::error::panic_message;
use crate::mailbox::Mailbox;
use crate::node::Node;
use crate::node::NodeError;

/// Registers `name`, then runs `handler` on every received term in a thread
/// named `ernode-{name}`.
fn spawn_service<F>(node: &Arc<Node>, name: &'static str, handler: F) -> Result<JoinHandle<()>, NodeError>
where
  F: FnMut(&Arc<Node>, &Span, Term) + Send + 'static,
{
  let mailbox: Arc<Mailbox> = node.create_mbox(name)?;

  let result: std::io::Result<JoinHandle<()>> = {
    let node: Arc<Node> = Arc::clone(node);
    let mailbox: Arc<Mailbox> = Arc::clone(&mailbox);

    thread::Builder::new()
      .name(format!("ernode-{name}"))
      .spawn(move || serve(node, mailbox, name, handler))
  };

  result.map_err(|error| {
    node.close_mbox(&mailbox);
    NodeError::Spawn(error)
  })
}

fn serve<F>(node: Arc<Node>, mailbox: Arc<Mailbox>, name: &'static str, mut handler: F)
where
  F: FnMut(&Arc<Node>, &Span, Term),
{
  let span: Span = span!(target: "ernode", Level::DEBUG, "server", server = name, pid = %mailbox.pid());
  let timeout: Duration = node.config().server_recv_timeout;

  debug!(target: "ernode", parent: &span, "started");

  let outcome: thread::Result<()> = panic::catch_unwind(AssertUnwindSafe(|| {
    'recv: while node.is_alive() && mailbox.queue().is_active() {
      let Some(term) = mailbox.receive(Some(timeout)) else {
        continue 'recv;
      };

      handler(&node, &span, term);
    }
  }));

  if let Err(payload) = outcome {
    let info: String = panic_message(payload.as_ref());

    error!(target: "ernode", parent: &span, %info, "server crashed");
  }

  node.close_mbox(&mailbox);

  debug!(target: "ernode", parent: &span, "exiting");
}
