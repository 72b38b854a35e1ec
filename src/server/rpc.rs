//! The `rex` server: remote procedure calls against a [`Functions`] table.
//!
//! Calls and casts run on the node's blocking pool, never on the server
//! thread, so a slow handler does not hold up the queue.

use std::mem;
use std::thread::JoinHandle;
use tokio::runtime::Handle;
use tracing::Span;
use tracing::debug;
use tracing::error;
use tracing::warn;
use triomphe::Arc;

use crate::consts::RPC_SERVER_NAME;
use crate::core::Bindings;
use crate::core::Pattern;
use crate::core::PatternSet;
use crate::core::Pid;
use crate::core::Term;
use crate::error::fatal;
use crate::node::Node;
use crate::node::NodeError;
use crate::server::Functions;
use crate::server::spawn_service;

const REQUESTS: [&str; 3] = [
  "{'$gen_call', {Pid, Ref}, {call, Mod, Fun, Args, GroupLeader}}",
  "{'$gen_cast', {cast, Mod, Fun, Args, GroupLeader}}",
  "{_, {Pid, Ref}, _}",
];

const CALL: usize = 0;
const CAST: usize = 1;
const UNSUPPORTED: usize = 2;

const REPLY: &str = "{rex, {Ref, Reply}}";
const REPLY_UNSUPPORTED: &str = "{rex, {Ref, {error, unsupported}}}";

// -----------------------------------------------------------------------------
// Rex
// -----------------------------------------------------------------------------

struct Rex {
  functions: Functions,
  requests: PatternSet,
  reply: Pattern,
  unsupported: Pattern,
}

impl Rex {
  fn new(functions: Functions) -> Self {
    let requests: PatternSet = match PatternSet::new(&REQUESTS) {
      Ok(patterns) => patterns,
      Err(error) => fatal!(format!("invalid rex request pattern: {error}")),
    };

    let reply: Pattern = match Pattern::parse(REPLY) {
      Ok(pattern) => pattern,
      Err(error) => fatal!(format!("invalid rex reply pattern: {error}")),
    };

    let unsupported: Pattern = match Pattern::parse(REPLY_UNSUPPORTED) {
      Ok(pattern) => pattern,
      Err(error) => fatal!(format!("invalid rex reply pattern: {error}")),
    };

    Self {
      functions,
      requests,
      reply,
      unsupported,
    }
  }

  /// Runs `Mod:Fun(Args)` and wraps the outcome as `{ok, R}` or `{error, Reason}`.
  fn apply(&self, bindings: &Bindings) -> Term {
    let (Some(module), Some(function), Some(args)) =
      (bindings.term("Mod"), bindings.term("Fun"), bindings.term("Args"))
    else {
      return error_tuple(Term::string("bad request"));
    };

    match self.functions.execute(module, function, args) {
      Ok(value) => Term::tuple([Term::atom("ok"), value]),
      Err(error) => error_tuple(error.reason()),
    }
  }

  fn respond(&self, node: &Node, span: &Span, pid: Pid, pattern: &Pattern, bindings: &Bindings) {
    match pattern.subst(bindings) {
      Ok(reply) => {
        if !node.send(pid, reply) {
          debug!(target: "ernode", parent: span, %pid, "caller gone; reply dropped");
        }
      }
      Err(error) => {
        error!(target: "ernode", parent: span, %error, "failed to build reply");
      }
    }
  }
}

#[inline]
fn error_tuple(reason: Term) -> Term {
  Term::tuple([Term::atom("error"), reason])
}

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

/// Starts the `rex` server on `node`.
pub(crate) fn spawn(node: &Arc<Node>, functions: Functions) -> Result<JoinHandle<()>, NodeError> {
  let rex: Arc<Rex> = Arc::new(Rex::new(functions));
  let mut bindings: Bindings = Bindings::new();

  spawn_service(node, RPC_SERVER_NAME, move |node, span, term| {
    handle(&rex, node, span, term, &mut bindings);
  })
}

fn handle(rex: &Arc<Rex>, node: &Arc<Node>, span: &Span, term: Term, bindings: &mut Bindings) {
  let Some(index) = rex.requests.match_term(&term, bindings) else {
    warn!(target: "ernode", parent: span, %term, "unexpected message");
    return;
  };

  match index {
    CALL => {
      let Some(pid) = bindings.pid("Pid") else {
        warn!(target: "ernode", parent: span, %term, "call without a caller pid");
        return;
      };

      let handle: Handle = node.runtime_handle().clone();
      let request: Bindings = mem::take(bindings);
      let rex: Arc<Rex> = Arc::clone(rex);
      let node: Arc<Node> = Arc::clone(node);
      let span: Span = span.clone();

      let _task = handle.spawn_blocking(move || {
        let reply: Term = rex.apply(&request);

        debug!(target: "ernode", parent: &span, %pid, %reply, "call complete");

        let bindings: Bindings = match request.term("Ref") {
          Some(reference) => Bindings::new()
            .with("Ref", reference.clone())
            .with("Reply", reply),
          None => return,
        };

        rex.respond(&node, &span, pid, &rex.reply, &bindings);
      });
    }
    CAST => {
      let request: Bindings = mem::take(bindings);
      let rex: Arc<Rex> = Arc::clone(rex);
      let span: Span = span.clone();

      let _task = node.runtime_handle().spawn_blocking(move || {
        let reply: Term = rex.apply(&request);

        debug!(target: "ernode", parent: &span, %reply, "cast complete");
      });
    }
    UNSUPPORTED => {
      let Some(pid) = bindings.pid("Pid") else {
        warn!(target: "ernode", parent: span, %term, "unsupported request without a caller pid");
        return;
      };

      rex.respond(node, span, pid, &rex.unsupported, bindings);
    }
    _ => {
      warn!(target: "ernode", parent: span, %term, "unexpected message");
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::core::Bindings;
  use crate::core::Term;
  use crate::server::Functions;
  use crate::server::rpc::CALL;
  use crate::server::rpc::CAST;
  use crate::server::rpc::Rex;
  use crate::server::rpc::UNSUPPORTED;

  fn rex() -> Rex {
    Rex::new(Functions::new().register1("math", "square", |value: i64| -> Result<i64, String> {
      Ok(value * value)
    }))
  }

  fn call(module: &str, function: &str, args: Vec<Term>) -> Term {
    Term::tuple([
      Term::atom("$gen_call"),
      Term::tuple([Term::atom("caller"), Term::atom("ref")]),
      Term::tuple([
        Term::atom("call"),
        Term::atom(module),
        Term::atom(function),
        Term::List(args),
        Term::atom("user"),
      ]),
    ])
  }

  #[test]
  fn test_request_classification() {
    let rex: Rex = rex();
    let mut bindings: Bindings = Bindings::new();

    let cast: Term = Term::tuple([
      Term::atom("$gen_cast"),
      Term::tuple([
        Term::atom("cast"),
        Term::atom("math"),
        Term::atom("square"),
        Term::nil(),
        Term::atom("user"),
      ]),
    ]);

    let other: Term = Term::tuple([
      Term::atom("foo"),
      Term::tuple([Term::atom("caller"), Term::atom("ref")]),
      Term::atom("bar"),
    ]);

    assert_eq!(rex.requests.match_term(&call("math", "square", vec![]), &mut bindings), Some(CALL));
    assert_eq!(rex.requests.match_term(&cast, &mut bindings), Some(CAST));
    assert_eq!(rex.requests.match_term(&other, &mut bindings), Some(UNSUPPORTED));
    assert_eq!(rex.requests.match_term(&Term::atom("noise"), &mut bindings), None);
  }

  #[test]
  fn test_apply_wraps_outcome() {
    let rex: Rex = rex();
    let mut bindings: Bindings = Bindings::new();

    rex.requests.match_term(&call("math", "square", vec![Term::Int(7)]), &mut bindings);

    assert_eq!(rex.apply(&bindings), Term::tuple([Term::atom("ok"), Term::Int(49)]));

    rex.requests.match_term(&call("math", "cube", vec![Term::Int(7)]), &mut bindings);

    assert_eq!(
      rex.apply(&bindings),
      Term::tuple([Term::atom("error"), Term::string("unknown method: math:cube/1")]),
    );
  }

  #[test]
  fn test_reply_shape() {
    let rex: Rex = rex();
    let bindings: Bindings = Bindings::new()
      .with("Ref", Term::atom("ref"))
      .with("Reply", Term::ok());

    assert_eq!(
      rex.reply.subst(&bindings).unwrap(),
      Term::tuple([Term::atom("rex"), Term::tuple([Term::atom("ref"), Term::ok()])]),
    );
  }
}
