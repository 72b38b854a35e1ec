//! The `user` server: a write-only Erlang I/O server.
//!
//! Output requests are rendered to text and handed to
//! [`NodeEvents::on_io_output`]. Input requests are refused.
//!
//! [`NodeEvents::on_io_output`]: crate::node::NodeEvents::on_io_output

use std::thread::JoinHandle;
use tracing::Span;
use tracing::debug;
use tracing::error;
use tracing::warn;
use triomphe::Arc;

use crate::consts::IO_SERVER_NAME;
use crate::core::Bindings;
use crate::core::Pattern;
use crate::core::PatternSet;
use crate::core::Pid;
use crate::core::Term;
use crate::error::fatal;
use crate::node::Node;
use crate::node::NodeError;
use crate::server::format;
use crate::server::spawn_service;

const IO_REQUEST: &str = "{io_request, From, ReplyAs, Request}";
const IO_REPLY: &str = "{io_reply, ReplyAs, Reply}";

const REQUESTS: [&str; 11] = [
  "{put_chars, Encoding, Chars}",
  "{put_chars, Encoding, Mod, Fun, Args}",
  "{put_chars, Chars}",
  "{put_chars, Mod, Fun, Args}",
  "{get_until, Encoding, Prompt, Mod, Fun, Args}",
  "{get_until, Prompt, Mod, Fun, Args}",
  "{get_chars, Encoding, Prompt, Count}",
  "{get_chars, Prompt, Count}",
  "{get_line, Encoding, Prompt}",
  "{get_line, Prompt}",
  "{requests, Requests}",
];

const PUT_CHARS_ENC: usize = 0;
const PUT_CHARS_ENC_MFA: usize = 1;
const PUT_CHARS: usize = 2;
const PUT_CHARS_MFA: usize = 3;
const GET_FIRST: usize = 4;
const GET_LAST: usize = 9;
const REQUESTS_BATCH: usize = 10;

// -----------------------------------------------------------------------------
// User
// -----------------------------------------------------------------------------

struct User {
  outer: Pattern,
  requests: PatternSet,
  reply: Pattern,
}

impl User {
  fn new() -> Self {
    let outer: Pattern = match Pattern::parse(IO_REQUEST) {
      Ok(pattern) => pattern,
      Err(error) => fatal!(format!("invalid io request pattern: {error}")),
    };

    let requests: PatternSet = match PatternSet::new(&REQUESTS) {
      Ok(patterns) => patterns,
      Err(error) => fatal!(format!("invalid io request pattern: {error}")),
    };

    let reply: Pattern = match Pattern::parse(IO_REPLY) {
      Ok(pattern) => pattern,
      Err(error) => fatal!(format!("invalid io reply pattern: {error}")),
    };

    Self {
      outer,
      requests,
      reply,
    }
  }

  /// Evaluates one request, writing any output through `output`, and
  /// returns the `Reply` term.
  fn eval(&self, request: &Term, output: &mut dyn FnMut(&str)) -> Term {
    let mut bindings: Bindings = Bindings::new();

    let Some(index) = self.requests.match_term(request, &mut bindings) else {
      return Term::atom("request");
    };

    match index {
      PUT_CHARS_ENC | PUT_CHARS => put_chars(bindings.string("Chars"), output),
      PUT_CHARS_ENC_MFA | PUT_CHARS_MFA => {
        let text: Option<String> = match (bindings.term("Mod"), bindings.term("Fun"), bindings.term("Args")) {
          (Some(module), Some(function), Some(args)) => Some(format::apply(module, function, args)),
          _ => None,
        };

        put_chars(text, output)
      }
      GET_FIRST..=GET_LAST => error_tuple("request"),
      REQUESTS_BATCH => {
        let Some(requests) = bindings.list("Requests") else {
          return Term::atom("request");
        };

        for request in requests {
          let reply: Term = self.eval(request, output);

          if !reply.is_atom("ok") {
            return reply;
          }
        }

        Term::ok()
      }
      _ => Term::atom("request"),
    }
  }
}

fn put_chars(text: Option<String>, output: &mut dyn FnMut(&str)) -> Term {
  match text {
    Some(text) => {
      output(&text);
      Term::ok()
    }
    None => error_tuple("put_chars"),
  }
}

#[inline]
fn error_tuple(reason: &str) -> Term {
  Term::tuple([Term::atom("error"), Term::atom(reason)])
}

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

/// Starts the `user` server on `node`.
pub(crate) fn spawn(node: &Arc<Node>) -> Result<JoinHandle<()>, NodeError> {
  let user: User = User::new();
  let mut bindings: Bindings = Bindings::new();

  spawn_service(node, IO_SERVER_NAME, move |node, span, term| {
    handle(&user, node, span, term, &mut bindings);
  })
}

fn handle(user: &User, node: &Node, span: &Span, term: Term, bindings: &mut Bindings) {
  bindings.clear();

  if !user.outer.match_term(&term, bindings) {
    warn!(target: "ernode", parent: span, %term, "unexpected message");
    return;
  }

  let Some(from): Option<Pid> = bindings.pid("From") else {
    warn!(target: "ernode", parent: span, %term, "io request without a caller pid");
    return;
  };

  let reply: Term = match bindings.term("Request") {
    Some(request) => user.eval(request, &mut |text: &str| node.events().on_io_output(text)),
    None => Term::atom("request"),
  };

  bindings.bind("Reply", reply);

  match user.reply.subst(bindings) {
    Ok(reply) => {
      if !node.send(from, reply) {
        debug!(target: "ernode", parent: span, %from, "caller gone; reply dropped");
      }
    }
    Err(error) => {
      error!(target: "ernode", parent: span, %error, "failed to build reply");
    }
  }
}
