mod common;

use ernode::core::Atom;
use ernode::core::Reference;
use ernode::core::Term;
use ernode::node::Node;
use std::sync::Arc;

use crate::common::RECV_TIMEOUT;
use crate::common::Recorder;
use crate::common::config;

fn io_request(from: Term, reply_as: Reference, request: Term) -> Term {
  Term::tuple([Term::atom("io_request"), from, Term::Ref(reply_as), request])
}

fn io_reply(reply_as: Reference, reply: Term) -> Term {
  Term::tuple([Term::atom("io_reply"), Term::Ref(reply_as), reply])
}

fn charlist(text: &str) -> Term {
  Term::list(text.chars().map(|char| Term::Int(char as i64)))
}

#[test]
fn test_put_chars_writes_once() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reply_as: Reference = node.create_ref();

  let request: Term = Term::tuple([Term::atom("put_chars"), Term::atom("latin1"), Term::string("hello")]);

  node.send_name(Atom::new("user"), io_request(Term::Pid(caller.pid()), reply_as, request));

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(reply_as, Term::ok())));
  assert_eq!(recorder.output(), vec![String::from("hello")]);

  node.close();
}

#[test]
fn test_requests_batch_in_order() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reply_as: Reference = node.create_ref();

  let batch: Term = Term::tuple([
    Term::atom("requests"),
    Term::list([
      Term::tuple([Term::atom("put_chars"), charlist("one ")]),
      Term::tuple([Term::atom("put_chars"), Term::atom("unicode"), Term::string("two")]),
    ]),
  ]);

  node.send_name(Atom::new("user"), io_request(Term::Pid(caller.pid()), reply_as, batch));

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(reply_as, Term::ok())));
  assert_eq!(caller.try_receive(), None);
  assert_eq!(recorder.output(), vec![String::from("one "), String::from("two")]);

  node.close();
}

#[test]
fn test_put_chars_io_lib_format() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reply_as: Reference = node.create_ref();

  let request: Term = Term::tuple([
    Term::atom("put_chars"),
    Term::atom("unicode"),
    Term::atom("io_lib"),
    Term::atom("format"),
    Term::list([
      charlist("~s -> ~p~n"),
      Term::list([charlist("result"), Term::tuple([Term::atom("ok"), charlist("fine")])]),
    ]),
  ]);

  node.send_name(Atom::new("user"), io_request(Term::Pid(caller.pid()), reply_as, request));

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(reply_as, Term::ok())));
  assert_eq!(recorder.output(), vec![String::from("result -> {ok,\"fine\"}\n")]);

  node.close();
}

#[test]
fn test_input_and_unknown_requests() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();

  let get_line: Reference = node.create_ref();
  let unknown: Reference = node.create_ref();

  node.send_name(
    Atom::new("user"),
    io_request(Term::Pid(caller.pid()), get_line, Term::tuple([Term::atom("get_line"), Term::string("> ")])),
  );

  assert_eq!(
    caller.receive(Some(RECV_TIMEOUT)),
    Some(io_reply(get_line, Term::tuple([Term::atom("error"), Term::atom("request")]))),
  );

  node.send_name(
    Atom::new("user"),
    io_request(Term::Pid(caller.pid()), unknown, Term::tuple([Term::atom("setopts"), Term::nil()])),
  );

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(unknown, Term::atom("request"))));
  assert!(recorder.output().is_empty());

  node.close();
}

#[test]
fn test_non_io_request_is_dropped() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reply_as: Reference = node.create_ref();

  node.send_name(Atom::new("user"), Term::tuple([Term::atom("hello"), Term::Pid(caller.pid())]));
  node.send_name(
    Atom::new("user"),
    io_request(Term::Pid(caller.pid()), reply_as, Term::tuple([Term::atom("put_chars"), Term::string("x")])),
  );

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(reply_as, Term::ok())));
  assert_eq!(recorder.output(), vec![String::from("x")]);

  node.close();
}

#[test]
fn test_oversized_precision_keeps_server_alive() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("user")).events(Arc::clone(&recorder)).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let wide: Reference = node.create_ref();
  let plain: Reference = node.create_ref();

  let request: Term = Term::tuple([
    Term::atom("put_chars"),
    Term::atom("unicode"),
    Term::atom("io_lib"),
    Term::atom("format"),
    Term::list([charlist("~.70000f"), Term::list([Term::Float(1.0)])]),
  ]);

  node.send_name(Atom::new("user"), io_request(Term::Pid(caller.pid()), wide, request));

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(wide, Term::ok())));

  node.send_name(
    Atom::new("user"),
    io_request(
      Term::Pid(caller.pid()),
      plain,
      Term::tuple([Term::atom("put_chars"), Term::atom("latin1"), Term::string("hello")]),
    ),
  );

  assert_eq!(caller.receive(Some(RECV_TIMEOUT)), Some(io_reply(plain, Term::ok())));
  assert!(node.whereis(Atom::new("user")).is_some());
  assert_eq!(
    recorder.output(),
    vec![String::from("io_lib:format([126,46,55,48,48,48,48,102],[1.0])"), String::from("hello")],
  );

  node.close();
}
