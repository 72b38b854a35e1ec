mod common;

use ernode::core::Atom;
use ernode::core::Reference;
use ernode::core::Term;
use ernode::node::Node;
use ernode::server::Functions;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use crate::common::RECV_TIMEOUT;
use crate::common::config;
use crate::common::wait_until;

fn functions(total: Arc<AtomicI64>) -> Functions {
  Functions::new()
    .register1("MathOps", "Square", |value: i64| -> Result<i64, String> { Ok(value * value) })
    .register2("MathOps", "Div", |a: i64, b: i64| -> Result<i64, String> {
      a.checked_div(b).ok_or_else(|| String::from("division by zero"))
    })
    .register1("Counter", "add", move |value: i64| -> Result<(), String> {
      total.fetch_add(value, Ordering::SeqCst);
      Ok(())
    })
}

fn gen_call(caller: Term, reference: Reference, module: &str, function: &str, args: Vec<Term>) -> Term {
  Term::tuple([
    Term::atom("$gen_call"),
    Term::tuple([caller, Term::Ref(reference)]),
    Term::tuple([
      Term::atom("call"),
      Term::atom(module),
      Term::atom(function),
      Term::List(args),
      Term::atom("user"),
    ]),
  ])
}

fn reply(reference: Reference, value: Term) -> Term {
  Term::tuple([Term::atom("rex"), Term::tuple([Term::Ref(reference), value])])
}

#[test]
fn test_call_replies_ok() {
  let node = Node::builder(config("rex")).functions(functions(Arc::default())).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reference: Reference = node.create_ref();

  let request: Term = gen_call(Term::Pid(caller.pid()), reference, "MathOps", "Square", vec![Term::Int(7)]);

  assert!(node.send_name(Atom::new("rex"), request));
  assert_eq!(
    caller.receive(Some(RECV_TIMEOUT)),
    Some(reply(reference, Term::tuple([Term::atom("ok"), Term::Int(49)]))),
  );

  node.close();
}

#[test]
fn test_call_failures_reply_error() {
  let node = Node::builder(config("rex")).functions(functions(Arc::default())).start().unwrap();
  let caller = node.create_anonymous_mbox();

  let cases: [(&str, &str, Vec<Term>, &str); 4] = [
    ("MathOps", "Cube", vec![Term::Int(2)], "unknown method: MathOps:Cube/1"),
    ("nomod", "f", vec![], "unknown module: nomod"),
    ("MathOps", "Square", vec![Term::atom("x")], "bad argument 1: expected integer, found x"),
    ("MathOps", "Div", vec![Term::Int(1), Term::Int(0)], "division by zero"),
  ];

  for (module, function, args, reason) in cases {
    let reference: Reference = node.create_ref();

    node.send_name(Atom::new("rex"), gen_call(Term::Pid(caller.pid()), reference, module, function, args));

    assert_eq!(
      caller.receive(Some(RECV_TIMEOUT)),
      Some(reply(reference, Term::tuple([Term::atom("error"), Term::string(reason)]))),
    );
  }

  node.close();
}

#[test]
fn test_unsupported_request() {
  let node = Node::builder(config("rex")).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reference: Reference = node.create_ref();

  let request: Term = Term::tuple([
    Term::atom("foo"),
    Term::tuple([Term::Pid(caller.pid()), Term::Ref(reference)]),
    Term::atom("bar"),
  ]);

  node.send_name(Atom::new("rex"), request);

  assert_eq!(
    caller.receive(Some(RECV_TIMEOUT)),
    Some(reply(reference, Term::tuple([Term::atom("error"), Term::atom("unsupported")]))),
  );

  node.close();
}

#[test]
fn test_cast_runs_without_reply() {
  let total: Arc<AtomicI64> = Arc::default();
  let node = Node::builder(config("rex")).functions(functions(Arc::clone(&total))).start().unwrap();
  let caller = node.create_anonymous_mbox();

  let cast: Term = Term::tuple([
    Term::atom("$gen_cast"),
    Term::tuple([
      Term::atom("cast"),
      Term::atom("Counter"),
      Term::atom("add"),
      Term::list([Term::Int(5)]),
      Term::atom("user"),
    ]),
  ]);

  node.send_name(Atom::new("rex"), cast);

  assert!(wait_until(|| total.load(Ordering::SeqCst) == 5));
  assert_eq!(caller.try_receive(), None);

  node.close();
}

#[test]
fn test_unmatched_message_is_dropped() {
  let node = Node::builder(config("rex")).functions(functions(Arc::default())).start().unwrap();
  let caller = node.create_anonymous_mbox();
  let reference: Reference = node.create_ref();

  node.send_name(Atom::new("rex"), Term::atom("noise"));
  node.send_name(
    Atom::new("rex"),
    gen_call(Term::Pid(caller.pid()), reference, "MathOps", "Square", vec![Term::Int(3)]),
  );

  assert_eq!(
    caller.receive(Some(RECV_TIMEOUT)),
    Some(reply(reference, Term::tuple([Term::atom("ok"), Term::Int(9)]))),
  );

  node.close();
}
