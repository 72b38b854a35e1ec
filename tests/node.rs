mod common;

use ernode::core::Atom;
use ernode::core::Pid;
use ernode::core::Term;
use ernode::node::Node;
use ernode::node::NodeError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::common::RECV_TIMEOUT;
use crate::common::Recorder;
use crate::common::config;

#[test]
fn test_start_registers_servers() {
  let recorder: Arc<Recorder> = Arc::default();
  let node = Node::builder(config("node")).events(Arc::clone(&recorder)).start().unwrap();

  assert!(node.is_alive());
  assert!(node.whereis(Atom::new("rex")).is_some());
  assert!(node.whereis(Atom::new("user")).is_some());
  assert_eq!(recorder.status(), vec![(node.name(), true, String::from("started"))]);

  node.close();
  node.close();

  assert!(!node.is_alive());
  assert_eq!(recorder.status().len(), 2);
}

#[test]
fn test_named_mailbox_routing() {
  let node = Node::builder(config("node")).start().unwrap();
  let mailbox = node.create_mbox("inbox").unwrap();
  let name: Atom = Atom::new("inbox");

  assert_eq!(node.whereis(name), Some(mailbox.pid()));
  assert_eq!(node.create_mbox("inbox").unwrap().pid(), mailbox.pid());

  assert!(node.send_name(name, Term::atom("first")));
  assert!(node.send(mailbox.pid(), Term::atom("second")));
  assert!(node.send_remote(node.name(), name, Term::atom("third")));

  assert_eq!(mailbox.receive(Some(RECV_TIMEOUT)), Some(Term::atom("first")));
  assert_eq!(mailbox.receive(Some(RECV_TIMEOUT)), Some(Term::atom("second")));
  assert_eq!(mailbox.receive(Some(RECV_TIMEOUT)), Some(Term::atom("third")));

  node.close_mbox(&mailbox);

  assert_eq!(node.whereis(name), None);
  assert!(!node.send_name(name, Term::ok()));

  node.close();
}

#[test]
fn test_unroutable_messages_are_dropped() {
  let node = Node::builder(config("node")).start().unwrap();
  let elsewhere: Pid = Pid::new(Atom::new("elsewhere@host"), 1, 0);
  let missing: Pid = Pid::new(node.name(), 0x7FFF, 0);

  assert!(!node.send(elsewhere, Term::ok()));
  assert!(!node.send(missing, Term::ok()));
  assert!(!node.send_remote(Atom::new("elsewhere@host"), Atom::new("rex"), Term::ok()));
  assert!(!node.remove_connection(Atom::new("elsewhere@host")));

  node.close();
}

#[test]
fn test_anonymous_mailbox_reuse() {
  let node = Node::builder(config("node").mailbox_reuse_after(Duration::ZERO)).start().unwrap();
  let first = node.create_anonymous_mbox();
  let pid: Pid = first.pid();

  node.send(pid, Term::atom("stale"));
  node.close_mbox(&first);

  assert!(!node.send(pid, Term::ok()));

  let second = node.create_anonymous_mbox();

  assert_eq!(second.pid(), pid);
  assert!(second.is_empty());
  assert_ne!(node.create_anonymous_mbox().pid(), pid);

  node.close();
}

#[test]
fn test_close_releases_receivers() {
  let node = Node::builder(config("node")).start().unwrap();
  let mailbox = node.create_anonymous_mbox();

  let waiter = thread::spawn(move || {
    let start: Instant = Instant::now();
    let received: Option<Term> = mailbox.receive(None);
    (received, start.elapsed())
  });

  thread::sleep(Duration::from_millis(50));
  node.close();

  let (received, elapsed): (Option<Term>, Duration) = waiter.join().unwrap();

  assert_eq!(received, None);
  assert!(elapsed < RECV_TIMEOUT);
  assert!(matches!(node.create_mbox("late"), Err(NodeError::Closed)));
}

#[test]
fn test_identity_allocation() {
  let node = Node::builder(config("node")).start().unwrap();

  let a: Pid = node.create_pid();
  let b: Pid = node.create_pid();

  assert_ne!(a, b);
  assert_eq!(a.node(), node.name());
  assert_ne!(node.create_ref(), node.create_ref());

  node.close();
}

#[test]
fn test_invalid_node_name() {
  let name: String = "n".repeat(300);
  let result = Node::builder(config("node").name(name)).start();

  assert!(matches!(result, Err(NodeError::InvalidName(_))));
}
