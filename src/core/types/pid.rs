//! Node-qualified process identifier.
//!
//! # Field Layout
//!
//! ```text
//! sequence (u32 counter)
//! ┌──────────┬───────────┬───────────┐
//! │ Unused   │ Serial    │ Number    │
//! │ 4 bits   │ 13 bits   │ 15 bits   │
//! └──────────┴───────────┴───────────┘
//! ```
//!
//! The widths match the `number`/`serial` fields of an Erlang pid.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::consts::PID_NUMBER_BITS;
use crate::consts::PID_SERIAL_BITS;
use crate::core::Atom;

/// Identifier naming a mailbox on some node.
///
/// Pids are the routing address of a message and the key of the mailbox
/// registry. Two pids are equal when all three fields are equal.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid {
  node: Atom,
  number: u32,
  serial: u32,
}

impl Pid {
  /// Bitmask for the `number` field.
  pub const NUMBER_MASK: u32 = (1 << PID_NUMBER_BITS) - 1;

  /// Bitmask for the `serial` field (after shifting).
  pub const SERIAL_MASK: u32 = (1 << PID_SERIAL_BITS) - 1;

  /// Creates a pid from its raw fields.
  #[inline]
  pub const fn new(node: Atom, number: u32, serial: u32) -> Self {
    Self {
      node,
      number,
      serial,
    }
  }

  /// Creates a pid from a node-local allocation sequence.
  ///
  /// The low bits become `number` and the next bits `serial`; anything
  /// above is discarded so the sequence wraps.
  #[inline]
  pub const fn from_sequence(node: Atom, sequence: u32) -> Self {
    Self::new(
      node,
      sequence & Self::NUMBER_MASK,
      (sequence >> PID_NUMBER_BITS) & Self::SERIAL_MASK,
    )
  }

  /// Returns the node owning this pid.
  #[inline]
  pub const fn node(&self) -> Atom {
    self.node
  }

  /// Returns the `number` field.
  #[inline]
  pub const fn number(&self) -> u32 {
    self.number
  }

  /// Returns the `serial` field.
  #[inline]
  pub const fn serial(&self) -> u32 {
    self.serial
  }
}

impl Debug for Pid {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for Pid {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(
      f,
      "#PID<{}.{}.{}>",
      self.node.as_str(),
      self.number,
      self.serial,
    )
  }
}

#[cfg(test)]
mod tests {
  use crate::core::Atom;
  use crate::core::Pid;

  #[test]
  fn test_from_sequence_fields() {
    let node: Atom = Atom::new("a@host");

    assert_eq!(Pid::from_sequence(node, 1), Pid::new(node, 1, 0));
    assert_eq!(Pid::from_sequence(node, 0x7FFF), Pid::new(node, 0x7FFF, 0));
    assert_eq!(Pid::from_sequence(node, 0x8000), Pid::new(node, 0, 1));
    assert_eq!(Pid::from_sequence(node, 0x8000 * 3 + 7), Pid::new(node, 7, 3));
  }

  #[test]
  fn test_from_sequence_wraps() {
    let node: Atom = Atom::new("a@host");

    assert_eq!(Pid::from_sequence(node, 1 << 28), Pid::new(node, 0, 0));
  }

  #[test]
  fn test_display() {
    let pid: Pid = Pid::new(Atom::new("a@host"), 12, 3);

    assert_eq!(pid.to_string(), "#PID<a@host.12.3>");
  }
}
