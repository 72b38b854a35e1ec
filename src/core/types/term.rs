//! In-memory term model exchanged through mailboxes.
//!
//! [`Term`] is a tagged value mirroring the Erlang data types the runtime
//! needs to speak the `rex` and `user` protocols. It is a value model only:
//! the byte-level distribution encoding belongs to the connection layer.
//!
//! # Text
//!
//! [`Term::String`] stands for both binaries and printable strings. A list
//! of code points (a charlist) or a nested list mixing both (an iolist) is
//! also accepted wherever text is expected; see [`Term::to_text`].
//!
//! # Examples
//!
//! ```
//! use ernode::core::Term;
//!
//! let reply = Term::tuple([Term::atom("ok"), Term::Int(42)]);
//!
//! assert_eq!(reply.to_string(), "{ok,42}");
//! ```

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::fmt::Write;

use crate::core::Atom;
use crate::core::Pid;
use crate::core::Reference;

/// Dynamically typed runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
  Atom(Atom),
  Int(i64),
  Float(f64),
  String(String),
  Tuple(Vec<Term>),
  List(Vec<Term>),
  Pid(Pid),
  Ref(Reference),
}

impl Term {
  /// The atom `ok`.
  #[inline]
  pub fn ok() -> Self {
    Self::atom("ok")
  }

  /// Creates an atom term, interning `name`.
  #[inline]
  pub fn atom(name: &str) -> Self {
    Self::Atom(Atom::new(name))
  }

  /// Creates a string term.
  #[inline]
  pub fn string<T>(text: T) -> Self
  where
    T: Into<String>,
  {
    Self::String(text.into())
  }

  /// Creates a tuple term.
  #[inline]
  pub fn tuple<I>(items: I) -> Self
  where
    I: IntoIterator<Item = Term>,
  {
    Self::Tuple(items.into_iter().collect())
  }

  /// Creates a list term.
  #[inline]
  pub fn list<I>(items: I) -> Self
  where
    I: IntoIterator<Item = Term>,
  {
    Self::List(items.into_iter().collect())
  }

  /// The empty list `[]`.
  #[inline]
  pub const fn nil() -> Self {
    Self::List(Vec::new())
  }

  /// Returns the atom if this is an atom term.
  #[inline]
  pub const fn as_atom(&self) -> Option<Atom> {
    match self {
      Self::Atom(atom) => Some(*atom),
      _ => None,
    }
  }

  /// Returns `true` if this is the atom named `name`.
  #[inline]
  pub fn is_atom(&self, name: &str) -> bool {
    matches!(self, Self::Atom(atom) if atom.as_str() == name)
  }

  /// Returns the pid if this is a pid term.
  #[inline]
  pub const fn as_pid(&self) -> Option<Pid> {
    match self {
      Self::Pid(pid) => Some(*pid),
      _ => None,
    }
  }

  /// Returns the elements if this is a tuple term.
  #[inline]
  pub fn as_tuple(&self) -> Option<&[Term]> {
    match self {
      Self::Tuple(items) => Some(items),
      _ => None,
    }
  }

  /// Returns the elements if this is a list term.
  #[inline]
  pub fn as_list(&self) -> Option<&[Term]> {
    match self {
      Self::List(items) => Some(items),
      _ => None,
    }
  }

  /// Returns the textual content of a string, charlist, or iolist.
  ///
  /// Atoms, numbers, and other non-text terms yield `None`, as does any
  /// list element that is not a valid code point or text.
  pub fn to_text(&self) -> Option<String> {
    let mut output: String = String::new();

    if flatten_text(self, &mut output) {
      Some(output)
    } else {
      None
    }
  }

  /// Returns `true` if this is a non-empty list of printable code points.
  pub(crate) fn is_printable_list(&self) -> bool {
    match self {
      Self::List(items) if !items.is_empty() => items.iter().all(|item| match item {
        Self::Int(value) => u32::try_from(*value)
          .ok()
          .and_then(char::from_u32)
          .is_some_and(|char| !char.is_control() || char.is_whitespace()),
        _ => false,
      }),
      _ => false,
    }
  }
}

fn flatten_text(term: &Term, output: &mut String) -> bool {
  match term {
    Term::String(text) => {
      output.push_str(text);
      true
    }
    Term::List(items) => items.iter().all(|item| match item {
      Term::Int(value) => match u32::try_from(*value).ok().and_then(char::from_u32) {
        Some(char) => {
          output.push(char);
          true
        }
        None => false,
      },
      Term::String(_) | Term::List(_) => flatten_text(item, output),
      _ => false,
    }),
    _ => false,
  }
}

/// Formats the term in Erlang's `~w` syntax.
impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Atom(atom) => Display::fmt(atom, f),
      Self::Int(value) => Display::fmt(value, f),
      Self::Float(value) => write!(f, "{value:?}"),
      Self::String(text) => write_quoted(f, text),
      Self::Tuple(items) => write_seq(f, '{', items, '}'),
      Self::List(items) => write_seq(f, '[', items, ']'),
      Self::Pid(pid) => Display::fmt(pid, f),
      Self::Ref(reference) => Display::fmt(reference, f),
    }
  }
}

fn write_seq(f: &mut Formatter<'_>, open: char, items: &[Term], close: char) -> Result {
  f.write_char(open)?;

  for (index, item) in items.iter().enumerate() {
    if index > 0 {
      f.write_char(',')?;
    }

    Display::fmt(item, f)?;
  }

  f.write_char(close)
}

fn write_quoted(f: &mut Formatter<'_>, text: &str) -> Result {
  f.write_char('"')?;

  for char in text.chars() {
    match char {
      '"' => f.write_str("\\\"")?,
      '\\' => f.write_str("\\\\")?,
      '\n' => f.write_str("\\n")?,
      '\t' => f.write_str("\\t")?,
      _ => f.write_char(char)?,
    }
  }

  f.write_char('"')
}

// -----------------------------------------------------------------------------
// Extensions - From
// -----------------------------------------------------------------------------

impl From<Atom> for Term {
  #[inline]
  fn from(other: Atom) -> Self {
    Self::Atom(other)
  }
}

impl From<Pid> for Term {
  #[inline]
  fn from(other: Pid) -> Self {
    Self::Pid(other)
  }
}

impl From<Reference> for Term {
  #[inline]
  fn from(other: Reference) -> Self {
    Self::Ref(other)
  }
}

impl From<i64> for Term {
  #[inline]
  fn from(other: i64) -> Self {
    Self::Int(other)
  }
}

impl From<f64> for Term {
  #[inline]
  fn from(other: f64) -> Self {
    Self::Float(other)
  }
}

impl From<bool> for Term {
  #[inline]
  fn from(other: bool) -> Self {
    Self::Atom(Atom::from(other))
  }
}

impl From<&str> for Term {
  #[inline]
  fn from(other: &str) -> Self {
    Self::String(other.to_owned())
  }
}

impl From<String> for Term {
  #[inline]
  fn from(other: String) -> Self {
    Self::String(other)
  }
}
