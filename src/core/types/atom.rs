use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::ops::Deref;

use crate::core::AtomTable;
use crate::core::AtomTableError;
use crate::error::fatal;
use crate::raise;

// -----------------------------------------------------------------------------
// Atom
// -----------------------------------------------------------------------------

/// Interned, immutable symbolic name.
///
/// Atoms are 32-bit handles into the process-wide [`AtomTable`]. Two atoms
/// are equal exactly when they share a table index.
///
/// # Equality and Ordering
///
/// Equality and hashing use the index (O(1)), while ordering compares the
/// underlying names (O(n)).
///
/// # Examples
///
/// ```
/// use ernode::core::Atom;
///
/// let a1 = Atom::new("hello");
/// let a2 = Atom::new("hello");
///
/// assert_eq!(a1, a2);
/// assert_eq!(a1.as_str(), "hello");
/// ```
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
#[repr(transparent)]
pub struct Atom {
  slot: u32,
}

impl Atom {
  /// Atom representing the empty string.
  pub const EMPTY: Self = Self::from_slot(0);

  /// Atom representing the value `true`.
  pub const TRUE: Self = Self::from_slot(1);

  /// Atom representing the value `false`.
  pub const FALSE: Self = Self::from_slot(2);

  /// Atom representing the value `undefined`.
  pub const UNDEFINED: Self = Self::from_slot(3);

  #[inline]
  pub(crate) const fn from_slot(slot: u32) -> Self {
    Self { slot }
  }

  /// Returns the atom table index backing this atom.
  #[inline]
  pub const fn index(self) -> u32 {
    self.slot
  }

  /// Interns a name and returns its atom.
  ///
  /// # Panics
  ///
  /// Raises a `BadArg` exception if the name exceeds [`MAX_ATOM_CHARS`]
  /// characters, or a `SysCap` exception if the global table is full. Use
  /// [`try_new`] to handle these cases.
  ///
  /// [`MAX_ATOM_CHARS`]: crate::consts::MAX_ATOM_CHARS
  /// [`try_new`]: Self::try_new
  #[inline]
  pub fn new(name: &str) -> Self {
    match Self::try_new(name) {
      Ok(atom) => atom,
      Err(error @ AtomTableError::AtomTooLarge) => raise!(Error, BadArg, error),
      Err(error) => raise!(Error, SysCap, error),
    }
  }

  /// Interns a name, returning the table error on failure.
  #[inline]
  pub fn try_new(name: &str) -> Result<Self, AtomTableError> {
    AtomTable::global().intern(name).map(Self::from_slot)
  }

  /// Returns the atom for `name` only if it has already been interned.
  #[inline]
  pub fn existing(name: &str) -> Option<Self> {
    AtomTable::global().index_of(name).map(Self::from_slot)
  }

  /// Returns the name of this atom.
  #[inline]
  pub fn as_str(&self) -> &'static str {
    match AtomTable::global().lookup(self.slot) {
      Ok(name) => name,
      Err(error) => fatal!(error),
    }
  }

  /// Returns `true` if this atom is the empty name.
  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.slot == Self::EMPTY.slot
  }
}

impl Debug for Atom {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Display::fmt(self, f)
  }
}

/// Formats the atom the way Erlang prints it, quoting names that are not
/// plain lowercase identifiers.
impl Display for Atom {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    let name: &str = self.as_str();

    if is_bare_atom(name) {
      f.write_str(name)
    } else {
      f.write_str("'")?;

      for char in name.chars() {
        match char {
          '\'' => f.write_str("\\'")?,
          '\\' => f.write_str("\\\\")?,
          _ => write!(f, "{char}")?,
        }
      }

      f.write_str("'")
    }
  }
}

impl Default for Atom {
  #[inline]
  fn default() -> Self {
    Self::EMPTY
  }
}

impl PartialOrd for Atom {
  #[inline]
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Atom {
  #[inline]
  fn cmp(&self, other: &Self) -> Ordering {
    Ord::cmp(self.as_str(), other.as_str())
  }
}

impl Deref for Atom {
  type Target = str;

  #[inline]
  fn deref(&self) -> &Self::Target {
    self.as_str()
  }
}

impl From<&str> for Atom {
  #[inline]
  fn from(other: &str) -> Atom {
    Atom::new(other)
  }
}

impl From<String> for Atom {
  #[inline]
  fn from(other: String) -> Atom {
    Atom::new(other.as_str())
  }
}

impl From<Cow<'_, str>> for Atom {
  #[inline]
  fn from(other: Cow<'_, str>) -> Atom {
    Atom::new(other.as_ref())
  }
}

impl From<bool> for Atom {
  #[inline]
  fn from(other: bool) -> Atom {
    if other { Atom::TRUE } else { Atom::FALSE }
  }
}

impl From<Atom> for &'static str {
  #[inline]
  fn from(other: Atom) -> &'static str {
    other.as_str()
  }
}

impl From<Atom> for String {
  #[inline]
  fn from(other: Atom) -> Self {
    String::from(other.as_str())
  }
}

impl PartialEq<str> for Atom {
  #[inline]
  fn eq(&self, other: &str) -> bool {
    self.as_str() == other
  }
}

impl PartialEq<&str> for Atom {
  #[inline]
  fn eq(&self, other: &&str) -> bool {
    self.as_str() == *other
  }
}

impl PartialEq<Atom> for &str {
  #[inline]
  fn eq(&self, other: &Atom) -> bool {
    *self == other.as_str()
  }
}

/// Returns `true` if `name` prints without quotes.
fn is_bare_atom(name: &str) -> bool {
  let mut chars = name.chars();

  match chars.next() {
    Some(head) if head.is_ascii_lowercase() => {}
    _ => return false,
  }

  chars.all(|char| char.is_ascii_alphanumeric() || char == '_' || char == '@')
}
