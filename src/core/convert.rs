//! Typed conversion between Rust values and [`Term`]s.
//!
//! RPC handlers take their arguments through [`FromTerm`] and return results
//! through [`IntoTerm`], so argument shape errors are caught before user code
//! runs.

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Atom;
use crate::core::Pid;
use crate::core::Reference;
use crate::core::Term;

// -----------------------------------------------------------------------------
// Term Error
// -----------------------------------------------------------------------------

/// Error returned when a term does not have the expected shape.
#[derive(Clone, Debug, PartialEq)]
pub struct TermError {
  expected: &'static str,
  found: Term,
}

impl TermError {
  #[inline]
  pub fn new(expected: &'static str, found: &Term) -> Self {
    Self {
      expected,
      found: found.clone(),
    }
  }

  /// Returns a description of the expected shape.
  #[inline]
  pub const fn expected(&self) -> &'static str {
    self.expected
  }

  /// Returns the offending term.
  #[inline]
  pub const fn found(&self) -> &Term {
    &self.found
  }
}

impl Display for TermError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "expected {}, found {}", self.expected, self.found)
  }
}

impl Error for TermError {}

// -----------------------------------------------------------------------------
// Traits
// -----------------------------------------------------------------------------

/// Types that can be extracted from a [`Term`].
pub trait FromTerm: Sized {
  fn from_term(term: &Term) -> Result<Self, TermError>;
}

/// Types that can be converted into a [`Term`].
pub trait IntoTerm {
  fn into_term(self) -> Term;
}

// -----------------------------------------------------------------------------
// FromTerm
// -----------------------------------------------------------------------------

impl FromTerm for Term {
  #[inline]
  fn from_term(term: &Term) -> Result<Self, TermError> {
    Ok(term.clone())
  }
}

impl FromTerm for Atom {
  #[inline]
  fn from_term(term: &Term) -> Result<Self, TermError> {
    term.as_atom().ok_or_else(|| TermError::new("atom", term))
  }
}

impl FromTerm for Pid {
  #[inline]
  fn from_term(term: &Term) -> Result<Self, TermError> {
    term.as_pid().ok_or_else(|| TermError::new("pid", term))
  }
}

impl FromTerm for Reference {
  #[inline]
  fn from_term(term: &Term) -> Result<Self, TermError> {
    match term {
      Term::Ref(reference) => Ok(*reference),
      _ => Err(TermError::new("reference", term)),
    }
  }
}

impl FromTerm for bool {
  fn from_term(term: &Term) -> Result<Self, TermError> {
    match term.as_atom() {
      Some(Atom::TRUE) => Ok(true),
      Some(Atom::FALSE) => Ok(false),
      _ => Err(TermError::new("boolean", term)),
    }
  }
}

impl FromTerm for f64 {
  fn from_term(term: &Term) -> Result<Self, TermError> {
    match term {
      Term::Float(value) => Ok(*value),
      Term::Int(value) => Ok(*value as f64),
      _ => Err(TermError::new("number", term)),
    }
  }
}

impl FromTerm for String {
  #[inline]
  fn from_term(term: &Term) -> Result<Self, TermError> {
    term.to_text().ok_or_else(|| TermError::new("string", term))
  }
}

impl<T> FromTerm for Vec<T>
where
  T: FromTerm,
{
  fn from_term(term: &Term) -> Result<Self, TermError> {
    match term {
      Term::List(items) => items.iter().map(T::from_term).collect(),
      _ => Err(TermError::new("list", term)),
    }
  }
}

/// `undefined` maps to `None`.
impl<T> FromTerm for Option<T>
where
  T: FromTerm,
{
  fn from_term(term: &Term) -> Result<Self, TermError> {
    match term.as_atom() {
      Some(Atom::UNDEFINED) => Ok(None),
      _ => T::from_term(term).map(Some),
    }
  }
}

macro_rules! impl_from_term_int {
  ($($type:ty),+) => {
    $(
      impl FromTerm for $type {
        fn from_term(term: &Term) -> Result<Self, TermError> {
          match term {
            Term::Int(value) => {
              <$type>::try_from(*value).map_err(|_| TermError::new(stringify!($type), term))
            }
            _ => Err(TermError::new("integer", term)),
          }
        }
      }
    )+
  };
}

impl_from_term_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! impl_from_term_tuple {
  ($arity:literal => $($name:ident : $index:tt),+) => {
    impl<$($name),+> FromTerm for ($($name,)+)
    where
      $($name: FromTerm,)+
    {
      fn from_term(term: &Term) -> Result<Self, TermError> {
        match term.as_tuple() {
          Some(items) if items.len() == $arity => Ok(($($name::from_term(&items[$index])?,)+)),
          _ => Err(TermError::new(concat!("tuple of size ", $arity), term)),
        }
      }
    }
  };
}

impl_from_term_tuple!(2 => A: 0, B: 1);
impl_from_term_tuple!(3 => A: 0, B: 1, C: 2);

// -----------------------------------------------------------------------------
// IntoTerm
// -----------------------------------------------------------------------------

impl<T> IntoTerm for T
where
  T: Into<Term>,
{
  #[inline]
  fn into_term(self) -> Term {
    self.into()
  }
}

/// `()` converts to the atom `ok`.
impl From<()> for Term {
  #[inline]
  fn from(_: ()) -> Self {
    Term::ok()
  }
}

/// `None` converts to the atom `undefined`.
impl<T> From<Option<T>> for Term
where
  T: Into<Term>,
{
  #[inline]
  fn from(other: Option<T>) -> Self {
    match other {
      Some(value) => value.into(),
      None => Term::Atom(Atom::UNDEFINED),
    }
  }
}

impl<T> From<Vec<T>> for Term
where
  T: Into<Term>,
{
  #[inline]
  fn from(other: Vec<T>) -> Self {
    Term::List(other.into_iter().map(Into::into).collect())
  }
}

macro_rules! impl_term_from_int {
  ($($type:ty),+) => {
    $(
      impl From<$type> for Term {
        #[inline]
        fn from(other: $type) -> Self {
          Term::Int(i64::from(other))
        }
      }
    )+
  };
}

impl_term_from_int!(i8, i16, i32, u8, u16, u32);

macro_rules! impl_term_from_tuple {
  ($($name:ident : $index:tt),+) => {
    impl<$($name),+> From<($($name,)+)> for Term
    where
      $($name: Into<Term>,)+
    {
      #[inline]
      fn from(other: ($($name,)+)) -> Self {
        Term::Tuple(vec![$(other.$index.into()),+])
      }
    }
  };
}

impl_term_from_tuple!(A: 0, B: 1);
impl_term_from_tuple!(A: 0, B: 1, C: 2);
