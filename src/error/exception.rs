use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

// -----------------------------------------------------------------------------
// Exception Class
// -----------------------------------------------------------------------------

/// Exception severity classification.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExceptionClass {
  /// Error requiring the current unit of work to stop.
  Error,
}

impl Display for ExceptionClass {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Error => f.write_str("error"),
    }
  }
}

// -----------------------------------------------------------------------------
// Exception Group
// -----------------------------------------------------------------------------

/// Exception category indicating the nature of the error.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExceptionGroup {
  /// Invalid function argument or parameter.
  BadArg,
  /// System capacity limit exceeded.
  ///
  /// Indicates resource exhaustion such as a full atom table.
  SysCap,
  /// Invalid system operation or state.
  SysInv,
}

impl ExceptionGroup {
  #[inline]
  pub(crate) const fn label(&self) -> &'static str {
    match self {
      Self::BadArg => "badarg",
      Self::SysCap => "syscap",
      Self::SysInv => "sysinv",
    }
  }
}

impl Display for ExceptionGroup {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str(self.label())
  }
}

// -----------------------------------------------------------------------------
// Exception
// -----------------------------------------------------------------------------

/// A structured exception with class, group, message, and backtrace.
///
/// Exceptions format as `{class}:{group} - {message}`, for example
/// `error:syscap - too many atoms`.
pub struct Exception {
  class: ExceptionClass,
  group: ExceptionGroup,
  error: String,
  trace: Backtrace,
}

impl Exception {
  /// Creates a new exception with the given class, group, and message.
  ///
  /// Typically invoked through [`raise!`].
  ///
  /// [`raise!`]: crate::raise
  #[inline]
  pub fn new<T>(class: ExceptionClass, group: ExceptionGroup, error: T) -> Self
  where
    T: Display,
  {
    Self {
      class,
      group,
      error: error.to_string(),
      trace: Backtrace::capture(),
    }
  }

  /// Returns the exception's severity class.
  #[inline]
  pub const fn class(&self) -> ExceptionClass {
    self.class
  }

  /// Returns the exception's error category.
  #[inline]
  pub const fn group(&self) -> ExceptionGroup {
    self.group
  }

  /// Returns the human-readable error message.
  #[inline]
  pub const fn error(&self) -> &str {
    self.error.as_str()
  }

  /// Returns the captured backtrace.
  #[inline]
  pub const fn trace(&self) -> &Backtrace {
    &self.trace
  }
}

impl Debug for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "{}:{} - {}", self.class, self.group, self.error)
  }
}

impl Error for Exception {}

// -----------------------------------------------------------------------------
// Panic Payloads
// -----------------------------------------------------------------------------

/// Extracts a printable message from a caught panic payload.
///
/// Handles the payload types produced by `panic!` with a literal or a
/// formatted message, which includes everything raised with [`raise!`].
///
/// [`raise!`]: crate::raise
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
  match payload.downcast_ref::<&str>() {
    Some(message) => (*message).to_owned(),
    None => match payload.downcast_ref::<String>() {
      Some(message) => message.clone(),
      None => String::from("unknown panic"),
    },
  }
}

#[cfg(test)]
mod tests {
  use crate::error::ExceptionClass;
  use crate::error::ExceptionGroup;
  use crate::error::panic_message;

  #[test]
  fn test_display_labels() {
    assert_eq!(format!("{}", ExceptionClass::Error), "error");
    assert_eq!(format!("{}", ExceptionGroup::BadArg), "badarg");
    assert_eq!(format!("{}", ExceptionGroup::SysCap), "syscap");
    assert_eq!(format!("{}", ExceptionGroup::SysInv), "sysinv");
  }

  #[test]
  fn test_panic_message_variants() {
    let literal: Box<dyn std::any::Any + Send> = Box::new("static");
    let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
    let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);

    assert_eq!(panic_message(literal.as_ref()), "static");
    assert_eq!(panic_message(owned.as_ref()), "owned");
    assert_eq!(panic_message(other.as_ref()), "unknown panic");
  }
}
