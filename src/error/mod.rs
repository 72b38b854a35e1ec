//! Exception handling for the node runtime.
//!
//! Most fallible operations in this crate return a dedicated error enum. The
//! few infallible convenience APIs (such as [`Atom::new`]) report violations
//! by raising an [`Exception`]: a panic carrying a structured message. The
//! protocol servers catch these at their thread roots and RPC handlers
//! catch them per call, so a raised exception never crosses a service
//! boundary.
//!
//! # Exception Groups
//!
//! - [`BadArg`]: Invalid function arguments
//! - [`SysCap`]: System capacity exhausted (atom table full, etc.)
//! - [`SysInv`]: Invalid system state or operation
//!
//! [`Atom::new`]: crate::core::Atom::new
//! [`BadArg`]: ExceptionGroup::BadArg
//! [`SysCap`]: ExceptionGroup::SysCap
//! [`SysInv`]: ExceptionGroup::SysInv

mod exception;

pub use self::exception::Exception;
pub use self::exception::ExceptionClass;
pub use self::exception::ExceptionGroup;
pub use self::exception::panic_message;

// -----------------------------------------------------------------------------
// raise!
// -----------------------------------------------------------------------------

/// Raises an exception with the specified class, group, and message.
///
/// # Examples
///
/// ```
/// # use ernode::raise;
/// fn register_name(name: &str) {
///   if name.is_empty() {
///     raise!(Error, BadArg, "name cannot be empty");
///   }
/// }
/// ```
#[macro_export]
macro_rules! raise {
  ($class:ident, $group:ident, $error:expr $(,)?) => {
    ::std::panic!(
      "{}",
      $crate::error::Exception::new(
        $crate::error::ExceptionClass::$class,
        $crate::error::ExceptionGroup::$group,
        $error,
      ),
    )
  };
}

// -----------------------------------------------------------------------------
// fatal!
// -----------------------------------------------------------------------------

/// Displays a system error message and aborts the program.
///
/// Reserved for broken internal invariants; never used for input errors.
macro_rules! fatal {
  ($error:expr) => {{
    ::std::eprintln!(
      "{}:{}: (SysInv) a system invariant has been broken: {}",
      ::std::file!(),
      ::std::line!(),
      $error,
    );

    ::std::process::abort();
  }};
}

pub(crate) use fatal;

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
