//! Registration table resolving RPC calls to handlers.
//!
//! Handlers are registered up front under `(module, function, arity)`.
//! Zero-arity calls first look for a property registered under
//! `(module, function)`, mirroring a getter.
//!
//! # Examples
//!
//! ```
//! use ernode::core::Atom;
//! use ernode::core::Term;
//! use ernode::server::Functions;
//!
//! fn square(value: i64) -> Result<i64, String> {
//!   Ok(value * value)
//! }
//!
//! let functions = Functions::new()
//!   .register1("math", "square", square)
//!   .property("math", "pi", || std::f64::consts::PI);
//!
//! let result = functions.invoke(Atom::new("math"), Atom::new("square"), &[Term::Int(7)]);
//! assert_eq!(result, Ok(Term::Int(49)));
//! ```

use hashbrown::HashMap;
use hashbrown::HashSet;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::panic;
use std::panic::AssertUnwindSafe;

use crate::core::Atom;
use crate::core::FromTerm;
use crate::core::IntoTerm;
use crate::core::Term;
use crate::core::TermError;
use crate::error::panic_message;

type Method = Box<dyn Fn(&[Term]) -> Result<Term, RpcError> + Send + Sync>;
type Property = Box<dyn Fn() -> Term + Send + Sync>;

// -----------------------------------------------------------------------------
// RPC Error
// -----------------------------------------------------------------------------

/// Failure of a single RPC call, sent back as `{error, Reason}`.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum RpcError {
  /// No function is registered under the module.
  UnknownModule(String),
  /// The module exists but not the function with this arity.
  UnknownMethod {
    module: String,
    function: String,
    arity: usize,
  },
  /// The argument list is not a proper list.
  InvalidArgs,
  /// Argument `index` (1-based) has the wrong shape.
  BadArgument { index: usize, error: TermError },
  /// The handler returned an error.
  Handler(String),
  /// The handler panicked.
  Exception(String),
}

impl RpcError {
  /// Wraps a handler error message.
  #[inline]
  pub fn handler<E>(error: E) -> Self
  where
    E: Display,
  {
    Self::Handler(error.to_string())
  }

  /// Returns the `Reason` term sent to the caller.
  #[inline]
  pub fn reason(&self) -> Term {
    Term::String(self.to_string())
  }
}

impl Display for RpcError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::UnknownModule(module) => write!(f, "unknown module: {module}"),
      Self::UnknownMethod {
        module,
        function,
        arity,
      } => write!(f, "unknown method: {module}:{function}/{arity}"),
      Self::InvalidArgs => f.write_str("bad argument list"),
      Self::BadArgument { index, error } => write!(f, "bad argument {index}: {error}"),
      Self::Handler(error) => f.write_str(error),
      Self::Exception(error) => write!(f, "exception: {error}"),
    }
  }
}

impl Error for RpcError {}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Table of functions callable through the `rex` server.
#[derive(Default)]
pub struct Functions {
  methods: HashMap<(Atom, Atom, usize), Method>,
  properties: HashMap<(Atom, Atom), Property>,
  modules: HashSet<Atom>,
}

impl Functions {
  /// Creates an empty table.
  #[inline]
  pub fn new() -> Self {
    Self {
      methods: HashMap::new(),
      properties: HashMap::new(),
      modules: HashSet::new(),
    }
  }

  /// Registers an untyped handler receiving the raw argument list.
  pub fn register<F>(mut self, module: &str, function: &str, arity: usize, handler: F) -> Self
  where
    F: Fn(&[Term]) -> Result<Term, RpcError> + Send + Sync + 'static,
  {
    let module: Atom = Atom::new(module);

    self.modules.insert(module);
    self
      .methods
      .insert((module, Atom::new(function), arity), Box::new(handler));
    self
  }

  /// Registers a value returned for zero-argument calls of `name`.
  pub fn property<F, T>(mut self, module: &str, name: &str, getter: F) -> Self
  where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoTerm,
  {
    let module: Atom = Atom::new(module);

    self.modules.insert(module);
    self.properties.insert(
      (module, Atom::new(name)),
      Box::new(move || getter().into_term()),
    );
    self
  }

  /// Registers a typed zero-argument handler.
  pub fn register0<F, R, E>(self, module: &str, function: &str, handler: F) -> Self
  where
    F: Fn() -> Result<R, E> + Send + Sync + 'static,
    R: IntoTerm,
    E: Display,
  {
    self.register(module, function, 0, move |_args| reply(handler()))
  }

  /// Registers a typed one-argument handler.
  pub fn register1<F, A, R, E>(self, module: &str, function: &str, handler: F) -> Self
  where
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    A: FromTerm,
    R: IntoTerm,
    E: Display,
  {
    self.register(module, function, 1, move |args| {
      reply(handler(argument(args, 0)?))
    })
  }

  /// Registers a typed two-argument handler.
  pub fn register2<F, A, B, R, E>(self, module: &str, function: &str, handler: F) -> Self
  where
    F: Fn(A, B) -> Result<R, E> + Send + Sync + 'static,
    A: FromTerm,
    B: FromTerm,
    R: IntoTerm,
    E: Display,
  {
    self.register(module, function, 2, move |args| {
      reply(handler(argument(args, 0)?, argument(args, 1)?))
    })
  }

  /// Registers a typed three-argument handler.
  pub fn register3<F, A, B, C, R, E>(self, module: &str, function: &str, handler: F) -> Self
  where
    F: Fn(A, B, C) -> Result<R, E> + Send + Sync + 'static,
    A: FromTerm,
    B: FromTerm,
    C: FromTerm,
    R: IntoTerm,
    E: Display,
  {
    self.register(module, function, 3, move |args| {
      reply(handler(
        argument(args, 0)?,
        argument(args, 1)?,
        argument(args, 2)?,
      ))
    })
  }

  /// Returns `true` if anything is registered under `module`.
  #[inline]
  pub fn contains_module(&self, module: Atom) -> bool {
    self.modules.contains(&module)
  }

  /// Resolves and runs `module:function(args)`.
  ///
  /// A panicking handler yields [`RpcError::Exception`].
  pub fn invoke(&self, module: Atom, function: Atom, args: &[Term]) -> Result<Term, RpcError> {
    if !self.modules.contains(&module) {
      return Err(RpcError::UnknownModule(module.as_str().to_owned()));
    }

    if args.is_empty() {
      if let Some(getter) = self.properties.get(&(module, function)) {
        return guarded(|| Ok(getter()));
      }
    }

    match self.methods.get(&(module, function, args.len())) {
      Some(method) => guarded(|| method(args)),
      None => Err(RpcError::UnknownMethod {
        module: module.as_str().to_owned(),
        function: function.as_str().to_owned(),
        arity: args.len(),
      }),
    }
  }

  /// Runs a call whose parts are still untyped terms.
  pub(crate) fn execute(&self, module: &Term, function: &Term, args: &Term) -> Result<Term, RpcError> {
    let Some(module) = module.as_atom() else {
      return Err(RpcError::UnknownModule(module.to_string()));
    };

    let Some(function) = function.as_atom() else {
      return Err(RpcError::UnknownMethod {
        module: module.as_str().to_owned(),
        function: function.to_string(),
        arity: args.as_list().map_or(0, <[Term]>::len),
      });
    };

    let Some(args) = args.as_list() else {
      return Err(RpcError::InvalidArgs);
    };

    self.invoke(module, function, args)
  }
}

impl Debug for Functions {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Functions")
      .field("modules", &self.modules)
      .field("methods", &self.methods.len())
      .field("properties", &self.properties.len())
      .finish()
  }
}

#[inline]
fn argument<T>(args: &[Term], index: usize) -> Result<T, RpcError>
where
  T: FromTerm,
{
  let Some(term) = args.get(index) else {
    return Err(RpcError::Handler(format!("missing argument {}", index + 1)));
  };

  T::from_term(term).map_err(|error| RpcError::BadArgument {
    index: index + 1,
    error,
  })
}

#[inline]
fn reply<R, E>(result: Result<R, E>) -> Result<Term, RpcError>
where
  R: IntoTerm,
  E: Display,
{
  result.map(IntoTerm::into_term).map_err(RpcError::handler)
}

fn guarded<F>(f: F) -> Result<Term, RpcError>
where
  F: FnOnce() -> Result<Term, RpcError>,
{
  panic::catch_unwind(AssertUnwindSafe(f))
    .unwrap_or_else(|payload| Err(RpcError::Exception(panic_message(payload.as_ref()))))
}
