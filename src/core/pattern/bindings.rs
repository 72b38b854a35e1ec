use hashbrown::HashMap;

use crate::core::Atom;
use crate::core::Pid;
use crate::core::Reference;
use crate::core::Term;

/// Variable bindings produced by a successful pattern match.
///
/// Also used as the environment for [`Pattern::subst`], so reply templates
/// can reuse variables captured from the request.
///
/// [`Pattern::subst`]: crate::core::Pattern::subst
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
  inner: HashMap<Box<str>, Term>,
}

impl Bindings {
  /// Creates an empty set of bindings.
  #[inline]
  pub fn new() -> Self {
    Self {
      inner: HashMap::new(),
    }
  }

  /// Binds `name` to `term`, replacing any previous value.
  #[inline]
  pub fn bind(&mut self, name: &str, term: Term) {
    self.inner.insert(Box::from(name), term);
  }

  /// Builder form of [`bind`].
  ///
  /// [`bind`]: Self::bind
  #[inline]
  pub fn with(mut self, name: &str, term: Term) -> Self {
    self.bind(name, term);
    self
  }

  #[inline]
  pub(crate) fn remove(&mut self, name: &str) {
    self.inner.remove(name);
  }

  /// Removes every binding.
  #[inline]
  pub fn clear(&mut self) {
    self.inner.clear();
  }

  /// Returns the number of bound variables.
  #[inline]
  pub fn len(&self) -> usize {
    self.inner.len()
  }

  /// Returns `true` if nothing is bound.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  // ---------------------------------------------------------------------------
  // Typed Extraction
  // ---------------------------------------------------------------------------

  /// Returns the term bound to `name`.
  #[inline]
  pub fn term(&self, name: &str) -> Option<&Term> {
    self.inner.get(name)
  }

  /// Returns the atom bound to `name`.
  #[inline]
  pub fn atom(&self, name: &str) -> Option<Atom> {
    self.term(name).and_then(Term::as_atom)
  }

  /// Returns the pid bound to `name`.
  #[inline]
  pub fn pid(&self, name: &str) -> Option<Pid> {
    self.term(name).and_then(Term::as_pid)
  }

  /// Returns the reference bound to `name`.
  #[inline]
  pub fn reference(&self, name: &str) -> Option<Reference> {
    match self.term(name) {
      Some(Term::Ref(reference)) => Some(*reference),
      _ => None,
    }
  }

  /// Returns the elements of the tuple bound to `name`.
  #[inline]
  pub fn tuple(&self, name: &str) -> Option<&[Term]> {
    self.term(name).and_then(Term::as_tuple)
  }

  /// Returns the elements of the list bound to `name`.
  #[inline]
  pub fn list(&self, name: &str) -> Option<&[Term]> {
    self.term(name).and_then(Term::as_list)
  }

  /// Returns the text bound to `name` (string, charlist, or iolist).
  #[inline]
  pub fn string(&self, name: &str) -> Option<String> {
    self.term(name).and_then(Term::to_text)
  }

  /// Returns the integer bound to `name`.
  #[inline]
  pub fn int(&self, name: &str) -> Option<i64> {
    match self.term(name) {
      Some(Term::Int(value)) => Some(*value),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::core::Atom;
  use crate::core::Bindings;
  use crate::core::Term;

  #[test]
  fn test_typed_extraction() {
    let bindings: Bindings = Bindings::new()
      .with("A", Term::atom("ok"))
      .with("I", Term::Int(7))
      .with("S", Term::list([Term::Int(104), Term::Int(105)]))
      .with("T", Term::tuple([Term::Int(1)]));

    assert_eq!(bindings.atom("A"), Some(Atom::new("ok")));
    assert_eq!(bindings.int("I"), Some(7));
    assert_eq!(bindings.string("S").as_deref(), Some("hi"));
    assert_eq!(bindings.tuple("T"), Some(&[Term::Int(1)][..]));
  }

  #[test]
  fn test_wrong_type_is_none() {
    let bindings: Bindings = Bindings::new().with("A", Term::atom("ok"));

    assert_eq!(bindings.int("A"), None);
    assert_eq!(bindings.pid("A"), None);
    assert_eq!(bindings.reference("A"), None);
    assert_eq!(bindings.list("A"), None);
    assert_eq!(bindings.term("Missing"), None);
  }
}
