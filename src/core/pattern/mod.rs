//! Textual term patterns with variable binding and substitution.
//!
//! Patterns use Erlang term syntax. Names starting with an uppercase letter
//! are variables; `_` and names starting with `_` match anything without
//! binding. A variable appearing twice must match equal terms.
//!
//! # Examples
//!
//! ```
//! use ernode::core::Bindings;
//! use ernode::core::Pattern;
//! use ernode::core::Term;
//!
//! let pattern = Pattern::parse("{reply, Value, Value}").unwrap();
//! let mut bindings = Bindings::new();
//!
//! let term = Term::tuple([Term::atom("reply"), Term::Int(1), Term::Int(1)]);
//! assert!(pattern.match_term(&term, &mut bindings));
//! assert_eq!(bindings.int("Value"), Some(1));
//!
//! let reply = Pattern::parse("{ok, Value}").unwrap();
//! assert_eq!(reply.subst(&bindings).unwrap().to_string(), "{ok,1}");
//! ```

mod bindings;
mod parse;

use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Term;

pub use self::bindings::Bindings;

// -----------------------------------------------------------------------------
// Pattern Error
// -----------------------------------------------------------------------------

/// Errors returned when parsing or substituting a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatternError {
  /// The pattern text is malformed at `offset` (in bytes).
  Syntax {
    offset: usize,
    message: &'static str,
  },
  /// Substitution found a variable with no binding.
  Unbound(Box<str>),
  /// Substitution found a wildcard, which has no value.
  Wildcard,
}

impl Display for PatternError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Syntax { offset, message } => write!(f, "{message} at offset {offset}"),
      Self::Unbound(name) => write!(f, "unbound variable: {name}"),
      Self::Wildcard => f.write_str("wildcard in substitution"),
    }
  }
}

impl Error for PatternError {}

// -----------------------------------------------------------------------------
// Pattern
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
  Wildcard,
  Var(Box<str>),
  Literal(Term),
  Tuple(Vec<Node>),
  List(Vec<Node>),
}

/// A parsed term pattern.
#[derive(Clone, PartialEq)]
pub struct Pattern {
  node: Node,
  text: Box<str>,
}

impl Pattern {
  /// Parses pattern text.
  ///
  /// # Errors
  ///
  /// Returns [`PatternError::Syntax`] if the text is malformed.
  pub fn parse(text: &str) -> Result<Self, PatternError> {
    Ok(Self {
      node: parse::parse(text)?,
      text: Box::from(text),
    })
  }

  /// Returns the source text of this pattern.
  #[inline]
  pub fn as_str(&self) -> &str {
    &self.text
  }

  /// Matches `term`, adding new variable bindings on success.
  ///
  /// Variables already present in `bindings` must match equal terms. On
  /// failure `bindings` is left as it was.
  pub fn match_term(&self, term: &Term, bindings: &mut Bindings) -> bool {
    let mut added: Vec<&str> = Vec::new();

    if match_node(&self.node, term, bindings, &mut added) {
      return true;
    }

    for name in added {
      bindings.remove(name);
    }

    false
  }

  /// Builds a term by replacing every variable with its binding.
  ///
  /// # Errors
  ///
  /// Returns [`PatternError::Unbound`] for a variable missing from
  /// `bindings` and [`PatternError::Wildcard`] for a wildcard.
  pub fn subst(&self, bindings: &Bindings) -> Result<Term, PatternError> {
    subst_node(&self.node, bindings)
  }
}

impl Debug for Pattern {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_tuple("Pattern").field(&self.text).finish()
  }
}

impl Display for Pattern {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str(&self.text)
  }
}

fn match_node<'a>(
  node: &'a Node,
  term: &Term,
  bindings: &mut Bindings,
  added: &mut Vec<&'a str>,
) -> bool {
  match (node, term) {
    (Node::Wildcard, _) => true,
    (Node::Var(name), _) => match bindings.term(name) {
      Some(bound) => bound == term,
      None => {
        bindings.bind(name, term.clone());
        added.push(name);
        true
      }
    },
    (Node::Literal(Term::String(text)), _) => term.to_text().is_some_and(|other| *text == other),
    (Node::Literal(literal), _) => literal == term,
    (Node::Tuple(nodes), Term::Tuple(items)) | (Node::List(nodes), Term::List(items)) => {
      nodes.len() == items.len()
        && nodes
          .iter()
          .zip(items)
          .all(|(node, item)| match_node(node, item, bindings, added))
    }
    _ => false,
  }
}

fn subst_node(node: &Node, bindings: &Bindings) -> Result<Term, PatternError> {
  match node {
    Node::Wildcard => Err(PatternError::Wildcard),
    Node::Var(name) => bindings
      .term(name)
      .cloned()
      .ok_or_else(|| PatternError::Unbound(name.clone())),
    Node::Literal(term) => Ok(term.clone()),
    Node::Tuple(nodes) => subst_all(nodes, bindings).map(Term::Tuple),
    Node::List(nodes) => subst_all(nodes, bindings).map(Term::List),
  }
}

fn subst_all(nodes: &[Node], bindings: &Bindings) -> Result<Vec<Term>, PatternError> {
  nodes.iter().map(|node| subst_node(node, bindings)).collect()
}

// -----------------------------------------------------------------------------
// Pattern Set
// -----------------------------------------------------------------------------

/// An ordered list of patterns tried first to last.
#[derive(Clone, Debug)]
pub struct PatternSet {
  patterns: Vec<Pattern>,
}

impl PatternSet {
  /// Parses every pattern, failing on the first malformed one.
  pub fn new(patterns: &[&str]) -> Result<Self, PatternError> {
    let patterns: Vec<Pattern> = patterns
      .iter()
      .map(|text| Pattern::parse(text))
      .collect::<Result<_, _>>()?;

    Ok(Self { patterns })
  }

  /// Returns the index of the first pattern matching `term`.
  ///
  /// `bindings` is cleared first and holds the winning pattern's bindings
  /// on return.
  pub fn match_term(&self, term: &Term, bindings: &mut Bindings) -> Option<usize> {
    bindings.clear();

    self
      .patterns
      .iter()
      .position(|pattern| pattern.match_term(term, bindings))
  }

  /// Returns the pattern at `index`.
  #[inline]
  pub fn get(&self, index: usize) -> Option<&Pattern> {
    self.patterns.get(index)
  }

  /// Returns the number of patterns.
  #[inline]
  pub fn len(&self) -> usize {
    self.patterns.len()
  }

  /// Returns `true` if the set holds no patterns.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.patterns.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use crate::core::Atom;
  use crate::core::Bindings;
  use crate::core::Pattern;
  use crate::core::PatternError;
  use crate::core::PatternSet;
  use crate::core::Pid;
  use crate::core::Reference;
  use crate::core::Term;

  fn gen_call(pid: Pid, reference: Reference) -> Term {
    Term::tuple([
      Term::atom("$gen_call"),
      Term::tuple([Term::Pid(pid), Term::Ref(reference)]),
      Term::tuple([
        Term::atom("call"),
        Term::atom("math"),
        Term::atom("add"),
        Term::list([Term::Int(1), Term::Int(2)]),
        Term::atom("user"),
      ]),
    ])
  }

  #[test]
  fn test_parse_literals() {
    let pattern: Pattern = Pattern::parse(r#"{ok, -12, 1.5, "text", 'Quoted atom', []}"#).unwrap();
    let term: Term = Term::tuple([
      Term::atom("ok"),
      Term::Int(-12),
      Term::Float(1.5),
      Term::string("text"),
      Term::atom("Quoted atom"),
      Term::nil(),
    ]);

    assert_eq!(pattern.subst(&Bindings::new()), Ok(term));
  }

  #[test]
  fn test_parse_errors() {
    assert!(matches!(Pattern::parse("{ok"), Err(PatternError::Syntax { .. })));
    assert!(matches!(Pattern::parse("{ok} x"), Err(PatternError::Syntax { .. })));
    assert!(matches!(Pattern::parse("'open"), Err(PatternError::Syntax { .. })));
    assert!(matches!(Pattern::parse("#"), Err(PatternError::Syntax { .. })));
    assert!(matches!(Pattern::parse(""), Err(PatternError::Syntax { .. })));
  }

  #[test]
  fn test_match_gen_call() {
    let node: Atom = Atom::new("a@host");
    let pid: Pid = Pid::new(node, 7, 0);
    let reference: Reference = Reference::new(node);
    let pattern: Pattern =
      Pattern::parse("{'$gen_call', {Pid, Ref}, {call, Mod, Fun, Args, GroupLeader}}").unwrap();

    let mut bindings: Bindings = Bindings::new();

    assert!(pattern.match_term(&gen_call(pid, reference), &mut bindings));
    assert_eq!(bindings.pid("Pid"), Some(pid));
    assert_eq!(bindings.reference("Ref"), Some(reference));
    assert_eq!(bindings.atom("Mod"), Some(Atom::new("math")));
    assert_eq!(bindings.atom("Fun"), Some(Atom::new("add")));
    assert_eq!(bindings.list("Args").map(<[Term]>::len), Some(2));
  }

  #[test]
  fn test_repeated_variable_must_be_equal() {
    let pattern: Pattern = Pattern::parse("{X, X}").unwrap();
    let mut bindings: Bindings = Bindings::new();

    assert!(pattern.match_term(&Term::tuple([Term::Int(1), Term::Int(1)]), &mut bindings));

    bindings.clear();

    assert!(!pattern.match_term(&Term::tuple([Term::Int(1), Term::Int(2)]), &mut bindings));
    assert!(bindings.is_empty());
  }

  #[test]
  fn test_existing_bindings_constrain_match() {
    let pattern: Pattern = Pattern::parse("{reply, Ref}").unwrap();
    let mut bindings: Bindings = Bindings::new().with("Ref", Term::Int(9));

    assert!(!pattern.match_term(&Term::tuple([Term::atom("reply"), Term::Int(8)]), &mut bindings));
    assert!(pattern.match_term(&Term::tuple([Term::atom("reply"), Term::Int(9)]), &mut bindings));
  }

  #[test]
  fn test_wildcards_do_not_bind() {
    let pattern: Pattern = Pattern::parse("{_, _Ignored, _}").unwrap();
    let term: Term = Term::tuple([Term::Int(1), Term::Int(2), Term::Int(3)]);
    let mut bindings: Bindings = Bindings::new();

    assert!(pattern.match_term(&term, &mut bindings));
    assert!(bindings.is_empty());
    assert_eq!(pattern.subst(&bindings), Err(PatternError::Wildcard));
  }

  #[test]
  fn test_arity_mismatch() {
    let pattern: Pattern = Pattern::parse("{a, B}").unwrap();
    let mut bindings: Bindings = Bindings::new();

    assert!(!pattern.match_term(&Term::tuple([Term::atom("a")]), &mut bindings));
    assert!(!pattern.match_term(&Term::list([Term::atom("a"), Term::Int(1)]), &mut bindings));
  }

  #[test]
  fn test_string_literal_matches_charlist() {
    let pattern: Pattern = Pattern::parse(r#"{"hi"}"#).unwrap();
    let term: Term = Term::tuple([Term::list([Term::Int(104), Term::Int(105)])]);

    assert!(pattern.match_term(&term, &mut Bindings::new()));
  }

  #[test]
  fn test_subst_unbound() {
    let pattern: Pattern = Pattern::parse("{rex, {Ref, Reply}}").unwrap();
    let bindings: Bindings = Bindings::new().with("Ref", Term::Int(1));

    assert_eq!(
      pattern.subst(&bindings),
      Err(PatternError::Unbound(Box::from("Reply"))),
    );
  }

  #[test]
  fn test_pattern_set_order() {
    let set: PatternSet = PatternSet::new(&["{put_chars, Enc, Chars}", "{put_chars, Chars}", "_"]).unwrap();
    let mut bindings: Bindings = Bindings::new();

    let three: Term = Term::tuple([Term::atom("put_chars"), Term::atom("unicode"), Term::string("x")]);
    let two: Term = Term::tuple([Term::atom("put_chars"), Term::string("y")]);

    assert_eq!(set.match_term(&three, &mut bindings), Some(0));
    assert_eq!(bindings.atom("Enc"), Some(Atom::new("unicode")));

    assert_eq!(set.match_term(&two, &mut bindings), Some(1));
    assert_eq!(bindings.term("Enc"), None);
    assert_eq!(bindings.string("Chars").as_deref(), Some("y"));

    assert_eq!(set.match_term(&Term::Int(0), &mut bindings), Some(2));
    assert_eq!(set.len(), 3);
  }
}
