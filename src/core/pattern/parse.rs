//! Recursive-descent parser for pattern text.
//!
//! ```text
//! pattern := tuple | list | var | atom | number | string
//! tuple   := '{' [pattern (',' pattern)*] '}'
//! list    := '[' [pattern (',' pattern)*] ']'
//! var     := [A-Z_][A-Za-z0-9_@]*
//! atom    := [a-z][A-Za-z0-9_@]* | '\'' chars '\''
//! number  := ['-'] digits ['.' digits]
//! string  := '"' chars '"'
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use crate::core::Atom;
use crate::core::AtomTableError;
use crate::core::PatternError;
use crate::core::Term;
use crate::core::pattern::Node;

pub(crate) fn parse(text: &str) -> Result<Node, PatternError> {
  let mut parser: Parser<'_> = Parser {
    text,
    iter: text.char_indices().peekable(),
  };

  let node: Node = parser.pattern()?;

  parser.skip_whitespace();

  match parser.iter.peek() {
    None => Ok(node),
    Some(&(offset, _)) => Err(parser.error(offset, "unexpected trailing input")),
  }
}

struct Parser<'a> {
  text: &'a str,
  iter: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
  fn error(&self, offset: usize, message: &'static str) -> PatternError {
    PatternError::Syntax { offset, message }
  }

  fn offset(&mut self) -> usize {
    self.iter.peek().map_or(self.text.len(), |&(offset, _)| offset)
  }

  fn skip_whitespace(&mut self) {
    while self.iter.next_if(|(_, char)| char.is_whitespace()).is_some() {}
  }

  fn expect(&mut self, expected: char, message: &'static str) -> Result<(), PatternError> {
    self.skip_whitespace();

    match self.iter.next() {
      Some((_, char)) if char == expected => Ok(()),
      Some((offset, _)) => Err(self.error(offset, message)),
      None => Err(self.error(self.text.len(), message)),
    }
  }

  fn pattern(&mut self) -> Result<Node, PatternError> {
    self.skip_whitespace();

    let offset: usize = self.offset();

    match self.iter.peek().map(|&(_, char)| char) {
      Some('{') => self.sequence('{', '}').map(Node::Tuple),
      Some('[') => self.sequence('[', ']').map(Node::List),
      Some('\'') => self.quoted_atom(),
      Some('"') => self.string(),
      Some(char) if char == '-' || char.is_ascii_digit() => self.number(),
      Some(char) if char == '_' || char.is_ascii_uppercase() => {
        let name: &str = self.identifier();

        if name.starts_with('_') {
          Ok(Node::Wildcard)
        } else {
          Ok(Node::Var(Box::from(name)))
        }
      }
      Some(char) if char.is_ascii_lowercase() => {
        let name: &str = self.identifier();
        let atom: Atom = Atom::try_new(name).map_err(|error| self.atom_error(offset, error))?;

        Ok(Node::Literal(Term::Atom(atom)))
      }
      Some(_) => Err(self.error(offset, "unexpected character")),
      None => Err(self.error(offset, "unexpected end of pattern")),
    }
  }

  fn sequence(&mut self, open: char, close: char) -> Result<Vec<Node>, PatternError> {
    self.expect(open, "expected opening bracket")?;
    self.skip_whitespace();

    let mut items: Vec<Node> = Vec::new();

    if self.iter.next_if(|&(_, char)| char == close).is_some() {
      return Ok(items);
    }

    'items: loop {
      items.push(self.pattern()?);
      self.skip_whitespace();

      match self.iter.next() {
        Some((_, ',')) => continue 'items,
        Some((_, char)) if char == close => break 'items,
        Some((offset, _)) => return Err(self.error(offset, "expected ',' or closing bracket")),
        None => return Err(self.error(self.text.len(), "unterminated sequence")),
      }
    }

    Ok(items)
  }

  fn identifier(&mut self) -> &'a str {
    let text: &'a str = self.text;
    let start: usize = self.offset();
    let mut end: usize = start;

    while let Some((offset, char)) = self
      .iter
      .next_if(|&(_, char)| char.is_ascii_alphanumeric() || char == '_' || char == '@')
    {
      end = offset + char.len_utf8();
    }

    &text[start..end]
  }

  fn quoted(&mut self, quote: char) -> Result<String, PatternError> {
    let start: usize = self.offset();
    let mut output: String = String::new();

    self.iter.next();

    'chars: loop {
      match self.iter.next() {
        Some((_, char)) if char == quote => break 'chars,
        Some((_, '\\')) => match self.iter.next() {
          Some((_, 'n')) => output.push('\n'),
          Some((_, 't')) => output.push('\t'),
          Some((_, char)) => output.push(char),
          None => return Err(self.error(start, "unterminated quoted text")),
        },
        Some((_, char)) => output.push(char),
        None => return Err(self.error(start, "unterminated quoted text")),
      }
    }

    Ok(output)
  }

  fn quoted_atom(&mut self) -> Result<Node, PatternError> {
    let offset: usize = self.offset();
    let name: String = self.quoted('\'')?;
    let atom: Atom = Atom::try_new(&name).map_err(|error| self.atom_error(offset, error))?;

    Ok(Node::Literal(Term::Atom(atom)))
  }

  fn string(&mut self) -> Result<Node, PatternError> {
    self.quoted('"').map(|text| Node::Literal(Term::String(text)))
  }

  fn number(&mut self) -> Result<Node, PatternError> {
    let start: usize = self.offset();
    let mut end: usize = start;
    let mut float: bool = false;

    if let Some((offset, _)) = self.iter.next_if(|&(_, char)| char == '-') {
      end = offset + 1;
    }

    while let Some((offset, char)) = self
      .iter
      .next_if(|&(_, char)| char.is_ascii_digit() || (char == '.' && !float))
    {
      float |= char == '.';
      end = offset + 1;
    }

    let text: &'a str = &self.text[start..end];

    if float {
      text
        .parse::<f64>()
        .map(|value| Node::Literal(Term::Float(value)))
        .map_err(|_| self.error(start, "invalid float literal"))
    } else {
      text
        .parse::<i64>()
        .map(|value| Node::Literal(Term::Int(value)))
        .map_err(|_| self.error(start, "invalid integer literal"))
    }
  }

  fn atom_error(&self, offset: usize, error: AtomTableError) -> PatternError {
    match error {
      AtomTableError::AtomTooLarge => self.error(offset, "atom too large"),
      _ => self.error(offset, "atom table full"),
    }
  }
}
