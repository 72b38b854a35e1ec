//! Best-effort rendering of `io_lib:format/2` calls carried by `put_chars`.
//!
//! Supported control sequences: `~p ~w ~s ~a ~b ~e ~f ~n ~~ ~c`, with an
//! optional `.precision` (`~.2f`, `~.16b`). Anything else, or arguments
//! that do not fit their control, makes the caller fall back to a raw
//! `module:function(args)` rendering.

use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

use crate::core::Term;

/// Largest `.precision` accepted in a control sequence.
const MAX_PRECISION: usize = 64;

/// Resolves the text of a `{put_chars, Mod, Fun, Args}` request.
pub(crate) fn apply(module: &Term, function: &Term, args: &Term) -> String {
  let formatted: Option<String> = match (module, function, args) {
    (module, function, Term::List(args))
      if module.is_atom("io_lib") && (function.is_atom("format") || function.is_atom("fwrite")) =>
    {
      match args.as_slice() {
        [format, Term::List(data)] => format.to_text().and_then(|format| self::format(&format, data)),
        _ => None,
      }
    }
    _ => None,
  };

  formatted.unwrap_or_else(|| raw(module, function, args))
}

/// Renders `module:function(args)` verbatim.
pub(crate) fn raw(module: &Term, function: &Term, args: &Term) -> String {
  let mut output: String = String::new();
  let _ignore = write!(output, "{module}:{function}(");

  match args {
    Term::List(items) => {
      for (index, item) in items.iter().enumerate() {
        if index > 0 {
          output.push(',');
        }

        let _ignore = write!(output, "{item}");
      }
    }
    other => {
      let _ignore = write!(output, "{other}");
    }
  }

  output.push(')');
  output
}

/// Formats `data` according to `format`, or `None` if they do not agree.
pub(crate) fn format(format: &str, data: &[Term]) -> Option<String> {
  let mut output: String = String::with_capacity(format.len());
  let mut chars: Peekable<Chars<'_>> = format.chars().peekable();
  let mut args = data.iter();

  while let Some(char) = chars.next() {
    if char != '~' {
      output.push(char);
      continue;
    }

    let precision: Option<usize> = precision(&mut chars)?;

    match chars.next()? {
      '~' => output.push('~'),
      'n' => output.push('\n'),
      'p' => write_pretty(&mut output, args.next()?),
      'w' => write!(output, "{}", args.next()?).ok()?,
      's' => output.push_str(&text(args.next()?)?),
      'a' => output.push_str(args.next()?.as_atom()?.as_str()),
      'c' => output.push(character(args.next()?)?),
      'b' | 'B' => output.push_str(&integer(args.next()?, precision.unwrap_or(10))?),
      'f' => write!(output, "{:.*}", precision.unwrap_or(6), float(args.next()?)?).ok()?,
      'e' => output.push_str(&scientific(float(args.next()?)?, precision.unwrap_or(6))),
      _ => return None,
    }
  }

  if args.next().is_some() {
    return None;
  }

  Some(output)
}

fn precision(chars: &mut Peekable<Chars<'_>>) -> Option<Option<usize>> {
  if chars.next_if_eq(&'.').is_none() {
    return Some(None);
  }

  let mut value: usize = 0;
  let mut digits: usize = 0;

  while let Some(digit) = chars.peek().and_then(|char| char.to_digit(10)) {
    chars.next();
    value = value.checked_mul(10)?.checked_add(digit as usize)?;
    digits += 1;
  }

  if digits == 0 || value > MAX_PRECISION {
    None
  } else {
    Some(Some(value))
  }
}

fn text(term: &Term) -> Option<String> {
  match term {
    Term::Atom(atom) => Some(atom.as_str().to_owned()),
    _ => term.to_text(),
  }
}

fn character(term: &Term) -> Option<char> {
  match term {
    Term::Int(value) => u32::try_from(*value).ok().and_then(char::from_u32),
    _ => None,
  }
}

fn float(term: &Term) -> Option<f64> {
  match term {
    Term::Float(value) => Some(*value),
    Term::Int(value) => Some(*value as f64),
    _ => None,
  }
}

fn integer(term: &Term, radix: usize) -> Option<String> {
  let Term::Int(value) = term else {
    return None;
  };

  if !(2..=36).contains(&radix) {
    return None;
  }

  let mut digits: Vec<char> = Vec::new();
  let mut magnitude: u64 = value.unsigned_abs();

  'digits: loop {
    digits.push(char::from_digit((magnitude % radix as u64) as u32, radix as u32)?.to_ascii_uppercase());
    magnitude /= radix as u64;

    if magnitude == 0 {
      break 'digits;
    }
  }

  if *value < 0 {
    digits.push('-');
  }

  Some(digits.into_iter().rev().collect())
}

/// Erlang `~e`: `precision` significant digits and a signed exponent.
fn scientific(value: f64, precision: usize) -> String {
  let rendered: String = format!("{:.*e}", precision.max(1) - 1, value);

  match rendered.split_once('e') {
    Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
    _ => rendered,
  }
}

/// Erlang `~p`: like `~w` but printable lists render as strings.
fn write_pretty(output: &mut String, term: &Term) {
  match term {
    Term::List(_) if term.is_printable_list() => {
      let text: String = term.to_text().unwrap_or_default();
      let _ignore = write!(output, "{}", Term::String(text));
    }
    Term::List(items) => write_pretty_seq(output, '[', items, ']'),
    Term::Tuple(items) => write_pretty_seq(output, '{', items, '}'),
    _ => {
      let _ignore = write!(output, "{term}");
    }
  }
}

fn write_pretty_seq(output: &mut String, open: char, items: &[Term], close: char) {
  output.push(open);

  for (index, item) in items.iter().enumerate() {
    if index > 0 {
      output.push(',');
    }

    write_pretty(output, item);
  }

  output.push(close);
}

#[cfg(test)]
mod tests {
  use crate::core::Term;
  use crate::server::format::apply;
  use crate::server::format::format;

  fn charlist(text: &str) -> Term {
    Term::list(text.chars().map(|char| Term::Int(char as i64)))
  }

  #[test]
  fn test_plain_and_escapes() {
    assert_eq!(format("a~~b~n", &[]).as_deref(), Some("a~b\n"));
  }

  #[test]
  fn test_p_and_w() {
    let data: [Term; 2] = [charlist("hi"), charlist("hi")];

    assert_eq!(format("~p ~w", &data).as_deref(), Some("\"hi\" [104,105]"));
    assert_eq!(
      format("~p", &[Term::tuple([Term::atom("ok"), Term::Int(1)])]).as_deref(),
      Some("{ok,1}"),
    );
  }

  #[test]
  fn test_s_and_a() {
    let data: [Term; 2] = [Term::string("text"), Term::atom("name")];

    assert_eq!(format("~s/~a", &data).as_deref(), Some("text/name"));
    assert_eq!(format("~s", &[Term::list([charlist("ab"), Term::string("c")])]).as_deref(), Some("abc"));
  }

  #[test]
  fn test_numbers() {
    assert_eq!(format("~b", &[Term::Int(-42)]).as_deref(), Some("-42"));
    assert_eq!(format("~.16b", &[Term::Int(255)]).as_deref(), Some("FF"));
    assert_eq!(format("~f", &[Term::Float(1.5)]).as_deref(), Some("1.500000"));
    assert_eq!(format("~.2f", &[Term::Int(3)]).as_deref(), Some("3.00"));
    assert_eq!(format("~e", &[Term::Float(1234.5)]).as_deref(), Some("1.23450e+3"));
    assert_eq!(format("~.3e", &[Term::Float(0.00125)]).as_deref(), Some("1.25e-3"));
    assert_eq!(format("~c", &[Term::Int(65)]).as_deref(), Some("A"));
  }

  #[test]
  fn test_mismatch_is_none() {
    assert_eq!(format("~s", &[]), None);
    assert_eq!(format("~b", &[Term::atom("x")]), None);
    assert_eq!(format("~z", &[Term::Int(1)]), None);
    assert_eq!(format("plain", &[Term::Int(1)]), None);
    assert_eq!(format("~", &[]), None);
    assert_eq!(format("~.70000f", &[Term::Float(1.0)]), None);
    assert_eq!(format("~.99999999999999999999999e", &[Term::Float(1.0)]), None);
    assert_eq!(format("~.65f", &[Term::Float(1.0)]), None);
  }

  #[test]
  fn test_apply_io_lib_format() {
    let args: Term = Term::list([charlist("~s=~p~n"), Term::list([Term::string("x"), Term::Int(5)])]);

    assert_eq!(apply(&Term::atom("io_lib"), &Term::atom("format"), &args), "x=5\n");
    assert_eq!(apply(&Term::atom("io_lib"), &Term::atom("fwrite"), &args), "x=5\n");
  }

  #[test]
  fn test_apply_falls_back_to_raw() {
    let bad: Term = Term::list([Term::string("~b"), Term::list([Term::atom("x")])]);
    let other: Term = Term::list([Term::Int(1), Term::atom("a")]);

    assert_eq!(
      apply(&Term::atom("io_lib"), &Term::atom("format"), &bad),
      "io_lib:format(\"~b\",[x])",
    );
    assert_eq!(apply(&Term::atom("mymod"), &Term::atom("render"), &other), "mymod:render(1,a)");

    let wide: Term = Term::list([Term::string("~.70000f"), Term::list([Term::Float(1.0)])]);

    assert_eq!(
      apply(&Term::atom("io_lib"), &Term::atom("format"), &wide),
      "io_lib:format(\"~.70000f\",[1.0])",
    );
  }
}
