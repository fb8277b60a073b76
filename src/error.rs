//! The error taxonomy raised by this crate.
//!
//! `ParseError` is raised by `Parser::parse` when the input does not match;
//! it carries everything needed to render the multi-line diagnostic. A
//! `ShapeError` is raised by template coercion when a value is neither the
//! domain's null nor the expected container kind - a programmer error, not
//! a recoverable one. An empty `split` result is not an error at all; it is
//! a plain `Vec::new()` interpreted by callers as "no preimage".

use std::rc::Rc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("{0}")]
  Parse(#[from] ParseError),
  #[error("{0}")]
  Shape(#[from] ShapeError),
  #[error("{0}")]
  Other(String),
}

impl From<String> for Error {
  fn from(message: String) -> Self {
    Error::Other(message)
  }
}

impl From<&str> for Error {
  fn from(message: &str) -> Self {
    Error::Other(message.to_string())
  }
}

/// A rendered parse failure: line/column of the furthest position reached,
/// the sorted set of expected terms there, and the pre-formatted message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
  pub line: usize,
  pub column: usize,
  pub expected: Vec<String>,
  message: String,
}

/// Raised when a template coerces a value into a container kind (dict/list)
/// it cannot be. Well-shaped templates never trigger this; it exists so a
/// shape mismatch fails loudly instead of silently producing garbage.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ShapeError(pub String);

/// Bookkeeping threaded through a single `Parser::parse` call: the furthest
/// position any attempted branch reached, and the expected terms there.
/// Mutating this in place instead of threading a persistent value through
/// every combinator is a deliberate, scoped optimization: the mutation never
/// escapes the `parse` call that owns it.
#[derive(Clone, Debug, Default)]
pub struct Stop {
  pub expected: Vec<Rc<str>>,
  pub position: usize,
}

/// Merge an incoming failure into the running furthest-failure record.
/// The branch that reached further wins outright; a tie unions the
/// expected-term sets.
pub fn update(expected: Rc<str>, position: usize, stop: &mut Stop) {
  if position < stop.position {
    return;
  }
  if position > stop.position {
    stop.expected.clear();
    stop.position = position;
  }
  stop.expected.push(expected);
}

/// Render a `Stop` against its source text into a `ParseError`.
pub fn render(input: &str, stop: &Stop) -> ParseError {
  let total = input.len();
  let index = stop.position.min(total);
  let start = input[..index].rfind('\n').map_or(0, |i| i + 1);
  let end = input[start..].find('\n').map_or(total, |i| start + i);
  let line = input[..start].matches('\n').count() + 1;
  let column = index - start + 1;
  let mut expected: Vec<String> = stop.expected.iter().map(|x| x.to_string()).collect();
  expected.sort();
  expected.dedup();
  let caret = " ".repeat(column.saturating_sub(1));
  let message = format!(
    "At line {}, column {}: Expected: {}\n\n  {}\n  {}^\n",
    line,
    column,
    expected.join(" | "),
    &input[start..end],
    caret
  );
  ParseError { line, column, expected, message }
}
