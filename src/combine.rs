//! A small parser-combinator substrate.
//!
//! A `Parser<T>` is a boxed, reference-counted closure from `(input, index)`
//! to `Option<(T, index)>`, threading a single mutable [`Stop`](crate::error::Stop)
//! through the call so that on failure the furthest position reached and the
//! terms expected there survive the whole combinator tree, not just the
//! failing branch. This in-place `Stop` mutation is a deliberate, scoped
//! optimization; it never escapes a single [`Parser::parse`] call.

use crate::error::{update, Result, Stop};
use crate::util::quote_swap;
use regex::Regex;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::rc::Rc;

type Method<T> = dyn for<'a> Fn(&'a str, usize, &mut Stop) -> Option<(T, usize)>;

/// An immutable, cheaply-cloneable parser over `&str`.
pub struct Parser<T>(Rc<Method<T>>);

impl<T> Clone for Parser<T> {
  fn clone(&self) -> Self {
    Parser(Rc::clone(&self.0))
  }
}

// Lets combinators accept either an owned `Parser<T>` or a `&Parser<T>`
// without forcing every call site to clone explicitly.
impl<T> From<&Parser<T>> for Parser<T> {
  fn from(x: &Parser<T>) -> Self {
    x.clone()
  }
}

impl<T: 'static> Parser<T> {
  /// Lift a raw `(input, index, stop) -> Option<(value, index)>` function
  /// into a `Parser`. The escape hatch for primitives that don't fit the
  /// combinators below.
  pub fn base<F>(f: F) -> Self
  where
    F: for<'a> Fn(&'a str, usize, &mut Stop) -> Option<(T, usize)> + 'static,
  {
    Parser(Rc::new(f))
  }

  fn call<'a>(&self, x: &'a str, i: usize, stop: &mut Stop) -> Option<(T, usize)> {
    (self.0)(x, i, stop)
  }

  /// Run the parser against the full input, requiring it to consume all of
  /// it.
  pub fn parse(&self, input: &str) -> Result<T> {
    let mut stop = Stop::default();
    match self.call(input, 0, &mut stop) {
      Some((value, i)) if i == input.len() => return Ok(value),
      Some((_, i)) => update(Rc::from("end of input"), i, &mut stop),
      None => {}
    }
    Err(crate::error::render(input, &stop).into())
  }

  /// Sequence `self` then `other`, keeping both results as a tuple.
  pub fn and<U: 'static>(&self, other: impl Into<Parser<U>>) -> Parser<(T, U)> {
    all2((self.clone(), other.into()))
  }

  /// Sequence `self` then `other`, keeping only `self`'s result.
  pub fn skip<U: 'static>(&self, other: impl Into<Parser<U>>) -> Parser<T> {
    map(self.and(other), |(a, _)| a)
  }

  /// Sequence `self` then `other`, keeping only `other`'s result.
  pub fn then<U: 'static>(&self, other: impl Into<Parser<U>>) -> Parser<U> {
    map(self.and(other), |(_, b)| b)
  }

  /// Ordered choice between `self` and `other`: `self` wins if it matches.
  pub fn or(&self, other: impl Into<Parser<T>>) -> Parser<T> {
    any(&[self.clone(), other.into()])
  }

  /// Transform a successful result; failures (and their `Stop`) pass through.
  pub fn map<U: 'static, F: Fn(T) -> U + 'static>(&self, f: F) -> Parser<U> {
    map(self.clone(), f)
  }

  /// Greedy `min..` repetition of `self`.
  pub fn repeat(&self, min: usize) -> Parser<Vec<T>> {
    repeat(self.clone(), min)
  }

  /// `self (separator self)*`, with at least `min` items.
  pub fn sep<S: 'static>(&self, separator: impl Into<Parser<S>>, min: usize) -> Parser<Vec<T>>
  where
    T: Clone,
  {
    sep(self.clone(), separator.into(), min)
  }
}

// Primitives.

/// Anchor `re` at the current position and run `callback` over the match.
pub fn regexp<A: 'static, F: Fn(&str) -> A + 'static>(re: &str, callback: F) -> Parser<A> {
  let expected: Rc<str> = Rc::from(format!("/{}/", re));
  let re = Regex::new(&format!("^(?:{})", re)).expect("invalid regex literal in grammar");
  Parser::base(move |x, i, stop| {
    if let Some(m) = re.find(&x[i..]) {
      return Some((callback(m.as_str()), i + m.end()));
    }
    update(Rc::clone(&expected), i, stop);
    None
  })
}

/// Match a literal string exactly, quote-swapping the `expected` message if
/// the literal itself contains a double quote.
pub fn string<A: 'static, F: Fn(&str) -> A + 'static>(literal: &str, callback: F) -> Parser<A> {
  let text = literal.to_string();
  let printed = if text.contains('"') { format!("'{}'", quote_swap(&text)) } else { format!("{:?}", text) };
  let expected: Rc<str> = Rc::from(printed);
  Parser::base(move |x, i, stop| {
    if x[i..].starts_with(text.as_str()) {
      return Some((callback(&text), i + text.len()));
    }
    update(Rc::clone(&expected), i, stop);
    None
  })
}

/// Zero-width success.
pub fn succeed<A: 'static + Clone>(value: A) -> Parser<A> {
  Parser::base(move |_, i, _| Some((value.clone(), i)))
}

/// Zero-width failure carrying a fixed set of expected terms.
pub fn fail<A: 'static>(expected: &[&str]) -> Parser<A> {
  let expected: Vec<Rc<str>> = expected.iter().map(|x| Rc::from(*x)).collect();
  Parser::base(move |_, i, stop| {
    for x in &expected {
      update(Rc::clone(x), i, stop);
    }
    None
  })
}

// Combinators.

/// Ordered choice at the same starting position: the first parser to
/// succeed wins; on total failure the `Stop`s of every branch are merged.
pub fn any<A: 'static>(parsers: &[impl Borrow<Parser<A>>]) -> Parser<A> {
  let parsers: Vec<Parser<A>> = parsers.iter().map(|x| x.borrow().clone()).collect();
  Parser::base(move |x, i, stop| parsers.iter().find_map(|p| p.call(x, i, stop)))
}

/// Transform a parser's successful result.
pub fn map<A: 'static, B: 'static, F: Fn(A) -> B + 'static>(
  parser: impl Into<Parser<A>>,
  callback: F,
) -> Parser<B> {
  let parser = parser.into();
  Parser::base(move |x, i, stop| parser.call(x, i, stop).map(|(value, i)| (callback(value), i)))
}

/// Always succeed, returning `None` if the inner parser fails.
pub fn opt<A: 'static>(parser: impl Into<Parser<A>>) -> Parser<Option<A>> {
  let parser = parser.into();
  Parser::base(move |x, i, stop| match parser.call(x, i, stop) {
    Some((value, i)) => Some((Some(value), i)),
    None => Some((None, i)),
  })
}

/// Greedy `min..` repetition.
pub fn repeat<A: 'static>(parser: impl Into<Parser<A>>, min: usize) -> Parser<Vec<A>> {
  let parser = parser.into();
  Parser::base(move |x, i, stop| {
    let mut position = i;
    let mut result = vec![];
    while let Some((value, next)) = parser.call(x, position, stop) {
      position = next;
      result.push(value);
    }
    if result.len() < min {
      None
    } else {
      Some((result, position))
    }
  })
}

/// `item (separator item)*`, with at least `min` items. When `min == 0` an
/// empty input matches with an empty list.
pub fn sep<A: 'static + Clone, S: 'static>(
  item: impl Into<Parser<A>>,
  separator: impl Into<Parser<S>>,
  min: usize,
) -> Parser<Vec<A>> {
  let (item, separator) = (item.into(), separator.into());
  let rest = separator.then(item.clone());
  let tail_min = min.saturating_sub(1);
  let list = map(item.and(rest.repeat(tail_min)), |(head, mut tail)| {
    let mut result = vec![head];
    result.append(&mut tail);
    result
  });
  if min == 0 {
    any(&[list, succeed(vec![])])
  } else {
    list
  }
}

/// Defer construction of a parser until first use, to break recursive
/// grammar definitions. Returns a write-once cell and the parser that reads
/// through it; the grammar calls `cell.replace(...)` once the recursive
/// rules it depends on are all in scope.
pub fn lazy<A: 'static>() -> (Rc<RefCell<Parser<A>>>, Parser<A>) {
  let cell: Rc<RefCell<Parser<A>>> = Rc::new(RefCell::new(fail(&["<uninitialized lazy parser>"])));
  let inner = Rc::clone(&cell);
  let parser = Parser::base(move |x, i, stop| inner.borrow().call(x, i, stop));
  (cell, parser)
}

/// Two-parser sequence, yielding both results as a tuple.
pub fn all2<A: 'static, B: 'static>(
  parsers: (impl Into<Parser<A>>, impl Into<Parser<B>>),
) -> Parser<(A, B)> {
  let (a, b) = (parsers.0.into(), parsers.1.into());
  Parser::base(move |x, i, stop| {
    let (a, i) = a.call(x, i, stop)?;
    let (b, i) = b.call(x, i, stop)?;
    Some(((a, b), i))
  })
}

/// Three-parser sequence.
pub fn all3<A: 'static, B: 'static, C: 'static>(
  parsers: (impl Into<Parser<A>>, impl Into<Parser<B>>, impl Into<Parser<C>>),
) -> Parser<(A, B, C)> {
  let (a, b, c) = (parsers.0.into(), parsers.1.into(), parsers.2.into());
  Parser::base(move |x, i, stop| {
    let (a, i) = a.call(x, i, stop)?;
    let (b, i) = b.call(x, i, stop)?;
    let (c, i) = c.call(x, i, stop)?;
    Some(((a, b, c), i))
  })
}

/// Four-parser sequence.
pub fn all4<A: 'static, B: 'static, C: 'static, D: 'static>(
  parsers: (impl Into<Parser<A>>, impl Into<Parser<B>>, impl Into<Parser<C>>, impl Into<Parser<D>>),
) -> Parser<(A, B, C, D)> {
  let (a, b, c, d) = (parsers.0.into(), parsers.1.into(), parsers.2.into(), parsers.3.into());
  Parser::base(move |x, i, stop| {
    let (a, i) = a.call(x, i, stop)?;
    let (b, i) = b.call(x, i, stop)?;
    let (c, i) = c.call(x, i, stop)?;
    let (d, i) = d.call(x, i, stop)?;
    Some(((a, b, c, d), i))
  })
}
