//! Small generic helpers shared across the parser and template layers.

/// Flatten a sequence of sequences into one, preserving order.
pub fn flatten<T>(xs: Vec<Vec<T>>) -> Vec<T> {
  xs.into_iter().flatten().collect()
}

/// `0..n` as an iterator.
pub fn range(n: usize) -> std::ops::Range<usize> {
  0..n
}

/// Swap `'` and `"` characters in `s`. Used two ways: to print a quoted
/// literal in a parser's `expected` message with readable quoting when the
/// literal itself contains the default quote character, and to normalize a
/// single-quoted string literal to double-quoted form before decoding it.
pub fn quote_swap(s: &str) -> String {
  s.chars().map(|c| match c {
    '\'' => '"',
    '"' => '\'',
    other => other,
  })
  .collect()
}

/// Assert that a nullable value is present, substituting a default if not.
pub fn some_or<T>(x: Option<T>, default: T) -> T {
  x.unwrap_or(default)
}
