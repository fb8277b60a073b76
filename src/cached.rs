//! A lazily-computed, reference-counted string cache.
//!
//! Implement [`Base`] for a recursive expression-tree type and wrap it in
//! [`Cached`] to get a [`DataType`] whose `Eq`/`Hash`/`PartialEq` are all
//! defined by canonical string equality - `x == y` iff `x.to_string() ==
//! y.to_string()` - rather than structural equality, so two differently
//! shaped trees that stringify the same compare equal. The cache is
//! computed once per node, lazily, behind an `UnsafeCell`; nothing ever
//! invalidates it, since a `Cached<T>` is immutable after construction.

use std::cell::UnsafeCell;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::Result;
use crate::template::{DataType, Template};

/// What a node type must provide to be wrapped in [`Cached`]. `PartialEq`
/// here need not canonicalize - `Cached`'s own `PartialEq` is what callers
/// actually see, and it always goes through `Display`.
pub trait Base: 'static + Default + Display + PartialEq {
  /// Whether `self` is a raw lexical atom (e.g. a terminal/leaf node).
  fn is_base(&self) -> bool;
  /// Build a raw lexical atom directly from lexer text.
  fn make_base(text: &str) -> Self;
  /// A cached singleton for `Self::default()`, so repeatedly asking for the
  /// domain's null value doesn't re-run `Display` to populate a fresh cache.
  fn default_static() -> Cached<Self>
  where
    Self: Sized;
  fn template(input: &str) -> Result<Rc<dyn Template<Cached<Self>>>>
  where
    Self: Sized;
}

#[derive(Debug)]
pub struct Cached<T>(Rc<(T, UnsafeCell<String>)>);

impl<T: Base> Cached<T> {
  pub fn new(base: T) -> Self {
    Self(Rc::new((base, UnsafeCell::default())))
  }

  pub fn expr(&self) -> &T {
    &(self.0).0
  }

  pub fn repr(&self) -> &str {
    let x = unsafe { &mut *(self.0).1.get() };
    if x.is_empty() {
      *x = self.expr().to_string();
    }
    x
  }
}

impl<T: Base> Clone for Cached<T> {
  fn clone(&self) -> Self {
    Self(Rc::clone(&self.0))
  }
}

impl<T: Base> Default for Cached<T> {
  fn default() -> Self {
    T::default_static()
  }
}

impl<T: Base> Eq for Cached<T> {}

impl<T: Base> Hash for Cached<T> {
  fn hash<H: Hasher>(&self, h: &mut H) {
    self.repr().hash(h);
  }
}

impl<T: Base> PartialEq for Cached<T> {
  fn eq(&self, other: &Self) -> bool {
    self.repr() == other.repr()
  }
}

impl<T: Base> DataType for Cached<T> {
  fn is_base(&self) -> bool {
    self.expr().is_base()
  }

  fn is_null(&self) -> bool {
    *self.expr() == T::default()
  }

  fn make_base(text: &str) -> Self {
    Self::new(T::make_base(text))
  }

  fn make_null() -> Self {
    Self::default()
  }

  fn parse(input: &str) -> Result<Self> {
    let default = Self::default();
    if input == default.repr() {
      return Ok(default);
    }
    let result = Self::template(input)?.merge(&vec![]);
    if result.is_null() {
      return Err(format!("Empty value: {}", input).into());
    }
    Ok(result)
  }

  fn stringify(&self) -> String {
    self.repr().to_string()
  }

  fn template(input: &str) -> Result<Rc<dyn Template<Self>>> {
    T::template(input)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Default, PartialEq)]
  enum Toy {
    #[default]
    Nil,
    Leaf(String),
  }

  impl Display for Toy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
        Toy::Nil => write!(f, "-"),
        Toy::Leaf(x) => write!(f, "{}", x),
      }
    }
  }

  impl Base for Toy {
    fn is_base(&self) -> bool {
      matches!(self, Toy::Leaf(_))
    }
    fn make_base(text: &str) -> Self {
      Toy::Leaf(text.to_string())
    }
    fn default_static() -> Cached<Self> {
      Cached::new(Toy::Nil)
    }
    fn template(_: &str) -> Result<Rc<dyn Template<Cached<Self>>>> {
      unimplemented!()
    }
  }

  #[test]
  fn repr_is_computed_once_and_cached() {
    let x = Cached::new(Toy::Leaf("hi".to_string()));
    assert_eq!(x.repr(), "hi");
    assert_eq!(x.repr(), "hi");
  }

  #[test]
  fn equality_and_hash_go_through_the_string_representation() {
    let a = Cached::new(Toy::Leaf("hi".to_string()));
    let b = Cached::new(Toy::Leaf("hi".to_string()));
    assert_eq!(a, b);
    assert_ne!(a, Cached::<Toy>::default());
  }

  #[test]
  fn default_is_the_domains_null_sentinel() {
    assert!(Cached::<Toy>::default().is_null());
    assert!(!Cached::new(Toy::Leaf("hi".to_string())).is_null());
  }
}
