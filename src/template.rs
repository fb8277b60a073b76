//! The template abstraction: an invertible `(merge, split)` pair over a
//! value domain `T`, the `DataType<T>`-ish contract each domain binds to its
//! own grammar, and the two generic composition helpers, `cross` and
//! `reindex`, that every concrete template constructor in [`crate::value`]
//! and [`crate::lambda`] is built from.

use std::rc::Rc;

use crate::error::Result;

/// A sparse mapping from a non-negative slot index to a domain value.
/// Absence of a key is distinct from a key bound to the domain's null.
pub type Args<T> = Vec<(usize, T)>;

/// An invertible function pair over a value domain.
///
/// `merge` is total over well-shaped arguments. `split` may legitimately
/// return an empty `Vec` - that is not an error, just "no preimage" - and
/// duality only promises that *some* element of `split(merge(a))` equals
/// `a` restricted to the slots the template actually addresses.
pub trait Template<T> {
  fn merge(&self, xs: &Args<T>) -> T;
  fn split(&self, x: &T) -> Vec<Args<T>>;
}

/// Binds a value domain to its textual grammar. Each concrete domain
/// (`value::Json`, `lambda::Lambda`) implements this directly on itself.
pub trait DataType: Clone + 'static {
  /// Whether `self` is a raw lexical atom rather than a composite value
  /// built by the grammar (e.g. a `Lambda::Single`, or a JSON string).
  fn is_base(&self) -> bool;
  /// Whether `self` is this domain's null sentinel.
  fn is_null(&self) -> bool;
  /// Build a raw lexical atom directly from lexer text, bypassing the
  /// grammar - the counterpart to `is_base`, for callers (outside this
  /// crate's scope) that already know a token's text.
  fn make_base(text: &str) -> Self;
  /// This domain's null sentinel.
  fn make_null() -> Self;
  /// Parse `input` as a literal value (not a template).
  fn parse(input: &str) -> Result<Self>;
  /// Render `self` back to its canonical textual form.
  fn stringify(&self) -> String;
  /// Parse `input` as a template over this domain.
  fn template(input: &str) -> Result<Rc<dyn Template<Self>>>;
}

/// The Cartesian product of two `Args` lists: every output mapping is the
/// union of one mapping from `xs` with one from `ys`. The associative
/// combinator every composite `split` is built from.
pub fn cross<T: Clone>(xs: &[Args<T>], ys: &[Args<T>]) -> Vec<Args<T>> {
  let mut result = Vec::with_capacity(xs.len() * ys.len());
  for x in xs {
    for y in ys {
      result.push(x.iter().cloned().chain(y.iter().cloned()).collect());
    }
  }
  result
}

/// A generic `$n`-style variable template: merges to whichever argument is
/// bound at slot `n` (or null if absent), and splits any value into the
/// single mapping `{n: value}`. Identical for every value domain, so it
/// lives here rather than being duplicated in `value` and `lambda`.
pub struct Variable<T>(usize, std::marker::PhantomData<T>);

impl<T> Variable<T> {
  pub fn new(index: usize) -> Self {
    Variable(index, std::marker::PhantomData)
  }
}

impl<T: DataType> Template<T> for Variable<T> {
  fn merge(&self, xs: &Args<T>) -> T {
    xs.iter().find(|(i, _)| *i == self.0).map(|(_, x)| x.clone()).unwrap_or_else(T::make_null)
  }
  fn split(&self, x: &T) -> Vec<Args<T>> {
    vec![vec![(self.0, x.clone())]]
  }
}

/// One slot in a [`reindex`]ed template: the external slot index it's
/// addressed by, and whether it may be absent from an accepted split.
#[derive(Clone, Copy, Debug)]
pub struct Slot {
  pub external_index: usize,
  pub optional: bool,
}

/// Adapts `inner`, which addresses internal slots `0..slots.len()`, to
/// operate against `external_count` externally-numbered, possibly-optional
/// slots. `slots[i] == None` marks internal slot `i` as internal-only: it
/// must never leak a non-null value out through `split`.
struct Reindexed<T> {
  reversed: Vec<Option<usize>>,
  slots: Vec<Option<Slot>>,
  inner: Rc<dyn Template<T>>,
}

pub fn reindex<T: DataType>(
  external_count: usize,
  slots: Vec<Option<Slot>>,
  inner: Rc<dyn Template<T>>,
) -> Rc<dyn Template<T>> {
  let mut reversed = vec![None; external_count];
  for (internal_index, slot) in slots.iter().enumerate() {
    if let Some(slot) = slot {
      reversed[slot.external_index] = Some(internal_index);
    }
  }
  Rc::new(Reindexed { reversed, slots, inner })
}

impl<T: DataType> Template<T> for Reindexed<T> {
  fn merge(&self, xs: &Args<T>) -> T {
    let mut args: Args<T> = vec![];
    for (k, v) in xs {
      if let Some(Some(internal_index)) = self.reversed.get(*k) {
        args.push((*internal_index, v.clone()));
      }
    }
    self.inner.merge(&args)
  }

  fn split(&self, x: &T) -> Vec<Args<T>> {
    self
      .inner
      .split(x)
      .into_iter()
      .filter_map(|xs| {
        let mut result: Args<T> = vec![];
        for (k, v) in xs {
          match self.slots.get(k).copied().flatten() {
            Some(slot) => {
              if !slot.optional && v.is_null() {
                return None;
              }
              result.push((slot.external_index, v));
            }
            None if v.is_null() => {}
            None => return None,
          }
        }
        Some(result)
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Clone, Debug, PartialEq)]
  struct Toy(Option<i64>);

  impl DataType for Toy {
    fn is_base(&self) -> bool {
      self.0.is_some()
    }
    fn is_null(&self) -> bool {
      self.0.is_none()
    }
    fn make_base(text: &str) -> Self {
      Toy(text.parse().ok())
    }
    fn make_null() -> Self {
      Toy(None)
    }
    fn parse(input: &str) -> Result<Self> {
      Ok(Toy(input.parse().ok()))
    }
    fn stringify(&self) -> String {
      self.0.map(|x| x.to_string()).unwrap_or_else(|| "null".to_string())
    }
    fn template(_: &str) -> Result<Rc<dyn Template<Self>>> {
      unimplemented!()
    }
  }

  #[test]
  fn cross_is_the_pairwise_union() {
    let xs: Vec<Args<Toy>> = vec![vec![(0, Toy(Some(1)))], vec![(0, Toy(Some(2)))]];
    let ys: Vec<Args<Toy>> = vec![vec![(1, Toy(Some(9)))]];
    let result = cross(&xs, &ys);
    assert_eq!(result, vec![vec![(0, Toy(Some(1))), (1, Toy(Some(9)))], vec![(0, Toy(Some(2))), (1, Toy(Some(9)))]]);
  }

  #[test]
  fn variable_merges_and_splits_by_slot_index() {
    let template = Variable::<Toy>::new(2);
    assert_eq!(template.merge(&vec![(2, Toy(Some(5)))]), Toy(Some(5)));
    assert_eq!(template.merge(&vec![]), Toy(None));
    assert_eq!(template.split(&Toy(Some(5))), vec![vec![(2, Toy(Some(5)))]]);
  }

  #[test]
  fn reindex_drops_internal_only_bindings_and_renumbers_external_ones() {
    // inner addresses two internal slots; slot 0 is exposed as external 5
    // (required), slot 1 is internal-only (must stay null to be accepted).
    let inner = Rc::new(Variable::<Toy>::new(0));
    let slots = vec![Some(Slot { external_index: 5, optional: false })];
    let reindexed = reindex(6, slots, inner as Rc<dyn Template<Toy>>);

    assert_eq!(reindexed.merge(&vec![(5, Toy(Some(3)))]), Toy(Some(3)));
    assert_eq!(reindexed.split(&Toy(Some(3))), vec![vec![(5, Toy(Some(3)))]]);
  }

  /// An inner template whose `split` returns fixed candidate maps, so the
  /// reindex-level rejection rules can be tested in isolation from any
  /// particular domain grammar.
  struct TwoSlots(Vec<Args<Toy>>);

  impl Template<Toy> for TwoSlots {
    fn merge(&self, _: &Args<Toy>) -> Toy {
      Toy(None)
    }
    fn split(&self, _: &Toy) -> Vec<Args<Toy>> {
      self.0.clone()
    }
  }

  #[test]
  fn reindex_rejects_required_slot_bound_to_null_but_allows_absence() {
    let inner = Rc::new(TwoSlots(vec![
      vec![(0, Toy(Some(1))), (1, Toy(Some(2)))], // both present, non-null: kept
      vec![(0, Toy(Some(1))), (1, Toy(None))],    // slot 1 present but null: rejected (non-optional)
      vec![(0, Toy(Some(1)))],                    // slot 1 simply absent: kept
    ]));
    let slots = vec![
      Some(Slot { external_index: 10, optional: false }),
      Some(Slot { external_index: 11, optional: false }),
    ];
    let reindexed = reindex(12, slots, inner as Rc<dyn Template<Toy>>);

    assert_eq!(
      reindexed.split(&Toy(None)),
      vec![vec![(10, Toy(Some(1))), (11, Toy(Some(2)))], vec![(10, Toy(Some(1)))]]
    );
  }
}
