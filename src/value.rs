//! The JSON-like value domain and its template grammar.
//!
//! A [`Json`] is `None` (null) or `Some(Rc<Value>)`; empty dicts and empty
//! lists are normalized to `None` at every boundary, so there is exactly one
//! representation of "nothing here" throughout the domain.

use crate::combine::{all3, any, map, regexp, string, Parser};
use crate::error::Result;
use crate::template::{cross, Args, DataType, Template, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

pub type Json = Option<Rc<Value>>;

#[derive(Debug, PartialEq)]
pub enum Value {
  Boolean(bool),
  Number(f32),
  String(String),
  Dict(Vec<(String, Json)>),
  List(Vec<Json>),
}

impl DataType for Json {
  fn is_base(&self) -> bool {
    matches!(self.as_deref(), Some(Value::String(_)))
  }

  fn is_null(&self) -> bool {
    self.is_none()
  }

  fn make_base(text: &str) -> Self {
    Some(Rc::new(Value::String(text.to_string())))
  }

  fn make_null() -> Self {
    None
  }

  fn parse(input: &str) -> Result<Self> {
    Ok(template(input)?.merge(&vec![]))
  }

  fn stringify(&self) -> String {
    stringify(self)
  }

  fn template(input: &str) -> Result<Rc<dyn Template<Self>>> {
    template(input)
  }
}

fn stringify(input: &Json) -> String {
  match input.as_deref() {
    Some(Value::Boolean(x)) => x.to_string(),
    Some(Value::Number(x)) => x.to_string(),
    Some(Value::String(x)) => x.clone(),
    Some(Value::Dict(x)) => {
      let terms = x.iter().map(|(k, v)| format!("{}: {}", k, stringify(v)));
      format!("{{{}}}", terms.collect::<Vec<_>>().join(", "))
    }
    Some(Value::List(x)) => {
      let terms = x.iter().map(stringify);
      format!("[{}]", terms.collect::<Vec<_>>().join(", "))
    }
    None => "null".to_string(),
  }
}

// The grammar. A `$n` variable, a `...$n` spread inside a dict or list, a
// bare-identifier or quoted-string dict key, single- or double-quoted
// strings, and otherwise ordinary JSON syntax.

type Node = Rc<dyn Template<Json>>;

fn wrap(x: impl Template<Json> + 'static) -> Node {
  Rc::new(x)
}

fn template(input: &str) -> Result<Node> {
  thread_local! {
    static PARSER: Parser<Node> = build_parser();
  }
  PARSER.with(|x| x.parse(input))
}

fn build_parser() -> Parser<Node> {
  let ws = regexp(r#"\s*"#, |_| ());
  let id = regexp("[a-zA-Z_]+", |x| x.to_string()).skip(&ws);
  let st = |x: &'static str| string(x, |_| ()).skip(&ws);

  let index = regexp("(0|[1-9][0-9]*)", |x| x.parse::<usize>().unwrap()).skip(&ws);
  let number = any(&[
    regexp(r#"-?(?:[0-9]|[1-9][0-9]+)?(?:\.[0-9]+)\b"#, |x| x.parse::<f32>().unwrap()),
    regexp(r#"-?(?:[0-9]|[1-9][0-9]+)\b"#, |x| x.parse::<f32>().unwrap()),
  ])
  .skip(&ws);
  let string_literal = any(&[
    regexp(r#""[^"]*""#, |x| x[1..x.len() - 1].to_string()),
    regexp(r#"'[^']*'"#, |x| x[1..x.len() - 1].to_string()),
  ])
  .skip(&ws);

  let (cell, root) = crate::combine::lazy();
  let result = ws.clone().then(&root);
  let variable = st("$").then(index.clone()).map(|i| wrap(Variable::<Json>::new(i)));
  let spread = st("...$").then(index.clone()).map(|i| wrap(Variable::<Json>::new(i)));

  let key = any(&[&id, &string_literal]);
  let dict_literal_entry = all3((key, st(":"), &root));
  let dict_literals = dict_literal_entry.sep(st(","), 1).map(|xs| {
    Item::Literals(xs.into_iter().map(|(k, _, v)| (k, v)).collect())
  });
  let dict_variable = spread.map(Item::Variable);
  let dict_items = any(&[dict_literals, dict_variable]).sep(st(","), 0);
  let dict_parser = all3((st("{"), dict_items, st("}"))).map(|(_, items, _)| dict(items));

  let list_item = any(&[spread.map(|x| (x, true)), root.map(|x| (x, false))]);
  let list_items = list_item.sep(st(","), 0);
  let list_parser = all3((st("["), list_items, st("]"))).map(|(_, items, _)| list(items));

  let primitive = any(&[
    map(st("null"), |_| wrap(Base(None))),
    map(st("true"), |_| wrap(Base(Some(Rc::new(Value::Boolean(true)))))),
    map(st("false"), |_| wrap(Base(Some(Rc::new(Value::Boolean(false)))))),
    map(number, |x| wrap(Base(Some(Rc::new(Value::Number(x)))))),
    map(string_literal, |x| wrap(Base(Some(Rc::new(Value::String(x)))))),
  ]);

  cell.replace(any(&[dict_parser, list_parser, primitive, variable]));
  result
}

// Template implementations.

#[derive(Clone)]
enum Item {
  Literals(Vec<(String, Node)>),
  Variable(Node),
}

fn coerce_dict(json: &Json) -> &[(String, Json)] {
  match json.as_deref() {
    Some(Value::Dict(x)) => x.as_slice(),
    _ => &[],
  }
}

fn coerce_list(json: &Json) -> &[Json] {
  match json.as_deref() {
    Some(Value::List(x)) => x.as_slice(),
    _ => &[],
  }
}

fn dict_to_null(xs: Vec<(String, Json)>) -> Json {
  if xs.is_empty() {
    None
  } else {
    Some(Rc::new(Value::Dict(xs)))
  }
}

fn list_to_null(xs: Vec<Json>) -> Json {
  if xs.is_empty() {
    None
  } else {
    Some(Rc::new(Value::List(xs)))
  }
}

/// A literal value, matched exactly and contributing no slots.
struct Base(Json);

impl Template<Json> for Base {
  fn merge(&self, _: &Args<Json>) -> Json {
    self.0.clone()
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    if *x == self.0 {
      vec![vec![]]
    } else {
      vec![]
    }
  }
}

/// One `{literal: template, ...}` group within a dict, tracking its key set
/// so `split` can reject input dicts carrying keys it doesn't cover.
struct DictBase(Vec<(String, Node)>, FxHashSet<String>);

impl Template<Json> for DictBase {
  fn merge(&self, xs: &Args<Json>) -> Json {
    let iter = self.0.iter().filter_map(|(k, v)| v.merge(xs).map(|x| (k.clone(), Some(x))));
    dict_to_null(iter.collect::<Vec<_>>())
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    let xs = coerce_dict(x);
    if !xs.iter().all(|(k, _)| self.1.contains(k)) {
      return vec![];
    }
    let mut dict = FxHashMap::default();
    xs.iter().for_each(|(k, v)| std::mem::drop(dict.insert(k, v)));
    let base = vec![vec![]];
    self.0.iter().fold(base, |a, (k, v)| cross(&a, &v.split(dict.get(k).copied().unwrap_or(&None))))
  }
}

/// Joins two dict-shaped templates, enumerating every way to partition the
/// input's keys between them on `split`.
struct DictPair(Node, Node);

impl Template<Json> for DictPair {
  fn merge(&self, xs: &Args<Json>) -> Json {
    let mut result = vec![];
    result.extend_from_slice(coerce_dict(&self.0.merge(xs)));
    result.extend_from_slice(coerce_dict(&self.1.merge(xs)));
    dict_to_null(result)
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    let mut base = coerce_dict(x).iter().collect::<Vec<_>>();
    base.sort_by_key(|(k, _)| k);
    let mut result = vec![];
    for i in 0..(1u32 << base.len()) {
      let mut xs = (vec![], vec![]);
      for (j, (k, v)) in base.iter().enumerate() {
        if (1 << j) & i > 0 {
          xs.0.push((k.clone(), v.clone()));
        } else {
          xs.1.push((k.clone(), v.clone()));
        }
      }
      let x0 = self.0.split(&dict_to_null(xs.0));
      let x1 = self.1.split(&dict_to_null(xs.1));
      result.extend(cross(&x0, &x1));
    }
    result
  }
}

/// Rejects non-dict, non-null inputs before handing off to `inner`.
struct DictWrap(Node);

impl Template<Json> for DictWrap {
  fn merge(&self, xs: &Args<Json>) -> Json {
    self.0.merge(xs)
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    if matches!(x.as_deref(), None | Some(Value::Dict(_))) {
      self.0.split(x)
    } else {
      vec![]
    }
  }
}

/// Wraps a single template's value as a one-element list.
struct ListBase(Node);

impl Template<Json> for ListBase {
  fn merge(&self, xs: &Args<Json>) -> Json {
    self.0.merge(xs).map(|x| Rc::new(Value::List(vec![Some(x)])))
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    let xs = coerce_list(x);
    match xs.len() {
      0 => self.0.split(&None),
      1 => self.0.split(&xs[0]),
      _ => vec![],
    }
  }
}

/// Concatenates two list-shaped templates, enumerating every split point on
/// `split`.
struct ListPair(Node, Node);

impl Template<Json> for ListPair {
  fn merge(&self, xs: &Args<Json>) -> Json {
    let mut result = vec![];
    result.extend_from_slice(coerce_list(&self.0.merge(xs)));
    result.extend_from_slice(coerce_list(&self.1.merge(xs)));
    list_to_null(result)
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    let xs = coerce_list(x);
    let mut result = vec![];
    for i in 0..=xs.len() {
      let x0 = self.0.split(&list_to_null(xs[..i].to_owned()));
      let x1 = self.1.split(&list_to_null(xs[i..].to_owned()));
      result.extend(cross(&x0, &x1));
    }
    result
  }
}

/// Rejects non-list, non-null inputs before handing off to `inner`.
struct ListWrap(Node);

impl Template<Json> for ListWrap {
  fn merge(&self, xs: &Args<Json>) -> Json {
    self.0.merge(xs)
  }

  fn split(&self, x: &Json) -> Vec<Args<Json>> {
    if matches!(x.as_deref(), None | Some(Value::List(_))) {
      self.0.split(x)
    } else {
      vec![]
    }
  }
}

fn dict(items: Vec<Item>) -> Node {
  if items.is_empty() {
    return Rc::new(Base(None));
  }
  let mut xs = items.into_iter().map(|x| match x {
    Item::Literals(fields) => {
      let keys = fields.iter().map(|(k, _)| k.clone()).collect::<FxHashSet<_>>();
      Rc::new(DictBase(fields, keys)) as Node
    }
    Item::Variable(x) => x,
  });
  let base = xs.next().unwrap();
  Rc::new(DictWrap(xs.fold(base, |a, x| Rc::new(DictPair(a, x)))))
}

fn list(items: Vec<(Node, bool)>) -> Node {
  if items.is_empty() {
    return Rc::new(Base(None));
  }
  let mut xs = items.into_iter().map(|(x, spread)| if spread { x } else { Rc::new(ListBase(x)) as Node });
  let base = xs.next().unwrap();
  Rc::new(ListWrap(xs.fold(base, |a, x| Rc::new(ListPair(a, x)))))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn j(input: &str) -> Json {
    Json::parse(input).unwrap()
  }

  fn t(input: &str) -> Node {
    Json::template(input).unwrap()
  }

  fn empty() -> Vec<Args<Json>> {
    vec![]
  }

  fn merge(template: &dyn Template<Json>, args: Vec<Json>) -> Json {
    template.merge(&args.into_iter().enumerate().collect())
  }

  #[test]
  fn parsing_works() {
    assert_eq!(j("false"), Some(Rc::new(Value::Boolean(false))));
    assert_eq!(j("17.5"), Some(Rc::new(Value::Number(17.5))));
    assert_eq!(j("'1000'"), Some(Rc::new(Value::String("1000".to_string()))));
    assert_eq!(
      j("{num: 17, str: 'is', bool: false}"),
      Some(Rc::new(Value::Dict(vec![
        ("num".to_string(), Some(Rc::new(Value::Number(17.0)))),
        ("str".to_string(), Some(Rc::new(Value::String("is".to_string())))),
        ("bool".to_string(), Some(Rc::new(Value::Boolean(false)))),
      ])))
    );
    assert_eq!(
      j("[17, 'is', false]"),
      Some(Rc::new(Value::List(vec![
        Some(Rc::new(Value::Number(17.0))),
        Some(Rc::new(Value::String("is".to_string()))),
        Some(Rc::new(Value::Boolean(false))),
      ])))
    );
  }

  #[test]
  fn boolean_template_works() {
    let template = t("false");
    assert_eq!(merge(&*template, vec![]), j("false"));
    assert_eq!(template.split(&j("false")), vec![vec![]]);
    assert_eq!(template.split(&j("true")), empty());
    assert_eq!(template.split(&j("null")), empty());
  }

  #[test]
  fn dict_template_works() {
    let template = t("{num: 17, str: 'is', bool: false}");
    assert_eq!(merge(&*template, vec![]), j("{num: 17, str: 'is', bool: false}"));
    assert_eq!(template.split(&j("{num: 17, str: 'is', bool: false}")), vec![vec![]]);
    assert_eq!(template.split(&j("{bool: false, num: 17, str: 'is'}")), vec![vec![]]);
    assert_eq!(template.split(&j("{num: 18, str: 'is', bool: false}")), empty());
    assert_eq!(template.split(&j("null")), empty());
  }

  #[test]
  fn list_template_works() {
    let template = t("[17, 'is', false]");
    assert_eq!(merge(&*template, vec![]), j("[17, 'is', false]"));
    assert_eq!(template.split(&j("[17, 'is', false]")), vec![vec![]]);
    assert_eq!(template.split(&j("[false, 17, 'is']")), empty());
    assert_eq!(template.split(&j("null")), empty());
  }

  #[test]
  fn variable_template_works() {
    let template = t("$2");
    assert_eq!(merge(&*template, vec![]), j("null"));
    assert_eq!(merge(&*template, vec![j("null"), j("null"), j("17")]), j("17"));
    assert_eq!(template.split(&j("17")), vec![vec![(2, j("17"))]]);
    assert_eq!(template.split(&j("null")), vec![vec![(2, j("null"))]]);
  }

  #[test]
  fn dict_with_variables_works() {
    let t = t("{num: $0, bool: $2}");
    assert_eq!(merge(&*t, vec![j("17"), j("'is'"), j("false")]), j("{num: 17, bool: false}"));
    assert_eq!(merge(&*t, vec![j("17"), j("'is'"), j("null")]), j("{num: 17}"));
    assert_eq!(merge(&*t, vec![j("null"), j("'is'"), j("null")]), j("null"));
    assert_eq!(t.split(&j("{num: 17, bool: false, key: 'value'}")), empty());
    assert_eq!(t.split(&j("{num: 17, bool: false}")), vec![vec![(0, j("17")), (2, j("false"))]]);
    assert_eq!(t.split(&j("{num: 17}")), vec![vec![(0, j("17")), (2, j("null"))]]);
    assert_eq!(t.split(&j("null")), vec![vec![(0, j("null")), (2, j("null"))]]);
    assert_eq!(t.split(&j("false")), empty());
  }

  #[test]
  fn dict_with_spreads_works() {
    let t = t("{num: $0, ...$1, bool: $2}");
    assert_eq!(
      merge(&*t, vec![j("17"), j("{str: 'is'}"), j("false")]),
      j("{num: 17, str: 'is', bool: false}")
    );
    assert_eq!(merge(&*t, vec![j("17"), j("null"), j("false")]), j("{num: 17, bool: false}"));
    assert_eq!(merge(&*t, vec![j("null"), j("null"), j("null")]), j("null"));
    assert_eq!(
      t.split(&j("{num: 17}")),
      vec![
        vec![(0, j("null")), (1, j("{num: 17}")), (2, j("null"))],
        vec![(0, j("17")), (1, j("null")), (2, j("null"))],
      ]
    );
    assert_eq!(t.split(&j("null")), vec![vec![(0, j("null")), (1, j("null")), (2, j("null"))]]);
    assert_eq!(t.split(&j("false")), empty());
  }

  #[test]
  fn list_with_variables_works() {
    let t = t("[$0, $1]");
    assert_eq!(merge(&*t, vec![j("3"), j("5")]), j("[3, 5]"));
    assert_eq!(merge(&*t, vec![j("3"), j("null")]), j("[3]"));
    assert_eq!(merge(&*t, vec![j("null"), j("null")]), j("null"));
    assert_eq!(t.split(&j("[3, 5, 7]")), empty());
    assert_eq!(t.split(&j("[3, 5]")), vec![vec![(0, j("3")), (1, j("5"))]]);
    assert_eq!(
      t.split(&j("[3]")),
      vec![vec![(0, j("null")), (1, j("3"))], vec![(0, j("3")), (1, j("null"))]]
    );
    assert_eq!(t.split(&j("null")), vec![vec![(0, j("null")), (1, j("null"))]]);
    assert_eq!(t.split(&j("false")), empty());
  }

  #[test]
  fn list_with_spreads_works() {
    let t = t("[$0, ...$1, ...$2]");
    assert_eq!(merge(&*t, vec![j("3"), j("[5, 7]"), j("null")]), j("[3, 5, 7]"));
    assert_eq!(merge(&*t, vec![j("3"), j("null"), j("null")]), j("[3]"));
    assert_eq!(merge(&*t, vec![j("null"), j("null"), j("null")]), j("null"));
    assert_eq!(
      t.split(&j("[3]")),
      vec![
        vec![(0, j("null")), (1, j("null")), (2, j("[3]"))],
        vec![(0, j("null")), (1, j("[3]")), (2, j("null"))],
        vec![(0, j("3")), (1, j("null")), (2, j("null"))],
      ]
    );
    assert_eq!(t.split(&j("null")), vec![vec![(0, j("null")), (1, j("null")), (2, j("null"))]]);
    assert_eq!(t.split(&j("false")), empty());
  }

  #[test]
  fn parse_fails_on_unquoted_string_literal() {
    let error = Json::parse("failed").unwrap_err().to_string();
    assert!(error.starts_with("At line 1, column 1"), "{}", error);
  }

  #[test]
  fn parse_fails_on_malformatted_dict() {
    let error = Json::parse("{num; 42}").unwrap_err().to_string();
    assert!(error.starts_with("At line 1, column 5"), "{}", error);
  }

  #[test]
  fn parse_handles_whitespace() {
    let t = t(" { x : [ true , 2 , '3' , ...$0 , $1 ] , 'y' : $2 } ");
    assert_eq!(merge(&*t, vec![j("[4, 5]"), j("6"), j("7")]), j("{x: [true, 2, '3', 4, 5, 6], y: 7}"));
  }

  use proptest::prelude::*;

  proptest! {
    #[test]
    fn integers_stringify_then_parse_round_trip(x in -1_000_000i64..1_000_000) {
      let text = x.to_string();
      let value = Json::parse(&text).unwrap();
      prop_assert_eq!(value.stringify(), text);
    }

    #[test]
    fn dict_merge_then_split_recovers_the_assignment(num in -1000i64..1000, flag in any::<bool>()) {
      let template = t("{num: $0, bool: $1}");
      let args = vec![(0, j(&num.to_string())), (1, j(if flag { "true" } else { "false" }))];
      let merged = template.merge(&args);
      prop_assert!(template.split(&merged).contains(&args));
    }

    #[test]
    fn list_merge_then_split_recovers_the_assignment(a in -1000i64..1000, b in -1000i64..1000) {
      let template = t("[$0, $1]");
      let args = vec![(0, j(&a.to_string())), (1, j(&b.to_string()))];
      let merged = template.merge(&args);
      prop_assert!(template.split(&merged).contains(&args));
    }
  }
}
