//! The lambda-expression value domain and its template grammar: a tree of
//! associative binary operators, self-inverse unary operators, named
//! function applications, and atoms, normalized so that equivalent trees
//! always stringify - and therefore compare equal and hash identically -
//! to the same canonical text.

use std::fmt::Display;
use std::rc::Rc;

use crate::cached::{Base, Cached};
use crate::combine::{all2, all3, all4, any, repeat, succeed, Parser};
use crate::error::Result;
use crate::template::{Args, DataType, Template, Variable};

pub type Lambda = Cached<Expr>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Binary {
  Conjunction,
  Disjunction,
  Join,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Unary {
  Not,
  Reverse,
}

#[derive(Debug, Default, Eq, PartialEq)]
pub enum Expr {
  Binary(Binary, Vec<Lambda>),
  Custom(String, Vec<Lambda>),
  Terminal(String),
  Unary(Unary, Lambda),
  #[default]
  Unknown,
}

impl Base for Expr {
  fn is_base(&self) -> bool {
    matches!(self, Expr::Terminal(_))
  }

  fn make_base(text: &str) -> Self {
    Expr::Terminal(text.to_string())
  }

  fn default_static() -> Lambda {
    thread_local! { static DEFAULT: Lambda = Cached::new(Expr::Unknown) };
    DEFAULT.with(|x| x.clone())
  }

  fn template(input: &str) -> Result<Rc<dyn Template<Lambda>>> {
    template(input)
  }
}

struct Operator {
  commutes: bool,
  precedence: u32,
  text: &'static str,
}

impl Binary {
  fn data(&self) -> Operator {
    match self {
      Binary::Conjunction => Operator { commutes: true, precedence: 2, text: " & " },
      Binary::Disjunction => Operator { commutes: true, precedence: 2, text: " | " },
      Binary::Join => Operator { commutes: false, precedence: 0, text: "." },
    }
  }
}

impl Unary {
  fn data(&self) -> Operator {
    match self {
      Unary::Not => Operator { commutes: false, precedence: 1, text: "~" },
      Unary::Reverse => Operator { commutes: false, precedence: 3, text: "R" },
    }
  }
}

impl Display for Expr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Expr::Binary(op, children) => {
        let Operator { commutes, precedence, text } = op.data();
        let mut base: Vec<_> = children.iter().map(|x| stringify_wrap(x, precedence)).collect();
        if commutes {
          base.sort();
        }
        write!(f, "{}", base.join(text))
      }
      Expr::Custom(name, children) => {
        let base: Vec<_> = children.iter().map(|x| x.repr()).collect();
        write!(f, "{}({})", name, base.join(", "))
      }
      Expr::Terminal(name) => write!(f, "{}", name),
      Expr::Unary(op, child) => {
        let Operator { precedence, text, .. } = op.data();
        let base = stringify_wrap(child, precedence);
        match op {
          Unary::Reverse => write!(f, "{}[{}]", text, base),
          _ => write!(f, "{}{}", text, base),
        }
      }
      Expr::Unknown => write!(f, "-"),
    }
  }
}

fn stringify_wrap(lambda: &Lambda, context: u32) -> String {
  let parens = match lambda.expr() {
    Expr::Binary(op, _) => op.data().precedence >= context,
    Expr::Unary(op, _) => op.data().precedence >= context,
    _ => false,
  };
  if parens {
    format!("({})", lambda.repr())
  } else {
    lambda.repr().to_string()
  }
}

// The grammar. Operator precedence, lowest to highest: binary join (`.`),
// unary not (`~`), binary conjunction/disjunction (`&`, `|`); `R[...]` and
// function calls bind at base level, alongside atoms and `$n` variables.

type Node = Rc<dyn Template<Lambda>>;

fn wrap(x: impl Template<Lambda> + 'static) -> Node {
  Rc::new(x)
}

fn template(input: &str) -> Result<Node> {
  thread_local! {
    static PARSER: Parser<Node> = build_parser();
  }
  PARSER.with(|x| x.parse(input))
}

fn build_parser() -> Parser<Node> {
  use crate::combine::{regexp, string};

  let ws = regexp(r#"\s*"#, |_| ());
  let st = |x: &'static str| string(x, |_| ()).skip(&ws);
  let id = regexp("[a-zA-Z0-9_]+", |x| x.to_string()).skip(&ws);
  let number = regexp("(0|[1-9][0-9]*)", |x| x.parse::<usize>().unwrap()).skip(&ws);

  let base = move |x: Parser<Node>| -> Parser<Node> {
    let reverse = all4((st("R"), st("["), x.clone(), st("]")))
      .map(|(_, _, inner, _)| wrap(UnaryFixed(Unary::Reverse, inner)));
    let call = all2((id.clone(), crate::combine::opt(all3((st("("), x.clone().sep(st(","), 0), st(")"))).map(|(_, args, _)| args))))
      .map(|(name, args)| match args {
        Some(args) => wrap(Custom(name, args)),
        None => wrap(Terminal(name.clone(), Cached::new(Expr::Terminal(name)))),
      });
    let paren = all3((st("("), x.clone(), st(")"))).map(|(_, inner, _)| inner);
    let variable = all2((st("$"), number.clone())).map(|(_, i)| wrap(Variable::<Lambda>::new(i)));
    any(&[reverse, call, paren, variable])
  };

  let binaries = move |ops: Vec<(&'static str, Binary)>| {
    move |x: Parser<Node>| -> Parser<Node> {
      let mut options: Vec<Parser<Option<(Binary, Vec<Node>)>>> = Vec::with_capacity(ops.len() + 1);
      for &(name, op) in ops.iter() {
        let rest = repeat(all2((st(name), x.clone())).map(|(_, v)| v), 1);
        options.push(rest.map(move |xs| Some((op, xs))));
      }
      options.push(succeed(None));
      all2((x.clone(), any(&options))).map(|(head, tail)| match tail {
        Some((op, xs)) => xs.into_iter().fold(head, |acc, x| wrap(BinaryOp(op, acc, x))),
        None => head,
      })
    }
  };

  let unary = move |name: &'static str, op: Unary| {
    move |x: Parser<Node>| -> Parser<Node> {
      all2((repeat(st(name), 0), x.clone()))
        .map(move |(tildes, inner)| tildes.iter().fold(inner, |acc, _| wrap(UnaryFixed(op, acc))))
    }
  };

  let (cell, root) = crate::combine::lazy();
  let result = ws.clone().then(&root);
  let precedence: Vec<Box<dyn Fn(Parser<Node>) -> Parser<Node>>> = vec![
    Box::new(base),
    Box::new(binaries(vec![(".", Binary::Join)])),
    Box::new(unary("~", Unary::Not)),
    Box::new(binaries(vec![("&", Binary::Conjunction), ("|", Binary::Disjunction)])),
  ];
  cell.replace(precedence.into_iter().fold(root, |x, f| f(x)));
  result
}

// Template implementations.

struct BinaryOp(Binary, Node, Node);

impl Template<Lambda> for BinaryOp {
  fn merge(&self, xs: &Args<Lambda>) -> Lambda {
    let mut x1 = expand(self.0, &self.1.merge(xs));
    let mut x2 = expand(self.0, &self.2.merge(xs));
    if self.0.data().commutes || (!x1.is_empty() && !x2.is_empty()) {
      x1.append(&mut x2);
      collapse(self.0, x1)
    } else {
      Lambda::make_null()
    }
  }

  fn split(&self, x: &Lambda) -> Vec<Args<Lambda>> {
    let base = expand(self.0, x);
    let commutes = self.0.data().commutes;
    if !commutes && base.is_empty() {
      let default = Lambda::make_null();
      let mut x1 = self.1.split(&default);
      let mut x2 = self.2.split(&default);
      return x1.drain(..).chain(x2.drain(..)).collect();
    }
    let bits: Vec<u32> = if commutes {
      (0..(1u32 << base.len())).collect()
    } else {
      (0..(base.len() as u32).saturating_sub(1)).map(|i| (1 << (i + 1)) - 1).collect()
    };
    let mut result = vec![];
    for i in bits {
      let mut xs = (vec![], vec![]);
      for (j, x) in base.iter().enumerate() {
        if (1 << j) & i > 0 {
          xs.0.push(x.clone());
        } else {
          xs.1.push(x.clone());
        }
      }
      let x1 = self.1.split(&collapse(self.0, xs.0));
      let x2 = self.2.split(&collapse(self.0, xs.1));
      result.extend(crate::template::cross(&x1, &x2));
    }
    result
  }
}

struct Custom(String, Vec<Node>);

impl Template<Lambda> for Custom {
  fn merge(&self, xs: &Args<Lambda>) -> Lambda {
    let args: Vec<_> = self.1.iter().map(|x| x.merge(xs)).filter(|x| !x.is_null()).collect();
    if args.len() < self.1.len() {
      Lambda::make_null()
    } else {
      Cached::new(Expr::Custom(self.0.clone(), args))
    }
  }

  fn split(&self, x: &Lambda) -> Vec<Args<Lambda>> {
    match x.expr() {
      Expr::Custom(name, children) if *name == self.0 && children.len() == self.1.len() => {
        self.1.iter().enumerate().fold(vec![vec![]], |acc, (i, x)| crate::template::cross(&acc, &x.split(&children[i])))
      }
      Expr::Unknown => {
        let default = Lambda::make_null();
        let mut result = Vec::with_capacity(self.1.len());
        self.1.iter().for_each(|x| result.append(&mut x.split(&default)));
        result
      }
      _ => vec![],
    }
  }
}

struct Terminal(String, Lambda);

impl Template<Lambda> for Terminal {
  fn merge(&self, _: &Args<Lambda>) -> Lambda {
    self.1.clone()
  }

  fn split(&self, x: &Lambda) -> Vec<Args<Lambda>> {
    match x.expr() {
      Expr::Terminal(name) if *name == self.0 => vec![vec![]],
      _ => vec![],
    }
  }
}

struct UnaryFixed(Unary, Node);

impl Template<Lambda> for UnaryFixed {
  fn merge(&self, xs: &Args<Lambda>) -> Lambda {
    involute(self.0, &self.1.merge(xs))
  }

  fn split(&self, x: &Lambda) -> Vec<Args<Lambda>> {
    self.1.split(&involute(self.0, x))
  }
}

// Normalization helpers: flatten associative binary operators into a flat
// child list on the way in, and collapse them back on the way out; fold a
// self-inverse unary operator applied twice back to its argument.

fn collapse(op: Binary, mut x: Vec<Lambda>) -> Lambda {
  match x.len() {
    0 => Lambda::make_null(),
    1 => x.pop().unwrap(),
    _ => Cached::new(Expr::Binary(op, x)),
  }
}

fn expand(op: Binary, y: &Lambda) -> Vec<Lambda> {
  match y.expr() {
    Expr::Binary(x, children) if *x == op => children.to_vec(),
    Expr::Unknown => vec![],
    _ => vec![y.clone()],
  }
}

fn involute(op: Unary, y: &Lambda) -> Lambda {
  match y.expr() {
    Expr::Unary(x, child) if *x == op => child.clone(),
    Expr::Unknown => y.clone(),
    _ => Cached::new(Expr::Unary(op, y.clone())),
  }
}
