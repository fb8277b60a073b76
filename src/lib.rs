//! An invertible template algebra over structured data values.
//!
//! A template is a reversible function between a sparse set of indexed
//! arguments and an output value: [`template::Template::merge`] builds the
//! output from arguments, [`template::Template::split`] recovers every
//! assignment of arguments that could have produced a given output. Two
//! value domains are provided out of the box: JSON-like values
//! ([`value::Json`]) and lambda expressions ([`lambda::Lambda`]), both
//! built on the parser-combinator substrate in [`combine`].
//!
//! ```
//! use mirror_template::value::Json;
//! use mirror_template::template::{DataType, Template};
//!
//! let template = Json::template("{name: $0, age: $1}").unwrap();
//! let alice = Json::parse("'Alice'").unwrap();
//! let age = Json::parse("30").unwrap();
//! let merged = template.merge(&vec![(0, alice), (1, age)]);
//! assert_eq!(merged.stringify(), "{name: Alice, age: 30}");
//! ```

pub mod cached;
pub mod combine;
pub mod error;
pub mod lambda;
pub mod template;
pub mod util;
pub mod value;

pub use combine::Parser;
pub use error::{Error, Result};
pub use lambda::Lambda;
pub use template::{Args, DataType, Template};
pub use value::Json;
