//! Walk nested records and run the handlers registered for their field tags.
//!
//! Tags follow the `key:"value=arg1 arg2,value2"` convention. For every tag
//! key with registered handlers, each value on a field calls the handler
//! registered for `(key, value)`, in order, with the parsed args.
//!
//! ```
//! use tagrunner::{record, Context, Flow, Runner};
//!
//! struct Hello { foo: String }
//! record!(Hello { foo => r#"json:"f" bar:"update=v1 v2,validate""# });
//!
//! let mut runner = Runner::new();
//! runner.must_register("bar", "update", |_, info| {
//!     let first = info.args[0].clone();
//!     info.set_pass_by(1);
//!     info.set_field_value(first)?;
//!     Ok(Flow::Continue)
//! });
//! runner.must_register("bar", "validate", |_, info| {
//!     assert_eq!(info.pass_by(), 1);
//!     Ok(Flow::Continue)
//! });
//!
//! let mut target = Hello { foo: "bbb".into() };
//! runner.run_struct(&Context::new(), &mut target).unwrap();
//! assert_eq!(target.foo, "v1");
//! ```

pub mod context;
pub mod engine;
pub mod errors;
pub mod field;
pub mod parser;
pub mod registry;
pub mod walk;

pub use context::Context;
pub use engine::{MaybeRunner, Runner, RunnerInfo, RunnerOptions};
pub use errors::{BoxError, Result, RunnerError, TagError};
pub use field::{json_tag_name, LabelFn, Shape, TagField};
pub use parser::{parse_clauses, Clause, StructTag};
pub use registry::{Flow, Handler, HandlerResult, Registry};
pub use walk::{Field, Node, Record, Walk};
