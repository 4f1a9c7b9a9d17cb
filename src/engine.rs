use std::any::Any;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::context::Context;
use crate::errors::{BoxError, Result, RunnerError, TagError};
use crate::field::{LabelFn, Shape, TagField};
use crate::parser::parse_clauses;
use crate::registry::{Flow, Handler, HandlerResult, Registry};
use crate::walk::{Field, Node, Record, Walk};

/// Runner configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Visit every element of arrays and vectors.
    pub dive: bool,
}

/// Everything a handler needs for the tag value it was registered for.
/// Tag pattern is `{key}:"{value}={arg1} {arg2} ... {argN}"`.
pub struct RunnerInfo<'a> {
    pub key: &'a str,
    pub value: String,
    pub args: Vec<String>,
    pub field: &'a TagField<'a>,

    pass_by: Value,
    target: &'a mut (dyn Walk + 'static),
}

impl<'a> RunnerInfo<'a> {
    /// State left by an earlier handler for the same key on this field.
    /// `Null` when nothing was set.
    pub fn pass_by(&self) -> &Value {
        &self.pass_by
    }

    pub fn set_pass_by(&mut self, pass_by: impl Into<Value>) {
        self.pass_by = pass_by.into();
    }

    pub fn take_pass_by(&mut self) -> Value {
        self.pass_by.take()
    }

    /// The current field's value.
    pub fn target(&mut self) -> &mut dyn Walk {
        &mut *self.target
    }

    pub fn field_value<T: Any>(&self) -> Option<&T> {
        self.target.downcast_ref::<T>()
    }

    pub fn field_value_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.target.downcast_mut::<T>()
    }

    /// Label of the current field, with its value passed to the label fn.
    pub fn label_name(&self) -> String {
        self.field.label_name_of(&*self.target)
    }

    /// Overwrite the current field. Fails if `T` is not the field's type.
    pub fn set_field_value<T: Any>(&mut self, v: T) -> Result<()> {
        let field = self.field.field_name();
        match self.field_value_mut::<T>() {
            Some(slot) => {
                *slot = v;
                Ok(())
            }
            None => Err(TagError::InvalidInput(format!(
                "cannot assign {} to field `{field}`",
                std::any::type_name::<T>()
            ))),
        }
    }

    fn wrap_error(&self, raw: BoxError) -> TagError {
        RunnerError::new(
            self.key,
            self.value.as_str(),
            self.args.clone(),
            self.field.field_name(),
            self.label_name(),
            self.pass_by.clone(),
            raw,
        )
        .into()
    }
}

/// Walks records and calls the handlers registered for their field tags.
#[derive(Clone, Default)]
pub struct Runner {
    options: RunnerOptions,
    registry: Registry,
    label_fn: Option<Arc<LabelFn>>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RunnerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_dive(mut self, dive: bool) -> Self {
        self.options.dive = dive;
        self
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register the handler for key and value, replacing any previous one.
    /// Not safe to call while a walk is in flight.
    pub fn register<F>(&mut self, key: &str, value: &str, f: F) -> Result<()>
    where
        F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(key, value, f)
    }

    pub fn register_handler<H: Handler + 'static>(
        &mut self,
        key: &str,
        value: &str,
        handler: H,
    ) -> Result<()> {
        self.registry.insert(key, value, Arc::new(handler));
        Ok(())
    }

    pub fn must_register<F>(&mut self, key: &str, value: &str, f: F)
    where
        F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        if let Err(e) = self.register(key, value, f) {
            panic!("{e}");
        }
    }

    /// Label name resolver, mainly for error messages.
    /// Priority: label fn > json name > field name.
    pub fn set_label_fn<F>(&mut self, f: F)
    where
        F: Fn(&TagField<'_>, Option<&(dyn Walk + 'static)>) -> String + Send + Sync + 'static,
    {
        self.label_fn = Some(Arc::new(f));
    }

    /// Walk any value: records, collections (with dive) or pointers to them.
    /// A `None` root is not an error.
    pub fn run(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()> {
        debug!(dive = self.options.dive, shape = %source.shape(), "tag runner starting");
        self.run_detached(ctx, source)
    }

    /// Walk a value that must be a record.
    pub fn run_struct(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()> {
        debug!(dive = self.options.dive, shape = %source.shape(), "tag runner starting");
        let label_fn = self.label_fn.as_deref();
        match source.node() {
            Node::Record(record) => {
                let root = TagField::root(Shape::Record, label_fn);
                self.run_record(ctx, &root, record)
            }
            Node::Null => Err(TagError::InvalidInput(
                "expected type is struct, which is a nil pointer".into(),
            )),
            Node::Scalar => Err(TagError::InvalidInput(
                "expected type is struct, which is scalar".into(),
            )),
            Node::Collection(_) => Err(TagError::InvalidInput(
                "expected type is struct, which is collection".into(),
            )),
        }
    }

    // Dispatch with no parent: the walk root and every dived element.
    fn run_detached(&self, ctx: &Context, value: &mut dyn Walk) -> Result<()> {
        match value.node() {
            Node::Record(record) => {
                let root = TagField::root(Shape::Record, self.label_fn.as_deref());
                self.run_record(ctx, &root, record)
            }
            Node::Collection(items) => self.run_slice(ctx, items),
            Node::Null | Node::Scalar => Ok(()),
        }
    }

    fn run_record(&self, ctx: &Context, parent: &TagField<'_>, record: &mut dyn Record) -> Result<()> {
        let label_fn = self.label_fn.as_deref();

        for Field {
            name,
            tag,
            embedded,
            value,
        } in record.fields()
        {
            let desc = TagField::child(name, tag, value.shape(), embedded, parent, label_fn);

            self.run_field(ctx, &desc, &mut *value)?;
            self.run_any(ctx, &desc, value)?;
        }

        Ok(())
    }

    fn run_any(&self, ctx: &Context, desc: &TagField<'_>, value: &mut dyn Walk) -> Result<()> {
        match value.node() {
            Node::Record(record) => self.run_record(ctx, desc, record),
            Node::Collection(items) => self.run_slice(ctx, items),
            Node::Null | Node::Scalar => Ok(()),
        }
    }

    fn run_slice(&self, ctx: &Context, items: Vec<&mut (dyn Walk + 'static)>) -> Result<()> {
        if !self.options.dive {
            return Ok(());
        }

        for item in items {
            self.run_detached(ctx, item)?;
        }

        Ok(())
    }

    fn run_field(
        &self,
        ctx: &Context,
        desc: &TagField<'_>,
        value: &mut (dyn Walk + 'static),
    ) -> Result<()> {
        for (key, handlers) in self.registry.iter() {
            let Some(tag) = desc.tag().lookup(key) else {
                continue;
            };

            let clauses = parse_clauses(&tag)?;

            let mut info = RunnerInfo {
                key,
                value: String::new(),
                args: Vec::new(),
                field: desc,
                pass_by: Value::Null,
                target: &mut *value,
            };

            for clause in clauses {
                info.value = clause.value;
                info.args = clause.args;

                let Some(handler) = handlers.get(&info.value) else {
                    continue;
                };

                trace!(
                    key,
                    value = %info.value,
                    args = %info.args.iter().join(" "),
                    field = desc.field_name(),
                    "calling tag handler"
                );

                match handler.call(ctx, &mut info) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Skip) => {
                        trace!(key, value = %info.value, "skipping remaining tag values");
                        break;
                    }
                    Err(e) => {
                        debug!(key, value = %info.value, field = desc.field_name(), error = %e, "tag handler failed");
                        return Err(info.wrap_error(e));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Entry points on a runner slot that may not have been initialised.
pub trait MaybeRunner {
    fn register<F>(&mut self, key: &str, value: &str, f: F) -> Result<()>
    where
        F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync + 'static;

    fn must_register<F>(&mut self, key: &str, value: &str, f: F)
    where
        F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        if let Err(e) = self.register(key, value, f) {
            panic!("{e}");
        }
    }

    fn run(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()>;

    fn run_struct(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()>;
}

impl MaybeRunner for Option<Runner> {
    fn register<F>(&mut self, key: &str, value: &str, f: F) -> Result<()>
    where
        F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        match self {
            Some(runner) => runner.register(key, value, f),
            None => Err(TagError::RunnerNil {
                context: format!("register fail, key is {key}, value is {value}"),
            }),
        }
    }

    fn run(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()> {
        match self {
            Some(runner) => runner.run(ctx, source),
            None => Err(TagError::RunnerNil {
                context: "run failed".into(),
            }),
        }
    }

    fn run_struct(&self, ctx: &Context, source: &mut dyn Walk) -> Result<()> {
        match self {
            Some(runner) => runner.run_struct(ctx, source),
            None => Err(TagError::RunnerNil {
                context: "run struct failed".into(),
            }),
        }
    }
}
