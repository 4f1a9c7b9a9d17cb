use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::Context;
use crate::engine::RunnerInfo;
use crate::errors::BoxError;

/// What the runner does after a handler succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Skip the remaining values of the same key on the same field.
    Skip,
}

impl From<bool> for Flow {
    fn from(skip: bool) -> Self {
        if skip {
            Flow::Skip
        } else {
            Flow::Continue
        }
    }
}

pub type HandlerResult = std::result::Result<Flow, BoxError>;

/// Handler for one registered tag key and value.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &Context, info: &mut RunnerInfo<'_>) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Context, &mut RunnerInfo<'_>) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &Context, info: &mut RunnerInfo<'_>) -> HandlerResult {
        self(ctx, info)
    }
}

type ValueMap = BTreeMap<String, Arc<dyn Handler>>;

/// Handlers keyed by tag key, then tag value. Keys iterate in sorted order.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<BTreeMap<String, ValueMap>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the handler for `(key, value)`.
    pub fn insert(&mut self, key: &str, value: &str, handler: Arc<dyn Handler>) {
        let map = Arc::make_mut(&mut self.inner);
        map.entry(key.to_string())
            .or_default()
            .insert(value.to_string(), handler);
    }

    pub fn get(&self, key: &str, value: &str) -> Option<Arc<dyn Handler>> {
        self.inner.get(key)?.get(value).cloned()
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.inner.get(key).is_some_and(|m| m.contains_key(value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &ValueMap)> {
        self.inner.iter().map(|(k, m)| (k.as_str(), m))
    }

    /// Number of registered `(key, value)` pairs.
    pub fn len(&self) -> usize {
        self.inner.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
