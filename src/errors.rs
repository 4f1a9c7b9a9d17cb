use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Error type handlers return. Anything `Send + Sync` converts into it with `?`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum TagError {
    // Operation attempted on a runner slot that was never initialised
    #[error("{context}: runner is nil")]
    RunnerNil { context: String },

    // A value expected to be a record (or collection) is not
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Annotation string does not follow `value=arg arg,value`
    #[error("invalid tag pattern: {0}")]
    InvalidTagPattern(String),

    // A registered handler failed; carries the dispatch context
    #[error(transparent)]
    Handler(Box<RunnerError>),
}

impl TagError {
    /// The wrapped dispatch context, when a handler produced this error.
    pub fn runner_error(&self) -> Option<&RunnerError> {
        match self {
            TagError::Handler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RunnerError> for TagError {
    fn from(e: RunnerError) -> Self {
        TagError::Handler(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, TagError>;

/// Snapshot of the dispatch state at the moment a handler failed.
///
/// Renders as the cause's message followed by a JSON line holding the
/// snapshot, e.g.
///
/// ```text
/// hello error
/// {"tag_key":"doctor","tag_value":"hello","tag_args":["a1"],"field_struct_name":"world","field_label_name":"world","pass_by":1}
/// ```
#[derive(Debug, Serialize)]
pub struct RunnerError {
    pub tag_key: String,
    pub tag_value: String,
    pub tag_args: Vec<String>,
    pub field_struct_name: String,
    pub field_label_name: String,
    pub pass_by: Value,

    #[serde(skip)]
    raw: BoxError,
}

impl RunnerError {
    pub fn new(
        tag_key: impl Into<String>,
        tag_value: impl Into<String>,
        tag_args: Vec<String>,
        field_struct_name: impl Into<String>,
        field_label_name: impl Into<String>,
        pass_by: Value,
        raw: BoxError,
    ) -> Self {
        Self {
            tag_key: tag_key.into(),
            tag_value: tag_value.into(),
            tag_args,
            field_struct_name: field_struct_name.into(),
            field_label_name: field_label_name.into(),
            pass_by,
            raw,
        }
    }

    /// The error the handler returned.
    pub fn raw(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.raw.as_ref()
    }

    pub fn into_raw(self) -> BoxError {
        self.raw
    }

    /// Downcast the handler's error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.raw.downcast_ref::<E>()
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}\n{}", self.raw, snapshot)
    }
}

impl StdError for RunnerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.raw.as_ref())
    }
}
