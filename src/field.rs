use std::fmt;

use serde::Serialize;

use crate::parser::StructTag;
use crate::walk::Walk;

/// Declared shape of a field, before any pointer is followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Record,
    Collection,
    /// Leaf values the runner never descends into, maps included.
    Scalar,
    /// `Option` / `Box`; `None` is the null pointer.
    Pointer,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Record => "record",
            Shape::Collection => "collection",
            Shape::Scalar => "scalar",
            Shape::Pointer => "pointer",
        })
    }
}

/// Callback resolving the label of a field, mainly for error messages.
/// Gets the field's current value when the caller has it at hand.
pub type LabelFn = dyn Fn(&TagField<'_>, Option<&(dyn Walk + 'static)>) -> String + Send + Sync;

/// Identity of one visited field and the chain of fields enclosing it.
///
/// A root descriptor (the record handed to the runner, or a collection
/// element) has an empty name and no parent.
#[derive(Clone, Copy)]
pub struct TagField<'a> {
    name: &'static str,
    tag: StructTag<'static>,
    shape: Shape,
    embedded: bool,
    parent: Option<&'a TagField<'a>>,
    label_fn: Option<&'a LabelFn>,
}

impl<'a> TagField<'a> {
    pub(crate) fn root(shape: Shape, label_fn: Option<&'a LabelFn>) -> Self {
        Self {
            name: "",
            tag: StructTag::default(),
            shape,
            embedded: false,
            parent: None,
            label_fn,
        }
    }

    pub(crate) fn child(
        name: &'static str,
        tag: StructTag<'static>,
        shape: Shape,
        embedded: bool,
        parent: &'a TagField<'a>,
        label_fn: Option<&'a LabelFn>,
    ) -> Self {
        Self {
            name,
            tag,
            shape,
            embedded,
            parent: Some(parent),
            label_fn,
        }
    }

    pub fn is_top(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<&'a TagField<'a>> {
        self.parent
    }

    /// Structural name of the field.
    pub fn field_name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> StructTag<'static> {
        self.tag
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Label with priority: label fn > json name > field name.
    /// The label fn is called without a value.
    pub fn label_name(&self) -> String {
        self.resolve_label(None)
    }

    /// Label of this field holding `value`.
    pub fn label_name_of(&self, value: &(dyn Walk + 'static)) -> String {
        self.resolve_label(Some(value))
    }

    fn resolve_label(&self, value: Option<&(dyn Walk + 'static)>) -> String {
        match self.label_fn {
            Some(f) => f(self, value),
            None => self.json_name(),
        }
    }

    pub fn json_name(&self) -> String {
        json_tag_name(self.tag, self.name)
    }

    /// Enclosing descriptors, nearest first, ending at the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a TagField<'a>> {
        std::iter::successors(self.parent, |f| f.parent)
    }

    /// Dot-joined labels from the outermost named field down to this one.
    pub fn path(&self) -> String {
        let mut labels: Vec<String> = self
            .ancestors()
            .filter(|f| !f.is_top())
            .map(TagField::label_name)
            .collect();
        labels.reverse();
        labels.push(self.label_name());
        labels.join(".")
    }
}

impl fmt::Debug for TagField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagField")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("shape", &self.shape)
            .field("embedded", &self.embedded)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// Name under `json:"name,opts"`, falling back to `name` when the tag is
/// missing, empty or `-`.
pub fn json_tag_name(tag: StructTag<'_>, name: &str) -> String {
    let raw = tag.get("json");
    match raw.split(',').next() {
        Some(j) if !j.is_empty() && j != "-" => j.to_string(),
        _ => name.to_string(),
    }
}
