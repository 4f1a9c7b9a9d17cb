//! Introspection the runner needs from the values it walks.
//!
//! Records list their fields through [`Record`]; every field value is a
//! [`Walk`], which reports its declared [`Shape`] and a dereferenced
//! [`Node`] view. Std scalars, `Option`, `Box`, `Vec` and arrays are covered
//! here, and [`record!`](crate::record) writes the impls for a plain struct.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::field::Shape;
use crate::parser::StructTag;

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value the runner can visit.
pub trait Walk: AsAny {
    /// Shape as declared, pointers not followed.
    fn shape(&self) -> Shape;

    /// The value with every pointer followed.
    fn node(&mut self) -> Node<'_>;
}

impl dyn Walk {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self).as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (*self).as_any_mut().downcast_mut::<T>()
    }
}

pub enum Node<'a> {
    /// A `None` somewhere along the pointer chain.
    Null,
    Scalar,
    Record(&'a mut dyn Record),
    Collection(Vec<&'a mut (dyn Walk + 'static)>),
}

pub trait Record {
    /// Fields in declaration order.
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// One declared field of a record.
pub struct Field<'a> {
    pub(crate) name: &'static str,
    pub(crate) tag: StructTag<'static>,
    pub(crate) embedded: bool,
    pub(crate) value: &'a mut (dyn Walk + 'static),
}

impl<'a> Field<'a> {
    pub fn new<W: Walk>(name: &'static str, tag: &'static str, value: &'a mut W) -> Self {
        Self {
            name,
            tag: StructTag::new(tag),
            embedded: false,
            value,
        }
    }

    /// Mark the field as an anonymous composition of another record.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> StructTag<'static> {
        self.tag
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }
}

/// Implement [`Record`] and [`Walk`] for a struct.
///
/// ```
/// use tagrunner::record;
///
/// #[derive(Default)]
/// struct Inner { text: String }
/// record!(Inner { text => r#"check:"non_empty""# });
///
/// #[derive(Default)]
/// struct Outer { inner: Inner, count: u32 }
/// record!(Outer {
///     #[embedded] inner => "",
///     count => r#"json:"count" check:"min=1""#,
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $( $(#[$marker:ident])? $field:ident => $tag:expr ),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields(&mut self) -> ::std::vec::Vec<$crate::Field<'_>> {
                ::std::vec![
                    $( $crate::Field::new(::std::stringify!($field), $tag, &mut self.$field) $(.$marker())? ),*
                ]
            }
        }

        impl $crate::Walk for $ty {
            fn shape(&self) -> $crate::Shape {
                $crate::Shape::Record
            }

            fn node(&mut self) -> $crate::Node<'_> {
                $crate::Node::Record(self)
            }
        }
    };
}

macro_rules! scalar_walk {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Walk for $ty {
                fn shape(&self) -> Shape {
                    Shape::Scalar
                }

                fn node(&mut self) -> Node<'_> {
                    Node::Scalar
                }
            }
        )*
    };
}

scalar_walk!(
    (), bool, char, String, Value,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<K: 'static, V: 'static> Walk for HashMap<K, V> {
    fn shape(&self) -> Shape {
        Shape::Scalar
    }

    fn node(&mut self) -> Node<'_> {
        Node::Scalar
    }
}

impl<K: 'static, V: 'static> Walk for BTreeMap<K, V> {
    fn shape(&self) -> Shape {
        Shape::Scalar
    }

    fn node(&mut self) -> Node<'_> {
        Node::Scalar
    }
}

impl<T: Walk> Walk for Option<T> {
    fn shape(&self) -> Shape {
        Shape::Pointer
    }

    fn node(&mut self) -> Node<'_> {
        match self {
            Some(v) => v.node(),
            None => Node::Null,
        }
    }
}

impl<T: Walk> Walk for Box<T> {
    fn shape(&self) -> Shape {
        Shape::Pointer
    }

    fn node(&mut self) -> Node<'_> {
        (**self).node()
    }
}

impl<T: Walk> Walk for Vec<T> {
    fn shape(&self) -> Shape {
        Shape::Collection
    }

    fn node(&mut self) -> Node<'_> {
        Node::Collection(self.iter_mut().map(|v| v as &mut (dyn Walk + 'static)).collect())
    }
}

impl<T: Walk, const N: usize> Walk for [T; N] {
    fn shape(&self) -> Shape {
        Shape::Collection
    }

    fn node(&mut self) -> Node<'_> {
        Node::Collection(self.iter_mut().map(|v| v as &mut (dyn Walk + 'static)).collect())
    }
}
