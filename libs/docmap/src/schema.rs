use std::any::{type_name, TypeId};
use std::fmt;

use crate::attribute::Attribute;
use crate::cache::CodecCache;
use crate::codec::FieldCodec;
use crate::converter::AttributeConverter;
use crate::error::UnsupportedTypeError;
use crate::scalar::ScalarKind;
use crate::synth::{Accessor, BindField, Converted};

/// A structured type that converts to and from a [`crate::Document`].
///
/// Usually derived with `#[derive(Record)]`. Implementing it by hand is the
/// explicit-registration path: list the fields with [`FieldDescriptor`]
/// constructors in declaration order.
pub trait Record: Default + Send + Sync + Sized + 'static {
    /// Field descriptors in declaration order.
    fn fields() -> Vec<FieldDescriptor<Self>>;

    /// Name used in errors and logs.
    fn type_name() -> &'static str {
        type_name::<Self>()
    }
}

/// Structural category of a declared field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarKind),
    /// Fieldless enumeration, stored as its integer discriminant.
    Enum(&'static str),
    /// Value that may be absent (`Option`).
    Optional(Box<Shape>),
    Collection {
        kind: CollectionKind,
        element: Box<Shape>,
    },
    Record(RecordRef),
    /// Not inspected by the engine: ignored or converter-owned fields.
    Opaque(&'static str),
    /// No default rule exists for this type.
    Unsupported {
        name: &'static str,
        reason: &'static str,
    },
}

/// Container family of a collection field; decides the rebuilt type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Fixed length: `[T; N]`.
    Array,
    /// Ordered: `Vec`, `VecDeque`.
    List,
    /// Unordered, deduplicated: `HashSet`, `BTreeSet`.
    Set,
}

/// Field type category as reported by descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Enum,
    /// Array of scalar-category elements.
    Array,
    /// Non-array collection of scalar-category elements.
    Collection,
    Record,
    /// Array or collection of records.
    RecordCollection,
    Opaque,
    Unsupported,
}

impl Shape {
    pub fn category(&self) -> Category {
        match self {
            Shape::Scalar(_) => Category::Scalar,
            Shape::Enum(_) => Category::Enum,
            Shape::Optional(inner) => inner.category(),
            Shape::Collection { kind, element } => match element.category() {
                Category::Scalar | Category::Enum if *kind == CollectionKind::Array => Category::Array,
                Category::Scalar | Category::Enum => Category::Collection,
                Category::Record => Category::RecordCollection,
                _ => Category::Unsupported,
            },
            Shape::Record(_) => Category::Record,
            Shape::Opaque(_) => Category::Opaque,
            Shape::Unsupported { .. } => Category::Unsupported,
        }
    }

    /// Record type this shape recurses into, looking through options and
    /// collections.
    pub fn nested_record(&self) -> Option<RecordRef> {
        match self {
            Shape::Record(record) => Some(*record),
            Shape::Optional(inner) => inner.nested_record(),
            Shape::Collection { element, .. } => element.nested_record(),
            _ => None,
        }
    }
}

/// Lazy handle on a nested record type.
///
/// Holds a function instead of the nested shapes themselves so that
/// self-referencing types can describe themselves without recursing.
#[derive(Clone, Copy)]
pub struct RecordRef {
    type_id: TypeId,
    name: &'static str,
    nested: fn() -> Vec<Shape>,
}

impl RecordRef {
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::type_name(),
            nested: nested_shapes::<R>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Shapes of the record's fields, ignored fields included as `Opaque`.
    pub fn nested(&self) -> Vec<Shape> {
        (self.nested)()
    }
}

fn nested_shapes<R: Record>() -> Vec<Shape> {
    R::fields().into_iter().map(|field| field.shape).collect()
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name).finish()
    }
}

enum Binding<T> {
    Rules(Box<dyn BindField<T>>),
    Converter {
        id: &'static str,
        bind: Box<dyn BindField<T>>,
    },
    Ignored,
}

/// One field of a record type.
pub struct FieldDescriptor<T> {
    name: &'static str,
    member: &'static str,
    type_name: &'static str,
    shape: Shape,
    binding: Binding<T>,
}

impl<T: Record> FieldDescriptor<T> {
    /// Field converted by the default rules for `F`.
    pub fn new<F: Attribute>(name: &'static str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self {
            name,
            member: name,
            type_name: type_name::<F>(),
            shape: F::shape(),
            binding: Binding::Rules(Box::new(Accessor::new(get, get_mut))),
        }
    }

    /// Field converted by the custom converter `C` instead of the default rules.
    pub fn with_converter<F, C>(name: &'static str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self
    where
        F: Send + Sync + 'static,
        C: AttributeConverter<Value = F>,
    {
        Self {
            name,
            member: name,
            type_name: type_name::<F>(),
            shape: Shape::Opaque(type_name::<F>()),
            binding: Binding::Converter {
                id: type_name::<C>(),
                bind: Box::new(Converted::<T, F, C>::new(get, get_mut)),
            },
        }
    }

    /// Field excluded from both directions.
    pub fn ignored<F: ?Sized>(name: &'static str) -> Self {
        Self {
            name,
            member: name,
            type_name: type_name::<F>(),
            shape: Shape::Opaque(type_name::<F>()),
            binding: Binding::Ignored,
        }
    }

    /// Rust member name, when it differs from the attribute name.
    pub fn member(mut self, member: &'static str) -> Self {
        self.member = member;
        self
    }

    pub(crate) fn bind(&self, cache: &CodecCache) -> Result<FieldCodec<T>, UnsupportedTypeError> {
        match &self.binding {
            Binding::Rules(bind) | Binding::Converter { bind, .. } => bind.bind(self.name, cache),
            Binding::Ignored => Err(UnsupportedTypeError::new(T::type_name(), "field is ignored")
                .on_field(self.name)),
        }
    }
}

impl<T> FieldDescriptor<T> {
    /// Attribute name used as the document key.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn member_name(&self) -> &'static str {
        self.member
    }

    /// Declared Rust type of the field.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn category(&self) -> Category {
        self.shape.category()
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.binding, Binding::Ignored)
    }

    /// Type name of the custom converter, if one is declared.
    pub fn converter(&self) -> Option<&'static str> {
        match self.binding {
            Binding::Converter { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("member", &self.member)
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .field("ignored", &self.is_ignored())
            .field("converter", &self.converter())
            .finish()
    }
}

/// Structural description of a record type, in declaration order.
///
/// Built once per type by [`crate::resolve::resolve`] and kept by the cache.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> TypeDescriptor<T> {
    pub(crate) fn new(type_name: &'static str, fields: Vec<FieldDescriptor<T>>) -> Self {
        Self { type_name, fields }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Look a field up by attribute name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Document keys this type reads and writes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| !f.is_ignored()).map(|f| f.name)
    }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
