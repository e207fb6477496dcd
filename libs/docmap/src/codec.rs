use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;
use crate::schema::Record;
use crate::value::{Document, Entry, EntryKind};

/// Which dispatch rule produced a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Field-level custom converter, no further dispatch.
    Custom,
    Scalar,
    /// Enumeration stored as its integer discriminant.
    Enum,
    /// Array or collection of scalar-category elements.
    ScalarCollection,
    /// Array or collection of records.
    RecordCollection,
    /// Nested record.
    Record,
}

type EncodeFn<V> = dyn Fn(&V) -> Result<Option<Entry>, ConversionError> + Send + Sync;
type DecodeFn<V> = dyn Fn(&Entry) -> Result<V, ConversionError> + Send + Sync;

/// Value ↔ entry conversion for one declared type.
///
/// `encode` returns `None` for a value that should be left out of the
/// document (absent option, empty collection when configured so).
pub struct ValuePlan<V> {
    rule: Rule,
    encode: Arc<EncodeFn<V>>,
    decode: Arc<DecodeFn<V>>,
}

impl<V> ValuePlan<V> {
    pub fn new(
        rule: Rule,
        encode: impl Fn(&V) -> Result<Option<Entry>, ConversionError> + Send + Sync + 'static,
        decode: impl Fn(&Entry) -> Result<V, ConversionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rule,
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub(crate) fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn encode(&self, value: &V) -> Result<Option<Entry>, ConversionError> {
        (self.encode)(value)
    }

    pub fn decode(&self, entry: &Entry) -> Result<V, ConversionError> {
        (self.decode)(entry)
    }
}

impl<V> Clone for ValuePlan<V> {
    fn clone(&self) -> Self {
        Self {
            rule: self.rule,
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<V> fmt::Debug for ValuePlan<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuePlan").field("rule", &self.rule).finish_non_exhaustive()
    }
}

type FieldEncodeFn<T> = dyn Fn(&T) -> Result<Option<Entry>, ConversionError> + Send + Sync;
type FieldDecodeFn<T> = dyn Fn(&mut T, &Entry) -> Result<(), ConversionError> + Send + Sync;

/// Conversion for a single field of `T`: reads the field out of a record
/// into an entry, or assigns an entry back into the field.
pub struct FieldCodec<T> {
    name: &'static str,
    type_name: &'static str,
    rule: Rule,
    encode: Box<FieldEncodeFn<T>>,
    decode: Box<FieldDecodeFn<T>>,
}

impl<T> FieldCodec<T> {
    pub(crate) fn new(
        name: &'static str,
        type_name: &'static str,
        rule: Rule,
        encode: impl Fn(&T) -> Result<Option<Entry>, ConversionError> + Send + Sync + 'static,
        decode: impl Fn(&mut T, &Entry) -> Result<(), ConversionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            type_name,
            rule,
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }

    /// Attribute name (document key).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared Rust type of the field.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Field value as an entry; `None` means the key is omitted.
    pub fn encode(&self, record: &T) -> Result<Option<Entry>, ConversionError> {
        (self.encode)(record)
    }

    /// Convert `entry` and assign it to the field. A null entry leaves the
    /// field untouched, like a missing key.
    pub fn decode_into(&self, record: &mut T, entry: &Entry) -> Result<(), ConversionError> {
        (self.decode)(record, entry)
    }
}

impl<T> fmt::Debug for FieldCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodec")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

/// The four conversion directions for a record type.
///
/// Owned by the [`crate::CodecCache`]; callers hold it through an `Arc`.
pub struct Codec<T> {
    type_name: &'static str,
    fields: Vec<Arc<FieldCodec<T>>>,
    by_name: HashMap<&'static str, usize>,
}

impl<T: Record> Codec<T> {
    pub(crate) fn new(type_name: &'static str, fields: Vec<Arc<FieldCodec<T>>>) -> Self {
        let by_name = fields.iter().enumerate().map(|(i, f)| (f.name(), i)).collect();
        Self {
            type_name,
            fields,
            by_name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Field codecs in declaration order, ignored fields excluded.
    pub fn fields(&self) -> &[Arc<FieldCodec<T>>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldCodec<T>> {
        self.by_name.get(name).map(|&i| self.fields[i].as_ref())
    }

    /// Object → document. Fields without a value are omitted.
    pub fn to_document(&self, value: &T) -> Result<Document, ConversionError> {
        let mut doc = Document::new();
        for field in &self.fields {
            if let Some(entry) = field.encode(value)? {
                doc.insert(field.name(), entry);
            }
        }
        Ok(doc)
    }

    /// Document → object. Unknown keys are skipped, missing keys leave the
    /// field at its default.
    pub fn from_document(&self, doc: &Document) -> Result<T, ConversionError> {
        let mut value = T::default();
        self.merge_document(&mut value, doc)?;
        Ok(value)
    }

    /// Assign every known key of `doc` onto an existing value.
    ///
    /// Used to project a partially fetched document; fields absent from
    /// `doc` keep their current value.
    pub fn merge_document(&self, target: &mut T, doc: &Document) -> Result<(), ConversionError> {
        for (key, entry) in doc {
            match self.by_name.get(key.as_str()) {
                Some(&i) => self.fields[i].decode_into(target, entry)?,
                None => tracing::trace!(record = self.type_name, %key, "skipping unknown attribute"),
            }
        }
        Ok(())
    }

    /// Object → entry, for use as a nested value.
    pub fn to_entry(&self, value: &T) -> Result<Entry, ConversionError> {
        self.to_document(value).map(Entry::Document)
    }

    /// Entry → object; anything but a document is a shape mismatch.
    pub fn from_entry(&self, entry: &Entry) -> Result<T, ConversionError> {
        match entry {
            Entry::Document(doc) => self.from_document(doc),
            other => Err(ConversionError::unexpected(
                self.type_name,
                EntryKind::Document,
                other.kind(),
            )),
        }
    }
}

impl<T> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
