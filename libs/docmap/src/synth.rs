//! Conversion Routine Synthesizer.
//!
//! Per-field rules, first match wins:
//! 1. custom converter ([`converted`])
//! 2. scalar or enumeration ([`scalar`], [`enumeration`])
//! 3. collection of scalars and
//! 4. collection of records ([`collection`])
//! 5. nested record ([`record`])
//!
//! `Option` and `Box` wrap any of these. Rules compose by capturing the plans
//! (and, for records, the cached codecs) they delegate to.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::attribute::{Attribute, Collection};
use crate::cache::CodecCache;
use crate::codec::{Codec, FieldCodec, Rule, ValuePlan};
use crate::config::CodecConfig;
use crate::converter::AttributeConverter;
use crate::error::{ConversionError, UnsupportedTypeError};
use crate::scalar::{entry_to_scalar, scalar_to_entry, ScalarValue};
use crate::schema::{Record, TypeDescriptor};
use crate::value::{Entry, EntryKind};

/// Assemble the record codec from the per-field codecs held by `cache`.
pub fn build<T: Record>(
    descriptor: &TypeDescriptor<T>,
    cache: &CodecCache,
) -> Result<Codec<T>, UnsupportedTypeError> {
    let mut fields = Vec::with_capacity(descriptor.fields().len());
    for field in descriptor.fields().iter().filter(|f| !f.is_ignored()) {
        fields.push(cache.field_codec::<T>(field.name())?);
    }
    Ok(Codec::new(descriptor.type_name(), fields))
}

/// Rule 2: scalar coercion.
pub fn scalar<V: ScalarValue>(config: &CodecConfig) -> ValuePlan<V> {
    let config = config.clone();
    ValuePlan::new(
        Rule::Scalar,
        |value: &V| Ok(Some(scalar_to_entry(value))),
        move |entry| entry_to_scalar(entry, &config),
    )
}

/// Rule 2 for enumerations: the integer discriminant is the scalar.
pub fn enumeration<E: ScalarValue>(config: &CodecConfig) -> ValuePlan<E> {
    scalar::<E>(config).with_rule(Rule::Enum)
}

/// Absent values are omitted on write; a null entry reads back as `None`.
pub fn optional<V: Send + Sync + 'static>(inner: ValuePlan<V>) -> ValuePlan<Option<V>> {
    let encoder = inner.clone();
    ValuePlan::new(
        inner.rule(),
        move |value: &Option<V>| match value {
            Some(v) => encoder.encode(v),
            None => Ok(None),
        },
        move |entry| {
            if entry.is_null() {
                Ok(None)
            } else {
                inner.decode(entry).map(Some)
            }
        },
    )
}

pub fn boxed<V: Send + Sync + 'static>(inner: ValuePlan<V>) -> ValuePlan<Box<V>> {
    let encoder = inner.clone();
    ValuePlan::new(
        inner.rule(),
        move |value: &Box<V>| encoder.encode(value),
        move |entry| inner.decode(entry).map(Box::new),
    )
}

/// Rules 3 and 4: a list of element entries, rebuilt into the declared
/// container on the way back.
///
/// Every element is decoded with the element rule; a list mixing kinds fails
/// at the first offending index.
pub fn collection<C: Collection>(cache: &CodecCache) -> Result<ValuePlan<C>, UnsupportedTypeError> {
    let element = <C::Element as Attribute>::plan(cache)?;
    let rule = match element.rule() {
        Rule::Scalar | Rule::Enum => Rule::ScalarCollection,
        Rule::Record => Rule::RecordCollection,
        Rule::ScalarCollection | Rule::RecordCollection | Rule::Custom => {
            return Err(UnsupportedTypeError::new(
                type_name::<C>(),
                "collections of collections have no conversion rule",
            ));
        }
    };
    let omit_empty = cache.config().omit_empty_collections;
    let encoder = element.clone();

    Ok(ValuePlan::new(
        rule,
        move |value: &C| {
            if omit_empty && value.is_empty() {
                return Ok(None);
            }
            let mut items = Vec::with_capacity(value.len());
            for (i, item) in value.elements().enumerate() {
                let entry = encoder.encode(item).map_err(|e| e.at(format!("[{i}]")))?;
                items.push(entry.unwrap_or(Entry::NULL));
            }
            Ok(Some(Entry::List(items)))
        },
        move |entry| {
            let items = match entry {
                Entry::List(items) => items,
                other => {
                    return Err(ConversionError::unexpected(
                        type_name::<C>(),
                        EntryKind::List,
                        other.kind(),
                    ));
                }
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(element.decode(item).map_err(|e| e.at(format!("[{i}]")))?);
            }
            C::from_elements(out).map_err(|msg| {
                ConversionError::new(type_name::<C>(), msg).with_found(EntryKind::List)
            })
        },
    ))
}

/// Rule 5: delegate to the nested type's whole-record codec.
pub fn record<R: Record>(cache: &CodecCache) -> Result<ValuePlan<R>, UnsupportedTypeError> {
    let codec = cache.codec::<R>()?;
    let encoder = Arc::clone(&codec);
    Ok(ValuePlan::new(
        Rule::Record,
        move |value: &R| encoder.to_entry(value).map(Some),
        move |entry| codec.from_entry(entry),
    ))
}

/// Rule 1: the converter is default-constructed once and shared by both
/// directions.
pub fn converted<C: AttributeConverter>() -> ValuePlan<C::Value> {
    let converter = Arc::new(C::default());
    let encoder = Arc::clone(&converter);
    ValuePlan::new(
        Rule::Custom,
        move |value: &C::Value| encoder.to_entry(value).map(Some),
        move |entry| converter.from_entry(entry),
    )
}

/// Wrap a value plan with the field's accessors. Every error leaving the
/// field codec names the field.
pub fn bind_field<T, V>(
    name: &'static str,
    plan: ValuePlan<V>,
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
) -> FieldCodec<T>
where
    T: Record,
    V: Send + Sync + 'static,
{
    let rule = plan.rule();
    let encoder = plan.clone();
    FieldCodec::new(
        name,
        type_name::<V>(),
        rule,
        move |record: &T| encoder.encode(get(record)).map_err(|e| e.at(name)),
        move |record: &mut T, entry: &Entry| {
            if entry.is_null() {
                return Ok(());
            }
            let value = plan.decode(entry).map_err(|e| e.at(name))?;
            *get_mut(record) = value;
            Ok(())
        },
    )
}

// ---------------------------------------------------------------------------
// Field binders stored in descriptors
// ---------------------------------------------------------------------------

/// Turns a field descriptor into a field codec, keeping the field's static
/// type hidden behind the descriptor.
pub(crate) trait BindField<T>: Send + Sync {
    fn bind(&self, name: &'static str, cache: &CodecCache) -> Result<FieldCodec<T>, UnsupportedTypeError>;
}

pub(crate) struct Accessor<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T, F> Accessor<T, F> {
    pub(crate) fn new(get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self { get, get_mut }
    }
}

impl<T: Record, F: Attribute> BindField<T> for Accessor<T, F> {
    fn bind(&self, name: &'static str, cache: &CodecCache) -> Result<FieldCodec<T>, UnsupportedTypeError> {
        let plan = F::plan(cache).map_err(|e| e.on_field(name))?;
        Ok(bind_field(name, plan, self.get, self.get_mut))
    }
}

pub(crate) struct Converted<T, F, C> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
    _converter: PhantomData<fn() -> C>,
}

impl<T, F, C> Converted<T, F, C> {
    pub(crate) fn new(get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self {
            get,
            get_mut,
            _converter: PhantomData,
        }
    }
}

impl<T, F, C> BindField<T> for Converted<T, F, C>
where
    T: Record,
    F: Send + Sync + 'static,
    C: AttributeConverter<Value = F>,
{
    fn bind(&self, name: &'static str, _cache: &CodecCache) -> Result<FieldCodec<T>, UnsupportedTypeError> {
        Ok(bind_field(name, converted::<C>(), self.get, self.get_mut))
    }
}
