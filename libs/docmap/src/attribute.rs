//! Default conversion rules per Rust field type.

use std::any::type_name;
use std::collections::{btree_set, hash_set, vec_deque, BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::cache::CodecCache;
use crate::codec::ValuePlan;
use crate::error::UnsupportedTypeError;
use crate::scalar::ScalarValue;
use crate::schema::{CollectionKind, Shape};
use crate::synth;

/// A field type with a default conversion rule.
///
/// Implemented here for scalars, `Option`, `Box`, boxed slices and the std
/// collections; `#[derive(Record)]` and `#[derive(Enumeration)]` implement it
/// for user types.
pub trait Attribute: Sized + Send + Sync + 'static {
    fn shape() -> Shape;

    /// Value ↔ entry conversion for this type. Nested record codecs are
    /// fetched from `cache`.
    fn plan(cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError>;
}

macro_rules! scalar_attribute {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Attribute for $ty {
                fn shape() -> Shape {
                    Shape::Scalar(<Self as ScalarValue>::KIND)
                }

                fn plan(cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError> {
                    Ok(synth::scalar::<Self>(cache.config()))
                }
            }
        )*
    };
}

scalar_attribute!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char, String,
    DateTime<Utc>,
);

impl<V: Attribute> Attribute for Option<V> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(V::shape()))
    }

    fn plan(cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError> {
        Ok(synth::optional(V::plan(cache)?))
    }
}

impl<V: Attribute> Attribute for Box<V> {
    fn shape() -> Shape {
        V::shape()
    }

    fn plan(cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError> {
        Ok(synth::boxed(V::plan(cache)?))
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// A single-type-parameter container the collection rules can walk and rebuild.
pub trait Collection: Sized + Send + Sync + 'static {
    type Element: Attribute;
    type Iter<'a>: Iterator<Item = &'a Self::Element>
    where
        Self: 'a;

    const KIND: CollectionKind;

    fn elements(&self) -> Self::Iter<'_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the container; the message explains a rejected element count.
    fn from_elements(elements: Vec<Self::Element>) -> Result<Self, String>;
}

impl<V: Attribute> Collection for Vec<V> {
    type Element = V;
    type Iter<'a> = std::slice::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::List;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        Ok(elements)
    }
}

impl<V: Attribute> Collection for VecDeque<V> {
    type Element = V;
    type Iter<'a> = vec_deque::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::List;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        Ok(elements.into())
    }
}

impl<V: Attribute + Eq + Hash> Collection for HashSet<V> {
    type Element = V;
    type Iter<'a> = hash_set::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::Set;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        Ok(elements.into_iter().collect())
    }
}

impl<V: Attribute + Ord> Collection for BTreeSet<V> {
    type Element = V;
    type Iter<'a> = btree_set::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::Set;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        Ok(elements.into_iter().collect())
    }
}

impl<V: Attribute> Collection for Box<[V]> {
    type Element = V;
    type Iter<'a> = std::slice::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::Array;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        <[V]>::len(self)
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        Ok(elements.into_boxed_slice())
    }
}

impl<V: Attribute, const N: usize> Collection for [V; N] {
    type Element = V;
    type Iter<'a> = std::slice::Iter<'a, V>;

    const KIND: CollectionKind = CollectionKind::Array;

    fn elements(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn len(&self) -> usize {
        N
    }

    fn from_elements(elements: Vec<V>) -> Result<Self, String> {
        <[V; N]>::try_from(elements).map_err(|rest| format!("expected {N} elements, found {}", rest.len()))
    }
}

macro_rules! collection_attribute {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> Attribute for $ty {
                fn shape() -> Shape {
                    Shape::Collection {
                        kind: <Self as Collection>::KIND,
                        element: Box::new(<<Self as Collection>::Element as Attribute>::shape()),
                    }
                }

                fn plan(cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError> {
                    synth::collection::<Self>(cache)
                }
            }
        )*
    };
}

collection_attribute! {
    [V: Attribute] Vec<V>,
    [V: Attribute] VecDeque<V>,
    [V: Attribute + Eq + Hash] HashSet<V>,
    [V: Attribute + Ord] BTreeSet<V>,
    [V: Attribute] Box<[V]>,
    [V: Attribute, const N: usize] [V; N],
}

// ---------------------------------------------------------------------------
// Maps: two type parameters, no default rule
// ---------------------------------------------------------------------------

const MAP_REASON: &str = "maps have no default conversion rule; declare a converter for this field";

macro_rules! unsupported_map {
    ($($map:ident),*) => {
        $(
            impl<K, V> Attribute for $map<K, V>
            where
                K: Send + Sync + 'static,
                V: Send + Sync + 'static,
            {
                fn shape() -> Shape {
                    Shape::Unsupported {
                        name: type_name::<Self>(),
                        reason: MAP_REASON,
                    }
                }

                fn plan(_cache: &CodecCache) -> Result<ValuePlan<Self>, UnsupportedTypeError> {
                    Err(UnsupportedTypeError::new(type_name::<Self>(), MAP_REASON))
                }
            }
        )*
    };
}

unsupported_map!(HashMap, BTreeMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;

    #[test]
    fn shapes_report_categories() {
        assert_eq!(<i32 as Attribute>::shape().category(), Category::Scalar);
        assert_eq!(<Option<String> as Attribute>::shape().category(), Category::Scalar);
        assert_eq!(<Vec<u8> as Attribute>::shape().category(), Category::Collection);
        assert_eq!(<[f64; 3] as Attribute>::shape().category(), Category::Array);
        assert_eq!(<Box<[i64]> as Attribute>::shape().category(), Category::Array);
        assert_eq!(<Vec<Vec<u8>> as Attribute>::shape().category(), Category::Unsupported);
        assert_eq!(<HashMap<String, i32> as Attribute>::shape().category(), Category::Unsupported);
    }

    #[test]
    fn arrays_reject_wrong_length() {
        let err = <[u8; 2] as Collection>::from_elements(vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, "expected 2 elements, found 3");
    }

    #[test]
    fn maps_fail_to_plan() {
        let cache = CodecCache::new();
        let err = <BTreeMap<String, i32> as Attribute>::plan(&cache).unwrap_err();
        assert!(err.reason.contains("declare a converter"));
    }
}
