use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Leaf value of an attribute-value document.
///
/// Numbers keep their signedness so that round trips stay lossless;
/// coercion between numeric kinds happens in [`crate::scalar`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Scalar {
    /// Absent element inside a list. Record fields without a value are
    /// omitted from the document instead.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Microseconds since the Unix epoch, UTC.
    Timestamp(i64),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Short lowercase name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::UInt(_) => "uint",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
            Scalar::Timestamp(_) => "timestamp",
        }
    }
}

/// Dynamically typed value stored under a document key.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Entry {
    Scalar(Scalar),
    /// Ordered sequence. Homogeneous in practice, not enforced by the model.
    List(Vec<Entry>),
    Document(Document),
}

/// Shape of an [`Entry`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Scalar,
    List,
    Document,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Scalar => "scalar",
            EntryKind::List => "list",
            EntryKind::Document => "document",
        })
    }
}

impl Entry {
    pub const NULL: Entry = Entry::Scalar(Scalar::Null);

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Scalar(_) => EntryKind::Scalar,
            Entry::List(_) => EntryKind::List,
            Entry::Document(_) => EntryKind::Document,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Entry::Scalar(Scalar::Null))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Entry::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Entry]> {
        match self {
            Entry::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Entry::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

/// One record instance: attribute name → entry.
///
/// Key order carries no meaning; a `BTreeMap` keeps `Debug` output and
/// equality deterministic.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Entry>);

impl Document {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert an entry, returning the previous one under the same key.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        self.0.insert(key.into(), entry.into())
    }

    /// Builder-style [`Document::insert`].
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Entry)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Entry);
    type IntoIter = btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Entry);
    type IntoIter = btree_map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Literal conversions, handy for hand-built documents
// ---------------------------------------------------------------------------

impl From<Scalar> for Entry {
    fn from(s: Scalar) -> Self {
        Entry::Scalar(s)
    }
}

impl From<Document> for Entry {
    fn from(doc: Document) -> Self {
        Entry::Document(doc)
    }
}

impl From<Vec<Entry>> for Entry {
    fn from(items: Vec<Entry>) -> Self {
        Entry::List(items)
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v as $as)
                }
            }

            impl From<$ty> for Entry {
                fn from(v: $ty) -> Self {
                    Entry::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

scalar_from! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<bool> for Entry {
    fn from(v: bool) -> Self {
        Entry::Scalar(Scalar::Bool(v))
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<&str> for Entry {
    fn from(v: &str) -> Self {
        Entry::Scalar(Scalar::from(v))
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<String> for Entry {
    fn from(v: String) -> Self {
        Entry::Scalar(Scalar::String(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_reports_variant() {
        assert_eq!(Entry::from(1i32).kind(), EntryKind::Scalar);
        assert_eq!(Entry::List(vec![]).kind(), EntryKind::List);
        assert_eq!(Entry::Document(Document::new()).kind(), EntryKind::Document);
        assert!(Entry::NULL.is_null());
    }

    #[test]
    fn document_builder_replaces_existing_key() {
        let mut doc = Document::new().with("a", 1i64).with("b", "x");
        assert_eq!(doc.insert("a", 2i64), Some(Entry::Scalar(Scalar::Int(1))));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn unsigned_literals_stay_unsigned() {
        assert_eq!(Scalar::from(7u16), Scalar::UInt(7));
        assert_eq!(Scalar::from(-7i16), Scalar::Int(-7));
    }
}
