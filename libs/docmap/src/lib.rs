//! Type-driven codec engine between Rust records and schemaless
//! attribute-value documents, as used by key-value / document stores.
//!
//! A record type describes its fields once (usually via
//! `#[derive(Record)]`); the [`CodecCache`] turns that description into a
//! [`Codec`] on first use and hands the same codec to every later caller.
//!
//! ```ignore
//! use docmap::{CodecCache, Enumeration, Record};
//!
//! #[derive(Enumeration, Default, Debug, PartialEq)]
//! enum Color { #[default] Red = 1, Blue = 2 }
//!
//! #[derive(Record, Default, Debug, PartialEq)]
//! #[docmap(rename_all = "PascalCase")]
//! struct Item {
//!     name: String,
//!     rating: Color,
//!     tags: Option<Vec<String>>,
//! }
//!
//! let cache = CodecCache::new();
//! let codec = cache.codec::<Item>()?;
//! let doc = codec.to_document(&item)?;
//! let back: Item = codec.from_document(&doc)?;
//! ```

extern crate self as docmap;

pub mod attribute;
pub mod cache;
pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod json;
pub mod resolve;
pub mod scalar;
pub mod schema;
pub mod synth;
pub mod value;

pub use docmap_derive::{Enumeration, Record};

pub use attribute::{Attribute, Collection};
pub use cache::{CacheStats, CodecCache};
pub use codec::{Codec, FieldCodec, Rule, ValuePlan};
pub use config::CodecConfig;
pub use converter::AttributeConverter;
pub use error::{CodecError, ConversionError, UnsupportedTypeError};
pub use scalar::{ScalarKind, ScalarValue};
pub use schema::{Category, CollectionKind, FieldDescriptor, Record, RecordRef, Shape, TypeDescriptor};
pub use value::{Document, Entry, EntryKind, Scalar};
