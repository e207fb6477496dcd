use crate::error::ConversionError;
use crate::value::Entry;

/// Field-level converter plugin.
///
/// Overrides the default rules for one field: whatever the declared type,
/// the converter alone decides the entry shape. Declared with
/// `#[docmap(converter = "path::ToConverter")]`; the engine default-constructs
/// it once per (record type, field) when the field codec is built.
///
/// Typical uses: storing an enumeration by name, flattening a map into a
/// document, or any wire shape the default rules cannot express.
pub trait AttributeConverter: Default + Send + Sync + 'static {
    type Value: Send + Sync + 'static;

    fn to_entry(&self, value: &Self::Value) -> Result<Entry, ConversionError>;

    fn from_entry(&self, entry: &Entry) -> Result<Self::Value, ConversionError>;
}
