//! Field-level custom converters.

use std::collections::{BTreeMap, HashMap};

use docmap::{
    AttributeConverter, CodecCache, ConversionError, Document, Entry, EntryKind, Enumeration,
    Record, Rule, Scalar,
};

#[derive(Enumeration, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Pending = 0,
    Shipped = 1,
    Delivered = 2,
}

/// Stores [`Status`] by name instead of by discriminant.
#[derive(Default)]
struct StatusByName;

impl AttributeConverter for StatusByName {
    type Value = Status;

    fn to_entry(&self, value: &Status) -> Result<Entry, ConversionError> {
        let name = match value {
            Status::Pending => "PENDING",
            Status::Shipped => "SHIPPED",
            Status::Delivered => "DELIVERED",
        };
        Ok(Entry::from(name))
    }

    fn from_entry(&self, entry: &Entry) -> Result<Status, ConversionError> {
        match entry {
            Entry::Scalar(Scalar::String(s)) => match s.as_str() {
                "PENDING" => Ok(Status::Pending),
                "SHIPPED" => Ok(Status::Shipped),
                "DELIVERED" => Ok(Status::Delivered),
                other => Err(ConversionError::new("Status", format!("unknown status '{other}'"))),
            },
            other => Err(ConversionError::unexpected("Status", EntryKind::Scalar, other.kind())),
        }
    }
}

/// Flattens a string map into a nested document.
#[derive(Default)]
struct MapAsDocument;

impl AttributeConverter for MapAsDocument {
    type Value = HashMap<String, i64>;

    fn to_entry(&self, value: &HashMap<String, i64>) -> Result<Entry, ConversionError> {
        Ok(Entry::Document(
            value
                .iter()
                .map(|(k, v)| (k.clone(), Entry::from(*v)))
                .collect(),
        ))
    }

    fn from_entry(&self, entry: &Entry) -> Result<HashMap<String, i64>, ConversionError> {
        let doc = entry.as_document().ok_or_else(|| {
            ConversionError::unexpected("HashMap<String, i64>", EntryKind::Document, entry.kind())
        })?;
        doc.iter()
            .map(|(k, v)| match v {
                Entry::Scalar(Scalar::Int(i)) => Ok((k.clone(), *i)),
                other => Err(ConversionError::new("i64", "expected an integer")
                    .with_found(other.kind())
                    .at(k.clone())),
            })
            .collect()
    }
}

#[derive(Record, Debug, Clone, PartialEq, Default)]
struct Shipment {
    id: String,
    #[docmap(converter = "StatusByName")]
    status: Status,
    #[docmap(converter = "MapAsDocument")]
    counts: HashMap<String, i64>,
}

#[derive(Record, Debug, Clone, PartialEq, Default)]
struct Order {
    number: u32,
    shipments: Vec<Shipment>,
}

#[test]
fn test_converter_owns_the_wire_shape() {
    let cache = CodecCache::new();
    let codec = cache.codec::<Shipment>().unwrap();

    let shipment = Shipment {
        id: "s-1".to_string(),
        status: Status::Shipped,
        counts: [("boxes".to_string(), 3), ("pallets".to_string(), 1)].into_iter().collect(),
    };
    let doc = codec.to_document(&shipment).unwrap();

    assert_eq!(doc.get("status"), Some(&Entry::from("SHIPPED")));
    let counts = doc.get("counts").and_then(Entry::as_document).unwrap();
    assert_eq!(counts.get("boxes"), Some(&Entry::Scalar(Scalar::Int(3))));

    assert_eq!(codec.from_document(&doc).unwrap(), shipment);
    assert_eq!(codec.field("status").map(|f| f.rule()), Some(Rule::Custom));
}

#[test]
fn test_converter_is_recorded_on_descriptor() {
    let cache = CodecCache::new();
    let descriptor = cache.descriptor::<Shipment>().unwrap();

    let converter = descriptor.field("status").and_then(|f| f.converter()).unwrap();
    assert!(converter.ends_with("StatusByName"));
    assert_eq!(descriptor.field("id").and_then(|f| f.converter()), None);
}

#[test]
fn test_converter_error_carries_field_path() {
    let cache = CodecCache::new();
    let codec = cache.codec::<Order>().unwrap();

    let bad = Document::new().with("id", "s-2").with("status", "LOST");
    let doc = Document::new()
        .with("number", 7u32)
        .with("shipments", vec![Entry::Document(Document::new().with("id", "s-1")), Entry::Document(bad)]);

    let err = codec.from_document(&doc).unwrap_err();
    assert_eq!(err.field_path(), "shipments[1].status");
    assert!(err.message.contains("unknown status 'LOST'"));
}

#[test]
fn test_nested_converter_errors_extend_the_path() {
    let cache = CodecCache::new();
    let doc = Document::new().with(
        "counts",
        Document::new().with("boxes", Scalar::Int(1)).with("crates", "two"),
    );

    let err = cache.from_document::<Shipment>(&doc).unwrap_err();
    assert!(err.to_string().contains("counts.crates"), "{err}");
}

#[test]
fn test_maps_need_a_converter() {
    #[derive(Record, Debug, Default)]
    struct Inventory {
        name: String,
        stock: BTreeMap<String, u32>,
    }

    let cache = CodecCache::new();
    let err = cache.codec::<Inventory>().unwrap_err();
    assert_eq!(err.field.as_deref(), Some("stock"));
    assert!(err.reason.contains("declare a converter"));
}
