use serde::Deserialize;

/// Engine-wide conversion settings.
///
/// Format independent: embed it in the host's configuration and let serde
/// fill in whatever is missing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Numeric, boolean and timestamp fields also accept string scalars
    /// that parse losslessly. Some stores transport numbers as strings.
    pub lenient_numbers: bool,

    /// Omit empty collections from documents, like absent values.
    /// Some stores reject empty sets.
    pub omit_empty_collections: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            lenient_numbers: true,
            omit_empty_collections: false,
        }
    }
}

impl CodecConfig {
    /// Rejects everything but exactly typed scalars.
    pub fn strict() -> Self {
        Self {
            lenient_numbers: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: CodecConfig =
            serde_json::from_value(serde_json::json!({ "omit_empty_collections": true })).unwrap();
        assert!(cfg.lenient_numbers);
        assert!(cfg.omit_empty_collections);
    }

    #[test]
    fn strict_disables_lenient_numbers() {
        assert!(!CodecConfig::strict().lenient_numbers);
        assert_eq!(CodecConfig::strict().omit_empty_collections, CodecConfig::default().omit_empty_collections);
    }
}
