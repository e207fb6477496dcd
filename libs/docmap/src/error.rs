use std::fmt;

use crate::value::EntryKind;

/// A type or field shape that no conversion rule covers.
///
/// Raised while building a codec, before any data is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct UnsupportedTypeError {
    pub type_name: String,
    pub field: Option<String>,
    pub reason: String,
}

impl UnsupportedTypeError {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: None,
            reason: reason.into(),
        }
    }

    /// Attach the field the unsupported shape was declared on.
    ///
    /// An already recorded field is kept: the innermost field is the useful one.
    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        if self.field.is_none() {
            self.field = Some(field.into());
        }
        self
    }
}

impl fmt::Display for UnsupportedTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "unsupported type '{}' (field '{field}'): {}",
                self.type_name, self.reason
            ),
            None => write!(f, "unsupported type '{}': {}", self.type_name, self.reason),
        }
    }
}

/// A value could not be converted in one direction or the other.
///
/// `path` is filled from the inside out while the error propagates through
/// nested records and lists, e.g. `["address", "lines", "[2]"]`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub struct ConversionError {
    pub path: Vec<String>,
    pub type_name: String,
    pub found: Option<EntryKind>,
    pub message: String,
}

impl ConversionError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            type_name: type_name.into(),
            found: None,
            message: message.into(),
        }
    }

    /// Entry kind did not match the shape the declared type expects.
    pub fn unexpected(type_name: impl Into<String>, expected: EntryKind, found: EntryKind) -> Self {
        Self {
            path: Vec::new(),
            type_name: type_name.into(),
            found: Some(found),
            message: format!("expected {expected}"),
        }
    }

    pub fn with_found(mut self, found: EntryKind) -> Self {
        self.found = Some(found);
        self
    }

    /// Prepend a path segment (field name or `[index]`).
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Dotted rendering of `path`; list indices attach without a dot.
    pub fn field_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "cannot convert '{}'", self.type_name)?;
        } else {
            write!(f, "field '{}' ({})", self.field_path(), self.type_name)?;
        }
        if let Some(found) = self.found {
            write!(f, ", found {found}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Either failure, for entry points that both build a codec and run it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedTypeError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
