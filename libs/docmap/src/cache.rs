//! Codec Cache: lazily built, never evicted, shared by every caller.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::codec::{Codec, FieldCodec};
use crate::config::CodecConfig;
use crate::error::{CodecError, UnsupportedTypeError};
use crate::resolve;
use crate::schema::{Record, TypeDescriptor};
use crate::synth;
use crate::value::Document;

type Built = Result<Arc<dyn Any + Send + Sync>, UnsupportedTypeError>;

/// One memoized build. The map's shard lock is only held while fetching the
/// slot; the build itself runs inside the `OnceLock`, so a key is built at
/// most once and other keys never wait for it.
type Slot = Arc<OnceLock<Built>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CodecKey {
    type_id: TypeId,
    field: Option<&'static str>,
}

impl CodecKey {
    fn record<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            field: None,
        }
    }

    fn field<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            field: Some(name),
        }
    }
}

#[derive(Default)]
struct Counters {
    descriptors: AtomicUsize,
    codecs: AtomicUsize,
    field_codecs: AtomicUsize,
}

/// Build counts since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub descriptor_builds: usize,
    pub codec_builds: usize,
    pub field_codec_builds: usize,
    /// Slots currently held, failed builds included.
    pub cached: usize,
}

/// Process-lifetime store of type descriptors and codecs.
///
/// Keyed by `(type, optional field name)`. Failed builds are kept too:
/// resolution is deterministic, so the same error is returned again without
/// rebuilding.
pub struct CodecCache {
    config: CodecConfig,
    descriptors: DashMap<TypeId, Slot>,
    codecs: DashMap<CodecKey, Slot>,
    counters: Counters,
}

impl Default for CodecCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecCache {
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            descriptors: DashMap::new(),
            codecs: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Shared instance for hosts that want ambient access.
    pub fn global() -> &'static CodecCache {
        static GLOBAL: OnceLock<CodecCache> = OnceLock::new();
        GLOBAL.get_or_init(CodecCache::new)
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn descriptor<T: Record>(&self) -> Result<Arc<TypeDescriptor<T>>, UnsupportedTypeError> {
        get_or_build(&self.descriptors, TypeId::of::<T>(), &self.counters.descriptors, || {
            let descriptor = resolve::resolve::<T>();
            match &descriptor {
                Ok(d) => tracing::debug!(record = d.type_name(), fields = d.fields().len(), "descriptor resolved"),
                Err(e) => tracing::debug!(record = T::type_name(), error = %e, "descriptor rejected"),
            }
            descriptor.map(Arc::new)
        })
    }

    /// Whole-record codec for `T`, built on first request.
    pub fn codec<T: Record>(&self) -> Result<Arc<Codec<T>>, UnsupportedTypeError> {
        get_or_build(&self.codecs, CodecKey::record::<T>(), &self.counters.codecs, || {
            resolve::check_acyclic::<T>()?;
            let descriptor = self.descriptor::<T>()?;
            let codec = synth::build(&descriptor, self);
            match &codec {
                Ok(c) => tracing::debug!(record = c.type_name(), fields = c.fields().len(), "codec built"),
                Err(e) => tracing::debug!(record = T::type_name(), error = %e, "codec build failed"),
            }
            codec.map(Arc::new)
        })
    }

    /// Codec for one field of `T`, looked up by attribute name.
    ///
    /// Converter instances live here, so each (type, field) pair constructs
    /// its converter once.
    pub fn field_codec<T: Record>(&self, name: &str) -> Result<Arc<FieldCodec<T>>, UnsupportedTypeError> {
        let descriptor = self.descriptor::<T>()?;
        let field = descriptor.field(name).ok_or_else(|| {
            UnsupportedTypeError::new(T::type_name(), "no such field").on_field(name)
        })?;
        get_or_build(&self.codecs, CodecKey::field::<T>(field.name()), &self.counters.field_codecs, || {
            let codec = field.bind(self);
            match &codec {
                Ok(c) => tracing::debug!(record = T::type_name(), field = field.name(), rule = ?c.rule(), "field codec built"),
                Err(e) => tracing::debug!(record = T::type_name(), field = field.name(), error = %e, "field codec build failed"),
            }
            codec.map(Arc::new)
        })
    }

    /// Build (if needed) and run the codec for `T`.
    pub fn to_document<T: Record>(&self, value: &T) -> Result<Document, CodecError> {
        Ok(self.codec::<T>()?.to_document(value)?)
    }

    pub fn from_document<T: Record>(&self, doc: &Document) -> Result<T, CodecError> {
        Ok(self.codec::<T>()?.from_document(doc)?)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            descriptor_builds: self.counters.descriptors.load(Ordering::Relaxed),
            codec_builds: self.counters.codecs.load(Ordering::Relaxed),
            field_codec_builds: self.counters.field_codecs.load(Ordering::Relaxed),
            cached: self.descriptors.len() + self.codecs.len(),
        }
    }
}

impl fmt::Debug for CodecCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

fn get_or_build<K, V>(
    map: &DashMap<K, Slot>,
    key: K,
    counter: &AtomicUsize,
    build: impl FnOnce() -> Result<Arc<V>, UnsupportedTypeError>,
) -> Result<Arc<V>, UnsupportedTypeError>
where
    K: Eq + Hash,
    V: Any + Send + Sync,
{
    let existing = map.get(&key).map(|slot| Arc::clone(slot.value()));
    let slot = match existing {
        Some(slot) => slot,
        None => Arc::clone(map.entry(key).or_default().value()),
    };

    if slot.get().is_some() {
        tracing::trace!(kind = type_name::<V>(), "cache hit");
    }
    let built = slot.get_or_init(|| {
        counter.fetch_add(1, Ordering::Relaxed);
        build().map(|value| value as Arc<dyn Any + Send + Sync>)
    });

    match built {
        Ok(value) => Arc::clone(value).downcast::<V>().map_err(|_| {
            UnsupportedTypeError::new(type_name::<V>(), "cache slot holds a different type")
        }),
        Err(e) => Err(e.clone()),
    }
}
