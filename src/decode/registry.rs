//! Decode capability registry.
//!
//! Maps compression codes to factories producing [`Decoder`] instances,
//! plus a hint whether the codec is worth shipping to a worker. The table
//! is mutable at runtime; registering a code again replaces the previous
//! factory.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{CodecError, DecodeError};
use crate::format::tiff::Directory;

use super::codecs;
use super::predictor::apply_predictor;

/// Compression code assumed when a directory has no Compression tag.
const DEFAULT_COMPRESSION: u16 = 1;

/// A decode capability: compressed chunk in, raw samples out.
///
/// Implementations must not apply the predictor; the registry does that
/// after every codec.
pub trait Decoder: Send + Sync {
    fn decode(&self, directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError>;
}

/// Builds a decoder for a directory. Called on every resolution.
pub type DecoderFactory =
    Arc<dyn Fn(&Directory) -> Result<Box<dyn Decoder>, DecodeError> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    factory: DecoderFactory,
    prefer_worker: bool,
}

/// Compression code to decoder table.
pub struct DecoderRegistry {
    entries: RwLock<HashMap<u16, Registration>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<u16> = self.entries.read().keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("codes", &codes)
            .finish()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with the built-in codecs registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        codecs::register_defaults(&registry);
        registry
    }

    /// The process-wide registry, created with the built-in codecs on first use.
    pub fn global() -> Arc<DecoderRegistry> {
        static GLOBAL: OnceLock<Arc<DecoderRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Self::with_defaults()))
            .clone()
    }

    /// Associate `codes` with `factory`. Last registration wins.
    pub fn register<F>(&self, codes: impl IntoIterator<Item = u16>, factory: F, prefer_worker: bool)
    where
        F: Fn(&Directory) -> Result<Box<dyn Decoder>, DecodeError> + Send + Sync + 'static,
    {
        let registration = Registration {
            factory: Arc::new(factory),
            prefer_worker,
        };
        let mut entries = self.entries.write();
        for code in codes {
            if entries.insert(code, registration.clone()).is_some() {
                debug!(code, "Replacing decoder registration");
            } else {
                debug!(code, prefer_worker, "Registered decoder");
            }
        }
    }

    /// Build the decoder for the directory's compression.
    ///
    /// # Errors
    /// `UnsupportedCompression` when nothing is registered for the code, or
    /// when the registered factory refuses it.
    pub fn resolve(&self, directory: &Directory) -> Result<Box<dyn Decoder>, DecodeError> {
        let code = directory.compression();
        let registration = self
            .entries
            .read()
            .get(&code.unwrap_or(DEFAULT_COMPRESSION))
            .cloned()
            .ok_or_else(|| DecodeError::UnsupportedCompression {
                code,
                reason: "no decoder registered".to_string(),
            })?;
        (registration.factory)(directory)
    }

    /// Worker affinity of the directory's codec; `None` when unregistered.
    pub fn prefer_worker(&self, directory: &Directory) -> Option<bool> {
        let code = directory.compression().unwrap_or(DEFAULT_COMPRESSION);
        self.entries.read().get(&code).map(|r| r.prefer_worker)
    }

    pub fn is_registered(&self, code: u16) -> bool {
        self.entries.read().contains_key(&code)
    }

    /// Resolve, decode and undo the predictor in one step.
    pub fn decode(&self, directory: &Directory, buffer: Bytes) -> Result<Bytes, DecodeError> {
        let decoder = self.resolve(directory)?;
        let decoded = decoder.decode(directory, buffer)?;
        Ok(apply_predictor(directory, decoded)?)
    }
}

/// Register a decoder factory in the global registry.
pub fn register_decoder<F>(codes: impl IntoIterator<Item = u16>, factory: F, prefer_worker: bool)
where
    F: Fn(&Directory) -> Result<Box<dyn Decoder>, DecodeError> + Send + Sync + 'static,
{
    DecoderRegistry::global().register(codes, factory, prefer_worker);
}

/// Resolve a decoder from the global registry.
pub fn resolve_decoder(directory: &Directory) -> Result<Box<dyn Decoder>, DecodeError> {
    DecoderRegistry::global().resolve(directory)
}
