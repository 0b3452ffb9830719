//! Whole-pipeline result cache.
//!
//! Keyed by the request fields that determine the result. Only clean results
//! are stored: anything carrying validation failures is recomputed, and
//! structured requests bypass the cache entirely (their content lives in the
//! part list, not in the text key).

use std::fmt;
use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use cantus_core::Result;
use cantus_core::api::{SynthesisRequest, SynthesisResult, TextFormat};

use crate::pipeline::Synthesizer;

/// The request fields that determine the synthesized result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    voice: String,
    speed_bits: u32,
    text_format: TextFormat,
}

impl CacheKey {
    fn from_request(request: &SynthesisRequest) -> Self {
        Self {
            text: request.text.clone(),
            voice: request.voice.clone(),
            speed_bits: request.speed.to_bits(),
            text_format: request.output_text_format,
        }
    }
}

struct CacheEntry {
    result: SynthesisResult,
    inserted: Instant,
}

/// Completed pipeline results, bounded to a configured number of entries.
///
/// Oldest entry is evicted on overflow. Capacity zero disables the cache.
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    capacity: usize,
}

impl ResultCache {
    /// A cache holding at most `capacity` results; zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// A previously stored result for this request, if any.
    #[must_use]
    pub fn get(&self, request: &SynthesisRequest) -> Option<SynthesisResult> {
        if self.capacity == 0 || !request.ssml_parts.is_empty() {
            return None;
        }
        self.entries
            .get(&CacheKey::from_request(request))
            .map(|entry| entry.result.clone())
    }

    /// Store a result. Rejected results and structured requests are skipped.
    pub fn store(&self, request: &SynthesisRequest, result: &SynthesisResult) {
        if self.capacity == 0
            || !request.ssml_parts.is_empty()
            || !result.validation_failures.is_empty()
        {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        let _ = self.entries.insert(
            CacheKey::from_request(request),
            CacheEntry {
                result: result.clone(),
                inserted: Instant::now(),
            },
        );
    }

    /// Number of stored results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().inserted)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            let _ = self.entries.remove(&key);
        }
    }
}

/// A pipeline wrapper answering repeated requests from the cache.
pub struct CachedSynthesizer {
    inner: Synthesizer,
    cache: ResultCache,
}

impl fmt::Debug for CachedSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSynthesizer").finish_non_exhaustive()
    }
}

impl CachedSynthesizer {
    /// Wrap a pipeline with a result cache of the given capacity.
    #[must_use]
    pub fn new(inner: Synthesizer, capacity: usize) -> Self {
        Self {
            inner,
            cache: ResultCache::new(capacity),
        }
    }

    /// Synthesize one request, consulting the cache first.
    pub async fn work(&self, request: SynthesisRequest) -> Result<SynthesisResult> {
        if let Some(hit) = self.cache.get(&request) {
            debug!("answered from cache");
            return Ok(hit);
        }
        let result = self.inner.work(request.clone()).await?;
        self.cache.store(&request, &result);
        Ok(result)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
