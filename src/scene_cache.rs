use crate::{
    decode::SceneDecoder,
    error::FieldResult,
    model::Scene,
};

/// Default capacity of the decoded-scene cache.
pub const SCENE_CACHE_CAPACITY: usize = 10;

/// Cheap content fingerprint of raw scene bytes: the byte length plus five
/// sampled values at relative offsets 0%, 25%, 50%, 75%, and 100%.
///
/// O(1) regardless of input size, trading a small, nonzero collision
/// probability (two equal-length buffers agreeing on five offsets) for not
/// hashing potentially large inputs. Deliberate and documented; callers
/// needing strict identity under adversarial inputs should hash full
/// content instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneFingerprint {
    len: u64,
    samples: [u8; 5],
}

impl SceneFingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let len = bytes.len();
        let mut samples = [0u8; 5];
        if len > 0 {
            let offsets = [0, len / 4, len / 2, 3 * len / 4, len - 1];
            for (sample, &off) in samples.iter_mut().zip(offsets.iter()) {
                *sample = bytes[off];
            }
        }
        Self {
            len: len as u64,
            samples,
        }
    }
}

/// Identity of one successful decode.
///
/// Assigned monotonically, never reused, so downstream caches comparing
/// `SceneId`s can never alias a recycled cache slot with a new scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(pub u64);

struct CacheEntry {
    key: SceneFingerprint,
    id: SceneId,
    scene: Scene,
}

/// Bounded LRU cache mapping scene-byte fingerprints to decoded scenes.
///
/// Entries are kept in explicit recency order: index 0 is the least recently
/// used, the last index the most recent. A hit is modeled as
/// delete-then-reinsert; eviction removes index 0.
pub struct SceneCache {
    decoder: Box<dyn SceneDecoder>,
    entries: Vec<CacheEntry>,
    capacity: usize,
    next_id: u64,
    decode_calls: u64,
}

impl SceneCache {
    pub fn new(decoder: Box<dyn SceneDecoder>) -> Self {
        Self::with_capacity(decoder, SCENE_CACHE_CAPACITY)
    }

    pub fn with_capacity(decoder: Box<dyn SceneDecoder>, capacity: usize) -> Self {
        Self {
            decoder,
            entries: Vec::new(),
            capacity: capacity.max(1),
            next_id: 0,
            decode_calls: 0,
        }
    }

    /// Return the decoded scene for `bytes`, decoding at most once per
    /// cached fingerprint.
    ///
    /// A decode failure surfaces to the caller and caches nothing.
    pub fn get_or_decode(&mut self, bytes: &[u8]) -> FieldResult<(SceneId, &Scene)> {
        let key = SceneFingerprint::of(bytes);

        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            let entry = self.entries.remove(pos);
            self.entries.push(entry);
        } else {
            self.decode_calls += 1;
            let scene = self.decoder.decode(bytes)?;
            let id = SceneId(self.next_id);
            self.next_id += 1;
            tracing::debug!(?key, ?id, "scene cache miss, decoded");
            self.entries.push(CacheEntry { key, id, scene });
            if self.entries.len() > self.capacity {
                let evicted = self.entries.remove(0);
                tracing::debug!(id = ?evicted.id, "scene cache evicted least-recently-used entry");
            }
        }

        let entry = self
            .entries
            .last()
            .expect("cache holds the entry just touched");
        Ok((entry.id, &entry.scene))
    }

    /// Number of times the external decoder has been invoked.
    pub fn decode_calls(&self) -> u64 {
        self.decode_calls
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, bytes: &[u8]) -> bool {
        let key = SceneFingerprint::of(bytes);
        self.entries.iter().any(|e| e.key == key)
    }
}
