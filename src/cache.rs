//! Process-wide zone identity cache (C11), per §5 and §6.
//!
//! Grounded in the teacher's `tz::cache::TZifCache`: a key→zone lookup table
//! backed by `ahash` (the teacher's own comment on that choice -- zone ids
//! are short, trusted, bounded strings -- applies verbatim here). The
//! teacher's cache is single-threaded (it only ever runs behind the Python
//! GIL), so it uses manual refcounting and an LRU `VecDeque`. This crate has
//! no such lock to lean on, so §5's "atomic swap of the whole generation" is
//! realized literally: the lookup table lives behind an `Arc` that `clear()`
//! replaces wholesale, and any reader who already cloned the old `Arc` out
//! keeps querying it safely, since `Zone`s are immutable.
use crate::error::{Error, Result};
use crate::registry::RegistryFields;
use crate::zone::Zone;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// The kind of localized name a [`ZoneSource`] may be asked to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Generic,
    Standard,
    Daylight,
}

/// What the collaborator found when asked to resolve "the local zone".
#[derive(Debug, Clone)]
pub enum LocalZoneHint {
    Bytes { id: String, bytes: Vec<u8> },
    Registry { id: String, fields: RegistryFields },
}

/// The "collaborator" contract of spec.md §6: everything the core engine
/// does not own (locale lookups, filesystem/registry walks, host-local-zone
/// resolution) is delegated to an implementation of this trait.
pub trait ZoneSource {
    fn load_bytes(&self, id: &str) -> Result<Vec<u8>>;
    fn load_registry(&self, id: &str) -> Result<RegistryFields>;
    fn enumerate(&self) -> Result<Vec<String>>;
    fn resolve_local(&self) -> Result<LocalZoneHint>;
    fn localized_name(&self, _id: &str, _kind: NameKind) -> Option<String> {
        None
    }
}

const MAX_ID_LEN_REGISTRY_PLATFORM: usize = 255;

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('\0') {
        return Err(Error::InvalidZone { detail: "zone id must be non-empty and NUL-free".into() });
    }
    if id.len() > MAX_ID_LEN_REGISTRY_PLATFORM {
        return Err(Error::InvalidZone { detail: "zone id exceeds the registry platform's length bound".into() });
    }
    Ok(())
}

type Generation = AHashMap<String, Arc<Zone>>;

/// Process-wide id→[`Zone`] cache, plus the lazily-resolved Local handle.
#[derive(Debug)]
pub struct ZoneCache {
    generation: RwLock<Arc<Generation>>,
    local: RwLock<Option<Arc<Zone>>>,
}

impl Default for ZoneCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneCache {
    pub fn new() -> Self {
        Self { generation: RwLock::new(Arc::new(AHashMap::default())), local: RwLock::new(None) }
    }

    fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.generation.read().expect("zone cache lock poisoned"))
    }

    /// Replace the cache with a fresh, empty generation. Readers that already
    /// cloned the previous generation's `Arc` keep using it -- the swap does
    /// not invalidate in-flight lookups, only future ones.
    pub fn clear(&self) {
        log::debug!("zone cache: clearing generation");
        *self.generation.write().expect("zone cache lock poisoned") = Arc::new(AHashMap::default());
        *self.local.write().expect("zone cache lock poisoned") = None;
    }

    /// Look up `id`, decoding and inserting it via `source` on a miss.
    pub fn find_zone_by_id<S: ZoneSource>(&self, source: &S, id: &str) -> Result<Arc<Zone>> {
        validate_id(id)?;
        if let Some(zone) = self.snapshot().get(id) {
            log::trace!("zone cache: hit for {id}");
            return Ok(Arc::clone(zone));
        }
        log::debug!("zone cache: miss for {id}, decoding");
        let zone = Arc::new(self.decode_zone(source, id)?);
        let mut generation = self.generation.write().expect("zone cache lock poisoned");
        let mut next = (**generation).clone();
        next.insert(id.to_string(), Arc::clone(&zone));
        *generation = Arc::new(next);
        Ok(zone)
    }

    fn decode_zone<S: ZoneSource>(&self, source: &S, id: &str) -> Result<Zone> {
        match source.load_bytes(id) {
            Ok(bytes) => crate::binary::decode(&bytes, id),
            Err(Error::ZoneNotFound { .. }) => {
                let fields = source.load_registry(id)?;
                crate::registry::decode(&fields, id)
            }
            Err(other) => Err(other),
        }
    }

    /// Enumerate and decode every zone the collaborator knows about, sorted
    /// by base UTC offset ascending, then display name ascending (ordinal).
    pub fn list_system_zones<S: ZoneSource>(&self, source: &S) -> Result<Vec<Arc<Zone>>> {
        let mut zones = Vec::new();
        for id in source.enumerate()? {
            zones.push(self.find_zone_by_id(source, &id)?);
        }
        zones.sort_by(|a, b| {
            a.base_utc_offset.minutes().cmp(&b.base_utc_offset.minutes()).then_with(|| a.display_name.cmp(&b.display_name))
        });
        Ok(zones)
    }

    /// The lazily-created Local handle (spec.md §5b), refreshed on demand:
    /// resolved once per cache generation and cached thereafter until the
    /// next [`ZoneCache::clear`].
    pub fn local<S: ZoneSource>(&self, source: &S) -> Result<Arc<Zone>> {
        if let Some(zone) = self.local.read().expect("zone cache lock poisoned").as_ref() {
            return Ok(Arc::clone(zone));
        }
        let zone = Arc::new(match source.resolve_local()? {
            LocalZoneHint::Bytes { id, bytes } => crate::binary::decode(&bytes, &id)?,
            LocalZoneHint::Registry { id, fields } => crate::registry::decode(&fields, &id)?,
        });
        *self.local.write().expect("zone cache lock poisoned") = Some(Arc::clone(&zone));
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Offset;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        decodes: AtomicUsize,
    }

    impl ZoneSource for FixedSource {
        fn load_bytes(&self, id: &str) -> Result<Vec<u8>> {
            if id == "Fixed/UTC" {
                self.decodes.fetch_add(1, Ordering::SeqCst);
                // A minimal valid v1 TZif blob with one fixed-offset type.
                let mut out = Vec::new();
                out.extend_from_slice(b"TZif");
                out.push(0);
                out.extend_from_slice(&[0u8; 15]);
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&1u32.to_be_bytes());
                out.extend_from_slice(&4u32.to_be_bytes());
                out.extend_from_slice(&0i32.to_be_bytes());
                out.push(0);
                out.push(0);
                out.extend_from_slice(b"UTC\0");
                Ok(out)
            } else {
                Err(Error::ZoneNotFound { id: id.to_string() })
            }
        }

        fn load_registry(&self, id: &str) -> Result<RegistryFields> {
            Err(Error::ZoneNotFound { id: id.to_string() })
        }

        fn enumerate(&self) -> Result<Vec<String>> {
            Ok(vec!["Fixed/UTC".to_string()])
        }

        fn resolve_local(&self) -> Result<LocalZoneHint> {
            Err(Error::ZoneNotFound { id: "local".to_string() })
        }
    }

    #[test]
    fn test_cache_hit_avoids_redecoding() {
        let source = FixedSource { decodes: AtomicUsize::new(0) };
        let cache = ZoneCache::new();
        let a = cache.find_zone_by_id(&source, "Fixed/UTC").unwrap();
        let b = cache.find_zone_by_id(&source, "Fixed/UTC").unwrap();
        assert_eq!(a.base_utc_offset, Offset::ZERO);
        assert_eq!(source.decodes.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_clear_forces_redecode() {
        let source = FixedSource { decodes: AtomicUsize::new(0) };
        let cache = ZoneCache::new();
        cache.find_zone_by_id(&source, "Fixed/UTC").unwrap();
        cache.clear();
        cache.find_zone_by_id(&source, "Fixed/UTC").unwrap();
        assert_eq!(source.decodes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rejects_empty_id() {
        let source = FixedSource { decodes: AtomicUsize::new(0) };
        let cache = ZoneCache::new();
        assert!(cache.find_zone_by_id(&source, "").is_err());
    }

    #[test]
    fn test_list_system_zones_sorted() {
        let source = FixedSource { decodes: AtomicUsize::new(0) };
        let cache = ZoneCache::new();
        let zones = cache.list_system_zones(&source).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id, "Fixed/UTC");
    }
}
