//! Cache records and the versioned snapshot codec.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thermic_core::{CacheKey, StorageError, TefAnalysis, Timestamp};

/// Current snapshot format version. Anything else is treated as corruption.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One cached analysis with its write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub analysis: TefAnalysis,
    pub written_at: Timestamp,
}

impl CacheRecord {
    pub fn new(analysis: TefAnalysis, written_at: Timestamp) -> Self {
        Self {
            analysis,
            written_at,
        }
    }

    /// Age at `now`. A record from the future has age zero.
    pub fn age(&self, now: Timestamp) -> Duration {
        let age = now.signed_duration_since(self.written_at);
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }

    /// Valid iff `age < ttl`.
    pub fn is_valid(&self, now: Timestamp, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// The whole cache as persisted under a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub records: BTreeMap<CacheKey, CacheRecord>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            records: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    pub fn new(records: BTreeMap<CacheKey, CacheRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            records,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(self).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Decode bytes stored under `key`.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, StorageError> {
        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::Corrupted {
                key: key.to_string(),
                reason: format!(
                    "unsupported snapshot version {} (expected {})",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use thermic_core::{compute_analysis, hash, Macros, MealEntry, MealType};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn coffee() -> MealEntry {
        MealEntry::new("Coffee", 200.0, MealType::Breakfast, Macros::new(4.0, 0.6, 0.0, 0.0))
    }

    #[test]
    fn test_record_validity_boundary() {
        let record = CacheRecord::new(compute_analysis(&[coffee()], None, at(8)), at(8));
        let ttl = Duration::hours(24);
        assert!(record.is_valid(at(8) + Duration::hours(23), ttl));
        assert!(!record.is_valid(at(8) + Duration::hours(24), ttl));
        assert_eq!(record.age(at(6)), Duration::zero());
    }

    #[test]
    fn test_snapshot_decode_roundtrip() {
        let mut records = BTreeMap::new();
        records.insert(
            hash(&[coffee()]),
            CacheRecord::new(compute_analysis(&[coffee()], None, at(8)), at(8)),
        );
        let snapshot = Snapshot::new(records);
        let bytes = snapshot.encode().unwrap();
        assert_eq!(Snapshot::decode("k", &bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_garbage_is_corruption() {
        let err = Snapshot::decode("tef_analysis_cache", b"{not json").unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { ref key, .. } if key == "tef_analysis_cache"));
    }

    #[test]
    fn test_unknown_version_is_corruption() {
        let err = Snapshot::decode("k", br#"{"version":99,"records":{}}"#).unwrap_err();
        match err {
            StorageError::Corrupted { reason, .. } => assert!(reason.contains("99")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_validity_is_age_below_ttl(offset_secs in -3_600i64..200_000) {
                let written = at(8);
                let record = CacheRecord::new(compute_analysis(&[coffee()], None, written), written);
                let now = written + Duration::seconds(offset_secs);
                prop_assert_eq!(record.is_valid(now, Duration::hours(24)), offset_secs < 86_400);
                prop_assert!(record.age(now) >= Duration::zero());
            }
        }
    }
}
