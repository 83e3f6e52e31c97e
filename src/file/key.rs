//! Storage key allocation.
//!
//! A [`KeyAllocator`] turns an uploaded filename into the key the file is
//! stored and retrieved under. One policy is chosen per process through
//! [`NamingPolicy`]; callers only see the trait.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

use super::sanitize::{extension, is_cjk, sanitize, split_name};

/// Length of the random token appended to sanitized keys.
const SUFFIX_LENGTH: usize = 6;

/// Opaque identifier of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased extension of the key, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = split_name(&self.0);
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StorageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for StorageKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strategy for deriving storage keys from uploaded filenames.
pub trait KeyAllocator: Send + Sync + fmt::Debug {
    /// Allocate a key for `original_name` captured at `now`.
    fn allocate_at(&self, original_name: &str, now: DateTime<Utc>) -> StorageKey;

    /// Allocate a key for `original_name` captured at the current time.
    fn allocate(&self, original_name: &str) -> StorageKey {
        self.allocate_at(original_name, Utc::now())
    }
}

/// Naming policy selectable in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// `{prefix}_{stem}_{YYYYMMDDHHMM}_{random}.{ext}` with a sanitized stem.
    #[default]
    Sanitized,
    /// `{millis}-{original name}`, the name kept verbatim.
    TimestampPrefixed,
    /// `{millis}-{random}.{ext}`, the original name discarded.
    Random,
}

impl NamingPolicy {
    /// Build the allocator for this policy.
    pub fn allocator(self, raw_prefix_len: usize) -> Arc<dyn KeyAllocator> {
        match self {
            NamingPolicy::Sanitized => Arc::new(SanitizedKeys::new(raw_prefix_len)),
            NamingPolicy::TimestampPrefixed => Arc::new(TimestampPrefixedKeys),
            NamingPolicy::Random => Arc::new(RandomKeys),
        }
    }
}

/// Sanitized, human-readable keys such as `baogao_202410181530_k3x9qa.docx`.
#[derive(Debug, Clone, Default)]
pub struct SanitizedKeys {
    /// Number of leading stem characters (letters, digits, ideographs) kept
    /// verbatim in front of the sanitized stem.
    raw_prefix_len: usize,
}

impl SanitizedKeys {
    /// Create an allocator keeping `raw_prefix_len` raw characters.
    pub fn new(raw_prefix_len: usize) -> Self {
        Self { raw_prefix_len }
    }

    fn raw_prefix(&self, original_name: &str) -> String {
        let (stem, _) = split_name(original_name);
        stem.chars()
            .filter(|c| c.is_ascii_alphanumeric() || is_cjk(*c))
            .take(self.raw_prefix_len)
            .collect()
    }
}

impl KeyAllocator for SanitizedKeys {
    fn allocate_at(&self, original_name: &str, now: DateTime<Utc>) -> StorageKey {
        let prefix = self.raw_prefix(original_name);
        let stem = sanitize(original_name);
        let timestamp = now.format("%Y%m%d%H%M");
        let suffix = random_suffix();

        let mut key = collapse_underscores(&format!("{prefix}_{stem}_{timestamp}_{suffix}"));
        if let Some(ext) = extension(original_name) {
            key.push('.');
            key.push_str(&ext);
        }
        StorageKey(key)
    }
}

/// Keys of the form `{millis}-{original name}`.
///
/// The name is not sanitized; the store rejects names it cannot hold safely.
#[derive(Debug, Clone, Default)]
pub struct TimestampPrefixedKeys;

impl KeyAllocator for TimestampPrefixedKeys {
    fn allocate_at(&self, original_name: &str, now: DateTime<Utc>) -> StorageKey {
        StorageKey(format!("{}-{}", now.timestamp_millis(), original_name))
    }
}

/// Keys of the form `{millis}-{random 0..1e9}.{ext}`.
#[derive(Debug, Clone, Default)]
pub struct RandomKeys;

impl KeyAllocator for RandomKeys {
    fn allocate_at(&self, original_name: &str, now: DateTime<Utc>) -> StorageKey {
        let n: u32 = rand::rng().random_range(0..1_000_000_000);
        let key = match extension(original_name) {
            Some(ext) => format!("{}-{n}.{ext}", now.timestamp_millis()),
            None => format!("{}-{n}", now.timestamp_millis()),
        };
        StorageKey(key)
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Collapse runs of underscores and trim them from both ends.
fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}
