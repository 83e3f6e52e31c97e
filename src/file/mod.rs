//! File intake and storage for qrdrop.
//!
//! This module turns uploaded files into stored objects:
//! - Filename sanitization (pinyin transliteration for Han characters)
//! - Storage key allocation under a configurable naming policy
//! - Streaming blob storage with size limits and no partial files

mod key;
mod sanitize;
mod storage;

pub use key::{
    KeyAllocator, NamingPolicy, RandomKeys, SanitizedKeys, StorageKey, TimestampPrefixedKeys,
};
pub use sanitize::{extension, is_cjk, sanitize, split_name, FALLBACK_STEM, MAX_STEM_LENGTH};
pub use storage::{BlobStore, LoadedObject, StoredObject};
