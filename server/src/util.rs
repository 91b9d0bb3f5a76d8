// util.rs
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

pub type Key = String;
pub type ShardId = usize;

/// Calculates a consistent hash for the given key.
pub fn hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Maps a key onto one of `shard_count` shards.
pub fn shard_for(key: &str, shard_count: usize) -> ShardId {
    (hash(key) % shard_count.max(1) as u64) as ShardId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_is_stable_and_in_range() {
        for key in ["color", "zero", "", "a much longer key with spaces"] {
            let shard = shard_for(key, 8);
            assert!(shard < 8);
            assert_eq!(shard, shard_for(key, 8));
        }
        assert_eq!(shard_for("anything", 0), 0);
    }
}
