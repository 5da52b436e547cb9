use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

pub use dagcore_hashes::Hash;

pub mod blockhash;
pub mod config;
pub mod header;

/// Blue work is accumulated over `calc_work` results, which fit 192 bits for any target above 2^64
pub type BlueWorkType = dagcore_math::Uint192;

pub type KType = u8; // This type must be increased to u16 if we ever set GHOSTDAG K > 255
pub type HashKTypeMap = Arc<BlockHashMap<KType>>;

/// `BlockHasher` is a hasher for block hashes, which are already uniformly distributed.
/// The `Hash` type feeds a single `u64` word, which is returned as is.
#[derive(Default, Clone, Copy)]
pub struct BlockHasher(u64);

impl BlockHasher {
    #[inline(always)]
    pub const fn new() -> Self {
        Self(0)
    }
}

impl Hasher for BlockHasher {
    #[inline(always)]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    fn write_u64(&mut self, v: u64) {
        self.0 = v;
    }

    #[cold]
    fn write(&mut self, bytes: &[u8]) {
        // Only reached if a non-`Hash` key is used with this hasher
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.0 = self.0.rotate_left(5) ^ u64::from_le_bytes(word);
        }
    }
}

impl BuildHasher for BlockHasher {
    type Hasher = Self;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        Self(0)
    }
}

pub type BlockHashMap<V> = HashMap<Hash, V, BlockHasher>;
pub type BlockHashSet = HashSet<Hash, BlockHasher>;

pub trait HashMapCustomHasher {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

// HashMap::new and HashMap::with_capacity are only implemented on Hashmap<K, V, RandomState>.
impl<V> HashMapCustomHasher for BlockHashMap<V> {
    #[inline(always)]
    fn new() -> Self {
        Self::with_hasher(BlockHasher::new())
    }

    #[inline(always)]
    fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_and_hasher(cap, BlockHasher::new())
    }
}

impl HashMapCustomHasher for BlockHashSet {
    #[inline(always)]
    fn new() -> Self {
        Self::with_hasher(BlockHasher::new())
    }

    #[inline(always)]
    fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_and_hasher(cap, BlockHasher::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_map() {
        let mut map = BlockHashMap::<u64>::new();
        for i in 1..100u64 {
            map.insert(i.into(), i * 2);
        }
        assert_eq!(map.len(), 99);
        assert_eq!(map.get(&Hash::from(42)), Some(&84));

        let set = BlockHashSet::from_iter([Hash::from(1), Hash::from(1), Hash::from(2)]);
        assert_eq!(set.len(), 2);
    }
}
