use crate::registry::DatabaseStorePrefixes;
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display};

pub const SEP: u8 = b'/';
pub const SEP_SIZE: usize = 1;

/// A full DB key: `prefix | SEP | key bytes`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        Self {
            path: prefix.iter().chain(std::iter::once(&SEP)).chain(key.as_ref().iter()).copied().collect(),
            prefix_len: prefix.len() + SEP_SIZE, // Include `SEP` as part of the prefix
        }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, key) = self.path.split_at(self.prefix_len);
        // Known store prefixes are printed by name
        match prefix.first().copied().and_then(DatabaseStorePrefixes::from_u8) {
            Some(store) if prefix.len() == 1 + SEP_SIZE => write!(f, "{:?}/", store)?,
            _ => {
                f.write_str(&faster_hex::hex_string(&prefix[..prefix.len() - SEP_SIZE]))?; // Drop `SEP`
                f.write_str("/")?;
            }
        }
        // We expect that key is usually more readable as hex
        f.write_str(&faster_hex::hex_string(key))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DatabaseStorePrefixes;
    use dagcore_hashes::{HASH_SIZE, Hash};

    #[test]
    fn test_key_display() {
        let key1 = DbKey::new(DatabaseStorePrefixes::Ghostdag.as_ref(), Hash::from_u64_word(1));
        let key2 = DbKey::new(&[0xC0, 0xC1, 0xF5, 0xF6], Hash::from_u64_word(345690));
        let key3 = DbKey::new(DatabaseStorePrefixes::Reachability.as_ref(), Hash::from_bytes([SEP; HASH_SIZE]));
        let key4 = DbKey::prefix_only(&[0xC0, 0xC1, 0xF5, 0xF6]);
        let key5 = DbKey::prefix_only(DatabaseStorePrefixes::ReachabilityReindexRoot.as_ref());

        assert_eq!(key1.to_string(), format!("Ghostdag/{}", Hash::from_u64_word(1)));
        assert!(key2.to_string().starts_with("c0c1f5f6/"));
        assert!(key3.to_string().starts_with("Reachability/2f2f"));
        assert_eq!(key4.to_string(), "c0c1f5f6/");
        assert_eq!(key5.to_string(), "ReachabilityReindexRoot/");
        assert_eq!(key1.prefix_len(), 2);
        assert_eq!(key1.as_ref().len(), 2 + HASH_SIZE);
    }
}
