use std::fmt;

/// Width of a [`Hash`] in bytes.
pub const HASH_LEN: usize = 32;

/// Content hash of a chunk, and the value a store root points at.
///
/// Opaque to the store: compared, ordered and used as a map key, never
/// inspected. Distinct contents are assumed never to collide.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// BLAKE3 digest of `data`.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Initial root of every store. Also the hash of the empty chunk.
    pub const fn zero() -> Self {
        Self([0u8; HASH_LEN])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First four bytes in hex, for log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_content_equal_hash() {
        assert_eq!(Hash::of(b"chunk"), Hash::of(b"chunk"));
        assert_ne!(Hash::of(b"chunk"), Hash::of(b"chunk!"));
    }

    #[test]
    fn zero_root_is_not_a_content_hash() {
        assert!(Hash::default().is_zero());
        assert!(!Hash::of(b"").is_zero());
    }

    #[test]
    fn text_forms() {
        let h = Hash::of(b"root");
        assert_eq!(h.to_string().len(), HASH_LEN * 2);
        assert!(h.to_string().starts_with(&h.short_hex()));
        assert_eq!(format!("{h:?}"), format!("Hash({})", h.short_hex()));
        assert_eq!(Hash::zero().short_hex(), "00000000");
    }

    #[test]
    fn usable_as_sorted_map_key() {
        let mut hashes = vec![Hash::of(b"b"), Hash::zero(), Hash::of(b"a")];
        hashes.sort();
        assert_eq!(hashes[0], Hash::zero());
        assert!(hashes[1].as_bytes() <= hashes[2].as_bytes());
    }
}
