use bytes::Bytes;

use crate::hash::Hash;

/// An immutable byte blob addressed by its content hash.
///
/// Cloning is cheap: the payload is reference-counted. A chunk's identity is
/// its hash; the store never looks inside `data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk from raw bytes, hashing them with [`Hash::of`].
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            hash: Hash::of(&data),
            data,
        }
    }

    /// Create a chunk whose hash was computed by the caller.
    ///
    /// The hash is trusted as given. Use [`Chunk::verify`] to check it.
    pub fn with_hash(hash: Hash, data: impl Into<Bytes>) -> Self {
        Self {
            hash,
            data: data.into(),
        }
    }

    /// The "not found" sentinel. Never stored in any table.
    pub const fn empty() -> Self {
        Self {
            hash: Hash::zero(),
            data: Bytes::new(),
        }
    }

    /// Returns `true` for the [`Chunk::empty`] sentinel only. A real chunk
    /// with a zero-length payload is not a sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.hash.is_zero() && self.data.is_empty()
    }

    /// The content hash this chunk is stored under.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload size in bytes. Zero for the sentinel and for real empty
    /// payloads alike.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Recompute the hash of the payload and compare it to the declared one.
    pub fn verify(&self) -> bool {
        Hash::of(&self.data) == self.hash
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::empty()
    }
}
