//! Foundation types for the chunk store.
//!
//! Every other crate in the workspace depends on `chunk-types`. It provides
//! the two primitives the store is built from:
//!
//! - [`Hash`] — fixed-width, totally ordered content identifier
//! - [`Chunk`] — immutable byte blob addressed by its [`Hash`]
//!
//! The store never interprets chunk bytes. [`Hash::of`] (BLAKE3) is the
//! content hash [`Chunk::new`] uses.

pub mod chunk;
pub mod hash;

pub use chunk::Chunk;
pub use hash::{Hash, HASH_LEN};
