//! In-memory vfiles store.
//!
//! [`MemoryStore`] keeps the namespace as a trie of [`tree::Directory`]
//! nodes. Directories are implicit: they appear when a file is written
//! beneath them and disappear with their last descendant.

mod store;
pub mod tree;

pub use store::MemoryStore;
