//! A vfiles store persisted in a local directory.
//!
//! The store owns three subdirectories of its root: `data/` mirrors the
//! namespace one-to-one, `meta/` holds a JSON sidecar with the media type
//! and commit time of each file, and `staging/` holds the contents of
//! writes whose producer has not finished yet. A write becomes visible
//! with a single rename from `staging/` into `data/`.

mod error;
mod metadata;
mod staging;
mod store;

pub use error::DiskStoreError;
pub use store::DiskStore;
