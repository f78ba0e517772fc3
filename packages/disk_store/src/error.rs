use std::{io, path::PathBuf};

use vfiles_core_store::Error;

#[derive(thiserror::Error, Debug)]
pub enum DiskStoreError {
    #[error("An error occurred trying to use the root path {path}: {error}")]
    RootPathInvalid {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Could not prepare store directory {path}: {error}")]
    Layout {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

impl From<DiskStoreError> for Error {
    fn from(error: DiskStoreError) -> Self {
        Error::Io(io::Error::other(error))
    }
}
