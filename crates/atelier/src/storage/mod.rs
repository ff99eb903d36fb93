pub mod filesystem;

pub use filesystem::{basename, split_extension, MediaStorage, StoredFile};
