//! Error type shared by every filesystem operation.
//!
//! Every failure is surfaced to the caller immediately; nothing is retried.
//! [`FsError::BrokenInvariant`] is the only variant that indicates a bug
//! rather than a user or image problem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// Operating system I/O error on the image file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded into, or decoded from, its fixed-size buffer.
    #[error("malformed {record} record: {detail}")]
    Format { record: &'static str, detail: String },

    /// The image is not one of ours, or it is truncated or inconsistent.
    #[error("corrupt image: {0}")]
    CorruptImage(String),

    /// The requested block count cannot be formatted.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Malformed or non-absolute path, or an unusable entry name.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("cannot find [{segment}] in [{path}]")]
    PathNotFound { segment: String, path: String },

    #[error("a directory can only contain {capacity} entries")]
    DirectoryFull { capacity: usize },

    #[error("{0:?} already exists")]
    AlreadyExists(String),

    #[error("{0:?} is not a directory")]
    NotADirectory(String),

    #[error("{0:?} is a directory")]
    IsADirectory(String),

    #[error("out of inodes: all {total} inodes are in use")]
    OutOfInodes { total: u32 },

    #[error("out of blocks: {shortfall} more block(s) required")]
    OutOfBlocks { shortfall: usize },

    #[error("cannot remove the root directory")]
    CannotDeleteRoot,

    #[error("file only has {size} bytes, cannot read {len} bytes from offset {offset}")]
    ReadOutOfBounds { offset: u64, len: usize, size: u32 },

    /// Internal consistency violation; never caused by correct usage.
    #[error("broken invariant: {0}")]
    BrokenInvariant(String),
}

impl FsError {
    /// POSIX errno for this error, used as the CLI exit status.
    ///
    /// No wildcard arm: a new variant must pick its errno here.
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::Io(_) => libc::EIO,
            FsError::Format { .. } => libc::EINVAL,
            FsError::CorruptImage(_) => libc::EIO,
            FsError::InvalidGeometry(_) => libc::EINVAL,
            FsError::InvalidPath { .. } => libc::EINVAL,
            FsError::PathNotFound { .. } => libc::ENOENT,
            FsError::DirectoryFull { .. } => libc::ENOSPC,
            FsError::AlreadyExists(_) => libc::EEXIST,
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::IsADirectory(_) => libc::EISDIR,
            FsError::OutOfInodes { .. } => libc::ENOSPC,
            FsError::OutOfBlocks { .. } => libc::ENOSPC,
            FsError::CannotDeleteRoot => libc::EBUSY,
            FsError::ReadOutOfBounds { .. } => libc::EINVAL,
            FsError::BrokenInvariant(_) => libc::EIO,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        FsError::InvalidPath {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
