use std::fmt;

use bincode::{Decode, Encode};

/// an enum to describe the type of an inode
#[derive(Encode, Decode, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// an regular file
    #[default]
    RegularFile,
    /// a directory
    Directory,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::RegularFile => f.pad("file"),
            FileKind::Directory => f.pad("dir"),
        }
    }
}
