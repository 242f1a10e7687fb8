use std::fmt;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::utils::{time_util, traits::Record};

use super::{
    filekind::FileKind, FIRST_CHILD_SLOT, FIRST_DATA_SLOT, INLINE_SLOTS, INODE_SIZE,
    MAX_NAME_LEN, NAME_CAPACITY,
};

/// A nullable index stored in an inode's inline array or a block's `next` field.
///
/// Empty slots are stored as `u32::MAX` on disk, so index 0 stays a real
/// index in both the inode table and the block store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slot(Option<u32>);

impl Slot {
    pub const EMPTY: Slot = Slot(None);
    const NIL: u32 = u32::MAX;

    pub const fn new(index: u32) -> Self {
        Slot(Some(index))
    }

    pub const fn get(self) -> Option<u32> {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<u32>> for Slot {
    fn from(index: Option<u32>) -> Self {
        Slot(index)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, "{index}"),
            None => f.write_str("-"),
        }
    }
}

impl Encode for Slot {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> core::result::Result<(), EncodeError> {
        self.0.unwrap_or(Self::NIL).encode(encoder)
    }
}

impl<Context> Decode<Context> for Slot {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> core::result::Result<Self, DecodeError> {
        let raw = <u32 as Decode<Context>>::decode(decoder)?;
        Ok(if raw == Self::NIL { Slot::EMPTY } else { Slot::new(raw) })
    }
}
bincode::impl_borrow_decode!(Slot);

/// A directory or regular file.
///
/// The meaning of `slots` depends on the kind:
/// - directory: slot 0 is its own index, slot 1 its parent (empty for the
///   root), slots 2.. its children packed from the front
/// - regular file: slot 0 is its parent, slots 1.. its data blocks in order;
///   once all of them are used, the block in the last slot heads a chain
///   linked through each block's `next` field
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Inode {
    /// whether this inode is in use
    pub valid: bool,
    pub file_kind: FileKind,
    /// logical byte length, regular files only
    pub size: u32,
    /// NUL padded name
    pub name: [u8; NAME_CAPACITY],
    /// last modification, seconds since the unix epoch
    pub mtime: u32,
    pub slots: [Slot; INLINE_SLOTS],
}

impl Record for Inode {
    const SIZE: usize = INODE_SIZE;
    const NAME: &'static str = "inode";
}

impl Inode {
    /// the root directory "/", it is its own slot 0 and has no parent
    pub fn new_root() -> Self {
        let mut inode = Inode {
            valid: true,
            file_kind: FileKind::Directory,
            mtime: time_util::now(),
            ..Inode::default()
        };
        inode.slots[0] = Slot::new(super::ROOT_INODE);
        inode
    }

    pub fn new_directory(name: &str, index: u32, parent: u32) -> Self {
        let mut inode = Inode {
            valid: true,
            file_kind: FileKind::Directory,
            mtime: time_util::now(),
            ..Inode::default()
        };
        inode.set_name(name);
        inode.slots[0] = Slot::new(index);
        inode.slots[1] = Slot::new(parent);
        inode
    }

    pub fn new_file(name: &str, parent: u32) -> Self {
        let mut inode = Inode {
            valid: true,
            file_kind: FileKind::RegularFile,
            mtime: time_util::now(),
            ..Inode::default()
        };
        inode.set_name(name);
        inode.slots[0] = Slot::new(parent);
        inode
    }
}

/// This block is about file metadata
impl Inode {
    pub fn is_dir(&self) -> bool {
        self.file_kind == FileKind::Directory
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_kind == FileKind::RegularFile
    }

    /// only the root directory has an empty parent slot
    pub fn is_root(&self) -> bool {
        self.is_dir() && self.slots[1].is_empty()
    }

    pub fn parent(&self) -> Option<u32> {
        match self.file_kind {
            FileKind::Directory => self.slots[1].get(),
            FileKind::RegularFile => self.slots[0].get(),
        }
    }

    /// the name up to its NUL terminator
    pub fn name(&self) -> String {
        let len = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(NAME_CAPACITY);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }

    pub fn name_matches(&self, name: &str) -> bool {
        let bytes = name.as_bytes();
        bytes.len() <= MAX_NAME_LEN
            && self.name[..bytes.len()] == *bytes
            && self.name[bytes.len()] == 0
    }

    /// names are validated by the path layer, longer names are truncated
    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        self.name = [0u8; NAME_CAPACITY];
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn update_modified_at(&mut self) {
        self.mtime = time_util::now();
    }

    /// child inode indices of a directory in insertion order
    pub fn children(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots[FIRST_CHILD_SLOT..]
            .iter()
            .map_while(|slot| slot.get())
    }

    /// inline data block indices of a regular file in order
    pub fn inline_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots[FIRST_DATA_SLOT..]
            .iter()
            .map_while(|slot| slot.get())
    }

    /// whether every inline data slot is in use, the file may then continue
    /// in linked-list mode
    pub fn inline_blocks_full(&self) -> bool {
        !self.slots[INLINE_SLOTS - 1].is_empty()
    }
}
