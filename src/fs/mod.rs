//! our custom filesystem
pub mod bitmap;
pub mod data_block;
pub mod filekind;
pub mod fs_layout;
pub mod inode;
pub mod superblock;
mod directory;
mod file_handle;
mod fs_api_impl;
pub use bitmap::*;
pub use data_block::*;
pub use directory::DIRECTORY_CAPACITY;
pub use file_handle::*;
pub use filekind::*;
pub use fs_api_impl::*;
pub use fs_layout::*;
pub use inode::*;
pub use superblock::*;

pub const FS_MAGIC: u32 = 0x0023_3333;
/// nominal block size, also the size of a [DataBlock] record
pub const BLOCK_SIZE: usize = 512;
pub const SUPERBLOCK_SIZE: usize = 64;
pub const INODE_SIZE: usize = 128;
/// the root directory always lives in the first inode
pub const ROOT_INODE: u32 = 0;
/// length of an inode's inline index array
pub const INLINE_SLOTS: usize = 20;
/// first child slot of a directory, slot 0 is itself and slot 1 its parent
pub const FIRST_CHILD_SLOT: usize = 2;
/// first data slot of a regular file, slot 0 is its parent
pub const FIRST_DATA_SLOT: usize = 1;
pub const NAME_CAPACITY: usize = 32;
/// names are NUL terminated inside the name buffer
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;
/// one inode is reserved for every this many blocks
pub const BLOCKS_PER_INODE: u32 = 10;
pub const DEFAULT_BLOCK_COUNT: u32 = 2048;
pub const MAX_BLOCK_COUNT: u32 = 1 << 22;
