use bincode::{Decode, Encode};

use crate::error::{FsError, Result};
use crate::utils::{fs_size_calculator, traits::Record};

use super::{FS_MAGIC, MAX_BLOCK_COUNT, SUPERBLOCK_SIZE};

/// The superblock of this filesystem
///
/// Written at format time and refreshed on every persist step. The free
/// counters are advisory: the bitmap sweep at load time is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SuperBlock {
    /// magic number, identifies an image as ours
    pub magic: u32,
    /// data block count
    pub block_total: u32,
    pub block_free: u32,
    /// inode count, root included
    pub inode_total: u32,
    pub inode_free: u32,
}

impl SuperBlock {
    /// superblock for a fresh image with `block_total` blocks and only the root inode in use
    /// # Errors
    /// [FsError::InvalidGeometry] if `block_total` is zero or larger than [MAX_BLOCK_COUNT]
    pub fn new(block_total: u32) -> Result<Self> {
        if block_total == 0 || block_total > MAX_BLOCK_COUNT {
            return Err(FsError::InvalidGeometry(format!(
                "block count must be between 1 and {MAX_BLOCK_COUNT}, got {block_total}"
            )));
        }
        let inode_total = fs_size_calculator::inode_total(block_total);
        Ok(SuperBlock {
            magic: FS_MAGIC,
            block_total,
            block_free: block_total,
            inode_total,
            inode_free: inode_total - 1,
        })
    }

    /// size of the image this superblock describes
    pub fn image_size(&self) -> u64 {
        fs_size_calculator::image_size(self.block_total, self.inode_total)
    }

    /// read the superblock from the start of an image
    /// # Errors
    /// [FsError::CorruptImage] if the image is too short, the magic number does
    /// not match, or the geometry is impossible
    pub fn read(image: &[u8]) -> Result<Self> {
        if image.len() < Self::SIZE {
            return Err(FsError::CorruptImage(format!(
                "image holds {} bytes, too short for a superblock",
                image.len()
            )));
        }
        let superblock = Self::from_bytes(image)?;
        if superblock.magic != FS_MAGIC {
            return Err(FsError::CorruptImage(format!(
                "magic number not match! unrecognizable superblock! expected: {:#x}, however got: {:#x}",
                FS_MAGIC, superblock.magic
            )));
        }
        if superblock.block_total == 0
            || superblock.block_total > MAX_BLOCK_COUNT
            || superblock.inode_total == 0
        {
            return Err(FsError::CorruptImage(format!(
                "impossible geometry: {} blocks, {} inodes",
                superblock.block_total, superblock.inode_total
            )));
        }
        Ok(superblock)
    }

    /// write the superblock to the start of an image, no validation
    pub fn write(&self, image: &mut [u8]) -> Result<()> {
        self.encode_into(image)
    }
}

impl Record for SuperBlock {
    const SIZE: usize = SUPERBLOCK_SIZE;
    const NAME: &'static str = "superblock";
}
