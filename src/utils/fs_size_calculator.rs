//! This module contains functions to calculate the size and position of different fs components

use crate::fs::{BLOCK_SIZE, BLOCKS_PER_INODE, INODE_SIZE, SUPERBLOCK_SIZE};

/// calculate how many inodes an image with `block_total` blocks gets
/// # Arguments
/// - `block_total`: the number of data blocks
/// # Return
/// one inode per [BLOCKS_PER_INODE] blocks, never less than 1 (the root)
/// # Example
/// ```
/// use imagefs::utils::fs_size_calculator::inode_total;
/// assert_eq!(inode_total(1000), 100);
/// assert_eq!(inode_total(5), 1);
/// ```
pub const fn inode_total(block_total: u32) -> u32 {
    let inodes = block_total / BLOCKS_PER_INODE;
    if inodes == 0 {
        1
    } else {
        inodes
    }
}

/// calculate the size of the inode table
/// # Example
/// ```
/// use imagefs::utils::fs_size_calculator::inode_table_size;
/// assert_eq!(inode_table_size(100), 100 * 128);
/// ```
pub const fn inode_table_size(inode_total: u32) -> u64 {
    inode_total as u64 * INODE_SIZE as u64
}

/// calculate the size of the data block store
/// # Example
/// ```
/// use imagefs::utils::fs_size_calculator::data_table_size;
/// assert_eq!(data_table_size(1000), 512_000);
/// ```
pub const fn data_table_size(block_total: u32) -> u64 {
    block_total as u64 * BLOCK_SIZE as u64
}

/// calculate the size of a whole image
/// # Example
/// ```
/// use imagefs::utils::fs_size_calculator::image_size;
/// assert_eq!(image_size(1000, 100), 64 + 100 * 128 + 1000 * 512);
/// ```
pub const fn image_size(block_total: u32, inode_total: u32) -> u64 {
    SUPERBLOCK_SIZE as u64 + inode_table_size(inode_total) + data_table_size(block_total)
}

/// byte offset of inode `index` in the image
pub const fn inode_offset(index: u32) -> u64 {
    SUPERBLOCK_SIZE as u64 + index as u64 * INODE_SIZE as u64
}

/// byte offset of data block `index` in the image
pub const fn data_block_offset(inode_total: u32, index: u32) -> u64 {
    SUPERBLOCK_SIZE as u64 + inode_table_size(inode_total) + index as u64 * BLOCK_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_contiguous() {
        let inodes = inode_total(2048);
        assert_eq!(inodes, 204);
        assert_eq!(inode_offset(0), SUPERBLOCK_SIZE as u64);
        assert_eq!(inode_offset(1) - inode_offset(0), INODE_SIZE as u64);
        // the block store starts right after the last inode
        assert_eq!(data_block_offset(inodes, 0), inode_offset(inodes));
        assert_eq!(
            data_block_offset(inodes, 2048),
            image_size(2048, inodes),
            "one past the last block is the end of the image"
        );
    }
}
