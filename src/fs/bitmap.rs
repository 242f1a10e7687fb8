//! Free-space bitmaps over the inode table and the block store.
//!
//! The bitmaps are never persisted: they are derived at load time by a
//! reachability sweep from the root, so anything the tree does not reach is free.
use bitvec::prelude::*;
use log::{debug, warn};

use crate::error::{FsError, Result};

use super::{data_block::block_chain, DataBlock, Inode};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bitmaps {
    pub inode_bitmap: BitVec<u8, Lsb0>,
    pub block_bitmap: BitVec<u8, Lsb0>,
}

impl Bitmaps {
    /// all inodes and blocks free
    pub fn new(inode_total: u32, block_total: u32) -> Self {
        Bitmaps {
            inode_bitmap: BitVec::repeat(false, inode_total as usize),
            block_bitmap: BitVec::repeat(false, block_total as usize),
        }
    }

    /// clear both bitmaps, then mark everything reachable from `root`
    ///
    /// Directories contribute their children, regular files their inline
    /// blocks and the chain hanging off the last inline slot.
    /// # Errors
    /// [FsError::CorruptImage] if the tree points outside the tables, reaches
    /// an inode that is not in use, or reaches an inode or block twice
    pub fn rebuild(root: u32, inodes: &[Inode], blocks: &[DataBlock]) -> Result<Self> {
        let mut bitmaps = Bitmaps::new(inodes.len() as u32, blocks.len() as u32);
        let mut pending = vec![root];

        while let Some(index) = pending.pop() {
            let inode = inodes.get(index as usize).ok_or_else(|| {
                FsError::CorruptImage(format!(
                    "inode index {index} is outside a table of {} inodes",
                    inodes.len()
                ))
            })?;
            if !inode.valid {
                return Err(FsError::CorruptImage(format!(
                    "inode {index} is reachable but not in use"
                )));
            }
            if bitmaps.has_inode(index) {
                return Err(FsError::CorruptImage(format!(
                    "inode {index} is reachable twice"
                )));
            }
            bitmaps.occupy_inode(index);

            if inode.is_dir() {
                pending.extend(inode.children());
                continue;
            }
            for block in block_chain(inode, blocks)? {
                if bitmaps.has_block(block) {
                    return Err(FsError::CorruptImage(format!(
                        "block {block} is owned twice, last seen in inode {index}"
                    )));
                }
                bitmaps.occupy_block(block);
            }
        }

        let orphans = inodes
            .iter()
            .enumerate()
            .filter(|(index, inode)| inode.valid && !bitmaps.inode_bitmap[*index])
            .count();
        if orphans > 0 {
            warn!("{orphans} unreachable inode(s) found, they are treated as free");
        }
        debug!(
            "bitmap sweep: {} inode(s) and {} block(s) in use",
            bitmaps.inode_bitmap.count_ones(),
            bitmaps.block_bitmap.count_ones()
        );
        Ok(bitmaps)
    }
}

/// for inode and data block allocation
impl Bitmaps {
    /// check if inode is in use
    pub fn has_inode(&self, i: u32) -> bool {
        self.inode_bitmap.get(i as usize).as_deref().unwrap_or(&false) == &true
    }

    /// check if data block is in use
    pub fn has_block(&self, i: u32) -> bool {
        self.block_bitmap.get(i as usize).as_deref().unwrap_or(&false) == &true
    }

    /// calculate the number of free inodes
    pub fn free_inodes(&self) -> usize {
        self.inode_bitmap.count_zeros()
    }

    /// calculate the number of free data blocks
    pub fn free_blocks(&self) -> usize {
        self.block_bitmap.count_zeros()
    }

    /// allocate the lowest free inode
    pub fn allocate_inode(&mut self) -> Result<u32> {
        let index = self.inode_bitmap.first_zero().ok_or(FsError::OutOfInodes {
            total: self.inode_bitmap.len() as u32,
        })? as u32;
        self.occupy_inode(index);
        debug!("allocated inode {index}");
        Ok(index)
    }

    /// allocate the lowest free data block
    pub fn allocate_block(&mut self) -> Result<u32> {
        let blocks = self.allocate_blocks(1)?;
        Ok(blocks[0])
    }

    /// allocate the `count` lowest free data blocks, all or nothing
    /// # Errors
    /// [FsError::OutOfBlocks] with the shortfall; no bit is set in that case
    pub fn allocate_blocks(&mut self, count: usize) -> Result<Vec<u32>> {
        let blocks: Vec<u32> = self
            .block_bitmap
            .iter_zeros()
            .take(count)
            .map(|i| i as u32)
            .collect();
        if blocks.len() < count {
            return Err(FsError::OutOfBlocks {
                shortfall: count - blocks.len(),
            });
        }
        for block in &blocks {
            self.occupy_block(*block);
        }
        debug!("allocated blocks {blocks:?}");
        Ok(blocks)
    }

    /// release inode, the caller guarantees nothing references it any more
    pub fn release_inode(&mut self, index: u32) {
        self.inode_bitmap.set(index as usize, false);
    }

    /// release data block, the caller guarantees nothing references it any more
    pub fn release_block(&mut self, index: u32) {
        self.block_bitmap.set(index as usize, false);
    }

    fn occupy_inode(&mut self, i: u32) {
        self.inode_bitmap.set(i as usize, true);
    }

    fn occupy_block(&mut self, i: u32) {
        self.block_bitmap.set(i as usize, true);
    }
}
