//! reading and appending regular files
//!
//! Content is stored in the blocks listed by the inode's data slots and, once
//! those are exhausted, in the chain hanging off the last slot. Writes only
//! ever append: the tail block is topped up first, then fresh blocks follow.
use log::debug;

use crate::error::{FsError, Result};

use super::{block_chain, ImageFs, Slot, FIRST_DATA_SLOT, PAYLOAD_CAPACITY};

/// An open regular file with its own cursor.
///
/// The handle borrows the filesystem mutably, so at most one handle is alive
/// at a time and every write is persisted before the next call.
#[derive(Debug)]
pub struct FileHandle<'fs> {
    fs: &'fs mut ImageFs,
    inode: u32,
    cursor: u64,
}

impl<'fs> FileHandle<'fs> {
    pub(super) fn new(fs: &'fs mut ImageFs, inode: u32) -> Self {
        FileHandle {
            fs,
            inode,
            cursor: 0,
        }
    }

    /// the inode index of the file
    pub fn inode(&self) -> u32 {
        self.inode
    }

    /// move the cursor, reads start from it
    pub fn seek(&mut self, position: u64) {
        self.cursor = position;
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// logical length of the file in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.fs.inode(self.inode)?.size as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// read exactly `size` bytes at the cursor and move the cursor past them
    /// # Errors
    /// [FsError::ReadOutOfBounds] if the file ends before `cursor + size`
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let bytes = self.fs.read_at(self.inode, self.cursor, size)?;
        self.cursor += size as u64;
        Ok(bytes)
    }

    /// read from the cursor to the end of the file
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let size = self.len()?.saturating_sub(self.cursor) as usize;
        self.read(size)
    }

    /// append `data` after the current content, wherever the cursor is
    /// # Return
    /// the number of bytes appended, always `data.len()`
    /// # Errors
    /// [FsError::OutOfBlocks] if the store cannot hold `data`, the file is
    /// left untouched in that case
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let written = self.fs.append(self.inode, data)?;
        self.fs.persist()?;
        Ok(written)
    }
}

/// block-level file I/O
impl ImageFs {
    /// read `size` bytes of regular file `index` starting at `offset`
    pub(super) fn read_at(&self, index: u32, offset: u64, size: usize) -> Result<Vec<u8>> {
        let inode = self.inode(index)?;
        if inode.is_dir() {
            return Err(FsError::IsADirectory(inode.name()));
        }
        let in_bounds = offset
            .checked_add(size as u64)
            .is_some_and(|end| end <= inode.size as u64);
        if !in_bounds {
            return Err(FsError::ReadOutOfBounds {
                offset,
                len: size,
                size: inode.size,
            });
        }

        let mut buf = Vec::with_capacity(size);
        let mut block_start = 0u64;
        for block in block_chain(inode, &self.blocks)? {
            if buf.len() == size {
                break;
            }
            let payload = self.blocks[block as usize].payload();
            let block_end = block_start + payload.len() as u64;
            let position = offset + buf.len() as u64;
            if position < block_end {
                let from = (position - block_start) as usize;
                let amount = (payload.len() - from).min(size - buf.len());
                buf.extend_from_slice(&payload[from..from + amount]);
            }
            block_start = block_end;
        }

        if buf.len() != size {
            return Err(FsError::BrokenInvariant(format!(
                "inode {index} claims {} bytes but its blocks hold {block_start}",
                inode.size
            )));
        }
        debug!("read {size} bytes at offset {offset} of inode {index}");
        Ok(buf)
    }

    /// append `data` to regular file `index`
    ///
    /// Every new block is reserved before anything is modified, so a failed
    /// allocation leaves both the bitmap and the file as they were.
    pub(super) fn append(&mut self, index: u32, data: &[u8]) -> Result<usize> {
        let inode = self.inode(index)?;
        if inode.is_dir() {
            return Err(FsError::IsADirectory(inode.name()));
        }
        if data.is_empty() {
            return Ok(0);
        }

        let tail = block_chain(inode, &self.blocks)?.last().copied();
        let top_up = tail.map_or(0, |tail| self.blocks[tail as usize].remaining().min(data.len()));
        let needed = (data.len() - top_up).div_ceil(PAYLOAD_CAPACITY);
        let new_blocks = self.bitmaps.allocate_blocks(needed)?;

        if let Some(tail) = tail {
            self.block_mut(tail).fill(&data[..top_up]);
        }
        let mut rest = &data[top_up..];
        let mut last = tail;
        for block in new_blocks {
            self.block_mut(block).reset();
            self.link_block(index, last, block)?;
            let consumed = self.block_mut(block).fill(rest);
            rest = &rest[consumed..];
            last = Some(block);
        }

        let inode = self.inode_mut(index);
        inode.size += data.len() as u32;
        inode.update_modified_at();
        debug!(
            "appended {} bytes to inode {index} ({top_up} into the tail block, {needed} new block(s))",
            data.len()
        );
        Ok(data.len())
    }

    /// put `block` after `last` in file `index`: into the next free data slot,
    /// or at the end of the chain once the slots are exhausted
    fn link_block(&mut self, index: u32, last: Option<u32>, block: u32) -> Result<()> {
        let inode = self.inode_mut(index);
        if let Some(free) = inode.slots[FIRST_DATA_SLOT..]
            .iter_mut()
            .find(|slot| slot.is_empty())
        {
            *free = Slot::new(block);
            return Ok(());
        }
        let last = last.ok_or_else(|| {
            FsError::BrokenInvariant(format!("inode {index} has full data slots but no blocks"))
        })?;
        self.block_mut(last).next = Slot::new(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fs::INLINE_SLOTS, utils::init_test_environment::init_test_environment};

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_two_block_round_trip() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/f.txt").unwrap();
        let data = pattern(PAYLOAD_CAPACITY + 100);

        let mut handle = fs.open("/f.txt").unwrap();
        assert_eq!(handle.write(&data).unwrap(), data.len());
        handle.seek(0);
        assert_eq!(handle.read(data.len()).unwrap(), data);
        assert_eq!(handle.position(), data.len() as u64);

        let inode = fs.find_inode(fs.resolve("/f.txt").unwrap()).unwrap();
        assert_eq!(inode.inline_blocks().count(), 2);
        assert_eq!(inode.size as usize, data.len());
    }

    #[test]
    fn test_linked_list_overflow_round_trip() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/big").unwrap();
        let data = pattern(PAYLOAD_CAPACITY * (INLINE_SLOTS + 3) + 17);

        let mut handle = fs.open("/big").unwrap();
        handle.write(&data).unwrap();
        handle.seek(0);
        assert_eq!(handle.read_to_end().unwrap(), data);

        let index = fs.resolve("/big").unwrap();
        let inode = fs.find_inode(index).unwrap();
        assert!(inode.inline_blocks_full());
        let chain = block_chain(&inode, &fs.blocks).unwrap();
        assert_eq!(chain.len(), INLINE_SLOTS - 1 + 5);
        // every block but the last is packed
        for block in &chain[..chain.len() - 1] {
            assert!(fs.blocks[*block as usize].is_full());
        }
    }

    #[test]
    fn test_small_appends_top_up_the_tail() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/log").unwrap();
        let mut expected = Vec::new();
        {
            let mut handle = fs.open("/log").unwrap();
            for i in 0..300u32 {
                let line = format!("line {i}\n");
                handle.write(line.as_bytes()).unwrap();
                expected.extend_from_slice(line.as_bytes());
            }
            handle.seek(100);
            assert_eq!(handle.read(50).unwrap(), &expected[100..150]);
            assert_eq!(handle.read_to_end().unwrap(), &expected[150..]);
        }
        let blocks_used = 100 - fs.bitmaps().free_blocks();
        assert_eq!(blocks_used, expected.len().div_ceil(PAYLOAD_CAPACITY));
    }

    #[test]
    fn test_appends_continue_an_existing_chain() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/f").unwrap();
        let first = pattern(PAYLOAD_CAPACITY * INLINE_SLOTS);
        let second = pattern(PAYLOAD_CAPACITY * 2 + 3);
        let mut handle = fs.open("/f").unwrap();
        handle.write(&first).unwrap();
        handle.write(&second).unwrap();
        assert_eq!(handle.read_to_end().unwrap(), [first, second].concat());
    }

    #[test]
    fn test_appends_top_up_a_partial_chain_tail() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/f").unwrap();
        let first = pattern(PAYLOAD_CAPACITY * (INLINE_SLOTS + 1) + 3);
        let second = pattern(1000);
        {
            let mut handle = fs.open("/f").unwrap();
            handle.write(&first).unwrap();
            handle.write(&second).unwrap();
            assert_eq!(handle.read_to_end().unwrap(), [first, second].concat());
        }

        let inode = fs.find_inode(fs.resolve("/f").unwrap()).unwrap();
        let chain = block_chain(&inode, &fs.blocks).unwrap();
        assert_eq!(chain.len(), 23);
        let (last, packed) = chain.split_last().unwrap();
        for block in packed {
            assert!(fs.blocks[*block as usize].is_full());
        }
        assert!(fs.blocks[*last as usize].next.is_empty());
        assert_eq!(inode.size as usize, PAYLOAD_CAPACITY * (INLINE_SLOTS + 1) + 1003);
    }

    #[test]
    fn test_read_past_end_fails() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/f").unwrap();
        let mut handle = fs.open("/f").unwrap();
        handle.write(b"hello").unwrap();
        handle.seek(3);
        assert!(matches!(
            handle.read(3),
            Err(FsError::ReadOutOfBounds {
                offset: 3,
                len: 3,
                size: 5
            })
        ));
        assert_eq!(handle.read(2).unwrap(), b"lo");
        assert!(handle.read(0).unwrap().is_empty());
    }

    #[test]
    fn test_read_at_the_end_of_the_offset_range_fails() {
        let (_dir, mut fs) = init_test_environment(100);
        fs.create_file("/f").unwrap();
        let mut handle = fs.open("/f").unwrap();
        handle.write(b"hello").unwrap();
        handle.seek(u64::MAX);
        assert!(matches!(
            handle.read(2),
            Err(FsError::ReadOutOfBounds {
                offset: u64::MAX,
                len: 2,
                size: 5
            })
        ));
        assert_eq!(handle.position(), u64::MAX);
    }

    #[test]
    fn test_out_of_blocks_leaves_file_untouched() {
        let (_dir, mut fs) = init_test_environment(20);
        fs.create_file("/f").unwrap();
        let before = fs.bitmaps().clone();
        {
            let mut handle = fs.open("/f").unwrap();
            assert!(matches!(
                handle.write(&pattern(PAYLOAD_CAPACITY * 22)),
                Err(FsError::OutOfBlocks { shortfall: 2 })
            ));
            assert_eq!(handle.len().unwrap(), 0);
        }
        assert_eq!(fs.bitmaps(), &before);
    }
}
