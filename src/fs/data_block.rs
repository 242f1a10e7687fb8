use bincode::{Decode, Encode};

use crate::error::{FsError, Result};
use crate::utils::traits::Record;

use super::{inode::Inode, inode::Slot, BLOCK_SIZE};

/// bytes of payload a block can hold, the rest of the record is its header
pub const PAYLOAD_CAPACITY: usize = BLOCK_SIZE - 2 * std::mem::size_of::<u32>();

/// A data block: a payload plus the link that chains blocks together.
///
/// Only a full block may have a successor, so every block but the last of a
/// file is packed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DataBlock {
    /// successor in a linked-list chain
    pub next: Slot,
    /// bytes of `data` in use
    pub size: u32,
    pub data: [u8; PAYLOAD_CAPACITY],
}

impl Default for DataBlock {
    fn default() -> Self {
        DataBlock {
            next: Slot::EMPTY,
            size: 0,
            data: [0u8; PAYLOAD_CAPACITY],
        }
    }
}

impl Record for DataBlock {
    const SIZE: usize = BLOCK_SIZE;
    const NAME: &'static str = "data block";
}

impl DataBlock {
    /// the bytes of the payload in use
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    pub fn len(&self) -> usize {
        (self.size as usize).min(PAYLOAD_CAPACITY)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == PAYLOAD_CAPACITY
    }

    pub fn remaining(&self) -> usize {
        PAYLOAD_CAPACITY - self.len()
    }

    /// append as much of `bytes` as fits, returns how many were consumed
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let start = self.len();
        let amount = self.remaining().min(bytes.len());
        self.data[start..start + amount].copy_from_slice(&bytes[..amount]);
        self.size = (start + amount) as u32;
        amount
    }

    /// forget the payload and the successor so the block can be reused
    pub fn reset(&mut self) {
        *self = DataBlock::default();
    }
}

/// the data blocks of a regular file in content order: the inline slots,
/// then the chain hanging off the last inline slot
/// # Errors
/// - [FsError::CorruptImage] if an index points outside the block store
/// - [FsError::BrokenInvariant] if the chain is longer than the block store,
///   which means it loops
pub fn block_chain(inode: &Inode, blocks: &[DataBlock]) -> Result<Vec<u32>> {
    let mut chain: Vec<u32> = inode.inline_blocks().collect();
    for index in &chain {
        block_at(blocks, *index)?;
    }
    if !inode.inline_blocks_full() {
        return Ok(chain);
    }

    let mut next = chain
        .last()
        .map_or(Slot::EMPTY, |last| blocks[*last as usize].next);
    while let Some(index) = next.get() {
        if chain.len() >= blocks.len() {
            return Err(FsError::BrokenInvariant(format!(
                "block chain of {:?} is longer than the block store",
                inode.name()
            )));
        }
        next = block_at(blocks, index)?.next;
        chain.push(index);
    }
    Ok(chain)
}

fn block_at(blocks: &[DataBlock], index: u32) -> Result<&DataBlock> {
    blocks.get(index as usize).ok_or_else(|| {
        FsError::CorruptImage(format!(
            "block index {index} is outside a store of {} blocks",
            blocks.len()
        ))
    })
}
