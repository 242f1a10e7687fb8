//! what does our filesystem look like in the memory

use std::{
    collections::BTreeSet,
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use log::{debug, error, info};
use memmap2::MmapMut;

use crate::{
    error::{FsError, Result},
    mkfs,
    utils::{fs_size_calculator, traits::Record},
};

use super::{
    Bitmaps, DataBlock, Inode, SuperBlock, DEFAULT_BLOCK_COUNT, ROOT_INODE, SUPERBLOCK_SIZE,
};

/// An open image. It has the following layout:
/// - superblock
/// - inode table
/// - data blocks
///
/// The tables live in memory and are the only copy mutated by operations.
/// Every successful mutating operation writes the records it touched back
/// into the memory-mapped image before returning; [ImageFs::sync] (and drop)
/// also flushes the mapping to disk.
#[derive(Debug)]
pub struct ImageFs {
    pub(super) superblock: SuperBlock,
    pub(super) inodes: Vec<Inode>,
    pub(super) blocks: Vec<DataBlock>,
    pub(super) bitmaps: Bitmaps,
    /// image file handle to operate underlying image file
    image: MmapMut,
    path: PathBuf,
    dirty_inodes: BTreeSet<u32>,
    dirty_blocks: BTreeSet<u32>,
}

impl ImageFs {
    /// load an existing image
    /// # Params
    /// - `image_path`: the path of the image file
    /// # Return
    /// the filesystem with its bitmaps rebuilt by a sweep from the root
    /// # Errors
    /// [FsError::CorruptImage] if the image is not ours, is truncated, or its
    /// tree points outside the tables
    pub fn load<P>(image_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = image_path.as_ref().to_path_buf();
        // open the "device" for read and write
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        if len < SUPERBLOCK_SIZE as u64 {
            return Err(FsError::CorruptImage(format!(
                "image holds {len} bytes, too short for a superblock"
            )));
        }

        // Safety
        // The mapping is only sound while no other process resizes or writes
        // the image, a single owner per image is a precondition of this type.
        let image = unsafe { MmapMut::map_mut(&file)? };

        let superblock = SuperBlock::read(&image)?;
        let expected = superblock.image_size();
        if (image.len() as u64) < expected {
            return Err(FsError::CorruptImage(format!(
                "image is truncated: {} bytes, expected {expected}",
                image.len()
            )));
        }

        let inodes = (0..superblock.inode_total)
            .map(|index| {
                let offset = fs_size_calculator::inode_offset(index) as usize;
                Inode::from_bytes(&image[offset..])
                    .map_err(|e| FsError::CorruptImage(format!("inode {index}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let blocks = (0..superblock.block_total)
            .map(|index| {
                let offset =
                    fs_size_calculator::data_block_offset(superblock.inode_total, index) as usize;
                DataBlock::from_bytes(&image[offset..])
                    .map_err(|e| FsError::CorruptImage(format!("data block {index}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let root = &inodes[ROOT_INODE as usize];
        if !(root.valid && root.is_root()) {
            return Err(FsError::CorruptImage(
                "inode 0 is not a root directory".to_string(),
            ));
        }
        let bitmaps = Bitmaps::rebuild(ROOT_INODE, &inodes, &blocks)?;

        info!(
            "loaded image {}: {} blocks ({} free), {} inodes ({} free)",
            path.display(),
            superblock.block_total,
            bitmaps.free_blocks(),
            superblock.inode_total,
            bitmaps.free_inodes()
        );
        Ok(ImageFs {
            superblock,
            inodes,
            blocks,
            bitmaps,
            image,
            path,
            dirty_inodes: BTreeSet::new(),
            dirty_blocks: BTreeSet::new(),
        })
    }

    /// load the image at `image_path`, or format a new one there if it does not exist
    ///
    /// A new image gets `block_count` blocks, [DEFAULT_BLOCK_COUNT] if not given.
    pub fn open_or_create<P>(image_path: P, block_count: Option<u32>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let image_path = image_path.as_ref();
        if image_path.exists() {
            Self::load(image_path)
        } else {
            mkfs::mkfs(image_path, block_count.unwrap_or(DEFAULT_BLOCK_COUNT))
        }
    }

    /// wrap freshly formatted tables, every record is considered dirty
    pub(crate) fn from_parts(
        path: PathBuf,
        image: MmapMut,
        superblock: SuperBlock,
        inodes: Vec<Inode>,
        blocks: Vec<DataBlock>,
        bitmaps: Bitmaps,
    ) -> Self {
        let dirty_inodes = (0..inodes.len() as u32).collect();
        let dirty_blocks = (0..blocks.len() as u32).collect();
        ImageFs {
            superblock,
            inodes,
            blocks,
            bitmaps,
            image,
            path,
            dirty_inodes,
            dirty_blocks,
        }
    }
}

/// get [SuperBlock]、[Bitmaps] and records of this filesystem
impl ImageFs {
    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn bitmaps(&self) -> &Bitmaps {
        &self.bitmaps
    }

    #[inline]
    pub fn image_path(&self) -> &Path {
        &self.path
    }

    /// a copy of an in-use inode
    pub fn find_inode(&self, index: u32) -> Result<Inode> {
        self.inode(index).cloned()
    }

    pub(super) fn inode(&self, index: u32) -> Result<&Inode> {
        match self.inodes.get(index as usize) {
            Some(inode) if inode.valid => Ok(inode),
            _ => Err(FsError::BrokenInvariant(format!(
                "inode {index} is referenced but not in use"
            ))),
        }
    }

    /// mutable access to an inode, which will be written back on the next persist
    pub(super) fn inode_mut(&mut self, index: u32) -> &mut Inode {
        self.dirty_inodes.insert(index);
        &mut self.inodes[index as usize]
    }

    /// mutable access to a data block, which will be written back on the next persist
    pub(super) fn block_mut(&mut self, index: u32) -> &mut DataBlock {
        self.dirty_blocks.insert(index);
        &mut self.blocks[index as usize]
    }
}

/// write the in-memory tables back to the image
impl ImageFs {
    /// encode the superblock and every record touched since the last persist
    /// into the mapped image
    pub(crate) fn persist(&mut self) -> Result<()> {
        self.superblock.block_free = self.bitmaps.free_blocks() as u32;
        self.superblock.inode_free = self.bitmaps.free_inodes() as u32;
        self.superblock.write(&mut self.image)?;

        let inode_total = self.superblock.inode_total;
        let dirty_inodes = std::mem::take(&mut self.dirty_inodes);
        let dirty_blocks = std::mem::take(&mut self.dirty_blocks);
        debug!(
            "persisting {} inode(s) and {} block(s)",
            dirty_inodes.len(),
            dirty_blocks.len()
        );
        for index in dirty_inodes {
            let offset = fs_size_calculator::inode_offset(index) as usize;
            self.inodes[index as usize].encode_into(&mut self.image[offset..])?;
        }
        for index in dirty_blocks {
            let offset = fs_size_calculator::data_block_offset(inode_total, index) as usize;
            self.blocks[index as usize].encode_into(&mut self.image[offset..])?;
        }
        Ok(())
    }

    /// persist, then flush the mapping to the image file
    pub fn sync(&mut self) -> Result<()> {
        self.persist()?;
        self.image.flush()?;
        info!("synced image {}", self.path.display());
        Ok(())
    }
}

impl Drop for ImageFs {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            error!("failed to sync image {}: {e}", self.path.display());
        }
    }
}
