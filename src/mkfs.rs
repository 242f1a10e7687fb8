//! create our filesystem
use std::{fs::OpenOptions, path::Path};

use byte_unit::Byte;
use log::info;
use memmap2::MmapMut;

use crate::{
    error::Result,
    fs::{Bitmaps, DataBlock, ImageFs, Inode, SuperBlock, ROOT_INODE},
};

/// create a new filesystem,given the path of the image file and its block count
/// # Params
/// - `image_file_path`: the path of the image file, replaced if it exists
/// - `block_count`: the number of data blocks, the inode count is derived from it
///
/// # Return
/// the freshly formatted filesystem, already written to the image file
pub fn mkfs<P>(image_file_path: P, block_count: u32) -> Result<ImageFs>
where
    P: AsRef<Path>,
{
    let path = image_file_path.as_ref();
    let superblock = SuperBlock::new(block_count)?;
    let image_size = superblock.image_size();

    // open image file and prepare to write fs components
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    // all regions are zeroed by `set_len`, the records are written below
    file.set_len(image_size)?;
    // Safety
    // the file was just created by us and nobody else maps it
    let image = unsafe { MmapMut::map_mut(&file)? };

    let mut inodes = vec![Inode::default(); superblock.inode_total as usize];
    inodes[ROOT_INODE as usize] = Inode::new_root();
    let blocks = vec![DataBlock::default(); superblock.block_total as usize];
    let mut bitmaps = Bitmaps::new(superblock.inode_total, superblock.block_total);
    bitmaps.allocate_inode()?;

    info!(
        "formatting {} with {} blocks and {} inodes ({})",
        path.display(),
        superblock.block_total,
        superblock.inode_total,
        Byte::from_bytes(image_size as _).get_appropriate_unit(true)
    );
    let mut fs = ImageFs::from_parts(
        path.to_path_buf(),
        image,
        superblock,
        inodes,
        blocks,
        bitmaps,
    );
    fs.sync()?;
    Ok(fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fs::FileKind, FsError};

    #[test]
    fn test_mkfs() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_file = dir.path().join("new_fs.img");

        let fs = mkfs(&tmp_file, 2048).unwrap();

        // test if root inode "/" is created correctly
        let inode = fs.find_inode(ROOT_INODE).unwrap();
        assert_eq!(inode.file_kind, FileKind::Directory);
        assert!(inode.is_root());
        assert_eq!(inode.name(), "");
        assert!(fs.bitmaps().has_inode(ROOT_INODE));

        // test if superblock is created correctly
        let superblock = fs.superblock();
        assert_eq!(superblock.block_total, 2048);
        assert_eq!(superblock.inode_total, 204);
        assert_eq!(superblock.inode_free, 203);
        assert_eq!(superblock.block_free, 2048);
    }

    #[test]
    fn test_mkfs_replaces_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_file = dir.path().join("new_fs.img");
        std::fs::write(&tmp_file, b"not an image").unwrap();

        drop(mkfs(&tmp_file, 10).unwrap());
        let fs = ImageFs::load(&tmp_file).unwrap();
        assert_eq!(fs.superblock().block_total, 10);
        assert_eq!(fs.superblock().inode_total, 1);
    }

    #[test]
    fn test_mkfs_rejects_zero_blocks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            mkfs(dir.path().join("zero.img"), 0),
            Err(FsError::InvalidGeometry(_))
        ));
    }
}
