//! path resolution and the directory tree
//!
//! A directory lists its children in the inline slots starting at
//! [FIRST_CHILD_SLOT], in insertion order and packed from the front: the
//! first empty slot terminates the list.
use log::debug;

use crate::{
    error::{FsError, Result},
    utils::path::{split_path, Components},
};

use super::{block_chain, ImageFs, Inode, Slot, FIRST_CHILD_SLOT, INLINE_SLOTS, ROOT_INODE};

/// the number of children a directory can hold
pub const DIRECTORY_CAPACITY: usize = INLINE_SLOTS - FIRST_CHILD_SLOT;

impl ImageFs {
    /// resolve an absolute path to its inode index
    /// # Errors
    /// - [FsError::InvalidPath] if `path` is malformed
    /// - [FsError::PathNotFound] naming the first missing segment
    /// - [FsError::NotADirectory] if an intermediate segment is a regular file
    pub fn resolve(&self, path: &str) -> Result<u32> {
        let components = split_path(path)?;
        self.resolve_components(path, &components)
    }

    /// walk `components` down from the root, `path` is only used for error messages
    pub(super) fn resolve_components(&self, path: &str, components: &Components<'_>) -> Result<u32> {
        let mut current = ROOT_INODE;
        for (depth, segment) in components.iter().enumerate() {
            if !self.inode(current)?.is_dir() {
                return Err(FsError::NotADirectory(format!(
                    "/{}",
                    components[..depth].join("/")
                )));
            }
            current = self
                .lookup_child(current, segment)?
                .ok_or_else(|| FsError::PathNotFound {
                    segment: segment.to_string(),
                    path: path.to_string(),
                })?;
        }
        Ok(current)
    }

    /// find the child of directory `dir` called `name`
    pub(super) fn lookup_child(&self, dir: u32, name: &str) -> Result<Option<u32>> {
        let dir = self.inode(dir)?;
        Ok(dir.children().find(|child| {
            self.inodes
                .get(*child as usize)
                .is_some_and(|inode| inode.valid && inode.name_matches(name))
        }))
    }

    /// link `child` into the first free child slot of directory `dir`
    /// # Errors
    /// [FsError::DirectoryFull] if every child slot is taken
    pub(super) fn insert_child(&mut self, dir: u32, child: u32) -> Result<()> {
        self.inode(dir)?;
        let dir_inode = self.inode_mut(dir);
        insert_slot(&mut dir_inode.slots[FIRST_CHILD_SLOT..], child)?;
        dir_inode.update_modified_at();
        debug!("linked inode {child} into directory {dir}");
        Ok(())
    }

    /// unlink `child` from directory `dir`, the later children move one slot forward
    /// # Errors
    /// [FsError::BrokenInvariant] if `dir` does not list `child`
    pub(super) fn remove_child(&mut self, dir: u32, child: u32) -> Result<()> {
        self.inode(dir)?;
        let dir_inode = self.inode_mut(dir);
        if !remove_slot(&mut dir_inode.slots[FIRST_CHILD_SLOT..], child) {
            return Err(FsError::BrokenInvariant(format!(
                "inode {child} is not a child of directory {dir}"
            )));
        }
        dir_inode.update_modified_at();
        debug!("unlinked inode {child} from directory {dir}");
        Ok(())
    }

    /// delete an inode and everything below it, releasing their inodes and blocks
    /// # Errors
    /// [FsError::CannotDeleteRoot] if `index` is the root directory
    pub(super) fn delete_subtree(&mut self, index: u32) -> Result<()> {
        let inode = self.inode(index)?;
        if inode.is_root() {
            return Err(FsError::CannotDeleteRoot);
        }
        let parent = inode.parent().ok_or_else(|| {
            FsError::BrokenInvariant(format!("inode {index} has no parent"))
        })?;
        self.remove_child(parent, index)?;
        self.release_detached(index, 0)
    }

    /// release an inode that is no longer linked into the tree, then its children
    fn release_detached(&mut self, index: u32, depth: u32) -> Result<()> {
        if depth > self.superblock.inode_total {
            return Err(FsError::BrokenInvariant(format!(
                "directory tree below inode {index} is deeper than the inode table"
            )));
        }
        let inode = std::mem::take(self.inode_mut(index));
        self.bitmaps.release_inode(index);

        if inode.is_dir() {
            for child in inode.children() {
                self.release_detached(child, depth + 1)?;
            }
        } else {
            self.release_blocks(&inode)?;
        }
        debug!("released inode {index} ({})", inode.name());
        Ok(())
    }

    /// give every block of a regular file back to the allocator
    fn release_blocks(&mut self, inode: &Inode) -> Result<()> {
        for block in block_chain(inode, &self.blocks)? {
            self.block_mut(block).reset();
            self.bitmaps.release_block(block);
        }
        Ok(())
    }
}

/// store `child` in the first empty slot
fn insert_slot(slots: &mut [Slot], child: u32) -> Result<()> {
    let capacity = slots.len();
    let free = slots
        .iter_mut()
        .find(|slot| slot.is_empty())
        .ok_or(FsError::DirectoryFull { capacity })?;
    *free = Slot::new(child);
    Ok(())
}

/// drop `child` from the packed slots and shift the rest left, returns whether it was there
fn remove_slot(slots: &mut [Slot], child: u32) -> bool {
    let used = slots.iter().take_while(|slot| !slot.is_empty()).count();
    let Some(position) = slots[..used].iter().position(|slot| slot.get() == Some(child)) else {
        return false;
    };
    slots[position..used].rotate_left(1);
    slots[used - 1] = Slot::EMPTY;
    true
}
