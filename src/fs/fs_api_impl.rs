//! namespace operations on an open image
//!
//! Every mutating operation persists the records it touched before returning.
use std::time::SystemTime;

use log::info;

use crate::{
    error::{FsError, Result},
    utils::{
        path::{split_parent, split_path},
        time_util,
    },
};

use super::{
    FileHandle, FileKind, ImageFs, Inode, BLOCK_SIZE, MAX_NAME_LEN, PAYLOAD_CAPACITY, ROOT_INODE,
};

/// what `ls` and `stat` report about an inode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub index: u32,
    pub name: String,
    pub kind: FileKind,
    pub size: u32,
    pub mtime: u32,
}

impl DirEntry {
    fn new(index: u32, inode: &Inode) -> Self {
        DirEntry {
            index,
            name: inode.name(),
            kind: inode.file_kind,
            size: inode.size,
            mtime: inode.mtime,
        }
    }

    pub fn modified(&self) -> SystemTime {
        time_util::to_system_time(self.mtime)
    }
}

/// capacity and usage of the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub block_size: u32,
    /// bytes of file content one block holds
    pub payload_capacity: u32,
    pub block_total: u32,
    pub block_free: u32,
    pub inode_total: u32,
    pub inode_free: u32,
    pub max_name_len: u32,
}

impl ImageFs {
    /// create an empty directory
    /// # Return
    /// the inode index of the new directory
    /// # Errors
    /// - [FsError::AlreadyExists] if the parent already has an entry with that name
    /// - [FsError::DirectoryFull] if the parent has no free child slot
    /// - [FsError::OutOfInodes] if the inode table is exhausted
    pub fn mkdir(&mut self, path: &str) -> Result<u32> {
        self.create(path, FileKind::Directory)
    }

    /// create an empty regular file, errors are the same as [ImageFs::mkdir]
    pub fn create_file(&mut self, path: &str) -> Result<u32> {
        self.create(path, FileKind::RegularFile)
    }

    fn create(&mut self, path: &str, kind: FileKind) -> Result<u32> {
        let (parent_components, name) = split_parent(path)?;
        let parent = self.resolve_components(path, &parent_components)?;
        if !self.inode(parent)?.is_dir() {
            return Err(FsError::NotADirectory(format!(
                "/{}",
                parent_components.join("/")
            )));
        }
        if self.lookup_child(parent, name)?.is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }

        let index = self.bitmaps.allocate_inode()?;
        if let Err(e) = self.insert_child(parent, index) {
            self.bitmaps.release_inode(index);
            return Err(e);
        }
        *self.inode_mut(index) = match kind {
            FileKind::Directory => Inode::new_directory(name, index, parent),
            FileKind::RegularFile => Inode::new_file(name, parent),
        };
        self.persist()?;
        info!("created {kind} {path} at inode {index}");
        Ok(index)
    }

    /// delete a directory together with everything below it
    /// # Errors
    /// - [FsError::CannotDeleteRoot] for "/"
    /// - [FsError::NotADirectory] if `path` is a regular file
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if split_path(path)?.is_empty() {
            return Err(FsError::CannotDeleteRoot);
        }
        let index = self.resolve(path)?;
        if !self.inode(index)?.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        self.delete_subtree(index)?;
        self.persist()?;
        info!("removed directory {path}");
        Ok(())
    }

    /// delete a regular file and release its blocks
    /// # Errors
    /// - [FsError::CannotDeleteRoot] for "/"
    /// - [FsError::IsADirectory] if `path` is a directory
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        if split_path(path)?.is_empty() {
            return Err(FsError::CannotDeleteRoot);
        }
        let index = self.resolve(path)?;
        if self.inode(index)?.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        self.delete_subtree(index)?;
        self.persist()?;
        info!("removed file {path}");
        Ok(())
    }

    /// open a regular file with its cursor at the start
    pub fn open(&mut self, path: &str) -> Result<FileHandle<'_>> {
        let index = self.resolve(path)?;
        if self.inode(index)?.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        Ok(FileHandle::new(self, index))
    }

    /// the entries of a directory in the order they were created
    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let index = self.resolve(path)?;
        let dir = self.inode(index)?;
        if !dir.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        dir.children()
            .map(|child| Ok(DirEntry::new(child, self.inode(child)?)))
            .collect()
    }

    pub fn stat(&self, path: &str) -> Result<DirEntry> {
        let index = self.resolve(path)?;
        Ok(DirEntry::new(index, self.inode(index)?))
    }

    pub fn statfs(&self) -> FsStats {
        FsStats {
            block_size: BLOCK_SIZE as u32,
            payload_capacity: PAYLOAD_CAPACITY as u32,
            block_total: self.superblock.block_total,
            block_free: self.bitmaps.free_blocks() as u32,
            inode_total: self.superblock.inode_total,
            inode_free: self.bitmaps.free_inodes() as u32,
            max_name_len: MAX_NAME_LEN as u32,
        }
    }

    /// the root directory entry
    pub fn root(&self) -> Result<DirEntry> {
        Ok(DirEntry::new(ROOT_INODE, self.inode(ROOT_INODE)?))
    }
}
