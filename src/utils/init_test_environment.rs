use tempfile::TempDir;

use crate::{fs::ImageFs, mkfs::mkfs};

/// format a scratch image with `block_count` blocks inside a fresh temporary directory
///
/// Keep the returned directory alive for as long as the filesystem is used.
pub fn init_test_environment(block_count: u32) -> (TempDir, ImageFs) {
    let dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let fs = mkfs(dir.path().join("test.img"), block_count).expect("Failed to format image");
    (dir, fs)
}
