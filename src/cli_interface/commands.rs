//! run one parsed subcommand against an image
use std::{io::Write, path::Path};

use anyhow::{bail, Context};
use byte_unit::Byte;

use crate::{
    fs::{DirEntry, FileKind, ImageFs},
    mkfs::mkfs,
};

use super::ImageFsCli;

/// execute `command`, printing its output to `out`
pub fn run<W: Write>(command: ImageFsCli, out: &mut W) -> anyhow::Result<()> {
    match command {
        ImageFsCli::Mkfs(args) => {
            let path = Path::new(&args.image_file_path);
            if path.exists() && !args.force {
                bail!(
                    "{} already exists, pass --force to replace it",
                    path.display()
                );
            }
            let fs = mkfs(path, args.blocks)
                .with_context(|| format!("failed to format {}", path.display()))?;
            let superblock = fs.superblock();
            writeln!(
                out,
                "formatted {}: {} blocks, {} inodes, {}",
                path.display(),
                superblock.block_total,
                superblock.inode_total,
                Byte::from_bytes(superblock.image_size() as _).get_appropriate_unit(true)
            )?;
        }
        ImageFsCli::Info(args) => {
            let fs = load(&args.image_file_path)?;
            let stats = fs.statfs();
            let used = (stats.block_total - stats.block_free) as u64 * stats.payload_capacity as u64;
            writeln!(out, "image:       {}", fs.image_path().display())?;
            writeln!(
                out,
                "image size:  {}",
                Byte::from_bytes(fs.superblock().image_size() as _).get_appropriate_unit(true)
            )?;
            writeln!(
                out,
                "block size:  {} ({} bytes of content)",
                stats.block_size, stats.payload_capacity
            )?;
            writeln!(out, "blocks:      {} free of {}", stats.block_free, stats.block_total)?;
            writeln!(out, "inodes:      {} free of {}", stats.inode_free, stats.inode_total)?;
            writeln!(
                out,
                "in use:      {}",
                Byte::from_bytes(used as _).get_appropriate_unit(true)
            )?;
        }
        ImageFsCli::Ls(args) => {
            let fs = load(&args.image_file_path)?;
            let entry = fs.stat(&args.path)?;
            if entry.kind == FileKind::Directory {
                for child in fs.list_dir(&args.path)? {
                    print_entry(out, &child)?;
                }
            } else {
                print_entry(out, &entry)?;
            }
        }
        ImageFsCli::Mkdir(args) => {
            load(&args.image_file_path)?.mkdir(&args.path)?;
        }
        ImageFsCli::Rmdir(args) => {
            load(&args.image_file_path)?.rmdir(&args.path)?;
        }
        ImageFsCli::Touch(args) => {
            load(&args.image_file_path)?.create_file(&args.path)?;
        }
        ImageFsCli::Rm(args) => {
            load(&args.image_file_path)?.delete_file(&args.path)?;
        }
        ImageFsCli::Cat(args) => {
            let mut fs = load(&args.image_file_path)?;
            let content = fs.open(&args.path)?.read_to_end()?;
            out.write_all(&content)?;
        }
        ImageFsCli::Append(args) => {
            let mut fs = load(&args.image_file_path)?;
            fs.open(&args.path)?.write(args.text.as_bytes())?;
        }
        ImageFsCli::Import(args) => {
            let content = std::fs::read(&args.host_src)
                .with_context(|| format!("failed to read host file {}", args.host_src))?;
            let mut fs = load(&args.image_file_path)?;
            fs.create_file(&args.dest)?;
            fs.open(&args.dest)?.write(&content)?;
            writeln!(out, "imported {} bytes into {}", content.len(), args.dest)?;
        }
        ImageFsCli::Export(args) => {
            let mut fs = load(&args.image_file_path)?;
            let content = fs.open(&args.src)?.read_to_end()?;
            std::fs::write(&args.host_dest, &content)
                .with_context(|| format!("failed to write host file {}", args.host_dest))?;
            writeln!(out, "exported {} bytes to {}", content.len(), args.host_dest)?;
        }
    }
    Ok(())
}

fn load(image_file_path: &str) -> anyhow::Result<ImageFs> {
    ImageFs::load(image_file_path).with_context(|| format!("failed to open image {image_file_path}"))
}

fn print_entry<W: Write>(out: &mut W, entry: &DirEntry) -> anyhow::Result<()> {
    let suffix = if entry.kind == FileKind::Directory { "/" } else { "" };
    writeln!(
        out,
        "{:>5} {:<4} {:>10} {:>10} {}{suffix}",
        entry.index, entry.kind, entry.size, entry.mtime, entry.name
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::FsError;

    fn exec(args: &[&str]) -> anyhow::Result<String> {
        let command = ImageFsCli::try_parse_from(std::iter::once("imagefs").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_shell_session() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cli.img");
        let image = image.to_str().unwrap();

        let output = exec(&["mkfs", "-p", image, "-b", "500"]).unwrap();
        assert!(output.contains("500 blocks, 50 inodes"));
        exec(&["mkdir", "-p", image, "/docs"]).unwrap();
        exec(&["touch", "-p", image, "/docs/todo"]).unwrap();
        exec(&["append", "-p", image, "/docs/todo", "buy milk\n"]).unwrap();
        exec(&["append", "-p", image, "/docs/todo", "fix bike\n"]).unwrap();

        assert_eq!(
            exec(&["cat", "-p", image, "/docs/todo"]).unwrap(),
            "buy milk\nfix bike\n"
        );
        let listing = exec(&["ls", "-p", image, "/"]).unwrap();
        assert!(listing.contains("docs/"));
        let listing = exec(&["ls", "-p", image, "/docs/todo"]).unwrap();
        assert!(listing.contains("todo"));
        assert!(listing.contains("18"));

        exec(&["rm", "-p", image, "/docs/todo"]).unwrap();
        exec(&["rmdir", "-p", image, "/docs"]).unwrap();
        assert_eq!(exec(&["ls", "-p", image, "/"]).unwrap(), "");
        let info = exec(&["info", "-p", image]).unwrap();
        assert!(info.contains("500 free of 500"));
        assert!(info.contains("49 free of 50"));
    }

    #[test]
    fn test_mkfs_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cli.img");
        let image = image.to_str().unwrap();
        exec(&["mkfs", "-p", image, "-b", "100"]).unwrap();
        exec(&["touch", "-p", image, "/f"]).unwrap();

        assert!(exec(&["mkfs", "-p", image, "-b", "100"]).is_err());
        assert!(exec(&["ls", "-p", image, "/f"]).is_ok());
        exec(&["mkfs", "-p", image, "-b", "100", "--force"]).unwrap();
        assert!(exec(&["ls", "-p", image, "/f"]).is_err());
    }

    #[test]
    fn test_import_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cli.img");
        let image = image.to_str().unwrap();
        let host_src = dir.path().join("src.bin");
        let host_dest = dir.path().join("dest.bin");
        let content: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 256) as u8).collect();
        std::fs::write(&host_src, &content).unwrap();

        exec(&["mkfs", "-p", image, "-b", "200"]).unwrap();
        exec(&["import", "-p", image, host_src.to_str().unwrap(), "/blob"]).unwrap();
        exec(&["export", "-p", image, "/blob", host_dest.to_str().unwrap()]).unwrap();
        assert_eq!(std::fs::read(&host_dest).unwrap(), content);
    }

    #[test]
    fn test_errors_keep_their_kind() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cli.img");
        let image = image.to_str().unwrap();
        exec(&["mkfs", "-p", image, "-b", "100"]).unwrap();

        let err = exec(&["cat", "-p", image, "/missing"]).unwrap_err();
        let fs_err = err.downcast_ref::<FsError>().unwrap();
        assert_eq!(fs_err.to_errno(), libc::ENOENT);
        assert!(err.to_string().contains("missing"));

        let err = exec(&["rmdir", "-p", image, "/"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FsError>(),
            Some(FsError::CannotDeleteRoot)
        ));
    }
}
