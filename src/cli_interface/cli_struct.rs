use clap::Parser;

use crate::fs::DEFAULT_BLOCK_COUNT;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum ImageFsCli {
    /// create a new file system image
    Mkfs(MkfsArgs),
    /// show the capacity and usage of an image
    Info(ImageArgs),
    /// list a directory, or describe a file
    Ls(PathArgs),
    /// create a directory
    Mkdir(PathArgs),
    /// remove a directory and everything below it
    Rmdir(PathArgs),
    /// create an empty file
    Touch(PathArgs),
    /// remove a file
    Rm(PathArgs),
    /// print the content of a file
    Cat(PathArgs),
    /// append text to the end of a file
    Append(AppendArgs),
    /// copy a host file into the image
    Import(ImportArgs),
    /// copy a file out of the image onto the host
    Export(ExportArgs),
}

///make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the number of data blocks, one inode is reserved for every ten of them
    #[clap(short, long, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: u32,
    /// replace the image file if it already exists
    #[clap(long)]
    pub force: bool,
}

/// subcommands that only need an image
#[derive(clap::Args, Debug, PartialEq)]
pub struct ImageArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// subcommands working on one absolute path inside the image
#[derive(clap::Args, Debug, PartialEq)]
pub struct PathArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// absolute path inside the image, e.g. `/docs/notes.txt`
    pub path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct AppendArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file to append to
    pub path: String,
    /// the text to append, no newline is added
    pub text: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct ImportArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file on the host to copy
    pub host_src: String,
    /// the new file inside the image
    pub dest: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct ExportArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file inside the image to copy
    pub src: String,
    /// where to write it on the host
    pub host_dest: String,
}


/// test the subcommands working inside an image
#[cfg(test)]
mod path_parse_args_tests {
    use super::*;

    #[test]
    fn test_path_subcommands() {
        let args = ImageFsCli::parse_from(["imagefs", "ls", "-p", "test.img", "/docs"]);
        assert_eq!(
            args,
            ImageFsCli::Ls(PathArgs {
                image_file_path: "test.img".to_string(),
                path: "/docs".to_string(),
            })
        );
        let args = ImageFsCli::parse_from(["imagefs", "rmdir", "--image-file-path", "test.img", "/docs"]);
        assert!(matches!(args, ImageFsCli::Rmdir(_)));
    }

    #[test]
    fn test_append_takes_text() {
        let args = ImageFsCli::parse_from(["imagefs", "append", "-p", "test.img", "/f", "hello world"]);
        assert_eq!(
            args,
            ImageFsCli::Append(AppendArgs {
                image_file_path: "test.img".to_string(),
                path: "/f".to_string(),
                text: "hello world".to_string(),
            })
        );
    }

    #[test]
    fn test_copy_subcommands() {
        let args = ImageFsCli::parse_from(["imagefs", "import", "-p", "test.img", "host.txt", "/f"]);
        assert_eq!(
            args,
            ImageFsCli::Import(ImportArgs {
                image_file_path: "test.img".to_string(),
                host_src: "host.txt".to_string(),
                dest: "/f".to_string(),
            })
        );
        let args = ImageFsCli::parse_from(["imagefs", "export", "-p", "test.img", "/f", "out.txt"]);
        assert_eq!(
            args,
            ImageFsCli::Export(ExportArgs {
                image_file_path: "test.img".to_string(),
                src: "/f".to_string(),
                host_dest: "out.txt".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_image_path_is_rejected() {
        assert!(ImageFsCli::try_parse_from(["imagefs", "cat", "/f"]).is_err());
    }
}
