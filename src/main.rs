use clap::Parser;
use imagefs::{cli_interface::ImageFsCli, FsError};
/// a CLI interface to users to create an image,
/// or to inspect and change the files inside one.
///
/// Every subcommand opens the image, runs to completion and syncs it on exit.
/// On failure the process exits with the errno of the filesystem error.
fn main() {
    env_logger::builder().format_timestamp_nanos().init();
    let args = ImageFsCli::parse();
    let result = imagefs::cli_interface::run(args, &mut std::io::stdout().lock());
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        let code = e.downcast_ref::<FsError>().map_or(1, FsError::to_errno);
        std::process::exit(code);
    }
}
