use std::path::PathBuf;

use clap::Parser;

/// Tells whether two JPEG images could be Outguess outputs of the same cover image
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// First JPEG image
    #[arg(value_name = "image 1.jpg", allow_hyphen_values = true)]
    pub image1: PathBuf,

    /// Second JPEG image
    #[arg(value_name = "image 2.jpg", allow_hyphen_values = true)]
    pub image2: PathBuf,

    /// Directory for temporary re-compressed files
    #[arg(long = "temp-dir", value_name = "dir")]
    pub temp_dir: Option<PathBuf>,
}
