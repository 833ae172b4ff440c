use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "vision-labeler")]
#[command(
    about = "Label images with a cloud vision API, skipping ones already labeled",
    long_about = None
)]
pub struct Cli {
    /// The cloud project
    pub project: String,

    /// The dataset CSV path
    pub dataset: PathBuf,

    /// Export label results to JSON files in the output directory
    #[arg(long = "export_json", alias = "export-json")]
    pub export_json: bool,
}
