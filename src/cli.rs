use clap::Parser;

pub const DEFAULT_CATALOG_URL: &str =
    "http://acg.sugling.in/json_daily.php?device=iphone5&pro=yes&version=k.5.0";
pub const DEFAULT_CONTENT_URL: &str = "http://acg.sugling.in/_uploadfiles/iphone5/640/";

#[derive(Parser, Debug)]
#[command(
    name = "imgsync",
    about = "Mirror a remote image catalog into a local collection"
)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Download missing images. Without this only the report is produced.
    #[arg(long)]
    pub download: bool,

    /// Local collection root
    #[arg(short = 'd', long, default_value = "images")]
    pub directory: String,

    /// Maximum simultaneous downloads
    #[arg(
        short = 'c',
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,

    /// Catalog endpoint
    #[arg(long, env = "IMGSYNC_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Base URL the image identifier is appended to
    #[arg(long, env = "IMGSYNC_CONTENT_URL", default_value = DEFAULT_CONTENT_URL)]
    pub content_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
