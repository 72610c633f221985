use std::path::PathBuf;
use std::time::Duration;

use crate::download::DownloadConfig;
use crate::retry::RetryConfig;

/// Application configuration, resolved from the command line.
pub struct Config {
    pub directory: PathBuf,
    pub catalog_url: String,
    pub content_url: String,
    pub timeout: Duration,
    pub concurrency: usize,
    pub verbose: bool,
    pub download: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("catalog_url", &self.catalog_url)
            .field("content_url", &self.content_url)
            .field("concurrency", &self.concurrency)
            .field("download", &self.download)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.directory.trim().is_empty() {
            anyhow::bail!("--directory must not be empty");
        }
        let mut content_url = cli.content_url;
        if !content_url.ends_with('/') {
            content_url.push('/');
        }

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            catalog_url: cli.catalog_url,
            content_url,
            timeout: Duration::from_secs(cli.timeout_secs),
            concurrency: cli.concurrency as usize,
            verbose: cli.verbose,
            download: cli.download,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    /// Engine settings; the retry policy is fixed.
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            directory: self.directory.clone(),
            concurrency: self.concurrency,
            retry: RetryConfig::default(),
            no_progress_bar: self.no_progress_bar,
        }
    }
}
