use clap::{Parser, ValueEnum};
use sitebones::ExportFormat;

#[derive(Parser, Debug)]
#[command(name = "sitebones")]
#[command(about = "Fast website skeleton crawler over a WebDriver endpoint")]
#[command(version)]
pub struct Args {
    /// Starting URL to crawl (scheme defaults to https://)
    pub url: String,

    /// Maximum pages to crawl
    #[arg(long, default_value_t = 100)]
    pub max_pages: usize,

    /// Maximum depth to crawl
    #[arg(long, default_value_t = 5)]
    pub max_depth: u32,

    /// Number of concurrent browser sessions
    #[arg(short, long, default_value_t = 8)]
    pub concurrency: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Tree)]
    pub format: FormatArg,

    /// Output file (optional)
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Tree,
    Json,
    Urls,
    Sitemap,
}

/// Convert from CLI format argument to the library export format
pub fn convert_format(arg: FormatArg) -> ExportFormat {
    match arg {
        FormatArg::Tree => ExportFormat::Tree,
        FormatArg::Json => ExportFormat::Json,
        FormatArg::Urls => ExportFormat::Urls,
        FormatArg::Sitemap => ExportFormat::Sitemap,
    }
}
