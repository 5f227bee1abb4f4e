use clap::Parser;
use twitter_ratelimit::Bundle;

#[derive(Debug, Parser)]
#[command(
    name = "twitter-ratelimit",
    about = "Print the current Twitter API rate-limit status",
    disable_version_flag = true
)]
pub struct CliOptions {
    /// Override RUST_LOG level (e.g., info, debug)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Print the wire payload with unparsed reset times
    #[arg(long)]
    pub raw: bool,

    /// Comma-separated bundles to query (e.g., search,users)
    #[arg(long, value_delimiter = ',')]
    pub resources: Vec<Bundle>,

    /// Only list endpoints with no remaining calls
    #[arg(long, conflicts_with = "raw")]
    pub exhausted: bool,

    /// Print version and exit
    #[arg(long)]
    pub version: bool,
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins, else RUST_LOG, else info.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    // Logs go to stderr; stdout carries the JSON output.
    builder.target(env_logger::Target::Stderr).init();
}
