mod cli;

use clap::Parser;
use serde::Serialize;
use twitter_ratelimit::{ApiClient, Config};

#[derive(Serialize)]
struct ExhaustedEntry<'a> {
    bundle: &'a str,
    endpoint: &'a str,
    limit: i64,
    reset: chrono::DateTime<chrono::Utc>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = cli::CliOptions::parse();
    cli::init_logging(opts.log_level.as_deref());

    if opts.version {
        println!("twitter-ratelimit {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let client = ApiClient::new(cfg)?;

    let out = if opts.raw {
        let raw = client.get_rate_limit_status_raw_for(&opts.resources).await?;
        serde_json::to_string_pretty(&raw)?
    } else {
        let status = client.get_rate_limit_status_for(&opts.resources).await?;
        if opts.exhausted {
            let entries: Vec<ExhaustedEntry> = status
                .exhausted()
                .map(|(bundle, endpoint, s)| ExhaustedEntry {
                    bundle: bundle.as_str(),
                    endpoint,
                    limit: s.limit,
                    reset: s.reset,
                })
                .collect();
            serde_json::to_string_pretty(&entries)?
        } else {
            serde_json::to_string_pretty(&status)?
        }
    };
    println!("{}", out);
    Ok(())
}
