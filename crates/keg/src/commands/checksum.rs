//! `keg checksum` -- print the SHA-256 of a file or URL.
//!
//! This is how a placeholder `sha256` in a formula gets its real value.

use anyhow::{Context, Result};
use keg_exec::fetch::Fetcher;
use keg_exec::verify::sha256_hex;
use url::Url;

use crate::cli::ChecksumArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `keg checksum` command.
pub fn run(ctx: &RuntimeContext, args: &ChecksumArgs) -> Result<()> {
    let bytes = match as_url(&args.target) {
        Some(url) => ctx
            .fetcher()
            .fetch(&url)
            .with_context(|| format!("failed to fetch {url}"))?,
        None => std::fs::read(&args.target)
            .with_context(|| format!("failed to read {}", args.target))?,
    };
    let digest = sha256_hex(&bytes);

    if ctx.json {
        output_json(&serde_json::json!({
            "target": args.target,
            "sha256": digest,
            "bytes": bytes.len(),
        }));
    } else {
        println!("{digest}  {}", args.target);
    }
    Ok(())
}

/// Treat the target as a URL only for schemes the fetcher understands.
fn as_url(target: &str) -> Option<Url> {
    Url::parse(target)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https" | "file"))
}
