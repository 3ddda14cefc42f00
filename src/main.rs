#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, time::Duration};

use anyhow::{Result, ensure};
use clap::Parser;
use m3u_sift::checker::{CheckConfig, Checker};
use m3u_sift::files;
use m3u_sift::util::{init_http_client, spawn_ct_watcher, warn_ulimit};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Checks live or dead links in media playlist files using HTTP probes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input folder or file containing media playlists
    #[arg(short, long, default_value = "m3u8_dump")]
    input: PathBuf,

    /// Output folder to save processed playlists
    #[arg(short, long, default_value = "m3u8_live")]
    output: PathBuf,

    /// Number of concurrent URL checks
    #[arg(short, long, default_value_t = 10)]
    threads: usize,

    /// Process a single file instead of a folder
    #[arg(short, long)]
    file: bool,

    /// Timeout for URL checks in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Print a live/dead line for every probed URL
    #[arg(long)]
    verbose: bool,

    /// Number of retries for failed URLs
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// File extensions to process in folder mode
    #[arg(long, num_args = 1.., default_values_t = [
        String::from(".m3u"),
        String::from(".m3u8"),
        String::from(".mpd"),
        String::from(".mp4"),
    ])]
    extensions: Vec<String>,

    /// Combine all .m3u8 files in the output folder into a single playlist
    #[arg(long)]
    combine: bool,

    /// Merge the playlists listed in a YAML config file instead of checking
    #[arg(long)]
    merge_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if let Some(config_path) = args.merge_config {
        return files::merge_from_config(&config_path).await;
    }

    warn_ulimit();

    let config = CheckConfig {
        concurrency: args.threads,
        timeout: Duration::from_secs(args.timeout),
        retries: args.retries,
        verbose: args.verbose,
    };
    let checker = Checker::new(init_http_client(), &config)?;

    let ct = CancellationToken::new();
    spawn_ct_watcher(ct.clone());

    if args.file {
        ensure!(
            args.input.is_file(),
            "{} is not a valid file",
            args.input.display()
        );
        tokio::fs::create_dir_all(&args.output).await?;

        let name = args
            .input
            .file_name()
            .expect("input file has a name")
            .to_string_lossy();
        let output_file = args.output.join(format!("live_{name}"));
        files::check_streams(&checker, &args.input, &output_file).await?;
    } else {
        ensure!(
            args.input.is_dir(),
            "{} is not a valid folder",
            args.input.display()
        );
        files::process_folder(&checker, &args.input, &args.output, &args.extensions, &ct).await?;
    }

    if args.combine {
        let combined = std::env::current_dir()?.join("combined_playlist.m3u8");
        files::combine_playlists(&args.output, &combined).await?;
    }

    info!("All done successfully!");

    Ok(())
}
