use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::checker::{Checker, collate};
use crate::playlist::{extract_entries, render_entries};

/// Checks every stream URL in `input` and writes the surviving
/// metadata/URL pairs to `output`.
pub async fn check_streams(checker: &Checker, input: &Path, output: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Reading playlist {}", input.display()))?;
    let lines: Vec<String> = content.lines().map(ToString::to_string).collect();

    let entries = extract_entries(&lines);
    info!("Found {} stream URLs in {}", entries.len(), input.display());

    let bar = ProgressBar::new(entries.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    bar.set_message("Processing URLs");

    let results = checker.run(&entries, Some(&bar)).await;
    bar.finish_and_clear();

    let live = collate(entries, &results);
    info!("{} of {} streams are live", live.len(), results.len());

    tokio::fs::write(output, render_entries(&live))
        .await
        .with_context(|| format!("Writing playlist {}", output.display()))?;
    info!("New playlist with live/valid streams saved to: {}", output.display());

    Ok(())
}

/// Checks every playlist in `input` whose name ends with one of `extensions`,
/// writing each filtered playlist as `live_<name>` under `output`.
///
/// Cancelling `ct` stops before the next file; the file in flight still runs
/// to completion.
pub async fn process_folder(
    checker: &Checker,
    input: &Path,
    output: &Path,
    extensions: &[String],
    ct: &CancellationToken,
) -> Result<()> {
    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("Creating output folder {}", output.display()))?;

    for path in playlist_files(input, extensions).await? {
        if ct.is_cancelled() {
            warn!("Cancelled, skipping remaining playlists");
            break;
        }

        info!("Processing file: {}", path.display());
        let name = path
            .file_name()
            .expect("directory entries have file names")
            .to_string_lossy();
        let output_file = output.join(format!("live_{name}"));
        check_streams(checker, &path, &output_file).await?;
    }

    Ok(())
}

/// Concatenates every `.m3u8` file in `folder` into `combined`, in file name
/// order.
pub async fn combine_playlists(folder: &Path, combined: &Path) -> Result<()> {
    let mut lines = String::new();
    for path in playlist_files(folder, &[".m3u8".to_string()]).await? {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Reading playlist {}", path.display()))?;
        lines.push_str(&content);
    }

    tokio::fs::write(combined, lines)
        .await
        .with_context(|| format!("Writing combined playlist {}", combined.display()))?;
    info!("Combined playlist saved to: {}", combined.display());

    Ok(())
}

async fn playlist_files(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut dir = tokio::fs::read_dir(folder)
        .await
        .with_context(|| format!("Listing folder {}", folder.display()))?;

    let mut files = Vec::new();
    while let Some(dir_entry) = dir.next_entry().await? {
        let name = dir_entry.file_name();
        let name = name.to_string_lossy();
        if extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            files.push(dir_entry.path());
        }
    }

    // read_dir order is platform-dependent
    files.sort();
    Ok(files)
}

#[derive(Debug, Deserialize)]
pub struct MergeConfig {
    pub output: MergeOutput,
    pub input_files: Vec<PathBuf>,
    pub logging: MergeLogging,
}

#[derive(Debug, Deserialize)]
pub struct MergeOutput {
    pub filename: PathBuf,
    pub add_newlines: bool,
}

#[derive(Debug, Deserialize)]
pub struct MergeLogging {
    pub enabled: bool,
    pub success_message: String,
}

/// Merges the playlists listed in a YAML config file into one output file.
///
/// The config names the inputs, the output file, whether to separate inputs
/// with a newline, and an optional success message where
/// `{output_filename}` is substituted with the output path.
pub async fn merge_from_config(config_path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(config_path)
        .await
        .with_context(|| format!("Reading merge config {}", config_path.display()))?;
    let config: MergeConfig =
        serde_yaml::from_str(&raw).context("Parsing merge config YAML")?;

    let mut merged = String::new();
    for input in &config.input_files {
        let content = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Reading playlist {}", input.display()))?;
        merged.push_str(&content);
        if config.output.add_newlines {
            merged.push('\n');
        }
    }

    tokio::fs::write(&config.output.filename, merged)
        .await
        .with_context(|| format!("Writing {}", config.output.filename.display()))?;

    if config.logging.enabled {
        let message = config.logging.success_message.replace(
            "{output_filename}",
            &config.output.filename.display().to_string(),
        );
        info!("{message}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn combine_concatenates_m3u8_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("live_b.m3u8"), "#EXTINF:-1,B\nhttp://b\n").unwrap();
        std::fs::write(dir.path().join("live_a.m3u8"), "#EXTINF:-1,A\nhttp://a\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();

        let combined = dir.path().join("combined_playlist.m3u8");
        combine_playlists(dir.path(), &combined).await.unwrap();

        let merged = std::fs::read_to_string(&combined).unwrap();
        assert_eq!(merged, "#EXTINF:-1,A\nhttp://a\n#EXTINF:-1,B\nhttp://b\n");
    }

    #[tokio::test]
    async fn merge_follows_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.m3u8");
        let second = dir.path().join("two.m3u8");
        std::fs::write(&first, "#EXTINF:-1,One\nhttp://one").unwrap();
        std::fs::write(&second, "#EXTINF:-1,Two\nhttp://two").unwrap();

        let merged_path = dir.path().join("merged.m3u8");
        let config_path = dir.path().join("merges.yml");
        let config = format!(
            concat!(
                "output:\n",
                "  filename: {}\n",
                "  add_newlines: true\n",
                "input_files:\n",
                "  - {}\n",
                "  - {}\n",
                "logging:\n",
                "  enabled: true\n",
                "  success_message: \"Merged into {{output_filename}}\"\n",
            ),
            merged_path.display(),
            first.display(),
            second.display(),
        );
        std::fs::write(&config_path, config).unwrap();

        merge_from_config(&config_path).await.unwrap();

        let merged = std::fs::read_to_string(&merged_path).unwrap();
        assert_eq!(merged, "#EXTINF:-1,One\nhttp://one\n#EXTINF:-1,Two\nhttp://two\n");
    }
}
