//! Markdown reports: the VIP list (full and filtered) and the cloud library.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{OwnedEntry, Track};
use crate::safety::validate_report_path;

/// Marker every VIP report file name carries.
pub const VIP_REPORT_PATTERN: &str = "_vip_songs_";
/// Marker every cloud library report file name carries.
pub const CLOUD_REPORT_PATTERN: &str = "cloud_library_";

const UNKNOWN: &str = "unknown";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ============================================================================
// Cell Formatting
// ============================================================================

/// Bytes as megabytes with two decimals: `3.50 MB`.
pub fn format_filesize(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Epoch milliseconds as `YYYY-mm-dd HH:MM:SS` in `tz`; `unknown` for zero
/// or out-of-range values.
pub fn format_timestamp<Tz>(millis: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if millis <= 0 {
        return UNKNOWN.to_string();
    }
    match tz.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// File name suffix for a report written at `now`.
pub fn timestamp_suffix<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Table cell text: pipes escaped, line breaks flattened.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Playlist names become file name prefixes; path separators and other
/// characters most filesystems reject are replaced with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "playlist".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// File Names
// ============================================================================

pub fn vip_report_filename(playlist_name: &str, filtered: bool, suffix: &str) -> String {
    let kind = if filtered { "vip_songs_filtered" } else { "vip_songs" };
    format!("{}_{}_{}.md", sanitize_filename(playlist_name), kind, suffix)
}

pub fn cloud_report_filename(suffix: &str) -> String {
    format!("{CLOUD_REPORT_PATTERN}{suffix}.md")
}

// ============================================================================
// Rendering
// ============================================================================

/// VIP track table. `filtered` adds the notice that cloud-owned tracks were
/// removed.
pub fn render_vip_report<Tz>(
    playlist_name: &str,
    tracks: &[Track],
    filtered: bool,
    now: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "# {} - VIP tracks\n", escape_cell(playlist_name));
    let _ = writeln!(out, "Extracted: {}\n", now.format("%Y-%m-%d %H:%M:%S"));
    if filtered {
        out.push_str("**Note: tracks already in the cloud library have been filtered out**\n\n");
    }
    out.push_str("| # | Title | Artists | VIP type |\n");
    out.push_str("|---|-------|---------|----------|\n");
    for (i, track) in tracks.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            i + 1,
            escape_cell(&track.title),
            escape_cell(&track.artists_display()),
            escape_cell(track.vip_label.as_deref().unwrap_or(UNKNOWN)),
        );
    }
    out
}

/// Cloud library table. Matched columns fall back to the raw tags.
pub fn render_cloud_report<Tz>(entries: &[OwnedEntry], now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let tz = now.timezone();
    let mut out = String::new();
    out.push_str("# Cloud library\n\n");
    let _ = writeln!(out, "Extracted: {}", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total: {} tracks\n", entries.len());
    out.push_str("| # | Title | Artist | Matched title | Matched artist | Size | Added |\n");
    out.push_str("|---|-------|--------|---------------|----------------|------|-------|\n");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            escape_cell(&entry.title),
            escape_cell(&entry.artist),
            escape_cell(entry.display_title()),
            escape_cell(entry.display_artist()),
            format_filesize(entry.file_size),
            format_timestamp(entry.added_at, &tz),
        );
    }
    out
}

// ============================================================================
// Writing
// ============================================================================

/// Write `contents` to `dir/file_name` after the output-path safety check.
pub fn write_report(
    dir: &Path,
    file_name: &str,
    required_pattern: &str,
    contents: &str,
    protected: &[&Path],
) -> Result<PathBuf> {
    let path = dir.join(file_name);
    validate_report_path(&path, required_pattern, protected)?;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(path)
}
