use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use vip_reconcile::client::{HttpConfig, WeapiClient};
use vip_reconcile::config::{AppPaths, JsonFile, Settings, Store};
use vip_reconcile::fetch::{fetch_owned_entries, fetch_pricing, fetch_tracks, playlist_track_ids};
use vip_reconcile::logging::init_logging;
use vip_reconcile::models::{OwnedEntry, Track};
use vip_reconcile::progress::{format_duration, set_log_only};
use vip_reconcile::reconcile::reconcile;
use vip_reconcile::report::{
    cloud_report_filename, render_cloud_report, render_vip_report, timestamp_suffix,
    vip_report_filename, write_report, CLOUD_REPORT_PATTERN, VIP_REPORT_PATTERN,
};
use vip_reconcile::session::{CookieSource, Cookies, Session};
use vip_reconcile::vip::tag_vip_tracks;

#[derive(Parser)]
#[command(name = "vip-reconcile")]
#[command(about = "List the VIP tracks of a playlist that are not already in your cloud library")]
struct Args {
    /// Playlist id or share URL (remembered for the next run)
    playlist: Option<String>,

    /// Directory for settings.json and cookie.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Cookie header ("MUSIC_U=...; __csrf=..."), saved for later runs
    #[arg(long)]
    cookie: Option<String>,

    /// Skip the cloud library and report every VIP track
    #[arg(long)]
    no_filter: bool,

    /// Also write candidates.json and owned.json for offline replay
    #[arg(long)]
    snapshot: bool,

    /// Disable progress spinners, log phases instead (for tail -f)
    #[arg(long)]
    log_only: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const CANDIDATES_SNAPSHOT: &str = "candidates.json";
const OWNED_SNAPSHOT: &str = "owned.json";

static PLAYLIST_ID_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]id=(\d+)").unwrap());

/// Accept a bare numeric id or a share URL carrying `id=<digits>`.
fn parse_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Some(input.to_string());
    }
    PLAYLIST_ID_PARAM.captures(input).map(|caps| caps[1].to_string())
}

/// Playlist id for this run: the argument, else the saved id unless the
/// user types a new one, else whatever the user types.
fn resolve_playlist_id<F>(arg: Option<&str>, saved: Option<String>, mut ask: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let answer = match (arg, saved) {
        (Some(arg), _) => arg.to_string(),
        (None, Some(saved)) => {
            let answer = ask(&format!(
                "Saved playlist: {saved}. Press Enter to use it, or enter a new id/URL: "
            ))?;
            if answer.trim().is_empty() {
                return Ok(saved);
            }
            answer
        }
        (None, None) => ask("Playlist id or share URL: ")?,
    };
    match parse_playlist_id(&answer) {
        Some(id) => Ok(id),
        None => bail!("Not a playlist id or share URL: '{}'", answer.trim()),
    }
}

fn prompt_line(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Why the run stops before writing any report, if it does. An empty
/// playlist makes no detail or pricing requests.
fn stop_reason(track_count: usize, vip_count: usize) -> Option<&'static str> {
    if track_count == 0 {
        Some("Playlist has no tracks")
    } else if vip_count == 0 {
        Some("No VIP tracks found")
    } else {
        None
    }
}

fn write_snapshots(dir: &Path, candidates: &[Track], owned: &[OwnedEntry]) -> Result<()> {
    JsonFile::<Vec<Track>>::new(dir.join(CANDIDATES_SNAPSHOT)).save(&candidates.to_vec())?;
    JsonFile::<Vec<OwnedEntry>>::new(dir.join(OWNED_SNAPSHOT)).save(&owned.to_vec())?;
    info!(dir = %dir.display(), "snapshots written");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    set_log_only(args.log_only);

    let start = Instant::now();
    let now = Local::now();
    let suffix = timestamp_suffix(&now);

    let paths = AppPaths::resolve(args.data_dir, args.output_dir);
    let protected_files = paths.protected_files();
    let protected: Vec<&Path> = protected_files.iter().map(PathBuf::as_path).collect();

    let settings_store: JsonFile<Settings> = JsonFile::new(paths.settings_file());
    let saved = Settings::saved_playlist(&settings_store)?;
    let playlist_id = resolve_playlist_id(args.playlist.as_deref(), saved, prompt_line)?;
    Settings::remember_playlist(&settings_store, &playlist_id)?;

    let cookie_store: JsonFile<Cookies> = JsonFile::new(paths.cookie_file());
    let session = Session::resolve(&cookie_store, args.cookie.as_deref(), || {
        prompt_line("Paste the Cookie header of a logged-in music.163.com session (Enter to skip): ")
    })?;
    if session.source == CookieSource::Empty {
        warn!("no cookies; requests are anonymous and the cloud library will be unavailable");
    }

    let client = WeapiClient::new(&HttpConfig::default(), &session.cookies)
        .context("Failed to create HTTP client")?;

    // Playlist -> VIP candidates
    let (playlist_name, ids) =
        playlist_track_ids(&client, &playlist_id).context("Failed to fetch playlist")?;
    info!(playlist = %playlist_name, tracks = ids.len(), "playlist loaded");

    let tracks = fetch_tracks(&client, &ids).context("Failed to fetch song details")?;
    let pricing = fetch_pricing(&client, &ids).context("Failed to fetch song pricing")?;
    let vip_tracks = tag_vip_tracks(&tracks, &pricing);
    info!(vip = vip_tracks.len(), total = tracks.len(), "VIP tracks found");
    if let Some(reason) = stop_reason(ids.len(), vip_tracks.len()) {
        println!("{}: {}", reason, playlist_name);
        return Ok(());
    }

    let vip_report = write_report(
        &paths.output_dir,
        &vip_report_filename(&playlist_name, false, &suffix),
        VIP_REPORT_PATTERN,
        &render_vip_report(&playlist_name, &vip_tracks, false, &now),
        &protected,
    )?;

    let mut written = vec![vip_report];
    let mut kept_count = vip_tracks.len();
    let mut owned_count = None;

    // Cloud library -> filtered report
    if !args.no_filter {
        let owned = fetch_owned_entries(&client).context("Failed to fetch cloud library")?;
        owned_count = Some(owned.len());

        written.push(write_report(
            &paths.output_dir,
            &cloud_report_filename(&suffix),
            CLOUD_REPORT_PATTERN,
            &render_cloud_report(&owned, &now),
            &protected,
        )?);

        if args.snapshot {
            write_snapshots(&paths.output_dir, &vip_tracks, &owned)?;
        }

        let result = reconcile(&vip_tracks, &owned);
        result.stats.log_phase("reconcile");
        kept_count = result.kept.len();

        if result.kept.is_empty() {
            println!("Every VIP track is already in the cloud library");
        } else {
            written.push(write_report(
                &paths.output_dir,
                &vip_report_filename(&playlist_name, true, &suffix),
                VIP_REPORT_PATTERN,
                &render_vip_report(&playlist_name, &result.kept, true, &now),
                &protected,
            )?);
        }
    } else if args.snapshot {
        write_snapshots(&paths.output_dir, &vip_tracks, &[])?;
    }

    println!("\n{:=<60}", "");
    println!("Done: {}", playlist_name);
    println!("  Playlist tracks: {}", tracks.len());
    println!("  VIP tracks: {}", vip_tracks.len());
    if let Some(owned) = owned_count {
        println!("  Cloud library: {}", owned);
        println!("  VIP tracks not owned: {}", kept_count);
    }
    for path in &written {
        println!("  Wrote {}", path.display());
    }
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
