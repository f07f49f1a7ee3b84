//! yt-dlp backed resolver, search, and recommendation source.
//!
//! Every lookup runs the `yt-dlp` executable as a child process and parses its
//! stdout. Children are killed if the calling future is dropped (timeouts).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use jukebox_types::SearchResult;
use serde::Deserialize;
use tokio::process::Command;

use crate::recommendations::RecommendationService;
use crate::resolver::{MediaResolver, ResolveError};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Command-line knobs passed to every yt-dlp invocation.
#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub binary: PathBuf,
    pub cookies_file: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            cookies_file: None,
            user_agent: None,
            cache_dir: Some(PathBuf::from("/tmp/yt-dlp")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    settings: YtDlpSettings,
}

#[derive(Debug, Deserialize)]
struct PlaylistJson {
    #[serde(default)]
    entries: Vec<EntryJson>,
}

#[derive(Debug, Deserialize)]
struct EntryJson {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    thumbnails: Vec<ThumbnailJson>,
    thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailJson {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoJson {
    title: Option<String>,
}

/// Which thumbnail of an entry's list to report.
#[derive(Debug, Clone, Copy)]
enum ThumbnailPick {
    First,
    Last,
}

impl YtDlp {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(["--quiet", "--no-warnings", "--force-ipv4"]);
        if let Some(cookies) = &self.settings.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }
        if let Some(agent) = &self.settings.user_agent {
            cmd.arg("--user-agent").arg(agent);
        }
        match &self.settings.cache_dir {
            Some(dir) => cmd.arg("--cache-dir").arg(dir),
            None => cmd.arg("--no-cache-dir"),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ResolveError> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(ResolveError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no error output")
                .trim()
                .to_string();
            return Err(ResolveError::Command(format!("{} ({reason})", output.status)));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    async fn resolve(&self, song_id: &str) -> Result<String, ResolveError> {
        let url = watch_url(song_id)?;
        tracing::debug!(song_id, "yt-dlp resolve");
        let stdout = self
            .run(&["-f", "bestaudio/best", "-g", "--no-playlist", &url])
            .await?;
        parse_stream_url(&stdout)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ResolveError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let target = format!("ytsearch{limit}:{query}");
        let stdout = self.run(&["--flat-playlist", "-J", &target]).await?;
        parse_entries(&stdout, ThumbnailPick::First)
    }
}

#[async_trait]
impl RecommendationService for YtDlp {
    async fn seed_title(&self, song_id: &str) -> Result<String, ResolveError> {
        let url = watch_url(song_id)?;
        let stdout = self
            .run(&["-J", "--skip-download", "--no-playlist", &url])
            .await?;
        parse_title(&stdout)
    }

    async fn related(&self, song_id: &str, limit: usize) -> Result<Vec<SearchResult>, ResolveError> {
        validate_id(song_id)?;
        let mix = format!("{WATCH_URL}{song_id}&list=RD{song_id}");
        let end = limit.to_string();
        let stdout = self
            .run(&["--flat-playlist", "-J", "--playlist-end", &end, &mix])
            .await?;
        let mut entries = parse_entries(&stdout, ThumbnailPick::Last)?;
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Restrict ids to the video-id alphabet so they cannot smuggle URL parameters.
fn validate_id(song_id: &str) -> Result<(), ResolveError> {
    let valid = !song_id.is_empty()
        && song_id.len() <= 64
        && song_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ResolveError::InvalidId(song_id.to_string()))
    }
}

fn watch_url(song_id: &str) -> Result<String, ResolveError> {
    validate_id(song_id)?;
    Ok(format!("{WATCH_URL}{song_id}"))
}

fn parse_stream_url(stdout: &[u8]) -> Result<String, ResolveError> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("http://") || line.starts_with("https://"))
        .map(str::to_string)
        .ok_or_else(|| ResolveError::Malformed("no stream url in output".to_string()))
}

fn parse_title(stdout: &[u8]) -> Result<String, ResolveError> {
    let video: VideoJson =
        serde_json::from_slice(stdout).map_err(|err| ResolveError::Malformed(err.to_string()))?;
    video
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| ResolveError::Malformed("video has no title".to_string()))
}

fn parse_entries(stdout: &[u8], pick: ThumbnailPick) -> Result<Vec<SearchResult>, ResolveError> {
    let playlist: PlaylistJson =
        serde_json::from_slice(stdout).map_err(|err| ResolveError::Malformed(err.to_string()))?;
    Ok(playlist
        .entries
        .into_iter()
        .filter_map(|entry| {
            let thumbnail = pick_thumbnail(&entry, pick);
            Some(SearchResult {
                id: entry.id?,
                title: entry.title?,
                thumbnail,
            })
        })
        .collect())
}

fn pick_thumbnail(entry: &EntryJson, pick: ThumbnailPick) -> String {
    let mut urls = entry.thumbnails.iter().filter_map(|t| t.url.as_deref());
    let picked = match pick {
        ThumbnailPick::First => urls.next(),
        ThumbnailPick::Last => urls.last(),
    };
    picked
        .or(entry.thumbnail.as_deref())
        .unwrap_or_default()
        .to_string()
}
