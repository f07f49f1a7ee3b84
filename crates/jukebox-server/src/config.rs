//! Configuration loading and parsing.
//!
//! Defines the server config schema and resolves defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::mpv::MpvSpawn;
use crate::playback_manager::PlaybackSettings;
use crate::recommendations::RecommendationSettings;
use crate::ytdlp::YtDlpSettings;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MPV_SOCKET: &str = "/tmp/jukebox-mpv.sock";
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Directory with a static web UI served at `/`.
    pub web_ui_dir: Option<String>,
    /// Extra origins allowed by CORS (localhost is always allowed).
    pub cors_origins: Option<Vec<String>>,
    /// Queue controller settings.
    pub playback: Option<PlaybackConfig>,
    /// yt-dlp invocation settings.
    pub ytdlp: Option<YtDlpConfig>,
    /// mpv sink settings.
    pub mpv: Option<MpvConfig>,
    /// Recommendation enrichment settings.
    pub recommendations: Option<RecommendationsConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaybackConfig {
    /// Volume applied at startup (default: 80).
    pub default_volume: Option<u8>,
    /// End-of-track poll interval in milliseconds (default: 1000).
    pub monitor_interval_ms: Option<u64>,
    /// Upper bound for one resolve in milliseconds (default: 30000).
    pub resolve_timeout_ms: Option<u64>,
    /// Upper bound for one sink command in milliseconds (default: 5000).
    pub sink_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YtDlpConfig {
    /// Executable name or path (default: `yt-dlp`).
    pub binary: Option<String>,
    /// Netscape-format cookies file.
    pub cookies_file: Option<String>,
    pub user_agent: Option<String>,
    /// yt-dlp cache directory (default: `/tmp/yt-dlp`).
    pub cache_dir: Option<String>,
    /// Results per search (default: 10).
    pub search_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MpvConfig {
    /// IPC socket path.
    pub socket_path: Option<String>,
    /// Launch mpv as a child process (default: true).
    pub spawn: Option<bool>,
    /// Executable name or path (default: `mpv`).
    pub binary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsConfig {
    /// Allow `recommend=true` enqueues to trigger enrichment (default: true).
    pub enabled: Option<bool>,
    /// Candidates fetched per seed (default: 20).
    pub candidate_limit: Option<usize>,
    /// Candidates accepted per seed (default: 5).
    pub max_accepted: Option<usize>,
    /// Title prefix marking recommended entries.
    pub title_prefix: Option<String>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServerConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional bind address from config.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<Option<SocketAddr>> {
    let Some(bind) = non_empty(cfg.bind.as_deref()) else {
        return Ok(None);
    };
    let addr = bind.parse().with_context(|| format!("parse bind {bind}"))?;
    Ok(Some(addr))
}

/// Extract the optional web UI directory from config.
pub fn web_ui_dir_from_config(cfg: &ServerConfig) -> Option<PathBuf> {
    non_empty(cfg.web_ui_dir.as_deref()).map(PathBuf::from)
}

/// Controller timeouts and defaults.
pub fn playback_from_config(cfg: &ServerConfig) -> Result<PlaybackSettings> {
    let defaults = PlaybackSettings::default();
    let Some(playback) = cfg.playback.as_ref() else {
        return Ok(defaults);
    };
    let volume = playback.default_volume.unwrap_or(defaults.default_volume);
    if volume > 100 {
        anyhow::bail!("playback.default_volume must be 0..=100, got {volume}");
    }
    let millis = |value: Option<u64>, name: &str, fallback: Duration| -> Result<Duration> {
        match value {
            Some(0) => anyhow::bail!("playback.{name} must be greater than zero"),
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(fallback),
        }
    };
    Ok(PlaybackSettings {
        default_volume: volume,
        monitor_interval: millis(
            playback.monitor_interval_ms,
            "monitor_interval_ms",
            defaults.monitor_interval,
        )?,
        resolve_timeout: millis(
            playback.resolve_timeout_ms,
            "resolve_timeout_ms",
            defaults.resolve_timeout,
        )?,
        sink_timeout: millis(playback.sink_timeout_ms, "sink_timeout_ms", defaults.sink_timeout)?,
    })
}

/// yt-dlp settings plus the per-search result limit.
pub fn ytdlp_from_config(cfg: &ServerConfig) -> (YtDlpSettings, usize) {
    let defaults = YtDlpSettings::default();
    let Some(ytdlp) = cfg.ytdlp.as_ref() else {
        return (defaults, DEFAULT_SEARCH_LIMIT);
    };
    let settings = YtDlpSettings {
        binary: non_empty(ytdlp.binary.as_deref())
            .map(PathBuf::from)
            .unwrap_or(defaults.binary),
        cookies_file: non_empty(ytdlp.cookies_file.as_deref()).map(PathBuf::from),
        user_agent: non_empty(ytdlp.user_agent.as_deref()).map(str::to_string),
        cache_dir: match ytdlp.cache_dir.as_deref() {
            Some(dir) => non_empty(Some(dir)).map(PathBuf::from),
            None => defaults.cache_dir,
        },
    };
    let limit = ytdlp.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 50);
    (settings, limit)
}

/// Resolve the mpv socket (CLI override first) and whether to spawn mpv.
pub fn mpv_from_config(cfg: &ServerConfig, socket_override: Option<&Path>) -> (MpvSpawn, bool) {
    let mpv = cfg.mpv.as_ref();
    let socket_path = socket_override
        .map(Path::to_path_buf)
        .or_else(|| non_empty(mpv.and_then(|m| m.socket_path.as_deref())).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MPV_SOCKET));
    let binary = non_empty(mpv.and_then(|m| m.binary.as_deref()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mpv"));
    let spawn = mpv.and_then(|m| m.spawn).unwrap_or(true);
    (
        MpvSpawn {
            binary,
            socket_path,
            startup_timeout: Duration::from_secs(5),
        },
        spawn,
    )
}

/// Enrichment settings, or `None` when disabled.
pub fn recommendations_from_config(
    cfg: &ServerConfig,
    timeout: Duration,
) -> Option<RecommendationSettings> {
    let defaults = RecommendationSettings {
        timeout,
        ..RecommendationSettings::default()
    };
    let Some(recs) = cfg.recommendations.as_ref() else {
        return Some(defaults);
    };
    if recs.enabled == Some(false) {
        return None;
    }
    Some(RecommendationSettings {
        candidate_limit: recs.candidate_limit.unwrap_or(defaults.candidate_limit),
        max_accepted: recs.max_accepted.unwrap_or(defaults.max_accepted),
        title_prefix: recs.title_prefix.clone().unwrap_or(defaults.title_prefix),
        timeout,
    })
}

/// Extra CORS origins, trimmed and de-duplicated.
pub fn cors_origins_from_config(cfg: &ServerConfig) -> Vec<String> {
    let mut origins: Vec<String> = cfg
        .cors_origins
        .iter()
        .flatten()
        .filter_map(|origin| non_empty(Some(origin.as_str())))
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect();
    origins.sort();
    origins.dedup();
    origins
}
