//! Jukebox server binary.
//!
//! Accepts song requests over HTTP, keeps the play queue, and drives mpv via yt-dlp.

mod api;
mod audio_sink;
mod config;
mod events;
mod models;
mod monitor;
mod mpv;
mod openapi;
mod playback_manager;
mod queue_service;
mod recommendations;
mod resolver;
mod startup;
mod state;
mod ytdlp;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "jukebox-server", version = VERSION)]
pub(crate) struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:8000
    #[arg(long)]
    pub(crate) bind: Option<SocketAddr>,

    /// Optional server config file (TOML)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// mpv IPC socket path (overrides config)
    #[arg(long)]
    pub(crate) mpv_socket: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,jukebox_server=info")
        }))
        .init();

    startup::run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_overrides() {
        let args = Args::try_parse_from([
            "jukebox-server",
            "--bind",
            "127.0.0.1:8123",
            "--mpv-socket",
            "/tmp/test.sock",
        ])
        .unwrap();
        assert_eq!(args.bind, Some("127.0.0.1:8123".parse().unwrap()));
        assert_eq!(args.mpv_socket, Some(PathBuf::from("/tmp/test.sock")));
        assert!(args.config.is_none());
    }
}
