//! Actix server startup + app wiring.
//!
//! Builds the shared state, background tasks, routes, middleware, and OpenAPI endpoints.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::Error;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config;
use crate::events::EventBus;
use crate::monitor::spawn_monitor;
use crate::mpv::{spawn_mpv, MpvSink};
use crate::openapi;
use crate::playback_manager::PlaybackManager;
use crate::queue_service::QueueService;
use crate::recommendations::Enricher;
use crate::state::{AppState, QueueState};
use crate::ytdlp::YtDlp;

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let bind = resolve_bind(args.bind, &cfg)?;
    let playback = config::playback_from_config(&cfg)?;
    let (ytdlp_settings, search_limit) = config::ytdlp_from_config(&cfg);
    let (mpv_spawn, spawn_player) = config::mpv_from_config(&cfg, args.mpv_socket.as_deref());
    let web_ui_dir = config::web_ui_dir_from_config(&cfg);
    let cors_origins = config::cors_origins_from_config(&cfg);
    tracing::info!(
        bind = %bind,
        mpv_socket = %mpv_spawn.socket_path.display(),
        spawn_mpv = spawn_player,
        ytdlp = %ytdlp_settings.binary.display(),
        "starting jukebox-server"
    );

    // Held for the server lifetime; dropping it kills mpv.
    let _player = if spawn_player {
        Some(spawn_mpv(&mpv_spawn).await?)
    } else {
        None
    };

    let events = EventBus::new();
    let queue = Arc::new(Mutex::new(QueueState::new(playback.default_volume)));
    let queue_service = QueueService::new(queue, events.clone());
    let ytdlp = Arc::new(YtDlp::new(ytdlp_settings));
    let sink = Arc::new(MpvSink::new(mpv_spawn.socket_path.clone()));
    let manager = PlaybackManager::new(queue_service, ytdlp.clone(), sink, playback.clone());
    if let Err(err) = manager.apply_volume().await {
        tracing::warn!(error = %err, "could not apply startup volume");
    }

    let enricher = config::recommendations_from_config(&cfg, playback.resolve_timeout)
        .map(|settings| Enricher::new(ytdlp.clone(), manager.clone(), settings));
    if enricher.is_none() {
        tracing::info!("recommendations disabled");
    }
    spawn_monitor(manager.clone(), playback.monitor_interval);

    let state = web::Data::new(AppState::new(manager, ytdlp, enricher, events, search_limit));
    if let Some(dir) = web_ui_dir.as_ref() {
        tracing::info!(path = %dir.display(), "web ui static assets enabled");
    }

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "HEAD"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }

        let mut app = App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .configure(api::configure);

        if let Some(dir) = web_ui_dir.clone() {
            app = app.service(Files::new("/", dir).index_file("index.html"));
        }

        app
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    !matches!(path, "/status" | "/queue" | "/status/stream")
}

/// Actix middleware that filters noisy paths from logging.
struct FilteredLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req.connection_info().realip_remote_addr().unwrap_or("-").to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

/// Load server config from disk, falling back to defaults when no file exists.
fn load_config(path: Option<&Path>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let auto_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")));
    match auto_path {
        Some(path) if path.exists() => {
            tracing::info!(path = %path.display(), "using config next to executable");
            config::ServerConfig::load(&path)
        }
        _ => {
            tracing::info!("no config file; using defaults");
            Ok(config::ServerConfig::default())
        }
    }
}

/// Resolve the final bind address from args + config.
fn resolve_bind(bind: Option<SocketAddr>, cfg: &config::ServerConfig) -> Result<SocketAddr> {
    if let Some(addr) = bind {
        return Ok(addr);
    }
    match config::bind_from_config(cfg)? {
        Some(addr) => Ok(addr),
        None => Ok(config::DEFAULT_BIND.parse()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_paths_are_not_logged() {
        assert!(!should_log_path("/status"));
        assert!(!should_log_path("/queue"));
        assert!(!should_log_path("/status/stream"));
        assert!(should_log_path("/add"));
        assert!(should_log_path("/control/skip"));
    }

    #[test]
    fn bind_prefers_cli_then_config_then_default() {
        let cfg = config::ServerConfig {
            bind: Some("127.0.0.1:9000".to_string()),
            ..config::ServerConfig::default()
        };
        let cli: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        assert_eq!(resolve_bind(Some(cli), &cfg).unwrap(), cli);
        assert_eq!(resolve_bind(None, &cfg).unwrap(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            resolve_bind(None, &config::ServerConfig::default()).unwrap(),
            config::DEFAULT_BIND.parse().unwrap()
        );
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/jukebox.toml"))).is_err());
    }
}
