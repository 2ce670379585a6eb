use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        extract::{Query, State},
        http::{StatusCode, header},
        response::{IntoResponse, Json, Response},
        routing::get,
    },
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{error, info, warn},
};

use {
    waypost_channels::{Inbound, Outbound},
    waypost_common::Error,
    waypost_roster::RosterStore,
};

use crate::{commands::CommandRouter, gate::AccessGate, state::GatewayState};

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/info", get(info_handler))
        .route("/stat", get(stat_handler))
        .route("/rawstat", get(rawstat_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Start the gateway: probe endpoints over HTTP, plus the Telegram transport
/// when the channel is configured.
pub async fn start_gateway(bind: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = waypost_config::discover_and_load();
    config.channel.apply_env_overrides();

    // Cannot run without durable state; startup I/O failure is fatal.
    let roster = Arc::new(RosterStore::open(config.channel.roster_path())?);
    let state = GatewayState::new(&config, Arc::clone(&roster));

    let transport = start_transport(&config, &roster);

    let app = build_gateway_app(Arc::clone(&state));
    let bind = bind.unwrap_or_else(|| config.gateway.bind.clone());
    let port = port.unwrap_or(config.gateway.port);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("waypost gateway v{}", state.version);
    info!("listening on http://{addr}");
    if let Some(ip) = public_ip().await {
        info!("public address http://{ip}:{port}");
    }
    info!(members = roster.len(), "roster loaded");

    // One notify fans out to the graceful-drain trigger and the grace timer.
    let shutdown = Arc::new(tokio::sync::Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutdown signal received, draining");
            shutdown.notify_waiters();
        });
    }
    let drain = {
        let shutdown = Arc::clone(&shutdown);
        async move { shutdown.notified().await }
    };
    let deadline = {
        let shutdown = Arc::clone(&shutdown);
        async move {
            shutdown.notified().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        }
    };

    tokio::select! {
        result = axum::serve(listener, app).with_graceful_shutdown(drain) => result?,
        () = deadline => warn!("grace period elapsed, aborting in-flight requests"),
    }

    if let Some(handle) = transport {
        handle.abort();
    }
    info!("gateway stopped");
    Ok(())
}

/// Spawn the Telegram transport when token, owner, and access code are all
/// configured. Probe endpoints work without it.
fn start_transport(
    config: &waypost_config::WaypostConfig,
    roster: &Arc<RosterStore>,
) -> Option<tokio::task::JoinHandle<()>> {
    let channel = &config.channel;
    let (Some(token), Some(owner_id), Some(access_code)) = (
        channel.bot_token.clone(),
        channel.owner_id,
        channel.access_code.clone(),
    ) else {
        info!("channel not fully configured; running probe endpoints only");
        return None;
    };

    let bot = waypost_telegram::bot(&token);
    let outbound: Arc<dyn Outbound> =
        Arc::new(waypost_telegram::TelegramOutbound::new(bot.clone()));
    let gate = Arc::new(AccessGate::new(owner_id, access_code, Arc::clone(roster)));
    let router: Arc<dyn Inbound> = Arc::new(CommandRouter::new(
        gate,
        Arc::clone(roster),
        outbound,
    ));

    info!(owner = owner_id, "starting telegram transport");
    Some(tokio::spawn(async move {
        if let Err(e) = waypost_telegram::run_transport(bot, router).await {
            error!(error = %e, "telegram transport exited");
        }
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Best-effort public address lookup for the startup banner.
async fn public_ip() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .ok()?;
    let text = client
        .get("https://ifconfig.me/ip")
        .send()
        .await
        .ok()?
        .text()
        .await
        .ok()?;
    let ip = text.trim();
    (!ip.is_empty()).then(|| ip.to_string())
}

// ── Raw query validation ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawStatParams {
    mode: Option<String>,
    limit: Option<String>,
}

/// Validate the raw traffic query before anything is executed.
///
/// `limit` defaults to 30 and must be an integer within the ceiling; `mode`
/// defaults to `d` and must be a short alphanumeric vnstat view selector
/// (never an arbitrary flag).
fn parse_raw_query(params: &RawStatParams, ceiling: u32) -> Result<(String, u32), Error> {
    let mode = params.mode.clone().unwrap_or_else(|| "d".into());
    if mode.is_empty() || mode.len() > 2 || !mode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!("unknown mode: {mode}")));
    }

    let limit = match &params.limit {
        None => 30,
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("limit must be an integer, got: {raw}")))?,
    };
    if limit > ceiling {
        return Err(Error::Validation(format!(
            "limit {limit} exceeds ceiling {ceiling}"
        )));
    }

    Ok((mode, limit))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn info_handler(State(state): State<AppState>) -> String {
    state.gateway.info_cache.get().await
}

async fn stat_handler(State(state): State<AppState>) -> impl IntoResponse {
    let payload = state.gateway.stat_cache.get().await;
    ([(header::CONTENT_TYPE, "application/json")], payload)
}

async fn rawstat_handler(
    Query(params): Query<RawStatParams>,
    State(state): State<AppState>,
) -> Response {
    let (mode, limit) = match parse_raw_query(&params, state.gateway.raw_limit_ceiling) {
        Ok(query) => query,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.gateway.raw_traffic(&mode, limit).await {
        Ok(payload) => {
            ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
        },
        Err(e) => {
            warn!(error = %e, "raw traffic query failed");
            (StatusCode::BAD_GATEWAY, "probe unavailable").into_response()
        },
    }
}

async fn ping_handler() -> &'static str {
    "pong"
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "hostname": state.gateway.hostname,
        "members": state.gateway.roster.len(),
    }))
}

#[cfg(test)]
mod tests {
    use {
        axum::{body::Body, http::Request},
        tower::ServiceExt,
    };

    use waypost_config::WaypostConfig;

    use super::*;

    fn params(mode: Option<&str>, limit: Option<&str>) -> RawStatParams {
        RawStatParams {
            mode: mode.map(Into::into),
            limit: limit.map(Into::into),
        }
    }

    #[test]
    fn raw_query_ceiling() {
        // One above the ceiling is rejected, the ceiling itself accepted.
        assert!(parse_raw_query(&params(None, Some("91")), 90).is_err());
        let (mode, limit) = parse_raw_query(&params(None, Some("90")), 90).unwrap();
        assert_eq!((mode.as_str(), limit), ("d", 90));
    }

    #[test]
    fn raw_query_defaults() {
        let (mode, limit) = parse_raw_query(&params(None, None), 90).unwrap();
        assert_eq!((mode.as_str(), limit), ("d", 30));
    }

    #[test]
    fn raw_query_rejects_garbage() {
        assert!(parse_raw_query(&params(None, Some("many")), 90).is_err());
        assert!(parse_raw_query(&params(None, Some("-1")), 90).is_err());
        assert!(parse_raw_query(&params(Some("--config"), None), 90).is_err());
        assert!(parse_raw_query(&params(Some(""), None), 90).is_err());
        assert!(parse_raw_query(&params(Some("h"), Some("24")), 90).is_ok());
    }

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let roster =
            Arc::new(RosterStore::open(dir.path().join("users.db")).unwrap());
        let state = GatewayState::new(&WaypostConfig::default(), roster);
        build_gateway_app(state)
    }

    #[tokio::test]
    async fn ping_pongs() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test]
    async fn health_reports_membership() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["members"], 0);
    }

    #[tokio::test]
    async fn oversized_rawstat_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/rawstat?limit=91")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
