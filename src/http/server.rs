//! HTTP server setup and the per-command pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with the control routes and the proxy fallback
//! - Wire up middleware (tracing)
//! - Bind server to listener with graceful shutdown
//! - Classify each request, run the barrier chain, forward upstream
//! - Relay the upstream response while capturing it into the command

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::barrier::{Barrier, BarrierChain, StabilityBarrier};
use crate::command::{CommandState, WebDriverCommand};
use crate::config::{LimitsConfig, ProxyConfig, StabilityConfig};
use crate::http::error::ProxyError;
use crate::http::upstream::{build_client, UpstreamAddress, UpstreamClient, UpstreamError};
use crate::http::{request, response};
use crate::observability::metrics;
use crate::routing::{is_proxy_command, EndpointTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<EndpointTable>,
    pub barriers: BarrierChain,
    pub client: UpstreamClient,
    pub upstream: UpstreamAddress,
    pub limits: LimitsConfig,
    pub stability: Option<Arc<StabilityBarrier>>,
}

/// HTTP server for the blocking proxy.
///
/// Barriers are added while the server is being assembled; the list is
/// frozen when the server is turned into a router.
pub struct HttpServer {
    table: EndpointTable,
    barriers: Vec<Arc<dyn Barrier>>,
    client: UpstreamClient,
    upstream: UpstreamAddress,
    limits: LimitsConfig,
    stability_config: StabilityConfig,
    stability: Option<Arc<StabilityBarrier>>,
}

impl HttpServer {
    /// Create a server forwarding to `config.upstream.address`, with the
    /// default endpoint table and no barriers.
    pub fn new(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            table: EndpointTable::webdriver(),
            barriers: Vec::new(),
            client: build_client(),
            upstream: UpstreamAddress::parse(&config.upstream.address)?,
            limits: config.limits.clone(),
            stability_config: config.stability.clone(),
            stability: None,
        })
    }

    /// Replace the endpoint table.
    pub fn with_table(mut self, table: EndpointTable) -> Self {
        self.table = table;
        self
    }

    /// Append a barrier. Barriers run in the order they were added.
    pub fn add_barrier(&mut self, barrier: Arc<dyn Barrier>) {
        tracing::debug!(
            barrier = barrier.name(),
            position = self.barriers.len(),
            "Barrier registered"
        );
        self.barriers.push(barrier);
    }

    /// Append the stability barrier and expose its toggle on the control
    /// surface. Installing twice returns the existing barrier.
    pub fn install_stability(&mut self) -> Arc<StabilityBarrier> {
        if let Some(existing) = &self.stability {
            return Arc::clone(existing);
        }
        let barrier = Arc::new(StabilityBarrier::new(
            &self.stability_config,
            self.client.clone(),
            self.upstream.clone(),
        ));
        self.add_barrier(barrier.clone());
        self.stability = Some(Arc::clone(&barrier));
        barrier
    }

    /// The upstream address handle shared with the control surface.
    pub fn upstream(&self) -> &UpstreamAddress {
        &self.upstream
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Freeze the barrier list and build the Axum router.
    pub fn into_router(self) -> Router {
        let state = AppState {
            table: Arc::new(self.table),
            barriers: BarrierChain::new(self.barriers),
            client: self.client,
            upstream: self.upstream,
            limits: self.limits,
            stability: self.stability,
        };

        Router::new()
            .merge(admin::setup_control_routes())
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.upstream.get(),
            barriers = self.barriers.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Classifies the request, runs barriers, and forwards it upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if is_proxy_command(request.uri().path()) {
        return admin::unknown_command().into_response();
    }

    let (parts, body) = request.into_parts();
    let command = Arc::new(state.table.parse_command(&parts.method, &parts.uri));

    tracing::debug!(
        command_id = %command.id(),
        kind = %command.kind(),
        method = %parts.method,
        path = %command.path(),
        "Command received"
    );

    match forward(&state, &command, &parts, body).await {
        Ok(response) => response,
        Err(e) => {
            command.fail();
            if !matches!(e, ProxyError::Barrier(_)) {
                tracing::error!(
                    command_id = %command.id(),
                    kind = %command.kind(),
                    error = %e,
                    "Command failed"
                );
                metrics::record_error(e.label());
            }
            e.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    command: &Arc<WebDriverCommand>,
    parts: &Parts,
    body: Body,
) -> Result<Response, ProxyError> {
    command.advance(CommandState::BarriersRunning);

    // Barriers may await the body, so both must make progress together.
    let (bytes, ()) = tokio::try_join!(
        request::buffer_body(command, body, state.limits.max_body_bytes),
        async { state.barriers.run(command).await.map_err(ProxyError::from) },
    )?;

    command.advance(CommandState::Forwarding);
    let upstream_request =
        request::upstream_request(&state.upstream, parts, command.path(), bytes)?;
    let upstream_response = state
        .client
        .request(upstream_request)
        .await
        .map_err(|e| ProxyError::upstream(&e))?;

    command.advance(CommandState::UpstreamResponding);
    tracing::debug!(
        command_id = %command.id(),
        status = upstream_response.status().as_u16(),
        "Relaying upstream response"
    );
    Ok(response::relay(upstream_response, Arc::clone(command)))
}
