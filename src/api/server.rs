//! HTTP API server with SSE support

use super::{
    auth::Authenticated,
    error::ApiResult,
    events::{Event, EventBroadcaster},
    handlers,
};
use crate::services::Lms;
use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Sse,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::{wrappers::BroadcastStream, StreamExt as _};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Interval between expired-session sweeps
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Seconds between heartbeat events
    pub heartbeat_secs: u64,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
            heartbeat_secs: 15,
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub lms: Arc<Lms>,
    /// Instance ID
    pub instance_id: String,
}

impl AppState {
    pub fn new(lms: Arc<Lms>) -> Self {
        Self {
            lms,
            instance_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        }
    }

    fn events(&self) -> &EventBroadcaster {
        self.lms.events()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/me/enrollments", get(handlers::my_enrollments))
        .route("/me/achievements", get(handlers::my_achievements))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/users/:user_id", get(handlers::get_user))
        .route("/users/:user_id/role", put(handlers::set_role))
        .route(
            "/users/:user_id/achievements",
            get(handlers::user_achievements),
        )
        .route(
            "/users/:user_id/dashboard",
            get(handlers::instructor_dashboard),
        )
        // Catalog and authoring
        .route(
            "/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/:course_id",
            get(handlers::get_course)
                .patch(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route("/courses/:course_id/publish", post(handlers::publish_course))
        .route("/courses/:course_id/archive", post(handlers::archive_course))
        .route("/courses/:course_id/outline", get(handlers::course_outline))
        .route("/courses/:course_id/modules", post(handlers::add_module))
        .route("/modules/:module_id", delete(handlers::delete_module))
        .route("/modules/:module_id/lessons", post(handlers::add_lesson))
        .route(
            "/lessons/:lesson_id",
            get(handlers::get_lesson).delete(handlers::delete_lesson),
        )
        // Enrollment and progress
        .route(
            "/courses/:course_id/enroll",
            post(handlers::enroll).delete(handlers::unenroll_self),
        )
        .route(
            "/courses/:course_id/enrollments",
            get(handlers::list_enrollments),
        )
        .route(
            "/courses/:course_id/enrollments/:user_id",
            get(handlers::get_enrollment).delete(handlers::remove_enrollment),
        )
        .route("/lessons/:lesson_id/complete", post(handlers::complete_lesson))
        // Grading
        .route(
            "/lessons/:lesson_id/submissions",
            get(handlers::lesson_submissions).post(handlers::submit_assignment),
        )
        .route(
            "/lessons/:lesson_id/attempts",
            get(handlers::quiz_attempts).post(handlers::attempt_quiz),
        )
        .route(
            "/submissions/:submission_id/grade",
            put(handlers::grade_submission),
        )
        .route(
            "/courses/:course_id/submissions/:user_id",
            get(handlers::user_submissions),
        )
        .route(
            "/courses/:course_id/grades/:user_id",
            get(handlers::course_grade),
        )
        // Analytics
        .route("/courses/:course_id/stats", get(handlers::course_stats))
        .route(
            "/courses/:course_id/leaderboard",
            get(handlers::leaderboard),
        )
        // Event streaming
        .route("/events", get(events_handler))
        // Health check
        .route("/health", get(health_handler))
        // State
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    /// Shutdown signal for background tasks
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    /// Background task handles for cleanup
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// Create new API server
    pub fn new(config: ApiServerConfig, lms: Arc<Lms>) -> Self {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            state: AppState::new(lms),
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Get event broadcaster
    pub fn broadcaster(&self) -> &EventBroadcaster {
        self.state.events()
    }

    /// Get instance ID
    pub fn instance_id(&self) -> &str {
        &self.state.instance_id
    }

    fn spawn_background_tasks(&mut self) {
        // Heartbeat
        let events = self.state.events().clone();
        let instance_id = self.state.instance_id.clone();
        let period = Duration::from_secs(self.config.heartbeat_secs.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        events.publish(Event::heartbeat(instance_id.clone()));
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Heartbeat task received shutdown signal");
                        break;
                    }
                }
            }
        }));

        // Expired session sweep
        let lms = self.state.lms.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = lms.purge_expired_sessions().await {
                            warn!("Session purge failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Session purge task received shutdown signal");
                        break;
                    }
                }
            }
        }));
    }

    /// Serve until Ctrl-C
    pub async fn serve(mut self) -> anyhow::Result<()> {
        let router = router(self.state.clone());

        self.state
            .events()
            .publish(Event::session_started(self.state.instance_id.clone()));
        self.spawn_background_tasks();

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", self.config.addr, e))?;
        info!(
            "API server [{}] listening on http://{}",
            self.state.instance_id,
            listener.local_addr()?
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server [{}] stopped", self.state.instance_id);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// SSE events handler; each client only sees events it may read
async fn events_handler(
    State(state): State<AppState>,
    auth: Authenticated,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>>> {
    let actor = auth.actor();
    let managed = state.lms.managed_course_ids(&actor).await?;
    debug!("New SSE client connected: {}", actor.id);

    let rx = state.events().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.is_visible_to(&actor, &managed) => {
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok(SseEvent::default().data(data).id(event.id)))
        }
        Ok(_) => None,
        Err(_) => None, // Skip lagged messages
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
    subscribers: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        subscribers: state.events().subscriber_count(),
    })
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        // Send shutdown signal to background tasks
        let _ = self.shutdown_tx.send(());

        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        debug!("ApiServer dropped - background tasks aborted");
    }
}
