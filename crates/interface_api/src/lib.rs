//! HTTP API Layer
//!
//! REST API for payment plans, installments and proof-of-payment review,
//! built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers per resource
//! - **Middleware**: Request logging
//! - **DTOs**: Request bodies and query strings
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(ports, settings, ProofEventFeed::new());
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::CallPolicy;
use domain_payments::{PaymentPlanService, PaymentPorts, PaymentProofLinker, ProofEventFeed, ServiceSettings};

use crate::handlers::{events, health, installments, plans, proofs, schedule};
use crate::middleware::request_logging;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub plan_service: PaymentPlanService,
    pub proof_linker: PaymentProofLinker,
    pub ports: PaymentPorts,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(ports: PaymentPorts, settings: ServiceSettings, feed: ProofEventFeed) -> Self {
        Self {
            plan_service: PaymentPlanService::new(ports.clone(), settings.clone()),
            proof_linker: PaymentProofLinker::new(ports.clone(), settings, feed),
            ports,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Deadline and retry settings for store calls
    pub fn policy(&self) -> CallPolicy {
        self.plan_service.settings().policy
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Services and ports shared by the handlers
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let plan_routes = Router::new()
        .route("/", post(plans::create_plan).get(plans::list_plans))
        .route("/:id", get(plans::get_plan).patch(plans::update_notes))
        .route("/:id/activate", post(plans::activate_plan))
        .route("/:id/supersede", post(plans::supersede_plan))
        .route("/:id/schedule", put(schedule::generate_schedule))
        .route("/:id/installments", post(installments::add_installment))
        .route(
            "/:id/installments/:number",
            patch(installments::edit_installment).delete(installments::remove_installment),
        );

    let installment_routes = Router::new()
        .route("/:id/mark-paid", post(installments::mark_paid))
        .route(
            "/:id/proofs",
            post(proofs::upload_proof)
                .get(proofs::list_proofs)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        );

    let proof_routes = Router::new()
        .route("/events", get(events::proof_events))
        .route("/:id/review", post(proofs::review_proof))
        .route("/:id/file", get(proofs::download_proof));

    let api_routes = Router::new()
        .nest("/plans", plan_routes)
        .nest("/installments", installment_routes)
        .nest("/proofs", proof_routes)
        .route("/schedules/preview", post(schedule::preview_schedule))
        .layer(axum_middleware::from_fn(request_logging));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
