// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AuthResponse, ChallengeRequest, ChallengeResponse, IdentityProjection, ProfileProjection,
        UserProjection, UserResponse, VerifyRequest, WalletAddress,
    },
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/challenge", post(auth::issue_challenge))
        .route("/auth/verify", post(auth::verify_login))
        .route("/auth/refresh", post(auth::refresh_session))
        .route("/users/me", get(users::me))
        .with_state(state.clone());

    let probe_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(probe_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::issue_challenge,
        auth::verify_login,
        auth::refresh_session,
        users::me,
        health::health,
        health::readiness
    ),
    components(
        schemas(
            ChallengeRequest,
            ChallengeResponse,
            VerifyRequest,
            AuthResponse,
            UserResponse,
            UserProjection,
            IdentityProjection,
            ProfileProjection,
            WalletAddress,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Challenge/response wallet authentication"),
        (name = "Users", description = "Authenticated user data"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
