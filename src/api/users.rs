// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::auth::DpopBound;
use crate::error::ApiError;
use crate::models::UserResponse;
use crate::state::AppState;

/// Fetch the authenticated user's projection.
///
/// Requires both a valid session token and a fresh DPoP proof signed by the
/// device key the token is bound to.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "User no longer exists"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    DpopBound(user): DpopBound,
) -> Result<Json<UserResponse>, ApiError> {
    let projection = state
        .db
        .user_projection(&user.user_id)
        .map_err(|e| ApiError::internal(format!("projection load failed: {e}")))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse {
        success: true,
        user: projection,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api;
    use crate::auth::proof::{generate_nonce, generate_proof};
    use crate::config::ServerConfig;
    use crate::models::WalletAddress;
    use crate::state::AppState;
    use crate::storage::StoredIdentity;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use p256::elliptic_curve::rand_core::OsRng;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: temp_dir.path().to_path_buf(),
            jwt_secret: "test-secret".to_string(),
        };
        (AppState::from_config(&config).unwrap(), temp_dir)
    }

    fn device_keypair() -> (p256::ecdsa::SigningKey, String) {
        let secret = p256::SecretKey::random(&mut OsRng);
        let jwk = secret.public_key().to_jwk_string();
        (p256::ecdsa::SigningKey::from(&secret), jwk)
    }

    #[tokio::test]
    async fn me_returns_projection_with_proof() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let (user, _) = state
            .db
            .resolve_or_create_user(&WalletAddress::from("0xAAA"))
            .unwrap();
        state
            .db
            .set_identity(&StoredIdentity {
                user_id: user.id.clone(),
                number: "7".to_string(),
                is_active: true,
            })
            .unwrap();

        let (signing_key, jwk) = device_keypair();
        let token = state
            .tokens
            .issue(&user.id, &user.wallet_address, &jwk)
            .unwrap();
        let nonce = generate_nonce().unwrap();
        let proof = generate_proof(&signing_key, &jwk, "GET", "/v1/users/me", &nonce).unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/v1/users/me")
            .header("Authorization", format!("Bearer {token}"))
            .header("DPoP", proof)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], user.id.as_str());
        assert_eq!(body["user"]["identity"]["number"], "7");
    }

    #[tokio::test]
    async fn me_without_proof_returns_401() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let (user, _) = state
            .db
            .resolve_or_create_user(&WalletAddress::from("0xAAA"))
            .unwrap();
        let token = state
            .tokens
            .issue(&user.id, &user.wallet_address, "jwk")
            .unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/v1/users/me")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Authentication failed");
    }
}
