// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Authentication endpoints: challenge, verify, refresh.

use axum::{extract::State, Json};
use chrono::Utc;

use crate::auth::challenge::{generate_challenge, generate_id};
use crate::auth::wallet::verify_wallet_signature;
use crate::auth::{Auth, AuthError};
use crate::error::ApiError;
use crate::models::{
    AuthResponse, ChallengeRequest, ChallengeResponse, UserProjection, VerifyRequest,
};
use crate::state::AppState;
use crate::storage::{ConsumeError, StoredChallenge};

/// Issue a single-use challenge bound to the caller's device public key.
#[utoipa::path(
    post,
    path = "/v1/auth/challenge",
    tag = "Auth",
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing or empty publicKey"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn issue_challenge(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    if request.public_key.trim().is_empty() {
        return Err(ApiError::bad_request("publicKey is required"));
    }

    let generated = generate_challenge()?;
    let stored = StoredChallenge {
        id: generate_id("chal")?,
        challenge: generated.challenge,
        public_key: request.public_key,
        wallet_address: None,
        used: false,
        expires_at: generated.expires_at,
        created_at: Utc::now(),
    };

    state
        .db
        .insert_challenge(&stored)
        .map_err(|e| ApiError::internal(format!("challenge insert failed: {e}")))?;

    tracing::debug!(challenge_id = %stored.id, "challenge issued");

    Ok(Json(ChallengeResponse {
        success: true,
        challenge_id: stored.id,
        challenge: stored.challenge,
        expires_at: stored.expires_at.timestamp_millis(),
    }))
}

/// Verify a wallet signature over a challenge and start a session.
///
/// The wallet signature is checked before the challenge is consumed, so a
/// bad signature leaves the challenge intact for a retry. The consume runs
/// in a single database transaction; racing requests for the same
/// challenge yield exactly one session.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Session started", body = AuthResponse),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Authentication failed"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn verify_login(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.challenge_id.trim().is_empty()
        || request.signature.trim().is_empty()
        || request.wallet_address.0.trim().is_empty()
    {
        return Err(ApiError::bad_request(
            "challengeId, signature, and walletAddress are required",
        ));
    }

    let challenge = state
        .db
        .get_challenge(&request.challenge_id)
        .map_err(|e| ApiError::internal(format!("challenge lookup failed: {e}")))?
        .ok_or(AuthError::ChallengeNotFound)?;

    if challenge.used {
        return Err(AuthError::ChallengeNotFound.into());
    }
    if Utc::now() > challenge.expires_at {
        return Err(AuthError::ChallengeExpired.into());
    }

    verify_wallet_signature(&challenge.challenge, &request.signature, &request.wallet_address)?;

    // Atomic single-use consume; the lookup above is only a fast path.
    state
        .db
        .consume_challenge(&request.challenge_id, &request.wallet_address, Utc::now())
        .map_err(|e| match e {
            ConsumeError::NotFound | ConsumeError::AlreadyUsed => AuthError::ChallengeNotFound,
            ConsumeError::Expired => AuthError::ChallengeExpired,
            ConsumeError::Db(e) => AuthError::Internal(format!("challenge consume failed: {e}")),
        })?;

    let (user, created) = state
        .db
        .resolve_or_create_user(&request.wallet_address)
        .map_err(|e| ApiError::internal(format!("user resolution failed: {e}")))?;

    let token = state
        .tokens
        .issue(&user.id, &user.wallet_address, &challenge.public_key)?;

    let projection = load_projection(&state, &user.id)?;

    tracing::info!(
        user_id = %user.id,
        new_user = created,
        "wallet authenticated"
    );

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: projection,
    }))
}

/// Re-issue the session token for an authenticated user.
///
/// The new token carries the same device public key as the old one, so the
/// proof-of-possession binding survives across refreshes.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Token refreshed", body = AuthResponse),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "User no longer exists"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn refresh_session(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<AuthResponse>, ApiError> {
    let stored = state
        .db
        .get_user(&user.user_id)
        .map_err(|e| ApiError::internal(format!("user lookup failed: {e}")))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let token = state
        .tokens
        .issue(&stored.id, &stored.wallet_address, &user.public_key)?;

    let projection = load_projection(&state, &stored.id)?;

    tracing::debug!(user_id = %stored.id, "session refreshed");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: projection,
    }))
}

fn load_projection(state: &AppState, user_id: &str) -> Result<UserProjection, ApiError> {
    state
        .db
        .user_projection(user_id)
        .map_err(|e| ApiError::internal(format!("projection load failed: {e}")))?
        .ok_or_else(|| ApiError::internal(format!("user {user_id} vanished mid-request")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::config::ServerConfig;
    use crate::models::WalletAddress;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::str::FromStr;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

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

    fn sign_challenge(challenge: &str) -> String {
        let signer = PrivateKeySigner::from_str(TEST_KEY).unwrap();
        let signature = signer.sign_message_sync(challenge.as_bytes()).unwrap();
        format!("0x{}", alloy::hex::encode(signature.as_bytes()))
    }

    async fn post_json(
        app: &axum::Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn request_challenge(app: &axum::Router) -> serde_json::Value {
        let (status, body) = post_json(
            app,
            "/v1/auth/challenge",
            serde_json::json!({"publicKey": "test-device-jwk"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn challenge_requires_public_key() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let (status, body) =
            post_json(&app, "/v1/auth/challenge", serde_json::json!({"publicKey": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn challenge_response_has_expected_shape() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let body = request_challenge(&app).await;
        assert_eq!(body["success"], true);
        assert!(body["challengeId"].as_str().unwrap().starts_with("chal_"));
        assert!(!body["challenge"].as_str().unwrap().is_empty());
        assert!(body["expiresAt"].as_i64().unwrap() > Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn full_login_flow_issues_token_and_user() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let challenge_body = request_challenge(&app).await;
        let signature = sign_challenge(challenge_body["challenge"].as_str().unwrap());

        let (status, body) = post_json(
            &app,
            "/v1/auth/verify",
            serde_json::json!({
                "challengeId": challenge_body["challengeId"],
                "signature": signature,
                "walletAddress": TEST_ADDRESS,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(
            body["user"]["walletAddress"].as_str().unwrap(),
            TEST_ADDRESS.to_lowercase()
        );

        // The issued token is bound to the device key from the challenge.
        let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.public_key, "test-device-jwk");
    }

    #[tokio::test]
    async fn verify_rejects_replayed_challenge() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let challenge_body = request_challenge(&app).await;
        let signature = sign_challenge(challenge_body["challenge"].as_str().unwrap());
        let verify_body = serde_json::json!({
            "challengeId": challenge_body["challengeId"],
            "signature": signature,
            "walletAddress": TEST_ADDRESS,
        });

        let (first, _) = post_json(&app, "/v1/auth/verify", verify_body.clone()).await;
        assert_eq!(first, StatusCode::OK);

        let (second, body) = post_json(&app, "/v1/auth/verify", verify_body).await;
        assert_eq!(second, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");
    }

    #[tokio::test]
    async fn verify_rejects_bad_signature_and_keeps_challenge() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let challenge_body = request_challenge(&app).await;
        let challenge_id = challenge_body["challengeId"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            &app,
            "/v1/auth/verify",
            serde_json::json!({
                "challengeId": challenge_id,
                "signature": sign_challenge("some other message"),
                "walletAddress": TEST_ADDRESS,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");

        // A failed signature must not burn the challenge.
        let stored = state.db.get_challenge(&challenge_id).unwrap().unwrap();
        assert!(!stored.used);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_wallet_address() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let challenge_body = request_challenge(&app).await;
        let signature = sign_challenge(challenge_body["challenge"].as_str().unwrap());

        let (status, _) = post_json(
            &app,
            "/v1/auth/verify",
            serde_json::json!({
                "challengeId": challenge_body["challengeId"],
                "signature": signature,
                "walletAddress": "0x0000000000000000000000000000000000000001",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verify_rejects_unknown_challenge() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let (status, body) = post_json(
            &app,
            "/v1/auth/verify",
            serde_json::json!({
                "challengeId": "chal_doesnotexist",
                "signature": sign_challenge("x"),
                "walletAddress": TEST_ADDRESS,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");
    }

    #[tokio::test]
    async fn verify_rejects_expired_challenge_without_consuming_it() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let stored = StoredChallenge {
            id: "chal_expired".to_string(),
            challenge: "expired-challenge".to_string(),
            public_key: "pk".to_string(),
            wallet_address: None,
            used: false,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
            created_at: Utc::now() - chrono::Duration::minutes(10),
        };
        state.db.insert_challenge(&stored).unwrap();

        let (status, body) = post_json(
            &app,
            "/v1/auth/verify",
            serde_json::json!({
                "challengeId": "chal_expired",
                "signature": sign_challenge("expired-challenge"),
                "walletAddress": TEST_ADDRESS,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication failed");

        let after = state.db.get_challenge("chal_expired").unwrap().unwrap();
        assert!(!after.used);
    }

    #[tokio::test]
    async fn repeat_login_resolves_same_user() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let mut user_ids = Vec::new();
        for _ in 0..2 {
            let challenge_body = request_challenge(&app).await;
            let signature = sign_challenge(challenge_body["challenge"].as_str().unwrap());
            let (status, body) = post_json(
                &app,
                "/v1/auth/verify",
                serde_json::json!({
                    "challengeId": challenge_body["challengeId"],
                    "signature": signature,
                    "walletAddress": TEST_ADDRESS,
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            user_ids.push(body["user"]["id"].as_str().unwrap().to_string());
        }
        assert_eq!(user_ids[0], user_ids[1]);
    }

    #[tokio::test]
    async fn refresh_reissues_token_with_same_binding() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        let (user, _) = state
            .db
            .resolve_or_create_user(&WalletAddress::from(TEST_ADDRESS))
            .unwrap();
        let token = state
            .tokens
            .issue(&user.id, &user.wallet_address, "device-jwk")
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/refresh")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.public_key, "device-jwk");
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_returns_404() {
        let (state, _dir) = test_state();
        let app = api::router(state.clone());

        // Token for a user that was never provisioned.
        let token = state
            .tokens
            .issue("user_ghost", "0xAAA", "device-jwk")
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/refresh")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn refresh_without_token_returns_401() {
        let (state, _dir) = test_state();
        let app = api::router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/refresh")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
