// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use strava_power::error::AppError;

#[test]
fn test_is_strava_token_error_matches() {
    let err = AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string());
    assert!(err.is_strava_token_error());
}

#[test]
fn test_is_strava_token_error_no_match() {
    let err = AppError::StravaApi("HTTP 500: Internal Server Error".to_string());
    assert!(!err.is_strava_token_error());

    assert!(!AppError::RateLimited.is_strava_token_error());

    let err = AppError::InvalidArgument("Bad Request".to_string());
    assert!(!err.is_strava_token_error());
}

#[test]
fn test_status_codes() {
    let cases = [
        (
            AppError::InvalidArgument("seconds".into()),
            StatusCode::BAD_REQUEST,
        ),
        (AppError::NotFound("Activity 1".into()), StatusCode::NOT_FOUND),
        (
            AppError::StoreWrite("disk full".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (AppError::StravaApi("HTTP 503".into()), StatusCode::BAD_GATEWAY),
        (AppError::Conflict("sync".into()), StatusCode::CONFLICT),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        let label = err.to_string();
        assert_eq!(err.into_response().status(), expected, "{}", label);
    }
}

#[tokio::test]
async fn test_internal_details_not_exposed() {
    let response = AppError::Internal(anyhow::anyhow!("secret path /var/lib")).into_response();
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], "internal_error");
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_invalid_argument_carries_details() {
    let response = AppError::InvalidArgument("window must be positive".into()).into_response();
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], "invalid_argument");
    assert_eq!(json["details"], "window must be positive");
}
