// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated sessions.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(session): Auth) -> impl IntoResponse {
//!     // session is AuthenticatedSession
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{claims::verify_session_token, AuthError, AuthenticatedSession};
use crate::state::AppState;

/// Extractor for authenticated sessions.
///
/// Validates the HS256 session token from the `Authorization: Bearer`
/// header against `SESSION_SECRET`.
pub struct Auth(pub AuthenticatedSession);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let session = verify_session_token(token, &state.config.auth.session_secret)?;
        Ok(Auth(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issue_session_token;
    use crate::state::tests::test_state;
    use axum::http::Request;
    use chrono::Utc;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn requires_auth_header() {
        let (state, _dir) = test_state();
        let result = Auth::from_request_parts(&mut parts_with(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn rejects_non_bearer_header() {
        let (state, _dir) = test_state();
        let result = Auth::from_request_parts(&mut parts_with(Some("Basic abc")), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn accepts_issued_token() {
        let (state, _dir) = test_state();
        let (token, _) = issue_session_token(
            "user-1",
            "0xabc",
            84532,
            Utc::now(),
            3600,
            &state.config.auth.session_secret,
        )
        .unwrap();

        let header = format!("Bearer {token}");
        let Auth(session) = Auth::from_request_parts(&mut parts_with(Some(&header)), &state)
            .await
            .unwrap();
        assert_eq!(session.user_id, "user-1");
    }
}
