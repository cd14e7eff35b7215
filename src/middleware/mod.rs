use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;

/// Identity resolved from a bearer token. Token issuance lives in an
/// external auth service; this extractor only validates the signature and
/// expiry and unpacks the claims.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_staff: bool,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: i64,
    #[serde(default)]
    is_staff: bool,
    #[allow(dead_code)]
    exp: usize,
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}

// Bearer auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = bearer_token(auth_header).ok_or(ApiError::Unauthenticated)?;

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| ApiError::Unauthenticated)?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            is_staff: data.claims.is_staff,
        })
    }
}

/// Query extractor whose rejection goes through the standard JSON error
/// envelope instead of axum's plain-text 400.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: i64,
        is_staff: bool,
        exp: usize,
    }

    #[test]
    fn bearer_token_requires_prefix() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }

    #[test]
    fn claims_round_trip() {
        let secret = b"test-secret";
        let token = encode(
            &Header::default(),
            &TestClaims { sub: 42, is_staff: true, exp: 4102444800 },
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let data = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(data.claims.sub, 42);
        assert!(data.claims.is_staff);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode(
            &Header::default(),
            &TestClaims { sub: 1, is_staff: false, exp: 4102444800 },
            &EncodingKey::from_secret(b"right"),
        )
        .unwrap();

        let result = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"wrong"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[derive(Debug, Deserialize)]
    struct PageParams {
        page: Option<u32>,
    }

    async fn extract_page_params(uri: &str) -> Result<PageParams, ApiError> {
        let (mut parts, _) = axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        <ApiQuery<PageParams> as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .map(|ApiQuery(params)| params)
    }

    #[tokio::test]
    async fn api_query_passes_valid_params_through() {
        let params = extract_page_params("/reservations?page=3").await.unwrap();
        assert_eq!(params.page, Some(3));
    }

    #[tokio::test]
    async fn api_query_maps_bad_params_to_validation_error() {
        let err = extract_page_params("/reservations?page=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
