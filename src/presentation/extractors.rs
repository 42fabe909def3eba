// Request extractors that answer malformed input with the JSON error body
use crate::presentation::error::ApiError;
use axum::Json;
use axum::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// Query string deserialized into `T`; failures become `INVALID_QUERY`.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// JSON body deserialized into `T`; failures become `INVALID_BODY`.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("INVALID_QUERY", rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("INVALID_BODY", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Paging {
        limit: Option<usize>,
    }

    #[tokio::test]
    async fn test_query_rejection_is_invalid_query() {
        let (mut parts, _) = HttpRequest::get("/x?limit=abc").body(()).unwrap().into_parts();
        let err = ApiQuery::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        match err {
            ApiError::BadRequest { code, message } => {
                assert_eq!(code, "INVALID_QUERY");
                assert!(message.starts_with("Failed to deserialize query string"), "{message}");
            }
            other => panic!("expected bad request, got {other:?}"),
        }

        let (mut parts, _) = HttpRequest::get("/x?limit=5").body(()).unwrap().into_parts();
        let ApiQuery(paging) = ApiQuery::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(paging.limit, Some(5));
    }

    #[tokio::test]
    async fn test_json_rejection_is_invalid_body() {
        let request = HttpRequest::post("/x")
            .header("content-type", "application/json")
            .body(Body::from("{\"limit\": "))
            .unwrap();
        let err = ApiJson::<Paging>::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { ref code, .. } if code == "INVALID_BODY"));
    }
}
