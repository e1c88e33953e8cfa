#[cfg(test)]
mod tests {
    use crate::cache::CacheError;
    use crate::error::{error_body, AppError, AppResult, OptionExt};
    use crate::storage::StorageError;
    use crate::tests::body_json;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::NotFound("Resource not found".to_string());
        assert_eq!(format!("{}", error), "Not found: Resource not found");

        let error = AppError::RequestTimeout { timeout_ms: 250 };
        assert_eq!(format!("{}", error), "Request timed out after 250 ms");

        let error = AppError::ValidationError { field: "email".into(), message: "must contain @".into() };
        assert_eq!(format!("{}", error), "Validation error on field 'email': must contain @");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Cache("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::RequestTimeout { timeout_ms: 1 }, StatusCode::REQUEST_TIMEOUT),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{}", error);
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::NotFound("User 7 not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;

        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "User 7 not found");
        assert!(body["error"].get("details").is_none());
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("password=hunter2")).into_response();
        let body = body_json(response).await;

        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal server error occurred");
        assert!(body["error"]["details"]["error_id"].as_str().is_some());
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_validation_and_timeout_details() {
        let body = body_json(
            AppError::ValidationError { field: "age".into(), message: "must be positive".into() }.into_response(),
        )
        .await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "age");

        let body = body_json(AppError::RequestTimeout { timeout_ms: 1500 }.into_response()).await;
        assert_eq!(body["error"]["code"], "REQUEST_TIMEOUT");
        assert_eq!(body["error"]["details"]["timeout_ms"], 1500);
    }

    #[test]
    fn test_error_body_helper() {
        let body = error_body(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "nope");
        assert_eq!(body["status"], 405);
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert!(matches!(app_error, AppError::IoError(ref msg) if msg.contains("File not found")));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let app_error: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(app_error, AppError::NotFound(_)));

        let app_error: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(app_error, AppError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_from_sqlx_unique_violation() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (name TEXT UNIQUE)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t VALUES ('a')").execute(&pool).await.unwrap();
        let err = sqlx::query("INSERT INTO t VALUES ('a')").execute(&pool).await.unwrap_err();

        let app_error: AppError = err.into();
        assert!(matches!(app_error, AppError::Conflict(_)));
    }

    #[test]
    fn test_from_cache_error() {
        let app_error: AppError = CacheError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(app_error, AppError::Cache(_)));
        assert_eq!(app_error.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bad_json = serde_json::from_str::<u32>("nope").unwrap_err();
        let app_error: AppError = CacheError::from(bad_json).into();
        assert!(matches!(app_error, AppError::Internal(_)));
    }

    #[test]
    fn test_from_storage_error() {
        let app_error: AppError = StorageError::NotFound("avatars/1.png".into()).into();
        assert!(matches!(app_error, AppError::NotFound(ref m) if m.contains("avatars/1.png")));

        let app_error: AppError = StorageError::InvalidKey("empty".into()).into();
        assert!(matches!(app_error, AppError::InvalidInput(_)));

        let app_error: AppError = StorageError::PresignUnsupported.into();
        assert!(matches!(app_error, AppError::Storage(_)));
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_not_found("Item").unwrap(), 42);

        let none: Option<i32> = None;
        let result: AppResult<i32> = none.ok_or_not_found("Item");
        assert!(matches!(result, Err(AppError::NotFound(ref m)) if m == "Item not found"));
    }
}
