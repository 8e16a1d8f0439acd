use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Success envelope: `{ success, message, status_code, data }`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, data, StatusCode::OK)
    }

    pub fn with_status(message: impl Into<String>, data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            message: message.into(),
            status_code,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return crate::error::ApiError::internal_server_error("Failed to format response").into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "message": self.message,
            "status_code": self.status_code.as_u16(),
            "data": data_value
        });

        (self.status_code, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wraps_data_in_envelope() {
        let response = ApiResponse::created("Lead created", json!({ "id": 1 })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "success": true, "message": "Lead created", "status_code": 201, "data": { "id": 1 } })
        );
    }
}
