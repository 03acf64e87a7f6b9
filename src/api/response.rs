//! Error responses and status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::archive::ArchiveErrorCode;
use crate::promotion::PromotionError;
use crate::reconcile::ReconcileError;
use crate::registry::RegistryError;
use crate::restore::RestoreError;
use crate::service::ServiceError;

/// JSON error body: a human message plus a stable code when the failing
/// subsystem defines one.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Wrapper so handlers can use `?` on service results.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let code = error_code(&self.0);
        let body = ErrorResponse {
            error: self.0.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::TargetBusy(_) => StatusCode::CONFLICT,
        ServiceError::SchemaInvalid { .. } => StatusCode::CONFLICT,

        ServiceError::Registry(RegistryError::UnknownTenant(_)) => StatusCode::NOT_FOUND,
        ServiceError::Registry(RegistryError::TenantExists(_)) => StatusCode::CONFLICT,
        ServiceError::Registry(RegistryError::NoTempSchema(_)) => StatusCode::CONFLICT,

        ServiceError::Archive(e) => match e.code() {
            ArchiveErrorCode::UvArchiveNotFound => StatusCode::NOT_FOUND,
            ArchiveErrorCode::UvArchiveSourceMissing => StatusCode::NOT_FOUND,
            ArchiveErrorCode::UvArchiveRemote => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },

        ServiceError::Restore(RestoreError::ArchiveNotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::Restore(RestoreError::Registry(RegistryError::UnknownTenant(_))) => {
            StatusCode::NOT_FOUND
        }

        ServiceError::Promotion(PromotionError::NoTempSchema(_)) => StatusCode::CONFLICT,
        ServiceError::Promotion(PromotionError::Registry(RegistryError::UnknownTenant(_))) => {
            StatusCode::NOT_FOUND
        }

        ServiceError::Reconcile(ReconcileError::SourceMissing(_)) => StatusCode::NOT_FOUND,

        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_code(error: &ServiceError) -> Option<String> {
    match error {
        ServiceError::Archive(e) => Some(e.code().as_str().to_string()),
        _ => None,
    }
}

/// 422 for malformed path or query values (unknown entity type, unknown
/// strategy).
pub fn unprocessable(message: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: message.into(),
            code: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveError;
    use uuid::Uuid;

    #[test]
    fn test_busy_maps_to_conflict() {
        let status = status_for(&ServiceError::TargetBusy(Uuid::nil()));
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_unknown_tenant_maps_to_not_found() {
        let status = status_for(&ServiceError::Registry(RegistryError::UnknownTenant(
            Uuid::nil(),
        )));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_archive_error_carries_code() {
        let error = ServiceError::Archive(ArchiveError::not_found("a1"));
        assert_eq!(status_for(&error), StatusCode::NOT_FOUND);
        assert_eq!(error_code(&error).as_deref(), Some("UV_ARCHIVE_NOT_FOUND"));
    }

    #[test]
    fn test_no_temp_schema_maps_to_conflict() {
        let status = status_for(&ServiceError::Promotion(PromotionError::NoTempSchema(
            Uuid::nil(),
        )));
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
