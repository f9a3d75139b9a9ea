use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::clients::ClientServiceError;
use crate::application::error::{ErrorKind, ErrorReport};
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const VALIDATION: &str = "validation_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct KindMapping {
    kind: ErrorKind,
    status: StatusCode,
    code: &'static str,
    message: &'static str,
}

const KIND_TABLE: [KindMapping; 4] = [
    KindMapping {
        kind: ErrorKind::Validation,
        status: StatusCode::BAD_REQUEST,
        code: codes::VALIDATION,
        message: "Request could not be validated",
    },
    KindMapping {
        kind: ErrorKind::NotFound,
        status: StatusCode::NOT_FOUND,
        code: codes::NOT_FOUND,
        message: "Client not found",
    },
    KindMapping {
        kind: ErrorKind::Conflict,
        status: StatusCode::CONFLICT,
        code: codes::CONFLICT,
        message: "Client already exists",
    },
    KindMapping {
        kind: ErrorKind::Infrastructure,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: codes::INTERNAL,
        message: "Internal server error",
    },
];

fn mapping_for(kind: ErrorKind) -> KindMapping {
    let row = match kind {
        ErrorKind::Validation => 0,
        ErrorKind::NotFound => 1,
        ErrorKind::Conflict => 2,
        ErrorKind::Infrastructure => 3,
    };
    KIND_TABLE[row]
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    mapping_for(kind).status
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn not_found(message: &'static str) -> Self {
        let mapping = mapping_for(ErrorKind::NotFound);
        Self {
            status: mapping.status,
            code: mapping.code,
            message,
            hint: None,
            report: ErrorReport::from_message(SOURCE, mapping.status, message),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ClientServiceError> for ApiError {
    fn from(err: ClientServiceError) -> Self {
        let kind = err.kind();
        let mapping = mapping_for(kind);
        // Infrastructure details stay in the logs.
        let hint = (kind != ErrorKind::Infrastructure).then(|| err.to_string());
        Self {
            status: mapping.status,
            code: mapping.code,
            message: mapping.message,
            hint,
            report: ErrorReport::from_error(SOURCE, mapping.status, &err),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ClientServiceError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let hint = rejection.body_text();
        Self {
            status,
            code: codes::VALIDATION,
            message: "Request body could not be parsed",
            report: ErrorReport::from_message(SOURCE, status, hint.clone()),
            hint: Some(hint),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::CacheError;
    use crate::application::repos::RepoError;

    #[test]
    fn every_kind_resolves_to_its_own_row() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Infrastructure,
        ] {
            assert_eq!(mapping_for(kind).kind, kind);
        }
    }

    #[test]
    fn kinds_map_to_expected_statuses() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::Infrastructure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn infrastructure_errors_hide_their_detail() {
        let err = ApiError::from(ClientServiceError::from(CacheError::Unavailable(
            "10.0.0.5:6379 refused".into(),
        )));
        assert_eq!(err.code(), codes::INTERNAL);
        assert_eq!(err.hint, None);
        assert!(err.report.messages[0].contains("refused"));
    }

    #[test]
    fn conflicts_keep_their_hint() {
        let err = ApiError::from(ClientServiceError::from(RepoError::Duplicate {
            constraint: "clients_email_key".into(),
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.hint.as_deref().unwrap_or("").contains("clients_email_key"));
    }
}
