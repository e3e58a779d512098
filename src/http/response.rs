//! Response mapping for the host API.
//!
//! # Responsibilities
//! - Map registry errors to HTTP status codes
//! - Render errors as a small JSON body
//!
//! # Design Decisions
//! - User errors (bad id/address) → 400, duplicate → 409, unknown key → 404
//! - Messages come from the error's Display impl; nothing internal leaks

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::monitor::RegistryError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Registry error carried to the HTTP layer.
#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RegistryError::InvalidAddress { .. } | RegistryError::InvalidId(_) => StatusCode::BAD_REQUEST,
            RegistryError::DuplicateHost(_) => StatusCode::CONFLICT,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody { error: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}
