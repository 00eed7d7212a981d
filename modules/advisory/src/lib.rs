//! Read API over published advisories: list, get, RSS.

pub mod endpoints;
pub mod model;
pub mod rss;
pub mod service;

pub use service::AdvisoryService;

use actix_web::{body::BoxBody, http::StatusCode, HttpResponse, ResponseError};
use errata_common::error::ErrorInformation;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] errata_store::Error),
    #[error("invalid advisory name {0:?}")]
    InvalidName(String),
    #[error("could not serialize feed: {0}")]
    Feed(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidName(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::InvalidName(name) => HttpResponse::BadRequest()
                .json(ErrorInformation::new("InvalidAdvisoryName", name)),
            Self::Store(err) => HttpResponse::InternalServerError()
                .json(ErrorInformation::new("Database error", err)),
            Self::Feed(err) => HttpResponse::InternalServerError()
                .json(ErrorInformation::new("Feed error", err)),
        }
    }
}
