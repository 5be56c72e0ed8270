use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::balance::BalanceError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Couldn't find party {0}")]
    PartyNotFound(String),

    #[error("Party {0} already exists")]
    PartyExists(String),

    #[error("Couldn't find person {0}")]
    PersonNotFound(String),

    #[error("Couldn't find item {0}")]
    ItemNotFound(String),

    #[error("Name can't be empty")]
    EmptyName,

    #[error("Price must be a positive number, got {0}")]
    InvalidPrice(f64),

    #[error("Person {0} is not part of this party")]
    UnknownPerson(String),

    #[error("An item must be shared by at least one person")]
    NoParticipants,

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::PartyNotFound(_) | AppError::PersonNotFound(_) | AppError::ItemNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::PartyExists(_) => StatusCode::CONFLICT,
            AppError::EmptyName
            | AppError::InvalidPrice(_)
            | AppError::UnknownPerson(_)
            | AppError::NoParticipants => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Balance(_) | AppError::Database(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
