use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use ledger_engine::{CommissionError, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("Missing or invalid API key")]
    Unauthorized,
    #[error("Payload exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::TransactionNotFound(_) | LedgerError::TransactionIdNotFound(_) | LedgerError::WalletNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            LedgerError::DuplicateTransaction(_) | LedgerError::InvalidTransition(_) => Self::Conflict(e.to_string()),
            LedgerError::InvalidAmount(_) => Self::InvalidRequestBody(e.to_string()),
            LedgerError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CommissionError> for ServerError {
    fn from(e: CommissionError) -> Self {
        match e {
            CommissionError::CycleNotFound(_) | CommissionError::EarningNotFound(_) => Self::NoRecordFound(e.to_string()),
            CommissionError::InvalidCycleState { .. }
            | CommissionError::OverlappingCycle(_)
            | CommissionError::EarningNotPayable(..) => Self::Conflict(e.to_string()),
            CommissionError::InvalidCyclePeriod(_) | CommissionError::InvalidPercentage(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            CommissionError::DatabaseError(_) | CommissionError::CalculationError(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}
