use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Billing flow not completed")]
    FlowIncomplete,

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthenticated => ErrorCode::Unauthenticated,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            AppError::UserNotFound => ErrorCode::UserNotFound,
            AppError::FlowIncomplete => ErrorCode::FlowIncomplete,
            AppError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            AppError::Provider(_) => ErrorCode::ProviderError,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    Unauthenticated,
    InvalidSignature,
    InvalidPlan,
    UserNotFound,
    FlowIncomplete,
    SubscriptionNotFound,
    ProviderError,
    DatabaseError,
    InvalidInput,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidPlan => "INVALID_PLAN",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::FlowIncomplete => "FLOW_INCOMPLETE",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
