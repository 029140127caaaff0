use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please select a valid location from the list (got \"{0}\")")]
    UnknownLocation(String),

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("prediction request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("prediction service returned HTTP {0}")]
    Status(u16),

    #[error("prediction service returned an unusable price: {0}")]
    InvalidPrice(f64),

    #[error("no prediction available yet")]
    NoPrediction,

    #[error("invalid loan parameters: {0}")]
    InvalidLoan(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Validation failures keep the form as-is and tell the user what to fix.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::UnknownLocation(_) | AppError::InvalidField { .. })
    }

    /// Failures on the service side, including a response with an unusable price.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::Status(_) | AppError::InvalidPrice(_))
    }

    /// Text shown to the user. Transport failures collapse into one generic message.
    pub fn user_message(&self) -> String {
        if self.is_transport() {
            "Something went wrong. Please check the prediction service and try again.".to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
