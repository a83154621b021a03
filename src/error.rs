use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignupError {
    // Storage errors
    #[error("event '{name}' does not exist")]
    TrialNotExist { name: String },

    #[error("record '{key}' is corrupt: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize record: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("storage failure: {source}")]
    Storage {
        #[from]
        source: sled::Error,
    },

    #[error("cannot write in a read-only transaction")]
    ReadOnlyTransaction,

    #[error("transaction is already closed")]
    TransactionClosed,

    // Validation errors
    #[error("'{name}' is not the name of a setting")]
    UnknownSetting { name: String },

    #[error("unknown role '{role}'")]
    UnknownRole { role: String },

    #[error("{message}")]
    Validation { message: String },
}

impl SignupError {
    pub fn validation(message: impl Into<String>) -> Self {
        SignupError::Validation {
            message: message.into(),
        }
    }

    /// Whether the error text is corrective guidance meant for the caller,
    /// as opposed to an internal failure rendered generically.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SignupError::TrialNotExist { .. }
                | SignupError::UnknownSetting { .. }
                | SignupError::UnknownRole { .. }
                | SignupError::Validation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SignupError>;
