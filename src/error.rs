use std::path::PathBuf;

use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DigestError {
    #[error(
        "an access token is required to access the social media archive API; set ACCESS_TOKEN in the environment or .env"
    )]
    #[diagnostic(code(activity_digest::missing_token))]
    MissingToken,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid date: {0}")]
    #[diagnostic(help("use YYYY-MM-DD, e.g. 2021-03-15"))]
    InvalidDate(String),

    #[error("archive request for {day} failed: {message}")]
    ArchiveHttp { day: NaiveDate, message: String },

    #[error("archive returned status {status} for {day}: {message}")]
    ArchiveStatus {
        day: NaiveDate,
        status: u16,
        message: String,
    },

    #[error("archive returned a malformed payload for {day}: {message}")]
    ArchivePayload { day: NaiveDate, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DigestError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DigestError::InvalidDate(_) => 2,
            DigestError::ArchiveHttp { .. }
            | DigestError::ArchiveStatus { .. }
            | DigestError::ArchivePayload { .. } => 3,
            _ => 1,
        }
    }

    /// Day the failure belongs to, for fetch errors.
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            DigestError::ArchiveHttp { day, .. }
            | DigestError::ArchiveStatus { day, .. }
            | DigestError::ArchivePayload { day, .. } => Some(*day),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(DigestError::MissingToken.exit_code(), 1);
        assert_eq!(DigestError::InvalidDate("x".to_string()).exit_code(), 2);
        let day = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let err = DigestError::ArchiveStatus {
            day,
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.day(), Some(day));
        assert_eq!(DigestError::Filesystem("x".to_string()).exit_code(), 1);
    }
}
