use std::fmt;

/// Errors surfaced by capture, composition and export.
///
/// Every variant is non-fatal for the session: the user can retry the failed
/// step without losing photos or customization.
#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),
    #[error("Export failed: {0}")]
    ExportFailure(String),
    #[error("Cancelled by user")]
    UserCancelled,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BoothError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Self::ExportFailure(_) => ErrorKind::ExportFailure,
            Self::UserCancelled => ErrorKind::UserCancelled,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<image::ImageError> for BoothError {
    fn from(e: image::ImageError) -> Self {
        BoothError::DecodeFailure(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    UnsupportedMediaType,
    DecodeFailure,
    ExportFailure,
    UserCancelled,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::ExportFailure => "export_failure",
            ErrorKind::UserCancelled => "user_cancelled",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub type BoothResult<T> = Result<T, BoothError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            BoothError::UnsupportedMediaType("notes.txt".into()).kind(),
            ErrorKind::UnsupportedMediaType
        );
        assert_eq!(BoothError::UserCancelled.kind(), ErrorKind::UserCancelled);
        assert_eq!(ErrorKind::DecodeFailure.to_string(), "decode_failure");
    }

    #[test]
    fn test_image_error_becomes_decode_failure() {
        let err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let booth: BoothError = err.into();
        assert_eq!(booth.kind(), ErrorKind::DecodeFailure);
    }
}
