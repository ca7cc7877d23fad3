use thiserror::Error;

/// 애플리케이션 에러 타입
#[derive(Error, Debug)]
pub enum AppError {
    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("network error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("backend returned {status}: {detail}")]
    BackendStatus { status: u16, detail: String },

    #[error("invalid response format: {0}")]
    ResponseFormat(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid input: {0}")]
    ValidationError(String),
}

impl AppError {
    /// 검출 요청 실패 시 사용자에게 보여줄 메시지
    pub fn user_message(&self) -> String {
        match self {
            AppError::HttpError(e) if e.is_timeout() => {
                "Request timed out. Please try with a smaller image or check your connection."
                    .to_string()
            }
            AppError::HttpError(e) if e.is_connect() => {
                "Cannot connect to the detection server. Please ensure the backend is running."
                    .to_string()
            }
            AppError::HttpError(_) => {
                "Network error. Please check your connection and ensure the backend is running."
                    .to_string()
            }
            AppError::BackendStatus { status: 400, detail } if !detail.is_empty() => detail.clone(),
            AppError::BackendStatus { status: 400, .. } => {
                "Invalid image format. Please try a different image.".to_string()
            }
            AppError::BackendStatus { status, .. } if *status >= 500 => {
                "Server error during processing. Please try again.".to_string()
            }
            AppError::ResponseFormat(msg) => {
                format!("Server response format error: {msg}. Please check the backend API.")
            }
            other => other.to_string(),
        }
    }
}

/// 결과 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

/// 에러 컨텍스트를 위한 확장 트레이트
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> AppResult<T>
    where
        C: std::fmt::Display;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<C>(self, context: C) -> AppResult<T>
    where
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let app_error: AppError = e.into();
            match app_error {
                AppError::ConfigError(msg) => AppError::ConfigError(format!("{context}: {msg}")),
                AppError::ValidationError(msg) => {
                    AppError::ValidationError(format!("{context}: {msg}"))
                }
                AppError::ResponseFormat(msg) => {
                    AppError::ResponseFormat(format!("{context}: {msg}"))
                }
                _ => app_error,
            }
        })
    }
}

/// 유효성 검사 헬퍼 함수들
pub mod validation {
    use super::*;
    use std::path::Path;

    /// 이미지 데이터 유효성 검사
    pub fn validate_image_data(data: &[u8]) -> AppResult<()> {
        if data.is_empty() {
            return Err(AppError::ValidationError("empty image data".to_string()));
        }
        Ok(())
    }

    /// 업로드 가능한 이미지 파일인지 확인
    pub fn validate_image_path(path: &Path) -> AppResult<()> {
        if !crate::utils::image_utils::is_valid_image_extension(path) {
            return Err(AppError::ValidationError(format!(
                "file must be an image: {}",
                path.display()
            )));
        }
        Ok(())
    }
}
