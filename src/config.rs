use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, ErrorContext};

/// 애플리케이션 설정 구조체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 검출 백엔드 관련 설정
    pub api: ApiConfig,
    /// 오버레이 렌더링 설정
    pub overlay: OverlayConfig,
    /// UI 관련 설정
    pub ui: UiConfig,
}

/// 검출 백엔드 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 백엔드 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// multipart 업로드 필드 이름
    pub upload_field: String,
}

/// 오버레이 설정. 색상은 `#rrggbb` 문자열
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub high_color: String,
    pub medium_color: String,
    pub low_color: String,
    pub highlight_color: String,
    pub label_text_color: String,
    /// 박스 내부 채우기 알파값 (0-255)
    pub fill_alpha: u8,
    pub stroke_width: f32,
    pub highlight_stroke_width: f32,
    /// 라벨 폰트 크기 (px)
    pub font_size: f32,
    /// 라벨 텍스트 높이 (px)
    pub text_height: f32,
    /// 라벨 좌우/상하 여백 (px)
    pub label_padding: f32,
    /// 래스터 출력에 사용할 TTF/OTF 폰트 경로 (없으면 텍스트 생략)
    pub font_path: Option<String>,
}

/// UI 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub window_width: f32,
    pub window_height: f32,
    /// 시작 시 박스 표시 여부
    pub show_annotations: bool,
    /// 상위 검출 목록 개수
    pub top_detections: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            upload_field: "file".to_string(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            high_color: "#22c55e".to_string(),
            medium_color: "#eab308".to_string(),
            low_color: "#ef4444".to_string(),
            highlight_color: "#3b82f6".to_string(),
            label_text_color: "#ffffff".to_string(),
            fill_alpha: 0x20,
            stroke_width: 2.0,
            highlight_stroke_width: 3.0,
            font_size: 12.0,
            text_height: 16.0,
            label_padding: 4.0,
            font_path: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_width: 1200.0,
            window_height: 800.0,
            show_annotations: true,
            top_detections: 5,
        }
    }
}

impl AppConfig {
    /// JSON 설정 파일 로드
    pub fn load_from_path(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .with_context(format!("config file {}", path.display()))?;
        Ok(config)
    }

    /// 설정 파일을 찾아 로드하고, 없거나 잘못된 경우 기본값 사용
    pub fn load_or_default() -> Self {
        let path = match crate::utils::fs_utils::get_config_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("config path unavailable, using defaults: {e}");
                return Self::default();
            }
        };

        if !path.exists() {
            info!("no config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from_path(&path) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("ignoring invalid config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// 설정값 유효성 검사
    pub fn validate(&self) -> AppResult<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(AppError::ConfigError(format!(
                "api.base_url must be an http(s) URL: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::ConfigError("api.timeout_secs must be positive".into()));
        }
        for color in [
            &self.overlay.high_color,
            &self.overlay.medium_color,
            &self.overlay.low_color,
            &self.overlay.highlight_color,
            &self.overlay.label_text_color,
        ] {
            crate::utils::color_utils::parse_hex_color(color, 255)?;
        }
        if self.overlay.font_size <= 0.0 || self.overlay.text_height <= 0.0 {
            return Err(AppError::ConfigError("overlay font sizes must be positive".into()));
        }
        Ok(())
    }
}

/// 전역 설정 인스턴스
pub static CONFIG: once_cell::sync::Lazy<AppConfig> =
    once_cell::sync::Lazy::new(AppConfig::load_or_default);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "api": {{ "base_url": "http://detector:9000" }} }}"#).unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://detector:9000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.overlay, OverlayConfig::default());
    }

    #[test]
    fn bad_color_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "overlay": {{ "high_color": "green" }} }}"#).unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
