/// 이미지 관련 유틸리티 함수들
pub mod image_utils {
    use std::path::Path;

    /// 이미지 파일 확장자 확인
    pub fn is_valid_image_extension(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            if let Some(ext_str) = ext.to_str() {
                let ext_lower = ext_str.to_lowercase();
                return matches!(ext_lower.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "webp");
            }
        }
        false
    }

    /// 확장자로 MIME 타입 추정
    pub fn guess_mime_type(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// 색상 관련 유틸리티 함수들
pub mod color_utils {
    use crate::error::{AppError, AppResult};
    use image::Rgba;

    /// `#rrggbb` 문자열을 색상으로 변환
    pub fn parse_hex_color(hex: &str, alpha: u8) -> AppResult<Rgba<u8>> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::ConfigError(format!("invalid color: {hex}")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| AppError::ConfigError(format!("invalid color: {hex}")))
        };
        Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }

    /// 같은 색상에 알파값만 바꾼 틴트
    pub fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
        Rgba([color[0], color[1], color[2], alpha])
    }
}

/// 파일 시스템 관련 유틸리티 함수들
pub mod fs_utils {
    use crate::error::{AppError, AppResult};
    use std::env;
    use std::path::PathBuf;

    /// 설정 파일 경로를 덮어쓰는 환경 변수
    pub const CONFIG_ENV_VAR: &str = "DETECTION_OVERLAY_CONFIG";

    /// 홈 디렉토리 경로 가져오기
    pub fn get_home_directory() -> AppResult<String> {
        env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .or_else(|_| env::current_dir().map(|dir| dir.to_string_lossy().to_string()))
            .map_err(|_| AppError::ConfigError("home directory not found".to_string()))
    }

    /// 애플리케이션 데이터 디렉토리 경로
    pub fn get_app_data_directory() -> AppResult<PathBuf> {
        let home_dir = get_home_directory()?;
        Ok(PathBuf::from(home_dir).join(".detection-overlay"))
    }

    /// 설정 파일 경로 (환경 변수 우선)
    pub fn get_config_path() -> AppResult<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        Ok(get_app_data_directory()?.join("config.json"))
    }
}

/// 성능 측정 유틸리티 함수들
pub mod perf_utils {
    use std::time::Instant;

    /// 성능 측정 구조체
    pub struct PerformanceTimer {
        start_time: Instant,
        name: String,
    }

    impl PerformanceTimer {
        /// 새로운 타이머 생성
        pub fn new(name: &str) -> Self {
            Self {
                start_time: Instant::now(),
                name: name.to_string(),
            }
        }

        /// 경과 시간 측정 (밀리초)
        pub fn elapsed_ms(&self) -> f64 {
            self.start_time.elapsed().as_secs_f64() * 1000.0
        }
    }

    impl Drop for PerformanceTimer {
        fn drop(&mut self) {
            tracing::debug!("{}: {:.2} ms", self.name, self.elapsed_ms());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::Path;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(
            color_utils::parse_hex_color("#22c55e", 255).unwrap(),
            Rgba([0x22, 0xc5, 0x5e, 255])
        );
        assert_eq!(
            color_utils::parse_hex_color("3b82f6", 0x20).unwrap(),
            Rgba([0x3b, 0x82, 0xf6, 0x20])
        );
        assert!(color_utils::parse_hex_color("#12345", 255).is_err());
        assert!(color_utils::parse_hex_color("#gg0000", 255).is_err());
    }

    #[test]
    fn image_extensions() {
        assert!(image_utils::is_valid_image_extension(Path::new("a/b/photo.JPG")));
        assert!(!image_utils::is_valid_image_extension(Path::new("notes.txt")));
        assert_eq!(image_utils::guess_mime_type(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(image_utils::guess_mime_type(Path::new("x")), "application/octet-stream");
    }
}
