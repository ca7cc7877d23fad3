use reqwest::blocking::{Client, multipart};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::detection::response::parse_detection_response;
use crate::detection::{DetectionResponse, HealthStatus};
use crate::error::{AppError, AppResult, validation};
use crate::utils::image_utils;

/// 외부 검출 백엔드 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct DetectionClient {
    client: Client,
    base_url: String,
    upload_field: String,
}

impl DetectionClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_field: config.upload_field.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 이미지 파일 업로드 후 검출 결과 반환
    pub fn detect(&self, path: &Path) -> AppResult<DetectionResponse> {
        validation::validate_image_path(path)?;
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        self.detect_bytes(&file_name, image_utils::guess_mime_type(path), bytes)
    }

    /// 인코딩된 이미지 바이트 업로드
    pub fn detect_bytes(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> AppResult<DetectionResponse> {
        validation::validate_image_data(&bytes)?;
        info!("uploading {file_name} ({} bytes) to {}", bytes.len(), self.base_url);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new().part(self.upload_field.clone(), part);

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .multipart(form)
            .send()?;
        let status = response.status();
        let body: serde_json::Value = if status.is_success() {
            response.json()?
        } else {
            let detail = error_detail(&response.text().unwrap_or_default());
            warn!("detection request failed with {status}: {detail}");
            return Err(AppError::BackendStatus { status: status.as_u16(), detail });
        };

        let mut parsed = parse_detection_response(body)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        parsed.round_trip_ms = Some(elapsed_ms);
        info!(
            "received {} detections in {:.1} ms",
            parsed.detections.len(),
            elapsed_ms
        );
        Ok(parsed)
    }

    /// 백엔드 상태 확인
    pub fn health(&self) -> AppResult<HealthStatus> {
        let response = self.client.get(format!("{}/health", self.base_url)).send()?;
        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(&response.text().unwrap_or_default());
            return Err(AppError::BackendStatus { status: status.as_u16(), detail });
        }
        Ok(response.json()?)
    }
}

/// FastAPI 형식 `{"detail": ...}` 에서 메시지 추출. 없으면 본문 그대로
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
