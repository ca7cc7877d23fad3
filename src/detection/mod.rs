// 검출 결과 데이터 모델
pub mod analytics;
pub mod response;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::box_format::{self, BoxFormat};
use crate::geometry::ImageRect;

/// 신뢰도가 없을 때 사용하는 기본값
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// 높은 신뢰도 하한
pub const HIGH_CONFIDENCE: f32 = 0.8;
/// 중간 신뢰도 하한
pub const MEDIUM_CONFIDENCE: f32 = 0.6;

/// 객체 검출 결과 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class", alias = "label", alias = "name", default)]
    pub label: String,
    #[serde(default = "default_confidence", deserialize_with = "lenient_confidence")]
    pub confidence: f32,
    /// 원본 이미지 픽셀 좌표. 형식은 박스마다 판별한다
    #[serde(rename = "bbox", alias = "box", default, deserialize_with = "lenient_box")]
    pub bbox: Option<Vec<f32>>,
    /// 백엔드가 형식을 명시한 경우
    #[serde(rename = "bbox_format", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<BoxFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Detection {
    pub fn new(label: &str, confidence: f32, bbox: Vec<f32>) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            bbox: Some(bbox),
            format: None,
            description: None,
        }
    }

    /// 이미지 좌표 사각형. 박스가 없거나 잘못되었으면 `None`
    pub fn image_rect(&self) -> Option<ImageRect> {
        let raw = box_format::parse_raw_box(self.bbox.as_deref()?)?;
        Some(box_format::to_image_rect(raw, self.format))
    }

    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }

    /// 라벨 문자열, 예: `"dog 87%"`
    pub fn label_text(&self) -> String {
        format!("{} {}%", self.label, (self.confidence * 100.0).round() as i64)
    }
}

/// 신뢰도 구간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f32) -> Self {
        match confidence {
            c if c >= HIGH_CONFIDENCE => ConfidenceTier::High,
            c if c >= MEDIUM_CONFIDENCE => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
        }
    }
}

/// 백엔드 모델 정보
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub accuracy: Option<f64>,
    pub speed: Option<String>,
}

/// 정규화된 검출 응답
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    pub filename: Option<String>,
    /// `[height, width, channels]`
    pub image_shape: Option<Vec<u32>>,
    /// 백엔드 처리 시간 (초)
    pub processing_time: Option<f64>,
    pub model_info: Option<ModelInfo>,
    /// 클라이언트에서 측정한 왕복 시간 (밀리초)
    pub round_trip_ms: Option<f64>,
}

/// `/health` 응답
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub model_status: Option<String>,
    pub message: Option<String>,
}

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

// 0 은 값이 없는 것으로 본다
fn lenient_confidence<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|c| *c != 0.0)
        .map(|c| c as f32)
        .unwrap_or(DEFAULT_CONFIDENCE))
}

// 숫자가 아닌 원소는 NaN 으로 남겨서 렌더러가 버리게 한다
fn lenient_box<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32).unwrap_or(f32::NAN))
                .collect(),
        ),
        _ => None,
    })
}
