use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Detection, DetectionResponse, ModelInfo};
use crate::error::{AppError, AppResult};

/// 응답 본문 중 검출 목록 외의 메타데이터
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseMeta {
    filename: Option<String>,
    image_shape: Option<Vec<u32>>,
    processing_time: Option<f64>,
    model_info: Option<ModelInfo>,
}

const EMPTY_MESSAGE: &str = "No objects detected";

/// 백엔드 응답 JSON 을 정규화한다.
///
/// 허용하는 형태 (우선순위 순):
/// 1. `{"objects": [...]}`
/// 2. `{"predictions": [...]}`
/// 3. `[...]`
/// 4. `{"detections": [...]}`
/// 5. `{"message": "No objects detected"}` (빈 결과)
pub fn parse_detection_response(value: Value) -> AppResult<DetectionResponse> {
    if let Value::Array(items) = &value {
        return Ok(DetectionResponse {
            detections: parse_detections(items),
            ..Default::default()
        });
    }

    let Value::Object(map) = &value else {
        return Err(AppError::ResponseFormat(format!(
            "expected an object or array but got: {}",
            preview(&value)
        )));
    };

    let items = ["objects", "predictions", "detections"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array));

    let detections = match items {
        Some(items) => parse_detections(items),
        None if map.get("message").and_then(Value::as_str) == Some(EMPTY_MESSAGE) => Vec::new(),
        None => {
            return Err(AppError::ResponseFormat(format!(
                "expected 'objects' or 'predictions' array but got: {}",
                preview(&value)
            )));
        }
    };

    let meta: ResponseMeta = serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        debug!("ignoring unreadable response metadata: {e}");
        ResponseMeta::default()
    });

    Ok(DetectionResponse {
        detections,
        filename: meta.filename,
        image_shape: meta.image_shape,
        processing_time: meta.processing_time,
        model_info: meta.model_info,
        round_trip_ms: None,
    })
}

/// 원소 단위로 파싱하고, 읽을 수 없는 원소는 버린다
fn parse_detections(items: &[Value]) -> Vec<Detection> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<Detection>(item.clone()) {
            Ok(det) => Some(det),
            Err(e) => {
                warn!("dropping unreadable detection #{i}: {e}");
                None
            }
        })
        .collect()
}

fn preview(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 200 {
        let mut cut = 200;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}
