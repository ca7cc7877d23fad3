//! 박스 좌표 형식 판별
//!
//! 백엔드는 박스를 `[x1, y1, x2, y2]` 또는 `[x, y, w, h]`로 보내며 형식 태그가
//! 없을 수 있다. 태그가 없으면 `v3 > v1 && v4 > v2` 휴리스틱으로 판별한다.
//! 작은 `[x, y, w, h]` 박스가 두 꼭짓점 형식으로 잘못 판별될 수 있지만
//! 기존 데이터와의 호환을 위해 그대로 유지한다.

use serde::{Deserialize, Serialize};

use crate::geometry::ImageRect;

/// 박스 좌표 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxFormat {
    /// `[x1, y1, x2, y2]`
    #[serde(rename = "xyxy", alias = "corners")]
    Corners,
    /// `[x, y, width, height]`
    #[serde(rename = "xywh", alias = "corner_size")]
    CornerSize,
}

/// 원시 좌표 값을 4개짜리 배열로 변환. 길이가 다르거나 유한하지 않은 값이 있으면 `None`
pub fn parse_raw_box(values: &[f32]) -> Option<[f32; 4]> {
    let raw: [f32; 4] = values.try_into().ok()?;
    raw.iter().all(|v| v.is_finite()).then_some(raw)
}

/// 휴리스틱 형식 판별
pub fn classify(raw: [f32; 4]) -> BoxFormat {
    let [v1, v2, v3, v4] = raw;
    if v3 > v1 && v4 > v2 {
        BoxFormat::Corners
    } else {
        BoxFormat::CornerSize
    }
}

/// 원시 박스를 이미지 좌표 사각형으로 변환. 명시적 형식이 있으면 휴리스틱을 건너뛴다.
///
/// 이미지 밖으로 나간 부분은 자르지 않는다. 자르기는 `ImageRect::clip_to` 몫이다.
pub fn to_image_rect(raw: [f32; 4], explicit: Option<BoxFormat>) -> ImageRect {
    let [v1, v2, v3, v4] = raw;
    let (width, height) = match explicit.unwrap_or_else(|| classify(raw)) {
        BoxFormat::Corners => (v3 - v1, v4 - v2),
        BoxFormat::CornerSize => (v3, v4),
    };
    ImageRect {
        x: v1,
        y: v2,
        width: width.max(0.0),
        height: height.max(0.0),
    }
}
