// 바운딩 박스 오버레이 렌더러
pub mod raster;
pub mod surface;

use image::Rgba;
use tracing::trace;

use crate::config::OverlayConfig;
use crate::detection::{ConfidenceTier, Detection};
use crate::error::AppResult;
use crate::geometry::{DisplayGeometry, ScreenRect};
use crate::utils::color_utils;

pub use raster::RasterSurface;
pub use surface::DrawSurface;

/// 오버레이 색상과 크기
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub high_color: Rgba<u8>,
    pub medium_color: Rgba<u8>,
    pub low_color: Rgba<u8>,
    pub highlight_color: Rgba<u8>,
    pub label_text_color: Rgba<u8>,
    pub fill_alpha: u8,
    pub stroke_width: f32,
    pub highlight_stroke_width: f32,
    pub font_size: f32,
    pub text_height: f32,
    pub label_padding: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            high_color: Rgba([0x22, 0xc5, 0x5e, 255]),
            medium_color: Rgba([0xea, 0xb3, 0x08, 255]),
            low_color: Rgba([0xef, 0x44, 0x44, 255]),
            highlight_color: Rgba([0x3b, 0x82, 0xf6, 255]),
            label_text_color: Rgba([255, 255, 255, 255]),
            fill_alpha: 0x20,
            stroke_width: 2.0,
            highlight_stroke_width: 3.0,
            font_size: 12.0,
            text_height: 16.0,
            label_padding: 4.0,
        }
    }
}

impl OverlayStyle {
    pub fn from_config(config: &OverlayConfig) -> AppResult<Self> {
        Ok(Self {
            high_color: color_utils::parse_hex_color(&config.high_color, 255)?,
            medium_color: color_utils::parse_hex_color(&config.medium_color, 255)?,
            low_color: color_utils::parse_hex_color(&config.low_color, 255)?,
            highlight_color: color_utils::parse_hex_color(&config.highlight_color, 255)?,
            label_text_color: color_utils::parse_hex_color(&config.label_text_color, 255)?,
            fill_alpha: config.fill_alpha,
            stroke_width: config.stroke_width,
            highlight_stroke_width: config.highlight_stroke_width,
            font_size: config.font_size,
            text_height: config.text_height,
            label_padding: config.label_padding,
        })
    }

    pub fn tier_color(&self, tier: ConfidenceTier) -> Rgba<u8> {
        match tier {
            ConfidenceTier::High => self.high_color,
            ConfidenceTier::Medium => self.medium_color,
            ConfidenceTier::Low => self.low_color,
        }
    }
}

/// 렌더링 결과 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// 그린 박스 수
    pub drawn: usize,
    /// 박스가 없거나 잘못되어 건너뛴 수
    pub skipped: usize,
}

/// 화면 좌표로 변환된 박스 하나
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxLayout {
    /// 검출 목록에서의 인덱스
    pub index: usize,
    pub rect: ScreenRect,
}

/// 라벨 배경과 텍스트 위치
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub background: ScreenRect,
    pub text_x: f32,
    pub text_y: f32,
}

/// 검출 하나의 화면 사각형. 박스가 잘못되었거나 이미지 밖이면 `None`
pub fn screen_rect(detection: &Detection, geometry: &DisplayGeometry) -> Option<ScreenRect> {
    let rect = detection
        .image_rect()?
        .clip_to(geometry.natural_width, geometry.natural_height);
    if rect.area() <= 0.0 {
        return None;
    }
    Some(geometry.map_rect(rect))
}

/// 박스 위 왼쪽에 라벨을 놓되, 표시된 이미지 영역을 벗어나지 않게 한다.
///
/// 가로는 이미지 좌우 경계 안으로, 세로는 박스 위에 공간이 없으면 박스 상단
/// 안쪽으로 내린다.
pub fn place_label(
    box_rect: ScreenRect,
    text_width: f32,
    bounds: ScreenRect,
    style: &OverlayStyle,
) -> LabelPlacement {
    let pad = style.label_padding;
    let width = text_width + 2.0 * pad;
    let height = style.text_height + pad;

    let x = box_rect.x.min(bounds.right() - width).max(bounds.x);
    let above = box_rect.y - height;
    let y = if above >= bounds.y {
        above
    } else {
        box_rect.y.max(bounds.y)
    };

    LabelPlacement {
        background: ScreenRect::new(x, y, width, height),
        text_x: x + pad,
        text_y: y + (height - style.font_size) / 2.0,
    }
}

/// 검출 목록을 표면에 그리는 렌더러
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// 그릴 수 있는 박스들의 화면 배치 (목록 순서)
    pub fn layout(&self, detections: &[Detection], geometry: &DisplayGeometry) -> Vec<BoxLayout> {
        detections
            .iter()
            .enumerate()
            .filter_map(|(index, det)| {
                screen_rect(det, geometry).map(|rect| BoxLayout { index, rect })
            })
            .collect()
    }

    /// 표면을 지우고 모든 박스를 다시 그린다.
    ///
    /// `geometry`가 없거나 `visible`이 꺼져 있으면 지우기만 한다. 뒤쪽 박스가
    /// 앞쪽 박스 위에 그려진다.
    pub fn render<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        detections: &[Detection],
        geometry: Option<&DisplayGeometry>,
        highlighted: Option<usize>,
        visible: bool,
    ) -> RenderStats {
        surface.clear();

        let Some(geometry) = geometry else {
            return RenderStats::default();
        };
        if !visible {
            return RenderStats::default();
        }

        let bounds = geometry.image_bounds();
        let mut stats = RenderStats::default();

        for (index, det) in detections.iter().enumerate() {
            let Some(rect) = screen_rect(det, geometry) else {
                stats.skipped += 1;
                continue;
            };

            let is_highlighted = highlighted == Some(index);
            let (color, stroke_width) = if is_highlighted {
                (self.style.highlight_color, self.style.highlight_stroke_width)
            } else {
                (self.style.tier_color(det.tier()), self.style.stroke_width)
            };

            surface.fill_rect(rect, color_utils::with_alpha(color, self.style.fill_alpha));
            surface.stroke_rect(rect, color, stroke_width);

            let label = det.label_text();
            let text_width = surface.measure_text(&label, self.style.font_size);
            let placement = place_label(rect, text_width, bounds, &self.style);
            surface.fill_rect(placement.background, color);
            surface.draw_text(
                placement.text_x,
                placement.text_y,
                &label,
                self.style.font_size,
                self.style.label_text_color,
            );

            stats.drawn += 1;
        }

        trace!("overlay rendered {} boxes, skipped {}", stats.drawn, stats.skipped);
        stats
    }

    /// 화면 좌표 아래 가장 위에 그려진 박스의 인덱스
    pub fn hit_test(
        &self,
        detections: &[Detection],
        geometry: &DisplayGeometry,
        x: f32,
        y: f32,
    ) -> Option<usize> {
        self.layout(detections, geometry)
            .iter()
            .rev()
            .find(|b| b.rect.contains(x, y))
            .map(|b| b.index)
    }
}
