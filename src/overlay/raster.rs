use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    Blend, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use std::path::Path;

use super::surface::DrawSurface;
use crate::error::{AppError, AppResult};
use crate::geometry::ScreenRect;

/// 폰트가 없을 때 글자 하나의 폭 추정치 (폰트 크기 대비)
const FALLBACK_ADVANCE: f32 = 0.6;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// `RgbaImage` 위에 그리는 래스터 표면
pub struct RasterSurface {
    canvas: Blend<RgbaImage>,
    font: Option<FontArc>,
}

impl RasterSurface {
    /// 투명한 표면 생성
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Blend(RgbaImage::from_pixel(width, height, TRANSPARENT)),
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// TTF/OTF 폰트 파일 로드
    pub fn load_font(path: &Path) -> AppResult<FontArc> {
        let bytes = std::fs::read(path)?;
        FontArc::try_from_vec(bytes)
            .map_err(|e| AppError::ConfigError(format!("invalid font {}: {e}", path.display())))
    }

    pub fn width(&self) -> u32 {
        self.canvas.0.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.0.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas.0
    }

    /// 배경 이미지 위에 오버레이를 합성한 새 이미지. 배경은 표면 크기로 맞춘다
    pub fn composite_over(&self, background: &RgbaImage) -> RgbaImage {
        let mut out = if background.dimensions() == self.canvas.0.dimensions() {
            background.clone()
        } else {
            image::imageops::resize(
                background,
                self.width(),
                self.height(),
                image::imageops::FilterType::Triangle,
            )
        };
        image::imageops::overlay(&mut out, &self.canvas.0, 0, 0);
        out
    }

    /// PNG 로 저장
    pub fn save_png(&self, path: &Path) -> AppResult<()> {
        self.canvas.0.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// 화면 사각형을 픽셀 사각형으로 반올림. 크기가 0 이하면 `None`
fn to_pixel_rect(rect: ScreenRect) -> Option<Rect> {
    let x0 = rect.x.round() as i32;
    let y0 = rect.y.round() as i32;
    let x1 = rect.right().round() as i32;
    let y1 = rect.bottom().round() as i32;
    let (w, h) = (x1 - x0, y1 - y0);
    (w > 0 && h > 0).then(|| Rect::at(x0, y0).of_size(w as u32, h as u32))
}

impl DrawSurface for RasterSurface {
    fn clear(&mut self) {
        for pixel in self.canvas.0.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>) {
        if let Some(r) = to_pixel_rect(rect) {
            draw_filled_rect_mut(&mut self.canvas, r, color);
        }
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, width: f32) {
        // 선 두께의 절반은 바깥쪽에 걸친다
        let lines = width.round().max(1.0) as i32;
        let outset = (lines / 2) as f32;
        for i in 0..lines {
            let inset = i as f32 - outset;
            let r = ScreenRect::new(
                rect.x + inset,
                rect.y + inset,
                rect.width - 2.0 * inset,
                rect.height - 2.0 * inset,
            );
            match to_pixel_rect(r) {
                Some(r) => draw_hollow_rect_mut(&mut self.canvas, r, color),
                None => break,
            }
        }
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(font_size), font, text).0 as f32,
            None => text.chars().count() as f32 * font_size * FALLBACK_ADVANCE,
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, font_size: f32, color: Rgba<u8>) {
        // 폰트가 없으면 배경 사각형만 남는다
        if let Some(font) = &self.font {
            draw_text_mut(
                &mut self.canvas,
                color,
                x.round() as i32,
                y.round() as i32,
                PxScale::from(font_size),
                font,
                text,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_blends_with_transparent_background() {
        let mut surface = RasterSurface::new(10, 10);
        surface.fill_rect(ScreenRect::new(2.0, 2.0, 4.0, 4.0), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.image().get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.image().get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*surface.image().get_pixel(6, 6), TRANSPARENT);
    }

    #[test]
    fn stroke_leaves_interior_untouched() {
        let mut surface = RasterSurface::new(20, 20);
        surface.stroke_rect(ScreenRect::new(5.0, 5.0, 10.0, 10.0), Rgba([0, 0, 255, 255]), 2.0);
        assert_eq!(*surface.image().get_pixel(5, 5), Rgba([0, 0, 255, 255]));
        assert_eq!(*surface.image().get_pixel(4, 4), Rgba([0, 0, 255, 255]));
        assert_eq!(*surface.image().get_pixel(10, 10), TRANSPARENT);
    }

    #[test]
    fn out_of_bounds_and_empty_rects_are_ignored() {
        let mut surface = RasterSurface::new(10, 10);
        surface.fill_rect(ScreenRect::new(50.0, 50.0, 5.0, 5.0), Rgba([1, 2, 3, 255]));
        surface.fill_rect(ScreenRect::new(1.0, 1.0, 0.0, 5.0), Rgba([1, 2, 3, 255]));
        surface.stroke_rect(ScreenRect::new(-5.0, -5.0, 3.0, 3.0), Rgba([1, 2, 3, 255]), 2.0);
        assert!(surface.image().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn clear_resets_every_pixel() {
        let mut surface = RasterSurface::new(4, 4);
        surface.fill_rect(ScreenRect::new(0.0, 0.0, 4.0, 4.0), Rgba([9, 9, 9, 255]));
        surface.clear();
        assert!(surface.image().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn fallback_text_width_scales_with_length() {
        let surface = RasterSurface::new(1, 1);
        assert_eq!(surface.measure_text("abcd", 10.0), 24.0);
        assert_eq!(surface.measure_text("", 10.0), 0.0);
    }

    #[test]
    fn composite_keeps_background_where_overlay_is_empty() {
        let mut surface = RasterSurface::new(4, 4);
        surface.fill_rect(ScreenRect::new(0.0, 0.0, 2.0, 4.0), Rgba([255, 0, 0, 255]));
        let background = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
        let out = surface.composite_over(&background);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(3, 0), Rgba([0, 255, 0, 255]));
    }
}
