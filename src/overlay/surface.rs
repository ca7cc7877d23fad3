use image::Rgba;

use crate::geometry::ScreenRect;

/// 오버레이를 그릴 2D 표면
///
/// 좌표는 모두 표면 좌표 (컨테이너 왼쪽 위가 원점). 렌더러는 매번
/// `clear` 후 전체를 다시 그리므로 구현체는 상태를 누적할 필요가 없다.
pub trait DrawSurface {
    /// 표면 전체를 투명하게 지운다
    fn clear(&mut self);

    /// 알파 블렌딩으로 채운 사각형
    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>);

    /// 테두리 사각형
    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, width: f32);

    /// 텍스트 폭 (px)
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// `(x, y)` 는 텍스트의 왼쪽 위
    fn draw_text(&mut self, x: f32, y: f32, text: &str, font_size: f32, color: Rgba<u8>);
}
