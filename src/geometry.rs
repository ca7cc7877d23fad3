//! 원본 이미지 좌표와 화면 좌표 사이의 변환 (object-fit: contain)

use thiserror::Error;

/// 이미지 좌표계의 사각형 (원본 픽셀 단위)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 화면(드로잉 표면) 좌표계의 사각형
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// `[0, max_w] x [0, max_h]` 범위로 잘라낸 사각형
    pub fn clip_to(&self, max_w: f32, max_h: f32) -> ImageRect {
        let x1 = self.x.clamp(0.0, max_w);
        let y1 = self.y.clamp(0.0, max_h);
        let x2 = (self.x + self.width).clamp(0.0, max_w);
        let y2 = (self.y + self.height).clamp(0.0, max_h);
        ImageRect {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
        }
    }
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// 경계 포함 여부
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// 지오메트리를 계산할 수 없는 상태. 호출자는 그리기를 건너뛴다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("image natural size is not known yet")]
    ImageNotLoaded,
    #[error("container has no usable size")]
    ContainerNotLaidOut,
}

/// 표시 지오메트리. 입력이 바뀌면 새로 계산하고 수정하지 않는다
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub natural_width: f32,
    pub natural_height: f32,
    pub container_width: f32,
    pub container_height: f32,
    pub displayed_width: f32,
    pub displayed_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

fn usable(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

/// contain 맞춤으로 표시 크기, 중앙 정렬 오프셋, 배율을 계산한다.
///
/// 컨테이너가 이미지보다 상대적으로 넓으면 높이가, 그렇지 않으면 너비가
/// 기준이 된다. `scale_x`와 `scale_y`는 같아야 하지만 각각 따로 계산한다.
pub fn compute_geometry(
    natural_width: f32,
    natural_height: f32,
    container_width: f32,
    container_height: f32,
) -> Result<DisplayGeometry, NotReady> {
    if !usable(natural_width) || !usable(natural_height) {
        return Err(NotReady::ImageNotLoaded);
    }
    if !usable(container_width) || !usable(container_height) {
        return Err(NotReady::ContainerNotLaidOut);
    }

    let image_aspect = natural_width / natural_height;
    let container_aspect = container_width / container_height;

    let pillarbox = container_aspect > image_aspect;
    let (displayed_width, displayed_height, offset_x, offset_y) = if pillarbox {
        // 높이 기준, 좌우 여백
        let displayed_width = container_height * image_aspect;
        (
            displayed_width,
            container_height,
            ((container_width - displayed_width) / 2.0).max(0.0),
            0.0,
        )
    } else {
        // 너비 기준, 상하 여백
        let displayed_height = container_width / image_aspect;
        (
            container_width,
            displayed_height,
            0.0,
            ((container_height - displayed_height) / 2.0).max(0.0),
        )
    };

    Ok(DisplayGeometry {
        natural_width,
        natural_height,
        container_width,
        container_height,
        displayed_width,
        displayed_height,
        offset_x,
        offset_y,
        scale_x: displayed_width / natural_width,
        scale_y: displayed_height / natural_height,
    })
}

impl DisplayGeometry {
    /// 이미지 좌표 -> 화면 좌표
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale_x + self.offset_x, y * self.scale_y + self.offset_y)
    }

    /// 화면 좌표 -> 이미지 좌표
    pub fn screen_to_image(&self, sx: f32, sy: f32) -> (f32, f32) {
        ((sx - self.offset_x) / self.scale_x, (sy - self.offset_y) / self.scale_y)
    }

    pub fn map_rect(&self, rect: ImageRect) -> ScreenRect {
        let (x, y) = self.map_point(rect.x, rect.y);
        ScreenRect {
            x,
            y,
            width: rect.width * self.scale_x,
            height: rect.height * self.scale_y,
        }
    }

    /// 컨테이너 안에서 실제 이미지가 차지하는 영역
    pub fn image_bounds(&self) -> ScreenRect {
        ScreenRect {
            x: self.offset_x,
            y: self.offset_y,
            width: self.displayed_width,
            height: self.displayed_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPS: f32 = 1e-3;

    const CASES: &[(f32, f32, f32, f32)] = &[
        (1000.0, 500.0, 400.0, 400.0),
        (500.0, 1000.0, 400.0, 400.0),
        (640.0, 480.0, 1920.0, 1080.0),
        (1080.0, 1920.0, 300.0, 900.0),
        (1.0, 1.0, 3.0, 7.0),
        (4032.0, 3024.0, 812.5, 609.375),
        (33.0, 17.0, 1.0, 1000.0),
    ];

    #[test]
    fn contain_fit_stays_inside_container() {
        for &(nw, nh, cw, ch) in CASES {
            let g = compute_geometry(nw, nh, cw, ch).unwrap();
            assert!(g.displayed_width <= cw + EPS, "{:?}", g);
            assert!(g.displayed_height <= ch + EPS, "{:?}", g);
            let fills_w = (g.displayed_width - cw).abs() < EPS;
            let fills_h = (g.displayed_height - ch).abs() < EPS;
            assert!(fills_w || fills_h, "neither axis binds: {:?}", g);
            assert!(g.offset_x >= 0.0 && g.offset_y >= 0.0);
        }
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        for &(nw, nh, cw, ch) in CASES {
            let g = compute_geometry(nw, nh, cw, ch).unwrap();
            let displayed = g.displayed_width / g.displayed_height;
            assert_abs_diff_eq!(displayed, nw / nh, epsilon = 1e-3 * (nw / nh));
            assert_abs_diff_eq!(g.scale_x, g.scale_y, epsilon = 1e-5);
        }
    }

    #[test]
    fn offsets_center_the_image() {
        for &(nw, nh, cw, ch) in CASES {
            let g = compute_geometry(nw, nh, cw, ch).unwrap();
            assert_abs_diff_eq!(2.0 * g.offset_x + g.displayed_width, cw, epsilon = EPS);
            assert_abs_diff_eq!(2.0 * g.offset_y + g.displayed_height, ch, epsilon = EPS);
        }
    }

    #[test]
    fn wide_image_in_square_container_binds_on_width() {
        let g = compute_geometry(1000.0, 500.0, 400.0, 400.0).unwrap();
        assert_abs_diff_eq!(g.displayed_width, 400.0, epsilon = EPS);
        assert_abs_diff_eq!(g.displayed_height, 200.0, epsilon = EPS);
        assert_abs_diff_eq!(g.offset_x, 0.0, epsilon = EPS);
        assert_abs_diff_eq!(g.offset_y, 100.0, epsilon = EPS);
        assert_abs_diff_eq!(g.scale_x, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn tall_image_in_wide_container_binds_on_height() {
        let g = compute_geometry(500.0, 1000.0, 800.0, 400.0).unwrap();
        assert_abs_diff_eq!(g.displayed_height, 400.0, epsilon = EPS);
        assert_abs_diff_eq!(g.displayed_width, 200.0, epsilon = EPS);
        assert_abs_diff_eq!(g.offset_x, 300.0, epsilon = EPS);
        assert_abs_diff_eq!(g.offset_y, 0.0, epsilon = EPS);
    }

    #[test]
    fn full_image_rect_maps_to_image_bounds() {
        for &(nw, nh, cw, ch) in CASES {
            let g = compute_geometry(nw, nh, cw, ch).unwrap();
            let screen = g.map_rect(ImageRect::new(0.0, 0.0, nw, nh));
            let bounds = g.image_bounds();
            assert_abs_diff_eq!(screen.x, bounds.x, epsilon = EPS);
            assert_abs_diff_eq!(screen.y, bounds.y, epsilon = EPS);
            assert_abs_diff_eq!(screen.width, bounds.width, epsilon = EPS);
            assert_abs_diff_eq!(screen.height, bounds.height, epsilon = EPS);
        }
    }

    #[test]
    fn screen_to_image_inverts_map_point() {
        let g = compute_geometry(1000.0, 500.0, 400.0, 400.0).unwrap();
        let (sx, sy) = g.map_point(250.0, 125.0);
        let (ix, iy) = g.screen_to_image(sx, sy);
        assert_abs_diff_eq!(ix, 250.0, epsilon = EPS);
        assert_abs_diff_eq!(iy, 125.0, epsilon = EPS);
    }

    #[test]
    fn unknown_sizes_are_not_ready() {
        assert_eq!(compute_geometry(0.0, 500.0, 400.0, 400.0), Err(NotReady::ImageNotLoaded));
        assert_eq!(compute_geometry(100.0, 0.0, 400.0, 400.0), Err(NotReady::ImageNotLoaded));
        assert_eq!(
            compute_geometry(f32::NAN, 10.0, 400.0, 400.0),
            Err(NotReady::ImageNotLoaded)
        );
        assert_eq!(
            compute_geometry(100.0, 100.0, 0.0, 400.0),
            Err(NotReady::ContainerNotLaidOut)
        );
        assert_eq!(
            compute_geometry(100.0, 100.0, 400.0, -1.0),
            Err(NotReady::ContainerNotLaidOut)
        );
    }

    #[test]
    fn clip_keeps_rect_inside_image() {
        let r = ImageRect::new(-10.0, 90.0, 50.0, 50.0).clip_to(100.0, 100.0);
        assert_eq!(r, ImageRect::new(0.0, 90.0, 40.0, 10.0));

        let outside = ImageRect::new(150.0, 150.0, 10.0, 10.0).clip_to(100.0, 100.0);
        assert_eq!(outside.area(), 0.0);
    }
}
