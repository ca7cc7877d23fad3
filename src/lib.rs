// 모듈 선언
pub mod box_format;
pub mod client;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod notify;
pub mod overlay;
pub mod utils;

// 자주 쓰는 타입 재export
pub use client::DetectionClient;
pub use detection::analytics::DetectionSummary;
pub use detection::{ConfidenceTier, Detection, DetectionResponse};
pub use error::{AppError, AppResult};
pub use geometry::{DisplayGeometry, NotReady, ScreenRect, compute_geometry};
pub use notify::{Notification, NotificationCenter, NotificationKind, Notifier};
pub use overlay::{DrawSurface, OverlayRenderer, OverlayStyle, RasterSurface};
