use ab_glyph::FontArc;
use detection_overlay_lib::{
    AppError, AppResult, Detection, DetectionClient, DetectionResponse, DetectionSummary,
    DisplayGeometry, DrawSurface, Notification, NotificationCenter, NotificationKind, Notifier,
    OverlayRenderer, OverlayStyle, RasterSurface, ScreenRect, compute_geometry,
    detection::{ConfidenceTier, HealthStatus},
    error::validation,
    overlay::RenderStats,
    utils::perf_utils::PerformanceTimer,
};
use eframe::egui;
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use detection_overlay_lib::config::CONFIG;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// GUI 애플리케이션 실행
pub fn run_gui() -> anyhow::Result<()> {
    let client = DetectionClient::new(&CONFIG.api)?;
    info!("detection backend: {}", client.base_url());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([CONFIG.ui.window_width, CONFIG.ui.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "Object Detection Overlay",
        options,
        Box::new(move |_cc| Ok(Box::new(DetectionApp::new(client, Box::new(DialogFileSelector))))),
    )
    .map_err(|e| anyhow::anyhow!("GUI 실행 오류: {e}"))
}

/// 파일 선택 기능. 앱 생성 시 주입한다
pub trait FileSelector {
    /// 분석할 이미지 선택
    fn pick_image(&mut self) -> Option<PathBuf>;
    /// 주석 이미지를 저장할 경로 선택
    fn pick_export_path(&mut self, suggested_name: &str) -> Option<PathBuf>;
}

/// 네이티브 파일 대화상자
struct DialogFileSelector;

impl FileSelector for DialogFileSelector {
    fn pick_image(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Image files", IMAGE_EXTENSIONS)
            .pick_file()
    }

    fn pick_export_path(&mut self, suggested_name: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name(suggested_name)
            .save_file()
    }
}

/// egui 페인터 위의 오버레이 표면. `origin`은 컨테이너 왼쪽 위
struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl EguiSurface<'_> {
    fn to_egui_rect(&self, rect: ScreenRect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.origin + egui::vec2(rect.x, rect.y),
            egui::vec2(rect.width, rect.height),
        )
    }
}

fn to_color32(color: Rgba<u8>) -> egui::Color32 {
    let [r, g, b, a] = color.0;
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

impl DrawSurface for EguiSurface<'_> {
    fn clear(&mut self) {
        // 즉시 모드라 매 프레임 비어 있는 상태에서 시작한다
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>) {
        self.painter
            .rect_filled(self.to_egui_rect(rect), 0.0, to_color32(color));
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, width: f32) {
        let r = self.to_egui_rect(rect);
        let stroke = egui::Stroke::new(width, to_color32(color));
        let corners = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()];
        for (from, to) in corners.iter().zip(corners.iter().cycle().skip(1)) {
            self.painter.line_segment([*from, *to], stroke);
        }
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.painter
            .layout_no_wrap(
                text.to_string(),
                egui::FontId::proportional(font_size),
                egui::Color32::WHITE,
            )
            .size()
            .x
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, font_size: f32, color: Rgba<u8>) {
        self.painter.text(
            self.origin + egui::vec2(x, y),
            egui::Align2::LEFT_TOP,
            text,
            egui::FontId::proportional(font_size),
            to_color32(color),
        );
    }
}

/// 워커 스레드가 UI 로 보내는 메시지
enum WorkerMessage {
    Detection {
        request_id: u64,
        result: AppResult<DetectionResponse>,
    },
    Health(AppResult<HealthStatus>),
}

/// 화면에 올린 이미지
struct LoadedImage {
    texture: egui::TextureHandle,
    pixels: RgbaImage,
}

impl LoadedImage {
    fn natural_size(&self) -> (f32, f32) {
        let (w, h) = self.pixels.dimensions();
        (w as f32, h as f32)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DetectionSortBy {
    Index,
    Class,
    Confidence,
}

/// 객체 검출 오버레이 애플리케이션
struct DetectionApp {
    client: DetectionClient,
    renderer: OverlayRenderer,
    file_selector: Box<dyn FileSelector>,
    export_font: Option<FontArc>,
    // 알림
    notifications: NotificationCenter,
    notifier: Notifier,
    // 업로드 워커
    worker_tx: Sender<WorkerMessage>,
    worker_rx: Receiver<WorkerMessage>,
    next_request_id: u64,
    pending_request: Option<u64>,
    health_pending: bool,
    backend_status: Option<String>,
    // 현재 이미지와 결과
    selected_image_path: Option<PathBuf>,
    image: Option<LoadedImage>,
    response: Option<DetectionResponse>,
    detections: Vec<Detection>,
    summary: DetectionSummary,
    error_message: Option<String>,
    // 표시 상태
    show_annotations: bool,
    list_hover: Option<usize>,
    image_hover: Option<usize>,
    sort_by: DetectionSortBy,
    sort_asc: bool,
}

impl DetectionApp {
    fn new(client: DetectionClient, file_selector: Box<dyn FileSelector>) -> Self {
        let style = OverlayStyle::from_config(&CONFIG.overlay).unwrap_or_else(|e| {
            warn!("invalid overlay style, using defaults: {e}");
            OverlayStyle::default()
        });

        let export_font = CONFIG.overlay.font_path.as_ref().and_then(|path| {
            match RasterSurface::load_font(Path::new(path)) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("export font unavailable, labels will be blank: {e}");
                    None
                }
            }
        });

        let (notifications, notifier) = NotificationCenter::new();
        let (worker_tx, worker_rx) = mpsc::channel();

        Self {
            client,
            renderer: OverlayRenderer::new(style),
            file_selector,
            export_font,
            notifications,
            notifier,
            worker_tx,
            worker_rx,
            next_request_id: 0,
            pending_request: None,
            health_pending: false,
            backend_status: None,
            selected_image_path: None,
            image: None,
            response: None,
            detections: Vec::new(),
            summary: DetectionSummary::default(),
            error_message: None,
            show_annotations: CONFIG.ui.show_annotations,
            list_hover: None,
            image_hover: None,
            sort_by: DetectionSortBy::Index,
            sort_asc: true,
        }
    }
}

impl eframe::App for DetectionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }
}

impl DetectionApp {
    /// 한 프레임 그리기
    fn show(&mut self, ctx: &egui::Context) {
        self.poll_worker();
        self.handle_input(ctx);

        // 목록 위 마우스 위치는 매 프레임 다시 판정한다
        self.list_hover = None;

        // 좌측 사이드 패널 (제어 및 검출 결과)
        egui::SidePanel::left("detections_panel")
            .resizable(true)
            .default_width(420.0)
            .show(ctx, |ui| {
                self.render_header(ui);
                self.render_error_message(ui);
                self.render_analytics_panel(ui);
                self.render_detections_panel(ui);
            });

        // 중앙 패널 (이미지 + 오버레이)
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_image_panel(ui);
        });

        self.render_notifications(ctx);

        if self.pending_request.is_some() || self.health_pending {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    /// 단축키와 파일 드롭 처리
    fn handle_input(&mut self, ctx: &egui::Context) {
        let (open, toggle, dropped) = ctx.input(|input| {
            (
                input.key_pressed(egui::Key::O) && input.modifiers.command,
                input.key_pressed(egui::Key::H) && !input.modifiers.any(),
                input.raw.dropped_files.iter().find_map(|f| f.path.clone()),
            )
        });

        if toggle {
            self.show_annotations = !self.show_annotations;
        }
        if open {
            self.select_image(ctx);
        }
        if let Some(path) = dropped {
            self.start_detection(ctx, path);
        }
    }

    /// 헤더 영역 렌더링
    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.heading("Object Detection Overlay");
        ui.horizontal(|ui| {
            ui.label("Backend:");
            ui.colored_label(egui::Color32::from_rgb(0, 150, 255), self.client.base_url());
            if let Some(status) = &self.backend_status {
                ui.label(format!("({status})"));
            }
        });
        ui.add_space(10.0);

        let busy = self.pending_request.is_some();
        if ui
            .add_sized(egui::vec2(380.0, 40.0), egui::Button::new("📁 Select Image"))
            .clicked()
        {
            self.select_image(ui.ctx());
        }

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.health_pending, egui::Button::new("🩺 Check Backend"))
                .clicked()
            {
                self.check_health(ui.ctx());
            }
            let can_export = self.image.is_some() && !self.detections.is_empty();
            if ui
                .add_enabled(can_export, egui::Button::new("💾 Export Annotated PNG"))
                .clicked()
            {
                self.export_annotated();
            }
        });

        ui.checkbox(&mut self.show_annotations, "Show annotations (H)");

        if busy {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing image...");
            });
        }

        if let Some(path) = &self.selected_image_path {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy())
                .unwrap_or_else(|| "<unknown>".into());
            ui.label(format!("Selected: {file_name}"));
        }

        if let Some(response) = &self.response {
            if let Some(processing) = response.processing_time {
                ui.horizontal(|ui| {
                    ui.label("⏱️ Backend time:");
                    ui.colored_label(
                        egui::Color32::from_rgb(0, 150, 255),
                        format!("{:.2} ms", processing * 1000.0),
                    );
                });
            }
            if let Some(round_trip) = response.round_trip_ms {
                ui.horizontal(|ui| {
                    ui.label("⏱️ Round trip:");
                    ui.colored_label(
                        egui::Color32::from_rgb(0, 150, 255),
                        format!("{round_trip:.2} ms"),
                    );
                });
            }
            if let Some(model) = response.model_info.as_ref().and_then(|m| m.name.as_deref()) {
                ui.label(format!("Model: {model}"));
            }
        }
    }

    /// 에러 메시지 렌더링
    fn render_error_message(&self, ui: &mut egui::Ui) {
        if let Some(error) = &self.error_message {
            ui.colored_label(egui::Color32::RED, format!("Error: {error}"));
        }
        ui.add_space(10.0);
    }

    /// 요약 통계 패널
    fn render_analytics_panel(&mut self, ui: &mut egui::Ui) {
        if self.summary.total == 0 {
            return;
        }
        let style = self.renderer.style().clone();

        ui.collapsing("📊 Analytics", |ui| {
            egui::Grid::new("analytics_grid")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Total objects:");
                    ui.label(self.summary.total.to_string());
                    ui.end_row();

                    ui.label("Unique classes:");
                    ui.label(self.summary.unique_classes.to_string());
                    ui.end_row();

                    if let Some(avg) = self.summary.average_confidence {
                        ui.label("Avg. confidence:");
                        ui.label(format!("{:.1}%", avg * 100.0));
                        ui.end_row();
                    }

                    let tiers = [ConfidenceTier::High, ConfidenceTier::Medium, ConfidenceTier::Low];
                    for tier in tiers {
                        ui.colored_label(to_color32(style.tier_color(tier)), tier.name());
                        ui.label(format!(
                            "{} ({:.0}%)",
                            self.summary.tiers.get(tier),
                            self.summary.tier_percentage(tier)
                        ));
                        ui.end_row();
                    }
                });

            ui.add_space(5.0);
            ui.label(egui::RichText::new("Classes").strong());
            for (label, count) in &self.summary.class_distribution {
                ui.label(format!("{label}: {count}"));
            }

            ui.add_space(5.0);
            ui.label(egui::RichText::new("Top detections").strong());
            for &i in &self.summary.top {
                if let Some(det) = self.detections.get(i) {
                    let response = ui.label(det.label_text());
                    if response.hovered() {
                        self.list_hover = Some(i);
                    }
                }
            }
        });
        ui.add_space(10.0);
    }

    /// 검출 결과 패널 렌더링 (테이블 형태)
    fn render_detections_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(format!("Detections ({})", self.detections.len()));

        if self.detections.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.label("No detections yet.");
                ui.label("Select an image to get started.");
            });
            return;
        }

        // 정렬 컨트롤
        ui.horizontal(|ui| {
            ui.label("Sort by:");
            egui::ComboBox::from_id_salt("sort_by")
                .selected_text(match self.sort_by {
                    DetectionSortBy::Index => "Index",
                    DetectionSortBy::Class => "Class",
                    DetectionSortBy::Confidence => "Conf",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.sort_by, DetectionSortBy::Index, "Index");
                    ui.selectable_value(&mut self.sort_by, DetectionSortBy::Class, "Class");
                    ui.selectable_value(&mut self.sort_by, DetectionSortBy::Confidence, "Conf");
                });
            if ui
                .button(if self.sort_asc { "Asc" } else { "Desc" })
                .clicked()
            {
                self.sort_asc = !self.sort_asc;
            }
        });
        ui.add_space(6.0);

        let indices = sorted_indices(&self.detections, self.sort_by, self.sort_asc);
        let style = self.renderer.style().clone();
        let highlighted = self.highlighted();
        let mut hovered_row = None;

        egui::ScrollArea::vertical()
            .id_salt("scroll_area_detections")
            .show(ui, |ui| {
                egui::Grid::new("detections_table")
                    .striped(true)
                    .num_columns(4)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("#").strong());
                        ui.label(egui::RichText::new("Class").strong());
                        ui.label(egui::RichText::new("Conf").strong());
                        ui.label(egui::RichText::new("BBox").strong());
                        ui.end_row();

                        for &i in &indices {
                            let det = &self.detections[i];
                            let color = if highlighted == Some(i) {
                                style.highlight_color
                            } else {
                                style.tier_color(det.tier())
                            };

                            let bbox_text = match &det.bbox {
                                Some(b) => b
                                    .iter()
                                    .map(|v| format!("{v:.0}"))
                                    .collect::<Vec<_>>()
                                    .join(", "),
                                None => "-".to_string(),
                            };

                            // 행의 어느 셀이든 마우스를 올리면 해당 박스를 강조한다
                            let cells = [
                                ui.add(
                                    egui::Label::new(format!("{}", i + 1))
                                        .sense(egui::Sense::hover()),
                                ),
                                ui.add(
                                    egui::Label::new(
                                        egui::RichText::new(&det.label).color(to_color32(color)),
                                    )
                                    .sense(egui::Sense::hover()),
                                ),
                                ui.add(
                                    egui::Label::new(format!("{:.1}%", det.confidence * 100.0))
                                        .sense(egui::Sense::hover()),
                                ),
                                ui.add(
                                    egui::Label::new(format!("[{bbox_text}]"))
                                        .sense(egui::Sense::hover()),
                                ),
                            ];
                            if cells.iter().any(|c| c.hovered()) {
                                hovered_row = Some(i);
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(row) = hovered_row {
            self.list_hover = Some(row);
        }
    }

    /// 이미지 패널 렌더링 (contain 배치 이미지 + 오버레이)
    fn render_image_panel(&mut self, ui: &mut egui::Ui) {
        let Some(image) = &self.image else {
            self.image_hover = None;
            self.render_empty_image_placeholder(ui);
            return;
        };

        let (natural_w, natural_h) = image.natural_size();
        let container = ui.available_size();
        let (response, painter) = ui.allocate_painter(container, egui::Sense::hover());
        let origin = response.rect.min;

        let geometry = match compute_geometry(natural_w, natural_h, container.x, container.y) {
            Ok(g) => Some(g),
            Err(e) => {
                debug!("overlay not ready: {e}");
                None
            }
        };

        if let Some(g) = &geometry {
            let bounds = g.image_bounds();
            let img_rect = egui::Rect::from_min_size(
                origin + egui::vec2(bounds.x, bounds.y),
                egui::vec2(bounds.width, bounds.height),
            );
            painter.image(
                image.texture.id(),
                img_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        self.image_hover = match (&geometry, response.hover_pos()) {
            (Some(g), Some(pos)) if self.show_annotations => self.renderer.hit_test(
                &self.detections,
                g,
                pos.x - origin.x,
                pos.y - origin.y,
            ),
            _ => None,
        };

        let mut surface = EguiSurface {
            painter: &painter,
            origin,
        };
        self.renderer.render(
            &mut surface,
            &self.detections,
            geometry.as_ref(),
            self.highlighted(),
            self.show_annotations,
        );

        if let Some(det) = self.image_hover.and_then(|i| self.detections.get(i)) {
            let mut text = det.label_text();
            if let Some(description) = &det.description {
                text.push('\n');
                text.push_str(description);
            }
            response.on_hover_text(text);
        }
    }

    /// 빈 이미지 플레이스홀더 렌더링
    fn render_empty_image_placeholder(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.label(egui::RichText::new("📷").size(64.0));
            ui.label("Drag and drop an image here");
            ui.label("or click 'Select Image' to choose a file");
        });
    }

    /// 알림 표시 (오른쪽 위)
    fn render_notifications(&mut self, ctx: &egui::Context) {
        self.notifications.poll(Instant::now());
        if self.notifications.is_empty() {
            return;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("notifications"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                for (id, notification) in self.notifications.active() {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.horizontal(|ui| {
                            ui.colored_label(
                                kind_color(notification.kind),
                                egui::RichText::new(&notification.title).strong(),
                            );
                            if ui.small_button("✕").clicked() {
                                dismissed = Some(id);
                            }
                        });
                        ui.label(notification.message.as_str());
                    });
                    ui.add_space(6.0);
                }
            });

        if let Some(id) = dismissed {
            self.notifications.dismiss(id);
        }
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    /// 목록 또는 이미지 위에 마우스가 있는 박스
    fn highlighted(&self) -> Option<usize> {
        self.list_hover.or(self.image_hover)
    }

    /// 이미지 파일 선택
    fn select_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = self.file_selector.pick_image() {
            self.start_detection(ctx, path);
        }
    }

    /// 이미지를 화면에 올리고 백엔드 업로드를 시작한다
    fn start_detection(&mut self, ctx: &egui::Context, path: PathBuf) {
        self.error_message = None;
        self.response = None;
        self.detections.clear();
        self.summary = DetectionSummary::default();
        self.list_hover = None;
        self.image_hover = None;

        match load_image(ctx, &path) {
            Ok(image) => self.image = Some(image),
            Err(e) => {
                warn!("failed to load {}: {e}", path.display());
                let message = e.user_message();
                self.error_message = Some(message.clone());
                self.notifier.notify(Notification::error("Invalid image", message));
                return;
            }
        }
        self.selected_image_path = Some(path.clone());

        // 이전 요청의 응답은 도착해도 버린다
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.pending_request = Some(request_id);
        self.notifier
            .notify(Notification::processing("Processing", "Analyzing image..."));

        let client = self.client.clone();
        let tx = self.worker_tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = client.detect(&path);
            if tx.send(WorkerMessage::Detection { request_id, result }).is_err() {
                debug!("UI closed before detection #{request_id} finished");
            }
            ctx.request_repaint();
        });
    }

    /// 백엔드 상태 확인 (워커 스레드)
    fn check_health(&mut self, ctx: &egui::Context) {
        self.health_pending = true;
        let client = self.client.clone();
        let tx = self.worker_tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            if tx.send(WorkerMessage::Health(client.health())).is_err() {
                debug!("UI closed before health check finished");
            }
            ctx.request_repaint();
        });
    }

    /// 워커 결과 수신
    fn poll_worker(&mut self) {
        while let Ok(message) = self.worker_rx.try_recv() {
            match message {
                WorkerMessage::Detection { request_id, result } => {
                    if self.pending_request != Some(request_id) {
                        debug!("dropping stale detection response #{request_id}");
                        continue;
                    }
                    self.pending_request = None;
                    match result {
                        Ok(response) => self.apply_response(response),
                        Err(e) => {
                            warn!("detection failed: {e}");
                            let message = e.user_message();
                            self.error_message = Some(message.clone());
                            self.notifier
                                .notify(Notification::error("Detection failed", message));
                        }
                    }
                }
                WorkerMessage::Health(result) => {
                    self.health_pending = false;
                    match result {
                        Ok(health) => {
                            let status = match &health.model_status {
                                Some(model) => format!("{}, model {model}", health.status),
                                None => health.status.clone(),
                            };
                            self.notifier
                                .notify(Notification::info("Backend status", status.clone()));
                            self.backend_status = Some(status);
                        }
                        Err(e) => {
                            warn!("health check failed: {e}");
                            self.backend_status = Some("unreachable".to_string());
                            self.notifier.notify(Notification::error(
                                "Backend unavailable",
                                e.user_message(),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// 새 검출 결과로 목록 전체를 교체한다
    fn apply_response(&mut self, response: DetectionResponse) {
        self.detections = response.detections.clone();
        self.summary =
            DetectionSummary::from_detections(&self.detections, CONFIG.ui.top_detections);

        if self.detections.is_empty() {
            self.notifier
                .notify(Notification::info("No objects", "No objects detected in this image"));
        } else {
            self.notifier.notify(Notification::success(
                "Detection complete",
                format!(
                    "Found {} objects: {}",
                    self.summary.total,
                    self.summary.describe()
                ),
            ));
        }
        self.response = Some(response);
    }

    /// 원본 해상도로 오버레이를 합성해 PNG 로 저장
    fn export_annotated(&mut self) {
        let Some(image) = &self.image else {
            return;
        };
        let suggested = self
            .selected_image_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|stem| format!("{}_annotated.png", stem.to_string_lossy()))
            .unwrap_or_else(|| "annotated.png".to_string());
        let Some(path) = self.file_selector.pick_export_path(&suggested) else {
            return;
        };

        let result = render_annotated(
            &self.renderer,
            &self.detections,
            &image.pixels,
            self.export_font.as_ref(),
        )
        .and_then(|(annotated, stats)| {
            annotated.save_with_format(&path, image::ImageFormat::Png)?;
            Ok(stats)
        });

        match result {
            Ok(stats) => {
                info!("exported {} boxes to {}", stats.drawn, path.display());
                self.notifier.notify(Notification::success(
                    "Exported",
                    format!("Saved {}", path.display()),
                ));
            }
            Err(e) => {
                warn!("export failed: {e}");
                self.notifier
                    .notify(Notification::error("Export failed", e.user_message()));
            }
        }
    }
}

/// 이미지 파일을 디코딩해 텍스처로 올린다
fn load_image(ctx: &egui::Context, path: &Path) -> AppResult<LoadedImage> {
    let _timer = PerformanceTimer::new("load_image");
    validation::validate_image_path(path)?;
    let bytes = fs::read(path)?;
    validation::validate_image_data(&bytes)?;

    let pixels = image::load_from_memory(&bytes)?.to_rgba8();
    let (w, h) = pixels.dimensions();
    let texture = ctx.load_texture(
        "selected_image",
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], pixels.as_raw()),
        egui::TextureOptions::LINEAR,
    );
    debug!("loaded {} ({w}x{h})", path.display());
    Ok(LoadedImage { texture, pixels })
}

/// 원본 크기 표면에 박스를 그리고 원본 이미지 위에 합성
fn render_annotated(
    renderer: &OverlayRenderer,
    detections: &[Detection],
    pixels: &RgbaImage,
    font: Option<&FontArc>,
) -> AppResult<(RgbaImage, RenderStats)> {
    let (w, h) = pixels.dimensions();
    let geometry: DisplayGeometry = compute_geometry(w as f32, h as f32, w as f32, h as f32)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let mut surface = RasterSurface::new(w, h);
    if let Some(font) = font {
        surface = surface.with_font(font.clone());
    }
    let stats = renderer.render(&mut surface, detections, Some(&geometry), None, true);
    Ok((surface.composite_over(pixels), stats))
}

fn sorted_indices(detections: &[Detection], sort_by: DetectionSortBy, asc: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..detections.len()).collect();
    indices.sort_by(|&a, &b| {
        let ord = match sort_by {
            DetectionSortBy::Index => a.cmp(&b),
            DetectionSortBy::Class => detections[a].label.cmp(&detections[b].label),
            DetectionSortBy::Confidence => detections[a]
                .confidence
                .partial_cmp(&detections[b].confidence)
                .unwrap_or(std::cmp::Ordering::Equal),
        };
        if asc { ord } else { ord.reverse() }
    });
    indices
}

fn kind_color(kind: NotificationKind) -> egui::Color32 {
    match kind {
        NotificationKind::Success => egui::Color32::from_rgb(0x22, 0xc5, 0x5e),
        NotificationKind::Error => egui::Color32::from_rgb(0xef, 0x44, 0x44),
        NotificationKind::Info => egui::Color32::from_rgb(0x3b, 0x82, 0xf6),
        NotificationKind::Processing => egui::Color32::from_rgb(0xea, 0xb3, 0x08),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detection_overlay_lib::config::ApiConfig;

    fn sample() -> Vec<Detection> {
        vec![
            Detection::new("dog", 0.7, vec![0.0, 0.0, 10.0, 10.0]),
            Detection::new("cat", 0.9, vec![0.0, 0.0, 10.0, 10.0]),
            Detection::new("bird", 0.3, vec![0.0, 0.0, 10.0, 10.0]),
        ]
    }

    #[test]
    fn sorting_by_confidence_and_class() {
        let dets = sample();
        assert_eq!(sorted_indices(&dets, DetectionSortBy::Index, true), vec![0, 1, 2]);
        assert_eq!(sorted_indices(&dets, DetectionSortBy::Confidence, false), vec![1, 0, 2]);
        assert_eq!(sorted_indices(&dets, DetectionSortBy::Class, true), vec![2, 1, 0]);
    }

    #[test]
    fn export_draws_at_natural_resolution() {
        let background = RgbaImage::from_pixel(200, 100, Rgba([10, 10, 10, 255]));
        let detections = vec![
            Detection::new("dog", 0.9, vec![20.0, 40.0, 120.0, 90.0]),
            Detection::new("broken", 0.9, vec![1.0]),
        ];
        let renderer = OverlayRenderer::default();
        let (out, stats) = render_annotated(&renderer, &detections, &background, None).unwrap();

        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(stats, RenderStats { drawn: 1, skipped: 1 });
        // 테두리는 높은 신뢰도 색, 박스 밖은 원본 그대로
        assert_eq!(*out.get_pixel(20, 60), renderer.style().high_color);
        assert_eq!(*out.get_pixel(199, 0), Rgba([10, 10, 10, 255]));
    }

    struct FixedSelector(Option<PathBuf>);

    impl FileSelector for FixedSelector {
        fn pick_image(&mut self) -> Option<PathBuf> {
            self.0.take()
        }
        fn pick_export_path(&mut self, _suggested_name: &str) -> Option<PathBuf> {
            None
        }
    }

    fn run_frame(ctx: &egui::Context, app: &mut DetectionApp, pointer: egui::Pos2) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1200.0, 800.0),
            )),
            events: vec![egui::Event::PointerMoved(pointer)],
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| app.show(ctx));
    }

    #[test]
    fn list_highlight_follows_pointer_and_clears_on_leave() {
        let client = DetectionClient::new(&ApiConfig::default()).unwrap();
        let mut app = DetectionApp::new(client, Box::new(FixedSelector(None)));
        app.detections = sample();
        app.summary = DetectionSummary::from_detections(&app.detections, 5);

        let ctx = egui::Context::default();
        let away = egui::pos2(1100.0, 780.0);
        for _ in 0..3 {
            run_frame(&ctx, &mut app, away);
        }
        assert_eq!(app.list_hover, None);

        // 사이드 패널을 훑어 목록 행 위에 포인터를 올린다
        let mut row_pos = None;
        'scan: for x in [12.0, 30.0, 50.0, 80.0, 120.0] {
            for step in 0..260 {
                let pos = egui::pos2(x, step as f32 * 3.0);
                run_frame(&ctx, &mut app, pos);
                run_frame(&ctx, &mut app, pos);
                if app.list_hover.is_some() {
                    row_pos = Some(pos);
                    break 'scan;
                }
            }
        }
        assert!(row_pos.is_some(), "no detection row under the pointer");
        let hovered = app.list_hover;
        assert_eq!(app.highlighted(), hovered);

        for _ in 0..3 {
            run_frame(&ctx, &mut app, away);
        }
        assert_eq!(app.list_hover, None);
        assert_eq!(app.highlighted(), None);
    }

    #[test]
    fn health_check_reports_unreachable_backend() {
        // 바로 닫아 비어 있는 포트를 얻는다
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let config = ApiConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 2,
            ..ApiConfig::default()
        };
        let ctx = egui::Context::default();

        let client = DetectionClient::new(&config).unwrap();
        let mut app = DetectionApp::new(client.clone(), Box::new(FixedSelector(None)));
        app.check_health(&ctx);
        assert!(app.health_pending);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while app.health_pending && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
            app.poll_worker();
        }
        assert!(!app.health_pending);
        assert_eq!(app.backend_status.as_deref(), Some("unreachable"));

        // UI 가 먼저 닫혀도 워커는 패닉 없이 끝난다
        let mut closed = DetectionApp::new(client, Box::new(FixedSelector(None)));
        closed.check_health(&ctx);
        drop(closed);
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    #[test]
    fn injected_selector_is_used_once() {
        let mut selector: Box<dyn FileSelector> =
            Box::new(FixedSelector(Some(PathBuf::from("a.png"))));
        assert_eq!(selector.pick_image(), Some(PathBuf::from("a.png")));
        assert_eq!(selector.pick_image(), None);
        assert_eq!(selector.pick_export_path("x.png"), None);
    }
}
