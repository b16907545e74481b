//! Main GUI application module
//!
//! Contains the CollectionApp struct: the frameless window shell (title bar,
//! panel combo, resize handles), panel dispatch and shutdown cleanup.

use crate::automation::{AutomatorRegistry, InvoiceAutomator, WorkerPool};
use crate::config::AutomationConfig;
use crate::settings::Settings;
use anyhow::{anyhow, Result};
use eframe::{egui, egui::RichText, App, Frame, NativeOptions};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::dialogs::DialogQueue;
use super::helpers::{load_icon, TextureCache, LOGO_PATH};
use super::navigation::{Navigator, Panel};
use super::notifications::NotificationEntry;
use super::theme::{configure_style, AppTheme, IconButton, SurfaceId, ThemeManager};
use super::views::{AgitelState, CollectionState, MergeState, OrganizeState, ReplaceState};

pub const WINDOW_TITLE: &str = "LE - Automação de Coleta";

const TITLE_BAR_HEIGHT: f32 = 36.0;
const RESIZE_MARGIN: f32 = 5.0;
const TOAST_DURATION: Duration = Duration::from_secs(5);

pub struct CollectionApp {
    pub(crate) settings: Settings,
    pub(crate) config: AutomationConfig,
    pub(crate) pool: WorkerPool,
    pub(crate) registry: AutomatorRegistry,
    pub(crate) theme_manager: ThemeManager,
    pub(crate) navigator: Navigator,
    pub(crate) dialogs: DialogQueue,
    pub(crate) notifications: VecDeque<NotificationEntry>,
    pub(crate) collection: CollectionState,
    pub(crate) organize: OrganizeState,
    pub(crate) agitel: AgitelState,
    pub(crate) merge: MergeState,
    pub(crate) replace: ReplaceState,
    /// Automators that ran at least once; their browsers are released on exit
    pub(crate) started: Vec<Arc<dyn InvoiceAutomator>>,
    textures: TextureCache,
    show_notifications_popup: bool,
    last_seen_notification: Option<chrono::DateTime<chrono::Local>>,
    toast_close_time: Option<Instant>,
}

impl CollectionApp {
    pub fn new(config: AutomationConfig, settings: Settings, pool: WorkerPool, ctx: &egui::Context) -> Self {
        let theme_manager = ThemeManager::with_defaults();
        configure_style(ctx, &theme_manager.theme());

        let mut app = Self {
            settings,
            config,
            pool,
            registry: AutomatorRegistry::with_defaults(),
            theme_manager,
            navigator: Navigator::default(),
            dialogs: DialogQueue::default(),
            notifications: VecDeque::new(),
            collection: CollectionState::default(),
            organize: OrganizeState::default(),
            agitel: AgitelState::default(),
            merge: MergeState::default(),
            replace: ReplaceState::default(),
            started: Vec::new(),
            textures: TextureCache::default(),
            show_notifications_popup: false,
            last_seen_notification: None,
            toast_close_time: None,
        };
        app.restore_data_file();
        app
    }

    /// Palette of a registered surface, or the current one
    pub(crate) fn surface_theme(&self, id: SurfaceId) -> AppTheme {
        self.theme_manager
            .surface(id)
            .copied()
            .unwrap_or_else(|| self.theme_manager.theme())
    }

    pub(crate) fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme_manager.toggle();
        configure_style(ctx, &self.theme_manager.theme());
    }

    /// Append to the user-visible operation history
    pub(crate) fn record_operation(&self, operation: &str, details: String) {
        if let Err(e) = crate::operation_log::append_log(operation, details) {
            tracing::warn!("Failed to write operation log: {}", e);
        }
    }

    pub(crate) fn render_section_header(&self, ui: &mut egui::Ui, theme: &AppTheme, title: &str) {
        ui.label(RichText::new(title).size(22.0).strong().color(theme.text_primary));
        let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), 2.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 0.0, theme.primary);
    }

    /// Background work is polled every frame, whichever panel is visible
    fn poll_jobs(&mut self) {
        self.collection.drain_logs();
        self.poll_organize();
        self.poll_agitel();
        self.poll_merge();
        self.poll_replace();
    }

    /// Ask every started automator to close its browser sessions.
    /// Failures are only logged; the window is closing anyway.
    pub(crate) fn shutdown_automators(&mut self) {
        for automator in self.started.drain(..) {
            match self.pool.block_on(automator.shutdown()) {
                Ok(()) => tracing::debug!("{} automator shut down", automator.carrier()),
                Err(e) => tracing::warn!("Failed to release {} browser sessions: {:#}", automator.carrier(), e),
            }
        }
    }

    fn icon_button(&mut self, ui: &mut egui::Ui, theme: &AppTheme, button: IconButton) -> egui::Response {
        let texture = self
            .theme_manager
            .icon_path(button)
            .and_then(|path| self.textures.get(ui.ctx(), &path));
        let widget = match &texture {
            Some(texture) => theme.button_icon(egui::Image::new(texture).fit_to_exact_size(egui::vec2(16.0, 16.0))),
            None => theme.button_title_bar(RichText::new(button.glyph()).size(15.0).color(egui::Color32::WHITE)),
        };
        ui.add(widget).on_hover_text(button.tooltip())
    }

    fn render_title_bar(&mut self, ctx: &egui::Context) {
        let theme = self.surface_theme(SurfaceId::TitleBar);
        egui::TopBottomPanel::top("title_bar")
            .exact_height(TITLE_BAR_HEIGHT)
            .frame(
                egui::Frame::none()
                    .fill(theme.title_bar)
                    .inner_margin(egui::Margin::symmetric(theme.spacing_sm, 4.0)),
            )
            .show(ctx, |ui| {
                // Drag area first so the buttons added on top keep their clicks
                let bar = ui.max_rect();
                let drag = ui.interact(bar, egui::Id::new("title_bar_drag"), egui::Sense::click_and_drag());
                if drag.drag_started_by(egui::PointerButton::Primary) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                let maximized = ctx.input(|i| i.viewport().maximized.unwrap_or(false));
                if drag.double_clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(!maximized));
                }

                ui.horizontal_centered(|ui| {
                    match self.textures.get(ctx, Path::new(LOGO_PATH)) {
                        Some(logo) => {
                            ui.add(egui::Image::new(&logo).fit_to_exact_size(egui::vec2(24.0, 24.0)));
                        }
                        None => {
                            ui.label(RichText::new("LE").strong().color(egui::Color32::WHITE));
                        }
                    }
                    ui.label(RichText::new(WINDOW_TITLE).strong().color(egui::Color32::WHITE));
                    ui.add_space(theme.spacing_md);

                    let mut chosen = None;
                    egui::ComboBox::from_id_source("panel_selector")
                        .selected_text(self.navigator.selected_label())
                        .width(220.0)
                        .show_ui(ui, |ui| {
                            for entry in self.navigator.entries() {
                                let selected = entry == self.navigator.selected_label();
                                if ui.selectable_label(selected, entry).clicked() {
                                    chosen = Some(entry.clone());
                                }
                            }
                        });
                    if let Some(label) = chosen {
                        self.navigator.select_label(&label);
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.icon_button(ui, &theme, IconButton::Close).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                        if self.icon_button(ui, &theme, IconButton::Maximize).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(!maximized));
                        }
                        if self.icon_button(ui, &theme, IconButton::Minimize).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                        }
                        ui.add_space(theme.spacing_sm);
                        if self.icon_button(ui, &theme, IconButton::Theme).clicked() {
                            self.toggle_theme(ctx);
                        }
                        if self.icon_button(ui, &theme, IconButton::Home).clicked() {
                            self.navigator.go_home();
                        }
                    });
                });
            });
    }

    /// Invisible edge strips that start an OS resize of the frameless window
    fn render_resize_handles(&self, ctx: &egui::Context) {
        if ctx.input(|i| i.viewport().maximized.unwrap_or(false)) {
            return;
        }
        use egui::viewport::ResizeDirection as Dir;
        let screen = ctx.screen_rect();
        let m = RESIZE_MARGIN;
        let edges = [
            (Dir::North, egui::Rect::from_min_max(screen.left_top() + egui::vec2(m, 0.0), screen.right_top() + egui::vec2(-m, m)), egui::CursorIcon::ResizeVertical),
            (Dir::South, egui::Rect::from_min_max(screen.left_bottom() + egui::vec2(m, -m), screen.right_bottom() + egui::vec2(-m, 0.0)), egui::CursorIcon::ResizeVertical),
            (Dir::West, egui::Rect::from_min_max(screen.left_top() + egui::vec2(0.0, m), screen.left_bottom() + egui::vec2(m, -m)), egui::CursorIcon::ResizeHorizontal),
            (Dir::East, egui::Rect::from_min_max(screen.right_top() + egui::vec2(-m, m), screen.right_bottom() + egui::vec2(0.0, -m)), egui::CursorIcon::ResizeHorizontal),
            (Dir::NorthWest, egui::Rect::from_min_size(screen.left_top(), egui::vec2(m, m)), egui::CursorIcon::ResizeNwSe),
            (Dir::SouthEast, egui::Rect::from_min_size(screen.right_bottom() - egui::vec2(m, m), egui::vec2(m, m)), egui::CursorIcon::ResizeNwSe),
            (Dir::NorthEast, egui::Rect::from_min_size(screen.right_top() - egui::vec2(m, 0.0), egui::vec2(m, m)), egui::CursorIcon::ResizeNeSw),
            (Dir::SouthWest, egui::Rect::from_min_size(screen.left_bottom() - egui::vec2(0.0, m), egui::vec2(m, m)), egui::CursorIcon::ResizeNeSw),
        ];

        egui::Area::new(egui::Id::new("resize_handles"))
            .fixed_pos(screen.min)
            .order(egui::Order::Foreground)
            .interactable(true)
            .show(ctx, |ui| {
                for (i, (direction, rect, cursor)) in edges.into_iter().enumerate() {
                    let response = ui.interact(rect, egui::Id::new(("resize_edge", i)), egui::Sense::drag());
                    if response.hovered() || response.dragged() {
                        ctx.set_cursor_icon(cursor);
                    }
                    if response.drag_started() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::BeginResize(direction));
                    }
                }
            });
    }

    fn render_notifications(&mut self, ctx: &egui::Context) {
        let theme = self.theme_manager.theme();

        // New notification arrived - show toast
        let newest = self.notifications.back().map(|n| n.timestamp);
        if newest.is_some() && newest != self.last_seen_notification {
            self.toast_close_time = Some(Instant::now() + TOAST_DURATION);
        }
        self.last_seen_notification = newest;
        if self.toast_close_time.is_some_and(|t| Instant::now() >= t) {
            self.toast_close_time = None;
        }

        let count = self.notifications.len();
        let latest = self.notifications.back().map(|n| n.message.clone());
        egui::Area::new(egui::Id::new("notification_overlay"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                theme.frame_surface().show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let color = if count > 0 { theme.primary } else { theme.text_secondary };
                        if ui
                            .add(theme.button_title_bar(RichText::new("[!]").strong().color(color)))
                            .on_hover_text("Histórico de notificações")
                            .clicked()
                        {
                            self.show_notifications_popup = !self.show_notifications_popup;
                        }
                        match (&latest, self.toast_close_time.is_some()) {
                            (Some(message), true) => {
                                let shown: String = message.chars().take(60).collect();
                                let shown = if shown.len() < message.len() { format!("{}...", shown) } else { shown };
                                ui.label(RichText::new(shown).size(12.0).color(theme.text_primary));
                            }
                            _ if count > 0 => {
                                ui.label(RichText::new(count.to_string()).size(10.0).color(theme.warning));
                            }
                            _ => {}
                        }
                    });
                });
            });

        if self.show_notifications_popup {
            let mut open = true;
            egui::Window::new("Notificações")
                .open(&mut open)
                .collapsible(false)
                .resizable(true)
                .default_width(450.0)
                .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -50.0])
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(format!("{} notificações", count)).color(theme.text_secondary));
                        if ui.add(theme.button_small("Limpar")).clicked() {
                            self.notifications.clear();
                        }
                    });
                    ui.separator();
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .max_height(280.0)
                        .show(ui, |ui| {
                            if self.notifications.is_empty() {
                                ui.label(RichText::new("Nenhuma notificação.").color(theme.text_secondary));
                            }
                            for notification in self.notifications.iter().rev() {
                                ui.horizontal_wrapped(|ui| {
                                    ui.label(
                                        RichText::new(format!("[{}]", notification.time_ago()))
                                            .size(11.0)
                                            .color(theme.text_secondary),
                                    );
                                    ui.label(RichText::new(&notification.message).size(12.0));
                                });
                            }
                        });
                });
            self.show_notifications_popup = open;
        }
    }
}

impl App for CollectionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_jobs();

        self.render_title_bar(ctx);

        let modal = self.dialogs.is_open();
        let panel = self.navigator.current();
        let theme = self.theme_manager.theme();
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme.background).inner_margin(theme.spacing_md))
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal, |ui| match panel {
                    Panel::Home => self.view_home(ui),
                    Panel::CollectionAutomation => self.view_collection(ui),
                    Panel::FolderOrganization => self.view_organize(ui),
                    Panel::AgitelProcessing => self.view_agitel(ui),
                    Panel::SpreadsheetMerge => self.view_merge(ui),
                    Panel::SimpleReplace => self.view_replace(ui),
                });
            });

        self.render_notifications(ctx);
        self.render_resize_handles(ctx);
        self.dialogs.show(ctx, &theme);

        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown_automators();
    }
}

/// Launch the GUI application
pub fn launch(config: AutomationConfig, settings: Settings) -> Result<()> {
    let pool = WorkerPool::new(config.worker_threads)?;
    tracing::info!("Worker pool started with {} thread(s)", pool.threads());

    let app_creator = move |cc: &eframe::CreationContext<'_>| {
        Ok(Box::new(CollectionApp::new(config, settings, pool, &cc.egui_ctx)) as Box<dyn App>)
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size([900.0, 550.0])
        .with_min_inner_size([640.0, 420.0])
        .with_decorations(false)
        .with_resizable(true);
    if let Some(icon) = load_icon() {
        viewport = viewport.with_icon(Arc::new(icon));
    }

    let native_options = NativeOptions {
        viewport,
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(WINDOW_TITLE, native_options, Box::new(app_creator))
        .map_err(|e| anyhow!("Failed to start GUI: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{CollectionSummary, DispatchError, LogSink};
    use crate::invoices::InvoiceRow;
    use crate::gui::theme::ThemeMode;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAutomator {
        shutdowns: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl InvoiceAutomator for CountingAutomator {
        fn carrier(&self) -> &str {
            "TESTE"
        }

        async fn collect(&self, _rows: &[InvoiceRow], _log: &LogSink) -> Result<CollectionSummary> {
            Ok(CollectionSummary::default())
        }

        async fn shutdown(&self) -> Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("driver já encerrado"))
            } else {
                Ok(())
            }
        }
    }

    fn app(dir: &Path) -> CollectionApp {
        let ctx = egui::Context::default();
        CollectionApp::new(
            AutomationConfig::default(),
            Settings::new(dir.join("config.ini")),
            WorkerPool::new(1).unwrap(),
            &ctx,
        )
    }

    #[test]
    fn test_new_app_starts_home_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        assert_eq!(app.navigator.current(), Panel::Home);
        assert!(app.collection.table.is_empty());
        assert!(!app.dialogs.is_open());
    }

    #[test]
    fn test_missing_remembered_spreadsheet_shows_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::new(dir.path().join("config.ini"));
        settings.data_path = dir.path().join("sumiu.xlsx").display().to_string();
        let ctx = egui::Context::default();

        let app = CollectionApp::new(AutomationConfig::default(), settings, WorkerPool::new(1).unwrap(), &ctx);

        assert!(app.dialogs.is_open());
        assert!(app.collection.carriers.is_empty());
    }

    #[test]
    fn test_start_without_save_directory_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());

        assert_eq!(app.start_automation().err(), Some(DispatchError::NoSaveDirectory));
        assert!(app.started.is_empty());
    }

    #[test]
    fn test_toggle_theme_restyles_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let ctx = egui::Context::default();

        app.toggle_theme(&ctx);

        assert_eq!(app.theme_manager.mode(), ThemeMode::Dark);
        assert_eq!(app.surface_theme(SurfaceId::AgitelProcessing), AppTheme::dark());
    }

    #[test]
    fn test_shutdown_releases_every_started_automator() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let shutdowns = Arc::new(AtomicUsize::new(0));
        app.started.push(Arc::new(CountingAutomator {
            shutdowns: shutdowns.clone(),
            fail: true,
        }));
        app.started.push(Arc::new(CountingAutomator {
            shutdowns: shutdowns.clone(),
            fail: false,
        }));

        app.shutdown_automators();

        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
        assert!(app.started.is_empty());
    }
}
