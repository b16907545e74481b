//! Centralized theme and styling system for the GUI
//!
//! Provides the light and dark [`AppTheme`] palettes, the [`ThemeManager`]
//! that switches every registered surface and icon between them, and
//! [`configure_style`] which pushes a palette into egui.

use eframe::egui;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Folder the theme icons are read from
pub const ICON_DIR: &str = "resources/icons";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    /// Suffix of the icon files for this mode
    pub fn suffix(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

/// Colors, spacing and button sizes of one palette
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppTheme {
    pub mode: ThemeMode,

    // Base colors
    pub background: egui::Color32,
    pub surface: egui::Color32,
    pub surface_hover: egui::Color32,
    pub surface_active: egui::Color32,
    pub panel_fill: egui::Color32,
    pub title_bar: egui::Color32,
    pub log_fill: egui::Color32,
    pub text_primary: egui::Color32,
    pub text_secondary: egui::Color32,

    // Semantic colors
    pub primary: egui::Color32,
    pub primary_hover: egui::Color32,
    pub secondary: egui::Color32,
    pub success: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,
    pub border: egui::Color32,

    // Spacing constants
    pub spacing_xs: f32,
    pub spacing_sm: f32,
    pub spacing_md: f32,
    pub spacing_lg: f32,

    // Button sizes
    pub button_small: egui::Vec2,
    pub button_medium: egui::Vec2,
    pub button_large: egui::Vec2,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self::light()
    }
}

impl AppTheme {
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            background: egui::Color32::from_rgb(243, 244, 246),
            surface: egui::Color32::from_rgb(255, 255, 255),
            surface_hover: egui::Color32::from_rgb(235, 238, 242),
            surface_active: egui::Color32::from_rgb(220, 226, 234),
            panel_fill: egui::Color32::from_rgb(248, 249, 250),
            title_bar: egui::Color32::from_rgb(30, 64, 110),
            log_fill: egui::Color32::from_rgb(250, 250, 250),
            text_primary: egui::Color32::from_rgb(33, 37, 41),
            text_secondary: egui::Color32::from_rgb(108, 117, 125),

            primary: egui::Color32::from_rgb(30, 100, 180),
            primary_hover: egui::Color32::from_rgb(45, 120, 205),
            secondary: egui::Color32::from_rgb(206, 212, 218),
            success: egui::Color32::from_rgb(25, 135, 84),
            warning: egui::Color32::from_rgb(204, 133, 0),
            error: egui::Color32::from_rgb(200, 35, 51),
            border: egui::Color32::from_rgb(224, 224, 224),

            spacing_xs: 4.0,
            spacing_sm: 8.0,
            spacing_md: 16.0,
            spacing_lg: 24.0,

            button_small: egui::vec2(90.0, 26.0),
            button_medium: egui::vec2(150.0, 32.0),
            button_large: egui::vec2(220.0, 120.0),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            background: egui::Color32::from_rgb(24, 24, 24),
            surface: egui::Color32::from_rgb(38, 37, 37),
            surface_hover: egui::Color32::from_rgb(52, 52, 52),
            surface_active: egui::Color32::from_rgb(66, 66, 66),
            panel_fill: egui::Color32::from_rgb(30, 30, 30),
            title_bar: egui::Color32::from_rgb(18, 18, 18),
            log_fill: egui::Color32::from_rgb(38, 37, 37),
            text_primary: egui::Color32::from_rgb(235, 235, 235),
            text_secondary: egui::Color32::from_rgb(160, 160, 160),

            primary: egui::Color32::from_rgb(74, 144, 226),
            primary_hover: egui::Color32::from_rgb(100, 165, 240),
            secondary: egui::Color32::from_rgb(80, 80, 80),
            success: egui::Color32::from_rgb(76, 175, 80),
            warning: egui::Color32::from_rgb(255, 170, 0),
            error: egui::Color32::from_rgb(255, 85, 85),
            border: egui::Color32::from_rgb(204, 204, 204),

            spacing_xs: 4.0,
            spacing_sm: 8.0,
            spacing_md: 16.0,
            spacing_lg: 24.0,

            button_small: egui::vec2(90.0, 26.0),
            button_medium: egui::vec2(150.0, 32.0),
            button_large: egui::vec2(220.0, 120.0),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }

    /// Filled button for the main action of a panel
    pub fn button_primary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(egui::Color32::WHITE).strong())
            .fill(self.primary)
            .rounding(6.0)
            .min_size(self.button_medium)
    }

    /// Outlined button for secondary actions (file pickers, previews)
    pub fn button_secondary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.surface)
            .stroke(egui::Stroke::new(1.0, self.border))
            .rounding(6.0)
            .min_size(self.button_medium)
    }

    pub fn button_small(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.secondary)
            .min_size(self.button_small)
    }

    /// Big square button of the home screen
    pub fn button_tile(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).size(16.0).strong().color(self.text_primary))
            .fill(self.surface)
            .stroke(egui::Stroke::new(1.0, self.border))
            .rounding(8.0)
            .min_size(self.button_large)
    }

    /// Transparent button used on the title bar
    pub fn button_title_bar<'a>(&self, content: impl Into<egui::WidgetText>) -> egui::Button<'a> {
        egui::Button::new(content)
            .fill(egui::Color32::TRANSPARENT)
            .stroke(egui::Stroke::NONE)
            .min_size(egui::vec2(28.0, 24.0))
    }

    /// Title-bar button showing an icon image
    pub fn button_icon<'a>(&self, image: egui::Image<'a>) -> egui::Button<'a> {
        egui::Button::image(image)
            .fill(egui::Color32::TRANSPARENT)
            .stroke(egui::Stroke::NONE)
            .min_size(egui::vec2(28.0, 24.0))
    }

    pub fn frame_surface(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.log_fill)
            .rounding(8.0)
            .inner_margin(self.spacing_sm)
            .stroke(egui::Stroke::new(1.0, self.border))
    }

    pub fn frame_panel(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.panel_fill)
            .rounding(8.0)
            .inner_margin(self.spacing_md)
            .stroke(egui::Stroke::new(1.0, self.border))
    }

    /// Calculate responsive width clamped to min/max bounds
    pub fn responsive_width(ui: &egui::Ui, min: f32, preferred: f32, max: f32) -> f32 {
        let available = ui.available_width();
        available.clamp(min, max.min(preferred))
    }
}

/// Regions whose style follows the theme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceId {
    TitleBar,
    Home,
    CollectionAutomation,
    FolderOrganization,
    AgitelProcessing,
    SpreadsheetMerge,
    SimpleReplace,
}

/// Title-bar buttons that show a themed icon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IconButton {
    Home,
    Theme,
    Minimize,
    Maximize,
    Close,
}

impl IconButton {
    pub const ALL: [IconButton; 5] = [
        IconButton::Home,
        IconButton::Theme,
        IconButton::Minimize,
        IconButton::Maximize,
        IconButton::Close,
    ];

    /// Text drawn when the icon file is missing
    pub fn glyph(self) -> &'static str {
        match self {
            IconButton::Home => "⌂",
            IconButton::Theme => "◐",
            IconButton::Minimize => "—",
            IconButton::Maximize => "☐",
            IconButton::Close => "✕",
        }
    }

    pub fn tooltip(self) -> &'static str {
        match self {
            IconButton::Home => "Início",
            IconButton::Theme => "Alternar tema",
            IconButton::Minimize => "Minimizar",
            IconButton::Maximize => "Maximizar",
            IconButton::Close => "Fechar",
        }
    }
}

/// Icon file names for each mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconSet {
    pub light: String,
    pub dark: String,
}

impl IconSet {
    /// `<name>_light.png` / `<name>_dark.png`
    pub fn named(name: &str) -> Self {
        Self {
            light: format!("{}_{}.png", name, ThemeMode::Light.suffix()),
            dark: format!("{}_{}.png", name, ThemeMode::Dark.suffix()),
        }
    }

    pub fn for_mode(&self, mode: ThemeMode) -> &str {
        match mode {
            ThemeMode::Light => &self.light,
            ThemeMode::Dark => &self.dark,
        }
    }
}

/// Current mode plus everything registered to follow it.
/// Owned by the app; nothing outside the registry is restyled.
#[derive(Debug)]
pub struct ThemeManager {
    mode: ThemeMode,
    surfaces: BTreeMap<SurfaceId, AppTheme>,
    icons: BTreeMap<IconButton, IconSet>,
    icon_dir: PathBuf,
    /// Bumped whenever the mode actually changes; views reload textures on change
    revision: u64,
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new(ThemeMode::default(), ICON_DIR)
    }
}

impl ThemeManager {
    pub fn new(mode: ThemeMode, icon_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            surfaces: BTreeMap::new(),
            icons: BTreeMap::new(),
            icon_dir: icon_dir.into(),
            revision: 0,
        }
    }

    /// Manager with the title-bar icons and every panel registered
    pub fn with_defaults() -> Self {
        let mut manager = Self::default();
        manager.register_icon(IconButton::Home, IconSet::named("home"));
        manager.register_icon(IconButton::Theme, IconSet::named("ui"));
        manager.register_icon(IconButton::Minimize, IconSet::named("ui_minimize"));
        manager.register_icon(IconButton::Maximize, IconSet::named("ui_maximize"));
        manager.register_icon(IconButton::Close, IconSet::named("ui_exit"));
        for surface in [
            SurfaceId::TitleBar,
            SurfaceId::Home,
            SurfaceId::CollectionAutomation,
            SurfaceId::FolderOrganization,
            SurfaceId::AgitelProcessing,
            SurfaceId::SpreadsheetMerge,
            SurfaceId::SimpleReplace,
        ] {
            manager.register_surface(surface);
        }
        manager
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Palette of the current mode
    pub fn theme(&self) -> AppTheme {
        AppTheme::for_mode(self.mode)
    }

    /// Start styling `id` with the current palette
    pub fn register_surface(&mut self, id: SurfaceId) {
        self.surfaces.insert(id, AppTheme::for_mode(self.mode));
    }

    pub fn register_icon(&mut self, button: IconButton, set: IconSet) {
        self.icons.insert(button, set);
    }

    /// Palette currently applied to a registered surface
    pub fn surface(&self, id: SurfaceId) -> Option<&AppTheme> {
        self.surfaces.get(&id)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (&SurfaceId, &AppTheme)> {
        self.surfaces.iter()
    }

    /// Restyle every registered surface for `mode`
    pub fn apply(&mut self, mode: ThemeMode) {
        if mode == self.mode && self.surfaces.values().all(|t| t.mode == mode) {
            return;
        }
        let theme = AppTheme::for_mode(mode);
        for style in self.surfaces.values_mut() {
            *style = theme;
        }
        self.mode = mode;
        self.revision += 1;
        tracing::debug!("Theme switched to {:?}", mode);
    }

    pub fn toggle(&mut self) {
        self.apply(self.mode.toggled());
    }

    /// Icon file for `button` in the current mode
    pub fn icon_path(&self, button: IconButton) -> Option<PathBuf> {
        self.icons
            .get(&button)
            .map(|set| self.icon_dir.join(set.for_mode(self.mode)))
    }

    pub fn icon_dir(&self) -> &Path {
        &self.icon_dir
    }
}

/// Configure the egui context style with the given theme
pub fn configure_style(ctx: &egui::Context, theme: &AppTheme) {
    let mut visuals = match theme.mode {
        ThemeMode::Light => egui::Visuals::light(),
        ThemeMode::Dark => egui::Visuals::dark(),
    };
    visuals.window_fill = theme.surface;
    visuals.panel_fill = theme.background;
    visuals.extreme_bg_color = theme.log_fill;
    visuals.override_text_color = Some(theme.text_primary);

    visuals.widgets.noninteractive.bg_fill = theme.surface;
    visuals.widgets.inactive.bg_fill = theme.surface;
    visuals.widgets.inactive.weak_bg_fill = theme.surface;
    visuals.widgets.hovered.bg_fill = theme.surface_hover;
    visuals.widgets.hovered.weak_bg_fill = theme.surface_hover;
    visuals.widgets.active.bg_fill = theme.surface_active;
    visuals.widgets.open.bg_fill = theme.surface_active;

    visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, theme.border);
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, theme.primary);
    visuals.widgets.active.bg_stroke = egui::Stroke::new(2.0, theme.primary);
    visuals.selection.bg_fill = theme.primary;

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style.spacing.menu_margin = egui::Margin::same(8.0);

    style.text_styles.insert(
        egui::TextStyle::Heading,
        egui::FontId::new(20.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        egui::FontId::new(13.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Button,
        egui::FontId::new(13.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Monospace,
        egui::FontId::new(12.0, egui::FontFamily::Monospace),
    );

    ctx.set_style(style);
}
