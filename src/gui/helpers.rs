//! Helper functions for the GUI
//!
//! Runtime asset loading (window icon, themed button icons) and small text
//! formatters shared by the panels.

use eframe::egui;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Window icon, read at startup; a missing file just means no icon
pub const APP_ICON_PATH: &str = "resources/icons/logo.ico";

/// Logo drawn at the left of the title bar
pub const LOGO_PATH: &str = "resources/icons/logo.png";

/// Load the application icon for the window
pub fn load_icon() -> Option<egui::IconData> {
    load_icon_from(Path::new(APP_ICON_PATH))
}

pub fn load_icon_from(path: &Path) -> Option<egui::IconData> {
    let img = match image::open(path) {
        Ok(img) => img.into_rgba8(),
        Err(e) => {
            tracing::warn!("Window icon {} not loaded: {}", path.display(), e);
            return None;
        }
    };
    let (width, height) = img.dimensions();
    Some(egui::IconData {
        rgba: img.into_raw(),
        width,
        height,
    })
}

/// Textures loaded from disk, keyed by path. Failed loads are remembered so
/// a missing file is only reported once.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<PathBuf, Option<egui::TextureHandle>>,
}

impl TextureCache {
    pub fn get(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        self.textures
            .entry(path.to_path_buf())
            .or_insert_with(|| load_texture(ctx, path))
            .clone()
    }
}

fn load_texture(ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Icon {} unavailable: {}", path.display(), e);
            return None;
        }
    };
    match egui_extras::image::load_image_bytes(&bytes) {
        Ok(image) => {
            tracing::debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
            Some(ctx.load_texture(path.display().to_string(), image, Default::default()))
        }
        Err(e) => {
            tracing::warn!("Failed to decode {}: {}", path.display(), e);
            None
        }
    }
}

/// Last `max` characters of a path, prefixed with "..." when cut
pub fn shorten_path(path: &str, max: usize) -> String {
    let count = path.chars().count();
    if count <= max {
        return path.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = path.chars().skip(count - keep).collect();
    format!("...{}", tail)
}

/// "1 arquivo" / "3 arquivos"
pub fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Picker start folder: the remembered one if it still exists
pub fn existing_dir(dir: &str) -> Option<PathBuf> {
    let dir = dir.trim();
    if dir.is_empty() {
        return None;
    }
    let path = PathBuf::from(dir);
    path.is_dir().then_some(path)
}
