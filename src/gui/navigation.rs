//! Panel switching driven by the home tiles, the combo box and the home button.

pub const HOME_LABEL: &str = "Home";

/// Panels of the stacked main area
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Panel {
    #[default]
    Home,
    CollectionAutomation,
    FolderOrganization,
    AgitelProcessing,
    SpreadsheetMerge,
    SimpleReplace,
}

impl Panel {
    pub fn label(self) -> &'static str {
        match self {
            Panel::Home => HOME_LABEL,
            Panel::CollectionAutomation => "Automação da Coleta",
            Panel::FolderOrganization => "Organização de Pastas",
            Panel::AgitelProcessing => "Processamento Agitel",
            Panel::SpreadsheetMerge => "Mesclagem de Planilhas",
            Panel::SimpleReplace => "Substituição Simples",
        }
    }

    /// Unknown labels resolve to `Home`
    pub fn from_label(label: &str) -> Self {
        [
            Panel::CollectionAutomation,
            Panel::FolderOrganization,
            Panel::AgitelProcessing,
            Panel::SpreadsheetMerge,
            Panel::SimpleReplace,
        ]
        .into_iter()
        .find(|p| p.label() == label)
        .unwrap_or(Panel::Home)
    }
}

/// Home-screen tiles, in display order
pub const TILES: [&str; 3] = ["Automação", "Ferramentas", "Notas Sicoob"];

/// Combo entries shown after clicking a home tile
pub fn tile_entries(tile: usize) -> Option<Vec<String>> {
    let labels: &[&str] = match tile {
        0 => &["Automação da Coleta"],
        1 => &[
            "Organização de Pastas",
            "Processamento Agitel",
            "Mesclagem de Planilhas",
            "Substituição Simples",
        ],
        // Not built yet; the label has no panel and lands on Home
        2 => &["Organização de notas Sicoob"],
        _ => return None,
    };
    Some(labels.iter().map(|l| l.to_string()).collect())
}

/// Combo entries plus the selected one; the current panel follows the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    entries: Vec<String>,
    selected: usize,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            entries: vec![HOME_LABEL.to_string()],
            selected: 0,
        }
    }
}

impl Navigator {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn selected_label(&self) -> &str {
        self.entries.get(self.selected).map(String::as_str).unwrap_or(HOME_LABEL)
    }

    pub fn current(&self) -> Panel {
        Panel::from_label(self.selected_label())
    }

    /// Replace the combo entries with the tile's group and select the first one
    pub fn select_tile(&mut self, tile: usize) -> Panel {
        if let Some(entries) = tile_entries(tile) {
            self.entries = entries;
            self.selected = 0;
        }
        self.current()
    }

    /// Combo selection; labels not in the current entries are ignored
    pub fn select_label(&mut self, label: &str) -> Panel {
        if let Some(index) = self.entries.iter().position(|e| e == label) {
            self.selected = index;
        }
        self.current()
    }

    pub fn go_home(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Panel tests ====================

    #[test]
    fn test_label_round_trip() {
        for panel in [
            Panel::Home,
            Panel::CollectionAutomation,
            Panel::FolderOrganization,
            Panel::AgitelProcessing,
            Panel::SpreadsheetMerge,
            Panel::SimpleReplace,
        ] {
            assert_eq!(Panel::from_label(panel.label()), panel);
        }
    }

    #[test]
    fn test_unknown_label_is_home() {
        assert_eq!(Panel::from_label("Organização de notas Sicoob"), Panel::Home);
        assert_eq!(Panel::from_label(""), Panel::Home);
    }

    // ==================== Navigator tests ====================

    #[test]
    fn test_starts_at_home() {
        let nav = Navigator::default();
        assert_eq!(nav.entries(), ["Home"]);
        assert_eq!(nav.current(), Panel::Home);
    }

    #[test]
    fn test_tile_zero_opens_collection() {
        let mut nav = Navigator::default();
        assert_eq!(nav.select_tile(0), Panel::CollectionAutomation);
        assert_eq!(nav.entries(), ["Automação da Coleta"]);
    }

    #[test]
    fn test_tile_one_lists_tools_and_selects_first() {
        let mut nav = Navigator::default();
        assert_eq!(nav.select_tile(1), Panel::FolderOrganization);
        assert_eq!(nav.entries().len(), 4);

        assert_eq!(nav.select_label("Processamento Agitel"), Panel::AgitelProcessing);
        assert_eq!(nav.select_label("Substituição Simples"), Panel::SimpleReplace);
    }

    #[test]
    fn test_tile_two_resolves_to_home() {
        let mut nav = Navigator::default();
        assert_eq!(nav.select_tile(2), Panel::Home);
        assert_eq!(nav.selected_label(), "Organização de notas Sicoob");
    }

    #[test]
    fn test_unknown_tile_keeps_state() {
        let mut nav = Navigator::default();
        nav.select_tile(1);
        let before = nav.clone();
        nav.select_tile(7);
        assert_eq!(nav, before);
    }

    #[test]
    fn test_label_outside_entries_is_ignored() {
        let mut nav = Navigator::default();
        nav.select_tile(0);
        assert_eq!(nav.select_label("Processamento Agitel"), Panel::CollectionAutomation);
    }

    #[test]
    fn test_go_home_resets_entries() {
        let mut nav = Navigator::default();
        nav.select_tile(1);
        nav.select_label("Mesclagem de Planilhas");
        nav.go_home();
        assert_eq!(nav, Navigator::default());
    }
}
