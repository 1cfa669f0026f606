//! Selection and hover state

use serde::{Deserialize, Serialize};

/// What a `select` call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(String),
    Cleared,
}

/// Currently selected and hovered building ids.
///
/// A building may be hovered and selected at the same time; only one building
/// is ever selected. Ids are not validated here: an id the catalog doesn't
/// know is treated as "nothing selected" by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: Option<String>,
    hovered: Option<String>,
    /// Bumped on every `select`/`clear`, so consumers can detect re-selection
    revision: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a building, or clear the selection if it is already selected
    pub fn select(&mut self, building_id: &str) -> SelectionChange {
        self.revision += 1;
        if self.selected.as_deref() == Some(building_id) {
            self.selected = None;
            SelectionChange::Cleared
        } else {
            self.selected = Some(building_id.to_string());
            SelectionChange::Selected(building_id.to_string())
        }
    }

    /// Drop any selection
    pub fn clear(&mut self) -> SelectionChange {
        self.revision += 1;
        self.selected = None;
        SelectionChange::Cleared
    }

    /// Set (or clear) the hovered building unconditionally
    pub fn hover(&mut self, building_id: Option<&str>) {
        self.hovered = building_id.map(str::to_string);
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_selected(&self, building_id: &str) -> bool {
        self.selected.as_deref() == Some(building_id)
    }

    pub fn is_hovered(&self, building_id: &str) -> bool {
        self.hovered.as_deref() == Some(building_id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_twice_clears() {
        for id in ["kindergarten-main", "kindergarten-inner", "", "unknown-building"] {
            let mut state = SelectionState::new();
            assert_eq!(state.select(id), SelectionChange::Selected(id.to_string()));
            assert_eq!(state.select(id), SelectionChange::Cleared);
            assert_eq!(state.selected(), None);
        }
    }

    #[test]
    fn test_select_other_replaces() {
        let mut state = SelectionState::new();
        state.select("a");
        state.select("b");
        assert_eq!(state.selected(), Some("b"));
        assert!(!state.is_selected("a"));
    }

    #[test]
    fn test_hover_independent_of_selection() {
        let mut state = SelectionState::new();
        state.select("a");
        state.hover(Some("a"));
        assert!(state.is_selected("a") && state.is_hovered("a"));

        state.hover(Some("b"));
        assert!(state.is_selected("a"));
        assert_eq!(state.hovered(), Some("b"));

        state.hover(None);
        assert_eq!(state.hovered(), None);
        assert_eq!(state.selected(), Some("a"));
    }

    #[test]
    fn test_revision_tracks_selects() {
        let mut state = SelectionState::new();
        state.select("a");
        state.hover(Some("a"));
        state.clear();
        assert_eq!(state.revision(), 2);
    }
}
