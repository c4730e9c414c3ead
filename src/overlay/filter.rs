use std::sync::Arc;

use crate::records::{Category, Detail, GeoRecord};

/// User-selected visibility. Lives for the session only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterState {
    pub selected_category: Option<Category>,
    pub show_historical: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_category: None,
            show_historical: true,
        }
    }
}

impl FilterState {
    /// Select a category; selecting the active one clears the selection
    pub fn select_category(&mut self, category: Category) {
        self.selected_category = if self.selected_category == Some(category) {
            None
        } else {
            Some(category)
        };
    }

    pub fn toggle_historical(&mut self) {
        self.show_historical = !self.show_historical;
    }

    /// Whether a single record passes the filter
    pub fn admits(&self, record: &GeoRecord) -> bool {
        match record.detail {
            Detail::Venue(_) => match self.selected_category {
                None => true,
                Some(selected) => record.category == Some(selected),
            },
            Detail::Historical(_) => self.show_historical,
        }
    }
}

/// Subsequence of `records` admitted by `state`, in input order
pub fn visible(records: &[Arc<GeoRecord>], state: &FilterState) -> Vec<Arc<GeoRecord>> {
    records
        .iter()
        .filter(|r| state.admits(r))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::{historical, venue};

    #[test]
    fn test_toggle_same_category_clears() {
        let mut state = FilterState::default();
        state.select_category(Category::Food);
        assert_eq!(state.selected_category, Some(Category::Food));
        state.select_category(Category::Food);
        assert_eq!(state.selected_category, None);
    }

    #[test]
    fn test_switching_category_replaces() {
        let mut state = FilterState::default();
        state.select_category(Category::Food);
        state.select_category(Category::Hotel);
        assert_eq!(state.selected_category, Some(Category::Hotel));
    }

    #[test]
    fn test_visible_preserves_order() {
        let records = vec![
            venue("a", Some(Category::Food), 24.0, 46.0),
            venue("b", Some(Category::Hotel), 24.0, 46.0),
            venue("c", Some(Category::Food), 24.0, 46.0),
            venue("d", None, 24.0, 46.0),
        ];
        let mut state = FilterState::default();
        let all: Vec<_> = visible(&records, &state).iter().map(|r| r.id.0.clone()).collect();
        assert_eq!(all, ["a", "b", "c", "d"]);

        state.select_category(Category::Food);
        let food: Vec<_> = visible(&records, &state).iter().map(|r| r.id.0.clone()).collect();
        assert_eq!(food, ["a", "c"]);
    }

    #[test]
    fn test_historical_toggle() {
        let records = vec![historical("h1", 24.6, 46.7), historical("h2", 24.5, 46.6)];
        let mut state = FilterState::default();
        assert_eq!(visible(&records, &state).len(), 2);
        state.toggle_historical();
        assert!(visible(&records, &state).is_empty());
        // Category selection never hides historical places
        state.toggle_historical();
        state.select_category(Category::Shop);
        assert_eq!(visible(&records, &state).len(), 2);
    }
}
