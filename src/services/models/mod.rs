//! Scoring models: pluggable strategies that rank the open windows.
//!
//! A model keeps its own view of the window set (it never reads another
//! component's state), answers `scores()` as a pure function of that view and
//! reports an order change only when the windows inside the top-N cutoff may
//! have changed. Reporting on every event would recompute and redraw the
//! overlay for changes nobody can see.

mod duration;
mod frequency;
mod most_recently_active;
mod title_similarity;

pub use duration::FocusDuration;
pub use frequency::Frequency;
pub use most_recently_active::MostRecentlyActive;
pub use title_similarity::TitleSimilarity;

use crate::events::{WindowEvent, WindowId};
use std::time::Instant;

/// Score per window, kept in insertion order.
///
/// A score of 0 is meaningful and distinct from an untracked window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap {
    entries: Vec<(WindowId, f64)>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Вставить или заменить оценку, сохраняя позицию существующей записи
    pub fn insert(&mut self, id: WindowId, score: f64) {
        match self.entries.iter_mut().find(|(w, _)| *w == id) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((id, score)),
        }
    }

    pub fn get(&self, id: WindowId) -> Option<f64> {
        self.entries.iter().find(|(w, _)| *w == id).map(|(_, s)| *s)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Первые `count` окон по убыванию оценки; равные оценки - в порядке вставки
    pub fn top(&self, count: usize) -> Vec<WindowId> {
        let mut ordered = self.entries.clone();
        ordered.sort_by(|a, b| b.1.total_cmp(&a.1));
        ordered.into_iter().take(count).map(|(id, _)| id).collect()
    }

    /// Сравнение с допуском для чисел с плавающей точкой, порядок записей не важен
    pub fn approx_eq(&self, other: &ScoreMap) -> bool {
        self.len() == other.len()
            && self.iter().all(|(id, score)| {
                other
                    .get(id)
                    .is_some_and(|other_score| (score - other_score).abs() < 1e-7)
            })
    }
}

impl FromIterator<(WindowId, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (WindowId, f64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        for (id, score) in iter {
            map.insert(id, score);
        }
        map
    }
}

/// Whether a model's top-N membership may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum OrderChange {
    Changed,
    Unchanged,
}

impl OrderChange {
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            OrderChange::Changed
        } else {
            OrderChange::Unchanged
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, OrderChange::Changed)
    }
}

/// Contract every scoring model implements
pub trait ScoringModel: Send {
    fn name(&self) -> &'static str;

    /// Replace the working set wholesale, most recently active first
    fn set_windows(&mut self, windows: &[WindowId]);

    /// One entry per tracked window
    fn scores(&self) -> ScoreMap;

    fn handle_event(&mut self, event: &WindowEvent) -> OrderChange;

    /// Periodic tick for time-based models
    fn on_interval(&mut self, _now: Instant) -> OrderChange {
        OrderChange::Unchanged
    }
}
