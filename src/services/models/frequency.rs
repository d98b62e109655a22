use super::{OrderChange, ScoreMap, ScoringModel};
use crate::events::{WindowEvent, WindowId};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Доля событий открытия/фокуса окна за скользящий интервал `timeframe`.
///
/// Оценки пересчитываются только на периодическом тике.
pub struct Frequency {
    timeframe: Duration,
    focus_events: Vec<(WindowId, Instant)>,
    closed_windows: HashSet<WindowId>,
    scores: ScoreMap,
}

impl Frequency {
    pub const NAME: &'static str = "frequency";

    pub fn new(timeframe: Duration) -> Self {
        Self {
            timeframe,
            focus_events: Vec::new(),
            closed_windows: HashSet::new(),
            scores: ScoreMap::new(),
        }
    }

    fn record_focus(&mut self, id: WindowId, at: Instant) {
        self.focus_events.push((id, at));
    }
}

impl ScoringModel for Frequency {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_windows(&mut self, windows: &[WindowId]) {
        if let Some(&first) = windows.first() {
            self.record_focus(first, Instant::now());
            self.scores = [(first, 1.0)].into_iter().collect();
        }
    }

    fn scores(&self) -> ScoreMap {
        self.scores.clone()
    }

    fn handle_event(&mut self, event: &WindowEvent) -> OrderChange {
        match event {
            WindowEvent::OpenedOrFocused(record) => self.record_focus(record.id, Instant::now()),
            WindowEvent::ClosedOrMinimized(record) => {
                self.closed_windows.insert(record.id);
            }
            _ => {}
        }
        OrderChange::Unchanged
    }

    fn on_interval(&mut self, now: Instant) -> OrderChange {
        let cutoff = now.checked_sub(self.timeframe);
        let closed = std::mem::take(&mut self.closed_windows);

        // Устаревшие события и события закрытых окон выбрасываются
        self.focus_events.retain(|(id, at)| {
            !closed.contains(id) && cutoff.map_or(true, |cutoff| *at >= cutoff)
        });

        let total = self.focus_events.len() as f64;
        let mut counts = ScoreMap::new();
        for (id, _) in &self.focus_events {
            let count = counts.get(*id).unwrap_or(0.0);
            counts.insert(*id, count + 1.0);
        }
        let new_scores: ScoreMap = counts.iter().map(|(id, count)| (id, count / total)).collect();

        if new_scores.approx_eq(&self.scores) {
            return OrderChange::Unchanged;
        }
        self.scores = new_scores;
        OrderChange::Changed
    }
}
