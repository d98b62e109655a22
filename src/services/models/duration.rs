use super::{OrderChange, ScoreMap, ScoringModel};
use crate::events::{WindowEvent, WindowId};
use std::time::{Duration, Instant};

/// Доля времени в фокусе за скользящий интервал `timeframe`.
///
/// Фокус окна длится от его события до следующего события фокуса. Закрытые и
/// свёрнутые окна теряют накопленное время, но их события по-прежнему
/// завершают фокус предыдущего окна.
pub struct FocusDuration {
    timeframe: Duration,
    number_of_windows: usize,
    focus_events: Vec<(Option<WindowId>, Instant)>,
    scores: ScoreMap,
    top_windows: Vec<WindowId>,
}

impl FocusDuration {
    pub const NAME: &'static str = "duration";

    pub fn new(timeframe: Duration, number_of_windows: usize) -> Self {
        Self {
            timeframe,
            number_of_windows,
            focus_events: Vec::new(),
            scores: ScoreMap::new(),
            top_windows: Vec::new(),
        }
    }

    fn seed(&mut self, id: WindowId, at: Instant) {
        self.record_focus(id, at);
        self.scores = [(id, 0.0)].into_iter().collect();
        self.top_windows = vec![id];
    }

    fn record_focus(&mut self, id: WindowId, at: Instant) {
        self.focus_events.push((Some(id), at));
    }

    fn forget(&mut self, id: WindowId) {
        for (window, _) in self.focus_events.iter_mut() {
            if *window == Some(id) {
                *window = None;
            }
        }
    }
}

impl ScoringModel for FocusDuration {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_windows(&mut self, windows: &[WindowId]) {
        if let Some(&first) = windows.first() {
            self.seed(first, Instant::now());
        }
    }

    fn scores(&self) -> ScoreMap {
        self.scores.clone()
    }

    fn handle_event(&mut self, event: &WindowEvent) -> OrderChange {
        match event {
            WindowEvent::OpenedOrFocused(record) => self.record_focus(record.id, Instant::now()),
            WindowEvent::ClosedOrMinimized(record) => self.forget(record.id),
            _ => {}
        }
        OrderChange::Unchanged
    }

    fn on_interval(&mut self, now: Instant) -> OrderChange {
        let timeframe = self.timeframe.as_secs_f64();
        if timeframe == 0.0 {
            return OrderChange::Unchanged;
        }
        let cutoff = now.checked_sub(self.timeframe);

        // Фокус, закончившийся до начала интервала, больше не нужен
        if let Some(cutoff) = cutoff {
            let expired = self.focus_events.windows(2).take_while(|pair| pair[1].1 <= cutoff).count();
            self.focus_events.drain(..expired);
        }

        let mut new_scores = ScoreMap::new();
        for (index, (window, start)) in self.focus_events.iter().enumerate() {
            let Some(id) = *window else {
                continue;
            };
            let end = self.focus_events.get(index + 1).map_or(now, |(_, at)| (*at).min(now));
            let start = cutoff.map_or(*start, |cutoff| (*start).max(cutoff));
            let focused = end.saturating_duration_since(start).as_secs_f64();
            if focused <= 0.0 {
                continue;
            }
            let score = new_scores.get(id).unwrap_or(0.0);
            new_scores.insert(id, score + focused / timeframe);
        }
        self.scores = new_scores;

        let top = self.scores.top(self.number_of_windows);
        if top == self.top_windows {
            return OrderChange::Unchanged;
        }
        self.top_windows = top;
        OrderChange::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowRecord;

    const TIMEFRAME: Duration = Duration::from_secs(600);

    fn record(id: u64) -> WindowRecord {
        WindowRecord::new(WindowId::new(id), String::new(), String::new())
    }

    fn share(seconds: u64) -> f64 {
        seconds as f64 / TIMEFRAME.as_secs_f64()
    }

    fn assert_score(model: &FocusDuration, id: u64, expected: f64) {
        let score = model.scores().get(WindowId::new(id));
        assert!(
            score.is_some_and(|s| (s - expected).abs() < 1e-9),
            "окно {}: {:?} вместо {}",
            id,
            score,
            expected
        );
    }

    #[test]
    fn test_seeded_window_accumulates_without_order_change() {
        let start = Instant::now();
        let mut model = FocusDuration::new(TIMEFRAME, 3);
        model.seed(WindowId::new(1), start);
        assert_eq!(model.scores().get(WindowId::new(1)), Some(0.0));

        assert_eq!(model.on_interval(start + Duration::from_secs(10)), OrderChange::Unchanged);
        assert_score(&model, 1, share(10));

        assert_eq!(model.on_interval(start + Duration::from_secs(20)), OrderChange::Unchanged);
        assert_score(&model, 1, share(20));
    }

    #[test]
    fn test_focus_splits_time_between_windows() {
        let start = Instant::now();
        let mut model = FocusDuration::new(TIMEFRAME, 3);
        model.seed(WindowId::new(1), start);
        model.record_focus(WindowId::new(2), start + Duration::from_secs(3));
        model.record_focus(WindowId::new(1), start + Duration::from_secs(6));

        assert_eq!(model.on_interval(start + Duration::from_secs(10)), OrderChange::Changed);
        assert_score(&model, 1, share(7));
        assert_score(&model, 2, share(3));
        assert_eq!(model.scores().top(2), vec![WindowId::new(1), WindowId::new(2)]);
    }

    #[test]
    fn test_closed_window_loses_its_time() {
        let start = Instant::now();
        let mut model = FocusDuration::new(TIMEFRAME, 3);
        model.seed(WindowId::new(1), start);
        model.record_focus(WindowId::new(2), start + Duration::from_secs(3));
        let _ = model.on_interval(start + Duration::from_secs(10));
        assert_score(&model, 2, share(7));

        assert_eq!(
            model.handle_event(&WindowEvent::ClosedOrMinimized(record(2))),
            OrderChange::Unchanged
        );
        model.record_focus(WindowId::new(1), start + Duration::from_secs(13));

        assert_eq!(model.on_interval(start + Duration::from_secs(20)), OrderChange::Changed);
        assert_eq!(model.scores().get(WindowId::new(2)), None);
        // Время окна 2 не достаётся окну 1
        assert_score(&model, 1, share(10));
    }

    #[test]
    fn test_old_focus_ages_out_of_timeframe() {
        let start = Instant::now();
        let mut model = FocusDuration::new(TIMEFRAME, 3);
        model.seed(WindowId::new(1), start);
        model.record_focus(WindowId::new(2), start + Duration::from_secs(3));

        let later = start + TIMEFRAME + Duration::from_secs(10);
        assert_eq!(model.on_interval(later), OrderChange::Changed);
        assert_eq!(model.scores().get(WindowId::new(1)), None);
        assert_score(&model, 2, 1.0);
        assert_eq!(model.focus_events.len(), 1);
    }

    #[test]
    fn test_specific_events_are_not_counted_twice() {
        let mut model = FocusDuration::new(TIMEFRAME, 3);
        model.set_windows(&[WindowId::new(1)]);
        let _ = model.handle_event(&WindowEvent::Focused(record(2)));
        let _ = model.handle_event(&WindowEvent::OpenedOrFocused(record(2)));

        assert_eq!(model.focus_events.len(), 2);
    }
}
