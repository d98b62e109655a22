use super::{OrderChange, ScoreMap, ScoringModel};
use crate::debug_if_enabled;
use crate::events::{WindowEvent, WindowId};

/// Последние `number_of_windows` активных окон получают 1, остальные 0.
///
/// Об изменении порядка сообщается только когда окно пересекает границу
/// top-N: перестановки внутри top-N или ниже неё ничего не меняют.
pub struct MostRecentlyActive {
    number_of_windows: usize,
    windows: Vec<WindowId>,
}

impl MostRecentlyActive {
    pub const NAME: &'static str = "most_recently_active";

    pub fn new(number_of_windows: usize) -> Self {
        Self {
            number_of_windows,
            windows: Vec::new(),
        }
    }

    fn in_top(&self, index: Option<usize>) -> bool {
        index.is_some_and(|i| i < self.number_of_windows)
    }

    fn bring_to_front(&mut self, id: WindowId) -> OrderChange {
        let index = self.windows.iter().position(|w| *w == id);
        let changed = self.number_of_windows > 0 && !self.in_top(index);
        if let Some(index) = index {
            self.windows.remove(index);
        }
        self.windows.insert(0, id);
        OrderChange::from_changed(changed)
    }
}

impl ScoringModel for MostRecentlyActive {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_windows(&mut self, windows: &[WindowId]) {
        self.windows.clear();
        for id in windows {
            if !self.windows.contains(id) {
                self.windows.push(*id);
            }
        }
    }

    fn scores(&self) -> ScoreMap {
        self.windows
            .iter()
            .enumerate()
            .map(|(rank, id)| (*id, if rank < self.number_of_windows { 1.0 } else { 0.0 }))
            .collect()
    }

    fn handle_event(&mut self, event: &WindowEvent) -> OrderChange {
        match event {
            WindowEvent::Opened(record) | WindowEvent::Focused(record) => {
                let change = self.bring_to_front(record.id);
                debug_if_enabled!("MRA: {} на первом месте, изменение: {:?}", record.id, change);
                change
            }
            WindowEvent::ClosedOrMinimized(record) => {
                let index = self.windows.iter().position(|w| *w == record.id);
                match index {
                    Some(i) => {
                        let changed = self.in_top(index);
                        self.windows.remove(i);
                        OrderChange::from_changed(changed)
                    }
                    None => OrderChange::Unchanged,
                }
            }
            _ => OrderChange::Unchanged,
        }
    }
}
