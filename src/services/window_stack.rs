use crate::events::{WindowEvent, WindowId};

/// Порядок активации окон: индекс 0 - последнее активное окно
#[derive(Debug, Default, Clone)]
pub struct WindowStack {
    windows: Vec<WindowId>,
}

impl WindowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Setup(records) => {
                self.windows.clear();
                for record in records {
                    if !self.windows.contains(&record.id) {
                        self.windows.push(record.id);
                    }
                }
            }
            WindowEvent::Opened(record) | WindowEvent::Focused(record) => {
                self.remove(record.id);
                self.windows.insert(0, record.id);
            }
            WindowEvent::ClosedOrMinimized(record) => self.remove(record.id),
            _ => {}
        }
    }

    /// Ранг окна или `None`, если окна нет в стеке
    pub fn z_index(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| *w == id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains(&id)
    }

    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn remove(&mut self, id: WindowId) {
        self.windows.retain(|w| *w != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowRecord;
    use std::collections::HashSet;

    fn record(id: u64) -> WindowRecord {
        WindowRecord::new(WindowId::new(id), format!("window {}", id), String::new())
    }

    #[test]
    fn test_setup_replaces_stack() {
        let mut stack = WindowStack::new();
        stack.handle(&WindowEvent::Opened(record(9)));
        stack.handle(&WindowEvent::Setup(vec![record(1), record(2), record(3)]));

        assert_eq!(stack.windows(), &[WindowId::new(1), WindowId::new(2), WindowId::new(3)]);
        assert_eq!(stack.z_index(WindowId::new(3)), Some(2));
        assert_eq!(stack.z_index(WindowId::new(9)), None);
    }

    #[test]
    fn test_focus_moves_to_front_and_close_removes() {
        let mut stack = WindowStack::new();
        stack.handle(&WindowEvent::Setup(vec![record(1), record(2), record(3)]));

        stack.handle(&WindowEvent::Focused(record(3)));
        assert_eq!(stack.windows(), &[WindowId::new(3), WindowId::new(1), WindowId::new(2)]);

        stack.handle(&WindowEvent::ClosedOrMinimized(record(1)));
        assert_eq!(stack.windows(), &[WindowId::new(3), WindowId::new(2)]);
        assert!(!stack.contains(WindowId::new(1)));
        assert!(stack.contains(WindowId::new(2)));

        // Закрытие неизвестного окна - no-op
        stack.handle(&WindowEvent::ClosedOrMinimized(record(42)));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_stack_matches_open_set_for_event_sequence() {
        // Детерминированная псевдослучайная последовательность Open/Focus/Close
        let mut stack = WindowStack::new();
        let mut open: HashSet<u64> = HashSet::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = seed % 8;
            match (seed >> 8) % 3 {
                0 => {
                    stack.handle(&WindowEvent::Opened(record(id)));
                    open.insert(id);
                    assert_eq!(stack.windows()[0], WindowId::new(id));
                }
                1 => {
                    stack.handle(&WindowEvent::Focused(record(id)));
                    open.insert(id);
                    assert_eq!(stack.windows()[0], WindowId::new(id));
                }
                _ => {
                    stack.handle(&WindowEvent::ClosedOrMinimized(record(id)));
                    open.remove(&id);
                }
            }

            let in_stack: HashSet<u64> = stack.windows().iter().map(|w| w.value()).collect();
            assert_eq!(in_stack.len(), stack.len(), "дубликаты в стеке");
            assert_eq!(in_stack, open);
        }
    }
}
