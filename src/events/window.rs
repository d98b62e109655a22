use serde::{Deserialize, Serialize};
use std::fmt;

/// Непрозрачный идентификатор окна, стабильный на время его жизни.
///
/// Используется только как ключ: никакой арифметики над ним не выполняется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl WindowId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Информация об окне, которой владеет кэш окон
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub title: String,
    pub process_name: String,
}

impl WindowRecord {
    pub fn new(id: WindowId, title: String, process_name: String) -> Self {
        Self {
            id,
            title,
            process_name,
        }
    }
}

impl fmt::Display for WindowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.process_name.is_empty() {
            write!(f, "{} \"{}\"", self.id, self.title)
        } else {
            write!(f, "{} \"{}\" ({})", self.id, self.title, self.process_name)
        }
    }
}

/// Сырое уведомление от источника событий: только идентификатор
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawWindowEvent {
    Opened(WindowId),
    Focused(WindowId),
    Closed(WindowId),
    Minimized(WindowId),
    Renamed(WindowId),
    MoveStarted,
    MoveEnded,
}

impl fmt::Display for RawWindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawWindowEvent::Opened(id) => write!(f, "Opened({})", id),
            RawWindowEvent::Focused(id) => write!(f, "Focused({})", id),
            RawWindowEvent::Closed(id) => write!(f, "Closed({})", id),
            RawWindowEvent::Minimized(id) => write!(f, "Minimized({})", id),
            RawWindowEvent::Renamed(id) => write!(f, "Renamed({})", id),
            RawWindowEvent::MoveStarted => write!(f, "MoveStarted"),
            RawWindowEvent::MoveEnded => write!(f, "MoveEnded"),
        }
    }
}

/// Нормализованное событие жизненного цикла, которое публикует кэш окон
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    Opened(WindowRecord),
    Focused(WindowRecord),
    OpenedOrFocused(WindowRecord),
    Closed(WindowRecord),
    Minimized(WindowRecord),
    ClosedOrMinimized(WindowRecord),
    Renamed(WindowRecord),
    Setup(Vec<WindowRecord>),
}

impl WindowEvent {
    pub fn event_type(&self) -> WindowEventType {
        match self {
            WindowEvent::Opened(_) => WindowEventType::Opened,
            WindowEvent::Focused(_) => WindowEventType::Focused,
            WindowEvent::OpenedOrFocused(_) => WindowEventType::OpenedOrFocused,
            WindowEvent::Closed(_) => WindowEventType::Closed,
            WindowEvent::Minimized(_) => WindowEventType::Minimized,
            WindowEvent::ClosedOrMinimized(_) => WindowEventType::ClosedOrMinimized,
            WindowEvent::Renamed(_) => WindowEventType::Renamed,
            WindowEvent::Setup(_) => WindowEventType::Setup,
        }
    }

    /// Запись окна, к которому относится событие (для Setup - None)
    pub fn record(&self) -> Option<&WindowRecord> {
        match self {
            WindowEvent::Opened(record)
            | WindowEvent::Focused(record)
            | WindowEvent::OpenedOrFocused(record)
            | WindowEvent::Closed(record)
            | WindowEvent::Minimized(record)
            | WindowEvent::ClosedOrMinimized(record)
            | WindowEvent::Renamed(record) => Some(record),
            WindowEvent::Setup(_) => None,
        }
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowEvent::Setup(records) => write!(f, "Setup ({} окон)", records.len()),
            other => match other.record() {
                Some(record) => write!(f, "{:?}: {}", other.event_type(), record),
                None => write!(f, "{:?}", other.event_type()),
            },
        }
    }
}

/// Тип события окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowEventType {
    Opened,
    Focused,
    OpenedOrFocused,
    Closed,
    Minimized,
    ClosedOrMinimized,
    Renamed,
    Setup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_record_display() {
        let record = WindowRecord::new(WindowId::new(0x3a00003), "Vim - file.txt".to_string(), "vim".to_string());
        assert_eq!(record.to_string(), "0x03a00003 \"Vim - file.txt\" (vim)");

        let anonymous = WindowRecord::new(WindowId::new(1), "Title".to_string(), String::new());
        assert_eq!(anonymous.to_string(), "0x00000001 \"Title\"");
    }

    #[test]
    fn test_event_record_access() {
        let record = WindowRecord::new(WindowId::new(7), "Editor".to_string(), "code".to_string());
        let event = WindowEvent::ClosedOrMinimized(record.clone());

        assert_eq!(event.event_type(), WindowEventType::ClosedOrMinimized);
        assert_eq!(event.record(), Some(&record));
        assert_eq!(WindowEvent::Setup(vec![record]).record(), None);
    }
}
