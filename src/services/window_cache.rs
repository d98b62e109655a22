use crate::debug_if_enabled;
use crate::events::{RawWindowEvent, WindowEvent, WindowId, WindowRecord};
use crate::services::window_source::WindowSource;
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Одно сырое событие порождает не больше двух нормализованных
pub type CacheEvents = SmallVec<[WindowEvent; 2]>;

/// WindowCache turns identifier-only notifications into enriched records.
///
/// Responsibilities (strict):
/// - Own the `WindowRecord` of every known window; consumers get clones.
/// - Re-emit raw notifications as normalized lifecycle events, including the
///   combined `OpenedOrFocused` and `ClosedOrMinimized` variants.
/// - Do NOT rank windows; unknown identifiers are silently ignored.
pub struct WindowCache {
    source: Arc<dyn WindowSource>,
    cache: HashMap<WindowId, WindowRecord>,
}

impl WindowCache {
    pub fn new(source: Arc<dyn WindowSource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Построить начальное состояние из списка открытых окон и вернуть событие Setup
    pub fn start(&mut self) -> WindowEvent {
        let records: Vec<WindowRecord> = self
            .source
            .open_windows()
            .into_iter()
            .map(|id| self.build_record(id))
            .collect();

        info!("Кэш окон инициализирован: {} окон", records.len());

        self.cache = records.iter().map(|record| (record.id, record.clone())).collect();
        WindowEvent::Setup(records)
    }

    pub fn handle(&mut self, event: &RawWindowEvent) -> CacheEvents {
        match *event {
            RawWindowEvent::Opened(id) => {
                if self.cache.contains_key(&id) {
                    debug_if_enabled!("Окно {} уже известно, повторное открытие игнорируется", id);
                    return CacheEvents::new();
                }
                let record = self.build_record(id);
                self.cache.insert(id, record.clone());
                smallvec![
                    WindowEvent::Opened(record.clone()),
                    WindowEvent::OpenedOrFocused(record),
                ]
            }
            RawWindowEvent::Focused(id) => {
                // Фокус может прийти раньше открытия - создаём запись лениво
                if !self.cache.contains_key(&id) {
                    debug!("Фокус на неизвестном окне {}, создаём запись", id);
                    let record = self.build_record(id);
                    self.cache.insert(id, record);
                }
                match self.cache.get(&id) {
                    Some(record) => smallvec![
                        WindowEvent::Focused(record.clone()),
                        WindowEvent::OpenedOrFocused(record.clone()),
                    ],
                    None => CacheEvents::new(),
                }
            }
            RawWindowEvent::Closed(id) => match self.cache.remove(&id) {
                Some(record) => smallvec![
                    WindowEvent::Closed(record.clone()),
                    WindowEvent::ClosedOrMinimized(record),
                ],
                None => CacheEvents::new(),
            },
            RawWindowEvent::Minimized(id) => match self.cache.get(&id) {
                Some(record) => smallvec![
                    WindowEvent::Minimized(record.clone()),
                    WindowEvent::ClosedOrMinimized(record.clone()),
                ],
                None => CacheEvents::new(),
            },
            RawWindowEvent::Renamed(id) => {
                let title = self.source.title(id);
                match self.cache.get_mut(&id) {
                    Some(record) => {
                        record.title = title.unwrap_or_default();
                        smallvec![WindowEvent::Renamed(record.clone())]
                    }
                    None => CacheEvents::new(),
                }
            }
            RawWindowEvent::MoveStarted | RawWindowEvent::MoveEnded => CacheEvents::new(),
        }
    }

    pub fn get(&self, id: WindowId) -> Option<WindowRecord> {
        self.cache.get(&id).cloned()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.cache.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Метаданные недоступны (процесс уже завершился) - пустая строка вместо ошибки
    fn build_record(&self, id: WindowId) -> WindowRecord {
        let title = self.source.title(id).unwrap_or_default();
        let process_name = self.source.process_name(id).unwrap_or_default();
        WindowRecord::new(id, title, process_name)
    }
}
