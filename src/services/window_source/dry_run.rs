use crate::error::Result;
use crate::events::{RawWindowEvent, WindowId};
use crate::geometry::Rectangle;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::info;

use super::r#trait::{EventSource, WindowSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualWindow {
    pub id: WindowId,
    pub title: String,
    pub process_name: String,
    pub rectangle: Rectangle,
    pub minimized: bool,
}

/// Эмулируемый рабочий стол: окна хранятся в порядке активации (первое - активное)
pub struct DryRunSource {
    monitors: Vec<Rectangle>,
    windows: RwLock<Vec<VirtualWindow>>,
}

impl DryRunSource {
    pub fn new(monitors: Vec<Rectangle>) -> Self {
        Self {
            monitors,
            windows: RwLock::new(Vec::new()),
        }
    }

    /// Добавить окно в конец стека (наименее активное)
    pub fn with_window(self, id: u64, title: &str, process_name: &str, rectangle: Rectangle) -> Self {
        self.windows.write().push(VirtualWindow {
            id: WindowId::new(id),
            title: title.to_string(),
            process_name: process_name.to_string(),
            rectangle,
            minimized: false,
        });
        self
    }

    pub fn demo() -> Self {
        Self::new(vec![Rectangle::new(0, 0, 1920, 1080)])
            .with_window(0x100, "Terminal - dry_run", "alacritty", Rectangle::new(0, 0, 960, 540))
            .with_window(0x200, "Browser - dry_run", "firefox", Rectangle::new(960, 0, 1920, 1080))
            .with_window(0x300, "Editor - dry_run", "code", Rectangle::new(0, 540, 960, 1080))
            .with_window(0x400, "Notes - dry_run", "obsidian", Rectangle::new(480, 270, 1440, 810))
    }

    pub fn open(&self, id: u64, title: &str, process_name: &str, rectangle: Rectangle) -> WindowId {
        let window = VirtualWindow {
            id: WindowId::new(id),
            title: title.to_string(),
            process_name: process_name.to_string(),
            rectangle,
            minimized: false,
        };
        let mut windows = self.windows.write();
        windows.retain(|w| w.id != window.id);
        windows.insert(0, window);
        WindowId::new(id)
    }

    pub fn focus(&self, id: WindowId) -> bool {
        let mut windows = self.windows.write();
        match windows.iter().position(|w| w.id == id) {
            Some(index) => {
                let mut window = windows.remove(index);
                window.minimized = false;
                windows.insert(0, window);
                true
            }
            None => false,
        }
    }

    pub fn close(&self, id: WindowId) -> bool {
        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|w| w.id != id);
        windows.len() != before
    }

    pub fn minimize(&self, id: WindowId) -> bool {
        let mut windows = self.windows.write();
        match windows.iter_mut().find(|w| w.id == id) {
            Some(window) => {
                window.minimized = true;
                true
            }
            None => false,
        }
    }

    pub fn rename(&self, id: WindowId, title: &str) -> bool {
        let mut windows = self.windows.write();
        match windows.iter_mut().find(|w| w.id == id) {
            Some(window) => {
                window.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn move_to(&self, id: WindowId, rectangle: Rectangle) -> bool {
        let mut windows = self.windows.write();
        match windows.iter_mut().find(|w| w.id == id) {
            Some(window) => {
                window.rectangle = rectangle;
                true
            }
            None => false,
        }
    }

    fn find<T>(&self, id: WindowId, f: impl FnOnce(&VirtualWindow) -> T) -> Option<T> {
        self.windows.read().iter().find(|w| w.id == id).map(f)
    }
}

impl WindowSource for DryRunSource {
    fn open_windows(&self) -> Vec<WindowId> {
        self.windows
            .read()
            .iter()
            .filter(|w| !w.minimized)
            .map(|w| w.id)
            .collect()
    }

    fn title(&self, id: WindowId) -> Option<String> {
        self.find(id, |w| w.title.clone())
    }

    fn process_name(&self, id: WindowId) -> Option<String> {
        self.find(id, |w| w.process_name.clone())
    }

    /// Свёрнутое окно не занимает места на экране
    fn rectangle(&self, id: WindowId) -> Option<Rectangle> {
        self.find(id, |w| (!w.minimized).then_some(w.rectangle)).flatten()
    }

    fn monitors(&self) -> Vec<Rectangle> {
        self.monitors.clone()
    }
}

/// Сценарий dry-run: переключает фокус по кругу, периодически открывает,
/// переименовывает и закрывает временное окно
pub struct DryRunEventSource {
    desktop: Arc<DryRunSource>,
    step: u64,
    scratch: Option<WindowId>,
}

const SCRATCH_ID: u64 = 0xf00;

impl DryRunEventSource {
    pub fn new(desktop: Arc<DryRunSource>) -> Self {
        Self {
            desktop,
            step: 0,
            scratch: None,
        }
    }

    /// Следующий шаг сценария: меняет рабочий стол и возвращает сырые события
    pub fn next_step(&mut self) -> Vec<RawWindowEvent> {
        self.step += 1;
        let mut events = Vec::new();

        match (self.step % 6, self.scratch) {
            (0, None) => {
                let id = self.desktop.open(
                    SCRATCH_ID,
                    "Scratch - dry_run",
                    "gedit",
                    Rectangle::new(200, 200, 1000, 800),
                );
                self.scratch = Some(id);
                events.push(RawWindowEvent::Opened(id));
                events.push(RawWindowEvent::Focused(id));
                return events;
            }
            (2, Some(id)) => {
                if self.desktop.rename(id, &format!("Scratch ({}) - dry_run", self.step)) {
                    events.push(RawWindowEvent::Renamed(id));
                }
            }
            (4, Some(id)) => {
                if self.desktop.close(id) {
                    events.push(RawWindowEvent::Closed(id));
                }
                self.scratch = None;
            }
            _ => {}
        }

        // Фокус уходит на наименее активное видимое окно
        if let Some(&id) = self.desktop.open_windows().last() {
            if self.desktop.focus(id) {
                events.push(RawWindowEvent::Focused(id));
            }
        }
        events
    }
}

#[async_trait::async_trait]
impl EventSource for DryRunEventSource {
    async fn run(mut self: Box<Self>, events: mpsc::Sender<RawWindowEvent>) -> Result<()> {
        info!("Dry-run режим - источник окон работает в режиме эмуляции");

        let mut interval = interval(Duration::from_secs(5));
        // Первый тик срабатывает сразу - пропускаем его, чтобы движок успел показать начальное состояние
        interval.tick().await;

        loop {
            interval.tick().await;

            for event in self.next_step() {
                info!("Dry-run: эмулируем событие {}", event);
                if events.send(event).await.is_err() {
                    info!("Получатель событий закрыт, dry-run источник завершает работу");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_desktop_tracks_activation_order() {
        let desktop = DryRunSource::demo();
        assert_eq!(desktop.open_windows().len(), 4);

        let notes = WindowId::new(0x400);
        assert!(desktop.focus(notes));
        assert_eq!(desktop.open_windows()[0], notes);

        assert!(desktop.minimize(notes));
        assert!(!desktop.open_windows().contains(&notes));
        assert_eq!(desktop.title(notes).as_deref(), Some("Notes - dry_run"));
        assert_eq!(desktop.rectangle(notes), None);

        assert!(desktop.focus(notes));
        assert_eq!(desktop.rectangle(notes), Some(Rectangle::new(480, 270, 1440, 810)));

        assert!(desktop.close(notes));
        assert_eq!(desktop.title(notes), None);
        assert_eq!(desktop.rectangle(notes), None);
        assert!(!desktop.close(notes));
    }

    #[test]
    fn test_script_cycles_focus_and_manages_scratch_window() {
        let desktop = Arc::new(DryRunSource::demo());
        let mut script = DryRunEventSource::new(desktop.clone());

        // Шаг 1: фокус на наименее активное окно
        let first = script.next_step();
        assert_eq!(first, vec![RawWindowEvent::Focused(WindowId::new(0x400))]);

        let mut all = first;
        for _ in 0..9 {
            all.extend(script.next_step());
        }

        let scratch = WindowId::new(SCRATCH_ID);
        let opened = all.iter().position(|e| *e == RawWindowEvent::Opened(scratch));
        let renamed = all.iter().position(|e| *e == RawWindowEvent::Renamed(scratch));
        let closed = all.iter().position(|e| *e == RawWindowEvent::Closed(scratch));

        assert!(opened.is_some());
        assert!(opened < renamed);
        assert!(renamed < closed);
        assert_eq!(desktop.title(scratch), None);
    }
}
