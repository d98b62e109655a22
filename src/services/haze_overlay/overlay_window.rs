use super::surface::{Surface, SurfaceFactory, SurfaceGuard};
use crate::debug_if_enabled;
use crate::error::Result;
use crate::geometry::Rectangle;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// Состояние, разделяемое движком и задачей отрисовки.
///
/// Снимок заменяется целиком, поэтому задача отрисовки никогда не видит
/// наполовину обновлённый список.
struct SharedState {
    rectangles: RwLock<Arc<[Rectangle]>>,
    dirty: AtomicBool,
    publisher: watch::Sender<Arc<[Rectangle]>>,
}

impl SharedState {
    fn replace(&self, rectangles: Arc<[Rectangle]>) {
        *self.rectangles.write() = rectangles.clone();
        self.dirty.store(true, Ordering::Release);
        self.publisher.send_replace(rectangles);
    }

    fn snapshot(&self) -> Arc<[Rectangle]> {
        self.rectangles.read().clone()
    }
}

/// Оверлей одного монитора
pub struct OverlayWindow {
    index: usize,
    bounds: Rectangle,
    alpha: u8,
    frame_interval: Duration,
    factory: SurfaceFactory,
    state: Arc<SharedState>,
    task: Option<JoinHandle<()>>,
}

impl OverlayWindow {
    pub fn new(index: usize, bounds: Rectangle, alpha: u8, frames_per_second: u32, factory: SurfaceFactory) -> Self {
        let empty: Arc<[Rectangle]> = Arc::from(Vec::new());
        let (publisher, _) = watch::channel(empty.clone());

        Self {
            index,
            bounds,
            alpha,
            frame_interval: Duration::from_secs(1) / frames_per_second.max(1),
            factory,
            state: Arc::new(SharedState {
                rectangles: RwLock::new(empty),
                dirty: AtomicBool::new(true),
                publisher,
            }),
            task: None,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Текущий список в локальных координатах монитора
    pub fn rectangles(&self) -> Arc<[Rectangle]> {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[Rectangle]>> {
        self.state.publisher.subscribe()
    }

    /// Принять прямоугольники в экранных координатах.
    /// Повторный показ того же списка не помечает кадр грязным.
    pub fn show(&self, rectangles: &[Rectangle]) {
        let local: Arc<[Rectangle]> = rectangles
            .iter()
            .map(|r| r.translated_relative(&self.bounds))
            .collect();

        if *self.state.snapshot() == *local {
            debug_if_enabled!("Монитор {}: список не изменился, перерисовка не нужна", self.index);
            return;
        }
        debug_if_enabled!("Монитор {}: {} прямоугольников затемнения", self.index, local.len());
        self.state.replace(local);
    }

    pub fn hide(&self) {
        if self.state.snapshot().is_empty() {
            return;
        }
        debug_if_enabled!("Монитор {}: затемнение скрыто", self.index);
        self.state.replace(Arc::from(Vec::new()));
    }

    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("Оверлей монитора {} уже запущен", self.index);
            return;
        }

        let surface = (self.factory)(self.index);
        let state = Arc::clone(&self.state);
        let index = self.index;
        let bounds = self.bounds;
        let alpha = self.alpha;
        let frame_interval = self.frame_interval;

        // Первый кадр очищает поверхность, даже если список пуст
        state.dirty.store(true, Ordering::Release);

        self.task = Some(tokio::spawn(async move {
            Self::render_loop(index, surface, bounds, alpha, frame_interval, state).await;
        }));
        info!("Оверлей монитора {} запущен ({})", self.index, self.bounds);
    }

    async fn render_loop(
        index: usize,
        surface: Box<dyn Surface>,
        bounds: Rectangle,
        alpha: u8,
        frame_interval: Duration,
        state: Arc<SharedState>,
    ) {
        let mut guard = match SurfaceGuard::new(surface, bounds, alpha) {
            Ok(guard) => guard,
            Err(e) => {
                error!("Монитор {}: не удалось создать поверхность: {}", index, e);
                return;
            }
        };

        let mut ticker = interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // Ошибка кадра не останавливает цикл и не затрагивает другие мониторы
            if let Err(e) = render_frame(guard.surface_mut(), &state) {
                error!("Монитор {}: ошибка отрисовки кадра: {}", index, e);
            }
        }
    }

    /// Остановить цикл отрисовки; поверхность освобождается до возврата
    pub async fn stop(&mut self) {
        let Some(handle) = self.task.take() else {
            return;
        };
        handle.abort();
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                error!("Оверлей монитора {} завершился с ошибкой: {}", self.index, e);
            }
        }
        self.state.replace(Arc::from(Vec::new()));
        info!("Оверлей монитора {} остановлен", self.index);
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

/// Перерисовать кадр, если список изменился. Возвращает, был ли кадр нарисован.
fn render_frame(surface: &mut dyn Surface, state: &SharedState) -> Result<bool> {
    if !state.dirty.swap(false, Ordering::AcqRel) {
        return Ok(false);
    }

    let rectangles = state.snapshot();
    surface.clear()?;
    for rectangle in rectangles.iter() {
        surface.fill_rectangle(*rectangle)?;
    }
    surface.present()?;
    Ok(true)
}
