use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{RawWindowEvent, WindowEvent};
use crate::services::haze_overlay::{HazeOverlay, SurfaceFactory};
use crate::services::model_core::{ModelCore, ProtectedWindows, WeightedModel};
use crate::services::models::{FocusDuration, Frequency, MostRecentlyActive, TitleSimilarity};
use crate::services::window_cache::WindowCache;
use crate::services::window_source::WindowSource;
use crate::services::window_stack::WindowStack;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Движок: владеет кэшем, стеком, моделями и оверлеями.
///
/// Всё состояние меняется только из одной задачи (`run`); с задачами
/// отрисовки разделяется лишь готовый список прямоугольников.
pub struct Recommender {
    config: Arc<Config>,
    cache: WindowCache,
    stack: WindowStack,
    core: ModelCore,
    overlay: HazeOverlay,
    moving: bool,
    protected: ProtectedWindows,
}

impl Recommender {
    pub fn new(config: Arc<Config>, source: Arc<dyn WindowSource>, factory: SurfaceFactory) -> Result<Self> {
        config.validate()?;
        let recommender = &config.recommender;
        let weights = recommender.weights;
        let number_of_windows = recommender.number_of_windows;

        let mut models = Vec::new();
        if weights.most_recently_active > 0 {
            models.push(WeightedModel::new(
                Box::new(MostRecentlyActive::new(number_of_windows)),
                weights.most_recently_active,
            ));
        }
        if weights.frequency > 0 {
            let timeframe = Duration::from_secs(recommender.frequency_timeframe_minutes.saturating_mul(60));
            models.push(WeightedModel::new(Box::new(Frequency::new(timeframe)), weights.frequency));
        }
        if weights.title_similarity > 0 {
            models.push(WeightedModel::new(
                Box::new(TitleSimilarity::new(number_of_windows, Arc::clone(&source))),
                weights.title_similarity,
            ));
        }
        if weights.duration > 0 {
            let timeframe = Duration::from_secs(recommender.duration_timeframe_minutes.saturating_mul(60));
            models.push(WeightedModel::new(
                Box::new(FocusDuration::new(timeframe, number_of_windows)),
                weights.duration,
            ));
        }

        let core = ModelCore::new(Arc::clone(&config), Arc::clone(&source), models)?;
        let overlay = HazeOverlay::new(&source.monitors(), &config.overlay, factory);

        Ok(Self {
            cache: WindowCache::new(source),
            stack: WindowStack::new(),
            core,
            overlay,
            moving: false,
            protected: ProtectedWindows::default(),
            config,
        })
    }

    /// Начальное состояние; вызывается до запуска источника событий
    pub fn start(&mut self) {
        let setup = self.cache.start();
        self.stack.handle(&setup);

        let protected = self.core.start(&self.cache, &self.stack);
        self.overlay.start();
        self.apply(protected);

        info!(
            "Recommender запущен: окон {} (в стеке {}), мониторов {}",
            self.cache.len(),
            self.stack.len(),
            self.overlay.monitors().len()
        );
    }

    pub fn handle_raw(&mut self, event: &RawWindowEvent) {
        debug_if_enabled!("Сырое событие: {}", event);

        match event {
            RawWindowEvent::MoveStarted => {
                self.moving = true;
                self.overlay.hide();
            }
            RawWindowEvent::MoveEnded => {
                self.moving = false;
                // Перемещённое окно сменило прямоугольник - пересчитываем
                let protected = self.core.compute(&self.cache, &self.stack);
                self.apply(protected);
            }
            _ => {
                let mut latest = None;
                for normalized in self.cache.handle(event) {
                    self.dispatch(&normalized, &mut latest);
                }
                if let Some(protected) = latest {
                    self.apply(protected);
                }
            }
        }
    }

    fn dispatch(&mut self, event: &WindowEvent, latest: &mut Option<ProtectedWindows>) {
        debug_if_enabled!("Событие окна: {}", event);
        self.stack.handle(event);
        if let WindowEvent::Focused(record) = event {
            debug_if_enabled!("Активное окно {} ({} в стеке)", record, self.stack.len());
        }
        if let Some(protected) = self.core.handle_event(event, &self.cache, &self.stack) {
            *latest = Some(protected);
        }
    }

    pub fn on_interval(&mut self, now: Instant) {
        if let Some(protected) = self.core.on_interval(now, &self.cache, &self.stack) {
            self.apply(protected);
        }
    }

    fn apply(&mut self, protected: ProtectedWindows) {
        self.protected = protected;

        if !self.config.recommender.enabled {
            debug!("Рекомендации отключены, затемнение не показывается");
            return;
        }
        if self.moving {
            debug!("Окно перемещается, показ отложен до окончания перемещения");
            return;
        }
        self.overlay.show(&self.protected.rectangles);
    }

    pub fn protected(&self) -> &ProtectedWindows {
        &self.protected
    }

    pub fn stack(&self) -> &WindowStack {
        &self.stack
    }

    pub fn overlay(&self) -> &HazeOverlay {
        &self.overlay
    }

    /// Цикл событий; завершается, когда все отправители закрыты
    pub async fn run(mut self, mut events: mpsc::Receiver<RawWindowEvent>) -> Result<()> {
        let period = Duration::from_secs(self.config.recommender.model_interval_secs.max(1));
        let mut ticker = interval(period);
        // Первый тик срабатывает сразу
        ticker.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_raw(&event),
                    None => {
                        info!("Канал событий окон закрыт");
                        break;
                    }
                },
                _ = ticker.tick() => self.on_interval(Instant::now()),
            }
        }

        self.overlay.stop().await;
        info!("Recommender остановлен");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelWeights;
    use crate::error::HazeError;
    use crate::events::WindowId;
    use crate::geometry::{mask, Rectangle};
    use crate::services::haze_overlay::TracingSurface;
    use crate::services::window_source::DryRunSource;

    const SCREEN: Rectangle = Rectangle::new(0, 0, 1920, 1080);
    const A: Rectangle = Rectangle::new(0, 0, 960, 1080);
    const B: Rectangle = Rectangle::new(960, 0, 1920, 540);
    const C: Rectangle = Rectangle::new(960, 540, 1920, 1080);

    fn desktop() -> Arc<DryRunSource> {
        Arc::new(
            DryRunSource::new(vec![SCREEN])
                .with_window(1, "Alpha", "alpha", A)
                .with_window(2, "Beta", "beta", B)
                .with_window(3, "Gamma", "gamma", C),
        )
    }

    fn config(number_of_windows: usize, weights: ModelWeights) -> Arc<Config> {
        let mut config = Config::default();
        config.recommender.number_of_windows = number_of_windows;
        config.recommender.border_correction = 0;
        config.recommender.weights = weights;
        Arc::new(config)
    }

    fn engine(config: Arc<Config>, source: Arc<DryRunSource>) -> Recommender {
        Recommender::new(config, source, TracingSurface::factory()).unwrap()
    }

    fn residual(engine: &Recommender) -> Vec<Rectangle> {
        engine.overlay().residual(0).unwrap().to_vec()
    }

    fn mra_only() -> ModelWeights {
        ModelWeights {
            most_recently_active: 1,
            frequency: 0,
            title_similarity: 0,
            duration: 0,
        }
    }

    #[tokio::test]
    async fn test_three_protected_windows_tile_the_screen() {
        let mut engine = engine(config(3, ModelWeights::default()), desktop());
        engine.start();

        assert_eq!(engine.protected().windows.len(), 3);
        assert!(residual(&engine).is_empty());
        engine.overlay.stop().await;
    }

    #[tokio::test]
    async fn test_single_protected_window_leaves_the_rest_hazed() {
        let mut engine = engine(config(1, ModelWeights::default()), desktop());
        engine.start();

        assert_eq!(engine.protected().windows, vec![WindowId::new(1)]);
        assert_eq!(residual(&engine), mask::cut_all(&SCREEN, &[A]));
        assert_eq!(residual(&engine), vec![Rectangle::new(960, 0, 1920, 1080)]);
        engine.overlay.stop().await;
    }

    #[tokio::test]
    async fn test_focus_change_moves_protection() {
        let source = desktop();
        let mut engine = engine(config(1, mra_only()), source.clone());
        engine.start();

        source.focus(WindowId::new(3));
        engine.handle_raw(&RawWindowEvent::Focused(WindowId::new(3)));

        assert_eq!(engine.protected().windows, vec![WindowId::new(3)]);
        assert_eq!(engine.stack().z_index(WindowId::new(3)), Some(0));
        assert_eq!(residual(&engine), mask::cut_all(&SCREEN, &[C]));

        // Окно уже в top-1: повторный фокус ничего не пересчитывает
        engine.handle_raw(&RawWindowEvent::Focused(WindowId::new(3)));
        assert_eq!(residual(&engine), mask::cut_all(&SCREEN, &[C]));
        engine.overlay.stop().await;
    }

    #[tokio::test]
    async fn test_minimized_window_loses_protection_until_restored() {
        let source = Arc::new(
            DryRunSource::new(vec![SCREEN])
                .with_window(1, "Rust book chapter", "firefox", A)
                .with_window(2, "Rust docs chapter", "firefox", B)
                .with_window(3, "Cooking pasta", "firefox", C),
        );
        let weights = ModelWeights {
            title_similarity: 1,
            ..mra_only()
        };
        let mut engine = engine(config(3, weights), source.clone());
        engine.start();
        assert!(residual(&engine).is_empty());

        let docs = WindowId::new(2);
        source.minimize(docs);
        engine.handle_raw(&RawWindowEvent::Minimized(docs));

        assert!(!engine.protected().windows.contains(&docs));
        assert_eq!(residual(&engine), mask::cut_all(&SCREEN, &[A, C]));
        assert_eq!(residual(&engine), vec![Rectangle::new(960, 0, 1920, 540)]);

        // Восстановленное окно снова защищено
        source.focus(docs);
        engine.handle_raw(&RawWindowEvent::Focused(docs));
        assert!(engine.protected().windows.contains(&docs));
        assert!(residual(&engine).is_empty());
        engine.overlay.stop().await;
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.overlay.frames_per_second = 0;
        let result = Recommender::new(Arc::new(config), desktop(), TracingSurface::factory());
        assert!(matches!(result, Err(HazeError::Config(_))));
    }

    #[test]
    fn test_huge_timeframe_does_not_overflow() {
        let mut config = Config::default();
        config.recommender.frequency_timeframe_minutes = u64::MAX;
        config.recommender.duration_timeframe_minutes = u64::MAX;
        assert!(Recommender::new(Arc::new(config), desktop(), TracingSurface::factory()).is_ok());
    }

    #[tokio::test]
    async fn test_move_hides_haze_until_move_ends() {
        let source = desktop();
        let mut engine = engine(config(1, mra_only()), source.clone());
        engine.start();

        engine.handle_raw(&RawWindowEvent::MoveStarted);
        assert!(residual(&engine).is_empty());

        // Во время перемещения показ откладывается
        source.focus(WindowId::new(2));
        engine.handle_raw(&RawWindowEvent::Focused(WindowId::new(2)));
        assert!(residual(&engine).is_empty());

        let moved = Rectangle::new(100, 100, 1060, 640);
        source.move_to(WindowId::new(2), moved);
        engine.handle_raw(&RawWindowEvent::MoveEnded);
        assert_eq!(residual(&engine), mask::cut_all(&SCREEN, &[moved]));
        engine.overlay.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_recommender_never_shows_haze() {
        let mut config = Config::default();
        config.recommender.enabled = false;
        let mut engine = engine(Arc::new(config), desktop());
        engine.start();

        assert!(!engine.protected().windows.is_empty());
        assert!(residual(&engine).is_empty());
        engine.overlay.stop().await;
    }

    #[tokio::test]
    async fn test_run_processes_events_and_stops_when_channel_closes() {
        let source = desktop();
        let mut engine = engine(config(1, mra_only()), source.clone());
        engine.start();
        let haze = engine.overlay().subscribe(0).unwrap();

        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(engine.run(rx));

        source.focus(WindowId::new(2));
        tx.send(RawWindowEvent::Focused(WindowId::new(2))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(&**haze.borrow(), mask::cut_all(&SCREEN, &[B]).as_slice());

        drop(tx);
        handle.await.unwrap().unwrap();
        // Остановленный оверлей ничего не затемняет
        assert!(haze.borrow().is_empty());
    }
}
