//! Haze overlay: one render loop per monitor that dims everything outside
//! the protected windows.

mod overlay_window;
mod surface;

pub use overlay_window::OverlayWindow;
pub use surface::{Surface, SurfaceFactory, SurfaceGuard, TracingSurface};

use crate::config::OverlayConfig;
use crate::geometry::{mask, Rectangle};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct HazeOverlay {
    windows: Vec<OverlayWindow>,
}

impl HazeOverlay {
    pub fn new(monitors: &[Rectangle], config: &OverlayConfig, factory: SurfaceFactory) -> Self {
        if monitors.is_empty() {
            warn!("Список мониторов пуст, затемнение отображаться не будет");
        }

        let windows = monitors
            .iter()
            .enumerate()
            .map(|(index, bounds)| {
                OverlayWindow::new(
                    index,
                    *bounds,
                    config.alpha,
                    config.frames_per_second,
                    Arc::clone(&factory),
                )
            })
            .collect();

        Self { windows }
    }

    pub fn monitors(&self) -> Vec<Rectangle> {
        self.windows.iter().map(OverlayWindow::bounds).collect()
    }

    pub fn start(&mut self) {
        for window in &mut self.windows {
            window.start();
        }
        info!("Запущено оверлеев: {}", self.windows.len());
    }

    pub async fn stop(&mut self) {
        for window in &mut self.windows {
            window.stop().await;
        }
    }

    /// Затемнить на каждом мониторе всё, кроме защищённых прямоугольников
    pub fn show(&self, protected: &[Rectangle]) {
        for window in &self.windows {
            window.show(&mask::cut_all(&window.bounds(), protected));
        }
    }

    pub fn hide(&self) {
        for window in &self.windows {
            window.hide();
        }
    }

    /// Остаток монитора в его локальных координатах
    pub fn residual(&self, monitor: usize) -> Option<Arc<[Rectangle]>> {
        self.windows.get(monitor).map(OverlayWindow::rectangles)
    }

    pub fn subscribe(&self, monitor: usize) -> Option<watch::Receiver<Arc<[Rectangle]>>> {
        self.windows.get(monitor).map(OverlayWindow::subscribe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::haze_overlay::surface::tests::{RecordingSurface, SurfaceOp};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn haze(monitors: &[Rectangle]) -> HazeOverlay {
        HazeOverlay::new(monitors, &OverlayConfig::default(), TracingSurface::factory())
    }

    #[test]
    fn test_show_cuts_each_monitor_separately() {
        let left = Rectangle::new(0, 0, 1920, 1080);
        let right = Rectangle::new(1920, 0, 3840, 1080);
        let overlay = haze(&[left, right]);

        // Окно целиком на левом мониторе
        overlay.show(&[Rectangle::new(0, 0, 960, 1080)]);
        assert_eq!(&*overlay.residual(0).unwrap(), &[Rectangle::new(960, 0, 1920, 1080)]);
        assert_eq!(&*overlay.residual(1).unwrap(), &[Rectangle::new(0, 0, 1920, 1080)]);

        overlay.hide();
        assert!(overlay.residual(0).unwrap().is_empty());
        assert!(overlay.residual(2).is_none());
    }

    #[test]
    fn test_no_protected_windows_hazes_everything() {
        let screen = Rectangle::new(0, 0, 1920, 1080);
        let overlay = haze(&[screen]);
        overlay.show(&[]);
        assert_eq!(&*overlay.residual(0).unwrap(), &[screen]);
    }

    #[tokio::test]
    async fn test_failing_monitor_keeps_rendering_and_spares_the_other() {
        let left = Rectangle::new(0, 0, 1920, 1080);
        let right = Rectangle::new(1920, 0, 3840, 1080);
        let broken_ops = Arc::new(Mutex::new(Vec::new()));
        let healthy_ops = Arc::new(Mutex::new(Vec::new()));

        let factory: SurfaceFactory = {
            let broken_ops = broken_ops.clone();
            let healthy_ops = healthy_ops.clone();
            Arc::new(move |index: usize| {
                let mut surface = if index == 0 {
                    RecordingSurface::new(broken_ops.clone())
                } else {
                    RecordingSurface::new(healthy_ops.clone())
                };
                surface.fail_fill = index == 0;
                Box::new(surface) as Box<dyn Surface>
            })
        };
        let config = OverlayConfig {
            frames_per_second: 100,
            ..OverlayConfig::default()
        };
        let mut overlay = HazeOverlay::new(&[left, right], &config, factory);
        overlay.start();

        overlay.show(&[Rectangle::new(0, 0, 960, 1080)]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        overlay.show(&[Rectangle::new(0, 0, 480, 1080), Rectangle::new(1920, 0, 2880, 1080)]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Оба изменения дошли до сломанной поверхности, цикл жив
        let broken_fills = broken_ops.lock().iter().filter(|op| matches!(op, SurfaceOp::Fill(_))).count();
        assert!(broken_fills >= 2, "заливок: {}", broken_fills);
        assert!(overlay.windows[0].is_running());
        assert!(overlay.windows[1].is_running());

        // Второй монитор дорисовал последний кадр целиком
        {
            let ops = healthy_ops.lock();
            let expected = SurfaceOp::Fill(Rectangle::new(960, 0, 1920, 1080));
            let fill = ops.iter().rposition(|op| *op == expected);
            assert!(fill.is_some_and(|index| ops[index + 1..].contains(&SurfaceOp::Present)));
        }

        overlay.stop().await;
        assert_eq!(broken_ops.lock().last(), Some(&SurfaceOp::Teardown));
        assert_eq!(healthy_ops.lock().last(), Some(&SurfaceOp::Teardown));
    }
}
