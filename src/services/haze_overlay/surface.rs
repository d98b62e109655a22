use crate::error::Result;
use crate::geometry::Rectangle;
use crate::trace_if_enabled;
use std::sync::Arc;
use tracing::{debug, info};

/// Поверхность рисования одного монитора.
///
/// Ресурсы захватываются в `setup` и освобождаются в `teardown`; между ними
/// кадр строится как `clear`, несколько `fill_rectangle` и `present`.
pub trait Surface: Send {
    fn setup(&mut self, bounds: Rectangle, alpha: u8) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// Залить прямоугольник в локальных координатах поверхности
    fn fill_rectangle(&mut self, rectangle: Rectangle) -> Result<()>;
    fn present(&mut self) -> Result<()>;
    fn teardown(&mut self);
}

/// Создаёт поверхность для монитора с заданным индексом
pub type SurfaceFactory = Arc<dyn Fn(usize) -> Box<dyn Surface> + Send + Sync>;

/// Владеет поверхностью на время одного цикла отрисовки.
///
/// `teardown` вызывается в `Drop`: при обычной остановке, при abort задачи
/// и при раскрутке стека после паники.
pub struct SurfaceGuard {
    surface: Box<dyn Surface>,
}

impl SurfaceGuard {
    pub fn new(mut surface: Box<dyn Surface>, bounds: Rectangle, alpha: u8) -> Result<Self> {
        if let Err(e) = surface.setup(bounds, alpha) {
            // Частично захваченные ресурсы тоже нужно отпустить
            surface.teardown();
            return Err(e);
        }
        Ok(Self { surface })
    }

    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        self.surface.as_mut()
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        self.surface.teardown();
    }
}

/// Поверхность без графики: кадры пишутся в лог
pub struct TracingSurface {
    monitor: usize,
    bounds: Rectangle,
    alpha: u8,
    frame: u64,
    filled: usize,
}

impl TracingSurface {
    pub fn new(monitor: usize) -> Self {
        Self {
            monitor,
            bounds: Rectangle::default(),
            alpha: 0,
            frame: 0,
            filled: 0,
        }
    }

    pub fn factory() -> SurfaceFactory {
        Arc::new(|monitor| Box::new(TracingSurface::new(monitor)) as Box<dyn Surface>)
    }
}

impl Surface for TracingSurface {
    fn setup(&mut self, bounds: Rectangle, alpha: u8) -> Result<()> {
        self.bounds = bounds;
        self.alpha = alpha;
        info!(
            "Монитор {}: поверхность {}x{} создана, alpha {}",
            self.monitor,
            bounds.width(),
            bounds.height(),
            alpha
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.filled = 0;
        Ok(())
    }

    fn fill_rectangle(&mut self, rectangle: Rectangle) -> Result<()> {
        trace_if_enabled!("Монитор {}: заливка {}", self.monitor, rectangle);
        self.filled += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.frame += 1;
        debug!(
            "Монитор {}: кадр {}, затемнённых прямоугольников {}",
            self.monitor, self.frame, self.filled
        );
        Ok(())
    }

    fn teardown(&mut self) {
        info!(
            "Монитор {}: поверхность освобождена после {} кадров",
            self.monitor, self.frame
        );
    }
}
