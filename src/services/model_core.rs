use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::haze_error;
use crate::events::{WindowEvent, WindowId};
use crate::geometry::Rectangle;
use crate::services::models::{ScoringModel, ScoreMap};
use crate::services::window_cache::WindowCache;
use crate::services::window_source::WindowSource;
use crate::services::window_stack::WindowStack;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct WeightedModel {
    pub model: Box<dyn ScoringModel>,
    pub weight: u32,
}

impl WeightedModel {
    pub fn new(model: Box<dyn ScoringModel>, weight: u32) -> Self {
        Self { model, weight }
    }
}

/// Окна, которые нужно защитить от затемнения, и их прямоугольники на экране
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectedWindows {
    pub windows: Vec<WindowId>,
    pub rectangles: Vec<Rectangle>,
}

/// Объединяет взвешенные модели в одно решение: какие окна защищать.
///
/// Сумма `score * weight` делится на число моделей, а не на сумму весов.
pub struct ModelCore {
    config: Arc<Config>,
    source: Arc<dyn WindowSource>,
    models: Vec<WeightedModel>,
}

impl ModelCore {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn WindowSource>,
        models: Vec<WeightedModel>,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(haze_error!(internal, "ModelCore требует хотя бы одну модель"));
        }
        if let Some(model) = models.iter().find(|m| m.weight == 0) {
            return Err(haze_error!(
                internal,
                "Вес модели {} должен быть положительным",
                model.model.name()
            ));
        }

        info!(
            "ModelCore: модели {:?}",
            models
                .iter()
                .map(|m| format!("{}={}", m.model.name(), m.weight))
                .collect::<Vec<_>>()
        );

        Ok(Self {
            config,
            source,
            models,
        })
    }

    /// Передать список открытых окон всем моделям и вычислить первый результат
    pub fn start(&mut self, cache: &WindowCache, stack: &WindowStack) -> ProtectedWindows {
        let windows = self.source.open_windows();
        for weighted in &mut self.models {
            weighted.model.set_windows(&windows);
        }
        self.compute(cache, stack)
    }

    /// Раздать событие всем моделям; пересчёт только если хоть одна сообщила об изменении
    pub fn handle_event(
        &mut self,
        event: &WindowEvent,
        cache: &WindowCache,
        stack: &WindowStack,
    ) -> Option<ProtectedWindows> {
        let mut changed = false;
        for weighted in &mut self.models {
            if weighted.model.handle_event(event).is_changed() {
                debug_if_enabled!("Модель {} сообщила об изменении порядка", weighted.model.name());
                changed = true;
            }
        }
        changed.then(|| self.compute(cache, stack))
    }

    pub fn on_interval(
        &mut self,
        now: Instant,
        cache: &WindowCache,
        stack: &WindowStack,
    ) -> Option<ProtectedWindows> {
        let mut changed = false;
        for weighted in &mut self.models {
            changed |= weighted.model.on_interval(now).is_changed();
        }
        changed.then(|| self.compute(cache, stack))
    }

    /// Объединённые оценки в порядке первого упоминания: модели по порядку, окна по порядку ScoreMap
    pub fn merged_scores(&self) -> ScoreMap {
        let mut merged = ScoreMap::new();
        for weighted in &self.models {
            for (id, score) in weighted.model.scores().iter() {
                let accumulated = merged.get(id).unwrap_or(0.0);
                merged.insert(id, accumulated + score * f64::from(weighted.weight));
            }
        }

        let model_count = self.models.len() as f64;
        merged.iter().map(|(id, total)| (id, total / model_count)).collect()
    }

    /// Первые N видимых окон. Свёрнутые и закрытые окна не занимают места в top-N,
    /// даже если модель ещё помнит их оценку.
    pub fn top_windows(&self, stack: &WindowStack) -> Vec<WindowId> {
        self.merged_scores()
            .iter()
            .filter(|(id, _)| stack.contains(*id))
            .collect::<ScoreMap>()
            .top(self.config.recommender.number_of_windows)
    }

    pub fn compute(&self, cache: &WindowCache, stack: &WindowStack) -> ProtectedWindows {
        let windows = self.top_windows(stack);
        let rectangles = self.resolve_rectangles(&windows, cache);
        debug!("Защищаемые окна: {:?}, прямоугольники: {}", windows, rectangles.len());
        ProtectedWindows { windows, rectangles }
    }

    /// Окно, закрытое между событием и пересчётом, просто пропускается
    fn resolve_rectangles(&self, windows: &[WindowId], cache: &WindowCache) -> Vec<Rectangle> {
        let recommender = &self.config.recommender;
        let mut rectangles = Vec::with_capacity(windows.len());

        for id in windows {
            let Some(rectangle) = self.source.rectangle(*id) else {
                debug!("Окно {} исчезло до вычисления прямоугольника, пропускаем", id);
                continue;
            };

            let process_name = cache.get(*id).map(|r| r.process_name).unwrap_or_default();
            let rectangle = if self.config.needs_border_correction(&process_name) {
                rectangle.with_border_correction(recommender.border_correction)
            } else {
                rectangle
            };

            if rectangle.is_empty() {
                debug!("Прямоугольник окна {} пуст после коррекции, пропускаем", id);
                continue;
            }
            rectangles.push(rectangle);
        }

        rectangles
    }
}
