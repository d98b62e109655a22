use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub source: SourceConfig,
    // Индекс процессов без коррекции рамки - не сериализуется, строится после загрузки
    #[serde(skip)]
    uncorrected_set: HashSet<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Сколько окон защищается от затемнения
    pub number_of_windows: usize,
    pub enabled: bool,
    /// Невидимая рамка изменения размера (пиксели слева, справа и снизу)
    pub border_correction: i32,
    /// Процессы, прямоугольник которых используется без коррекции
    pub uncorrected_processes: Vec<String>,
    pub model_interval_secs: u64,
    pub frequency_timeframe_minutes: u64,
    pub duration_timeframe_minutes: u64,
    pub weights: ModelWeights,
}

/// Веса моделей; 0 отключает модель
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelWeights {
    pub most_recently_active: u32,
    pub frequency: u32,
    pub title_similarity: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Непрозрачность заливки, 0..=255
    pub alpha: u8,
    pub frames_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: String,
    pub polling_interval_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            number_of_windows: 3,
            enabled: true,
            border_correction: 8,
            uncorrected_processes: [
                // MS Office
                "WINWORD", "EXCEL", "ONENOTE", "OUTLOOK", "POWERPNT", "MSACCESS",
                // IDE
                "devenv", "Code", "code",
                // Чаты
                "Discord", "Teams", "Slack", "slack",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            model_interval_secs: 10,
            frequency_timeframe_minutes: 10,
            duration_timeframe_minutes: 10,
            weights: ModelWeights::default(),
        }
    }
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            most_recently_active: 1,
            frequency: 1,
            title_similarity: 1,
            duration: 1,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: 64,
            frames_per_second: 10,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: "x11".to_string(),
            polling_interval_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig::default(),
            recommender: RecommenderConfig::default(),
            overlay: OverlayConfig::default(),
            source: SourceConfig::default(),
            uncorrected_set: HashSet::new(),
        };
        config.build_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("HAZE_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_indexes();

        Ok(config)
    }

    pub fn build_indexes(&mut self) {
        self.uncorrected_set = self
            .recommender
            .uncorrected_processes
            .iter()
            .cloned()
            .collect();
    }

    /// Проверяются только значения, при которых движок не может работать;
    /// всё остальное покрывается значениями по умолчанию
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        if self.overlay.frames_per_second == 0 {
            anyhow::bail!("frames_per_second должно быть больше 0");
        }

        let weights = &self.recommender.weights;
        if weights.most_recently_active == 0
            && weights.frequency == 0
            && weights.title_similarity == 0
            && weights.duration == 0
        {
            anyhow::bail!("Хотя бы одна модель должна иметь положительный вес");
        }

        match self.source.mode.as_str() {
            "x11" | "dry_run" => {}
            _ => anyhow::bail!("Неверный режим источника окон: {}", self.source.mode),
        }

        Ok(())
    }

    /// Нужно ли срезать невидимую рамку у окна этого процесса
    pub fn needs_border_correction(&self, process_name: &str) -> bool {
        !self.uncorrected_set.contains(process_name)
    }
}
