use thiserror::Error;

#[derive(Error, Debug)]
pub enum HazeError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Источник событий окон недоступен: {0}")]
    SourceUnavailable(String),

    #[error("Ошибка отрисовки: {0}")]
    Render(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, HazeError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! haze_error {
    (source_unavailable, $($arg:tt)*) => {
        $crate::error::HazeError::SourceUnavailable(format!($($arg)*))
    };
    (render, $($arg:tt)*) => {
        $crate::error::HazeError::Render(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::HazeError::Internal(format!($($arg)*))
    };
}
