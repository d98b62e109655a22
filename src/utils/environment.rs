use crate::error::Result;
use crate::haze_error;
use std::env;
use std::path::Path;
use tracing::{info, warn};

/// Утилиты, через которые X11-источник читает состояние рабочего стола
const REQUIRED_TOOLS: &[&str] = &["wmctrl", "xprop", "xrandr"];

/// Проверить, что X11-источник сможет работать в текущей сессии
pub fn check_x11_session() -> Result<()> {
    info!("Проверка окружения X11...");

    check_display(env::var("DISPLAY").ok().as_deref())?;
    check_session_type(env::var("XDG_SESSION_TYPE").ok().as_deref());

    let path = env::var("PATH").unwrap_or_default();
    let missing = missing_tools(&path);
    if !missing.is_empty() {
        return Err(haze_error!(
            source_unavailable,
            "Не найдены утилиты: {}. Установите их или запустите с --dry-run",
            missing.join(", ")
        ));
    }

    info!("Окружение X11 подтверждено");
    Ok(())
}

fn check_display(display: Option<&str>) -> Result<()> {
    match display {
        Some(value) if !value.is_empty() => {
            info!("Дисплей: {}", value);
            Ok(())
        }
        _ => Err(haze_error!(source_unavailable, "Переменная DISPLAY не задана, X-сервер недоступен")),
    }
}

fn check_session_type(session_type: Option<&str>) {
    match session_type {
        Some("wayland") => {
            warn!("⚠️  Сессия Wayland: через XWayland видны только X11-окна");
        }
        Some(other) => info!("Тип сессии: {}", other),
        None => warn!("Не удалось определить тип сессии"),
    }
}

fn missing_tools(path: &str) -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .copied()
        .filter(|tool| !env::split_paths(path).any(|dir| Path::new(&dir).join(tool).is_file()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HazeError;

    #[test]
    fn test_display_is_required() {
        assert!(check_display(Some(":0")).is_ok());
        assert!(check_display(Some("")).is_err());
        assert!(matches!(check_display(None), Err(HazeError::SourceUnavailable(_))));
    }

    #[test]
    fn test_missing_tools_with_empty_path() {
        assert_eq!(missing_tools(""), REQUIRED_TOOLS.to_vec());
    }
}
