use crate::config::Config;
use crate::error::Result;
use crate::haze_error;
use crate::events::{RawWindowEvent, WindowId};
use crate::geometry::Rectangle;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Read-only view of the desktop: window list, metadata and monitor layout.
///
/// Lookups are best-effort. A window that vanished between the event and the
/// lookup yields `None`; callers degrade instead of failing.
pub trait WindowSource: Send + Sync {
    /// Currently open, visible top-level windows, most recently active first
    fn open_windows(&self) -> Vec<WindowId>;
    fn title(&self, id: WindowId) -> Option<String>;
    fn process_name(&self, id: WindowId) -> Option<String>;
    fn rectangle(&self, id: WindowId) -> Option<Rectangle>;
    fn monitors(&self) -> Vec<Rectangle>;
}

/// Trait for event sources that push raw window notifications into the engine
#[async_trait::async_trait]
pub trait EventSource {
    /// Run the event source until the receiving side goes away
    async fn run(self: Box<Self>, events: mpsc::Sender<RawWindowEvent>) -> Result<()>;
}

/// Factory function to create the window source and its event feed based on the mode
pub fn create_window_source(
    config: Arc<Config>,
    dry_run: bool,
) -> Result<(Arc<dyn WindowSource>, Box<dyn EventSource + Send>)> {
    let mode = if dry_run { "dry_run" } else { config.source.mode.as_str() };

    match mode {
        "dry_run" => {
            let source = Arc::new(super::dry_run::DryRunSource::demo());
            let events = super::dry_run::DryRunEventSource::new(source.clone());
            Ok((source, Box::new(events)))
        }
        "x11" => {
            crate::utils::environment::check_x11_session()?;
            let source = Arc::new(super::x11::X11Source::connect()?);
            let events = super::x11::X11EventSource::new(source.clone(), config.source.polling_interval_ms);
            Ok((source, Box::new(events)))
        }
        other => Err(haze_error!(source_unavailable, "Неизвестный режим источника окон: {}", other)),
    }
}
