//! Window sources: the boundary between the engine and the desktop.
//!
//! This module and its submodules ONLY observe the desktop (window list,
//! titles, owning processes, geometry, monitors) and emit raw
//! `RawWindowEvent`s. They MUST NOT rank windows or decide what gets hazed;
//! that belongs to the model core.

mod dry_run;
mod x11;
mod r#trait;

pub use self::dry_run::{DryRunEventSource, DryRunSource};
pub use self::r#trait::{create_window_source, EventSource, WindowSource};
