pub mod window;

pub use window::{RawWindowEvent, WindowEvent, WindowEventType, WindowId, WindowRecord};
