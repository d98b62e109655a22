pub mod haze_overlay;
pub mod model_core;
pub mod models;
pub mod recommender;
pub mod window_cache;
pub mod window_source;
pub mod window_stack;

pub use haze_overlay::TracingSurface;
pub use recommender::Recommender;
pub use window_source::create_window_source;
