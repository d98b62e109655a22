pub mod mask;
pub mod rectangle;

pub use rectangle::Rectangle;
