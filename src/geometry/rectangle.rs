use serde::{Deserialize, Serialize};
use std::fmt;

/// Прямоугольник в координатах виртуального экрана (пиксели устройства).
///
/// `right` и `bottom` не включаются: пиксель `(right, bottom)` лежит
/// сразу за пределами прямоугольника.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rectangle {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Из геометрии X11 вида `x y width height`
    pub fn from_geometry(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(
            x,
            y,
            x.saturating_add(width.min(i32::MAX as u32) as i32),
            y.saturating_add(height.min(i32::MAX as u32) as i32),
        )
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rectangle::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        ))
    }

    /// Перевод в локальные координаты области `origin` (например, монитора)
    pub fn translated_relative(&self, origin: &Rectangle) -> Rectangle {
        Rectangle::new(
            self.left - origin.left,
            self.top - origin.top,
            self.right - origin.left,
            self.bottom - origin.top,
        )
    }

    /// Срезать невидимую рамку изменения размера слева, справа и снизу
    pub fn with_border_correction(&self, border: i32) -> Rectangle {
        Rectangle::new(
            self.left + border,
            self.top,
            self.right - border,
            self.bottom - border,
        )
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.left, self.top, self.right, self.bottom)
    }
}
