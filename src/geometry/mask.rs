//! Вычитание прямоугольников: область монитора минус защищённые окна.
//!
//! Каждое покрытие вырезается по очереди из всех накопленных фрагментов.
//! Разбиение на четыре полосы (левая, верхняя, правая, нижняя) даёт
//! непересекающиеся фрагменты, которые вместе с покрытием точно
//! восстанавливают исходную область.

use super::Rectangle;
use smallvec::{smallvec, SmallVec};

/// Не больше четырёх фрагментов на один разрез
pub type Fragments = SmallVec<[Rectangle; 4]>;

/// Вырезать `cover` из `source`
pub fn cut(source: &Rectangle, cover: &Rectangle) -> Fragments {
    if !source.intersects(cover) {
        return smallvec![*source];
    }

    let mut fragments = Fragments::new();
    if source.left < cover.left {
        fragments.push(Rectangle::new(
            source.left,
            source.top,
            cover.left,
            source.bottom.min(cover.bottom),
        ));
    }
    if source.top < cover.top {
        fragments.push(Rectangle::new(
            source.left.max(cover.left),
            source.top,
            source.right,
            cover.top,
        ));
    }
    if source.right > cover.right {
        fragments.push(Rectangle::new(
            cover.right,
            source.top.max(cover.top),
            source.right,
            source.bottom,
        ));
    }
    if source.bottom > cover.bottom {
        fragments.push(Rectangle::new(
            source.left,
            cover.bottom,
            source.right.min(cover.right),
            source.bottom,
        ));
    }
    fragments
}

/// Остаток `screen` после вырезания всех `covers` по порядку
pub fn cut_all(screen: &Rectangle, covers: &[Rectangle]) -> Vec<Rectangle> {
    let mut output = vec![*screen];
    for cover in covers {
        output = output
            .iter()
            .flat_map(|fragment| cut(fragment, cover))
            .collect();
    }
    output
}
