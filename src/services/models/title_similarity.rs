use super::{OrderChange, ScoreMap, ScoringModel};
use crate::events::{WindowEvent, WindowId};
use crate::services::window_source::WindowSource;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
        "or", "the", "to", "with", "www", "http", "https", "com",
    ]
    .into_iter()
    .collect()
});

/// Токены заголовка: нижний регистр, без разделителей, коротких и стоп-слов
pub fn prepare_title(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(token.as_str()))
        .collect()
}

fn tfidf_vectors(documents: &[&[String]]) -> Vec<HashMap<String, f64>> {
    let count = documents.len() as f64;
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for document in documents {
        let unique: HashSet<&str> = document.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_default() += 1;
        }
    }

    documents
        .iter()
        .map(|document| {
            let mut vector: HashMap<String, f64> = HashMap::new();
            if document.is_empty() {
                return vector;
            }
            let length = document.len() as f64;
            for term in document.iter() {
                *vector.entry(term.clone()).or_default() += 1.0 / length;
            }
            for (term, weight) in vector.iter_mut() {
                let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
                *weight *= ((1.0 + count) / (1.0 + df)).ln() + 1.0;
            }
            vector
        })
        .collect()
}

fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|y| y * y).sum::<f64>().sqrt();
    dot / (norm_a * norm_b)
}

/// Windows whose titles resemble the focused window's title score higher.
///
/// Each other window is scored by the TF-IDF cosine similarity of its title
/// with the focused title; windows with nothing in common are left out.
pub struct TitleSimilarity {
    source: Arc<dyn WindowSource>,
    number_of_windows: usize,
    titles: BTreeMap<WindowId, Vec<String>>,
    current: Option<WindowId>,
    scores: ScoreMap,
    top_windows: Vec<WindowId>,
}

impl TitleSimilarity {
    pub const NAME: &'static str = "title_similarity";

    pub fn new(number_of_windows: usize, source: Arc<dyn WindowSource>) -> Self {
        Self {
            source,
            number_of_windows,
            titles: BTreeMap::new(),
            current: None,
            scores: ScoreMap::new(),
            top_windows: Vec::new(),
        }
    }

    fn set_title(&mut self, id: WindowId, title: &str) -> bool {
        let prepared = prepare_title(title);
        if self.titles.get(&id) == Some(&prepared) {
            return false;
        }
        if prepared.is_empty() {
            self.titles.remove(&id).is_some()
        } else {
            self.titles.insert(id, prepared);
            true
        }
    }

    fn calculate_scores(&self) -> ScoreMap {
        let Some(current_title) = self.current.and_then(|id| self.titles.get(&id)) else {
            return ScoreMap::new();
        };

        let others: Vec<(&WindowId, &Vec<String>)> = self
            .titles
            .iter()
            .filter(|(id, _)| Some(**id) != self.current)
            .collect();
        let empty: Vec<String> = Vec::new();
        let mut documents: Vec<&[String]> = others.iter().map(|(_, title)| title.as_slice()).collect();
        documents.push(&empty);
        documents.push(current_title);

        let vectors = tfidf_vectors(&documents);
        let Some(current_vector) = vectors.last() else {
            return ScoreMap::new();
        };

        others
            .iter()
            .zip(vectors.iter())
            .map(|((id, _), vector)| (**id, cosine_similarity(vector, current_vector)))
            .filter(|(_, similarity)| *similarity > 0.0)
            .collect()
    }

    fn recalculate(&mut self) -> OrderChange {
        self.scores = self.calculate_scores();
        let top = self.scores.top(self.number_of_windows);
        if top == self.top_windows {
            return OrderChange::Unchanged;
        }
        self.top_windows = top;
        OrderChange::Changed
    }
}

impl ScoringModel for TitleSimilarity {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_windows(&mut self, windows: &[WindowId]) {
        let Some(&first) = windows.first() else {
            return;
        };
        self.current = Some(first);
        self.titles = windows
            .iter()
            .filter_map(|id| {
                let prepared = prepare_title(&self.source.title(*id).unwrap_or_default());
                (!prepared.is_empty()).then_some((*id, prepared))
            })
            .collect();
        self.scores = self.calculate_scores();
        self.top_windows = self.scores.top(self.number_of_windows);
    }

    fn scores(&self) -> ScoreMap {
        self.scores.clone()
    }

    fn handle_event(&mut self, event: &WindowEvent) -> OrderChange {
        match event {
            WindowEvent::Opened(record) => {
                self.current = Some(record.id);
                self.set_title(record.id, &record.title);
                self.recalculate()
            }
            WindowEvent::Focused(record) => {
                // Восстановленное окно возвращается со своим заголовком
                self.current = Some(record.id);
                self.set_title(record.id, &record.title);
                self.recalculate()
            }
            WindowEvent::Renamed(record) => {
                if self.set_title(record.id, &record.title) {
                    self.recalculate()
                } else {
                    OrderChange::Unchanged
                }
            }
            WindowEvent::ClosedOrMinimized(record) => {
                if self.titles.remove(&record.id).is_some() {
                    self.recalculate()
                } else {
                    OrderChange::Unchanged
                }
            }
            _ => OrderChange::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowRecord;
    use crate::geometry::Rectangle;
    use crate::services::window_source::DryRunSource;

    const R: Rectangle = Rectangle::new(0, 0, 10, 10);

    fn record(id: u64, title: &str) -> WindowRecord {
        WindowRecord::new(WindowId::new(id), title.to_string(), String::new())
    }

    fn model() -> TitleSimilarity {
        let source = Arc::new(
            DryRunSource::new(vec![R])
                .with_window(1, "The Rust Book - Chapter 4", "firefox", R)
                .with_window(2, "std::vec - Rust docs", "firefox", R)
                .with_window(3, "Cooking recipes: pasta", "firefox", R),
        );
        let mut model = TitleSimilarity::new(3, source.clone());
        model.set_windows(&source.open_windows());
        model
    }

    #[test]
    fn test_prepare_title_drops_noise() {
        assert_eq!(
            prepare_title("The Rust Book - Chapter 4 | x"),
            vec!["rust", "book", "chapter"]
        );
        assert!(prepare_title(" - | ").is_empty());
    }

    #[test]
    fn test_similar_titles_score_and_unrelated_are_omitted() {
        let model = model();
        let scores = model.scores();

        assert!(scores.get(WindowId::new(2)).is_some_and(|s| s > 0.0 && s <= 1.0));
        assert_eq!(scores.get(WindowId::new(3)), None);
        // Сфокусированное окно себя не оценивает
        assert_eq!(scores.get(WindowId::new(1)), None);
    }

    #[test]
    fn test_order_change_only_when_top_changes() {
        let mut model = model();

        // Фокус на рецептах: похожих окон нет, top меняется
        assert_eq!(
            model.handle_event(&WindowEvent::Focused(record(3, "Cooking recipes: pasta"))),
            OrderChange::Changed
        );
        assert!(model.scores().is_empty());

        // Повторный фокус ничего не меняет
        assert_eq!(
            model.handle_event(&WindowEvent::Focused(record(3, "Cooking recipes: pasta"))),
            OrderChange::Unchanged
        );

        // Переименование в похожий заголовок добавляет окно в top
        assert_eq!(
            model.handle_event(&WindowEvent::Renamed(record(1, "Pasta recipes - Rust cooking"))),
            OrderChange::Changed
        );
        assert!(model.scores().contains(WindowId::new(1)));

        // Тот же заголовок повторно - без изменений
        assert_eq!(
            model.handle_event(&WindowEvent::Renamed(record(1, "Pasta recipes - Rust cooking"))),
            OrderChange::Unchanged
        );
    }

    #[test]
    fn test_closed_window_is_forgotten() {
        let mut model = model();
        assert_eq!(
            model.handle_event(&WindowEvent::ClosedOrMinimized(record(2, ""))),
            OrderChange::Changed
        );
        assert!(model.scores().is_empty());

        // Повторное закрытие ничего не пересчитывает
        assert_eq!(
            model.handle_event(&WindowEvent::ClosedOrMinimized(record(2, ""))),
            OrderChange::Unchanged
        );
    }

    #[test]
    fn test_minimized_window_returns_on_focus() {
        let mut model = model();
        model.handle_event(&WindowEvent::ClosedOrMinimized(record(2, "std::vec - Rust docs")));
        assert_eq!(model.scores().get(WindowId::new(2)), None);

        // Восстановленное окно само становится текущим и оценивает остальные
        assert_eq!(
            model.handle_event(&WindowEvent::Focused(record(2, "std::vec - Rust docs"))),
            OrderChange::Changed
        );
        assert!(model.scores().contains(WindowId::new(1)));
        assert_eq!(model.scores().get(WindowId::new(3)), None);

        // Фокус обратно на книгу: docs снова в top
        model.handle_event(&WindowEvent::Focused(record(1, "The Rust Book - Chapter 4")));
        assert!(model.scores().contains(WindowId::new(2)));
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a: HashMap<String, f64> = [("rust".to_string(), 1.0)].into_iter().collect();
        let b: HashMap<String, f64> = [("pasta".to_string(), 1.0)].into_iter().collect();
        assert_eq!(cosine_similarity(&a, &a), 1.0);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
