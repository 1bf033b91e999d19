// 🗃️ Question Store - the persistence seam
//
// Handlers and the quiz engine only see `QuestionStore`; the concrete backend
// (SQLite in production, memory in tests) is injected at startup.

use crate::entities::{Category, NewQuestion, Question, QuestionPatch, ValidationError};
use anyhow::{anyhow, Result};
use std::sync::{Arc, RwLock};

/// Read/write access to questions and categories
///
/// Listing methods return questions ordered by id.
pub trait QuestionStore: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<Question>>;

    fn fetch_by_category(&self, category_id: i64) -> Result<Vec<Question>>;

    fn fetch_all_categories(&self) -> Result<Vec<Category>>;

    fn get_category(&self, category_id: i64) -> Result<Option<Category>>;

    fn get_question(&self, question_id: i64) -> Result<Option<Question>>;

    /// Case-insensitive substring search on question text
    fn search_questions(&self, term: &str) -> Result<Vec<Question>>;

    /// Insert and return the stored question with its new id
    ///
    /// Fails with a `ValidationError` for invalid fields or an unknown category.
    fn insert_question(&self, question: NewQuestion) -> Result<Question>;

    /// `Ok(None)` when no question has this id
    fn update_question(&self, question_id: i64, patch: &QuestionPatch) -> Result<Option<Question>>;

    /// `Ok(false)` when no question has this id
    fn delete_question(&self, question_id: i64) -> Result<bool>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

struct MemoryData {
    categories: Vec<Category>,
    questions: Vec<Question>,
    next_id: i64,
}

/// In-memory store, kept sorted by id
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut categories = categories;
        categories.sort_by_key(|c| c.id);

        MemoryStore {
            data: Arc::new(RwLock::new(MemoryData {
                categories,
                questions: Vec::new(),
                next_id: 1,
            })),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryData) -> T) -> Result<T> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(f(&data))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryData) -> Result<T>) -> Result<T> {
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        f(&mut data)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(Vec::new())
    }
}

impl MemoryData {
    fn has_category(&self, category_id: i64) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }
}

impl QuestionStore for MemoryStore {
    fn fetch_all(&self) -> Result<Vec<Question>> {
        self.read(|data| data.questions.clone())
    }

    fn fetch_by_category(&self, category_id: i64) -> Result<Vec<Question>> {
        self.read(|data| {
            data.questions
                .iter()
                .filter(|q| q.category == category_id)
                .cloned()
                .collect()
        })
    }

    fn fetch_all_categories(&self) -> Result<Vec<Category>> {
        self.read(|data| data.categories.clone())
    }

    fn get_category(&self, category_id: i64) -> Result<Option<Category>> {
        self.read(|data| {
            data.categories
                .iter()
                .find(|c| c.id == category_id)
                .cloned()
        })
    }

    fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        self.read(|data| {
            data.questions
                .iter()
                .find(|q| q.id == question_id)
                .cloned()
        })
    }

    fn search_questions(&self, term: &str) -> Result<Vec<Question>> {
        self.read(|data| {
            data.questions
                .iter()
                .filter(|q| q.matches(term))
                .cloned()
                .collect()
        })
    }

    fn insert_question(&self, question: NewQuestion) -> Result<Question> {
        question.validate()?;

        self.write(|data| {
            if !data.has_category(question.category) {
                return Err(ValidationError::UnknownCategory(question.category).into());
            }

            let stored = question.with_id(data.next_id);
            data.next_id += 1;
            data.questions.push(stored.clone());
            Ok(stored)
        })
    }

    fn update_question(&self, question_id: i64, patch: &QuestionPatch) -> Result<Option<Question>> {
        self.write(|data| {
            let Some(index) = data.questions.iter().position(|q| q.id == question_id) else {
                return Ok(None);
            };

            let updated = data.questions[index].patched(patch)?;
            if !data.has_category(updated.category) {
                return Err(ValidationError::UnknownCategory(updated.category).into());
            }

            data.questions[index] = updated.clone();
            Ok(Some(updated))
        })
    }

    fn delete_question(&self, question_id: i64) -> Result<bool> {
        self.write(|data| {
            let before = data.questions.len();
            data.questions.retain(|q| q.id != question_id);
            Ok(data.questions.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::default_categories;

    fn new_question(text: &str, category: i64) -> NewQuestion {
        NewQuestion {
            question: text.to_string(),
            answer: "answer".to_string(),
            category,
            difficulty: 3,
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new(default_categories());

        let first = store.insert_question(new_question("First?", 1)).unwrap();
        let second = store.insert_question(new_question("Second?", 2)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.fetch_all().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_insert_rejects_unknown_category() {
        let store = MemoryStore::new(default_categories());

        let err = store.insert_question(new_question("Orphan?", 99)).unwrap_err();

        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::UnknownCategory(99))
        );
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_question_ignores_patch_category() {
        let store = MemoryStore::new(default_categories());
        let stored = store.insert_question(new_question("Which planet is red?", 1)).unwrap();
        let patch = QuestionPatch {
            category: Some(99),
            ..Default::default()
        };

        assert_eq!(store.update_question(12345, &patch).unwrap(), None);

        let err = store.update_question(stored.id, &patch).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::UnknownCategory(99))
        );
        assert_eq!(store.get_question(stored.id).unwrap(), Some(stored));
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let store = MemoryStore::new(default_categories());
        let stored = store
            .insert_question(new_question("Who founded the École Polytechnique?", 4))
            .unwrap();

        assert_eq!(store.search_questions("école").unwrap(), vec![stored]);
    }

    #[test]
    fn test_filter_search_update_delete() {
        let store = MemoryStore::new(default_categories());
        let a = store.insert_question(new_question("Which planet is red?", 1)).unwrap();
        let b = store.insert_question(new_question("Who wrote Hamlet?", 4)).unwrap();

        assert_eq!(store.fetch_by_category(4).unwrap(), vec![b.clone()]);
        assert_eq!(store.search_questions("PLANET").unwrap(), vec![a.clone()]);

        let patch = QuestionPatch {
            answer: Some("Mars".to_string()),
            ..Default::default()
        };
        let updated = store.update_question(a.id, &patch).unwrap().unwrap();
        assert_eq!(updated.answer, "Mars");
        assert_eq!(store.update_question(42, &patch).unwrap(), None);

        assert!(store.delete_question(b.id).unwrap());
        assert!(!store.delete_question(b.id).unwrap());
        assert_eq!(store.get_question(b.id).unwrap(), None);
        assert_eq!(store.get_category(4).unwrap(), Some(Category::new(4, "History")));
    }
}
