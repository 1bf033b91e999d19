// 🏷️ Category Entity - Read-only labels that questions are filed under

use serde::{Deserialize, Serialize};

/// Category of trivia questions
///
/// Serialized as `{"id": 1, "type": "Science"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,

    /// Human-readable label (e.g. "Science", "Art")
    #[serde(rename = "type")]
    pub category_type: String,
}

impl Category {
    pub fn new(id: i64, category_type: impl Into<String>) -> Self {
        Category {
            id,
            category_type: category_type.into(),
        }
    }
}

/// Categories seeded into a fresh database
pub fn default_categories() -> Vec<Category> {
    ["Science", "Art", "Geography", "History", "Entertainment", "Sports"]
        .iter()
        .enumerate()
        .map(|(i, label)| Category::new(i as i64 + 1, *label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_type_label() {
        let category = Category::new(3, "Geography");
        let json = serde_json::to_value(&category).unwrap();

        assert_eq!(json, serde_json::json!({"id": 3, "type": "Geography"}));
    }

    #[test]
    fn test_default_categories() {
        let categories = default_categories();

        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0], Category::new(1, "Science"));
        assert_eq!(categories[5], Category::new(6, "Sports"));
    }
}
