// Entity Models - Questions and Categories
//
// Each entity has:
// - Stable integer identity assigned by the store
// - Plain serde values that travel unchanged from SQLite to JSON

pub mod category;
pub mod question;

pub use category::{default_categories, Category};
pub use question::{
    NewQuestion, Question, QuestionPatch, ValidationError, MAX_DIFFICULTY, MIN_DIFFICULTY,
};
