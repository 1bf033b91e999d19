// Trivia API - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod pagination;
pub mod quiz;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{
    count_questions, import_questions, load_csv, seed_default_categories, setup_database,
    SqliteStore,
};
pub use entities::{
    default_categories, Category, NewQuestion, Question, QuestionPatch, ValidationError,
};
pub use pagination::{paginate, paginate_questions, PaginationError, QUESTIONS_PER_PAGE};
pub use quiz::{resolve_candidates, select_next, select_next_with, CategoryFilter, QuizDraw};
pub use store::{MemoryStore, QuestionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
