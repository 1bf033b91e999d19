use crate::entities::{
    default_categories, Category, NewQuestion, Question, QuestionPatch, ValidationError,
};
use crate::store::QuestionStore;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const QUESTION_COLUMNS: &str = "id, question, answer, category, difficulty";

/// SQL functions the queries below rely on; registered per connection
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    register_functions(conn)?;

    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            category INTEGER NOT NULL REFERENCES categories(id),
            difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category)",
        [],
    )?;

    Ok(())
}

/// Insert the default categories into an empty table
///
/// Returns the number of categories inserted (0 when already seeded).
pub fn seed_default_categories(conn: &Connection) -> Result<usize> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if existing > 0 {
        debug!("categories already seeded ({} rows)", existing);
        return Ok(0);
    }

    let categories = default_categories();
    for category in &categories {
        insert_category(conn, category)?;
    }

    info!("seeded {} default categories", categories.len());
    Ok(categories.len())
}

pub fn insert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (id, type) VALUES (?1, ?2)",
        params![category.id, category.category_type],
    )
    .with_context(|| format!("Failed to insert category {}", category.id))?;
    Ok(())
}

pub fn get_all_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, type FROM categories ORDER BY id")?;

    let categories = stmt
        .query_map([], |row| Ok(Category::new(row.get(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories)
}

pub fn get_category(conn: &Connection, category_id: i64) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, type FROM categories WHERE id = ?1",
            [category_id],
            |row| Ok(Category::new(row.get(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    Ok(category)
}

fn row_to_question(row: &Row) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        category: row.get(3)?,
        difficulty: row.get(4)?,
    })
}

pub fn get_all_questions(conn: &Connection) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions ORDER BY id",
        QUESTION_COLUMNS
    ))?;

    let questions = stmt
        .query_map([], row_to_question)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(questions)
}

pub fn get_questions_by_category(conn: &Connection, category_id: i64) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions WHERE category = ?1 ORDER BY id",
        QUESTION_COLUMNS
    ))?;

    let questions = stmt
        .query_map([category_id], row_to_question)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(questions)
}

pub fn get_question(conn: &Connection, question_id: i64) -> Result<Option<Question>> {
    let question = conn
        .query_row(
            &format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS),
            [question_id],
            row_to_question,
        )
        .optional()?;

    Ok(question)
}

/// Case-insensitive substring search on question text
///
/// Folds case with `unicode_lower` so accented letters match like ASCII ones.
pub fn search_questions(conn: &Connection, term: &str) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions WHERE instr(unicode_lower(question), ?1) > 0 ORDER BY id",
        QUESTION_COLUMNS
    ))?;

    let questions = stmt
        .query_map([term.to_lowercase()], row_to_question)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(questions)
}

fn ensure_category(conn: &Connection, category_id: i64) -> Result<()> {
    if get_category(conn, category_id)?.is_none() {
        return Err(ValidationError::UnknownCategory(category_id).into());
    }
    Ok(())
}

pub fn insert_question(conn: &Connection, question: &NewQuestion) -> Result<Question> {
    question.validate()?;
    ensure_category(conn, question.category)?;

    conn.execute(
        "INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)",
        params![
            question.question,
            question.answer,
            question.category,
            question.difficulty,
        ],
    )?;

    Ok(question.clone().with_id(conn.last_insert_rowid()))
}

pub fn update_question(
    conn: &Connection,
    question_id: i64,
    patch: &QuestionPatch,
) -> Result<Option<Question>> {
    let Some(existing) = get_question(conn, question_id)? else {
        return Ok(None);
    };

    let updated = existing.patched(patch)?;
    if updated.category != existing.category {
        ensure_category(conn, updated.category)?;
    }

    conn.execute(
        "UPDATE questions
         SET question = ?1, answer = ?2, category = ?3, difficulty = ?4
         WHERE id = ?5",
        params![
            updated.question,
            updated.answer,
            updated.category,
            updated.difficulty,
            question_id,
        ],
    )?;

    Ok(Some(updated))
}

pub fn delete_question(conn: &Connection, question_id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM questions WHERE id = ?1", [question_id])?;
    Ok(deleted > 0)
}

pub fn count_questions(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// Read questions from a CSV file with header `question,answer,category,difficulty`
pub fn load_csv(csv_path: &Path) -> Result<Vec<NewQuestion>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut questions = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let question: NewQuestion =
            result.with_context(|| format!("Failed to deserialize question on row {}", line + 1))?;
        questions.push(question);
    }

    Ok(questions)
}

/// Insert imported questions, skipping rows that fail validation
///
/// Runs in one transaction: a database error leaves nothing imported.
pub fn import_questions(conn: &Connection, questions: &[NewQuestion]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    let mut skipped = 0;

    for question in questions {
        match insert_question(&tx, question) {
            Ok(_) => inserted += 1,
            Err(e) => match e.downcast_ref::<ValidationError>() {
                Some(reason) => {
                    warn!("skipping question {:?}: {}", question.question, reason);
                    skipped += 1;
                }
                None => return Err(e),
            },
        }
    }

    tx.commit()?;
    info!("imported {} questions, skipped {}", inserted, skipped);

    Ok(inserted)
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// `QuestionStore` over a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap a connection, creating the schema if needed
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn seed_default_categories(&self) -> Result<usize> {
        seed_default_categories(&*self.conn()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }
}

impl QuestionStore for SqliteStore {
    fn fetch_all(&self) -> Result<Vec<Question>> {
        get_all_questions(&*self.conn()?)
    }

    fn fetch_by_category(&self, category_id: i64) -> Result<Vec<Question>> {
        get_questions_by_category(&*self.conn()?, category_id)
    }

    fn fetch_all_categories(&self) -> Result<Vec<Category>> {
        get_all_categories(&*self.conn()?)
    }

    fn get_category(&self, category_id: i64) -> Result<Option<Category>> {
        get_category(&*self.conn()?, category_id)
    }

    fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        get_question(&*self.conn()?, question_id)
    }

    fn search_questions(&self, term: &str) -> Result<Vec<Question>> {
        search_questions(&*self.conn()?, term)
    }

    fn insert_question(&self, question: NewQuestion) -> Result<Question> {
        insert_question(&*self.conn()?, &question)
    }

    fn update_question(&self, question_id: i64, patch: &QuestionPatch) -> Result<Option<Question>> {
        update_question(&*self.conn()?, question_id, patch)
    }

    fn delete_question(&self, question_id: i64) -> Result<bool> {
        delete_question(&*self.conn()?, question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        seed_default_categories(&conn).unwrap();
        conn
    }

    fn new_question(text: &str, category: i64, difficulty: i64) -> NewQuestion {
        NewQuestion {
            question: text.to_string(),
            answer: "answer".to_string(),
            category,
            difficulty,
        }
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = test_connection();

        assert_eq!(seed_default_categories(&conn).unwrap(), 0);
        assert_eq!(get_all_categories(&conn).unwrap(), default_categories());
        assert_eq!(
            get_category(&conn, 5).unwrap(),
            Some(Category::new(5, "Entertainment"))
        );
        assert_eq!(get_category(&conn, 50).unwrap(), None);
    }

    #[test]
    fn test_question_crud() {
        let conn = test_connection();

        let stored = insert_question(&conn, &new_question("Whose autobiography is 'I Know Why the Caged Bird Sings'?", 4, 2)).unwrap();
        assert_eq!(get_question(&conn, stored.id).unwrap(), Some(stored.clone()));

        let patch = QuestionPatch {
            answer: Some("Maya Angelou".to_string()),
            category: Some(5),
            ..Default::default()
        };
        let updated = update_question(&conn, stored.id, &patch).unwrap().unwrap();
        assert_eq!(updated.answer, "Maya Angelou");
        assert_eq!(get_questions_by_category(&conn, 5).unwrap(), vec![updated]);
        assert!(get_questions_by_category(&conn, 4).unwrap().is_empty());

        assert!(delete_question(&conn, stored.id).unwrap());
        assert!(!delete_question(&conn, stored.id).unwrap());
        assert_eq!(update_question(&conn, stored.id, &patch).unwrap(), None);
        assert_eq!(count_questions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_rejects_invalid_question() {
        let conn = test_connection();

        let err = insert_question(&conn, &new_question("Orphan?", 77, 1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::UnknownCategory(77))
        );

        let err = insert_question(&conn, &new_question("Too hard?", 1, 9)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::DifficultyOutOfRange(9))
        );

        assert_eq!(count_questions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_search_is_case_insensitive_and_literal() {
        let conn = test_connection();
        insert_question(&conn, &new_question("What is the TITLE of the 1990 film?", 5, 3)).unwrap();
        insert_question(&conn, &new_question("Which country won 100% of its matches?", 6, 3)).unwrap();
        insert_question(&conn, &new_question("Name the largest lake", 3, 2)).unwrap();

        assert_eq!(search_questions(&conn, "title").unwrap().len(), 1);
        assert_eq!(search_questions(&conn, "100%").unwrap().len(), 1);
        assert!(search_questions(&conn, "%%").unwrap().is_empty());
        assert_eq!(search_questions(&conn, "").unwrap().len(), 3);
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let conn = test_connection();
        let stored = insert_question(&conn, &new_question("Who founded the École Polytechnique?", 4, 3)).unwrap();
        insert_question(&conn, &new_question("Who founded Rome?", 4, 1)).unwrap();

        assert_eq!(search_questions(&conn, "école").unwrap(), vec![stored.clone()]);
        assert_eq!(search_questions(&conn, "ÉCOLE POLY").unwrap(), vec![stored]);
    }

    #[test]
    fn test_import_rolls_back_on_database_error() {
        let conn = test_connection();
        conn.execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON questions
             WHEN NEW.question = 'boom?'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let questions = vec![
            new_question("Imported before the failure?", 1, 1),
            new_question("boom?", 1, 1),
            new_question("Imported after the failure?", 1, 1),
        ];

        assert!(import_questions(&conn, &questions).is_err());
        assert_eq!(count_questions(&conn).unwrap(), 0);

        assert_eq!(import_questions(&conn, &questions[..1]).unwrap(), 1);
        assert_eq!(count_questions(&conn).unwrap(), 1);
    }

    #[test]
    fn test_import_csv_skips_invalid_rows() {
        let path = std::env::temp_dir().join(format!("trivia-import-{}.csv", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "question,answer,category,difficulty").unwrap();
            writeln!(file, "What is the capital of Peru?,Lima,3,2").unwrap();
            writeln!(file, "\"Who painted 'Guernica'?\",Picasso,2,3").unwrap();
            writeln!(file, "Unknown category?,Nothing,42,1").unwrap();
        }

        let questions = load_csv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(questions.len(), 3);

        let conn = test_connection();
        assert_eq!(import_questions(&conn, &questions).unwrap(), 2);
        assert_eq!(count_questions(&conn).unwrap(), 2);
    }

    #[test]
    fn test_sqlite_store_implements_question_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.seed_default_categories().unwrap(), 6);

        let stored = store.insert_question(new_question("Hematology studies what?", 1, 4)).unwrap();

        assert_eq!(store.fetch_all().unwrap(), vec![stored.clone()]);
        assert_eq!(store.fetch_by_category(1).unwrap(), vec![stored.clone()]);
        assert_eq!(store.fetch_all_categories().unwrap().len(), 6);
        assert_eq!(store.search_questions("hematology").unwrap(), vec![stored]);

        let patch = QuestionPatch {
            category: Some(99),
            ..Default::default()
        };
        assert_eq!(store.update_question(12345, &patch).unwrap(), None);
    }
}
