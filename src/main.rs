use anyhow::{bail, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

use trivia_api::db::{get_all_categories, get_questions_by_category};
use trivia_api::{count_questions, import_questions, load_csv, seed_default_categories, setup_database, Config};

const USAGE: &str = "usage: trivia <init | import <questions.csv> | stats>";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(&config.database_path),
        Some("import") => match args.get(2) {
            Some(csv_path) => run_import(&config.database_path, Path::new(csv_path)),
            None => bail!(USAGE),
        },
        Some("stats") | None => run_stats(&config.database_path),
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_init(db_path: &Path) -> Result<()> {
    println!("🔧 Setting up database at {}", db_path.display());

    let conn = open_database(db_path)?;
    let seeded = seed_default_categories(&conn)?;

    println!("✓ Database initialized with WAL mode");
    println!("✓ Seeded {} categories", seeded);

    Ok(())
}

fn run_import(db_path: &Path, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {}...", csv_path.display());
    let questions = load_csv(csv_path)?;
    println!("✓ Loaded {} questions from CSV", questions.len());

    let conn = open_database(db_path)?;
    seed_default_categories(&conn)?;

    let inserted = import_questions(&conn, &questions)?;
    let count = count_questions(&conn)?;

    println!("✓ Inserted: {} questions", inserted);
    println!("✓ Skipped: {} questions", questions.len() - inserted);
    println!("✓ Database contains {} questions", count);

    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        bail!("database not found at {}; run `trivia init` first", db_path.display());
    }

    let conn = open_database(db_path)?;

    println!("📊 {} questions", count_questions(&conn)?);
    for category in get_all_categories(&conn)? {
        let in_category = get_questions_by_category(&conn, category.id)?.len();
        println!("   {:>2} {:<15} {}", category.id, category.category_type, in_category);
    }

    Ok(())
}
