use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{Store, StoreIndex};
use crate::error::StoreError;
use crate::model::{Course, Professor, ProfessorKey, Quarter, FIRST_YEAR, LAST_YEAR, QUARTERS};

/// Local store with the same tables and uniqueness rules as the hosted one.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        seed_terms(&conn)?;
        Ok(SqliteStore { conn })
    }

    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> &Connection {
        &self.conn
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS courses (
            id                 INTEGER PRIMARY KEY,
            course_title       TEXT UNIQUE NOT NULL,
            course_major       TEXT NOT NULL,
            course_number      INTEGER NOT NULL,
            course_description TEXT
        );

        CREATE TABLE IF NOT EXISTS professors (
            id             INTEGER PRIMARY KEY,
            first_name     TEXT NOT NULL,
            last_name      TEXT NOT NULL,
            middle_initial TEXT,
            UNIQUE(first_name, last_name)
        );

        CREATE TABLE IF NOT EXISTS years (
            id   INTEGER PRIMARY KEY,
            year INTEGER UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS quarters (
            id      INTEGER PRIMARY KEY,
            quarter TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS courses_professors (
            course_id    INTEGER NOT NULL REFERENCES courses(id),
            professor_id INTEGER NOT NULL REFERENCES professors(id),
            PRIMARY KEY (course_id, professor_id)
        );
        CREATE INDEX IF NOT EXISTS idx_cp_professor ON courses_professors(professor_id);

        CREATE TABLE IF NOT EXISTS courses_times (
            course_id  INTEGER NOT NULL REFERENCES courses(id),
            quarter_id INTEGER NOT NULL REFERENCES quarters(id),
            year_id    INTEGER NOT NULL REFERENCES years(id),
            PRIMARY KEY (course_id, quarter_id, year_id)
        );
        ",
    )?;
    Ok(())
}

fn seed_terms(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut year_stmt = tx.prepare("INSERT OR IGNORE INTO years (year) VALUES (?1)")?;
        for year in FIRST_YEAR..=LAST_YEAR {
            year_stmt.execute([year])?;
        }
        let mut quarter_stmt =
            tx.prepare("INSERT OR IGNORE INTO quarters (quarter) VALUES (?1)")?;
        for q in QUARTERS {
            quarter_stmt.execute([q.code()])?;
        }
    }
    tx.commit()?;
    Ok(())
}

impl Store for SqliteStore {
    async fn has_courses(&self) -> Result<bool, StoreError> {
        let any: bool = self
            .conn
            .query_row("SELECT EXISTS (SELECT 1 FROM courses)", [], |r| r.get(0))?;
        Ok(any)
    }

    async fn count(&self, table: &str) -> Result<usize, StoreError> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(n)
    }

    async fn load_index(&self) -> Result<StoreIndex, StoreError> {
        let mut index = StoreIndex::default();

        let mut stmt = self.conn.prepare("SELECT id, course_title FROM courses")?;
        for row in stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))? {
            let (id, title) = row?;
            index.courses.insert(title, id);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, first_name, last_name FROM professors")?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?;
        for row in rows {
            let (id, first_name, last_name) = row?;
            index.professors.insert(ProfessorKey { first_name, last_name }, id);
        }

        let mut stmt = self.conn.prepare("SELECT id, year FROM years")?;
        for row in stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i32>(1)?)))? {
            let (id, year) = row?;
            index.years.insert(year, id);
        }

        let mut stmt = self.conn.prepare("SELECT id, quarter FROM quarters")?;
        for row in stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))? {
            let (id, code) = row?;
            if let Ok(q) = code.parse::<Quarter>() {
                index.quarters.insert(q, id);
            }
        }

        Ok(index)
    }

    async fn insert_course(&self, course: &Course) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO courses (course_title, course_major, course_number, course_description)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![course.name, course.department, course.number, course.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn insert_professor(&self, professor: &Professor) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO professors (first_name, last_name, middle_initial) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                professor.first_name,
                professor.last_name,
                professor.middle_name.map(String::from),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn link_course_professor(
        &self,
        course_id: i64,
        professor_id: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO courses_professors (course_id, professor_id) VALUES (?1, ?2)",
            rusqlite::params![course_id, professor_id],
        )?;
        Ok(())
    }

    async fn link_course_time(
        &self,
        course_id: i64,
        quarter_id: i64,
        year_id: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO courses_times (course_id, quarter_id, year_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![course_id, quarter_id, year_id],
        )?;
        Ok(())
    }
}
