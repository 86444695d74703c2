pub mod postgrest;
pub mod sqlite;

use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::{Course, Professor, ProfessorKey, Quarter};

pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;

/// Every table the loader writes, in dependency order.
pub const TABLES: [&str; 6] = [
    "courses",
    "professors",
    "years",
    "quarters",
    "courses_professors",
    "courses_times",
];

/// Natural key → id for every lookup table the loader consults.
#[derive(Debug, Default)]
pub struct StoreIndex {
    pub courses: HashMap<String, i64>,
    pub professors: HashMap<ProfessorKey, i64>,
    pub years: HashMap<i32, i64>,
    pub quarters: HashMap<Quarter, i64>,
}

/// Relational store holding courses, professors and their offerings.
///
/// Inserts that would duplicate a unique column fail with
/// [`StoreError::UniqueViolation`]; callers decide whether that matters.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn has_courses(&self) -> Result<bool, StoreError>;

    /// Exact number of rows in `table`.
    async fn count(&self, table: &str) -> Result<usize, StoreError>;

    async fn load_index(&self) -> Result<StoreIndex, StoreError>;

    async fn insert_course(&self, course: &Course) -> Result<i64, StoreError>;

    async fn insert_professor(&self, professor: &Professor) -> Result<i64, StoreError>;

    async fn link_course_professor(
        &self,
        course_id: i64,
        professor_id: i64,
    ) -> Result<(), StoreError>;

    async fn link_course_time(
        &self,
        course_id: i64,
        quarter_id: i64,
        year_id: i64,
    ) -> Result<(), StoreError>;
}
