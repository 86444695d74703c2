use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::{CourseSet, Professor};
use crate::store::{Store, StoreIndex};

/// Counts returned after a load run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub gate_skipped: bool,
    pub courses_inserted: usize,
    pub professors_inserted: usize,
    pub course_professor_links: usize,
    pub course_time_links: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
}

impl LoadReport {
    pub fn print(&self) {
        if self.gate_skipped {
            println!("Courses already in database; catalog insert skipped.");
        }
        println!(
            "Inserted {} courses, {} professors, {} course-professor links, {} course-term links ({} duplicates skipped, {} professors not in catalog).",
            self.courses_inserted,
            self.professors_inserted,
            self.course_professor_links,
            self.course_time_links,
            self.duplicates,
            self.filtered_out,
        );
    }
}

/// Turn a uniqueness violation into `None`; every other error is returned.
fn skip_duplicate<T>(
    result: Result<T, StoreError>,
    report: &mut LoadReport,
    what: &str,
) -> Result<Option<T>, StoreError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_unique_violation() => {
            debug!("Duplicate {} skipped: {}", what, e);
            report.duplicates += 1;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Professors whose (normalized) course is offered in the current catalog.
pub fn current_professors<'a>(professors: &'a [Professor], catalog: &CourseSet) -> Vec<&'a Professor> {
    professors
        .iter()
        .filter(|p| catalog.contains(&p.course))
        .collect()
}

/// Insert catalog courses, then professors and their offerings.
///
/// The catalog insert is all-or-nothing on the `courses` table being empty.
/// Professor rows are reconciled against an index preloaded from the store.
pub async fn load<S: Store>(
    store: &S,
    catalog: &CourseSet,
    professors: &[Professor],
) -> Result<LoadReport, StoreError> {
    let mut report = LoadReport::default();

    if store.has_courses().await? {
        info!("Courses already in database.");
        report.gate_skipped = true;
    } else {
        for course in catalog.iter() {
            let inserted = skip_duplicate(store.insert_course(course).await, &mut report, "course")?;
            if inserted.is_some() {
                report.courses_inserted += 1;
                debug!("Inserted course {}", course);
            }
        }
    }

    let current = current_professors(professors, catalog);
    report.filtered_out = professors.len() - current.len();
    info!("{} professors teach current courses.", current.len());

    let mut index = store.load_index().await?;

    let pb = ProgressBar::new(current.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    for professor in current {
        reconcile(store, catalog, &mut index, professor, &mut report).await?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(report)
}

async fn reconcile<S: Store>(
    store: &S,
    catalog: &CourseSet,
    index: &mut StoreIndex,
    professor: &Professor,
    report: &mut LoadReport,
) -> Result<(), StoreError> {
    let course = catalog.get(&professor.course.key()).unwrap_or(&professor.course);

    let course_id = match index.courses.get(&course.name) {
        Some(id) => *id,
        None => {
            debug!("Course {:?} missing from store; inserting", course.name);
            let Some(id) = skip_duplicate(store.insert_course(course).await, report, "course")?
            else {
                return Ok(());
            };
            report.courses_inserted += 1;
            index.courses.insert(course.name.clone(), id);
            id
        }
    };

    let key = professor.key();
    let professor_id = match index.professors.get(&key) {
        Some(id) => *id,
        None => {
            let Some(id) =
                skip_duplicate(store.insert_professor(professor).await, report, "professor")?
            else {
                return Ok(());
            };
            report.professors_inserted += 1;
            index.professors.insert(key, id);
            id
        }
    };

    let linked = skip_duplicate(
        store.link_course_professor(course_id, professor_id).await,
        report,
        "course-professor link",
    )?;
    if linked.is_some() {
        report.course_professor_links += 1;
    }

    let quarter_id = index.quarters.get(&professor.quarter).copied();
    let year_id = index.years.get(&professor.year).copied();
    let (Some(quarter_id), Some(year_id)) = (quarter_id, year_id) else {
        warn!(
            "No quarter/year row for {} {}; offering of {} not linked",
            professor.quarter, professor.year, course.name
        );
        return Ok(());
    };
    let linked = skip_duplicate(
        store.link_course_time(course_id, quarter_id, year_id).await,
        report,
        "course-term link",
    )?;
    if linked.is_some() {
        report.course_time_links += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, Quarter};
    use crate::store::SqliteStore;

    #[derive(Clone, Copy)]
    enum Fault {
        DuplicateProfessor,
        ForeignKeyOnTimeLink,
    }

    /// SQLite store that fails one operation the way the hosted store can.
    struct FaultyStore {
        inner: SqliteStore,
        fault: Fault,
    }

    impl FaultyStore {
        fn new(fault: Fault) -> Self {
            FaultyStore {
                inner: SqliteStore::open_in_memory().unwrap(),
                fault,
            }
        }
    }

    impl Store for FaultyStore {
        async fn has_courses(&self) -> Result<bool, StoreError> {
            self.inner.has_courses().await
        }

        async fn count(&self, table: &str) -> Result<usize, StoreError> {
            self.inner.count(table).await
        }

        async fn load_index(&self) -> Result<StoreIndex, StoreError> {
            self.inner.load_index().await
        }

        async fn insert_course(&self, course: &Course) -> Result<i64, StoreError> {
            self.inner.insert_course(course).await
        }

        async fn insert_professor(&self, professor: &Professor) -> Result<i64, StoreError> {
            if let Fault::DuplicateProfessor = self.fault {
                return Err(StoreError::UniqueViolation {
                    message: "duplicate key value violates unique constraint".into(),
                });
            }
            self.inner.insert_professor(professor).await
        }

        async fn link_course_professor(
            &self,
            course_id: i64,
            professor_id: i64,
        ) -> Result<(), StoreError> {
            self.inner.link_course_professor(course_id, professor_id).await
        }

        async fn link_course_time(
            &self,
            course_id: i64,
            quarter_id: i64,
            year_id: i64,
        ) -> Result<(), StoreError> {
            if let Fault::ForeignKeyOnTimeLink = self.fault {
                return Err(StoreError::Api {
                    status: 409,
                    code: "23503".into(),
                    message: "violates foreign key constraint".into(),
                });
            }
            self.inner.link_course_time(course_id, quarter_id, year_id).await
        }
    }

    fn catalog() -> CourseSet {
        let mut set = CourseSet::new();
        set.insert(Course::new("info", 200, "intellectual foundations of informatics", "Intro."));
        set.insert(Course::new("info", 340, "client-side development", "Web."));
        set
    }

    fn professor(first: &str, last: &str, course: Course, quarter: Quarter, year: i32) -> Professor {
        Professor {
            first_name: first.into(),
            last_name: last.into(),
            middle_name: None,
            quarter,
            year,
            course,
        }
    }

    fn info200() -> Course {
        Course::new("info", 200, "intellectual foundations of informatics", "")
    }

    fn info340() -> Course {
        Course::new("info", 340, "client-side development", "")
    }

    #[tokio::test]
    async fn fresh_store_gets_everything() {
        let store = SqliteStore::open_in_memory().unwrap();
        let profs = vec![
            professor("jane", "doe", info200(), Quarter::Aut, 2019),
            professor("robert", "smith", info340(), Quarter::Aut, 2019),
            professor("jane", "doe", info200(), Quarter::Win, 2020),
        ];

        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert!(!report.gate_skipped);
        assert_eq!(report.courses_inserted, 2);
        assert_eq!(report.professors_inserted, 2);
        assert_eq!(report.course_professor_links, 2);
        assert_eq!(report.course_time_links, 3);
        // jane/info200 appears twice; the second professor link is a duplicate
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.count("courses_times").await.unwrap(), 3);
        assert_eq!(store.count("professors").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn gate_blocks_catalog_reinsert() {
        let store = SqliteStore::open_in_memory().unwrap();
        load(&store, &catalog(), &[]).await.unwrap();
        assert_eq!(store.count("courses").await.unwrap(), 2);

        let mut bigger = catalog();
        bigger.insert(Course::new("info", 498, "special topics in informatics", ""));
        let report = load(&store, &bigger, &[]).await.unwrap();

        assert!(report.gate_skipped);
        assert_eq!(report.courses_inserted, 0);
        assert_eq!(store.count("courses").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn professor_outside_catalog_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        load(&store, &catalog(), &[]).await.unwrap();

        let retired = Course::new("info", 101, "fluency in info tech", "");
        let profs = vec![professor("ann", "lee", retired, Quarter::Spr, 2005)];
        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert_eq!(report.filtered_out, 1);
        assert_eq!(report.professors_inserted, 0);
        assert_eq!(store.count("professors").await.unwrap(), 0);
        assert_eq!(store.count("courses_professors").await.unwrap(), 0);
        assert_eq!(store.count("courses_times").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn existing_professor_missing_course_links_new_course_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        // courses table non-empty so the gate skips info 340
        let other = Course::new("info", 200, "intellectual foundations of informatics", "");
        store.insert_course(&other).await.unwrap();
        store
            .insert_professor(&professor("robert", "smith", other, Quarter::Aut, 2019))
            .await
            .unwrap();

        let profs = vec![professor("robert", "smith", info340(), Quarter::Spr, 2021)];
        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert!(report.gate_skipped);
        assert_eq!(report.courses_inserted, 1);
        assert_eq!(report.professors_inserted, 0);

        let index = store.load_index().await.unwrap();
        let new_id = index.courses["client-side development"];
        let linked: i64 = store
            .conn_for_tests()
            .query_row("SELECT course_id FROM courses_times", [], |r| r.get(0))
            .unwrap();
        assert_eq!(linked, new_id);
        let description: String = store
            .conn_for_tests()
            .query_row(
                "SELECT course_description FROM courses WHERE id = ?1",
                [new_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(description, "Web.");
    }

    #[tokio::test]
    async fn neither_exists_inserts_both() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_course(&Course::new("info", 100, "placeholder", ""))
            .await
            .unwrap();

        let profs = vec![professor("jane", "doe", info340(), Quarter::Sum, 2010)];
        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert_eq!(report.courses_inserted, 1);
        assert_eq!(report.professors_inserted, 1);
        assert_eq!(report.course_professor_links, 1);
        assert_eq!(report.course_time_links, 1);
    }

    #[tokio::test]
    async fn missing_term_row_skips_time_link_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let profs = vec![professor("jane", "doe", info200(), Quarter::Aut, 1999)];
        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert_eq!(report.course_professor_links, 1);
        assert_eq!(report.course_time_links, 0);
    }

    #[tokio::test]
    async fn duplicate_professor_insert_skips_its_links() {
        let store = FaultyStore::new(Fault::DuplicateProfessor);
        let profs = vec![professor("jane", "doe", info200(), Quarter::Aut, 2019)];

        let report = load(&store, &catalog(), &profs).await.unwrap();

        assert_eq!(report.duplicates, 1);
        assert_eq!(report.professors_inserted, 0);
        assert_eq!(report.course_professor_links, 0);
        assert_eq!(report.course_time_links, 0);
        assert_eq!(store.count("courses").await.unwrap(), 2);
        assert_eq!(store.count("courses_professors").await.unwrap(), 0);
        assert_eq!(store.count("courses_times").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_store_errors_end_the_run() {
        let store = FaultyStore::new(Fault::ForeignKeyOnTimeLink);
        let profs = vec![
            professor("jane", "doe", info200(), Quarter::Aut, 2019),
            professor("robert", "smith", info340(), Quarter::Aut, 2019),
        ];

        let err = load(&store, &catalog(), &profs).await.unwrap_err();

        assert!(matches!(err, StoreError::Api { ref code, .. } if code == "23503"));
        // the first professor's link went in before the failure; the second never ran
        assert_eq!(store.count("courses_professors").await.unwrap(), 1);
        assert_eq!(store.count("professors").await.unwrap(), 1);
    }

    #[test]
    fn filter_uses_course_identity() {
        let profs = vec![
            professor("jane", "doe", info200(), Quarter::Aut, 2019),
            professor("jane", "doe", Course::new("info", 200, "intell foundations", ""), Quarter::Aut, 2004),
        ];
        let current = current_professors(&profs, &catalog());
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].year, 2019);
    }
}
