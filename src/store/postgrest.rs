use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Store, StoreIndex};
use crate::error::{StoreError, PG_UNIQUE_VIOLATION};
use crate::model::{Course, Professor, ProfessorKey, Quarter};
use crate::settings::Remote;

const PAGE_SIZE: usize = 1000;

/// Hosted Postgres reached through its PostgREST and storage HTTP APIs.
pub struct PostgrestStore {
    client: Client,
    base: String,
    key: String,
}

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

#[derive(Deserialize)]
struct CourseRow {
    id: i64,
    course_title: String,
}

#[derive(Deserialize)]
struct ProfessorRow {
    id: i64,
    first_name: String,
    last_name: String,
}

#[derive(Deserialize)]
struct YearRow {
    id: i64,
    year: i32,
}

#[derive(Deserialize)]
struct QuarterRow {
    id: i64,
    quarter: String,
}

#[derive(Serialize)]
struct NewCourse<'a> {
    course_title: &'a str,
    course_major: &'a str,
    course_number: i32,
    course_description: &'a str,
}

#[derive(Serialize)]
struct NewProfessor<'a> {
    first_name: &'a str,
    last_name: &'a str,
    middle_initial: Option<String>,
}

#[derive(Serialize)]
struct CourseProfessor {
    course_id: i64,
    professor_id: i64,
}

#[derive(Serialize)]
struct CourseTime {
    course_id: i64,
    quarter_id: i64,
    year_id: i64,
}

/// Error body shared (loosely) by PostgREST and the storage API.
#[derive(Deserialize, Default)]
struct ApiErrorBody {
    code: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl PostgrestStore {
    pub fn new(remote: &Remote) -> Self {
        PostgrestStore {
            client: Client::new(),
            base: remote.url.trim_end_matches('/').to_string(),
            key: remote.key.clone(),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base, table)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await?;
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body.code.or(body.error).unwrap_or_default();
        let message = body.message.unwrap_or(text);
        if code == PG_UNIQUE_VIOLATION {
            return Err(StoreError::UniqueViolation { message });
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// All rows of `table`, fetched a page at a time.
    async fn select_all<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
    ) -> Result<Vec<T>, StoreError> {
        let limit = PAGE_SIZE.to_string();
        let mut rows = Vec::new();
        loop {
            let offset = rows.len().to_string();
            let response = self
                .request(Method::GET, &self.table_url(table))
                .query(&[
                    ("select", columns),
                    ("order", "id.asc"),
                    ("limit", limit.as_str()),
                    ("offset", offset.as_str()),
                ])
                .send()
                .await?;
            let page: Vec<T> = Self::check(response).await?.json().await?;
            let done = page.len() < PAGE_SIZE;
            rows.extend(page);
            if done {
                break;
            }
        }
        debug!("Loaded {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert_returning_id<B: Serialize>(
        &self,
        table: &'static str,
        row: &B,
    ) -> Result<i64, StoreError> {
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let inserted: Vec<IdRow> = Self::check(response).await?.json().await?;
        inserted
            .first()
            .map(|r| r.id)
            .ok_or(StoreError::MissingId { table })
    }

    async fn insert<B: Serialize>(&self, table: &str, row: &B) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Download one object from the storage API as text.
    pub async fn download(&self, bucket: &str, object: &str) -> Result<String, StoreError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base, bucket, object);
        let response = self.request(Method::GET, &url).send().await?;
        Ok(Self::check(response).await?.text().await?)
    }
}

impl Store for PostgrestStore {
    async fn has_courses(&self) -> Result<bool, StoreError> {
        let response = self
            .request(Method::GET, &self.table_url("courses"))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<IdRow> = Self::check(response).await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn count(&self, table: &str) -> Result<usize, StoreError> {
        let response = self
            .request(Method::HEAD, &self.table_url(table))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check(response).await?;
        // Content-Range: 0-24/312, or */0 for an empty table
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| StoreError::MissingCount {
                table: table.to_string(),
            })
    }

    async fn load_index(&self) -> Result<StoreIndex, StoreError> {
        let mut index = StoreIndex::default();

        for row in self.select_all::<CourseRow>("courses", "id,course_title").await? {
            index.courses.insert(row.course_title, row.id);
        }
        let professors = self
            .select_all::<ProfessorRow>("professors", "id,first_name,last_name")
            .await?;
        for row in professors {
            let key = ProfessorKey {
                first_name: row.first_name,
                last_name: row.last_name,
            };
            index.professors.insert(key, row.id);
        }
        for row in self.select_all::<YearRow>("years", "id,year").await? {
            index.years.insert(row.year, row.id);
        }
        for row in self.select_all::<QuarterRow>("quarters", "id,quarter").await? {
            match row.quarter.parse::<Quarter>() {
                Ok(q) => {
                    index.quarters.insert(q, row.id);
                }
                Err(_) => warn!("Ignoring unknown quarter row {:?}", row.quarter),
            }
        }

        Ok(index)
    }

    async fn insert_course(&self, course: &Course) -> Result<i64, StoreError> {
        let row = NewCourse {
            course_title: &course.name,
            course_major: &course.department,
            course_number: course.number,
            course_description: &course.description,
        };
        self.insert_returning_id("courses", &row).await
    }

    async fn insert_professor(&self, professor: &Professor) -> Result<i64, StoreError> {
        let row = NewProfessor {
            first_name: &professor.first_name,
            last_name: &professor.last_name,
            middle_initial: professor.middle_name.map(String::from),
        };
        self.insert_returning_id("professors", &row).await
    }

    async fn link_course_professor(
        &self,
        course_id: i64,
        professor_id: i64,
    ) -> Result<(), StoreError> {
        let row = CourseProfessor {
            course_id,
            professor_id,
        };
        self.insert("courses_professors", &row).await
    }

    async fn link_course_time(
        &self,
        course_id: i64,
        quarter_id: i64,
        year_id: i64,
    ) -> Result<(), StoreError> {
        let row = CourseTime {
            course_id,
            quarter_id,
            year_id,
        };
        self.insert("courses_times", &row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn store_for(server: &Server) -> PostgrestStore {
        PostgrestStore::new(&Remote {
            url: server.url(),
            key: "anon-key".into(),
            bucket: "scrape".into(),
            object: "info.html".into(),
        })
    }

    #[tokio::test]
    async fn has_courses_reads_one_row() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/courses")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "id".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer anon-key")
            .with_status(200)
            .with_body(r#"[{"id": 7}]"#)
            .create_async()
            .await;

        assert!(store_for(&server).has_courses().await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn count_reads_content_range() {
        let mut server = Server::new_async().await;
        let _times = server
            .mock("HEAD", "/rest/v1/courses_times")
            .match_header("prefer", "count=exact")
            .with_status(200)
            .with_header("content-range", "0-24/312")
            .create_async()
            .await;
        let _empty = server
            .mock("HEAD", "/rest/v1/professors")
            .with_status(200)
            .with_header("content-range", "*/0")
            .create_async()
            .await;
        let _unknown = server
            .mock("HEAD", "/rest/v1/courses")
            .with_status(200)
            .create_async()
            .await;

        let store = store_for(&server);
        assert_eq!(store.count("courses_times").await.unwrap(), 312);
        assert_eq!(store.count("professors").await.unwrap(), 0);
        assert!(matches!(
            store.count("courses").await.unwrap_err(),
            StoreError::MissingCount { .. }
        ));
    }

    #[tokio::test]
    async fn insert_returns_generated_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/courses")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::Regex(
                r#""course_title":"client-side development""#.to_string(),
            ))
            .with_status(201)
            .with_body(r#"[{"id": 42, "course_title": "client-side development"}]"#)
            .create_async()
            .await;

        let course = Course::new("info", 340, "client-side development", "Web pages.");
        let id = store_for(&server).insert_course(&course).await.unwrap();
        assert_eq!(id, 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn duplicate_key_code_is_unique_violation() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/courses_professors")
            .with_status(409)
            .with_body(
                r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint"}"#,
            )
            .create_async()
            .await;

        let err = store_for(&server).link_course_professor(1, 2).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn other_api_errors_propagate() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/courses_times")
            .with_status(400)
            .with_body(r#"{"code":"23503","message":"violates foreign key constraint"}"#)
            .create_async()
            .await;

        let err = store_for(&server).link_course_time(1, 2, 3).await.unwrap_err();
        assert!(!err.is_unique_violation());
        assert!(matches!(err, StoreError::Api { status: 400, ref code, .. } if code == "23503"));
    }

    #[tokio::test]
    async fn index_maps_natural_keys() {
        let mut server = Server::new_async().await;
        let _courses = server
            .mock("GET", "/rest/v1/courses")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 1, "course_title": "client-side development"}]"#)
            .create_async()
            .await;
        let _professors = server
            .mock("GET", "/rest/v1/professors")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 5, "first_name": "jane", "last_name": "doe"}]"#)
            .create_async()
            .await;
        let _years = server
            .mock("GET", "/rest/v1/years")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 17, "year": 2019}]"#)
            .create_async()
            .await;
        let _quarters = server
            .mock("GET", "/rest/v1/quarters")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 1, "quarter": "AUT"}, {"id": 9, "quarter": "FALL"}]"#)
            .create_async()
            .await;

        let index = store_for(&server).load_index().await.unwrap();
        assert_eq!(index.courses["client-side development"], 1);
        let jane = ProfessorKey {
            first_name: "jane".into(),
            last_name: "doe".into(),
        };
        assert_eq!(index.professors[&jane], 5);
        assert_eq!(index.years[&2019], 17);
        assert_eq!(index.quarters.len(), 1);
        assert_eq!(index.quarters[&Quarter::Aut], 1);
    }

    #[tokio::test]
    async fn downloads_catalog_object() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/storage/v1/object/scrape/info.html")
            .match_header("authorization", "Bearer anon-key")
            .with_body("<html><p>intro</p></html>")
            .create_async()
            .await;

        let html = store_for(&server).download("scrape", "info.html").await.unwrap();
        assert!(html.contains("intro"));
    }
}
