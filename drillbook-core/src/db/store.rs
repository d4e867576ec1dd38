//! Curriculum document store
//!
//! Per-collection CRUD over the JSON-document tables, with normalization on
//! every read and the merge/omission rules of [`crate::schema`] on every
//! write. There is no in-process cache: every list and point read goes back
//! to the store, so a cancelled caller has nothing to roll back.
//!
//! Updates are read-merge-write at the document level; concurrent writers
//! are last-write-wins per document. Reorder swaps run in a single
//! transaction by default; [`ReorderConsistency::Independent`] issues the
//! two order writes separately instead.

use crate::model::{Course, CourseRudiment, Lesson};
use crate::ordering::{self, AdjacentSwap, MoveDirection, OrderWrite};
use crate::schema::{
    self, CoursePatch, LessonPatch, NewCourse, NewLesson, NewRudiment, RudimentPatch,
};
use crate::{Error, Result};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// How the two writes of an adjacent swap are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderConsistency {
    /// Both order writes in one transaction; a failure applies neither
    #[default]
    Transactional,

    /// Two sequential writes, the second issued only after the first
    /// resolves. A second-write failure leaves two siblings sharing one
    /// `order` value; listing stays deterministic via the ID tie-break and
    /// the error propagates so the caller can re-attempt.
    Independent,
}

/// Bounded retry for transient lock contention on writes
const WRITE_RETRY_ATTEMPTS: u32 = 3;
const WRITE_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

fn is_transient(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => {
            let msg = db_err.message();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    }
}

/// Parse a stored document body; a corrupt row decodes as an empty document
/// rather than failing the containing read.
fn parse_doc(doc_id: &str, raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Document {} holds unparseable JSON ({}), treating as empty", doc_id, e);
        Value::Null
    })
}

fn merge_doc(existing: Value, patch: Map<String, Value>) -> Value {
    let mut obj = match existing {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    for (key, value) in patch {
        obj.insert(key, value);
    }
    Value::Object(obj)
}

/// Document store handle for the curriculum collections
#[derive(Debug, Clone)]
pub struct CurriculumStore {
    db: SqlitePool,
    reorder: ReorderConsistency,
}

impl CurriculumStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            reorder: ReorderConsistency::default(),
        }
    }

    pub fn with_reorder_consistency(mut self, reorder: ReorderConsistency) -> Self {
        self.reorder = reorder;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    // ========================================================================
    // Courses
    // ========================================================================

    /// All courses in canonical order (ascending `order`, ID tie-break)
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT doc_id, data FROM courses")
            .fetch_all(&self.db)
            .await?;

        let mut courses: Vec<Course> = rows
            .iter()
            .map(|(id, raw)| schema::course_from_doc(id, &parse_doc(id, raw)))
            .collect();
        ordering::sort_canonical(&mut courses);
        Ok(courses)
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, (String,)>("SELECT data FROM courses WHERE doc_id = ?")
            .bind(course_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|(raw,)| schema::course_from_doc(course_id, &parse_doc(course_id, &raw))))
    }

    /// Create a course at the end of the course list
    pub async fn create_course(&self, new: &NewCourse) -> Result<Course> {
        let order: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.db)
            .await?;
        let id = Uuid::new_v4().to_string();
        let doc = schema::course_create_doc(new, order, &schema::now_timestamp());
        self.insert_doc("courses", None, &id, &doc).await?;
        debug!("Created course {} at order {}", id, order);
        Ok(schema::course_from_doc(&id, &doc))
    }

    pub async fn update_course(&self, course_id: &str, patch: &CoursePatch) -> Result<Course> {
        let existing = self
            .fetch_raw("courses", None, course_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))?;
        let merged = merge_doc(existing, schema::course_update_doc(patch, &schema::now_timestamp()));
        self.replace_doc("courses", None, course_id, &merged).await?;
        Ok(schema::course_from_doc(course_id, &merged))
    }

    pub async fn delete_course(&self, course_id: &str) -> Result<()> {
        self.delete_row("DELETE FROM courses WHERE doc_id = ?", &[course_id])
            .await?;
        debug!("Deleted course {}", course_id);
        Ok(())
    }

    /// Move a course one position within the caller's held list
    pub async fn move_course(
        &self,
        courses: &[Course],
        target_id: &str,
        direction: MoveDirection,
    ) -> Result<Vec<Course>> {
        let (next, swap) = ordering::move_adjacent(courses, target_id, direction);
        if let Some(swap) = swap {
            self.apply_swap("courses", None, &swap).await?;
        }
        Ok(next)
    }

    // ========================================================================
    // Lessons
    // ========================================================================

    /// Lessons of one course in canonical order
    pub async fn list_lessons(&self, course_id: &str) -> Result<Vec<Lesson>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT doc_id, data FROM lessons WHERE json_extract(data, '$.courseId') = ?",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        let mut lessons: Vec<Lesson> = rows
            .iter()
            .map(|(id, raw)| schema::lesson_from_doc(id, &parse_doc(id, raw)))
            .collect();
        ordering::sort_canonical(&mut lessons);
        Ok(lessons)
    }

    pub async fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>> {
        let row = sqlx::query_as::<_, (String,)>("SELECT data FROM lessons WHERE doc_id = ?")
            .bind(lesson_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|(raw,)| schema::lesson_from_doc(lesson_id, &parse_doc(lesson_id, &raw))))
    }

    /// Create a lesson at the end of its course's lesson list
    pub async fn create_lesson(&self, new: &NewLesson) -> Result<Lesson> {
        let order: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lessons WHERE json_extract(data, '$.courseId') = ?",
        )
        .bind(&new.course_id)
        .fetch_one(&self.db)
        .await?;
        let id = Uuid::new_v4().to_string();
        let doc = schema::lesson_create_doc(new, order, &schema::now_timestamp());
        self.insert_doc("lessons", None, &id, &doc).await?;
        debug!("Created lesson {} in course {} at order {}", id, new.course_id, order);
        Ok(schema::lesson_from_doc(&id, &doc))
    }

    /// Merge-update a lesson. The owning course is immutable: the patch type
    /// carries no `courseId` and the stored value is preserved.
    pub async fn update_lesson(&self, lesson_id: &str, patch: &LessonPatch) -> Result<Lesson> {
        let existing = self
            .fetch_raw("lessons", None, lesson_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lesson {}", lesson_id)))?;
        let merged = merge_doc(existing, schema::lesson_update_doc(patch, &schema::now_timestamp()));
        self.replace_doc("lessons", None, lesson_id, &merged).await?;
        Ok(schema::lesson_from_doc(lesson_id, &merged))
    }

    pub async fn delete_lesson(&self, lesson_id: &str) -> Result<()> {
        self.delete_row("DELETE FROM lessons WHERE doc_id = ?", &[lesson_id])
            .await?;
        debug!("Deleted lesson {}", lesson_id);
        Ok(())
    }

    pub async fn move_lesson(
        &self,
        lessons: &[Lesson],
        target_id: &str,
        direction: MoveDirection,
    ) -> Result<Vec<Lesson>> {
        let (next, swap) = ordering::move_adjacent(lessons, target_id, direction);
        if let Some(swap) = swap {
            self.apply_swap("lessons", None, &swap).await?;
        }
        Ok(next)
    }

    // ========================================================================
    // Course rudiments (nested sub-scope)
    // ========================================================================

    /// Rudiments of one course in canonical order
    pub async fn list_rudiments(&self, course_id: &str) -> Result<Vec<CourseRudiment>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT doc_id, data FROM course_rudiments WHERE course_id = ?",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        let mut rudiments: Vec<CourseRudiment> = rows
            .iter()
            .map(|(id, raw)| schema::rudiment_from_doc(id, &parse_doc(id, raw)))
            .collect();
        ordering::sort_canonical(&mut rudiments);
        Ok(rudiments)
    }

    pub async fn get_rudiment(
        &self,
        course_id: &str,
        rudiment_id: &str,
    ) -> Result<Option<CourseRudiment>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT data FROM course_rudiments WHERE course_id = ? AND doc_id = ?",
        )
        .bind(course_id)
        .bind(rudiment_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(raw,)| schema::rudiment_from_doc(rudiment_id, &parse_doc(rudiment_id, &raw))))
    }

    /// Create a rudiment at the end of its course's rudiment list
    pub async fn create_rudiment(
        &self,
        course_id: &str,
        new: &NewRudiment,
    ) -> Result<CourseRudiment> {
        let order: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM course_rudiments WHERE course_id = ?")
                .bind(course_id)
                .fetch_one(&self.db)
                .await?;
        let id = Uuid::new_v4().to_string();
        let doc = schema::rudiment_create_doc(new, order, &schema::now_timestamp());
        self.insert_doc("course_rudiments", Some(course_id), &id, &doc)
            .await?;
        debug!("Created rudiment {} in course {} at order {}", id, course_id, order);
        Ok(schema::rudiment_from_doc(&id, &doc))
    }

    pub async fn update_rudiment(
        &self,
        course_id: &str,
        rudiment_id: &str,
        patch: &RudimentPatch,
    ) -> Result<CourseRudiment> {
        let existing = self
            .fetch_raw("course_rudiments", Some(course_id), rudiment_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("rudiment {}/{}", course_id, rudiment_id)))?;
        // The stored subdivision anchors pattern fitting when the patch
        // leaves the subdivision alone
        let current = schema::rudiment_from_doc(rudiment_id, &existing).subdivision;
        let merged = merge_doc(
            existing,
            schema::rudiment_update_doc(patch, current, &schema::now_timestamp()),
        );
        self.replace_doc("course_rudiments", Some(course_id), rudiment_id, &merged)
            .await?;
        Ok(schema::rudiment_from_doc(rudiment_id, &merged))
    }

    pub async fn delete_rudiment(&self, course_id: &str, rudiment_id: &str) -> Result<()> {
        self.delete_row(
            "DELETE FROM course_rudiments WHERE course_id = ? AND doc_id = ?",
            &[course_id, rudiment_id],
        )
        .await?;
        debug!("Deleted rudiment {}/{}", course_id, rudiment_id);
        Ok(())
    }

    pub async fn move_rudiment(
        &self,
        course_id: &str,
        rudiments: &[CourseRudiment],
        target_id: &str,
        direction: MoveDirection,
    ) -> Result<Vec<CourseRudiment>> {
        let (next, swap) = ordering::move_adjacent(rudiments, target_id, direction);
        if let Some(swap) = swap {
            self.apply_swap("course_rudiments", Some(course_id), &swap)
                .await?;
        }
        Ok(next)
    }

    // ========================================================================
    // Authorization
    // ========================================================================

    /// True when the role-lookup document for `uid` carries the admin role.
    /// The store only reads this collection; rows are provisioned
    /// operationally.
    pub async fn is_admin(&self, uid: &str) -> Result<bool> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM admins WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.db)
            .await?;
        Ok(role.as_deref() == Some("admin"))
    }

    // ========================================================================
    // Raw document primitives
    // ========================================================================

    async fn fetch_raw(
        &self,
        table: &str,
        scope: Option<&str>,
        doc_id: &str,
    ) -> Result<Option<Value>> {
        let sql = match scope {
            Some(_) => format!("SELECT data FROM {} WHERE course_id = ? AND doc_id = ?", table),
            None => format!("SELECT data FROM {} WHERE doc_id = ?", table),
        };
        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        if let Some(course_id) = scope {
            query = query.bind(course_id.to_string());
        }
        let row = query.bind(doc_id.to_string()).fetch_optional(&self.db).await?;
        Ok(row.map(|(raw,)| parse_doc(doc_id, &raw)))
    }

    async fn insert_doc(
        &self,
        table: &str,
        scope: Option<&str>,
        doc_id: &str,
        doc: &Value,
    ) -> Result<()> {
        let sql = match scope {
            Some(_) => format!("INSERT INTO {} (course_id, doc_id, data) VALUES (?, ?, ?)", table),
            None => format!("INSERT INTO {} (doc_id, data) VALUES (?, ?)", table),
        };
        let body = doc.to_string();
        self.execute_write_with_retry("insert", &sql, scope, doc_id, Some(&body))
            .await
    }

    async fn replace_doc(
        &self,
        table: &str,
        scope: Option<&str>,
        doc_id: &str,
        doc: &Value,
    ) -> Result<()> {
        let sql = match scope {
            Some(_) => format!("UPDATE {} SET data = ?3 WHERE course_id = ?1 AND doc_id = ?2", table),
            None => format!("UPDATE {} SET data = ?2 WHERE doc_id = ?1", table),
        };
        let body = doc.to_string();
        self.execute_write_with_retry("update", &sql, scope, doc_id, Some(&body))
            .await
    }

    async fn delete_row(&self, sql: &str, binds: &[&str]) -> Result<()> {
        let mut delay = WRITE_RETRY_BASE_DELAY;
        let mut attempt = 0;
        loop {
            let mut query = sqlx::query(sql);
            for bind in binds {
                query = query.bind(bind.to_string());
            }
            match query.execute(&self.db).await.map_err(Error::from) {
                Ok(_) => return Ok(()),
                Err(e) if attempt + 1 < WRITE_RETRY_ATTEMPTS && is_transient(&e) => {
                    warn!("Transient store error on delete ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a single-document write with bounded retry for transient
    /// lock contention. Bind order for unscoped writes is (doc_id, body);
    /// scoped writes prepend course_id.
    async fn execute_write_with_retry(
        &self,
        op: &str,
        sql: &str,
        scope: Option<&str>,
        doc_id: &str,
        body: Option<&str>,
    ) -> Result<()> {
        let mut delay = WRITE_RETRY_BASE_DELAY;
        let mut attempt = 0;
        loop {
            let mut query = sqlx::query(sql);
            if let Some(course_id) = scope {
                query = query.bind(course_id.to_string());
            }
            query = query.bind(doc_id.to_string());
            if let Some(body) = body {
                query = query.bind(body.to_string());
            }
            match query.execute(&self.db).await.map_err(Error::from) {
                Ok(_) => return Ok(()),
                Err(e) if attempt + 1 < WRITE_RETRY_ATTEMPTS && is_transient(&e) => {
                    warn!("Transient store error on {} ({}), retrying in {:?}", op, e, delay);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ========================================================================
    // Reorder application
    // ========================================================================

    fn order_write_sql(table: &str, scoped: bool) -> String {
        if scoped {
            format!(
                "UPDATE {} SET data = json_set(data, '$.order', ?, '$.updatedAt', ?) WHERE course_id = ? AND doc_id = ?",
                table
            )
        } else {
            format!(
                "UPDATE {} SET data = json_set(data, '$.order', ?, '$.updatedAt', ?) WHERE doc_id = ?",
                table
            )
        }
    }

    async fn write_order_with_retry(
        &self,
        table: &str,
        scope: Option<&str>,
        write: &OrderWrite,
    ) -> Result<()> {
        let sql = Self::order_write_sql(table, scope.is_some());
        let stamp = schema::now_timestamp();
        let mut delay = WRITE_RETRY_BASE_DELAY;
        let mut attempt = 0;
        loop {
            let mut query = sqlx::query(&sql).bind(write.order).bind(&stamp);
            if let Some(course_id) = scope {
                query = query.bind(course_id.to_string());
            }
            match query
                .bind(&write.doc_id)
                .execute(&self.db)
                .await
                .map_err(Error::from)
            {
                Ok(_) => return Ok(()),
                Err(e) if attempt + 1 < WRITE_RETRY_ATTEMPTS && is_transient(&e) => {
                    warn!(
                        "Transient store error on order write for {} ({}), retrying in {:?}",
                        write.doc_id, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Persist the two order writes of an adjacent swap.
    ///
    /// Sequential either way: in `Independent` mode the second write is only
    /// issued after the first resolves, which bounds but does not eliminate
    /// the partial-failure window.
    async fn apply_swap(
        &self,
        table: &str,
        scope: Option<&str>,
        swap: &AdjacentSwap,
    ) -> Result<()> {
        match self.reorder {
            ReorderConsistency::Transactional => {
                let sql = Self::order_write_sql(table, scope.is_some());
                let stamp = schema::now_timestamp();
                let mut tx = self.db.begin().await?;
                for write in [&swap.first, &swap.second] {
                    let mut query = sqlx::query(&sql).bind(write.order).bind(&stamp);
                    if let Some(course_id) = scope {
                        query = query.bind(course_id.to_string());
                    }
                    query.bind(&write.doc_id).execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            ReorderConsistency::Independent => {
                self.write_order_with_retry(table, scope, &swap.first).await?;
                self.write_order_with_retry(table, scope, &swap.second).await?;
            }
        }
        debug!(
            "Swapped order of {} and {} in {}",
            swap.first.doc_id, swap.second.doc_id, table
        );
        Ok(())
    }
}
