//! The data service: the one entry point the booking UI talks to.
//!
//! Reads resolve overlay-first, then go through the TTL cache, then the
//! resilient fetcher. Mutations (enroll/unenroll) rewrite whole overlay
//! collections under a single writer lock and invalidate the affected
//! cache keys before the lock is released.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{DataError, Result};
use crate::fetch::{extract_collection, FetchError, FileSource, HttpSource, ResilientFetcher, SnapshotSource};
use crate::models::{CourseRecord, EnrollmentRecord, EnrollmentStatus, StudentEnrollment, UserRecord};
use crate::overlay::{FileStore, OverlayError, OverlayStore, Source, COURSES_OVERLAY_KEY, ENROLLMENTS_OVERLAY_KEY};
use crate::schedule::{aggregate, ScheduleIndex};

pub const USERS: &str = "users";
pub const COURSES: &str = "courses";
pub const ENROLLMENTS: &str = "enrollments";
pub const TESTIMONIALS: &str = "testimonials";

/// Resources warmed by `preload`.
const PRELOAD_RESOURCES: [&str; 4] = [COURSES, ENROLLMENTS, USERS, TESTIMONIALS];

/// Cache keys made stale by enroll/unenroll.
const MUTATED_KEYS: [&str; 4] = [COURSES, ENROLLMENTS, COURSES_OVERLAY_KEY, ENROLLMENTS_OVERLAY_KEY];

/// Snapshot directory used when neither a data dir nor a base URL is configured.
const DEFAULT_DATA_DIR: &str = "./data";

type Collection = Arc<Vec<Value>>;

pub struct DataService {
    cache: Arc<TtlCache<Collection>>,
    fetcher: ResilientFetcher,
    overlay: OverlayStore,
    // Readers of overlay-backed collections share it; enroll/unenroll hold it exclusively
    state: RwLock<()>,
}

impl DataService {
    pub fn new(fetcher: ResilientFetcher, cache: TtlCache<Collection>, overlay: OverlayStore) -> Self {
        Self {
            cache: Arc::new(cache),
            fetcher,
            overlay,
            state: RwLock::new(()),
        }
    }

    /// Build a service from configuration: HTTP or file snapshot, file-backed overlay.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source: Arc<dyn SnapshotSource> = match (&config.base_url, &config.data_dir) {
            (Some(url), _) => Arc::new(
                HttpSource::with_timeout(url, config.request_timeout())
                    .with_context(|| format!("Failed to create HTTP client for {}", url))?,
            ),
            (None, Some(dir)) => Arc::new(FileSource::new(dir)),
            (None, None) => Arc::new(FileSource::new(DEFAULT_DATA_DIR)),
        };

        let overlay_dir = config.overlay_dir()?;
        let store = FileStore::new(overlay_dir.clone())
            .with_context(|| format!("Failed to open overlay directory {}", overlay_dir.display()))?;
        debug!(?overlay_dir, "Overlay directory configured");

        Ok(Self::new(
            ResilientFetcher::new(source, config.retry_policy()),
            TtlCache::new(config.cache_ttl()),
            OverlayStore::new(Box::new(store)),
        ))
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn decode<T: DeserializeOwned>(resource: &str, items: &[Value]) -> Result<Vec<T>> {
        items
            .iter()
            .map(T::deserialize)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|source| DataError::Malformed {
                resource: resource.to_string(),
                source,
            })
    }

    /// Read-through: cached collection if still valid, otherwise fetch and cache.
    async fn snapshot_collection(&self, resource: &str) -> Result<Collection> {
        if let Some(cached) = self.cache.get(resource) {
            return Ok(cached);
        }

        let document = self.fetcher.fetch(resource).await?;
        let items = extract_collection(resource, document).map_err(|source| FetchError::Permanent {
            resource: resource.to_string(),
            source,
        })?;
        let collection = Arc::new(items);
        self.cache.set(resource, Arc::clone(&collection));
        debug!(resource, count = collection.len(), "Snapshot collection cached");
        Ok(collection)
    }

    /// Overlay records for `overlay_key`, if any. Overlay data is cached under
    /// its own key so it can never be served as snapshot data.
    fn overlay_records<T: DeserializeOwned>(&self, overlay_key: &str) -> Result<Option<Vec<T>>> {
        let Some(items) = self.overlay.read_overlay::<Vec<Value>>(overlay_key)? else {
            return Ok(None);
        };
        let records = items
            .iter()
            .map(T::deserialize)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|source| OverlayError::Corrupt {
                key: overlay_key.to_string(),
                source,
            })?;
        self.cache.set(overlay_key, Arc::new(items));
        Ok(Some(records))
    }

    /// Resolve a collection for reading: an overlay for `overlay_key` fully
    /// shadows the snapshot. Unreadable overlay data is logged and skipped in
    /// favor of the snapshot.
    async fn resolve<T: DeserializeOwned>(&self, resource: &str, overlay_key: &str) -> Result<Source<Vec<T>>> {
        match self.overlay_records(overlay_key) {
            Ok(Some(records)) => return Ok(Source::Overlay(records)),
            Ok(None) => {}
            Err(e) => {
                warn!(key = overlay_key, error = %e, "Overlay unreadable, using snapshot");
            }
        }

        let items = self.snapshot_collection(resource).await?;
        Self::decode(resource, &items).map(Source::Snapshot)
    }

    /// Resolve a collection that is about to be written back. Overlay errors
    /// fail the call: a snapshot-based write would erase earlier changes.
    async fn resolve_for_update<T: DeserializeOwned>(&self, resource: &str, overlay_key: &str) -> Result<Vec<T>> {
        if let Some(records) = self.overlay_records(overlay_key)? {
            return Ok(records);
        }
        let items = self.snapshot_collection(resource).await?;
        Self::decode(resource, &items)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Any snapshot collection by resource name, cached.
    pub async fn get_resource(&self, resource: &str) -> Result<Arc<Vec<Value>>> {
        self.snapshot_collection(resource).await
    }

    pub async fn get_courses(&self) -> Result<Vec<CourseRecord>> {
        Ok(self.get_courses_with_source().await?.into_inner())
    }

    /// Courses tagged with where they were read from.
    pub async fn get_courses_with_source(&self) -> Result<Source<Vec<CourseRecord>>> {
        let _guard = self.state.read().await;
        self.resolve(COURSES, COURSES_OVERLAY_KEY).await
    }

    pub async fn get_course(&self, course_id: &str) -> Result<CourseRecord> {
        self.get_courses()
            .await?
            .into_iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| DataError::NotFound(format!("course {}", course_id)))
    }

    /// The calendar index, rebuilt from the current courses on every call.
    pub async fn get_schedule_data(&self) -> Result<ScheduleIndex> {
        let courses = self.get_courses().await?;
        Ok(aggregate(&courses))
    }

    pub async fn get_enrollments(&self) -> Result<Vec<EnrollmentRecord>> {
        let _guard = self.state.read().await;
        Ok(self.resolve(ENROLLMENTS, ENROLLMENTS_OVERLAY_KEY).await?.into_inner())
    }

    /// A student's active enrollments, each joined with its course.
    pub async fn get_student_enrollments(&self, student_id: &str) -> Result<Vec<StudentEnrollment>> {
        let (enrollments, courses) = {
            let _guard = self.state.read().await;
            let enrollments: Vec<EnrollmentRecord> =
                self.resolve(ENROLLMENTS, ENROLLMENTS_OVERLAY_KEY).await?.into_inner();
            let courses: Vec<CourseRecord> = self.resolve(COURSES, COURSES_OVERLAY_KEY).await?.into_inner();
            (enrollments, courses)
        };

        Ok(enrollments
            .into_iter()
            .filter(|e| e.student_id == student_id && e.is_active())
            .map(|enrollment| {
                let course = courses.iter().find(|c| c.id == enrollment.course_id).cloned();
                StudentEnrollment { enrollment, course }
            })
            .collect())
    }

    pub async fn get_users(&self) -> Result<Vec<UserRecord>> {
        let items = self.snapshot_collection(USERS).await?;
        Self::decode(USERS, &items)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserRecord> {
        self.get_users()
            .await?
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| DataError::NotFound(format!("user {}", user_id)))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<UserRecord> {
        self.get_users()
            .await?
            .into_iter()
            .find(|u| u.has_email(email))
            .ok_or_else(|| DataError::NotFound(format!("user with email {}", email)))
    }

    pub async fn get_testimonials(&self) -> Result<Vec<Value>> {
        Ok(self.get_resource(TESTIMONIALS).await?.as_ref().clone())
    }

    async fn warm(&self, resource: &'static str) -> Result<usize> {
        match resource {
            COURSES => self.get_courses().await.map(|c| c.len()),
            ENROLLMENTS => self.get_enrollments().await.map(|e| e.len()),
            other => self.get_resource(other).await.map(|items| items.len()),
        }
    }

    /// Warm the cache for the main collections concurrently.
    /// Failures are logged; a missing collection doesn't stop the others.
    pub async fn preload(&self) -> usize {
        let results = futures::future::join_all(PRELOAD_RESOURCES.iter().map(|&r| self.warm(r))).await;

        let mut loaded = 0;
        for (resource, result) in PRELOAD_RESOURCES.iter().zip(results) {
            match result {
                Ok(count) => {
                    debug!(resource, count, "Preloaded");
                    loaded += 1;
                }
                Err(e) => warn!(resource, error = %e, "Preload failed"),
            }
        }
        loaded
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Write both overlay collections as one unit: if the course write
    /// fails, the enrollment overlay is put back the way it was.
    fn commit(&self, enrollments: &[EnrollmentRecord], courses: &[CourseRecord]) -> Result<()> {
        let previous = self.overlay.read_raw(ENROLLMENTS_OVERLAY_KEY)?;
        self.overlay.write_overlay(ENROLLMENTS_OVERLAY_KEY, enrollments)?;

        if let Err(e) = self.overlay.write_overlay(COURSES_OVERLAY_KEY, courses) {
            if let Err(rollback) = self.overlay.restore_raw(ENROLLMENTS_OVERLAY_KEY, previous.as_deref()) {
                error!(error = %rollback, "Failed to roll back enrollment overlay");
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn enroll_student(&self, student_id: &str, course_id: &str) -> Result<EnrollmentRecord> {
        let _guard = self.state.write().await;

        let mut courses: Vec<CourseRecord> = self.resolve_for_update(COURSES, COURSES_OVERLAY_KEY).await?;
        let mut enrollments: Vec<EnrollmentRecord> =
            self.resolve_for_update(ENROLLMENTS, ENROLLMENTS_OVERLAY_KEY).await?;

        let course = courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| DataError::NotFound(format!("course {}", course_id)))?;

        if enrollments.iter().any(|e| e.is_active() && e.matches(student_id, course_id)) {
            return Err(DataError::AlreadyEnrolled {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            });
        }
        if !course.is_active() {
            return Err(DataError::CourseInactive {
                course_id: course_id.to_string(),
            });
        }
        if course.is_full() {
            return Err(DataError::CourseFull {
                course_id: course_id.to_string(),
            });
        }

        course.enrolled_students += 1;
        let seats = course.display_seats();
        let record = EnrollmentRecord::new(student_id, course_id);
        enrollments.push(record.clone());

        self.commit(&enrollments, &courses)?;
        self.cache.clear_for(&MUTATED_KEYS);

        info!(student_id, course_id, enrollment_id = %record.id, seats = %seats, "Student enrolled");
        Ok(record)
    }

    pub async fn unenroll_student(&self, student_id: &str, course_id: &str) -> Result<EnrollmentRecord> {
        let _guard = self.state.write().await;

        let mut courses: Vec<CourseRecord> = self.resolve_for_update(COURSES, COURSES_OVERLAY_KEY).await?;
        let mut enrollments: Vec<EnrollmentRecord> =
            self.resolve_for_update(ENROLLMENTS, ENROLLMENTS_OVERLAY_KEY).await?;

        let enrollment = enrollments
            .iter_mut()
            .find(|e| e.is_active() && e.matches(student_id, course_id))
            .ok_or_else(|| {
                DataError::NotFound(format!(
                    "active enrollment of student {} in course {}",
                    student_id, course_id
                ))
            })?;
        enrollment.status = EnrollmentStatus::Cancelled;
        let record = enrollment.clone();

        match courses.iter_mut().find(|c| c.id == course_id) {
            Some(course) => course.enrolled_students = course.enrolled_students.saturating_sub(1),
            None => warn!(course_id, "Cancelled enrollment points at an unknown course"),
        }

        self.commit(&enrollments, &courses)?;
        self.cache.clear_for(&MUTATED_KEYS);

        info!(student_id, course_id, enrollment_id = %record.id, "Student unenrolled");
        Ok(record)
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    pub fn invalidate(&self, resources: &[&str]) {
        self.cache.clear_for(resources);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// How long ago `resource` was cached, for status display.
    pub fn cache_age(&self, resource: &str) -> Option<String> {
        self.cache
            .get_entry(resource)
            .filter(|entry| entry.is_fresh(self.cache.ttl()))
            .map(|entry| entry.age_display())
    }

    pub fn spawn_cache_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        TtlCache::spawn_sweeper(Arc::clone(&self.cache), interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemorySource, RetryPolicy};
    use serde_json::json;

    fn service(source: MemorySource) -> DataService {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1));
        DataService::new(
            ResilientFetcher::new(Arc::new(source), policy),
            TtlCache::default(),
            OverlayStore::in_memory(),
        )
    }

    fn catalogue() -> MemorySource {
        MemorySource::new()
            .with_document(
                COURSES,
                json!({"courses": [
                    {"id": "c1", "language": "Anglais", "maxStudents": 2, "enrolledStudents": 1,
                     "schedule": {"date": "2024-01-15", "time": "09:00", "duration": "1h30"}},
                    {"id": "c2", "language": "Espagnol", "maxStudents": 1, "enrolledStudents": 0,
                     "status": "inactive"}
                ]}),
            )
            .with_document(ENROLLMENTS, json!([]))
            .with_document(USERS, json!([{"id": "s1", "email": "Ana@example.com", "firstName": "Ana"}]))
    }

    #[tokio::test]
    async fn test_enroll_rejects_inactive_and_unknown_courses() {
        let service = service(catalogue());

        let err = service.enroll_student("s1", "c2").await.unwrap_err();
        assert!(matches!(err, DataError::CourseInactive { .. }));

        let err = service.enroll_student("s1", "nope").await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));

        // Nothing was written
        assert!(!service.get_courses_with_source().await.unwrap().is_overlay());
    }

    #[tokio::test]
    async fn test_unenroll_without_enrollment_is_not_found() {
        let service = service(catalogue());
        let err = service.unenroll_student("s1", "c1").await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let service = service(catalogue());
        assert_eq!(service.get_user_by_email("ana@EXAMPLE.com").await.unwrap().id, "s1");
        assert!(matches!(
            service.get_user_by_email("zoe@example.com").await,
            Err(DataError::NotFound(_))
        ));
        assert_eq!(service.get_user("s1").await.unwrap().first_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_preload_counts_available_collections() {
        // No testimonials document: three of four load
        let service = service(catalogue());
        assert_eq!(service.preload().await, 3);
        assert_eq!(service.cache_age(USERS).as_deref(), Some("just now"));
        assert_eq!(service.cache_age(TESTIMONIALS), None);
    }

    #[tokio::test]
    async fn test_malformed_records_are_reported() {
        let source = MemorySource::new().with_document(COURSES, json!([{"language": "Anglais"}]));
        let service = service(source);
        assert!(matches!(
            service.get_courses().await,
            Err(DataError::Malformed { .. })
        ));
    }
}
