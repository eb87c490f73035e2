/// Jobs are identified by time-ordered UUIDs (v7) generated at creation.
pub type JobId = uuid::Uuid;

/// Users are identified by the UUID carried in their access token `sub` claim.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
