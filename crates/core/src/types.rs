/// Identifier of the authenticated user a wizard session belongs to.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
