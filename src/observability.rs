//! Metric names. The library only emits through the `metrics` facade; the embedding
//! application decides whether and where to install a recorder.

/// Counter: submissions by terminal outcome. Labels: outcome.
pub const SUBMISSIONS_TOTAL: &str = "slotbook_submissions_total";

/// Counter: record written but projection write failed.
pub const PARTIAL_COMMITS_TOTAL: &str = "slotbook_partial_commits_total";

/// Counter: availability index rebuilds. Labels: purpose (grid, revalidate).
pub const AVAILABILITY_QUERIES_TOTAL: &str = "slotbook_availability_queries_total";

/// Histogram: reservation store query latency in seconds.
pub const STORE_QUERY_DURATION_SECONDS: &str = "slotbook_store_query_duration_seconds";

/// Counter: post-commit notifications that failed.
pub const NOTIFY_FAILURES_TOTAL: &str = "slotbook_notify_failures_total";

pub const OUTCOME_COMMITTED: &str = "committed";
pub const OUTCOME_CONFLICT: &str = "rejected_conflict";
pub const OUTCOME_INVALID: &str = "rejected_invalid";
pub const OUTCOME_FAILED: &str = "failed";
