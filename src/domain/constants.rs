//! Domain constants for the catalog synchronization engine
//!
//! Characteristics of the upstream search/store APIs and the fixed
//! policy values the refresh pipeline is built around.

/// Upstream search API characteristics
pub mod api {
    /// Default search endpoint for paginated catalog queries
    pub const SEARCH_ENDPOINT: &str = "https://search.grocerkit.example.com/1/indexes/products/query";

    /// Default store directory endpoint (flat list, unauthenticated)
    pub const STORE_DIRECTORY_ENDPOINT: &str = "https://www.grocerkit.example.com/api/stores";

    /// Records requested per search page
    pub const HITS_PER_PAGE: u32 = 100;

    /// Hard guard on pages fetched for a single store
    ///
    /// The search API reports `nbPages` itself; this cap only protects
    /// against a misbehaving upstream that keeps returning full pages.
    pub const MAX_PAGES_PER_STORE: u32 = 500;

    /// Header carrying the extracted application id
    pub const APP_ID_HEADER: &str = "X-Application-Id";

    /// Header carrying the extracted API key
    pub const API_KEY_HEADER: &str = "X-API-Key";

    /// Search pages are 0-based
    pub const PAGE_NUMBERING_BASE: u32 = 0;
}

/// Refresh pipeline policy values
pub mod refresh {
    /// Default number of concurrent per-store workers
    pub const DEFAULT_MAX_WORKERS: u32 = 100;

    /// Hours after which a store catalog counts as stale
    pub const STALENESS_THRESHOLD_HOURS: i64 = 24;

    /// Upper bound on credential extraction time (seconds)
    pub const EXTRACTION_TIMEOUT_SECS: u64 = 60;

    /// Per-request timeout for search page fetches (milliseconds)
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30000;

    /// Default requests per second against the search API
    pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 20;

    /// Auth-classified failures get exactly this many credential retries
    pub const AUTH_RETRY_LIMIT: u32 = 1;
}

/// Database-related constants
pub mod database {
    /// Default connection pool size for the writer pool
    pub const DEFAULT_CONNECTION_POOL_SIZE: u32 = 10;

    /// Default database filename under the app data directory
    pub const DEFAULT_DB_FILENAME: &str = "shelfsync.db";

    /// Busy timeout handed to SQLite (milliseconds)
    pub const BUSY_TIMEOUT_MS: u64 = 5000;

    /// Attempts for a commit hitting a transient lock conflict
    pub const COMMIT_RETRY_ATTEMPTS: u32 = 3;

    /// Base backoff between commit retries (milliseconds, jittered)
    pub const COMMIT_RETRY_BACKOFF_MS: u64 = 50;

    /// Delimiter between category path segments
    pub const CATEGORY_PATH_DELIMITER: &str = " > ";
}

/// Keys in the settings KV table
pub mod settings {
    /// Store number the query surface is currently pointed at
    pub const ACTIVE_STORE: &str = "active_store";

    /// RFC 3339 timestamp of the last engine-level refresh
    pub const LAST_REFRESH: &str = "last_refresh";
}

/// Validation bounds for user-tunable values
pub mod validation {
    /// Minimum concurrent workers
    pub const MIN_WORKERS: u32 = 1;

    /// Maximum concurrent workers
    pub const MAX_WORKERS: u32 = 500;

    /// Minimum records per page
    pub const MIN_HITS_PER_PAGE: u32 = 1;

    /// Maximum records per page accepted by the search API
    pub const MAX_HITS_PER_PAGE: u32 = 1000;

    /// Minimum request timeout (milliseconds)
    pub const MIN_REQUEST_TIMEOUT_MS: u64 = 1000;

    /// Maximum request timeout (milliseconds)
    pub const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
}
