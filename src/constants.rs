//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Agent executor constants
pub mod agent {
    /// Maximum model round-trips per task before the run is aborted
    pub const MAX_TOOL_ITERATIONS: usize = 8;

    /// Maximum generated tokens per model call
    pub const MAX_RESPONSE_TOKENS: usize = 4096;

    /// Upper bound for a single agent task (seconds)
    pub const TASK_TIMEOUT_SECS: u64 = 600;
}

/// Model selection constants
pub mod models {
    /// Model used when the request does not name one
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// Models accepted out of the box
    pub const SUPPORTED_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "o1", "o3-mini"];
}

/// Metadata tool constants
pub mod tools {
    /// Default token budget requested from the repository gateway
    pub const CODE_CONTEXT_MAX_TOKENS: usize = 120_000;

    /// Default number of related Actors returned by a store search
    pub const SEARCH_DEFAULT_LIMIT: u32 = 10;

    /// Hard cap on the store search page size
    pub const SEARCH_MAX_LIMIT: u32 = 100;

    /// Repository gateway returning a repository as JSON
    pub const REPO_GATEWAY_URL: &str = "https://uithub.com";

    /// Path fragments excluded from code context (matched case-insensitively)
    pub const FILES_TO_SKIP: &[&str] = &[
        "license",
        "package-lock.json",
        "yarn.lock",
        "readme.md",
        "poetry.lock",
        "requirements.txt",
        "setup.py",
        "uv.lock",
    ];
}

/// Platform API constants
pub mod platform {
    /// Default API base URL
    pub const DEFAULT_API_BASE: &str = "https://api.apify.com";

    /// Environment variable holding the API token
    pub const TOKEN_ENV: &str = "APIFY_TOKEN";

    /// Environment variable holding the current run ID (set on the platform)
    pub const RUN_ID_ENV: &str = "ACTOR_RUN_ID";

    /// Environment variable holding the default dataset ID (set on the platform)
    pub const DATASET_ID_ENV: &str = "ACTOR_DEFAULT_DATASET_ID";

    /// Environment variable holding the run memory in megabytes
    pub const MEMORY_MBYTES_ENV: &str = "ACTOR_MEMORY_MBYTES";

    /// Environment variable holding the default key-value store ID (set on the platform)
    pub const KEY_VALUE_STORE_ID_ENV: &str = "ACTOR_DEFAULT_KEY_VALUE_STORE_ID";

    /// Environment variable naming the input record in that store
    pub const INPUT_KEY_ENV: &str = "ACTOR_INPUT_KEY";

    /// Input record key when `ACTOR_INPUT_KEY` is unset
    pub const DEFAULT_INPUT_KEY: &str = "INPUT";
}

/// Billing constants
pub mod billing {
    /// Event charged once when a run starts, per started GB of memory
    pub const RUN_START_EVENT: &str = "actor-start-gb";

    /// Event charged once after the report is persisted
    pub const TASK_COMPLETED_EVENT: &str = "task-completed";

    /// Default price of one run-start unit (USD)
    pub const RUN_START_PRICE_USD: f64 = 0.005;

    /// Default price of a completed inspection (USD)
    pub const TASK_COMPLETED_PRICE_USD: f64 = 0.10;

    /// Memory assumed when the platform does not report it
    pub const DEFAULT_MEMORY_MBYTES: u64 = 1024;
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Metadata API request timeout (seconds)
    pub const METADATA_TIMEOUT_SECS: u64 = 60;
}
