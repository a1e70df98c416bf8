//! Shared limits and defaults.

/// Maximum statements accepted by one batch-statement round-trip.
pub const MAX_BATCH_STATEMENTS: usize = 25;

/// Items aggregated into one scan page before a continuation token is returned.
pub const DEFAULT_SCAN_PAGE_CAP: usize = 1000;

/// Table names requested per list-tables round-trip (the service maximum).
pub const LIST_TABLES_PAGE_SIZE: usize = 100;

/// Failure messages shown to the operator after a partially failed batch.
pub const DEFAULT_FAILURE_PREVIEW: usize = 5;

pub const DEFAULT_MODEL_ID: &str = "amazon.nova-lite-v1:0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1000;

/// Environment variable holding the bearer token for the model endpoint.
pub const DEFAULT_API_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

pub const CONFIG_DIR_NAME: &str = "dynotui";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Filter directive variable read by [`crate::telemetry::init_tracing`].
pub const LOG_ENV_VAR: &str = "DYNOTUI_LOG";

/// Placeholder replaced by the formatted partition key value.
pub const PK_PLACEHOLDER: &str = "{{PK}}";
/// Placeholder replaced by the formatted sort key value.
pub const SK_PLACEHOLDER: &str = "{{SK}}";
