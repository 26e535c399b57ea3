//! Global constants used throughout the stackbuild codebase.
//!
//! File names, environment variable names and defaults shared by the CLI,
//! the settings loader and the secret providers.

/// Stack document looked up in the working directory when `--file` is not given.
pub const DEFAULT_DOCUMENT_NAME: &str = "stackbuild.yaml";

/// Name of the settings file inside the settings directory.
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// Settings directory under the home directory on Unix-like systems.
pub const SETTINGS_DIR_NAME: &str = ".stackbuild";

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV_VAR: &str = "STACKBUILD_CONFIG";

/// Prefix for secrets supplied through the environment.
///
/// `secret:db-password` is read from `STACKBUILD_SECRET_DB_PASSWORD`.
pub const DEFAULT_SECRET_ENV_PREFIX: &str = "STACKBUILD_SECRET_";

/// Placeholder prefix for references to attributes of earlier resources.
pub const REF_PREFIX: &str = "ref:";

/// Placeholder prefix for secret lookups.
pub const SECRET_PREFIX: &str = "secret:";

/// Attribute used when a reference names no attribute (`ref:vpc-01`).
pub const DEFAULT_REF_ATTRIBUTE: &str = "id";

/// Argument key that receives the global tag mapping.
pub const TAGS_PARAM: &str = "tags";

/// Argument key that receives the full region identifier.
pub const REGION_PARAM: &str = "region";

/// Argument key accepted inside `args` as an alternative to the declaration's `existing` flag.
pub const EXISTING_PARAM: &str = "existing";

/// Maximum Levenshtein distance, as a percentage of the target length, for suggestions.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;
