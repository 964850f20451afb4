//! Import run and destination store configuration

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Offset added to legacy `member_id` values under [`IdentifierPolicy::Offset`]
pub const MEMBER_ID_OFFSET: i64 = 1_000_000;

/// Default suffix appended to e-mail addresses when suffixing is enabled
pub const DEFAULT_EMAIL_SUFFIX: &str = ".imported";

/// How legacy `member_id` values are written to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPolicy {
    /// Keep legacy ids as they are
    #[default]
    Preserve,
    /// Shift legacy ids by [`MEMBER_ID_OFFSET`] to avoid colliding with
    /// members that already exist in the destination
    Offset,
}

impl IdentifierPolicy {
    pub fn offset(self) -> i64 {
        match self {
            IdentifierPolicy::Preserve => 0,
            IdentifierPolicy::Offset => MEMBER_ID_OFFSET,
        }
    }
}

/// Transform applied to member e-mail addresses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTransform {
    #[default]
    Identity,
    /// Append a suffix, e.g. `ann@example.com.imported`
    Suffix(String),
}

impl EmailTransform {
    pub fn apply(&self, email: &str) -> String {
        match self {
            EmailTransform::Identity => email.to_string(),
            EmailTransform::Suffix(suffix) => format!("{email}{suffix}"),
        }
    }
}

/// Which imported images are flagged `is_primary`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryImagePolicy {
    /// Only the first image imported in the whole run
    #[default]
    FirstOverall,
    /// The first image imported for each member
    FirstPerMember,
}

impl std::str::FromStr for PrimaryImagePolicy {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "first-overall" => Ok(PrimaryImagePolicy::FirstOverall),
            "first-per-member" => Ok(PrimaryImagePolicy::FirstPerMember),
            _ => Err(ImportError::config(format!(
                "Invalid primary image policy '{s}' (expected first-overall or first-per-member)"
            ))),
        }
    }
}

/// Parameters of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub identifier_policy: IdentifierPolicy,
    pub email_transform: EmailTransform,
    pub primary_image: PrimaryImagePolicy,
    /// Attempt at most this many tuples per kind (None for unlimited)
    pub parse_limit: Option<usize>,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn with_email_transform(mut self, transform: EmailTransform) -> Self {
        self.email_transform = transform;
        self
    }

    pub fn with_email_suffix(self, suffix: impl Into<String>) -> Self {
        self.with_email_transform(EmailTransform::Suffix(suffix.into()))
    }

    pub fn with_primary_image(mut self, policy: PrimaryImagePolicy) -> Self {
        self.primary_image = policy;
        self
    }

    /// Set parse limit
    pub fn with_parse_limit(mut self, limit: usize) -> Self {
        self.parse_limit = Some(limit);
        self
    }

    /// Offset applied to `member_id`
    pub fn member_id_offset(&self) -> i64 {
        self.identifier_policy.offset()
    }
}

/// Connection settings for the hosted backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service-role key sent as both `apikey` and bearer token
    pub service_role_key: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Rows per page when listing a table (default: 1000)
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_role_key: String::new(),
            timeout_secs: 30,
            page_size: 1000,
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_role_key: service_role_key.into(),
            ..Self::default()
        }
    }

    /// Load from the environment, honouring a `.env` file
    ///
    /// - `SUPABASE_URL` (required)
    /// - `SUPABASE_SERVICE_ROLE_KEY` (required)
    /// - `TH_STORE_TIMEOUT_SECS`
    /// - `TH_STORE_PAGE_SIZE`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| ImportError::config("SUPABASE_URL is not set"))?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| ImportError::config("SUPABASE_SERVICE_ROLE_KEY is not set"))?;

        let mut config = Self::new(url, service_role_key);

        if let Ok(timeout) = std::env::var("TH_STORE_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                ImportError::config(format!("Invalid TH_STORE_TIMEOUT_SECS: {timeout}"))
            })?;
        }

        if let Ok(page_size) = std::env::var("TH_STORE_PAGE_SIZE") {
            config.page_size = page_size.parse().map_err(|_| {
                ImportError::config(format!("Invalid TH_STORE_PAGE_SIZE: {page_size}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ImportError::config(format!(
                "Store URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.service_role_key.trim().is_empty() {
            return Err(ImportError::config("Service role key is empty"));
        }
        if self.page_size == 0 {
            return Err(ImportError::config("Page size must be greater than zero"));
        }
        Ok(())
    }

    /// `{url}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}
