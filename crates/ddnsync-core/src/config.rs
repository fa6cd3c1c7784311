//! Configuration types for ddnsync
//!
//! The configuration is loaded once at startup from a TOML file, validated
//! with [`SyncConfig::validate`], and then handed to the
//! [`SyncEngine`](crate::SyncEngine). Nothing here is mutated after startup.
//!
//! ```toml
//! schedule = "*/5 * * * *"
//! timezone = "Europe/Paris"
//!
//! [provider]
//! type = "cloudflare"
//! api_token_file = "/run/secrets/cf_token"
//! zone_id = "023e105f4ecef8ad9ca31a8372d0c353"
//!
//! [[domains]]
//! name = "host.example.com"
//! record_type = "A"
//! ttl = 300
//! ```

use crate::error::{Error, Result};
use crate::schedule::Schedule;
use crate::traits::AddressFamily;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Lookup services queried for IPv4 when none are configured
pub const DEFAULT_IPV4_LOOKUPS: &[&str] = &[
    "https://api.ipify.org",
    "https://ipv4.icanhazip.com",
    "https://v4.ident.me",
];

/// Lookup services queried for IPv6 when none are configured
pub const DEFAULT_IPV6_LOOKUPS: &[&str] = &[
    "https://api6.ipify.org",
    "https://ipv6.icanhazip.com",
    "https://v6.ident.me",
];

/// Main ddnsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Public address lookup configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Domains to keep in sync, processed in this order
    #[serde(default)]
    pub domains: Vec<DomainConfig>,

    /// Cron expression for recurring mode
    #[serde(default)]
    pub schedule: Option<String>,

    /// IANA timezone the schedule is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration for the given provider with defaults everywhere else
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            lookup: LookupConfig::default(),
            domains: Vec::new(),
            schedule: None,
            timezone: default_timezone(),
            engine: EngineConfig::default(),
        }
    }

    /// Append a domain
    pub fn with_domain(mut self, domain: DomainConfig) -> Self {
        self.domains.push(domain);
        self
    }

    /// Load a configuration file
    ///
    /// Secrets referenced by file (`api_token_file`) are read here so the
    /// rest of the system only ever sees resolved values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read configuration file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml_str(&raw)?;
        config.provider.load_secrets()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(Error::config("No domains configured"));
        }

        let mut seen = HashSet::new();
        for domain in &self.domains {
            domain.validate()?;
            if !seen.insert((domain.fqdn(), domain.record_type)) {
                return Err(Error::config(format!(
                    "Duplicate domain {} (type {})",
                    domain.name, domain.record_type
                )));
            }
        }

        let tz = self.timezone()?;
        if let Some(expr) = &self.schedule {
            Schedule::parse(expr, tz)?;
        }

        self.provider.validate()?;
        self.lookup.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Parse the configured timezone
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| Error::config(format!("Unknown timezone: {}", self.timezone)))
    }

    /// Address families required by at least one configured domain, in first-use order
    pub fn families(&self) -> Vec<AddressFamily> {
        let mut families = Vec::new();
        for domain in &self.domains {
            let family = domain.record_type.family();
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// DNS record type managed by ddnsync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Address family this record type publishes
    pub fn family(self) -> AddressFamily {
        match self {
            RecordType::A => AddressFamily::V4,
            RecordType::Aaaa => AddressFamily::V6,
        }
    }

    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::config(format!(
                "Unsupported record type '{}' (supported: A, AAAA)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

/// One DNS record to keep in sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Fully-qualified record name (e.g., "host.example.com")
    pub name: String,

    /// Record type, which also selects the address family
    pub record_type: RecordType,

    /// Time-to-live to publish
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Provider-specific routing identifier
    #[serde(default)]
    pub routing_id: Option<String>,
}

impl DomainConfig {
    /// Create a domain entry with the default TTL
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl: default_ttl(),
            routing_id: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the routing identifier
    pub fn with_routing_id(mut self, routing_id: impl Into<String>) -> Self {
        self.routing_id = Some(routing_id.into());
        self
    }

    /// Lowercased name without the trailing root dot
    pub fn fqdn(&self) -> String {
        self.name.trim().trim_end_matches('.').to_ascii_lowercase()
    }

    fn validate(&self) -> Result<()> {
        validate_domain_name(&self.fqdn())?;
        if self.ttl == 0 {
            return Err(Error::config(format!("TTL for {} must be > 0", self.name)));
        }
        if let Some(routing_id) = &self.routing_id
            && routing_id.trim().is_empty()
        {
            return Err(Error::config(format!(
                "Routing id for {} cannot be empty",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_ttl() -> u32 {
    300
}

/// Basic RFC 1035 name check; catches common mistakes, not exhaustive
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // '*' and '_' appear in wildcard and service labels
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        #[serde(default)]
        api_token: Option<String>,
        /// File holding the API token (e.g., a mounted secret)
        #[serde(default)]
        api_token_file: Option<PathBuf>,
        /// Zone ID (optional, can be auto-detected)
        #[serde(default)]
        zone_id: Option<String>,
    },

    /// Custom provider registered under a factory name
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Cloudflare provider with an inline token
    pub fn cloudflare(api_token: impl Into<String>, zone_id: Option<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: Some(api_token.into()),
            api_token_file: None,
            zone_id,
        }
    }

    /// Read file-referenced secrets into their inline fields
    pub fn load_secrets(&mut self) -> Result<()> {
        if let ProviderConfig::Cloudflare {
            api_token,
            api_token_file: Some(path),
            ..
        } = self
        {
            if api_token.is_some() {
                return Err(Error::config(
                    "Set only one of api_token and api_token_file",
                ));
            }
            let token = std::fs::read_to_string(&*path).map_err(|e| {
                Error::config(format!("Cannot read API token file {}: {}", path.display(), e))
            })?;
            *api_token = Some(token.trim().to_string());
        }
        Ok(())
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_token_file,
                ..
            } => {
                match api_token {
                    Some(token) if token.trim().is_empty() => {
                        Err(Error::config("Cloudflare API token cannot be empty"))
                    }
                    None if api_token_file.is_none() => {
                        Err(Error::config("Cloudflare API token cannot be empty"))
                    }
                    _ => Ok(()),
                }
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom provider factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom provider config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Tokens never reach logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_token_file,
                zone_id,
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &api_token.as_ref().map(|_| "<REDACTED>"))
                .field("api_token_file", api_token_file)
                .field("zone_id", zone_id)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Public address lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// IPv4 lookup URLs, tried in order (defaults when empty)
    #[serde(default)]
    pub ipv4: Vec<String>,

    /// IPv6 lookup URLs, tried in order (defaults when empty)
    #[serde(default)]
    pub ipv6: Vec<String>,

    /// Timeout for a single lookup, in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl LookupConfig {
    /// Lookup URLs for a family, falling back to the built-in services
    pub fn urls_for(&self, family: AddressFamily) -> Vec<String> {
        let (configured, defaults) = match family {
            AddressFamily::V4 => (&self.ipv4, DEFAULT_IPV4_LOOKUPS),
            AddressFamily::V6 => (&self.ipv6, DEFAULT_IPV6_LOOKUPS),
        };
        if configured.is_empty() {
            defaults.iter().map(|s| s.to_string()).collect()
        } else {
            configured.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::config("Lookup timeout must be > 0"));
        }
        for url in self.ipv4.iter().chain(&self.ipv6) {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "Lookup URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }
        Ok(())
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            ipv4: Vec::new(),
            ipv6: Vec::new(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for a single provider read or write, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Log intended writes instead of performing them
    #[serde(default)]
    pub dry_run: bool,
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.provider_timeout_secs == 0 {
            return Err(Error::config("Provider timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            dry_run: false,
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    30
}
