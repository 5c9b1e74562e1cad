use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const TYPE_SYNC: &str = "sync";
pub const TYPE_ASYNC: &str = "async";

pub const FORMAT_DEFAULT: &str = "default";
pub const FORMAT_HTTP: &str = "http";
pub const FORMAT_JSON: &str = "json";

pub const DEFAULT_MEMORY_MB: u64 = 128;
pub const MAX_MEMORY_MB: u64 = 8192;
pub const DEFAULT_TIMEOUT_SECS: i32 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: i32 = 30;
pub const MAX_SYNC_TIMEOUT_SECS: i32 = 120;
pub const MAX_ASYNC_TIMEOUT_SECS: i32 = 3600;
pub const MAX_IDLE_TIMEOUT_SECS: i32 = 3600;

pub const MAX_APP_NAME_LEN: usize = 30;

/// Field-level validation failures for apps and routes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing app name")]
    MissingAppName,
    #[error("App name must be 30 characters or less")]
    AppNameTooLong,
    #[error("Invalid app name")]
    InvalidAppName,
    #[error("Missing route AppName")]
    MissingRouteAppName,
    #[error("Missing route Path")]
    MissingPath,
    #[error("Invalid Path format")]
    InvalidPath,
    #[error("Dynamic URL is not allowed")]
    DynamicPath,
    #[error("Missing route Image")]
    MissingImage,
    #[error("Invalid route Type")]
    InvalidType,
    #[error("Invalid route Format")]
    InvalidFormat,
    #[error("Route memory must be at most 8192 MB")]
    MemoryTooLarge,
    #[error("Negative timeout")]
    NegativeTimeout,
    #[error("Timeout must be at most {max} seconds for this route type")]
    TimeoutTooLarge { max: i32 },
    #[error("Negative idle timeout")]
    NegativeIdleTimeout,
    #[error("Idle timeout must be at most 3600 seconds")]
    IdleTimeoutTooLarge,
}

/// A logical namespace that owns routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct App {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl App {
    /// Minimal record used when an app is provisioned on demand
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingAppName);
        }
        if self.name.chars().count() > MAX_APP_NAME_LEN {
            return Err(ValidationError::AppNameTooLong);
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidAppName);
        }
        Ok(())
    }
}

/// A path mapping owned by an app
///
/// Zero values (empty strings, `0`, empty maps) mean "not specified". That is
/// what lets a PATCH body carry only the fields it wants to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct Route {
    pub app_name: String,
    pub path: String,
    pub image: String,
    pub memory: u64,
    #[serde(rename = "type")]
    pub route_type: String,
    pub format: String,
    pub timeout: i32,
    pub idle_timeout: i32,
    pub headers: BTreeMap<String, Vec<String>>,
    pub config: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Route {
    /// Fill every unset field with its default
    pub fn set_defaults(&mut self) {
        if self.memory == 0 {
            self.memory = DEFAULT_MEMORY_MB;
        }
        if self.route_type.is_empty() {
            self.route_type = TYPE_SYNC.to_string();
        }
        if self.format.is_empty() {
            self.format = FORMAT_DEFAULT.to_string();
        }
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
        if self.idle_timeout == 0 {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT_SECS;
        }
    }

    /// Validate the route
    ///
    /// With `partial` set, zero-valued fields are treated as "leave unchanged"
    /// rather than as missing.
    pub fn validate(&self, partial: bool) -> Result<(), ValidationError> {
        if !partial {
            if self.app_name.is_empty() {
                return Err(ValidationError::MissingRouteAppName);
            }
            if self.path.is_empty() {
                return Err(ValidationError::MissingPath);
            }
            if self.image.is_empty() {
                return Err(ValidationError::MissingImage);
            }
        }

        if !partial || !self.path.is_empty() {
            if !self.path.starts_with('/') || self.path.contains(['?', '#']) {
                return Err(ValidationError::InvalidPath);
            }
            if self.path.split('/').any(|segment| segment.starts_with(':')) {
                return Err(ValidationError::DynamicPath);
            }
        }

        if (!partial || !self.route_type.is_empty())
            && self.route_type != TYPE_SYNC
            && self.route_type != TYPE_ASYNC
        {
            return Err(ValidationError::InvalidType);
        }

        if (!partial || !self.format.is_empty())
            && ![FORMAT_DEFAULT, FORMAT_HTTP, FORMAT_JSON].contains(&self.format.as_str())
        {
            return Err(ValidationError::InvalidFormat);
        }

        if self.memory > MAX_MEMORY_MB {
            return Err(ValidationError::MemoryTooLarge);
        }

        if self.timeout < 0 {
            return Err(ValidationError::NegativeTimeout);
        }
        let max_timeout = if self.route_type == TYPE_ASYNC {
            MAX_ASYNC_TIMEOUT_SECS
        } else {
            MAX_SYNC_TIMEOUT_SECS
        };
        if self.timeout > max_timeout {
            return Err(ValidationError::TimeoutTooLarge { max: max_timeout });
        }

        if self.idle_timeout < 0 {
            return Err(ValidationError::NegativeIdleTimeout);
        }
        if self.idle_timeout > MAX_IDLE_TIMEOUT_SECS {
            return Err(ValidationError::IdleTimeoutTooLarge);
        }

        Ok(())
    }

    /// Merge the specified fields of `patch` into this route
    ///
    /// Identity fields and `created_at` never change. Header and config
    /// entries with an empty value remove the stored key.
    pub fn merge(&mut self, patch: &Route) {
        if !patch.image.is_empty() {
            self.image = patch.image.clone();
        }
        if patch.memory != 0 {
            self.memory = patch.memory;
        }
        if !patch.route_type.is_empty() {
            self.route_type = patch.route_type.clone();
        }
        if !patch.format.is_empty() {
            self.format = patch.format.clone();
        }
        if patch.timeout != 0 {
            self.timeout = patch.timeout;
        }
        if patch.idle_timeout != 0 {
            self.idle_timeout = patch.idle_timeout;
        }
        for (name, values) in &patch.headers {
            if values.is_empty() {
                self.headers.remove(name);
            } else {
                self.headers.insert(name.clone(), values.clone());
            }
        }
        for (key, value) in &patch.config {
            if value.is_empty() {
                self.config.remove(key);
            } else {
                self.config.insert(key.clone(), value.clone());
            }
        }
    }

    /// Replace every user-controlled field with those of `other`
    pub fn replace_with(&mut self, other: &Route) {
        let created_at = self.created_at;
        *self = Route {
            app_name: self.app_name.clone(),
            path: self.path.clone(),
            created_at,
            updated_at: self.updated_at,
            ..other.clone()
        };
    }
}

/// Request envelope for route writes
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RouteWrapper {
    #[serde(default)]
    pub route: Option<Route>,
}

/// Response type for successful route writes
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RouteResponse {
    pub message: String,
    pub route: Route,
}

/// Response type for GET on a single route
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GetRouteResponse {
    pub route: Route,
}
