use axum::http::Method;
use std::fmt;

use crate::datastore::UpdateMode;

/// The three write operations accepted on routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMethod {
    /// POST: create only
    Create,
    /// PUT: update if present, otherwise create
    Replace,
    /// PATCH: partial update of an existing route
    Patch,
}

/// First store call a method issues for the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Insert,
    Update(UpdateMode),
}

/// Per-method behaviour of the write pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodPlan {
    /// Create the owning app when it does not exist yet
    pub provisions_app: bool,
    /// The route path comes from the URL and may not be contradicted by the body
    pub path_from_url: bool,
    /// Zero-valued fields mean "leave unchanged" during validation
    pub partial: bool,
    pub primary: StoreAction,
    /// Fall back to an insert when the primary update reports route-not-found
    pub insert_on_missing: bool,
}

impl WriteMethod {
    pub const fn plan(self) -> MethodPlan {
        match self {
            WriteMethod::Create => MethodPlan {
                provisions_app: true,
                path_from_url: false,
                partial: false,
                primary: StoreAction::Insert,
                insert_on_missing: false,
            },
            WriteMethod::Replace => MethodPlan {
                provisions_app: true,
                path_from_url: true,
                partial: false,
                primary: StoreAction::Update(UpdateMode::Replace),
                insert_on_missing: true,
            },
            WriteMethod::Patch => MethodPlan {
                provisions_app: false,
                path_from_url: true,
                partial: true,
                primary: StoreAction::Update(UpdateMode::Merge),
                insert_on_missing: false,
            },
        }
    }

    pub fn as_http(self) -> Method {
        match self {
            WriteMethod::Create => Method::POST,
            WriteMethod::Replace => Method::PUT,
            WriteMethod::Patch => Method::PATCH,
        }
    }
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_http().as_str())
    }
}
