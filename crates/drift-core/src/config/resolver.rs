//! Desired-state resolution
//!
//! A project is matched to a profile by its exact name. A named profile
//! replaces `default` entirely; the two are never merged, so the set of
//! managed fields can differ per project.

use crate::model::ProjectHandle;

use super::document::{ConfigDocument, DEFAULT_PROFILE, FieldSet};

/// The profile chosen for a project
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    /// Name of the selected profile
    pub profile: &'a str,
    /// Fields to reconcile; fields absent here are left untouched
    pub fields: &'a FieldSet,
}

impl Resolution<'_> {
    pub fn is_default(&self) -> bool {
        self.profile == DEFAULT_PROFILE
    }
}

/// Resolve the expected field set for a project
///
/// Never fails: a validated document always carries `default`.
pub fn resolve<'a>(project: &'a ProjectHandle, config: &'a ConfigDocument) -> Resolution<'a> {
    match config.profile(&project.name) {
        Some(fields) => Resolution {
            profile: &project.name,
            fields,
        },
        None => Resolution {
            profile: DEFAULT_PROFILE,
            fields: config.default_profile(),
        },
    }
}
