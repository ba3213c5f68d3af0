//! Built-in managed fields
//!
//! The set of known field names is closed: anything not registered here is
//! ignored when it appears in a profile.

use super::{FieldKind, ScalarField, ValueKind};
use crate::config::{APPROVAL_RULES_FIELD, FieldValue};
use crate::model::{ProjectDetail, ProjectUpdate};

pub const REMOVE_SOURCE_BRANCH_AFTER_MERGE: &str = "remove_source_branch_after_merge";
pub const ONLY_ALLOW_MERGE_IF_PIPELINE_SUCCEEDS: &str = "only_allow_merge_if_pipeline_succeeds";
pub const SQUASH_OPTION: &str = "squash_option";
pub const MERGE_REQUESTS_TEMPLATE: &str = "merge_requests_template";
pub const MERGE_METHOD: &str = "merge_method";
pub const MERGE_ACCESS_LEVELS: &str = "merge_access_levels";
pub const PREVENT_SECRETS: &str = "prevent_secrets";

/// Accepted values for `squash_option`
pub const SQUASH_OPTIONS: &[&str] = &["never", "always", "default_on", "default_off"];

/// Returns all built-in field registrations as (name, kind) pairs.
pub fn builtin_fields() -> Vec<(&'static str, FieldKind)> {
    vec![
        (
            REMOVE_SOURCE_BRANCH_AFTER_MERGE,
            FieldKind::Scalar(ScalarField {
                name: REMOVE_SOURCE_BRANCH_AFTER_MERGE,
                kind: ValueKind::Bool,
                read: |p| p.remove_source_branch_after_merge.into(),
                write: |u, v| u.remove_source_branch_after_merge = v.as_bool(),
                display: plain,
                redacted: false,
            }),
        ),
        (
            ONLY_ALLOW_MERGE_IF_PIPELINE_SUCCEEDS,
            FieldKind::Scalar(ScalarField {
                name: ONLY_ALLOW_MERGE_IF_PIPELINE_SUCCEEDS,
                kind: ValueKind::Bool,
                read: |p| p.only_allow_merge_if_pipeline_succeeds.into(),
                write: |u, v| u.only_allow_merge_if_pipeline_succeeds = v.as_bool(),
                display: plain,
                redacted: false,
            }),
        ),
        (
            SQUASH_OPTION,
            FieldKind::Scalar(ScalarField {
                name: SQUASH_OPTION,
                kind: ValueKind::Enum(SQUASH_OPTIONS),
                read: |p| p.squash_option.clone().into(),
                write: |u, v| u.squash_option = v.as_text().map(str::to_string),
                display: plain,
                redacted: false,
            }),
        ),
        (
            MERGE_REQUESTS_TEMPLATE,
            FieldKind::Scalar(ScalarField {
                name: MERGE_REQUESTS_TEMPLATE,
                kind: ValueKind::Text { nullable: true },
                read: read_template,
                write: write_template,
                display: display_template,
                redacted: true,
            }),
        ),
        (MERGE_METHOD, FieldKind::MergeMethod),
        (MERGE_ACCESS_LEVELS, FieldKind::MergeAccessLevels),
        (PREVENT_SECRETS, FieldKind::PreventSecrets),
        (APPROVAL_RULES_FIELD, FieldKind::ApprovalRules),
    ]
}

fn plain(current: &FieldValue, _expected: &FieldValue) -> String {
    current.to_string()
}

fn read_template(project: &ProjectDetail) -> FieldValue {
    project.merge_requests_template.clone().into()
}

fn write_template(update: &mut ProjectUpdate, value: &FieldValue) {
    update.merge_requests_template = Some(value.as_text().map(str::to_string));
}

/// Templates are long; the report only says whether one matches
pub fn display_template(current: &FieldValue, expected: &FieldValue) -> String {
    match current {
        FieldValue::Null => FieldValue::Null.to_string(),
        _ if current != expected => "Unexpected Template".to_string(),
        _ => "Template matches configuration".to_string(),
    }
}
