//! Configuration document and desired-state resolution
//!
//! The document is YAML, loaded once per run and immutable afterwards:
//!
//! ```yaml
//! GITLAB_URL: "https://gitlab.com"
//! APPROVERS_GROUP: acme-org
//! approval_rules:
//!   owners: { name: "Code Owners", users: [alice, bob] }
//! default:
//!   squash_option: default_on
//!   approval_rules: [owners]
//! acme-website:
//!   squash_option: never
//! ```

mod document;
mod resolver;

pub use document::{
    APPROVAL_RULES_FIELD, ApprovalRuleConfig, ConfigDocument, DEFAULT_PROFILE, FieldSet,
    FieldValue,
};
pub use resolver::{Resolution, resolve};
