//! Live-state snapshots and write payloads exchanged with the resource client
//!
//! Everything here is fetched fresh for each run and never persisted.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a group or project: numeric id or full path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Id(u64),
    Path(String),
}

impl FromStr for ResourceRef {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<u64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Path(trimmed.to_string()),
        })
    }
}

impl From<u64> for ResourceRef {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ResourceRef {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(r) => r,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

/// A resolved group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHandle {
    pub id: u64,
    pub name: String,
    pub full_path: String,
}

/// A project discovered while walking the group hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub id: u64,
    pub name: String,
    /// Full path including namespace
    pub path: String,
    /// Depth of the owning group below its seed (seed = 0)
    #[serde(default)]
    pub depth: usize,
}

impl ProjectHandle {
    pub fn new(id: u64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            depth: 0,
        }
    }
}

/// Project-level settings as read from the remote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub default_branch: Option<String>,
    pub remove_source_branch_after_merge: Option<bool>,
    pub only_allow_merge_if_pipeline_succeeds: Option<bool>,
    pub squash_option: Option<String>,
    pub merge_method: Option<String>,
    pub merge_requests_template: Option<String>,
}

impl ProjectDetail {
    /// Lightweight handle for this project
    pub fn handle(&self) -> ProjectHandle {
        ProjectHandle::new(self.id, &self.name, &self.path)
    }

    /// Apply a coalesced update the same way the remote would
    pub fn apply(&mut self, update: &ProjectUpdate) {
        if let Some(v) = update.remove_source_branch_after_merge {
            self.remove_source_branch_after_merge = Some(v);
        }
        if let Some(v) = update.only_allow_merge_if_pipeline_succeeds {
            self.only_allow_merge_if_pipeline_succeeds = Some(v);
        }
        if let Some(v) = &update.squash_option {
            self.squash_option = Some(v.clone());
        }
        if let Some(v) = &update.merge_method {
            self.merge_method = Some(v.clone());
        }
        if let Some(v) = &update.merge_requests_template {
            self.merge_requests_template = v.clone();
        }
    }
}

/// Coalesced set of project-level writes, sent as a single save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_source_branch_after_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_allow_merge_if_pipeline_succeeds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_method: Option<String>,
    /// `Some(None)` clears the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_requests_template: Option<Option<String>>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Push rules of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRules {
    pub prevent_secrets: bool,
}

/// Coalesced push-rule writes, sent as a single save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRulesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevent_secrets: Option<bool>,
}

impl PushRulesUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Access levels understood by protected-branch rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    NoAccess,
    Developer,
    Maintainer,
}

impl AccessLevel {
    /// Numeric level used on the wire
    pub fn as_u32(self) -> u32 {
        match self {
            Self::NoAccess => 0,
            Self::Developer => 30,
            Self::Maintainer => 40,
        }
    }

    /// Human-readable description the remote reports for this level
    pub fn description(self) -> &'static str {
        match self {
            Self::NoAccess => "No one",
            Self::Developer => "Developers + Maintainers",
            Self::Maintainer => "Maintainers",
        }
    }
}

/// One entry of a protected branch access list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevelEntry {
    pub access_level: Option<u32>,
    pub access_level_description: String,
}

impl From<AccessLevel> for AccessLevelEntry {
    fn from(level: AccessLevel) -> Self {
        Self {
            access_level: Some(level.as_u32()),
            access_level_description: level.description().to_string(),
        }
    }
}

/// A protected-branch record as read from the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedBranch {
    pub name: String,
    #[serde(default)]
    pub merge_access_levels: Vec<AccessLevelEntry>,
    #[serde(default)]
    pub push_access_levels: Vec<AccessLevelEntry>,
    #[serde(default)]
    pub allow_force_push: bool,
}

impl ProtectedBranch {
    /// Descriptions of the merge access entries, in remote order
    pub fn merge_access_descriptions(&self) -> Vec<String> {
        self.merge_access_levels
            .iter()
            .map(|l| l.access_level_description.clone())
            .collect()
    }
}

/// Payload used to (re)create a protected branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedBranchSpec {
    pub name: String,
    pub merge_access_level: AccessLevel,
    pub push_access_level: AccessLevel,
    pub allow_force_push: bool,
}

impl ProtectedBranchSpec {
    /// Developers and maintainers may merge, nobody may push, no force push
    pub fn merge_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            merge_access_level: AccessLevel::Developer,
            push_access_level: AccessLevel::NoAccess,
            allow_force_push: false,
        }
    }
}

/// A member of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
}

/// An approval rule configured on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub id: u64,
    pub name: String,
    pub approvals_required: u32,
    pub applies_to_all_protected_branches: bool,
    #[serde(default)]
    pub users: Vec<Member>,
}

/// Full replacement of a rule's managed attributes, sent as one save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRuleUpdate {
    pub approvals_required: u32,
    pub applies_to_all_protected_branches: bool,
    pub user_ids: Vec<u64>,
}

/// Payload used to create an approval rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApprovalRule {
    pub name: String,
    pub approvals_required: u32,
    pub applies_to_all_protected_branches: bool,
    pub user_ids: Vec<u64>,
}
