//! Live state of one project, fetched fresh before diffing

use crate::client::ResourceClient;
use crate::config::{APPROVAL_RULES_FIELD, FieldSet};
use crate::fields::PREVENT_SECRETS;
use crate::model::{ApprovalRule, ProjectDetail, ProtectedBranch, PushRules};
use crate::Result;

/// Immutable snapshot of everything the diff step reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub project: ProjectDetail,
    pub protected_branches: Vec<ProtectedBranch>,
    /// `None` when push rules were not fetched or the project has none
    pub push_rules: Option<PushRules>,
    pub approval_rules: Vec<ApprovalRule>,
}

impl LiveSnapshot {
    pub fn new(project: ProjectDetail) -> Self {
        Self {
            project,
            ..Default::default()
        }
    }

    /// Fetch the parts of live state the field set needs
    ///
    /// Protected branches are always read since they appear in every report
    /// row; push rules and approval rules only when a field manages them.
    pub fn fetch<C>(client: &C, project: ProjectDetail, fields: &FieldSet) -> Result<Self>
    where
        C: ResourceClient + ?Sized,
    {
        let id = project.id;
        let protected_branches = client.list_protected_branches(id)?;

        let push_rules = if fields.contains(PREVENT_SECRETS) {
            client.get_push_rules(id)?
        } else {
            None
        };

        let approval_rules = if fields.contains(APPROVAL_RULES_FIELD) {
            client.list_approval_rules(id)?
        } else {
            Vec::new()
        };

        Ok(Self {
            project,
            protected_branches,
            push_rules,
            approval_rules,
        })
    }

    /// Protection record of the project's default branch, if any
    pub fn default_branch_protection(&self) -> Option<&ProtectedBranch> {
        let default_branch = self.project.default_branch.as_deref()?;
        self.protected_branches
            .iter()
            .find(|b| b.name == default_branch)
    }

    /// Comma-separated protected branch names
    pub fn protected_branch_names(&self) -> String {
        self.protected_branches
            .iter()
            .map(|b| b.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
