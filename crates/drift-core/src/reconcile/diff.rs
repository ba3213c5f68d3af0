//! Pure drift detection
//!
//! Compares an immutable live snapshot with the resolved field set and
//! produces change records, report cells and the write plan. Nothing here
//! talks to the remote, so dry-run and fix runs detect identical drift.

use std::collections::BTreeSet;

use crate::config::{ApprovalRuleConfig, ConfigDocument, FieldValue, Resolution};
use crate::context::RunContext;
use crate::fields::{FieldKind, FieldLookup, FieldRegistry, ScalarField};
use crate::model::{
    AccessLevel, ApprovalRule, ApprovalRuleUpdate, NewApprovalRule, ProjectUpdate,
    ProtectedBranchSpec, PushRulesUpdate,
};
use crate::report::{
    ChangeRecord, DEFAULT_BRANCH_COLUMN, MembershipDelta, PROJECT_COLUMN,
    PROTECTED_BRANCHES_COLUMN, ReportCell,
};
use crate::{Error, Result};

use super::snapshot::LiveSnapshot;

/// Merge method forced on projects with a `main` default branch
pub const FAST_FORWARD: &str = "ff";

/// Only default branch name eligible for fast-forward merges
pub const FAST_FORWARD_BRANCH: &str = "main";

/// (Re)protection of a branch: delete the existing rule, then create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReprotect {
    pub spec: ProtectedBranchSpec,
    /// False when the branch has no protection record to delete
    pub delete_existing: bool,
}

/// A single approval-rule write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleWrite {
    Create(NewApprovalRule),
    Update {
        id: u64,
        name: String,
        update: ApprovalRuleUpdate,
    },
    Delete {
        id: u64,
        name: String,
    },
}

/// Every write needed to converge one project
///
/// Project-level and push-rule changes are coalesced into at most one save
/// each; branch and approval-rule writes are per item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePlan {
    pub project: ProjectUpdate,
    pub push_rules: PushRulesUpdate,
    pub branches: Vec<BranchReprotect>,
    pub approval_rules: Vec<RuleWrite>,
}

impl WritePlan {
    pub fn is_empty(&self) -> bool {
        self.project.is_empty()
            && self.push_rules.is_empty()
            && self.branches.is_empty()
            && self.approval_rules.is_empty()
    }
}

/// Output of the diff step for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDiff {
    pub cells: Vec<ReportCell>,
    pub changes: Vec<ChangeRecord>,
    pub plan: WritePlan,
}

impl ProjectDiff {
    fn record(&mut self, change: ChangeRecord) {
        self.changes.push(change);
    }

    fn cell(&mut self, column: &str, value: impl Into<String>, changed: bool) {
        self.cells.push(ReportCell::new(column, value, changed));
    }
}

/// Compares live snapshots against resolved profiles
pub struct DriftDetector<'a> {
    registry: &'a FieldRegistry,
    config: &'a ConfigDocument,
    context: &'a RunContext,
}

impl<'a> DriftDetector<'a> {
    pub fn new(
        registry: &'a FieldRegistry,
        config: &'a ConfigDocument,
        context: &'a RunContext,
    ) -> Self {
        Self {
            registry,
            config,
            context,
        }
    }

    /// Diff one project's live state against its resolved field set
    pub fn diff(&self, snapshot: &LiveSnapshot, resolution: Resolution<'_>) -> Result<ProjectDiff> {
        let project = &snapshot.project;
        let mut diff = ProjectDiff::default();

        diff.cell(PROJECT_COLUMN, &project.name, false);
        diff.cell(
            DEFAULT_BRANCH_COLUMN,
            project.default_branch.as_deref().unwrap_or("None"),
            false,
        );
        diff.cell(
            PROTECTED_BRANCHES_COLUMN,
            snapshot.protected_branch_names(),
            false,
        );

        for (name, expected) in resolution.fields.iter() {
            let kind = match self.registry.lookup(name) {
                FieldLookup::Managed(kind) => kind,
                FieldLookup::Ignored => {
                    tracing::debug!(
                        field = name,
                        managed = ?self.registry.names(),
                        "Ignoring unknown field"
                    );
                    continue;
                }
            };
            kind.value_kind().check(name, expected)?;

            let before = diff.changes.len();
            let value = match kind {
                FieldKind::Scalar(field) => Self::diff_scalar(field, snapshot, expected, &mut diff),
                FieldKind::MergeMethod => Self::diff_merge_method(name, snapshot, &mut diff),
                FieldKind::MergeAccessLevels => {
                    Self::diff_merge_access(name, snapshot, &mut diff)?
                }
                FieldKind::PreventSecrets => {
                    Self::diff_prevent_secrets(name, snapshot, expected, &mut diff)
                }
                FieldKind::ApprovalRules => {
                    self.diff_approval_rules(snapshot, resolution, expected, &mut diff)?
                }
            };
            let changed = diff.changes.len() > before;
            diff.cell(name, value, changed);
        }

        Ok(diff)
    }

    fn diff_scalar(
        field: &ScalarField,
        snapshot: &LiveSnapshot,
        expected: &FieldValue,
        diff: &mut ProjectDiff,
    ) -> String {
        let current = (field.read)(&snapshot.project);
        let shown = (field.display)(&current, expected);

        if field.drifted(&current, expected) {
            let (previous, wanted) = if field.redacted {
                (shown.clone(), (field.display)(expected, expected))
            } else {
                (current.to_string(), expected.to_string())
            };
            diff.record(ChangeRecord::new(field.name, previous, wanted));
            (field.write)(&mut diff.plan.project, expected);
        }
        shown
    }

    fn diff_merge_method(name: &str, snapshot: &LiveSnapshot, diff: &mut ProjectDiff) -> String {
        let project = &snapshot.project;
        let current = project.merge_method.as_deref();

        if current != Some(FAST_FORWARD)
            && project.default_branch.as_deref() == Some(FAST_FORWARD_BRANCH)
        {
            diff.record(ChangeRecord::new(
                name,
                current.unwrap_or("None"),
                FAST_FORWARD,
            ));
            diff.plan.project.merge_method = Some(FAST_FORWARD.to_string());
        }
        current.unwrap_or("None").to_string()
    }

    fn diff_merge_access(
        name: &str,
        snapshot: &LiveSnapshot,
        diff: &mut ProjectDiff,
    ) -> Result<String> {
        let project = &snapshot.project;
        let Some(default_branch) = project.default_branch.as_deref() else {
            return Err(Error::BranchProtection {
                project: project.path.clone(),
                message: "project has no default branch".to_string(),
            });
        };

        let protection = snapshot.default_branch_protection();
        let levels = match protection {
            Some(branch) => branch.merge_access_descriptions(),
            None => {
                tracing::warn!(
                    project = %project.path,
                    branch = default_branch,
                    "The default branch is not protected"
                );
                Vec::new()
            }
        };

        let expected = AccessLevel::Developer.description();
        if levels.len() != 1 || levels[0] != expected {
            diff.record(ChangeRecord::new(name, levels.join(","), expected));
            diff.plan.branches.push(BranchReprotect {
                spec: ProtectedBranchSpec::merge_only(default_branch),
                delete_existing: protection.is_some(),
            });
        }
        Ok(levels.join(","))
    }

    fn diff_prevent_secrets(
        name: &str,
        snapshot: &LiveSnapshot,
        expected: &FieldValue,
        diff: &mut ProjectDiff,
    ) -> String {
        let current = snapshot
            .push_rules
            .as_ref()
            .is_some_and(|rules| rules.prevent_secrets);
        let wanted = expected.as_bool();

        if Some(current) != wanted {
            diff.record(ChangeRecord::new(name, current.to_string(), expected.to_string()));
            diff.plan.push_rules.prevent_secrets = wanted;
        }
        current.to_string()
    }

    fn diff_approval_rules(
        &self,
        snapshot: &LiveSnapshot,
        resolution: Resolution<'_>,
        expected: &FieldValue,
        diff: &mut ProjectDiff,
    ) -> Result<String> {
        let members = self.context.members()?;
        let keys = expected.as_list().unwrap_or_default();

        let mut desired: Vec<(&ApprovalRuleConfig, Vec<(&str, u64)>)> =
            Vec::with_capacity(keys.len());
        for key in keys {
            let rule = self
                .config
                .approval_rule(key)
                .ok_or_else(|| Error::UnknownApprovalRule {
                    profile: resolution.profile.to_string(),
                    rule: key.clone(),
                })?;
            let mut users: Vec<(&str, u64)> = Vec::with_capacity(rule.users.len());
            for username in &rule.users {
                let id = members.id_for(username)?;
                if !users.iter().any(|(_, seen)| *seen == id) {
                    users.push((username.as_str(), id));
                }
            }
            desired.push((rule, users));
        }

        for live in &snapshot.approval_rules {
            let field = rule_field(&live.name);
            match desired.iter().find(|(rule, _)| rule.name == live.name) {
                None => {
                    diff.record(ChangeRecord::new(field, summarize_live(live), "absent"));
                    diff.plan.approval_rules.push(RuleWrite::Delete {
                        id: live.id,
                        name: live.name.clone(),
                    });
                }
                Some((rule, users)) => {
                    let delta = membership_delta(live, users);
                    let drifted = live.approvals_required != rule.approvals_required
                        || live.applies_to_all_protected_branches
                            != rule.applies_to_all_protected_branches
                        || !delta.is_empty();
                    if !drifted {
                        continue;
                    }

                    let mut change =
                        ChangeRecord::new(field, summarize_live(live), summarize_config(rule));
                    if !delta.is_empty() {
                        change = change.with_delta(delta);
                    }
                    diff.record(change);
                    diff.plan.approval_rules.push(RuleWrite::Update {
                        id: live.id,
                        name: live.name.clone(),
                        update: ApprovalRuleUpdate {
                            approvals_required: rule.approvals_required,
                            applies_to_all_protected_branches: rule
                                .applies_to_all_protected_branches,
                            user_ids: user_ids(users),
                        },
                    });
                }
            }
        }

        for (rule, users) in &desired {
            if snapshot.approval_rules.iter().any(|live| live.name == rule.name) {
                continue;
            }
            diff.record(ChangeRecord::new(
                rule_field(&rule.name),
                "absent",
                summarize_config(rule),
            ));
            diff.plan.approval_rules.push(RuleWrite::Create(NewApprovalRule {
                name: rule.name.clone(),
                approvals_required: rule.approvals_required,
                applies_to_all_protected_branches: rule.applies_to_all_protected_branches,
                user_ids: user_ids(users),
            }));
        }

        Ok(snapshot
            .approval_rules
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", "))
    }
}

/// Field name used in change records for one approval rule
pub fn rule_field(rule_name: &str) -> String {
    format!("approval_rule:{}", rule_name)
}

/// Symmetric difference of a live rule's users and the configured users
fn membership_delta(live: &ApprovalRule, desired: &[(&str, u64)]) -> MembershipDelta {
    let live_ids: BTreeSet<u64> = live.users.iter().map(|u| u.id).collect();
    let wanted: BTreeSet<u64> = desired.iter().map(|(_, id)| *id).collect();

    let removed = live
        .users
        .iter()
        .filter(|u| !wanted.contains(&u.id))
        .map(|u| u.username.clone())
        .collect();
    let added = desired
        .iter()
        .filter(|(_, id)| !live_ids.contains(id))
        .map(|(username, _)| username.to_string())
        .collect();

    MembershipDelta { added, removed }
}

fn user_ids(users: &[(&str, u64)]) -> Vec<u64> {
    users.iter().map(|(_, id)| *id).collect()
}

fn summarize_live(rule: &ApprovalRule) -> String {
    let users: Vec<&str> = rule.users.iter().map(|u| u.username.as_str()).collect();
    summarize(
        rule.approvals_required,
        rule.applies_to_all_protected_branches,
        &users,
    )
}

fn summarize_config(rule: &ApprovalRuleConfig) -> String {
    let users: Vec<&str> = rule.users.iter().map(String::as_str).collect();
    summarize(
        rule.approvals_required,
        rule.applies_to_all_protected_branches,
        &users,
    )
}

fn summarize(required: u32, all_branches: bool, users: &[&str]) -> String {
    format!(
        "approvals_required={} applies_to_all_protected_branches={} users=[{}]",
        required,
        all_branches,
        users.join(", ")
    )
}
