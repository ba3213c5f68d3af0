//! Fix-mode writes
//!
//! Executes a [`WritePlan`] against the remote. Branch protection goes
//! first, then approval rules, then the coalesced push-rule and project
//! saves, so each kind of batch is sent at most once per project.

use crate::client::ResourceClient;
use crate::Result;

use super::diff::{RuleWrite, WritePlan};

/// Send every write in the plan for one project
///
/// Returns the number of remote write calls made.
pub fn apply<C>(client: &C, project_id: u64, plan: &WritePlan) -> Result<usize>
where
    C: ResourceClient + ?Sized,
{
    let mut writes = 0;

    for branch in &plan.branches {
        if branch.delete_existing {
            tracing::debug!(project_id, branch = %branch.spec.name, "Removing branch protection");
            client.delete_protected_branch(project_id, &branch.spec.name)?;
            writes += 1;
        }
        tracing::debug!(project_id, branch = %branch.spec.name, "Protecting branch");
        client.create_protected_branch(project_id, &branch.spec)?;
        writes += 1;
    }

    for rule in &plan.approval_rules {
        match rule {
            RuleWrite::Create(new_rule) => {
                tracing::debug!(project_id, rule = %new_rule.name, "Creating approval rule");
                client.create_approval_rule(project_id, new_rule)?;
            }
            RuleWrite::Update { id, name, update } => {
                tracing::debug!(project_id, rule = %name, "Updating approval rule");
                client.save_approval_rule(project_id, *id, update)?;
            }
            RuleWrite::Delete { id, name } => {
                tracing::debug!(project_id, rule = %name, "Deleting approval rule");
                client.delete_approval_rule(project_id, *id)?;
            }
        }
        writes += 1;
    }

    if !plan.push_rules.is_empty() {
        client.save_push_rules(project_id, &plan.push_rules)?;
        writes += 1;
    }

    if !plan.project.is_empty() {
        client.save_project(project_id, &plan.project)?;
        writes += 1;
    }

    Ok(writes)
}
