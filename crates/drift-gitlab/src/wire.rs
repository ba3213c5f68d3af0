//! JSON shapes of the GitLab REST API
//!
//! Response types are decoded leniently (unknown keys ignored, optional keys
//! defaulted) and converted into `drift-core` models. Request types mirror
//! the parameters GitLab expects on write endpoints.

use drift_core::{
    AccessLevelEntry, ApprovalRule, GroupHandle, Member, NewApprovalRule, ProjectDetail,
    ProjectHandle, ProtectedBranch, ProtectedBranchSpec, PushRules,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct GroupDto {
    pub id: u64,
    pub name: String,
    pub full_path: String,
}

impl From<GroupDto> for GroupHandle {
    fn from(dto: GroupDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            full_path: dto.full_path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDto {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub remove_source_branch_after_merge: Option<bool>,
    #[serde(default)]
    pub only_allow_merge_if_pipeline_succeeds: Option<bool>,
    #[serde(default)]
    pub squash_option: Option<String>,
    #[serde(default)]
    pub merge_method: Option<String>,
    #[serde(default)]
    pub merge_requests_template: Option<String>,
}

impl From<ProjectDto> for ProjectDetail {
    fn from(dto: ProjectDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            path: dto.path_with_namespace,
            default_branch: dto.default_branch,
            remove_source_branch_after_merge: dto.remove_source_branch_after_merge,
            only_allow_merge_if_pipeline_succeeds: dto.only_allow_merge_if_pipeline_succeeds,
            squash_option: dto.squash_option,
            merge_method: dto.merge_method,
            merge_requests_template: dto.merge_requests_template,
        }
    }
}

impl From<ProjectDto> for ProjectHandle {
    fn from(dto: ProjectDto) -> Self {
        ProjectHandle::new(dto.id, dto.name, dto.path_with_namespace)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessLevelDto {
    #[serde(default)]
    pub access_level: Option<u32>,
    #[serde(default)]
    pub access_level_description: String,
}

impl From<AccessLevelDto> for AccessLevelEntry {
    fn from(dto: AccessLevelDto) -> Self {
        Self {
            access_level: dto.access_level,
            access_level_description: dto.access_level_description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedBranchDto {
    pub name: String,
    #[serde(default)]
    pub merge_access_levels: Vec<AccessLevelDto>,
    #[serde(default)]
    pub push_access_levels: Vec<AccessLevelDto>,
    #[serde(default)]
    pub allow_force_push: bool,
}

impl From<ProtectedBranchDto> for ProtectedBranch {
    fn from(dto: ProtectedBranchDto) -> Self {
        Self {
            name: dto.name,
            merge_access_levels: dto.merge_access_levels.into_iter().map(Into::into).collect(),
            push_access_levels: dto.push_access_levels.into_iter().map(Into::into).collect(),
            allow_force_push: dto.allow_force_push,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRuleDto {
    #[serde(default)]
    pub prevent_secrets: bool,
}

impl From<PushRuleDto> for PushRules {
    fn from(dto: PushRuleDto) -> Self {
        Self {
            prevent_secrets: dto.prevent_secrets,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberDto {
    pub id: u64,
    pub username: String,
}

impl From<MemberDto> for Member {
    fn from(dto: MemberDto) -> Self {
        Self {
            id: dto.id,
            username: dto.username,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRuleDto {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub approvals_required: u32,
    #[serde(default)]
    pub applies_to_all_protected_branches: bool,
    #[serde(default)]
    pub users: Vec<MemberDto>,
}

impl From<ApprovalRuleDto> for ApprovalRule {
    fn from(dto: ApprovalRuleDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            approvals_required: dto.approvals_required,
            applies_to_all_protected_branches: dto.applies_to_all_protected_branches,
            users: dto.users.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body of `POST /projects/:id/protected_branches`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectBranchRequest<'a> {
    pub name: &'a str,
    pub merge_access_level: u32,
    pub push_access_level: u32,
    pub allow_force_push: bool,
}

impl<'a> From<&'a ProtectedBranchSpec> for ProtectBranchRequest<'a> {
    fn from(spec: &'a ProtectedBranchSpec) -> Self {
        Self {
            name: &spec.name,
            merge_access_level: spec.merge_access_level.as_u32(),
            push_access_level: spec.push_access_level.as_u32(),
            allow_force_push: spec.allow_force_push,
        }
    }
}

/// Body of `POST /projects/:id/approval_rules`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateApprovalRuleRequest<'a> {
    pub name: &'a str,
    pub approvals_required: u32,
    pub applies_to_all_protected_branches: bool,
    pub user_ids: &'a [u64],
}

impl<'a> From<&'a NewApprovalRule> for CreateApprovalRuleRequest<'a> {
    fn from(rule: &'a NewApprovalRule) -> Self {
        Self {
            name: &rule.name,
            approvals_required: rule.approvals_required,
            applies_to_all_protected_branches: rule.applies_to_all_protected_branches,
            user_ids: &rule.user_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::AccessLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn protect_request_uses_numeric_levels() {
        let spec = ProtectedBranchSpec::merge_only("main");
        let body = serde_json::to_value(ProtectBranchRequest::from(&spec)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "main",
                "merge_access_level": AccessLevel::Developer.as_u32(),
                "push_access_level": 0,
                "allow_force_push": false,
            })
        );
    }

    #[test]
    fn project_without_optional_keys_decodes() {
        let dto: ProjectDto = serde_json::from_str(
            r#"{
                "id": 3,
                "name": "empty",
                "path_with_namespace": "acme/empty",
                "default_branch": null
            }"#,
        )
        .unwrap();
        let detail = ProjectDetail::from(dto);
        assert_eq!(detail.path, "acme/empty");
        assert_eq!(detail.default_branch, None);
        assert_eq!(detail.merge_method, None);
    }
}
