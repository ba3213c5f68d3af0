//! Resource client boundary
//!
//! The reconciliation engine talks to the remote only through
//! [`ResourceClient`]. Implementations own transport, authentication,
//! timeouts and pagination of "list all" calls.

use crate::error::ClientResult;
use crate::model::{
    ApprovalRule, ApprovalRuleUpdate, GroupHandle, Member, NewApprovalRule, ProjectDetail,
    ProjectHandle, ProjectUpdate, ProtectedBranch, ProtectedBranchSpec, PushRules,
    PushRulesUpdate, ResourceRef,
};

/// One page of a paginated listing (1-based page numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

/// Operations the engine needs from the remote
pub trait ResourceClient {
    /// Resolve a group by id or full path
    fn get_group(&self, group: &ResourceRef) -> ClientResult<GroupHandle>;

    /// List one page of non-archived projects owned directly by a group
    fn list_group_projects(&self, group_id: u64, page: PageRequest)
    -> ClientResult<Vec<ProjectHandle>>;

    /// List all non-archived direct subgroups of a group
    fn list_subgroups(&self, group_id: u64) -> ClientResult<Vec<GroupHandle>>;

    /// List all members of a group
    fn list_group_members(&self, group: &ResourceRef) -> ClientResult<Vec<Member>>;

    /// Fetch full project settings
    fn get_project(&self, project: &ResourceRef) -> ClientResult<ProjectDetail>;

    /// Save a coalesced set of project-level changes
    fn save_project(&self, project_id: u64, update: &ProjectUpdate) -> ClientResult<()>;

    fn list_protected_branches(&self, project_id: u64) -> ClientResult<Vec<ProtectedBranch>>;

    fn delete_protected_branch(&self, project_id: u64, name: &str) -> ClientResult<()>;

    fn create_protected_branch(
        &self,
        project_id: u64,
        spec: &ProtectedBranchSpec,
    ) -> ClientResult<()>;

    /// Push rules of a project, `None` when the project has none configured
    fn get_push_rules(&self, project_id: u64) -> ClientResult<Option<PushRules>>;

    /// Save push rules, creating them if the project has none yet
    fn save_push_rules(&self, project_id: u64, update: &PushRulesUpdate) -> ClientResult<()>;

    fn list_approval_rules(&self, project_id: u64) -> ClientResult<Vec<ApprovalRule>>;

    fn create_approval_rule(&self, project_id: u64, rule: &NewApprovalRule) -> ClientResult<()>;

    fn save_approval_rule(
        &self,
        project_id: u64,
        rule_id: u64,
        update: &ApprovalRuleUpdate,
    ) -> ClientResult<()>;

    fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> ClientResult<()>;
}
