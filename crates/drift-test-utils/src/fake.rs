//! [`FakeGitLab`]: an in-memory [`ResourceClient`] with a call log.
//!
//! Writes mutate the in-memory state the same way the real API would, so a
//! second reconciliation run observes the effect of the first.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use drift_core::{
    AccessLevelEntry, ApprovalRule, ApprovalRuleUpdate, ClientError, ClientResult, GroupHandle,
    Member, NewApprovalRule, PageRequest, ProjectDetail, ProjectHandle, ProjectUpdate,
    ProtectedBranch, ProtectedBranchSpec, PushRules, PushRulesUpdate, ResourceClient, ResourceRef,
};

/// One request made against the fake, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetGroup(String),
    ListGroupProjects { group_id: u64, page: u32, per_page: u32 },
    ListSubgroups(u64),
    ListGroupMembers(String),
    GetProject(String),
    SaveProject(u64, ProjectUpdate),
    ListProtectedBranches(u64),
    DeleteProtectedBranch(u64, String),
    CreateProtectedBranch(u64, String),
    GetPushRules(u64),
    SavePushRules(u64, PushRulesUpdate),
    ListApprovalRules(u64),
    CreateApprovalRule(u64, String),
    SaveApprovalRule(u64, u64),
    DeleteApprovalRule(u64, u64),
}

impl Call {
    /// Whether this call mutates remote state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::SaveProject(..)
                | Self::DeleteProtectedBranch(..)
                | Self::CreateProtectedBranch(..)
                | Self::SavePushRules(..)
                | Self::CreateApprovalRule(..)
                | Self::SaveApprovalRule(..)
                | Self::DeleteApprovalRule(..)
        )
    }

    /// Whether this call is part of hierarchy discovery.
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            Self::GetGroup(_) | Self::ListGroupProjects { .. } | Self::ListSubgroups(_)
        )
    }
}

#[derive(Debug, Clone)]
struct FakeGroup {
    handle: GroupHandle,
    parent: Option<u64>,
    projects: Vec<u64>,
    members: Vec<Member>,
}

#[derive(Debug, Clone, Default)]
struct FakeProject {
    detail: ProjectDetail,
    protected_branches: Vec<ProtectedBranch>,
    push_rules: Option<PushRules>,
    approval_rules: Vec<ApprovalRule>,
}

#[derive(Debug, Default)]
struct FakeState {
    groups: Vec<FakeGroup>,
    projects: BTreeMap<u64, FakeProject>,
    broken_projects: HashSet<u64>,
    next_rule_id: u64,
}

impl FakeState {
    fn group(&self, reference: &ResourceRef) -> Option<&FakeGroup> {
        self.groups.iter().find(|g| match reference {
            ResourceRef::Id(id) => g.handle.id == *id,
            ResourceRef::Path(path) => g.handle.full_path == *path,
        })
    }

    fn group_by_id(&self, id: u64) -> ClientResult<&FakeGroup> {
        self.group(&ResourceRef::Id(id))
            .ok_or_else(|| ClientError::not_found(format!("group {id}")))
    }

    fn project_id(&self, reference: &ResourceRef) -> Option<u64> {
        match reference {
            ResourceRef::Id(id) => self.projects.contains_key(id).then_some(*id),
            ResourceRef::Path(path) => self
                .projects
                .values()
                .find(|p| p.detail.path == *path)
                .map(|p| p.detail.id),
        }
    }

    fn project_mut(&mut self, id: u64) -> ClientResult<&mut FakeProject> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| ClientError::not_found(format!("project {id}")))
    }

    fn member(&self, id: u64) -> ClientResult<Member> {
        self.groups
            .iter()
            .flat_map(|g| g.members.iter())
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                status: 400,
                message: format!("user {id} is not a member"),
            })
    }

    fn members(&self, ids: &[u64]) -> ClientResult<Vec<Member>> {
        ids.iter().map(|id| self.member(*id)).collect()
    }
}

/// In-memory GitLab used by engine and CLI tests.
///
/// # Example
///
/// ```rust
/// use drift_test_utils::{FakeGitLab, project};
///
/// let gitlab = FakeGitLab::new()
///     .with_group(1, "acme")
///     .with_project(1, project(10, "acme-website", "acme"));
/// assert!(gitlab.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct FakeGitLab {
    state: RefCell<FakeState>,
    calls: RefCell<Vec<Call>>,
}

impl FakeGitLab {
    /// Create an empty fake.
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.borrow_mut().next_rule_id = 1000;
        fake
    }

    /// Add a top-level group.
    pub fn with_group(self, id: u64, full_path: &str) -> Self {
        self.add_group(id, full_path, None)
    }

    /// Add a subgroup below `parent`; subgroups are listed in insertion order.
    pub fn with_subgroup(self, parent: u64, id: u64, full_path: &str) -> Self {
        self.add_group(id, full_path, Some(parent))
    }

    fn add_group(self, id: u64, full_path: &str, parent: Option<u64>) -> Self {
        let name = full_path.rsplit('/').next().unwrap_or(full_path).to_string();
        self.state.borrow_mut().groups.push(FakeGroup {
            handle: GroupHandle {
                id,
                name,
                full_path: full_path.to_string(),
            },
            parent,
            projects: Vec::new(),
            members: Vec::new(),
        });
        self
    }

    /// Add a project owned directly by `group_id`.
    ///
    /// Adding the same project to a second group makes it visible from both,
    /// which is how overlapping hierarchies are simulated.
    pub fn with_project(self, group_id: u64, detail: ProjectDetail) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let id = detail.id;
            state
                .projects
                .entry(id)
                .or_insert_with(|| FakeProject {
                    detail,
                    ..Default::default()
                });
            let group = state
                .groups
                .iter_mut()
                .find(|g| g.handle.id == group_id)
                .expect("FakeGitLab::with_project: unknown group");
            group.projects.push(id);
        }
        self
    }

    /// Add a protection record to a project.
    pub fn with_protected_branch(self, project_id: u64, branch: ProtectedBranch) -> Self {
        self.with_project_state(project_id, |p| p.protected_branches.push(branch))
    }

    /// Set a project's push rules.
    pub fn with_push_rules(self, project_id: u64, rules: PushRules) -> Self {
        self.with_project_state(project_id, |p| p.push_rules = Some(rules))
    }

    /// Add an approval rule to a project.
    pub fn with_approval_rule(self, project_id: u64, rule: ApprovalRule) -> Self {
        self.with_project_state(project_id, |p| p.approval_rules.push(rule))
    }

    /// Set the members of a group.
    pub fn with_members(self, group_id: u64, members: Vec<Member>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let group = state
                .groups
                .iter_mut()
                .find(|g| g.handle.id == group_id)
                .expect("FakeGitLab::with_members: unknown group");
            group.members = members;
        }
        self
    }

    /// Make every read of the project's protected branches fail.
    pub fn with_broken_project(self, project_id: u64) -> Self {
        self.state.borrow_mut().broken_projects.insert(project_id);
        self
    }

    fn with_project_state(self, project_id: u64, f: impl FnOnce(&mut FakeProject)) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let project = state
                .projects
                .get_mut(&project_id)
                .expect("FakeGitLab: unknown project");
            f(project);
        }
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Only the calls that mutate state.
    pub fn write_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    /// Only the discovery calls.
    pub fn discovery_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_discovery())
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping state.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Current settings of a project.
    pub fn project(&self, id: u64) -> ProjectDetail {
        self.state.borrow().projects[&id].detail.clone()
    }

    /// Current protection records of a project.
    pub fn protected_branches(&self, id: u64) -> Vec<ProtectedBranch> {
        self.state.borrow().projects[&id].protected_branches.clone()
    }

    /// Current push rules of a project.
    pub fn push_rules(&self, id: u64) -> Option<PushRules> {
        self.state.borrow().projects[&id].push_rules.clone()
    }

    /// Current approval rules of a project.
    pub fn approval_rules(&self, id: u64) -> Vec<ApprovalRule> {
        self.state.borrow().projects[&id].approval_rules.clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl ResourceClient for FakeGitLab {
    fn get_group(&self, group: &ResourceRef) -> ClientResult<GroupHandle> {
        self.record(Call::GetGroup(group.to_string()));
        self.state
            .borrow()
            .group(group)
            .map(|g| g.handle.clone())
            .ok_or_else(|| ClientError::not_found(format!("group {group}")))
    }

    fn list_group_projects(
        &self,
        group_id: u64,
        page: PageRequest,
    ) -> ClientResult<Vec<ProjectHandle>> {
        self.record(Call::ListGroupProjects {
            group_id,
            page: page.page,
            per_page: page.per_page,
        });
        let state = self.state.borrow();
        let group = state.group_by_id(group_id)?;
        let start = (page.page.saturating_sub(1) * page.per_page) as usize;
        Ok(group
            .projects
            .iter()
            .skip(start)
            .take(page.per_page as usize)
            .map(|id| state.projects[id].detail.handle())
            .collect())
    }

    fn list_subgroups(&self, group_id: u64) -> ClientResult<Vec<GroupHandle>> {
        self.record(Call::ListSubgroups(group_id));
        let state = self.state.borrow();
        state.group_by_id(group_id)?;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.parent == Some(group_id))
            .map(|g| g.handle.clone())
            .collect())
    }

    fn list_group_members(&self, group: &ResourceRef) -> ClientResult<Vec<Member>> {
        self.record(Call::ListGroupMembers(group.to_string()));
        self.state
            .borrow()
            .group(group)
            .map(|g| g.members.clone())
            .ok_or_else(|| ClientError::not_found(format!("group {group}")))
    }

    fn get_project(&self, project: &ResourceRef) -> ClientResult<ProjectDetail> {
        self.record(Call::GetProject(project.to_string()));
        let state = self.state.borrow();
        state
            .project_id(project)
            .map(|id| state.projects[&id].detail.clone())
            .ok_or_else(|| ClientError::not_found(format!("project {project}")))
    }

    fn save_project(&self, project_id: u64, update: &ProjectUpdate) -> ClientResult<()> {
        self.record(Call::SaveProject(project_id, update.clone()));
        self.state
            .borrow_mut()
            .project_mut(project_id)?
            .detail
            .apply(update);
        Ok(())
    }

    fn list_protected_branches(&self, project_id: u64) -> ClientResult<Vec<ProtectedBranch>> {
        self.record(Call::ListProtectedBranches(project_id));
        let mut state = self.state.borrow_mut();
        if state.broken_projects.contains(&project_id) {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(state.project_mut(project_id)?.protected_branches.clone())
    }

    fn delete_protected_branch(&self, project_id: u64, name: &str) -> ClientResult<()> {
        self.record(Call::DeleteProtectedBranch(project_id, name.to_string()));
        let mut state = self.state.borrow_mut();
        let project = state.project_mut(project_id)?;
        let before = project.protected_branches.len();
        project.protected_branches.retain(|b| b.name != name);
        if project.protected_branches.len() == before {
            return Err(ClientError::not_found(format!("protected branch {name}")));
        }
        Ok(())
    }

    fn create_protected_branch(
        &self,
        project_id: u64,
        spec: &ProtectedBranchSpec,
    ) -> ClientResult<()> {
        self.record(Call::CreateProtectedBranch(project_id, spec.name.clone()));
        let mut state = self.state.borrow_mut();
        let project = state.project_mut(project_id)?;
        if project.protected_branches.iter().any(|b| b.name == spec.name) {
            return Err(ClientError::Status {
                status: 409,
                message: "Protected branch already exists".to_string(),
            });
        }
        project.protected_branches.push(ProtectedBranch {
            name: spec.name.clone(),
            merge_access_levels: vec![AccessLevelEntry::from(spec.merge_access_level)],
            push_access_levels: vec![AccessLevelEntry::from(spec.push_access_level)],
            allow_force_push: spec.allow_force_push,
        });
        Ok(())
    }

    fn get_push_rules(&self, project_id: u64) -> ClientResult<Option<PushRules>> {
        self.record(Call::GetPushRules(project_id));
        Ok(self.state.borrow_mut().project_mut(project_id)?.push_rules.clone())
    }

    fn save_push_rules(&self, project_id: u64, update: &PushRulesUpdate) -> ClientResult<()> {
        self.record(Call::SavePushRules(project_id, update.clone()));
        let mut state = self.state.borrow_mut();
        let rules = state
            .project_mut(project_id)?
            .push_rules
            .get_or_insert_with(PushRules::default);
        if let Some(prevent_secrets) = update.prevent_secrets {
            rules.prevent_secrets = prevent_secrets;
        }
        Ok(())
    }

    fn list_approval_rules(&self, project_id: u64) -> ClientResult<Vec<ApprovalRule>> {
        self.record(Call::ListApprovalRules(project_id));
        Ok(self
            .state
            .borrow_mut()
            .project_mut(project_id)?
            .approval_rules
            .clone())
    }

    fn create_approval_rule(&self, project_id: u64, rule: &NewApprovalRule) -> ClientResult<()> {
        self.record(Call::CreateApprovalRule(project_id, rule.name.clone()));
        let mut state = self.state.borrow_mut();
        let users = state.members(&rule.user_ids)?;
        state.next_rule_id += 1;
        let id = state.next_rule_id;
        state.project_mut(project_id)?.approval_rules.push(ApprovalRule {
            id,
            name: rule.name.clone(),
            approvals_required: rule.approvals_required,
            applies_to_all_protected_branches: rule.applies_to_all_protected_branches,
            users,
        });
        Ok(())
    }

    fn save_approval_rule(
        &self,
        project_id: u64,
        rule_id: u64,
        update: &ApprovalRuleUpdate,
    ) -> ClientResult<()> {
        self.record(Call::SaveApprovalRule(project_id, rule_id));
        let mut state = self.state.borrow_mut();
        let users = state.members(&update.user_ids)?;
        let rule = state
            .project_mut(project_id)?
            .approval_rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| ClientError::not_found(format!("approval rule {rule_id}")))?;
        rule.approvals_required = update.approvals_required;
        rule.applies_to_all_protected_branches = update.applies_to_all_protected_branches;
        rule.users = users;
        Ok(())
    }

    fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> ClientResult<()> {
        self.record(Call::DeleteApprovalRule(project_id, rule_id));
        let mut state = self.state.borrow_mut();
        let project = state.project_mut(project_id)?;
        let before = project.approval_rules.len();
        project.approval_rules.retain(|r| r.id != rule_id);
        if project.approval_rules.len() == before {
            return Err(ClientError::not_found(format!("approval rule {rule_id}")));
        }
        Ok(())
    }
}

/// A project with `main` as default branch and every managed setting off.
pub fn project(id: u64, name: &str, namespace: &str) -> ProjectDetail {
    ProjectDetail {
        id,
        name: name.to_string(),
        path: format!("{namespace}/{name}"),
        default_branch: Some("main".to_string()),
        remove_source_branch_after_merge: Some(false),
        only_allow_merge_if_pipeline_succeeds: Some(false),
        squash_option: Some("default_off".to_string()),
        merge_method: Some("merge".to_string()),
        merge_requests_template: None,
    }
}

/// A group member.
pub fn member(id: u64, username: &str) -> Member {
    Member {
        id,
        username: username.to_string(),
    }
}
