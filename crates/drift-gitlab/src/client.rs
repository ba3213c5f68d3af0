//! Blocking GitLab REST client
//!
//! Implements [`ResourceClient`] over `/api/v4`. Authentication uses a
//! personal access token in the `PRIVATE-TOKEN` header. "List all" calls
//! follow GitLab's `X-Next-Page` header until the last page.

use std::time::Duration;

use drift_core::{
    ApprovalRule, ApprovalRuleUpdate, ClientError, ClientResult, GroupHandle, Member,
    NewApprovalRule, PageRequest, ProjectDetail, ProjectHandle, ProjectUpdate, ProtectedBranch,
    ProtectedBranchSpec, PushRules, PushRulesUpdate, ResourceClient, ResourceRef,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result, transport};
use crate::wire::{
    ApprovalRuleDto, CreateApprovalRuleRequest, GroupDto, MemberDto, ProjectDto,
    ProtectBranchRequest, ProtectedBranchDto, PushRuleDto,
};

/// Request timeout applied to every call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used by "list all" calls
const LIST_ALL_PAGE_SIZE: u32 = 100;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Client for one GitLab instance
pub struct GitLabClient {
    api_root: Url,
    token: String,
    http: Client,
}

impl GitLabClient {
    /// Create a client for the instance at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL, the token
    /// is empty, or the HTTP client cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitlab-config/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_root: api_root(base_url)?,
            token,
            http,
        })
    }

    /// API root this client sends requests to
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Build an endpoint URL; each segment is percent-encoded, so a
    /// namespaced path like `acme/web` becomes `acme%2Fweb`
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "GitLab request");
        self.http
            .request(method, url)
            .header(TOKEN_HEADER, &self.token)
    }

    fn send(&self, request: RequestBuilder, resource: &str) -> ClientResult<Response> {
        let response = request.send().map_err(transport)?;
        check_status(response, resource)
    }

    fn get_one<T: DeserializeOwned>(&self, url: Url, resource: &str) -> ClientResult<T> {
        let response = self.send(self.request(Method::GET, url), resource)?;
        response.json::<T>().map_err(|e| ClientError::Decode {
            message: format!("{}: {}", resource, e),
        })
    }

    fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        resource: &str,
    ) -> ClientResult<(Vec<T>, Option<u32>)> {
        let response = self.send(self.request(Method::GET, url).query(query), resource)?;
        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let items = response.json::<Vec<T>>().map_err(|e| ClientError::Decode {
            message: format!("{}: {}", resource, e),
        })?;
        Ok((items, next_page))
    }

    fn get_all<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        resource: &str,
    ) -> ClientResult<Vec<T>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let mut paged = query.to_vec();
            paged.push(("page", page.to_string()));
            paged.push(("per_page", LIST_ALL_PAGE_SIZE.to_string()));

            let (items, next_page) = self.get_page::<T>(url.clone(), &paged, resource)?;
            let received = items.len();
            all.extend(items);

            match next_page {
                Some(next) if next > page && received > 0 => page = next,
                _ => break,
            }
        }
        Ok(all)
    }

    fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        resource: &str,
    ) -> ClientResult<()> {
        self.send(self.request(method, url).json(body), resource)?;
        Ok(())
    }

    fn delete(&self, url: Url, resource: &str) -> ClientResult<()> {
        self.send(self.request(Method::DELETE, url), resource)?;
        Ok(())
    }
}

/// Normalise an instance URL into its `/api/v4` root
fn api_root(base_url: &str) -> Result<Url> {
    let invalid = |message: &str| Error::InvalidUrl {
        url: base_url.to_string(),
        message: message.to_string(),
    };

    let mut url = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base"))?;
        path.pop_if_empty();
        path.extend(["api", "v4"]);
    }
    Ok(url)
}

/// Turn non-success statuses into client errors
fn check_status(response: Response, resource: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::not_found(resource));
    }
    let body = response.text().unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message: format!("{}: {}", resource, body.trim()),
    })
}

fn segment(reference: &ResourceRef) -> String {
    reference.to_string()
}

impl ResourceClient for GitLabClient {
    fn get_group(&self, group: &ResourceRef) -> ClientResult<GroupHandle> {
        let url = self.endpoint(&["groups", &segment(group)]);
        self.get_one::<GroupDto>(url, &format!("group {}", group))
            .map(Into::into)
    }

    fn list_group_projects(
        &self,
        group_id: u64,
        page: PageRequest,
    ) -> ClientResult<Vec<ProjectHandle>> {
        let url = self.endpoint(&["groups", &group_id.to_string(), "projects"]);
        let query = [
            ("archived", "false".to_string()),
            ("page", page.page.to_string()),
            ("per_page", page.per_page.to_string()),
        ];
        let (items, _) =
            self.get_page::<ProjectDto>(url, &query, &format!("projects of group {}", group_id))?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    fn list_subgroups(&self, group_id: u64) -> ClientResult<Vec<GroupHandle>> {
        let url = self.endpoint(&["groups", &group_id.to_string(), "subgroups"]);
        let resource = format!("subgroups of group {}", group_id);
        let groups = self.get_all::<GroupDto>(url, &[], &resource)?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    fn list_group_members(&self, group: &ResourceRef) -> ClientResult<Vec<Member>> {
        let url = self.endpoint(&["groups", &segment(group), "members"]);
        let members = self.get_all::<MemberDto>(url, &[], &format!("members of group {}", group))?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    fn get_project(&self, project: &ResourceRef) -> ClientResult<ProjectDetail> {
        let url = self.endpoint(&["projects", &segment(project)]);
        self.get_one::<ProjectDto>(url, &format!("project {}", project))
            .map(Into::into)
    }

    fn save_project(&self, project_id: u64, update: &ProjectUpdate) -> ClientResult<()> {
        let url = self.endpoint(&["projects", &project_id.to_string()]);
        self.send_json(Method::PUT, url, update, &format!("project {}", project_id))
    }

    fn list_protected_branches(&self, project_id: u64) -> ClientResult<Vec<ProtectedBranch>> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "protected_branches"]);
        let branches = self.get_all::<ProtectedBranchDto>(
            url,
            &[],
            &format!("protected branches of project {}", project_id),
        )?;
        Ok(branches.into_iter().map(Into::into).collect())
    }

    fn delete_protected_branch(&self, project_id: u64, name: &str) -> ClientResult<()> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "protected_branches", name]);
        self.delete(url, &format!("protected branch {} of project {}", name, project_id))
    }

    fn create_protected_branch(
        &self,
        project_id: u64,
        spec: &ProtectedBranchSpec,
    ) -> ClientResult<()> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "protected_branches"]);
        self.send_json(
            Method::POST,
            url,
            &ProtectBranchRequest::from(spec),
            &format!("protected branch {} of project {}", spec.name, project_id),
        )
    }

    fn get_push_rules(&self, project_id: u64) -> ClientResult<Option<PushRules>> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "push_rule"]);
        let resource = format!("push rules of project {}", project_id);
        match self.get_one::<Option<PushRuleDto>>(url, &resource) {
            Ok(rules) => Ok(rules.map(Into::into)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_push_rules(&self, project_id: u64, update: &PushRulesUpdate) -> ClientResult<()> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "push_rule"]);
        let resource = format!("push rules of project {}", project_id);
        match self.send_json(Method::PUT, url.clone(), update, &resource) {
            Err(e) if e.is_not_found() => {
                tracing::debug!(project_id, "No push rules yet, creating them");
                self.send_json(Method::POST, url, update, &resource)
            }
            other => other,
        }
    }

    fn list_approval_rules(&self, project_id: u64) -> ClientResult<Vec<ApprovalRule>> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "approval_rules"]);
        let rules = self.get_all::<ApprovalRuleDto>(
            url,
            &[],
            &format!("approval rules of project {}", project_id),
        )?;
        Ok(rules.into_iter().map(Into::into).collect())
    }

    fn create_approval_rule(&self, project_id: u64, rule: &NewApprovalRule) -> ClientResult<()> {
        let url = self.endpoint(&["projects", &project_id.to_string(), "approval_rules"]);
        self.send_json(
            Method::POST,
            url,
            &CreateApprovalRuleRequest::from(rule),
            &format!("approval rule {} of project {}", rule.name, project_id),
        )
    }

    fn save_approval_rule(
        &self,
        project_id: u64,
        rule_id: u64,
        update: &ApprovalRuleUpdate,
    ) -> ClientResult<()> {
        let url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "approval_rules",
            &rule_id.to_string(),
        ]);
        self.send_json(
            Method::PUT,
            url,
            update,
            &format!("approval rule {} of project {}", rule_id, project_id),
        )
    }

    fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> ClientResult<()> {
        let url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "approval_rules",
            &rule_id.to_string(),
        ]);
        self.delete(url, &format!("approval rule {} of project {}", rule_id, project_id))
    }
}
