//! Group hierarchy discovery
//!
//! Walks seed groups depth-first with an explicit work stack, collecting
//! each project once (first occurrence wins) and stopping all further
//! requests as soon as the optional limit is reached.

use std::collections::HashSet;

use crate::client::{PageRequest, ResourceClient};
use crate::model::{GroupHandle, ProjectHandle, ResourceRef};
use crate::reconcile::Target;
use crate::{Error, Result};

/// Page size used when listing group projects
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A seed group whose walk failed
#[derive(Debug)]
pub struct SeedFailure {
    pub seed: ResourceRef,
    pub error: Error,
}

/// Projects found by a walk plus the seeds that could not be walked
#[derive(Debug, Default)]
pub struct Discovery {
    pub projects: Vec<ProjectHandle>,
    pub failed_seeds: Vec<SeedFailure>,
}

impl Discovery {
    /// Reconciliation targets in discovery order
    pub fn targets(&self) -> Vec<Target> {
        self.projects
            .iter()
            .map(|p| Target::new(p.id, p.depth))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_seeds.is_empty()
    }
}

/// Depth-first walker over groups and their subgroups
pub struct HierarchyWalker<'a, C: ResourceClient + ?Sized> {
    client: &'a C,
    recurse: bool,
    limit: Option<usize>,
    page_size: u32,
}

/// Mutable bookkeeping for one walk
#[derive(Default)]
struct WalkState {
    visited_groups: HashSet<u64>,
    seen_projects: HashSet<u64>,
    projects: Vec<ProjectHandle>,
}

impl<'a, C: ResourceClient + ?Sized> HierarchyWalker<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            recurse: false,
            limit: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Also walk subgroups (builder pattern)
    pub fn with_recursive(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Bound the total number of distinct projects (builder pattern)
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Override the page size (builder pattern)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Walk every seed in order
    ///
    /// A seed that fails is recorded in [`Discovery::failed_seeds`]; the
    /// projects it yielded before failing are kept and the remaining seeds
    /// are still walked.
    pub fn discover(&self, seeds: &[ResourceRef]) -> Discovery {
        let mut state = WalkState::default();
        let mut failed_seeds = Vec::new();

        for seed in seeds {
            if self.is_full(&state) {
                tracing::debug!(%seed, "Limit reached, not walking seed");
                break;
            }
            if let Err(error) = self.walk_seed(seed, &mut state) {
                tracing::error!(%seed, %error, "Could not walk group");
                failed_seeds.push(SeedFailure {
                    seed: seed.clone(),
                    error,
                });
            }
        }

        Discovery {
            projects: state.projects,
            failed_seeds,
        }
    }

    fn walk_seed(&self, seed: &ResourceRef, state: &mut WalkState) -> Result<()> {
        let root = self.client.get_group(seed).map_err(|e| {
            if e.is_not_found() {
                Error::GroupNotFound {
                    group: seed.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        let mut stack: Vec<(GroupHandle, usize)> = vec![(root, 0)];
        while let Some((group, depth)) = stack.pop() {
            if self.is_full(state) {
                break;
            }
            if !state.visited_groups.insert(group.id) {
                continue;
            }

            self.walk_projects(&group, depth, state)?;

            if !self.recurse || self.is_full(state) {
                continue;
            }
            let subgroups = self.client.list_subgroups(group.id)?;
            tracing::debug!(group = %group.full_path, count = subgroups.len(), "Listed subgroups");
            // Reversed so the first subgroup is walked first
            stack.extend(subgroups.into_iter().rev().map(|g| (g, depth + 1)));
        }

        Ok(())
    }

    fn walk_projects(
        &self,
        group: &GroupHandle,
        depth: usize,
        state: &mut WalkState,
    ) -> Result<()> {
        let per_page = match self.remaining(state) {
            Some(remaining) => self.page_size.min(u32::try_from(remaining).unwrap_or(u32::MAX)),
            None => self.page_size,
        };

        let mut page = 1;
        loop {
            if self.is_full(state) {
                break;
            }
            let batch = self
                .client
                .list_group_projects(group.id, PageRequest { page, per_page })?;
            let received = batch.len();
            tracing::debug!(group = %group.full_path, page, received, "Listed projects");

            for mut project in batch {
                if self.is_full(state) {
                    break;
                }
                if state.seen_projects.insert(project.id) {
                    project.depth = depth;
                    state.projects.push(project);
                }
            }

            if received < per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(())
    }

    fn remaining(&self, state: &WalkState) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_sub(state.projects.len()))
    }

    fn is_full(&self, state: &WalkState) -> bool {
        self.remaining(state) == Some(0)
    }
}

/// Discover projects under the seed groups
pub fn discover<C>(
    client: &C,
    seeds: &[ResourceRef],
    recurse: bool,
    limit: Option<usize>,
) -> Discovery
where
    C: ResourceClient + ?Sized,
{
    HierarchyWalker::new(client)
        .with_recursive(recurse)
        .with_limit(limit)
        .discover(seeds)
}
