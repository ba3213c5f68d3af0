//! Per-project reconciliation engine
//!
//! Each project goes through three steps:
//!
//! 1. **fetch**: read a fresh [`LiveSnapshot`] of the fields the profile manages
//! 2. **diff**: compare it with the resolved profile ([`DriftDetector`])
//! 3. **apply**: in fix mode only, send the coalesced [`WritePlan`]
//!
//! Diffing always runs, so a dry run reports exactly the drift a fix run
//! would write.

mod apply;
mod diff;
mod snapshot;

pub use apply::apply;
pub use diff::{
    BranchReprotect, DriftDetector, FAST_FORWARD, FAST_FORWARD_BRANCH, ProjectDiff, RuleWrite,
    WritePlan, rule_field,
};
pub use snapshot::LiveSnapshot;

use crate::client::ResourceClient;
use crate::config::{ConfigDocument, resolve};
use crate::context::RunContext;
use crate::fields::FieldRegistry;
use crate::model::{ProjectDetail, ResourceRef};
use crate::report::{Accumulator, ProjectReport, ReconciliationResult};
use crate::{Error, Result};

/// A project to reconcile and its indentation depth in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub reference: ResourceRef,
    pub depth: usize,
}

impl Target {
    pub fn new(reference: impl Into<ResourceRef>, depth: usize) -> Self {
        Self {
            reference: reference.into(),
            depth,
        }
    }
}

/// What to do when a target project does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Abort the run (direct project mode)
    FailFast,
    /// Record the project as failed and continue (group mode)
    Skip,
}

/// Reconciles projects against the configuration document
pub struct Reconciler<'a, C: ResourceClient + ?Sized> {
    client: &'a C,
    config: &'a ConfigDocument,
    context: &'a RunContext,
    registry: FieldRegistry,
    fix: bool,
}

impl<'a, C: ResourceClient + ?Sized> Reconciler<'a, C> {
    /// Create a reconciler using the built-in field registry
    pub fn new(client: &'a C, config: &'a ConfigDocument, context: &'a RunContext) -> Self {
        Self {
            client,
            config,
            context,
            registry: FieldRegistry::with_builtins(),
            fix: false,
        }
    }

    /// Enable or disable fix mode (builder pattern)
    pub fn with_fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    /// Reconcile every target in order, isolating per-project failures
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] when a target does not exist and
    /// the policy is [`ResolutionPolicy::FailFast`]. Every other error is
    /// logged and recorded in [`ReconciliationResult::failures`].
    pub fn run(
        &self,
        targets: &[Target],
        policy: ResolutionPolicy,
    ) -> Result<ReconciliationResult> {
        let total = targets.len();
        let mut accumulator = Accumulator::new();

        for (index, target) in targets.iter().enumerate() {
            let detail = match self.client.get_project(&target.reference) {
                Ok(detail) => detail,
                Err(e) if e.is_not_found() && policy == ResolutionPolicy::FailFast => {
                    return Err(Error::ProjectNotFound {
                        project: target.reference.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!(
                        project = %target.reference,
                        error = %e,
                        "Could not load project"
                    );
                    accumulator.record_failure(target.reference.to_string(), e.to_string());
                    continue;
                }
            };

            tracing::info!(
                "Managing project ({}/{}): [{}] {}",
                index + 1,
                total,
                detail.id,
                detail.path
            );

            let path = detail.path.clone();
            match self.reconcile(detail, target.depth) {
                Ok(report) => accumulator.push(report),
                Err(e) => {
                    tracing::error!(project = %path, error = %e, "Skipping project");
                    accumulator.record_failure(path, e.to_string());
                }
            }
        }

        Ok(accumulator.finish())
    }

    /// Reconcile a single project whose settings were just fetched
    ///
    /// # Errors
    ///
    /// Returns an error when live state cannot be read, a configured value
    /// has the wrong shape, an approver cannot be resolved, or a fix-mode
    /// write fails.
    pub fn reconcile(&self, detail: ProjectDetail, depth: usize) -> Result<ProjectReport> {
        let mut handle = detail.handle();
        handle.depth = depth;

        let resolution = resolve(&handle, self.config);
        tracing::debug!(project = %handle.path, profile = resolution.profile, "Resolved profile");

        let snapshot = LiveSnapshot::fetch(self.client, detail, resolution.fields)?;
        let detector = DriftDetector::new(&self.registry, self.config, self.context);
        let ProjectDiff {
            cells,
            mut changes,
            plan,
        } = detector.diff(&snapshot, resolution)?;

        if self.fix && !plan.is_empty() {
            let writes = apply(self.client, handle.id, &plan)?;
            tracing::debug!(project = %handle.path, writes, "Applied changes");
            for change in &mut changes {
                change.applied = true;
            }
        }

        let profile = resolution.profile.to_string();
        Ok(ProjectReport::new(handle, profile, cells, changes))
    }
}
