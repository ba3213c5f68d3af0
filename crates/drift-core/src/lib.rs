//! Reconciliation engine for GitLab project configuration drift
//!
//! This crate compares the live settings of GitLab projects with a declarative
//! configuration document and, in fix mode, writes the expected values back:
//!
//! - **Hierarchy walker**: discovers projects under seed groups, deduplicated and limit-bounded
//! - **Desired-state resolver**: picks the profile that applies to a project
//! - **Drift detector**: a pure diff of a live snapshot against the profile
//! - **Applier**: coalesced writes, only in fix mode
//! - **Accumulator**: ordered reports plus the changed tally
//!
//! # Architecture
//!
//! All remote access goes through the [`ResourceClient`] trait, implemented
//! for the real API by `drift-gitlab` and in memory by `drift-test-utils`:
//!
//! ```text
//!                 drift-cli
//!                     |
//!                drift-core  ----  ResourceClient
//!                                       |
//!                        +--------------+--------------+
//!                        |                             |
//!                  drift-gitlab                drift-test-utils
//! ```
//!
//! # Example
//!
//! ```ignore
//! use drift_core::{ConfigDocument, Reconciler, ResolutionPolicy, RunContext, discover};
//!
//! fn example(client: &impl drift_core::ResourceClient) -> drift_core::Result<()> {
//!     let config = ConfigDocument::load("config.yaml".as_ref())?;
//!     let context = RunContext::build(client, &config)?;
//!     let found = discover(client, &["acme-org".into()], true, Some(50));
//!     let result = Reconciler::new(client, &config, &context)
//!         .run(&found.targets(), ResolutionPolicy::Skip)?;
//!     println!("Changed: {}/{}", result.changed_count, result.total());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fields;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod walker;

pub use client::{PageRequest, ResourceClient};
pub use config::{
    ApprovalRuleConfig, ConfigDocument, DEFAULT_PROFILE, FieldSet, FieldValue, Resolution, resolve,
};
pub use context::{MemberDirectory, RunContext};
pub use error::{ClientError, ClientResult, Error, Result};
pub use fields::{FieldKind, FieldLookup, FieldRegistry, ValueKind};
pub use model::{
    AccessLevel, AccessLevelEntry, ApprovalRule, ApprovalRuleUpdate, GroupHandle, Member,
    NewApprovalRule, ProjectDetail, ProjectHandle, ProjectUpdate, ProtectedBranch,
    ProtectedBranchSpec, PushRules, PushRulesUpdate, ResourceRef,
};
pub use reconcile::{LiveSnapshot, Reconciler, ResolutionPolicy, Target, WritePlan};
pub use report::{
    Accumulator, ChangeRecord, DEFAULT_BRANCH_COLUMN, MembershipDelta, PROJECT_COLUMN,
    PROTECTED_BRANCHES_COLUMN, ProjectFailure, ProjectReport, ReconciliationResult, ReportCell,
    accumulate,
};
pub use walker::{DEFAULT_PAGE_SIZE, Discovery, HierarchyWalker, SeedFailure, discover};
