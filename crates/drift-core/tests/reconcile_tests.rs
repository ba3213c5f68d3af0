//! End-to-end reconciliation tests against the in-memory GitLab

use std::collections::BTreeSet;

use drift_core::{
    AccessLevel, AccessLevelEntry, ApprovalRule, ChangeRecord, ConfigDocument, Error,
    MembershipDelta, ProjectUpdate, ProtectedBranch, PushRules, ReconciliationResult, Reconciler,
    ResolutionPolicy, ResourceRef, RunContext, Target,
};
use drift_test_utils::{Call, FakeGitLab, member, project};

const SETTINGS_CONFIG: &str = r###"
GITLAB_URL: https://gitlab.example.com
default:
  remove_source_branch_after_merge: true
  only_allow_merge_if_pipeline_succeeds: true
  squash_option: default_on
  merge_method: ff
  merge_access_levels: Developers + Maintainers
  prevent_secrets: true
  merge_requests_template: "## What does this MR do?"
acme-website:
  squash_option: never
"###;

fn run(
    fake: &FakeGitLab,
    config: &ConfigDocument,
    targets: &[Target],
    fix: bool,
) -> ReconciliationResult {
    let context = RunContext::build(fake, config).expect("context should build");
    Reconciler::new(fake, config, &context)
        .with_fix(fix)
        .run(targets, ResolutionPolicy::Skip)
        .expect("run should not abort")
}

fn targets(ids: &[u64]) -> Vec<Target> {
    ids.iter().map(|id| Target::new(*id, 0)).collect()
}

fn maintainers_only(name: &str) -> ProtectedBranch {
    ProtectedBranch {
        name: name.to_string(),
        merge_access_levels: vec![AccessLevelEntry::from(AccessLevel::Maintainer)],
        push_access_levels: vec![AccessLevelEntry::from(AccessLevel::Maintainer)],
        allow_force_push: true,
    }
}

/// Three projects with drift on most managed settings
fn drifted_fleet() -> FakeGitLab {
    FakeGitLab::new()
        .with_group(1, "acme")
        .with_project(1, project(10, "acme-website", "acme"))
        .with_project(1, project(11, "billing", "acme"))
        .with_project(1, project(12, "handbook", "acme"))
        .with_protected_branch(10, maintainers_only("main"))
        .with_protected_branch(11, maintainers_only("main"))
        .with_push_rules(11, PushRules { prevent_secrets: false })
}

fn without_applied(result: &ReconciliationResult) -> Vec<Vec<ChangeRecord>> {
    result
        .reports
        .iter()
        .map(|r| {
            r.changes
                .iter()
                .cloned()
                .map(|mut c| {
                    c.applied = false;
                    c
                })
                .collect()
        })
        .collect()
}

mod dry_run_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dry_run_issues_no_writes() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let result = run(&fake, &config, &targets(&[10, 11, 12]), false);

        assert_eq!(result.changed_count, 3);
        assert!(fake.write_calls().is_empty(), "Got writes: {:?}", fake.write_calls());
        assert!(
            result
                .reports
                .iter()
                .flat_map(|r| r.changes.iter())
                .all(|c| !c.applied)
        );
    }

    #[test]
    fn test_dry_run_and_fix_detect_identical_changes() {
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let dry = run(&drifted_fleet(), &config, &targets(&[10, 11, 12]), false);
        let fixed = run(&drifted_fleet(), &config, &targets(&[10, 11, 12]), true);

        assert_eq!(without_applied(&dry), without_applied(&fixed));
        assert!(
            fixed
                .reports
                .iter()
                .flat_map(|r| r.changes.iter())
                .all(|c| c.applied)
        );
    }
}

mod fix_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_second_fix_run_finds_no_drift() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let first = run(&fake, &config, &targets(&[10, 11, 12]), true);
        assert_eq!(first.changed_count, 3);

        fake.clear_calls();
        let second = run(&fake, &config, &targets(&[10, 11, 12]), true);

        assert_eq!(second.changed_count, 0);
        assert!(fake.write_calls().is_empty());
    }

    #[test]
    fn test_writes_are_coalesced_and_ordered() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[11]), true);

        let writes = fake.write_calls();
        assert_eq!(writes.len(), 4, "Got writes: {:?}", writes);
        assert_eq!(writes[0], Call::DeleteProtectedBranch(11, "main".to_string()));
        assert_eq!(writes[1], Call::CreateProtectedBranch(11, "main".to_string()));
        assert!(matches!(writes[2], Call::SavePushRules(11, _)));
        match &writes[3] {
            Call::SaveProject(11, update) => {
                assert_eq!(update.remove_source_branch_after_merge, Some(true));
                assert_eq!(update.only_allow_merge_if_pipeline_succeeds, Some(true));
                assert_eq!(update.squash_option.as_deref(), Some("default_on"));
                assert_eq!(update.merge_method.as_deref(), Some("ff"));
                assert!(update.merge_requests_template.is_some());
            }
            other => panic!("Expected a single project save, got {:?}", other),
        }
    }

    #[test]
    fn test_protection_is_recreated_for_developers() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[11]), true);

        let branches = fake.protected_branches(11);
        assert_eq!(branches.len(), 1);
        assert_eq!(
            branches[0].merge_access_descriptions(),
            vec!["Developers + Maintainers".to_string()]
        );
        assert_eq!(
            branches[0].push_access_levels,
            vec![AccessLevelEntry::from(AccessLevel::NoAccess)]
        );
        assert!(!branches[0].allow_force_push);
    }

    #[test]
    fn test_named_profile_leaves_protection_alone() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[10]), true);

        assert_eq!(fake.protected_branches(10), vec![maintainers_only("main")]);
        assert_eq!(
            fake.write_calls(),
            vec![Call::SaveProject(
                10,
                ProjectUpdate {
                    squash_option: Some("never".to_string()),
                    ..Default::default()
                }
            )]
        );
    }

    #[test]
    fn test_unprotected_default_branch_is_only_created() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[12]), true);

        let branch_writes: Vec<Call> = fake
            .write_calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::DeleteProtectedBranch(..) | Call::CreateProtectedBranch(..)
                )
            })
            .collect();
        assert_eq!(
            branch_writes,
            vec![Call::CreateProtectedBranch(12, "main".to_string())]
        );
    }

    #[test]
    fn test_missing_push_rules_are_created() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();
        assert_eq!(fake.push_rules(12), None);

        run(&fake, &config, &targets(&[12]), true);

        assert_eq!(fake.push_rules(12), Some(PushRules { prevent_secrets: true }));
    }
}

mod profile_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_named_profile_replaces_default() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let result = run(&fake, &config, &targets(&[10, 11]), false);

        let website = &result.reports[0];
        assert_eq!(website.profile, "acme-website");
        assert_eq!(
            website.changes,
            vec![ChangeRecord::new("squash_option", "default_off", "never")]
        );
        assert_eq!(
            result.columns(),
            vec![
                "project",
                "default_branch",
                "protected branches",
                "squash_option",
                "remove_source_branch_after_merge",
                "only_allow_merge_if_pipeline_succeeds",
                "merge_method",
                "merge_access_levels",
                "prevent_secrets",
                "merge_requests_template",
            ]
        );
        assert_eq!(result.reports[1].profile, "default");
    }

    #[test]
    fn test_unmanaged_fields_are_not_read() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[10]), false);

        assert!(!fake.calls().contains(&Call::GetPushRules(10)));
        assert!(!fake.calls().contains(&Call::ListApprovalRules(10)));
    }
}

mod merge_method_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fast_forward_is_gated_on_main() {
        let mut develop = project(20, "legacy", "acme");
        develop.default_branch = Some("develop".to_string());
        let fake = FakeGitLab::new()
            .with_group(1, "acme")
            .with_project(1, develop)
            .with_project(1, project(21, "modern", "acme"));
        let config = ConfigDocument::parse("default:\n  merge_method: ff\n").unwrap();

        let result = run(&fake, &config, &targets(&[20, 21]), true);

        assert_eq!(result.changed_count, 1);
        assert_eq!(fake.project(20).merge_method.as_deref(), Some("merge"));
        assert_eq!(fake.project(21).merge_method.as_deref(), Some("ff"));
    }
}

mod approval_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const APPROVERS_CONFIG: &str = r#"
APPROVERS_GROUP: acme/approvers
approval_rules:
  owners:
    name: Code owners
    approvals_required: 1
    users: [bob, carol]
  security:
    name: Security
    approvals_required: 2
    applies_to_all_protected_branches: false
    users: [alice]
default:
  approval_rules: [owners, security]
"#;

    fn fleet() -> FakeGitLab {
        FakeGitLab::new()
            .with_group(1, "acme")
            .with_subgroup(1, 9, "acme/approvers")
            .with_members(
                9,
                vec![member(1, "alice"), member(2, "bob"), member(3, "carol")],
            )
            .with_project(1, project(10, "api", "acme"))
            .with_approval_rule(
                10,
                ApprovalRule {
                    id: 500,
                    name: "Code owners".to_string(),
                    approvals_required: 1,
                    applies_to_all_protected_branches: true,
                    users: vec![member(1, "alice"), member(2, "bob")],
                },
            )
            .with_approval_rule(
                10,
                ApprovalRule {
                    id: 501,
                    name: "Legacy".to_string(),
                    approvals_required: 1,
                    applies_to_all_protected_branches: true,
                    users: vec![],
                },
            )
    }

    #[test]
    fn test_approver_delta_is_set_based() {
        let fake = fleet();
        let config = ConfigDocument::parse(APPROVERS_CONFIG).unwrap();

        let result = run(&fake, &config, &targets(&[10]), false);

        let report = &result.reports[0];
        let owners: Vec<&ChangeRecord> = report.changes_for("approval_rule:Code owners").collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(
            owners[0].delta,
            Some(MembershipDelta {
                added: vec!["carol".to_string()],
                removed: vec!["alice".to_string()],
            })
        );
        assert_eq!(report.changes_for("approval_rule:Legacy").count(), 1);
        assert_eq!(report.changes_for("approval_rule:Security").count(), 1);
    }

    #[test]
    fn test_fix_converges_rules() {
        let fake = fleet();
        let config = ConfigDocument::parse(APPROVERS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[10]), true);

        let rules = fake.approval_rules(10);
        let names: BTreeSet<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, BTreeSet::from(["Code owners", "Security"]));

        let owners = rules.iter().find(|r| r.name == "Code owners").unwrap();
        let owner_ids: BTreeSet<u64> = owners.users.iter().map(|u| u.id).collect();
        assert_eq!(owner_ids, BTreeSet::from([2, 3]));

        let security = rules.iter().find(|r| r.name == "Security").unwrap();
        assert_eq!(security.approvals_required, 2);
        assert!(!security.applies_to_all_protected_branches);

        fake.clear_calls();
        let second = run(&fake, &config, &targets(&[10]), true);
        assert_eq!(second.changed_count, 0);
        assert!(fake.write_calls().is_empty());
    }

    #[test]
    fn test_members_are_listed_once_per_run() {
        let fake = fleet().with_project(1, project(11, "web", "acme"));
        let config = ConfigDocument::parse(APPROVERS_CONFIG).unwrap();

        run(&fake, &config, &targets(&[10, 11]), false);

        let member_calls = fake
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ListGroupMembers(_)))
            .count();
        assert_eq!(member_calls, 1);
    }

    #[test]
    fn test_unknown_approver_fails_only_that_project() {
        let fake = FakeGitLab::new()
            .with_group(1, "acme")
            .with_members(1, vec![member(1, "alice")])
            .with_project(1, project(10, "api", "acme"))
            .with_project(1, project(11, "web", "acme"));
        let config = ConfigDocument::parse(
            r#"
APPROVERS_GROUP: acme
approval_rules:
  owners:
    name: Owners
    users: [mallory]
default:
  remove_source_branch_after_merge: true
web:
  approval_rules: [owners]
"#,
        )
        .unwrap();

        let result = run(&fake, &config, &targets(&[10, 11]), false);

        assert_eq!(result.total(), 1);
        assert_eq!(result.reports[0].project.id, 10);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].message.contains("mallory"));
    }
}

mod isolation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failing_project_is_skipped() {
        let fake = drifted_fleet().with_broken_project(11);
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let result = run(&fake, &config, &targets(&[10, 11, 12]), false);

        let ids: Vec<u64> = result.reports.iter().map(|r| r.project.id).collect();
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].project, "acme/billing");
    }

    #[test]
    fn test_type_mismatch_is_a_per_project_failure() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(
            "default:\n  prevent_secrets: \"yes\"\nhandbook:\n  prevent_secrets: true\n",
        )
        .unwrap();

        let result = run(&fake, &config, &targets(&[10, 12]), false);

        assert_eq!(result.total(), 1);
        assert_eq!(result.reports[0].project.id, 12);
    }

    #[test]
    fn test_missing_project_fails_fast_in_project_mode() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();
        let context = RunContext::empty();

        let err = Reconciler::new(&fake, &config, &context)
            .run(&targets(&[10, 999]), ResolutionPolicy::FailFast)
            .unwrap_err();

        assert!(
            matches!(&err, Error::ProjectNotFound { project } if project == "999"),
            "Expected ProjectNotFound, got: {:?}",
            err
        );
    }

    #[test]
    fn test_missing_project_is_skipped_in_group_mode() {
        let fake = drifted_fleet();
        let config = ConfigDocument::parse(SETTINGS_CONFIG).unwrap();

        let result = run(
            &fake,
            &config,
            &[Target::new(ResourceRef::Id(999), 0), Target::new(10, 0)],
            false,
        );

        assert_eq!(result.total(), 1);
        assert_eq!(result.failures[0].project, "999");
    }
}

mod accounting_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_changed_count_counts_projects() {
        let mut compliant = FakeGitLab::new().with_group(1, "acme");
        for id in 1..=5 {
            let mut detail = project(id, &format!("p{id}"), "acme");
            detail.remove_source_branch_after_merge = Some(true);
            detail.only_allow_merge_if_pipeline_succeeds = Some(true);
            compliant = compliant.with_project(1, detail);
        }
        let config = ConfigDocument::parse(
            r#"
default:
  remove_source_branch_after_merge: true
  only_allow_merge_if_pipeline_succeeds: true
  squash_option: default_off
p2:
  squash_option: always
  remove_source_branch_after_merge: false
p4:
  squash_option: never
"#,
        )
        .unwrap();

        let result = run(&compliant, &config, &targets(&[1, 2, 3, 4, 5]), false);

        assert_eq!(result.total(), 5);
        assert_eq!(result.changed_count, 2);
        assert_eq!(result.reports[1].changes.len(), 2);
    }
}
