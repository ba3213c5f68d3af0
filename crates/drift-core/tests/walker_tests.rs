//! Tests for group hierarchy discovery

use std::collections::HashSet;

use drift_core::{Error, HierarchyWalker, ResourceRef, discover};
use drift_test_utils::{Call, FakeGitLab, project};

/// Group 1 `acme` owning `count` projects with ids starting at `first`
fn group_with_projects(first: u64, count: u64) -> FakeGitLab {
    (first..first + count).fold(FakeGitLab::new().with_group(1, "acme"), |fake, id| {
        fake.with_project(1, project(id, &format!("p{id}"), "acme"))
    })
}

fn ids(found: &drift_core::Discovery) -> Vec<u64> {
    found.projects.iter().map(|p| p.id).collect()
}

mod pagination_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_walks_pages_until_short_page() {
        let fake = group_with_projects(1, 45);

        let found = discover(&fake, &[ResourceRef::Id(1)], false, None);

        assert_eq!(found.projects.len(), 45);
        assert_eq!(
            fake.discovery_calls(),
            vec![
                Call::GetGroup("1".to_string()),
                Call::ListGroupProjects { group_id: 1, page: 1, per_page: 20 },
                Call::ListGroupProjects { group_id: 1, page: 2, per_page: 20 },
                Call::ListGroupProjects { group_id: 1, page: 3, per_page: 20 },
            ]
        );
    }

    #[test]
    fn test_exact_multiple_ends_on_empty_page() {
        let fake = group_with_projects(1, 40);

        let found = discover(&fake, &[ResourceRef::Id(1)], false, None);

        assert_eq!(found.projects.len(), 40);
        let pages = fake
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ListGroupProjects { .. }))
            .count();
        assert_eq!(pages, 3);
    }

    #[test]
    fn test_custom_page_size() {
        let fake = group_with_projects(1, 5);

        let found = HierarchyWalker::new(&fake)
            .with_page_size(2)
            .discover(&[ResourceRef::Id(1)]);

        assert_eq!(ids(&found), vec![1, 2, 3, 4, 5]);
    }
}

mod limit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_limit_caps_page_size_and_stops_early() {
        let fake = group_with_projects(1, 25).with_subgroup(1, 2, "acme/platform");

        let found = discover(&fake, &[ResourceRef::Id(1)], true, Some(5));

        assert_eq!(ids(&found), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            fake.discovery_calls(),
            vec![
                Call::GetGroup("1".to_string()),
                Call::ListGroupProjects { group_id: 1, page: 1, per_page: 5 },
            ],
            "No subgroup or further page requests once the limit is reached"
        );
    }

    #[test]
    fn test_limit_spans_all_seeds() {
        let fake = (0..10).fold(
            group_with_projects(1, 3).with_group(2, "globex"),
            |fake, i| fake.with_project(2, project(100 + i, &format!("g{i}"), "globex")),
        );

        let found = discover(
            &fake,
            &[ResourceRef::Id(1), ResourceRef::Id(2), ResourceRef::Id(3)],
            false,
            Some(5),
        );

        assert_eq!(ids(&found), vec![1, 2, 3, 100, 101]);
        assert!(found.is_complete(), "Seed 3 is never requested");
        assert_eq!(
            fake.discovery_calls(),
            vec![
                Call::GetGroup("1".to_string()),
                Call::ListGroupProjects { group_id: 1, page: 1, per_page: 5 },
                Call::GetGroup("2".to_string()),
                Call::ListGroupProjects { group_id: 2, page: 1, per_page: 2 },
            ]
        );
    }

    #[test]
    fn test_limit_larger_than_reachable_returns_everything() {
        let fake = group_with_projects(1, 7);

        let found = discover(&fake, &[ResourceRef::Id(1)], true, Some(50));

        assert_eq!(found.projects.len(), 7);
    }
}

mod hierarchy_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree() -> FakeGitLab {
        FakeGitLab::new()
            .with_group(1, "acme")
            .with_subgroup(1, 2, "acme/platform")
            .with_subgroup(2, 4, "acme/platform/infra")
            .with_subgroup(1, 3, "acme/web")
            .with_project(1, project(10, "handbook", "acme"))
            .with_project(2, project(20, "api", "acme/platform"))
            .with_project(4, project(40, "terraform", "acme/platform/infra"))
            .with_project(3, project(30, "website", "acme/web"))
    }

    #[test]
    fn test_depth_first_order_with_depths() {
        let fake = tree();

        let found = discover(&fake, &[ResourceRef::Path("acme".to_string())], true, None);

        let walked: Vec<(u64, usize)> = found.projects.iter().map(|p| (p.id, p.depth)).collect();
        assert_eq!(walked, vec![(10, 0), (20, 1), (40, 2), (30, 1)]);
    }

    #[test]
    fn test_non_recursive_skips_subgroups() {
        let fake = tree();

        let found = discover(&fake, &[ResourceRef::Id(1)], false, None);

        assert_eq!(ids(&found), vec![10]);
        assert!(!fake.calls().iter().any(|c| matches!(c, Call::ListSubgroups(_))));
    }

    #[test]
    fn test_overlapping_seeds_yield_each_project_once() {
        let fake = tree().with_project(3, project(20, "api", "acme/platform"));

        let found = discover(
            &fake,
            &[ResourceRef::Id(2), ResourceRef::Id(1), ResourceRef::Id(3)],
            true,
            None,
        );

        let all = ids(&found);
        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all, vec![20, 40, 10, 30]);
    }

    #[test]
    fn test_shared_project_keeps_first_depth() {
        let fake = tree().with_project(4, project(10, "handbook", "acme"));

        let found = discover(&fake, &[ResourceRef::Id(1)], true, None);

        let handbook = found.projects.iter().find(|p| p.id == 10).unwrap();
        assert_eq!(handbook.depth, 0);
    }

    #[test]
    fn test_targets_preserve_order_and_depth() {
        let fake = tree();

        let found = discover(&fake, &[ResourceRef::Id(1)], true, None);
        let targets = found.targets();

        assert_eq!(targets.len(), 4);
        assert_eq!(targets[2].reference, ResourceRef::Id(40));
        assert_eq!(targets[2].depth, 2);
    }
}

mod failure_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_seed_is_reported_and_others_continue() {
        let fake = group_with_projects(1, 2);

        let found = discover(
            &fake,
            &[ResourceRef::Path("missing".to_string()), ResourceRef::Id(1)],
            false,
            None,
        );

        assert_eq!(ids(&found), vec![1, 2]);
        assert_eq!(found.failed_seeds.len(), 1);
        let failure = &found.failed_seeds[0];
        assert_eq!(failure.seed, ResourceRef::Path("missing".to_string()));
        assert!(
            matches!(&failure.error, Error::GroupNotFound { group } if group == "missing"),
            "Expected GroupNotFound, got: {:?}",
            failure.error
        );
    }
}
