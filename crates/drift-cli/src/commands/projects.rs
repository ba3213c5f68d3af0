//! Projects command implementation

use std::io::Write;

use drift_core::{
    ConfigDocument, Reconciler, ResolutionPolicy, ResourceClient, ResourceRef, RunContext, Target,
};

use crate::error::Result;
use crate::render::{OutputFormat, render};

/// Arguments of the projects command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectsArgs {
    pub projects: Vec<ResourceRef>,
    pub fix: bool,
}

/// Run the projects command
///
/// Every identifier must resolve; an unknown project aborts the run.
pub fn run_projects<C>(
    client: &C,
    config: &ConfigDocument,
    args: &ProjectsArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    C: ResourceClient + ?Sized,
{
    let context = RunContext::build(client, config)?;
    let targets: Vec<Target> = args
        .projects
        .iter()
        .map(|p| Target::new(p.clone(), 0))
        .collect();

    let result = Reconciler::new(client, config, &context)
        .with_fix(args.fix)
        .run(&targets, ResolutionPolicy::FailFast)?;
    render(out, &result, args.fix, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use drift_core::Error;
    use drift_test_utils::{FakeGitLab, project};

    fn config() -> ConfigDocument {
        ConfigDocument::parse("default:\n  squash_option: always\n").unwrap()
    }

    #[test]
    fn test_projects_by_id_and_path() {
        let fake = FakeGitLab::new()
            .with_group(1, "acme")
            .with_project(1, project(10, "api", "acme"))
            .with_project(1, project(11, "web", "acme"));
        let args = ProjectsArgs {
            projects: vec![ResourceRef::Id(10), ResourceRef::Path("acme/web".to_string())],
            fix: true,
        };
        let mut out = Vec::new();

        run_projects(&fake, &config(), &args, OutputFormat::Json, &mut out).unwrap();

        assert_eq!(fake.project(10).squash_option.as_deref(), Some("always"));
        assert_eq!(fake.project(11).squash_option.as_deref(), Some("always"));
        assert!(fake.discovery_calls().is_empty());
    }

    #[test]
    fn test_unknown_project_aborts() {
        let fake = FakeGitLab::new().with_group(1, "acme");
        let args = ProjectsArgs {
            projects: vec![ResourceRef::Id(404)],
            fix: false,
        };
        let mut out = Vec::new();

        let err = run_projects(&fake, &config(), &args, OutputFormat::Table, &mut out).unwrap_err();

        assert!(matches!(err, CliError::Core(Error::ProjectNotFound { .. })));
        assert!(out.is_empty());
    }
}
