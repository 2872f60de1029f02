use super::{Outcome, emit};
use crate::analyzer::docker_run::DockerRun;
use crate::analyzer::manifest::Manifest;
use crate::cli::RunContext;
use crate::config::types::Config;
use crate::error::HardenerError;

/// `--docker-run`: print the docker command for one container.
pub fn handle_docker_run(ctx: &RunContext, config: &Config) -> crate::Result<Outcome> {
    let resource = ctx
        .resource
        .as_ref()
        .ok_or(HardenerError::MissingSelector("resource (--resource or $resource_path)"))?;
    let container = ctx
        .container
        .as_ref()
        .ok_or(HardenerError::MissingSelector("container (--container or $obj_path)"))?;

    let input = match &ctx.manifest {
        Some(path) => path.clone(),
        None => config
            .layout
            .stage_manifest(ctx.chart()?, ctx.iteration(), ctx.first_tool)?,
    };
    let manifest = Manifest::read(&input)?;
    let command = DockerRun::from_manifest(&manifest, resource, container)?;
    emit(ctx, &format!("{}\n", command))?;
    Ok(Outcome::Success)
}
