use super::{Outcome, emit};
use crate::analyzer::functionality::{FunctionalityProfile, Reinjector};
use crate::analyzer::manifest::Manifest;
use crate::analyzer::report::{self, json};
use crate::cli::RunContext;
use crate::config::types::Config;

/// `--add-func`: restore the chart's required fields in the fixed manifest.
pub fn handle_add_func(ctx: &RunContext, config: &Config) -> crate::Result<Outcome> {
    let chart = ctx.chart()?;
    let layout = &config.layout;
    let profile = FunctionalityProfile::load(&layout.profiles_dir, chart)?;

    let input = match &ctx.manifest {
        Some(path) => path.clone(),
        None => layout.fixed_manifest(chart, ctx.first_tool()?),
    };
    let mut manifest = Manifest::read(&input)?;

    let original_path = layout.template_manifest(chart);
    let original = if original_path.is_file() {
        match Manifest::read(&original_path) {
            Ok(m) => Some(m),
            Err(e) => {
                log::warn!("cannot use {} as original: {}", original_path.display(), e);
                None
            }
        }
    } else {
        log::info!(
            "{} not found; presence-only requirements cannot be restored",
            original_path.display()
        );
        None
    };

    let mut reinjector = Reinjector::new(&profile);
    if let Some(original) = &original {
        reinjector = reinjector.with_original(original);
    }
    let report = reinjector.reinject(&mut manifest);

    let output = layout.functional_manifest(chart);
    manifest.write(&output)?;
    std::fs::write(layout.functional_report(chart), json::to_json(&report))?;
    log::info!("wrote {}", output.display());

    emit(ctx, &report::format_reinjection(&report, ctx.format))?;
    Ok(Outcome::Success)
}
