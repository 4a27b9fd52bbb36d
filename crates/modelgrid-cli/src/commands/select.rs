use clap::Args;
use modelgrid_core::{GpuSelector, ServiceOverrides};
use modelgrid_select::{SelectionOutcome, SelectionRequest, TemplateSelector};
use modelgrid_state::ServiceTemplate;

use super::{CommandContext, print_json};

#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    /// Workload namespace (default: [engine].namespace).
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Model whose templates compete.
    #[arg(short, long, required_unless_present = "template")]
    pub model: Option<String>,
    /// Look up this template by name instead of ranking.
    #[arg(long, conflicts_with = "model")]
    pub template: Option<String>,
    /// Required GPU model.
    #[arg(long)]
    pub gpu: Option<String>,
    /// Required GPU count (0 = any).
    #[arg(long, default_value_t = 0)]
    pub gpu_count: u32,
    #[arg(long)]
    pub precision: Option<String>,
    #[arg(long)]
    pub metric: Option<String>,
    /// Admit non-optimized templates.
    #[arg(long)]
    pub allow_unoptimized: bool,
}

impl SelectArgs {
    fn overrides(&self) -> Option<ServiceOverrides> {
        let gpu_selector = (self.gpu.is_some() || self.gpu_count > 0).then(|| GpuSelector {
            model: self.gpu.clone().unwrap_or_default(),
            count: self.gpu_count,
        });
        let overrides = ServiceOverrides {
            metric: self.metric.clone(),
            precision: self.precision.clone(),
            gpu_selector,
        };
        (!overrides.is_empty()).then_some(overrides)
    }
}

pub fn select(ctx: &CommandContext, args: &SelectArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.template {
        let template = lookup(ctx, args, name)?;
        return print_json(&template);
    }

    let outcome = rank(ctx, args)?;
    print_json(&outcome)?;
    if !outcome.is_selected() {
        let message = outcome
            .message
            .unwrap_or_else(|| "matching templates exist but none is ready".to_string());
        anyhow::bail!(message);
    }
    Ok(())
}

fn rank(ctx: &CommandContext, args: &SelectArgs) -> anyhow::Result<SelectionOutcome> {
    let store = ctx.open_store()?;
    let request = SelectionRequest {
        namespace: ctx.namespace(args.namespace.as_deref()).to_string(),
        model_name: args.model.clone().unwrap_or_default(),
        overrides: args.overrides(),
        allow_unoptimized: args.allow_unoptimized || ctx.config.engine.allow_unoptimized,
    };
    let outcome = TemplateSelector::new(&store)
        .with_tables(ctx.preference_tables())
        .with_name_limits(ctx.config.naming)
        .select_for_model(&request)?;
    Ok(outcome)
}

fn lookup(ctx: &CommandContext, args: &SelectArgs, name: &str) -> anyhow::Result<ServiceTemplate> {
    let store = ctx.open_store()?;
    let overrides = args.overrides();
    let template = TemplateSelector::new(&store)
        .with_name_limits(ctx.config.naming)
        .lookup_template(ctx.namespace(args.namespace.as_deref()), name, overrides.as_ref())?;
    Ok(template)
}
