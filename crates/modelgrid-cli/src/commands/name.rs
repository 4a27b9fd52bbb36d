use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use modelgrid_core::naming::{
    custom_model_name, derived_template_name, model_name_for_image, profile_template_name,
};
use modelgrid_core::{GpuSelector, NameLimits, ServiceOverrides};
use modelgrid_resolve::CustomModelSpec;

use super::CommandContext;

#[derive(Subcommand, Debug)]
pub enum NameKind {
    /// Template derived from a base template by overrides.
    Template {
        base: String,
        #[arg(long)]
        gpu: Option<String>,
        #[arg(long, default_value_t = 0)]
        gpu_count: u32,
        #[arg(long)]
        precision: Option<String>,
        #[arg(long)]
        metric: Option<String>,
    },
    /// Model created for a container image.
    Image { image: String },
    /// Model created for a custom spec (JSON file).
    Custom { file: PathBuf },
    /// Template generated for a discovered runtime profile.
    Profile {
        /// Image name, without registry or tag.
        image_name: String,
        #[arg(long)]
        gpu: String,
        #[arg(long, default_value_t = 1)]
        gpu_count: u32,
        #[arg(long)]
        metric: String,
        #[arg(long)]
        precision: String,
    },
}

pub fn derive_name(ctx: &CommandContext, kind: &NameKind) -> anyhow::Result<()> {
    println!("{}", name_for(kind, ctx.config.naming)?);
    Ok(())
}

fn name_for(kind: &NameKind, limits: NameLimits) -> anyhow::Result<String> {
    let name = match kind {
        NameKind::Template {
            base,
            gpu,
            gpu_count,
            precision,
            metric,
        } => {
            let gpu_selector = (gpu.is_some() || *gpu_count > 0).then(|| GpuSelector {
                model: gpu.clone().unwrap_or_default(),
                count: *gpu_count,
            });
            let overrides = ServiceOverrides {
                metric: metric.clone(),
                precision: precision.clone(),
                gpu_selector,
            };
            derived_template_name(base, &overrides, limits)?
        }
        NameKind::Image { image } => model_name_for_image(image.trim(), limits)?,
        NameKind::Custom { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let spec: CustomModelSpec = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", file.display()))?;
            custom_model_name(spec.base_image.trim(), &spec.model_sources, limits)?
        }
        NameKind::Profile {
            image_name,
            gpu,
            gpu_count,
            metric,
            precision,
        } => profile_template_name(image_name, gpu, *gpu_count, metric, precision, limits)?,
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_without_overrides_keeps_base() {
        let kind = NameKind::Template {
            base: "llama-base".into(),
            gpu: None,
            gpu_count: 0,
            precision: None,
            metric: None,
        };
        assert_eq!(name_for(&kind, NameLimits::default()).unwrap(), "llama-base");
    }

    #[test]
    fn template_with_overrides_orders_tokens() {
        let kind = NameKind::Template {
            base: "llama".into(),
            gpu: Some("MI300X".into()),
            gpu_count: 4,
            precision: Some("fp16".into()),
            metric: Some("latency".into()),
        };
        let name = name_for(&kind, NameLimits::default()).unwrap();
        assert!(name.starts_with("llama-ovr-mi300x-4gpu-fp16-latency-"), "{name}");
        assert!(name.len() <= 63);
    }

    #[test]
    fn profile_names_abbreviate_metric() {
        let kind = NameKind::Profile {
            image_name: "vllm".into(),
            gpu: "MI300X".into(),
            gpu_count: 8,
            metric: "throughput".into(),
            precision: "fp8".into(),
        };
        let name = name_for(&kind, NameLimits::default()).unwrap();
        assert!(name.starts_with("vllm-8x-mi300x-thr-fp8-"), "{name}");
    }

    #[test]
    fn configured_limits_apply() {
        let kind = NameKind::Image {
            image: "ghcr.io/org/a-very-long-model-name-for-testing:release-2024-10".into(),
        };
        let limits = NameLimits {
            max_length: 20,
            ..NameLimits::default()
        };
        let name = name_for(&kind, limits).unwrap();
        assert!(name.len() <= 20, "{name}");
    }

    #[test]
    fn bad_image_is_an_error() {
        let kind = NameKind::Image {
            image: "ghcr.io/org/llama:".into(),
        };
        assert!(name_for(&kind, NameLimits::default()).is_err());
    }
}
