use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Args};
use modelgrid_core::ModelReference;
use modelgrid_resolve::{
    CustomModelSpec, ModelRequest, ModelResolutionReason, ModelResolver, Resolution,
    ResolveError, WorkloadContext,
};
use serde::Serialize;

use super::{CommandContext, print_json};

#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("request")
        .required(true)
        .args(["model_ref", "image", "custom"])
))]
pub struct ResolveArgs {
    /// Workload namespace (default: [engine].namespace).
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Workload the model is resolved for.
    #[arg(short, long)]
    pub workload: String,
    /// Use an existing model by name.
    #[arg(long = "ref")]
    pub model_ref: Option<String>,
    /// Use the model serving this image, creating one if needed.
    #[arg(long)]
    pub image: Option<String>,
    /// JSON file holding `baseImage` and `modelSources`.
    #[arg(long)]
    pub custom: Option<PathBuf>,
    /// Previous model reference as JSON, reused while ready.
    #[arg(long)]
    pub previous: Option<String>,
    #[arg(long)]
    pub runtime_config: Option<String>,
    #[arg(long)]
    pub service_account: Option<String>,
    /// Image pull secret; repeatable.
    #[arg(long = "pull-secret")]
    pub pull_secrets: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport {
    reason: ModelResolutionReason,
    ready: bool,
    #[serde(flatten)]
    resolution: Resolution,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<ModelResolutionReason>,
    terminal: bool,
    /// Retry only once the request's fingerprint changes.
    fingerprint: String,
    error: String,
}

impl ResolveArgs {
    fn request(&self) -> anyhow::Result<ModelRequest> {
        if let Some(name) = &self.model_ref {
            return Ok(ModelRequest::Ref { name: name.clone() });
        }
        if let Some(image) = &self.image {
            return Ok(ModelRequest::Image {
                image: image.clone(),
            });
        }
        let path = self
            .custom
            .as_ref()
            .context("one of --ref, --image or --custom is required")?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let spec: CustomModelSpec = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(ModelRequest::Custom(spec))
    }

    fn previous(&self) -> anyhow::Result<Option<ModelReference>> {
        self.previous
            .as_deref()
            .map(|json| serde_json::from_str(json).context("parsing --previous"))
            .transpose()
    }

    fn workload(&self, ctx: &CommandContext) -> WorkloadContext {
        WorkloadContext {
            runtime_config_name: self.runtime_config.clone(),
            service_account_name: self.service_account.clone(),
            image_pull_secrets: self.pull_secrets.clone(),
            ..WorkloadContext::new(ctx.namespace(self.namespace.as_deref()), &self.workload)
        }
    }
}

pub fn resolve(ctx: &CommandContext, args: &ResolveArgs) -> anyhow::Result<()> {
    let request = args.request()?;
    match run(ctx, args, &request)? {
        Ok(resolution) => print_json(&ResolveReport {
            reason: resolution.reason(),
            ready: resolution.is_ready(),
            resolution,
        }),
        Err(e) => {
            print_json(&FailureReport {
                reason: e.reason(),
                terminal: e.is_terminal(),
                fingerprint: request.fingerprint(),
                error: e.to_string(),
            })?;
            Err(e.into())
        }
    }
}

/// Outer error: setup failed. Inner error: resolution failed.
fn run(
    ctx: &CommandContext,
    args: &ResolveArgs,
    request: &ModelRequest,
) -> anyhow::Result<Result<Resolution, ResolveError>> {
    let previous = args.previous()?;
    let store = ctx.open_store()?;
    Ok(ModelResolver::new(&store)
        .with_name_limits(ctx.config.naming)
        .resolve(request, &args.workload(ctx), previous.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgrid_core::{EngineConfig, Scope};
    use modelgrid_resolve::ResolutionPath;

    fn context() -> (tempfile::TempDir, CommandContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CommandContext::new(EngineConfig::default(), Some(dir.path().join("s.redb")));
        (dir, ctx)
    }

    fn image_args() -> ResolveArgs {
        ResolveArgs {
            workload: "chat".into(),
            image: Some("rocm/vllm:0.6.3".into()),
            service_account: Some("inference".into()),
            ..Default::default()
        }
    }

    #[test]
    fn image_request_creates_then_reuses() {
        let (_dir, ctx) = context();
        let args = image_args();
        let request = args.request().unwrap();

        let first = run(&ctx, &args, &request).unwrap().unwrap();
        assert_eq!(first.path, ResolutionPath::Created);
        assert_eq!(first.reference.namespace.as_deref(), Some("default"));
        assert_eq!(
            first.model.spec.service_account_name.as_deref(),
            Some("inference")
        );

        let second = run(&ctx, &args, &request).unwrap().unwrap();
        assert_eq!(second.path, ResolutionPath::ByImage);
        assert_eq!(second.reference, first.reference);
    }

    #[test]
    fn previous_reference_is_parsed_from_json() {
        let args = ResolveArgs {
            previous: Some(r#"{"name":"m","scope":"Cluster","kind":"ClusterModel"}"#.into()),
            ..image_args()
        };
        let previous = args.previous().unwrap().unwrap();
        assert_eq!(previous.scope, Scope::Cluster);
        assert_eq!(previous.name, "m");
    }

    #[test]
    fn custom_spec_is_read_from_file() {
        let (dir, ctx) = context();
        let file = dir.path().join("custom.json");
        std::fs::write(
            &file,
            r#"{"baseImage": "rocm/vllm:0.6.3", "modelSources": [
                {"modelId": "llama-3-8b", "sourceUri": "s3://weights/llama"}
            ]}"#,
        )
        .unwrap();
        let args = ResolveArgs {
            workload: "chat".into(),
            custom: Some(file),
            ..Default::default()
        };

        let request = args.request().unwrap();
        assert!(matches!(request, ModelRequest::Custom(_)));
        let resolution = run(&ctx, &args, &request).unwrap().unwrap();
        assert!(resolution.reference.name.starts_with("llama-3-8b-"));
    }

    #[test]
    fn missing_ref_is_reported_as_terminal() {
        let (_dir, ctx) = context();
        let args = ResolveArgs {
            workload: "chat".into(),
            model_ref: Some("ghost".into()),
            ..Default::default()
        };
        let request = args.request().unwrap();
        let err = run(&ctx, &args, &request).unwrap().unwrap_err();
        assert!(err.is_terminal());
        assert_eq!(err.reason(), Some(ModelResolutionReason::ModelNotFound));
    }
}
