//! Deterministic derived-name generation.
//!
//! Names are built from ordered human-readable parts, each sanitized to an
//! RFC 1123 label fragment, optionally suffixed with a short SHA-256 digest
//! of the inputs that make the name unique. The longest part is shortened
//! first until the result fits the length limit, so the hash suffix always
//! survives truncation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::image::{ImageError, ImageParts};
use crate::types::{ModelSource, ServiceOverrides};

pub const MAX_NAME_LENGTH: usize = 63;
pub const DEFAULT_HASH_LENGTH: usize = 8;
/// Hash length used for image-derived model names.
pub const IMAGE_MODEL_HASH_LENGTH: usize = 4;
/// Separator part marking a name derived from overrides.
pub const OVERRIDE_MARKER: &str = "ovr";

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("literal pattern"));
static MULTI_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("literal pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name parts cannot be empty")]
    NoParts,
    #[error("max length must be between 1 and {MAX_NAME_LENGTH}, got {0}")]
    InvalidMaxLength(usize),
    #[error("hash length must be at most 64, got {0}")]
    InvalidHashLength(usize),
    #[error("name {name:?} cannot be shortened to {max_length} characters")]
    DoesNotFit { name: String, max_length: usize },
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Length limits applied to generated names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameLimits {
    pub hash_length: usize,
    pub max_length: usize,
}

impl Default for NameLimits {
    fn default() -> Self {
        Self {
            hash_length: DEFAULT_HASH_LENGTH,
            max_length: MAX_NAME_LENGTH,
        }
    }
}

impl NameLimits {
    pub fn with_hash_length(self, hash_length: usize) -> Self {
        Self {
            hash_length,
            ..self
        }
    }
}

/// Lowercase, replace invalid runs with `-`, collapse and trim dashes.
pub fn sanitize_component(s: &str) -> String {
    let lower = s.to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lower, "-");
    let collapsed = MULTI_DASH.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Hex SHA-256 over the JSON-encoded inputs joined by `|`.
pub fn compute_hash<S: AsRef<str>>(inputs: &[S]) -> String {
    let combined = inputs
        .iter()
        .map(|s| serde_json::Value::String(s.as_ref().to_string()).to_string())
        .collect::<Vec<_>>()
        .join("|");
    hex::encode(Sha256::digest(combined.as_bytes()))
}

/// Join sanitized `parts` with `-`, appending a hash of `hash_inputs`.
///
/// No hash is appended when `hash_inputs` is empty or the hash length is 0.
pub fn generate_derived_name<S: AsRef<str>>(
    parts: &[&str],
    hash_inputs: &[S],
    limits: NameLimits,
) -> Result<String, NameError> {
    if parts.is_empty() {
        return Err(NameError::NoParts);
    }
    if limits.max_length == 0 || limits.max_length > MAX_NAME_LENGTH {
        return Err(NameError::InvalidMaxLength(limits.max_length));
    }
    if limits.hash_length > 64 {
        return Err(NameError::InvalidHashLength(limits.hash_length));
    }

    let mut sanitized: Vec<String> = parts
        .iter()
        .map(|p| {
            let s = sanitize_component(p);
            if s.is_empty() { "part".to_string() } else { s }
        })
        .collect();

    let suffix = if limits.hash_length > 0 && !hash_inputs.is_empty() {
        compute_hash(hash_inputs)[..limits.hash_length].to_string()
    } else {
        String::new()
    };

    let total_len = |parts: &[String]| -> usize {
        let joined: usize = parts.iter().map(|p| p.len() + 1).sum();
        if suffix.is_empty() {
            joined - 1
        } else {
            joined + suffix.len()
        }
    };

    while total_len(&sanitized) > limits.max_length {
        let (longest, len) = sanitized
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, p)| if p.len() > best.1 { (i, p.len()) } else { best });
        if len <= 1 {
            break;
        }
        let part = &mut sanitized[longest];
        part.truncate(len - 1);
        let trimmed = part.trim_end_matches('-').len();
        part.truncate(trimmed);
    }

    let fits = total_len(&sanitized) <= limits.max_length;
    let mut name = sanitized.join("-");
    if !suffix.is_empty() {
        name.push('-');
        name.push_str(&suffix);
    }
    if !fits {
        return Err(NameError::DoesNotFit {
            name,
            max_length: limits.max_length,
        });
    }
    Ok(name)
}

/// Name of a template derived from `base` by applying `overrides`.
///
/// Dimensions are taken in the fixed order GPU model, GPU count, precision,
/// metric. When no dimension is set the base name is returned unchanged.
pub fn derived_template_name(
    base: &str,
    overrides: &ServiceOverrides,
    limits: NameLimits,
) -> Result<String, NameError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut hash_inputs: Vec<String> = vec![base.to_string()];

    if let Some(gpu) = &overrides.gpu_selector {
        let model = gpu.model.trim();
        if !model.is_empty() {
            tokens.push(model.to_lowercase());
            hash_inputs.push(format!("gpu.model={model}"));
        }
        if gpu.count > 0 {
            tokens.push(format!("{}gpu", gpu.count));
            hash_inputs.push(format!("gpu.count={}", gpu.count));
        }
    }
    for (key, value) in [
        ("precision", &overrides.precision),
        ("metric", &overrides.metric),
    ] {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            tokens.push(value.to_lowercase());
            hash_inputs.push(format!("{key}={value}"));
        }
    }

    if tokens.is_empty() {
        return Ok(base.to_string());
    }

    let mut parts: Vec<&str> = vec![base, OVERRIDE_MARKER];
    parts.extend(tokens.iter().map(String::as_str));
    generate_derived_name(&parts, &hash_inputs, limits)
}

/// Name for a model auto-created from a container image.
pub fn model_name_for_image(image: &str, limits: NameLimits) -> Result<String, NameError> {
    let parts = ImageParts::parse(image)?;
    generate_derived_name(
        &[parts.name.as_str(), parts.tag.as_str()],
        &[image],
        limits.with_hash_length(IMAGE_MODEL_HASH_LENGTH),
    )
}

/// Name for a model auto-created from a custom base image and sources.
///
/// The readable part comes from the first model id; every source feeds the
/// hash in order, each as id, URI and endpoint.
pub fn custom_model_name(
    base_image: &str,
    sources: &[ModelSource],
    limits: NameLimits,
) -> Result<String, NameError> {
    let Some(first) = sources.first() else {
        return generate_derived_name(&["custom-model"], &[base_image], limits);
    };
    let mut hash_inputs = vec![base_image];
    for source in sources {
        hash_inputs.extend([
            source.model_id.as_str(),
            source.source_uri.as_str(),
            source.endpoint(),
        ]);
    }
    generate_derived_name(&[first.model_id.as_str()], &hash_inputs, limits)
}

/// Name for a template generated from a discovered runtime profile:
/// `{image}-{count}x-{gpu}-{lat|thr}-{precision}-{hash4}`.
pub fn profile_template_name(
    image_name: &str,
    gpu: &str,
    gpu_count: u32,
    metric: &str,
    precision: &str,
    limits: NameLimits,
) -> Result<String, NameError> {
    let metric_token = match metric.to_lowercase().as_str() {
        "latency" => "lat".to_string(),
        "throughput" => "thr".to_string(),
        other => other.to_string(),
    };
    let count = format!("{gpu_count}x");
    let raw_count = gpu_count.to_string();
    generate_derived_name(
        &[image_name, count.as_str(), gpu, metric_token.as_str(), precision],
        &[image_name, gpu, raw_count.as_str(), metric, precision],
        limits.with_hash_length(IMAGE_MODEL_HASH_LENGTH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GpuSelector;

    fn overrides(
        gpu: Option<(&str, u32)>,
        precision: Option<&str>,
        metric: Option<&str>,
    ) -> ServiceOverrides {
        ServiceOverrides {
            metric: metric.map(String::from),
            precision: precision.map(String::from),
            gpu_selector: gpu.map(|(model, count)| GpuSelector {
                model: model.to_string(),
                count,
            }),
        }
    }

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize_component("  Llama_3.1//8B--Instruct "), "llama-3-1-8b-instruct");
        assert_eq!(sanitize_component("---"), "");
    }

    #[test]
    fn derived_name_is_stable_and_suffixed() {
        let a = generate_derived_name(&["Base", "part"], &["x", "y"], NameLimits::default()).unwrap();
        let b = generate_derived_name(&["Base", "part"], &["x", "y"], NameLimits::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("base-part-"));
        assert_eq!(a.len(), "base-part-".len() + DEFAULT_HASH_LENGTH);
    }

    #[test]
    fn derived_name_without_hash_inputs_has_no_suffix() {
        let name = generate_derived_name::<&str>(&["a", "b"], &[], NameLimits::default()).unwrap();
        assert_eq!(name, "a-b");
    }

    #[test]
    fn empty_part_becomes_placeholder() {
        let name = generate_derived_name::<&str>(&["!!", "x"], &[], NameLimits::default()).unwrap();
        assert_eq!(name, "part-x");
    }

    #[test]
    fn long_names_truncate_longest_part_and_keep_hash() {
        let long = "a".repeat(80);
        let name = generate_derived_name(&[long.as_str(), "short"], &["seed"], NameLimits::default()).unwrap();
        assert!(name.len() <= MAX_NAME_LENGTH);
        assert!(name.contains("-short-"));
        let hash = &compute_hash(&["seed"])[..DEFAULT_HASH_LENGTH];
        assert!(name.ends_with(hash));
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let limits = NameLimits {
            max_length: 64,
            ..Default::default()
        };
        assert_eq!(
            generate_derived_name(&["a"], &["b"], limits),
            Err(NameError::InvalidMaxLength(64))
        );
        assert_eq!(
            generate_derived_name::<&str>(&[], &[], NameLimits::default()),
            Err(NameError::NoParts)
        );
    }

    #[test]
    fn template_name_without_overrides_is_base() {
        let name =
            derived_template_name("llama-base", &ServiceOverrides::default(), NameLimits::default())
                .unwrap();
        assert_eq!(name, "llama-base");
    }

    #[test]
    fn template_name_orders_dimensions() {
        let name = derived_template_name(
            "llama",
            &overrides(Some(("MI300X", 4)), Some("fp16"), Some("latency")),
            NameLimits::default(),
        )
        .unwrap();
        assert!(name.starts_with("llama-ovr-mi300x-4gpu-fp16-latency-"), "{name}");
        assert!(name.len() <= MAX_NAME_LENGTH);
    }

    #[test]
    fn template_name_is_deterministic_and_sensitive_to_values() {
        let o = overrides(None, Some("fp8"), Some("throughput"));
        let first = derived_template_name("base", &o, NameLimits::default()).unwrap();
        let second = derived_template_name("base", &o, NameLimits::default()).unwrap();
        assert_eq!(first, second);

        let other = overrides(None, Some("fp16"), Some("throughput"));
        let third = derived_template_name("base", &other, NameLimits::default()).unwrap();
        assert_ne!(first, third);
    }

    #[test]
    fn template_name_distinguishes_dimension_keys() {
        // Same token under a different dimension must not collide.
        let a = derived_template_name("base", &overrides(None, Some("x"), None), NameLimits::default())
            .unwrap();
        let b = derived_template_name("base", &overrides(None, None, Some("x")), NameLimits::default())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn image_model_name_uses_short_hash() {
        let name = model_name_for_image("ghcr.io/org/llama-3-8b:v1.2.0", NameLimits::default()).unwrap();
        assert!(name.starts_with("llama-3-8b-v1-2-0-"), "{name}");
        assert_eq!(name.len(), "llama-3-8b-v1-2-0-".len() + IMAGE_MODEL_HASH_LENGTH);
        assert!(matches!(
            model_name_for_image("", NameLimits::default()),
            Err(NameError::Image(ImageError::Empty))
        ));
    }

    #[test]
    fn custom_model_name_tracks_endpoint() {
        let mut source = ModelSource {
            model_id: "Org/Llama-3".into(),
            source_uri: "s3://bucket/llama".into(),
            env: Default::default(),
        };
        let plain = custom_model_name("rocm/vllm:latest", &[source.clone()], NameLimits::default())
            .unwrap();
        assert!(plain.starts_with("org-llama-3-"));

        source
            .env
            .insert(crate::types::S3_ENDPOINT_ENV.into(), "http://minio:9000".into());
        let with_endpoint =
            custom_model_name("rocm/vllm:latest", &[source], NameLimits::default()).unwrap();
        assert_ne!(plain, with_endpoint);

        let generic = custom_model_name("rocm/vllm:latest", &[], NameLimits::default()).unwrap();
        assert!(generic.starts_with("custom-model-"));
    }

    #[test]
    fn custom_model_name_covers_every_source() {
        let source = |id: &str| ModelSource {
            model_id: id.into(),
            source_uri: format!("s3://weights/{id}"),
            env: Default::default(),
        };
        let with_a = [source("llama"), source("adapter-a")];
        let with_b = [source("llama"), source("adapter-b")];
        let base = "rocm/vllm:0.6";

        let a = custom_model_name(base, &with_a, NameLimits::default()).unwrap();
        let b = custom_model_name(base, &with_b, NameLimits::default()).unwrap();
        assert!(a.starts_with("llama-") && b.starts_with("llama-"));
        assert_ne!(a, b);

        let reordered = [source("adapter-a"), source("llama")];
        let c = custom_model_name(base, &reordered, NameLimits::default()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn names_that_cannot_fit_are_rejected() {
        let limits = NameLimits {
            hash_length: 8,
            max_length: 10,
        };
        let err = generate_derived_name(&["model", "tag"], &["seed"], limits).unwrap_err();
        assert!(matches!(err, NameError::DoesNotFit { max_length: 10, .. }));

        let roomy = NameLimits {
            hash_length: 8,
            max_length: 12,
        };
        let name = generate_derived_name(&["model", "tag"], &["seed"], roomy).unwrap();
        assert!(name.len() <= 12, "{name}");
    }

    #[test]
    fn profile_template_name_abbreviates_metric() {
        let name =
            profile_template_name("llama-3-8b", "MI300X", 1, "latency", "fp8", NameLimits::default())
                .unwrap();
        assert!(name.starts_with("llama-3-8b-1x-mi300x-lat-fp8-"), "{name}");
    }
}
