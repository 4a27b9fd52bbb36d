//! Container image reference parsing.
//!
//! Splits references such as `ghcr.io/org/llama-3-8b:v1.2.0`,
//! `localhost:5000/model:dev` or `nginx` into sanitized components used to
//! derive model names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::sanitize_component;

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";

/// Number of digest characters used as the tag of a digest reference.
const DIGEST_TAG_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParts {
    /// Sanitized registry host, `docker.io` when implicit.
    pub registry: String,
    /// Repository path without tag or digest, unsanitized.
    pub repository: String,
    /// Sanitized last path component.
    pub name: String,
    /// Sanitized tag, or the first digest characters.
    pub tag: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image reference is empty")]
    Empty,
    #[error("malformed digest reference: {0}")]
    MalformedDigest(String),
    #[error("malformed tag reference (empty tag): {0}")]
    EmptyTag(String),
    #[error("{component} is empty after sanitization: {image}")]
    EmptyComponent {
        component: &'static str,
        image: String,
    },
}

impl ImageParts {
    pub fn parse(image: &str) -> Result<Self, ImageError> {
        if image.is_empty() {
            return Err(ImageError::Empty);
        }

        let (registry, repository) = match image.split_once('/') {
            Some((first, rest))
                if !first.is_empty()
                    && (first.contains('.') || first.contains(':') || first == "localhost") =>
            {
                (first, rest)
            }
            _ => (DEFAULT_REGISTRY, image),
        };

        let (parent, last) = match repository.rsplit_once('/') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, repository),
        };

        let (name, tag) = if let Some((name, digest)) = last.split_once('@') {
            let (_, hash) = digest
                .split_once(':')
                .ok_or_else(|| ImageError::MalformedDigest(image.to_string()))?;
            if hash.is_empty() {
                return Err(ImageError::MalformedDigest(image.to_string()));
            }
            let end = hash
                .char_indices()
                .nth(DIGEST_TAG_LEN)
                .map(|(i, _)| i)
                .unwrap_or(hash.len());
            (name, &hash[..end])
        } else if let Some((name, tag)) = last.split_once(':') {
            if tag.is_empty() {
                return Err(ImageError::EmptyTag(image.to_string()));
            }
            (name, tag)
        } else {
            (last, DEFAULT_TAG)
        };

        let repository = match parent {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        };

        let parts = ImageParts {
            registry: sanitize_component(registry),
            repository,
            name: sanitize_component(name),
            tag: sanitize_component(tag),
        };
        for (component, value) in [
            ("registry", &parts.registry),
            ("image name", &parts.name),
            ("image tag", &parts.tag),
        ] {
            if value.is_empty() {
                return Err(ImageError::EmptyComponent {
                    component,
                    image: image.to_string(),
                });
            }
        }
        Ok(parts)
    }
}
