use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Backend, collect_resources, command, short_id, string_field};
use crate::error::BackendError;
use crate::humanize::humanize_bytes;
use crate::model::{RecordView, Resource, ResourceTag};

/// Podman images listed through the CLI.
///
/// `command` is the program prefix, `["podman"]` by default or something like
/// `["sudo", "podman"]` for rootful storage.
#[derive(Debug, Clone)]
pub struct PodmanBackend {
    command: Vec<String>,
}

impl PodmanBackend {
    pub const NAME: &'static str = "podman";

    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Default for PodmanBackend {
    fn default() -> Self {
        Self::new(vec!["podman".to_string()])
    }
}

#[async_trait]
impl Backend for PodmanBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        let stdout = command::run(&self.command, &["images", "--format", "json"]).await?;
        let resources = parse_images(&stdout)?;
        debug!(count = resources.len(), "podman listing complete");
        Ok(resources)
    }

    async fn remove(&self, resource: &Resource) -> Result<(), BackendError> {
        if resource.tag() != &ResourceTag::PodmanImage {
            return Err(BackendError::Unsupported {
                backend: Self::NAME.to_string(),
                resource: resource.tag().to_string(),
                reason: "only images are managed through podman".to_string(),
            });
        }
        command::run(&self.command, &["rmi", resource.id()]).await?;
        Ok(())
    }
}

/// Parses `podman images --format json` output. Blank output means no images.
pub fn parse_images(stdout: &[u8]) -> Result<Vec<Resource>, BackendError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let payload: Value =
        serde_json::from_slice(stdout).map_err(|source| BackendError::MalformedOutput {
            backend: PodmanBackend::NAME.to_string(),
            source,
        })?;
    let Value::Array(items) = payload else {
        return Err(BackendError::UnexpectedPayload {
            backend: PodmanBackend::NAME.to_string(),
            reason: "expected a JSON array of images".to_string(),
        });
    };

    Ok(collect_resources(
        PodmanBackend::NAME,
        items,
        |_| ResourceTag::PodmanImage,
        |item| string_field(item, &["id", "Id", "ID"]),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Created {
    Epoch(i64),
    Text(String),
}

impl Created {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch(seconds) => DateTime::from_timestamp(*seconds, 0),
            Self::Text(text) => parse_created_text(text),
        }
    }
}

// Older releases print Go's default time format, e.g.
// `2018-03-07 20:51:34.488688562 +0000 UTC`.
fn parse_created_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    let trimmed = text.trim();
    let without_zone_name = match trimmed.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => trimmed,
    };
    DateTime::parse_from_str(without_zone_name, "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
struct PodmanImageRecord {
    #[serde(alias = "Id", alias = "ID")]
    id: String,
    #[serde(alias = "Names", default)]
    names: Option<Vec<String>>,
    #[serde(alias = "Created", default)]
    created: Option<Created>,
    #[serde(alias = "Size", default)]
    size: Option<u64>,
}

impl RecordView for PodmanImageRecord {
    fn displayed_name(&self) -> String {
        self.names
            .iter()
            .flatten()
            .find(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| short_id(&self.id))
    }

    fn status(&self) -> String {
        humanize_bytes(self.size.unwrap_or(0))
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.created.as_ref().and_then(Created::timestamp)
    }
}

pub fn image_view(value: &Value) -> Result<Box<dyn RecordView>, serde_json::Error> {
    let record = PodmanImageRecord::deserialize(value)?;
    Ok(Box::new(record))
}
