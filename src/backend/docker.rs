use async_trait::async_trait;
use bollard::Docker;
use bollard::container::ListContainersOptions;
use bollard::image::ListImagesOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{Backend, collect_resources, short_id, string_field};
use crate::error::BackendError;
use crate::humanize::humanize_bytes;
use crate::model::{RecordView, Resource, ResourceTag};

const UNTAGGED: &str = "<none>:<none>";
const UNDIGESTED: &str = "<none>@<none>";

/// Docker Engine API backend listing images and, optionally, containers.
///
/// The API client is created on first use so constructing the backend never
/// touches the daemon socket.
pub struct DockerBackend {
    client: OnceCell<Docker>,
    include_containers: bool,
}

impl DockerBackend {
    pub const NAME: &'static str = "docker";

    pub fn new(include_containers: bool) -> Self {
        Self {
            client: OnceCell::new(),
            include_containers,
        }
    }

    async fn client(&self) -> Result<&Docker, BackendError> {
        self.client
            .get_or_try_init(|| async {
                Docker::connect_with_local_defaults().map_err(BackendError::from)
            })
            .await
    }

    async fn list_images(&self, client: &Docker) -> Result<Vec<Resource>, BackendError> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = client.list_images(Some(options)).await?;
        let items = to_values(&summaries);
        Ok(collect_resources(
            Self::NAME,
            items,
            |_| ResourceTag::DockerImage,
            |item| string_field(item, &["Id"]),
        ))
    }

    async fn list_containers(&self, client: &Docker) -> Result<Vec<Resource>, BackendError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let summaries = client.list_containers(Some(options)).await?;
        let items = to_values(&summaries);
        Ok(collect_resources(
            Self::NAME,
            items,
            |_| ResourceTag::DockerContainer,
            |item| string_field(item, &["Id"]),
        ))
    }
}

#[async_trait]
impl Backend for DockerBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        let client = self.client().await?;
        let mut resources = if self.include_containers {
            self.list_containers(client).await?
        } else {
            Vec::new()
        };
        resources.extend(self.list_images(client).await?);
        debug!(count = resources.len(), "docker listing complete");
        Ok(resources)
    }

    async fn remove(&self, resource: &Resource) -> Result<(), BackendError> {
        let client = self.client().await?;
        match resource.tag() {
            ResourceTag::DockerImage => {
                let _ = client.remove_image(resource.id(), None, None).await?;
            }
            ResourceTag::DockerContainer => {
                client.remove_container(resource.id(), None).await?;
            }
            other => {
                return Err(BackendError::Unsupported {
                    backend: Self::NAME.to_string(),
                    resource: other.to_string(),
                    reason: "not a docker resource".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn to_values<T: Serialize>(summaries: &[T]) -> Vec<Value> {
    summaries
        .iter()
        .filter_map(|summary| match serde_json::to_value(summary) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%error, "skipping docker record that failed to serialize");
                None
            }
        })
        .collect()
}

fn epoch(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}

#[derive(Debug, Deserialize)]
struct DockerImageRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
    #[serde(rename = "RepoDigests", default)]
    repo_digests: Option<Vec<String>>,
    #[serde(rename = "Created", default)]
    created: Option<i64>,
    #[serde(rename = "VirtualSize", default)]
    virtual_size: Option<i64>,
    #[serde(rename = "Size", default)]
    size: Option<i64>,
}

impl RecordView for DockerImageRecord {
    fn displayed_name(&self) -> String {
        let tagged = self
            .repo_tags
            .iter()
            .flatten()
            .find(|tag| tag.as_str() != UNTAGGED);
        let digested = || {
            self.repo_digests
                .iter()
                .flatten()
                .find(|digest| digest.as_str() != UNDIGESTED)
        };
        tagged
            .or_else(digested)
            .cloned()
            .unwrap_or_else(|| short_id(&self.id))
    }

    fn status(&self) -> String {
        let size = self.virtual_size.or(self.size).unwrap_or(0).max(0);
        humanize_bytes(size as u64)
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        epoch(self.created)
    }
}

#[derive(Debug, Deserialize)]
struct DockerContainerRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Option<Vec<String>>,
    #[serde(rename = "Image", default)]
    image: Option<String>,
    #[serde(rename = "Command", default)]
    command: Option<String>,
    #[serde(rename = "Created", default)]
    created: Option<i64>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
}

impl RecordView for DockerContainerRecord {
    fn displayed_name(&self) -> String {
        let name = self
            .names
            .iter()
            .flatten()
            .map(|name| name.trim_start_matches('/'))
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| short_id(&self.id));

        [Some(name), self.image.clone(), self.command.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn status(&self) -> String {
        self.status.clone().unwrap_or_else(|| "unknown".to_string())
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        epoch(self.created)
    }
}

pub fn image_view(value: &Value) -> Result<Box<dyn RecordView>, serde_json::Error> {
    let record = DockerImageRecord::deserialize(value)?;
    Ok(Box::new(record))
}

pub fn container_view(value: &Value) -> Result<Box<dyn RecordView>, serde_json::Error> {
    let record = DockerContainerRecord::deserialize(value)?;
    Ok(Box::new(record))
}
