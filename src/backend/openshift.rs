use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Backend, collect_resources, command, string_field};
use crate::error::BackendError;
use crate::model::{RecordView, Resource, ResourceTag};

const POD_KIND: &str = "Pod";

/// Pods listed through `oc` (or `kubectl`, both speak the same JSON).
#[derive(Debug, Clone)]
pub struct OpenShiftBackend {
    command: Vec<String>,
    all_namespaces: bool,
}

impl OpenShiftBackend {
    pub const NAME: &'static str = "openshift";

    pub fn new(command: Vec<String>, all_namespaces: bool) -> Self {
        Self {
            command,
            all_namespaces,
        }
    }

    fn list_args(&self) -> Vec<&'static str> {
        let mut args = vec!["get", "pods", "-o", "json"];
        if self.all_namespaces {
            args.push("--all-namespaces");
        }
        args
    }
}

#[async_trait]
impl Backend for OpenShiftBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        let stdout = command::run(&self.command, &self.list_args()).await?;
        let resources = parse_list(&stdout)?;
        debug!(count = resources.len(), "openshift listing complete");
        Ok(resources)
    }

    async fn remove(&self, resource: &Resource) -> Result<(), BackendError> {
        if resource.tag() != &ResourceTag::OpenShiftPod {
            return Err(BackendError::Unsupported {
                backend: Self::NAME.to_string(),
                resource: resource.tag().to_string(),
                reason: "only pods can be deleted".to_string(),
            });
        }

        let metadata = resource.metadata().get("metadata");
        let name = metadata
            .and_then(|meta| string_field(meta, &["name"]))
            .ok_or_else(|| BackendError::UnexpectedPayload {
                backend: Self::NAME.to_string(),
                reason: format!("pod {} has no metadata.name", resource.id()),
            })?;
        let mut args = vec!["delete", "pod", name.as_str()];
        let namespace = metadata.and_then(|meta| string_field(meta, &["namespace"]));
        if let Some(namespace) = namespace.as_deref() {
            args.extend(["-n", namespace]);
        }

        command::run(&self.command, &args).await?;
        Ok(())
    }
}

/// Parses the `List` document printed by `get -o json`.
pub fn parse_list(stdout: &[u8]) -> Result<Vec<Resource>, BackendError> {
    let payload: Value =
        serde_json::from_slice(stdout).map_err(|source| BackendError::MalformedOutput {
            backend: OpenShiftBackend::NAME.to_string(),
            source,
        })?;

    let items = match payload {
        Value::Object(mut document) => match document.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            _ => {
                return Err(BackendError::UnexpectedPayload {
                    backend: OpenShiftBackend::NAME.to_string(),
                    reason: "list document has no items array".to_string(),
                });
            }
        },
        _ => {
            return Err(BackendError::UnexpectedPayload {
                backend: OpenShiftBackend::NAME.to_string(),
                reason: "expected a JSON list document".to_string(),
            });
        }
    };

    Ok(collect_resources(
        OpenShiftBackend::NAME,
        items,
        tag_for,
        qualified_name,
    ))
}

fn tag_for(item: &Value) -> ResourceTag {
    match item.get("kind").and_then(Value::as_str) {
        None => ResourceTag::OpenShiftPod,
        Some(kind) if kind.eq_ignore_ascii_case(POD_KIND) => ResourceTag::OpenShiftPod,
        Some(kind) => ResourceTag::Other(kind.to_ascii_lowercase()),
    }
}

fn qualified_name(item: &Value) -> Option<String> {
    let metadata = item.get("metadata")?;
    let name = string_field(metadata, &["name"])?;
    Some(match string_field(metadata, &["namespace"]) {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name,
    })
}

fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.0.as_second(), 0)
}

#[derive(Debug)]
struct PodView {
    pod: Pod,
}

impl RecordView for PodView {
    fn displayed_name(&self) -> String {
        self.pod.metadata.name.clone().unwrap_or_default()
    }

    fn status(&self) -> String {
        self.pod
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        let transition = self
            .pod
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .and_then(|conditions| conditions.first())
            .and_then(|condition| condition.last_transition_time.as_ref());

        transition
            .or(self.pod.metadata.creation_timestamp.as_ref())
            .and_then(to_utc)
    }
}

pub fn pod_view(value: &Value) -> Result<Box<dyn RecordView>, serde_json::Error> {
    let pod = Pod::deserialize(value)?;
    Ok(Box::new(PodView { pod }))
}
