use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use super::Backend;
use crate::error::BackendError;
use crate::model::{Resource, ResourceTag};

/// In-memory backend for engine and store tests.
pub struct FakeBackend {
    name: String,
    resources: Vec<Resource>,
    fail_list: bool,
    delay: Option<Duration>,
    removal_delay: Option<Duration>,
    rejected: BTreeSet<String>,
    removed: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            resources: Vec::new(),
            fail_list: false,
            delay: None,
            removal_delay: None,
            rejected: BTreeSet::new(),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn slow_removal(mut self, delay: Duration) -> Self {
        self.removal_delay = Some(delay);
        self
    }

    pub fn rejecting(mut self, id: &str) -> Self {
        self.rejected.insert(id.to_string());
        self
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list {
            return Err(BackendError::UnexpectedPayload {
                backend: self.name.clone(),
                reason: "listing refused".to_string(),
            });
        }
        Ok(self.resources.clone())
    }

    async fn remove(&self, resource: &Resource) -> Result<(), BackendError> {
        if let Some(delay) = self.removal_delay {
            tokio::time::sleep(delay).await;
        }
        if self.rejected.contains(resource.id()) {
            return Err(BackendError::UnexpectedPayload {
                backend: self.name.clone(),
                reason: format!("{} is in use", resource.id()),
            });
        }
        if let Ok(mut removed) = self.removed.lock() {
            removed.push(resource.id().to_string());
        }
        Ok(())
    }
}

pub fn docker_image(id: &str, tag: &str) -> Resource {
    Resource::new(
        "docker",
        ResourceTag::DockerImage,
        id,
        json!({
            "Id": id,
            "RepoTags": [tag],
            "RepoDigests": [],
            "Created": 1_520_455_894,
            "VirtualSize": 246_136_632,
            "Size": 246_136_632
        }),
    )
}

pub fn podman_image(id: &str, name: &str) -> Resource {
    Resource::new(
        "podman",
        ResourceTag::PodmanImage,
        id,
        json!({
            "id": id,
            "names": [name],
            "created": "2018-03-07T20:51:34.488688562Z",
            "size": 1024
        }),
    )
}

pub fn openshift_pod(namespace: &str, name: &str, phase: &str) -> Resource {
    Resource::new(
        "openshift",
        ResourceTag::OpenShiftPod,
        format!("{namespace}/{name}"),
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "creationTimestamp": "2024-04-30T08:00:00Z"
            },
            "status": {"phase": phase}
        }),
    )
}
