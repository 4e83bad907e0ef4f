use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::backend::{Backend, docker, openshift, podman};
use crate::error::BackendError;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ResourceTag {
    DockerImage,
    DockerContainer,
    PodmanImage,
    OpenShiftPod,
    Other(String),
}

impl ResourceTag {
    pub fn resource_type(&self) -> &str {
        match self {
            Self::DockerImage | Self::PodmanImage => "image",
            Self::DockerContainer => "container",
            Self::OpenShiftPod => "pod",
            Self::Other(kind) => kind,
        }
    }
}

impl Display for ResourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DockerImage => write!(f, "docker-image"),
            Self::DockerContainer => write!(f, "docker-container"),
            Self::PodmanImage => write!(f, "podman-image"),
            Self::OpenShiftPod => write!(f, "openshift-pod"),
            Self::Other(kind) => write!(f, "other({kind})"),
        }
    }
}

/// A raw runtime object as one backend returned it.
///
/// `metadata` is the backend's payload verbatim; `id` is whatever the owning
/// backend needs to remove the object again.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    backend: String,
    tag: ResourceTag,
    id: String,
    metadata: Value,
}

impl Resource {
    pub fn new(
        backend: impl Into<String>,
        tag: ResourceTag,
        id: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            backend: backend.into(),
            tag,
            id: id.into(),
            metadata,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn tag(&self) -> &ResourceTag {
        &self.tag
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn resource_type(&self) -> &str {
        self.tag.resource_type()
    }
}

/// Presentation of one decoded backend record.
pub trait RecordView: Send + Sync + Debug {
    fn displayed_name(&self) -> String;
    fn status(&self) -> String;
    fn last_changed(&self) -> Option<DateTime<Utc>>;
}

pub type ViewBuilder = fn(&Value) -> Result<Box<dyn RecordView>, serde_json::Error>;

pub fn view_builder(tag: &ResourceTag) -> Option<ViewBuilder> {
    let builder: ViewBuilder = match tag {
        ResourceTag::DockerImage => docker::image_view,
        ResourceTag::DockerContainer => docker::container_view,
        ResourceTag::PodmanImage => podman::image_view,
        ResourceTag::OpenShiftPod => openshift::pod_view,
        ResourceTag::Other(_) => return None,
    };
    Some(builder)
}

#[async_trait]
pub trait Displayable: Send + Sync {
    fn backend_name(&self) -> &str;
    fn displayed_name(&self) -> String;
    fn resource_type(&self) -> &str;
    fn status(&self) -> String;
    fn last_changed(&self) -> Option<DateTime<Utc>>;
    async fn remove(&self) -> Result<(), BackendError>;
}

pub struct DisplayedItem {
    backend: Arc<dyn Backend>,
    resource: Resource,
    view: Box<dyn RecordView>,
    last_changed: OnceLock<Option<DateTime<Utc>>>,
}

impl DisplayedItem {
    /// Wraps `resource` for display, or returns `None` when nothing knows how
    /// to present it. Both cases of `None` are logged.
    pub fn resolve(backend: Arc<dyn Backend>, resource: Resource) -> Option<Self> {
        let Some(builder) = view_builder(resource.tag()) else {
            warn!(
                backend = backend.name(),
                tag = %resource.tag(),
                id = resource.id(),
                "no display mapping for resource"
            );
            return None;
        };

        match builder(resource.metadata()) {
            Ok(view) => Some(Self::from_parts(backend, resource, view)),
            Err(error) => {
                warn!(
                    backend = backend.name(),
                    tag = %resource.tag(),
                    id = resource.id(),
                    %error,
                    "skipping resource with malformed metadata"
                );
                None
            }
        }
    }

    pub(crate) fn from_parts(
        backend: Arc<dyn Backend>,
        resource: Resource,
        view: Box<dyn RecordView>,
    ) -> Self {
        Self {
            backend,
            resource,
            view,
            last_changed: OnceLock::new(),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn metadata_json(&self) -> String {
        serde_json::to_string_pretty(self.resource.metadata())
            .unwrap_or_else(|error| format!("failed to format metadata: {error}"))
    }
}

impl Debug for DisplayedItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayedItem")
            .field("backend", &self.backend.name())
            .field("resource", &self.resource)
            .field("view", &self.view)
            .finish()
    }
}

#[async_trait]
impl Displayable for DisplayedItem {
    fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn displayed_name(&self) -> String {
        self.view.displayed_name()
    }

    fn resource_type(&self) -> &str {
        self.resource.resource_type()
    }

    fn status(&self) -> String {
        self.view.status()
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        *self.last_changed.get_or_init(|| self.view.last_changed())
    }

    async fn remove(&self) -> Result<(), BackendError> {
        self.backend.remove(&self.resource).await
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayedItem, Displayable, RecordView, Resource, ResourceTag};
    use crate::backend::fake::{FakeBackend, docker_image};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingView {
        reads: Arc<AtomicUsize>,
    }

    impl RecordView for CountingView {
        fn displayed_name(&self) -> String {
            "counting".to_string()
        }

        fn status(&self) -> String {
            "ok".to_string()
        }

        fn last_changed(&self) -> Option<DateTime<Utc>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(1_520_455_894, 0).single()
        }
    }

    #[test]
    fn tags_map_to_resource_types() {
        assert_eq!(ResourceTag::DockerImage.resource_type(), "image");
        assert_eq!(ResourceTag::PodmanImage.resource_type(), "image");
        assert_eq!(ResourceTag::DockerContainer.resource_type(), "container");
        assert_eq!(ResourceTag::OpenShiftPod.resource_type(), "pod");
        assert_eq!(
            ResourceTag::Other("deploymentconfig".to_string()).resource_type(),
            "deploymentconfig"
        );
    }

    #[test]
    fn resolve_wraps_mapped_resources() {
        let backend = Arc::new(FakeBackend::new("docker"));
        let item = DisplayedItem::resolve(backend, docker_image("sha256:aaa", "fedora:27"))
            .expect("docker images are mapped");
        assert_eq!(item.backend_name(), "docker");
        assert_eq!(item.displayed_name(), "fedora:27");
        assert_eq!(item.resource_type(), "image");
    }

    #[test]
    fn resolve_drops_unmapped_tags() {
        let backend = Arc::new(FakeBackend::new("openshift"));
        let resource = Resource::new(
            "openshift",
            ResourceTag::Other("build".to_string()),
            "default/build-1",
            json!({"kind": "Build"}),
        );
        assert!(DisplayedItem::resolve(backend, resource).is_none());
    }

    #[test]
    fn resolve_drops_records_that_do_not_decode() {
        let backend = Arc::new(FakeBackend::new("docker"));
        let resource = Resource::new(
            "docker",
            ResourceTag::DockerImage,
            "sha256:bad",
            json!({"Id": 42}),
        );
        assert!(DisplayedItem::resolve(backend, resource).is_none());
    }

    #[test]
    fn last_changed_is_computed_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let item = DisplayedItem::from_parts(
            Arc::new(FakeBackend::new("docker")),
            docker_image("sha256:aaa", "fedora:27"),
            Box::new(CountingView {
                reads: Arc::clone(&reads),
            }),
        );

        let first = item.last_changed();
        let second = item.last_changed();
        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metadata_json_is_the_raw_payload() {
        let backend = Arc::new(FakeBackend::new("docker"));
        let item = DisplayedItem::resolve(backend, docker_image("sha256:aaa", "fedora:27"))
            .expect("docker images are mapped");
        let parsed: serde_json::Value = serde_json::from_str(&item.metadata_json()).unwrap();
        assert_eq!(&parsed, item.resource().metadata());
    }
}
