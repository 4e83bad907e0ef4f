pub mod command;
pub mod docker;
pub mod openshift;
pub mod podman;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::warn;

use crate::config::LucidConfig;
use crate::error::BackendError;
use crate::model::{Resource, ResourceTag};
use crate::query::Selector;

pub use docker::DockerBackend;
pub use openshift::OpenShiftBackend;
pub use podman::PodmanBackend;

/// One container runtime integration.
///
/// `list` returns an empty vector when the runtime has nothing to show and
/// fails only when talking to the runtime itself failed. Records that cannot
/// be understood are skipped by the implementation, not reported as errors.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    async fn list(&self) -> Result<Vec<Resource>, BackendError>;

    async fn remove(&self, resource: &Resource) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Docker,
    Podman,
    #[serde(alias = "oc")]
    OpenShift,
}

impl BackendKind {
    pub const ALL: [Self; 3] = [Self::Docker, Self::Podman, Self::OpenShift];

    pub fn name(self) -> &'static str {
        match self {
            Self::Docker => DockerBackend::NAME,
            Self::Podman => PodmanBackend::NAME,
            Self::OpenShift => OpenShiftBackend::NAME,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "docker" => Some(Self::Docker),
            "podman" => Some(Self::Podman),
            "openshift" | "oc" => Some(Self::OpenShift),
            _ => None,
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Known backends in listing order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LucidConfig) -> Self {
        let mut registry = Self::new();
        for kind in &config.backends {
            let backend: Arc<dyn Backend> = match kind {
                BackendKind::Docker => Arc::new(DockerBackend::new(config.docker.containers)),
                BackendKind::Podman => Arc::new(PodmanBackend::new(config.podman.command.clone())),
                BackendKind::OpenShift => Arc::new(OpenShiftBackend::new(
                    config.openshift.command.clone(),
                    config.openshift.all_namespaces,
                )),
            };
            registry = registry.with(backend);
        }
        registry
    }

    pub fn with(mut self, backend: Arc<dyn Backend>) -> Self {
        if self
            .backends
            .iter()
            .any(|existing| existing.name() == backend.name())
        {
            warn!(backend = backend.name(), "backend registered twice, ignoring");
            return self;
        }
        self.backends.push(backend);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    /// Backends named by `selector`, in registry order. Values are matched
    /// through [`BackendKind::from_token`] so `oc` and `Docker` work too.
    pub fn select(&self, selector: &Selector) -> Vec<Arc<dyn Backend>> {
        self.backends
            .iter()
            .filter(|backend| selects(selector, backend.name()))
            .cloned()
            .collect()
    }
}

fn selects(selector: &Selector, name: &str) -> bool {
    match selector {
        Selector::All => true,
        Selector::Values(values) => values.iter().any(|value| {
            value == name || BackendKind::from_token(value).is_some_and(|kind| kind.name() == name)
        }),
    }
}

pub(crate) fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|found| !found.is_empty())
        .map(str::to_string)
}

/// Turns a backend's raw item list into resources, skipping items without an
/// identifier.
pub(crate) fn collect_resources(
    backend: &str,
    items: Vec<Value>,
    tag_for: impl Fn(&Value) -> ResourceTag,
    id_for: impl Fn(&Value) -> Option<String>,
) -> Vec<Resource> {
    let mut resources = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(backend, position, "skipping record that is not an object");
            continue;
        }
        let Some(id) = id_for(&item) else {
            warn!(backend, position, "skipping record without an identifier");
            continue;
        };
        resources.push(Resource::new(backend, tag_for(&item), id, item));
    }
    resources
}

pub(crate) fn short_id(id: &str) -> String {
    id.strip_prefix("sha256:")
        .unwrap_or(id)
        .chars()
        .take(12)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, BackendRegistry, collect_resources, short_id};
    use crate::backend::fake::FakeBackend;
    use crate::config::LucidConfig;
    use crate::model::ResourceTag;
    use crate::query::Query;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn backend_tokens_map_to_kinds() {
        assert_eq!(BackendKind::from_token("Docker"), Some(BackendKind::Docker));
        assert_eq!(BackendKind::from_token("oc"), Some(BackendKind::OpenShift));
        assert_eq!(BackendKind::from_token("lxc"), None);
        assert_eq!(BackendKind::OpenShift.name(), "openshift");
    }

    #[test]
    fn select_follows_registry_order_and_ignores_unknown_names() {
        let registry = BackendRegistry::new()
            .with(Arc::new(FakeBackend::new("docker")))
            .with(Arc::new(FakeBackend::new("podman")))
            .with(Arc::new(FakeBackend::new("openshift")));

        let query = Query::parse("backend=openshift,docker,lxc").unwrap();
        let names = registry
            .select(query.backends())
            .iter()
            .map(|backend| backend.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["docker", "openshift"]);

        let none = Query::parse("backend=lxc").unwrap();
        assert!(registry.select(none.backends()).is_empty());
        assert_eq!(registry.select(Query::all().backends()).len(), 3);
    }

    #[test]
    fn select_accepts_aliases_and_any_case() {
        let registry = BackendRegistry::new()
            .with(Arc::new(FakeBackend::new("docker")))
            .with(Arc::new(FakeBackend::new("openshift")));

        let query = Query::parse("backend=oc,Docker").unwrap();
        let names = registry
            .select(query.backends())
            .iter()
            .map(|backend| backend.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["docker", "openshift"]);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let registry = BackendRegistry::new()
            .with(Arc::new(FakeBackend::new("docker")))
            .with(Arc::new(FakeBackend::new("docker")));
        assert_eq!(registry.names(), vec!["docker"]);
    }

    #[test]
    fn config_backends_build_the_registry_in_order() {
        let config = LucidConfig {
            backends: vec![BackendKind::Podman, BackendKind::Docker],
            ..LucidConfig::default()
        };
        let registry = BackendRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["podman", "docker"]);
    }

    #[test]
    fn malformed_items_are_skipped() {
        let items = vec![
            json!({"id": "a"}),
            json!("not an object"),
            json!({"name": "no id"}),
            json!({"id": ""}),
            json!({"id": "b"}),
        ];
        let resources = collect_resources(
            "podman",
            items,
            |_| ResourceTag::PodmanImage,
            |item| super::string_field(item, &["id"]),
        );
        let ids = resources.iter().map(|r| r.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn short_ids_strip_digest_prefix() {
        assert_eq!(
            short_id("sha256:9110ae7f579f35ee0c3938696f23fe0f"),
            "9110ae7f579f"
        );
        assert_eq!(short_id("abc"), "abc");
    }
}
