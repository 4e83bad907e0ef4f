use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, debug, info, warn};

use crate::backend::{Backend, BackendRegistry};
use crate::config::LucidConfig;
use crate::error::{BackendError, ConfigError, IndexError};
use crate::model::{DisplayedItem, Resource};
use crate::query::Query;
use crate::render::render_row;
use crate::store::{DeleteReport, Store};

#[derive(Debug)]
pub struct FetchFailure {
    pub backend: String,
    pub error: BackendError,
}

/// Result of listing one backend during `populate`.
pub enum BackendOutcome {
    Listed {
        backend: Arc<dyn Backend>,
        resources: Vec<Resource>,
    },
    Failed(FetchFailure),
}

/// Owns the current snapshot and turns queries into rendered rows.
///
/// Every operation runs inside the span handed to [`Engine::new`]; the engine
/// never installs a subscriber.
pub struct Engine {
    registry: BackendRegistry,
    fetch_timeout: Duration,
    span: Span,
    store: Store,
    failures: Vec<FetchFailure>,
}

impl Engine {
    pub fn new(registry: BackendRegistry, fetch_timeout: Duration, span: Span) -> Self {
        Self {
            registry,
            fetch_timeout,
            span,
            store: Store::new(),
            failures: Vec::new(),
        }
    }

    pub fn from_config(config: &LucidConfig, span: Span) -> Self {
        Self::new(
            BackendRegistry::from_config(config),
            config.fetch_timeout(),
            span,
        )
    }

    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub async fn populate(&mut self, width: usize, query: &str) -> Result<Vec<String>, ConfigError> {
        let parsed = {
            let _entered = self.span.enter();
            Query::parse(query).inspect_err(|error| warn!(%error, query, "rejected query"))?
        };
        Ok(self.populate_query(width, parsed).await)
    }

    pub async fn populate_query(&mut self, width: usize, query: Query) -> Vec<String> {
        let span = self.span.clone();
        async {
            let selected = self.registry.select(query.backends());
            debug!(
                query = %query,
                backends = ?selected.iter().map(|backend| backend.name()).collect::<Vec<_>>(),
                "populating"
            );

            let timeout = self.fetch_timeout;
            let outcomes = join_all(
                selected
                    .into_iter()
                    .map(|backend| fetch(backend, timeout).in_current_span()),
            )
            .await;

            let mut items = Vec::new();
            let mut failures = Vec::new();
            for outcome in outcomes {
                match outcome {
                    BackendOutcome::Listed { backend, resources } => {
                        let listed = resources.len();
                        let before = items.len();
                        items.extend(
                            resources
                                .into_iter()
                                .filter(|resource| query.resources().matches(resource.resource_type()))
                                .filter_map(|resource| DisplayedItem::resolve(backend.clone(), resource)),
                        );
                        debug!(
                            backend = backend.name(),
                            listed,
                            kept = items.len() - before,
                            "backend listed"
                        );
                    }
                    BackendOutcome::Failed(failure) => {
                        warn!(backend = %failure.backend, error = %failure.error, "backend failed to list");
                        failures.push(failure);
                    }
                }
            }

            info!(items = items.len(), failed = failures.len(), "listing populated");
            self.store.replace(items);
            self.failures = failures;
            self.render_rows(width)
        }
        .instrument(span)
        .await
    }

    /// Re-renders the current snapshot without refetching.
    pub fn render(&self, width: usize) -> Vec<String> {
        let _entered = self.span.enter();
        self.render_rows(width)
    }

    fn render_rows(&self, width: usize) -> Vec<String> {
        self.store
            .items()
            .iter()
            .map(|item| render_row(item, width))
            .collect()
    }

    pub fn get(&self, index: usize) -> Result<&DisplayedItem, IndexError> {
        let _entered = self.span.enter();
        self.store
            .get(index)
            .inspect_err(|error| debug!(%error, "lookup outside snapshot"))
    }

    pub fn get_metadata(&self, index: usize) -> Result<String, IndexError> {
        let _entered = self.span.enter();
        self.store.get_metadata(index)
    }

    pub async fn delete(
        &mut self,
        start: usize,
        end: Option<usize>,
    ) -> Result<DeleteReport, IndexError> {
        let span = self.span.clone();
        async {
            let report = self.store.delete(start, end).await?;
            info!(
                start,
                end = ?end,
                removed = report.removed.len(),
                failed = report.failed.len(),
                "delete finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

async fn fetch(backend: Arc<dyn Backend>, timeout: Duration) -> BackendOutcome {
    let name = backend.name().to_string();
    let listed = tokio::time::timeout(timeout, backend.list()).await;
    let error = match listed {
        Ok(Ok(resources)) => return BackendOutcome::Listed { backend, resources },
        Ok(Err(error)) => error,
        Err(_) => BackendError::Timeout {
            backend: name.clone(),
            after: timeout,
        },
    };
    BackendOutcome::Failed(FetchFailure {
        backend: name,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::backend::BackendRegistry;
    use crate::backend::fake::{FakeBackend, docker_image, openshift_pod, podman_image};
    use crate::error::{BackendError, ConfigError};
    use crate::model::{Displayable, Resource, ResourceTag};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;
    use tracing::Span;

    fn engine(registry: BackendRegistry) -> Engine {
        Engine::new(registry, Duration::from_secs(5), Span::none())
    }

    fn docker() -> FakeBackend {
        FakeBackend::new("docker").with_resources(vec![
            docker_image("sha256:a", "fedora:27"),
            docker_image("sha256:b", "alpine:3"),
        ])
    }

    fn names(engine: &Engine) -> Vec<String> {
        (0..engine.len())
            .map(|index| engine.get(index).unwrap().displayed_name())
            .collect()
    }

    #[tokio::test]
    async fn docker_images_are_listed_while_a_failing_podman_is_not_queried() {
        let mut engine = engine(
            BackendRegistry::new()
                .with(Arc::new(docker()))
                .with(Arc::new(FakeBackend::new("podman").failing())),
        );

        let rows = engine
            .populate(60, "backend=docker resource=image")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.chars().count() == 60));
        assert!(rows[0].starts_with("docker"));
        assert_eq!(names(&engine), vec!["fedora:27", "alpine:3"]);
        assert!(engine.failures().is_empty());
    }

    #[tokio::test]
    async fn failing_backends_are_isolated_and_reported() {
        let mut engine = engine(
            BackendRegistry::new()
                .with(Arc::new(docker()))
                .with(Arc::new(FakeBackend::new("podman").failing())),
        );

        let rows = engine.populate(60, "").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(engine.failures().len(), 1);
        assert_eq!(engine.failures()[0].backend, "podman");
    }

    #[tokio::test]
    async fn slow_backends_time_out() {
        let mut engine = Engine::new(
            BackendRegistry::new()
                .with(Arc::new(docker()))
                .with(Arc::new(
                    FakeBackend::new("podman")
                        .with_resources(vec![podman_image("abc", "quay.io/x:1")])
                        .slow(Duration::from_secs(5)),
                )),
            Duration::from_millis(50),
            Span::none(),
        );

        engine.populate(60, "backend=all").await.unwrap();
        assert_eq!(engine.len(), 2);
        assert!(matches!(
            engine.failures()[0].error,
            BackendError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn backends_are_listed_concurrently() {
        let mut engine = Engine::new(
            BackendRegistry::new()
                .with(Arc::new(docker().slow(Duration::from_millis(300))))
                .with(Arc::new(
                    FakeBackend::new("podman")
                        .with_resources(vec![podman_image("abc", "quay.io/x:1")])
                        .slow(Duration::from_millis(300)),
                )),
            Duration::from_secs(1),
            Span::none(),
        );

        let started = Instant::now();
        engine.populate(60, "").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(engine.len(), 3);
        assert!(engine.failures().is_empty());
        assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn items_follow_registry_order_and_resource_filter() {
        let mut engine = engine(
            BackendRegistry::new()
                .with(Arc::new(FakeBackend::new("openshift").with_resources(vec![
                    openshift_pod("default", "web-1", "Running"),
                    Resource::new(
                        "openshift",
                        ResourceTag::Other("build".to_string()),
                        "default/build-1",
                        json!({"kind": "Build"}),
                    ),
                ])))
                .with(Arc::new(docker()))
                .with(Arc::new(
                    FakeBackend::new("podman")
                        .with_resources(vec![podman_image("abc", "quay.io/x:1")]),
                )),
        );

        engine.populate(90, "backend=docker,openshift,podman").await.unwrap();
        assert_eq!(names(&engine), vec!["web-1", "fedora:27", "alpine:3", "quay.io/x:1"]);

        engine.populate(90, "resource=pod").await.unwrap();
        assert_eq!(names(&engine), vec!["web-1"]);

        engine.populate(90, "resource=container").await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn unknown_backends_yield_an_empty_listing() {
        let mut engine = engine(BackendRegistry::new().with(Arc::new(docker())));
        let rows = engine.populate(60, "backend=lxc").await.unwrap();
        assert!(rows.is_empty());
        assert!(engine.failures().is_empty());
    }

    #[tokio::test]
    async fn malformed_queries_keep_the_previous_snapshot() {
        let mut engine = engine(BackendRegistry::new().with(Arc::new(docker())));
        engine.populate(60, "").await.unwrap();

        let error = engine.populate(60, "backend").await.unwrap_err();
        assert!(matches!(error, ConfigError::MalformedToken(_)));
        assert_eq!(engine.len(), 2);
    }

    #[tokio::test]
    async fn render_reuses_the_snapshot_at_a_new_width() {
        let backend = Arc::new(docker());
        let mut engine = engine(BackendRegistry::new().with(backend.clone()));
        engine.populate(60, "").await.unwrap();

        let rows = engine.render(120);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.chars().count() == 120));
    }

    #[tokio::test]
    async fn delete_does_not_refetch() {
        let backend = Arc::new(docker());
        let mut engine = engine(BackendRegistry::new().with(backend.clone()));
        engine.populate(60, "").await.unwrap();

        let report = engine.delete(0, None).await.unwrap();
        assert_eq!(report.removed.len(), 1);
        assert_eq!(backend.removed(), vec!["sha256:a"]);
        assert_eq!(names(&engine), vec!["alpine:3"]);
        assert!(engine.get_metadata(0).unwrap().contains("sha256:b"));
    }
}
