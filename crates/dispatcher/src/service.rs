//! RevalidationService - trigger surface over registry, dispatcher and queue
//!
//! Resolves frontend, endpoint, secret and payload for a request, then either
//! posts immediately or enqueues. Configuration problems (unknown frontend,
//! no endpoint) are returned before any network call and leave no event-log
//! row.

use std::sync::Arc;

use contracts::{domains, Action, DispatchMeta, DispatchResult, EntityRef, FrontendTarget, QueueItem, RetryQueue};
use registry::{tags_for, FrontendRegistry};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DispatcherError;

/// Scope of a test ping unless one is given
pub const DEFAULT_TEST_SCOPE: &str = "ping";

/// Which frontends a request targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendSelector {
    One(String),
    /// Every listed frontend, in id order; those lacking the endpoint are skipped
    All,
}

impl FrontendSelector {
    pub fn one(id: impl Into<String>) -> Self {
        Self::One(id.into())
    }
}

impl Default for FrontendSelector {
    fn default() -> Self {
        Self::One(contracts::DEFAULT_FRONTEND_ID.to_string())
    }
}

/// What to revalidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Tag { tag: String, domain: String },
    Path { path: String },
    Test { scope: String },
}

impl Request {
    fn endpoint_kind(&self) -> &'static str {
        match self {
            Self::Tag { .. } | Self::Test { .. } => "revalidate",
            Self::Path { .. } => "path",
        }
    }

    fn endpoint<'a>(&self, frontend: &'a FrontendTarget) -> Option<&'a str> {
        match self {
            Self::Tag { .. } | Self::Test { .. } => frontend.tag_endpoint(),
            Self::Path { .. } => frontend.path_endpoint(),
        }
    }

    fn validate(&self) -> Result<(), DispatcherError> {
        let empty = match self {
            Self::Tag { tag, .. } => tag.trim().is_empty().then_some("tag"),
            Self::Path { path } => path.trim().is_empty().then_some("path"),
            Self::Test { .. } => None,
        };
        match empty {
            Some(field) => Err(DispatcherError::InvalidRequest(format!("{field} is empty"))),
            None => Ok(()),
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            Self::Tag { tag, domain } => serde_json::json!({ "tag": tag, "domain": domain }),
            Self::Path { path } => serde_json::json!({ "path": path, "domain": domains::PATH }),
            Self::Test { .. } => serde_json::json!({
                "__action": "test",
                "tag": "health",
                "domain": domains::TEST,
            }),
        }
    }

    fn meta(&self, frontend: &str) -> DispatchMeta {
        match self {
            Self::Tag { tag, domain } => DispatchMeta::new(frontend, domain, tag, Action::Revalidate),
            Self::Path { path } => DispatchMeta::new(frontend, domains::PATH, path, Action::Revalidate),
            Self::Test { scope } => DispatchMeta::new(frontend, domains::TEST, scope, Action::Test),
        }
    }
}

/// An immediate dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatched {
    pub frontend: String,
    pub scope: String,
    pub result: DispatchResult,
}

/// A deferred dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enqueued {
    pub frontend: String,
    pub scope: String,
    pub queue_id: i64,
}

pub struct RevalidationService {
    registry: Arc<FrontendRegistry>,
    dispatcher: Arc<Dispatcher>,
    queue: Option<Arc<dyn RetryQueue>>,
}

impl RevalidationService {
    pub fn new(registry: Arc<FrontendRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn RetryQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn registry(&self) -> &Arc<FrontendRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Build the queue items a request resolves to, without sending anything
    #[instrument(name = "service_plan", skip(self))]
    pub fn plan(
        &self,
        selector: &FrontendSelector,
        request: &Request,
    ) -> Result<Vec<QueueItem>, DispatcherError> {
        request.validate()?;

        let targets: Vec<FrontendTarget> = match selector {
            FrontendSelector::One(id) => {
                let target = self
                    .registry
                    .frontend(id)
                    .ok_or_else(|| DispatcherError::unknown_frontend(id))?;
                if request.endpoint(&target).is_none() {
                    return Err(DispatcherError::no_endpoint(id, request.endpoint_kind()));
                }
                vec![target]
            }
            FrontendSelector::All => self.registry.list_frontends().into_values().collect(),
        };

        let mut items = Vec::with_capacity(targets.len());
        for target in &targets {
            let Some(endpoint) = request.endpoint(target) else {
                warn!(
                    frontend = %target.id,
                    kind = request.endpoint_kind(),
                    "Frontend has no endpoint, skipped"
                );
                continue;
            };
            items.push(QueueItem::new(
                endpoint,
                self.registry.resolve_secret(&target.secret),
                request.payload(),
                request.meta(&target.id),
            ));
        }

        if items.is_empty() {
            return Err(DispatcherError::InvalidRequest(format!(
                "no frontend has a {} endpoint configured",
                request.endpoint_kind()
            )));
        }
        debug!(count = items.len(), "Dispatch planned");
        Ok(items)
    }

    /// Resolve and post immediately, in frontend order
    pub async fn dispatch(
        &self,
        selector: &FrontendSelector,
        request: &Request,
    ) -> Result<Vec<Dispatched>, DispatcherError> {
        let items = self.plan(selector, request)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let result = self
                .dispatcher
                .post(&item.endpoint, &item.secret, &item.payload, item.meta.clone())
                .await?;
            info!(
                frontend = %item.meta.frontend,
                scope = %item.meta.scope,
                ok = result.ok,
                http_status = result.status,
                "Revalidation triggered"
            );
            out.push(Dispatched {
                frontend: item.meta.frontend,
                scope: item.meta.scope,
                result,
            });
        }
        Ok(out)
    }

    /// Resolve and push onto the retry queue
    pub fn enqueue(
        &self,
        selector: &FrontendSelector,
        request: &Request,
    ) -> Result<Vec<Enqueued>, DispatcherError> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| DispatcherError::InvalidRequest("no retry queue configured".into()))?;
        let items = self.plan(selector, request)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let queue_id = queue.enqueue(&item).map_err(DispatcherError::Queue)?;
            debug!(queue_id, frontend = %item.meta.frontend, "Revalidation enqueued");
            out.push(Enqueued {
                frontend: item.meta.frontend,
                scope: item.meta.scope,
                queue_id,
            });
        }
        Ok(out)
    }

    pub async fn revalidate_tag(
        &self,
        selector: &FrontendSelector,
        tag: &str,
        domain: &str,
    ) -> Result<Vec<Dispatched>, DispatcherError> {
        self.dispatch(selector, &tag_request(tag, domain)).await
    }

    pub async fn revalidate_path(
        &self,
        selector: &FrontendSelector,
        path: &str,
    ) -> Result<Vec<Dispatched>, DispatcherError> {
        self.dispatch(selector, &Request::Path { path: path.to_string() })
            .await
    }

    pub async fn test_ping(
        &self,
        selector: &FrontendSelector,
        scope: Option<&str>,
    ) -> Result<Vec<Dispatched>, DispatcherError> {
        let scope = scope.unwrap_or(DEFAULT_TEST_SCOPE).to_string();
        self.dispatch(selector, &Request::Test { scope }).await
    }

    /// One tag revalidation per cache tag of the entity
    pub async fn revalidate_entity(
        &self,
        selector: &FrontendSelector,
        entity: &EntityRef,
    ) -> Result<Vec<Dispatched>, DispatcherError> {
        let mut out = Vec::new();
        for request in entity_requests(entity) {
            out.extend(self.dispatch(selector, &request).await?);
        }
        Ok(out)
    }

    pub fn enqueue_tag(
        &self,
        selector: &FrontendSelector,
        tag: &str,
        domain: &str,
    ) -> Result<Vec<Enqueued>, DispatcherError> {
        self.enqueue(selector, &tag_request(tag, domain))
    }

    pub fn enqueue_path(
        &self,
        selector: &FrontendSelector,
        path: &str,
    ) -> Result<Vec<Enqueued>, DispatcherError> {
        self.enqueue(selector, &Request::Path { path: path.to_string() })
    }

    pub fn enqueue_entity(
        &self,
        selector: &FrontendSelector,
        entity: &EntityRef,
    ) -> Result<Vec<Enqueued>, DispatcherError> {
        let mut out = Vec::new();
        for request in entity_requests(entity) {
            out.extend(self.enqueue(selector, &request)?);
        }
        Ok(out)
    }
}

fn tag_request(tag: &str, domain: &str) -> Request {
    Request::Tag {
        tag: tag.to_string(),
        domain: domain.to_string(),
    }
}

fn entity_requests(entity: &EntityRef) -> Vec<Request> {
    let Some(domain) = entity.kind.domain() else {
        debug!(kind = %entity.kind, "Entity kind has no cache tags");
        return Vec::new();
    };
    tags_for(entity)
        .into_iter()
        .map(|tag| tag_request(&tag, domain))
        .collect()
}
