//! # Integration Tests
//!
//! End-to-end tests over the real SQLite store and local HTTP frontends.
//!
//! Covers:
//! - Contract formats shared across crates
//! - Queue -> worker -> event log -> stats
//! - Consecutive failures -> Slack alert -> recovery
//! - Secret-store references resolved into the shared-secret header

#[cfg(test)]
mod contract_tests {
    use contracts::{Action, DispatchMeta};
    use dispatcher::Alerter;

    #[test]
    fn test_failure_key_and_alert_text() {
        let meta = DispatchMeta::new("site_a", "content", "node:42", Action::Revalidate);
        let key = meta.failure_key();
        assert_eq!(key.state_key(), "failcount.site_a.content.node:42");
        assert_eq!(
            Alerter::compose(&key, 3, "HTTP 500"),
            "[revalidation] site_a/content/node:42 failed 3 times: HTTP 500"
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::Router;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AttemptFilter, EventStore, RetryQueue, RevalidatorConfig, StateStore};
    use dispatcher::{
        build_client, Alerter, Dispatcher, DispatcherConfig, FrontendSelector, RetryWorker,
        RevalidationService,
    };
    use registry::FrontendRegistry;
    use store::SqliteStore;

    #[derive(Clone)]
    struct Seen {
        headers: HeaderMap,
        body: serde_json::Value,
    }

    #[derive(Clone, Default)]
    struct EndpointState {
        seen: Arc<Mutex<Vec<Seen>>>,
        statuses: Arc<Mutex<VecDeque<u16>>>,
    }

    /// Local endpoint answering with scripted statuses, then 200
    struct Endpoint {
        base: String,
        state: EndpointState,
    }

    impl Endpoint {
        async fn start(statuses: &[u16]) -> Self {
            let state = EndpointState {
                seen: Arc::default(),
                statuses: Arc::new(Mutex::new(statuses.iter().copied().collect())),
            };
            let app = Router::new().fallback(record).with_state(state.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            Self {
                base: format!("http://{addr}"),
                state,
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        fn requests(&self) -> Vec<Seen> {
            self.state.seen.lock().unwrap().clone()
        }
    }

    async fn record(
        State(state): State<EndpointState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        state.seen.lock().unwrap().push(Seen {
            headers,
            body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
        });
        let status = state.statuses.lock().unwrap().pop_front().unwrap_or(200);
        StatusCode::from_u16(status).unwrap()
    }

    struct Harness {
        store: Arc<SqliteStore>,
        service: RevalidationService,
    }

    /// Build the full stack the way the binary does, over an in-memory store
    fn harness(toml: &str) -> Harness {
        let config: RevalidatorConfig =
            ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let client = build_client().unwrap();
        let alerter =
            Alerter::from_config(&config.alerts, client.clone(), config.timeouts.alert());
        let dispatcher = Dispatcher::builder(store.clone(), store.clone())
            .config(DispatcherConfig::from_config(&config))
            .client(client)
            .notifier(Arc::new(alerter))
            .build()
            .unwrap();
        let registry = FrontendRegistry::from_config(&config).unwrap();
        let service = RevalidationService::new(Arc::new(registry), Arc::new(dispatcher))
            .with_queue(store.clone());
        Harness { store, service }
    }

    /// Enqueue -> worker -> event log -> stats
    #[tokio::test]
    async fn test_e2e_queue_drain() {
        let site_a = Endpoint::start(&[]).await;
        let site_b = Endpoint::start(&[503]).await;
        let h = harness(&format!(
            r#"
[[frontends]]
id = "site_a"
revalidate_webhook = "{}"
secret = "a-secret"

[[frontends]]
id = "site_b"
revalidate_webhook = "{}"
"#,
            site_a.url("/api/revalidate"),
            site_b.url("/api/revalidate"),
        ));

        let enqueued = h
            .service
            .enqueue_tag(&FrontendSelector::All, "node:42", "content")
            .unwrap();
        assert_eq!(enqueued.len(), 2);
        assert_eq!(h.store.len().unwrap(), 2);
        assert!(site_a.requests().is_empty());

        let worker = RetryWorker::new(
            h.service.dispatcher().clone(),
            h.store.clone(),
            Duration::from_secs(60),
        );
        let report = worker
            .run_until_idle(None, Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(report.metrics.claimed, 2);
        assert_eq!(report.metrics.dispatched, 1);
        assert_eq!(report.metrics.failed, 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.failures_by_frontend.get("site_b"), Some(&1));

        let seen = site_a.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].body,
            serde_json::json!({"tag": "node:42", "domain": "content"})
        );
        assert_eq!(seen[0].headers["x-shared-secret"], "a-secret");
        assert!(site_b.requests()[0].headers.get("x-shared-secret").is_none());

        let rows = h
            .store
            .last_attempts(&AttemptFilter::default(), 10)
            .unwrap();
        assert_eq!(rows.len(), 2);
        let failed = rows.iter().find(|r| r.frontend == "site_b").unwrap();
        assert_eq!(failed.http_code, 503);
        assert!(!failed.ok);

        let stats = h.store.stats("site_a", "content", None, 50).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.success_rate, Some(100.0));

        let tracker = h.service.dispatcher().tracker();
        let key = rows
            .iter()
            .find(|r| r.frontend == "site_b")
            .map(|r| contracts::FailureKey::new(&r.frontend, &r.domain, &r.scope))
            .unwrap();
        assert_eq!(tracker.count(&key).unwrap(), 1);
    }

    /// Three consecutive failures alert once on Slack; success resets
    #[tokio::test]
    async fn test_e2e_alert_after_threshold() {
        let frontend = Endpoint::start(&[500, 500, 500]).await;
        let slack = Endpoint::start(&[]).await;
        let h = harness(&format!(
            r#"
[alerts]
threshold = 3
slack_webhook = "{}"

[[frontends]]
id = "site_a"
revalidate_webhook = "{}"
"#,
            slack.url("/hook"),
            frontend.url("/api/revalidate"),
        ));
        let selector = FrontendSelector::one("site_a");

        for _ in 0..2 {
            h.service
                .revalidate_tag(&selector, "node:7", "content")
                .await
                .unwrap();
        }
        assert!(slack.requests().is_empty());

        let third = h
            .service
            .revalidate_tag(&selector, "node:7", "content")
            .await
            .unwrap();
        assert_eq!(third[0].result.status, 500);

        let alerts = slack.requests();
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].body,
            serde_json::json!({
                "text": "[revalidation] site_a/content/node:7 failed 3 times: HTTP 500"
            })
        );

        let recovered = h
            .service
            .revalidate_tag(&selector, "node:7", "content")
            .await
            .unwrap();
        assert!(recovered[0].result.ok);
        assert_eq!(
            h.store.get("failcount.site_a.content.node:7").unwrap(),
            Some(serde_json::json!(0))
        );
        assert_eq!(slack.requests().len(), 1);
    }

    /// Entity tags dispatched with a file-vault secret that never reaches the log
    #[tokio::test]
    async fn test_e2e_entity_with_file_secret() {
        let vault = tempfile::tempdir().unwrap();
        std::fs::write(vault.path().join("site_a_secret"), "s3cr3t-value\n").unwrap();
        let frontend = Endpoint::start(&[]).await;
        let h = harness(&format!(
            r#"
[secrets]
backend = "file"
dir = '{}'

[[frontends]]
id = "site_a"
revalidate_webhook = "{}"
secret = "site_a_secret"
"#,
            vault.path().display(),
            frontend.url("/api/revalidate"),
        ));

        let entity = contracts::EntityRef::content("article", 42);
        let results = h
            .service
            .revalidate_entity(&FrontendSelector::one("site_a"), &entity)
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|d| d.scope.as_str()).collect::<Vec<_>>(),
            vec!["content", "content:article", "node:42"]
        );

        for seen in frontend.requests() {
            assert_eq!(seen.headers["x-shared-secret"], "s3cr3t-value");
        }

        let rows = h
            .store
            .last_attempts(&AttemptFilter::default(), 10)
            .unwrap();
        assert_eq!(rows.len(), 3);
        let dump = serde_json::to_string(&rows).unwrap();
        assert!(!dump.contains("s3cr3t"));
        assert!(!dump.contains("site_a_secret"));
    }
}
