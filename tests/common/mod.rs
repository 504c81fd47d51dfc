#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{DateTime, Utc};
use safe_shortener::application::services::{
    LinkService, RecheckScheduler, RedirectResolver, UrlValidator,
};
use safe_shortener::domain::entities::{
    DEFAULT_CHECK_INTERVAL_HOURS, LinkStatus, NewUrlMapping, UrlMapping,
};
use safe_shortener::domain::repositories::UrlMappingRepository;
use safe_shortener::domain::vetting::{
    LivenessProbe, ProbeOutcome, SafetyCheckError, SafetyChecker, SafetyVerdict,
};
use safe_shortener::infrastructure::persistence::{InMemoryStore, Stores};
use safe_shortener::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tower::Layer;

pub const BASE_URL: &str = "https://sho.rt";

/// Inserts a fixed peer address, as `into_make_service_with_connect_info` would.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Safety checker answering with a fixed verdict.
pub enum StaticSafety {
    Verdict(SafetyVerdict),
    NoCredential,
    Failing,
}

#[async_trait]
impl SafetyChecker for StaticSafety {
    async fn check(&self, _url: &str) -> Result<SafetyVerdict, SafetyCheckError> {
        match self {
            Self::Verdict(verdict) => Ok(verdict.clone()),
            Self::NoCredential => Err(SafetyCheckError::MissingCredential),
            Self::Failing => Err(SafetyCheckError::Upstream {
                status: Some(500),
                reason: "upstream answered 500".to_string(),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        !matches!(self, Self::NoCredential)
    }
}

/// Liveness probe whose answer can be changed while a test runs.
#[derive(Clone)]
pub struct SwitchableProbe {
    reachable: Arc<AtomicBool>,
    redirect: Arc<AtomicBool>,
    probed: Arc<Mutex<Vec<String>>>,
}

impl SwitchableProbe {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
            redirect: Arc::new(AtomicBool::new(false)),
            probed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn answer_with_redirect(&self) {
        self.redirect.store(true, Ordering::SeqCst);
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LivenessProbe for SwitchableProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.probed.lock().unwrap().push(url.to_string());

        if !self.reachable.load(Ordering::SeqCst) {
            ProbeOutcome::Unreachable {
                status: Some(503),
                reason: "503 Service Unavailable".to_string(),
            }
        } else if self.redirect.load(Ordering::SeqCst) {
            ProbeOutcome::Redirect {
                status: 301,
                location: Some("https://www.example.com/".to_string()),
            }
        } else {
            ProbeOutcome::Live { status: 200 }
        }
    }
}

/// Application state over an in-memory store with fake collaborators.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub probe: SwitchableProbe,
}

pub fn create_test_app(safety: StaticSafety, probe: SwitchableProbe) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores::from_memory(store.clone());
    let safety: Arc<dyn SafetyChecker> = Arc::new(safety);
    let probe_handle: Arc<dyn LivenessProbe> = Arc::new(probe.clone());

    let scheduler = RecheckScheduler::new(
        stores.mappings.clone(),
        stores.checks.clone(),
        probe_handle.clone(),
    );
    let validator = UrlValidator::new(safety.clone(), probe_handle, stores.malicious_logs.clone());
    let link_service = LinkService::new(stores.mappings.clone(), validator, scheduler.clone());

    let state = AppState {
        link_service: Arc::new(link_service),
        resolver: Arc::new(RedirectResolver::new(stores.mappings.clone())),
        scheduler,
        mappings: stores.mappings,
        safety,
        base_url: BASE_URL.to_string(),
        behind_proxy: false,
    };

    TestApp {
        state,
        store,
        probe,
    }
}

/// Safe verdict, reachable destination.
pub fn create_default_app() -> TestApp {
    create_test_app(
        StaticSafety::Verdict(SafetyVerdict::Safe),
        SwitchableProbe::new(true),
    )
}

pub async fn insert_mapping(
    store: &InMemoryStore,
    code: &str,
    url: &str,
    status: LinkStatus,
    intended_expiry_date: Option<DateTime<Utc>>,
) -> UrlMapping {
    store
        .create(NewUrlMapping {
            short_code: code.to_string(),
            original_url: url.to_string(),
            intended_live_date: None,
            intended_expiry_date,
            last_checked_at: Utc::now(),
            status,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
        })
        .await
        .unwrap()
}
