//! Three-stage storefront classification
//!
//! Each URL goes through up to three strictly sequential stages:
//!
//! 1. **Platform** - host marker, `Server` header, or platform meta/script tags
//! 2. **Liveness** - only for platform stores; active means HTTP 200
//! 3. **Password gate** - only for active stores; a redirect to the gate path
//!    whose page carries a password input
//!
//! A stage that is not entered leaves its flag `false`. Failures never escape:
//! each stage resolves to a [`StageOutcome`], and only [`Classification::result`]
//! collapses those outcomes to booleans.

use crate::config::PlatformSignatures;
use crate::probe::context::{Diagnostic, Diagnostics, RunContext, Stage};
use crate::probe::fetcher::{normalize_scheme, FetchOptions, HttpResponse, Transport};
use crate::probe::parser::{ElementQuery, HtmlInspector, ScraperInspector};
use crate::probe::retry::RetryingTransport;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Per-URL classification flags
///
/// `is_active` implies `is_shopify`, and `is_password_protected` implies
/// `is_active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ProbeResult {
    #[serde(rename = "isShopify")]
    pub is_shopify: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "isPasswordProtected")]
    pub is_password_protected: bool,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The signal the stage looks for is present
    Detected,
    /// The stage ran and the signal is absent
    NotDetected,
    /// The stage could not reach a verdict; treated as absent
    Unreachable(String),
}

impl StageOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected)
    }
}

/// Stage-by-stage record of one classification
///
/// `None` means the stage was never entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub platform: StageOutcome,
    pub liveness: Option<StageOutcome>,
    pub password_gate: Option<StageOutcome>,
}

impl Classification {
    /// Collapses stage outcomes to flags
    pub fn result(&self) -> ProbeResult {
        let detected = |stage: &Option<StageOutcome>| {
            stage.as_ref().is_some_and(StageOutcome::is_detected)
        };

        let is_shopify = self.platform.is_detected();
        let is_active = is_shopify && detected(&self.liveness);
        let is_password_protected = is_active && detected(&self.password_gate);

        ProbeResult {
            is_shopify,
            is_active,
            is_password_protected,
        }
    }
}

/// Classifies store URLs
pub struct Classifier {
    transport: Arc<dyn Transport>,
    inspector: Arc<dyn HtmlInspector>,
    signatures: PlatformSignatures,
    diagnostics: Arc<dyn Diagnostics>,
    /// Platform meta tag and script source, checked against one parse
    platform_queries: [ElementQuery; 2],
    password_query: ElementQuery,
}

impl Classifier {
    /// Creates a classifier over an already-configured transport
    ///
    /// The transport is used as-is; wrap it in a
    /// [`RetryingTransport`] for retries, or use [`Classifier::for_run`].
    pub fn new(
        transport: Arc<dyn Transport>,
        inspector: Arc<dyn HtmlInspector>,
        signatures: PlatformSignatures,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let platform_queries = [
            ElementQuery::with_attr_equals("meta", "name", &signatures.meta_name),
            ElementQuery::with_attr_containing("script", "src", &signatures.script_token),
        ];
        let password_query = ElementQuery::with_attr_equals("input", "type", "password");

        Self {
            transport,
            inspector,
            signatures,
            diagnostics,
            platform_queries,
            password_query,
        }
    }

    /// Creates a classifier for a run: the transport gets the run's retry
    /// policy and HTML is inspected with [`ScraperInspector`]
    pub fn for_run<T: Transport + 'static>(
        transport: T,
        ctx: &RunContext,
        signatures: PlatformSignatures,
    ) -> Self {
        let retrying = RetryingTransport::new(transport, ctx.retry, ctx.diagnostics.clone());
        Self::new(
            Arc::new(retrying),
            Arc::new(ScraperInspector),
            signatures,
            ctx.diagnostics.clone(),
        )
    }

    /// Classifies one URL. Never fails.
    pub async fn classify(&self, url: &str) -> ProbeResult {
        self.classify_detailed(url).await.result()
    }

    /// Classifies one URL, keeping every stage outcome
    pub async fn classify_detailed(&self, url: &str) -> Classification {
        let platform = self.detect_platform(url).await;
        if !platform.is_detected() {
            return Classification {
                platform,
                liveness: None,
                password_gate: None,
            };
        }

        let liveness = self.check_active(url).await;
        if !liveness.is_detected() {
            return Classification {
                platform,
                liveness: Some(liveness),
                password_gate: None,
            };
        }

        let password_gate = self.check_password_protection(url).await;
        Classification {
            platform,
            liveness: Some(liveness),
            password_gate: Some(password_gate),
        }
    }

    /// Stage 1: is the store hosted on the platform?
    async fn detect_platform(&self, url: &str) -> StageOutcome {
        if self.has_host_marker(url) {
            tracing::debug!("Host marker matched for {}", url);
            return StageOutcome::Detected;
        }

        match self.transport.fetch(url, &FetchOptions::standard()).await {
            Ok(response) => {
                if self.server_names_platform(&response) || self.body_names_platform(&response)
                {
                    StageOutcome::Detected
                } else {
                    StageOutcome::NotDetected
                }
            }
            Err(e) => {
                // Error pages can still be served by the platform
                if e.response().is_some_and(|r| self.server_names_platform(r)) {
                    tracing::debug!("Platform server header on failed response for {}", url);
                    return StageOutcome::Detected;
                }

                if e.is_not_found() {
                    tracing::info!("Store not found: {}", url);
                    self.degrade(url, Stage::Platform, "not found".to_string())
                } else {
                    tracing::warn!("Platform check failed for {}: {}", url, e);
                    self.degrade(url, Stage::Platform, e.to_string())
                }
            }
        }
    }

    /// Stage 2: does the store answer with 200?
    async fn check_active(&self, url: &str) -> StageOutcome {
        match self.transport.fetch(url, &FetchOptions::standard()).await {
            Ok(response) if response.status == StatusCode::OK => StageOutcome::Detected,
            Ok(response) => {
                tracing::info!("Store {} answered {}, not active", url, response.status);
                StageOutcome::NotDetected
            }
            Err(e) => {
                if e.response().is_some_and(|r| self.server_names_platform(r)) {
                    tracing::info!("Platform store is down: {} ({})", url, e);
                } else if e.is_not_found() {
                    tracing::info!("Store not found during liveness check: {}", url);
                } else {
                    tracing::warn!("Liveness check failed for {}: {}", url, e);
                }
                self.degrade(url, Stage::Liveness, e.to_string())
            }
        }
    }

    /// Stage 3: does the store redirect to a password gate?
    async fn check_password_protection(&self, url: &str) -> StageOutcome {
        let response = match self.transport.fetch(url, &FetchOptions::password_gate()).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_redirect() {
                    tracing::info!("Redirect failure while checking password gate for {}", url);
                } else if e.is_not_found() {
                    tracing::info!("Store not found during password check: {}", url);
                } else {
                    tracing::warn!("Password check failed for {}: {}", url, e);
                }
                return self.degrade(url, Stage::PasswordGate, e.to_string());
            }
        };

        let Some(final_url) = response.final_url.as_ref() else {
            return self.degrade(
                url,
                Stage::PasswordGate,
                "final URL could not be determined".to_string(),
            );
        };

        // The gate only counts when the store sent us there
        let requested = Url::parse(&normalize_scheme(url)).ok();
        if requested.as_ref() == Some(final_url) {
            return StageOutcome::NotDetected;
        }

        if !self.is_password_path(final_url) {
            return StageOutcome::NotDetected;
        }

        if self
            .inspector
            .contains(&response.body, &self.password_query)
        {
            tracing::debug!("Password gate detected for {} at {}", url, final_url);
            StageOutcome::Detected
        } else {
            StageOutcome::NotDetected
        }
    }

    fn has_host_marker(&self, url: &str) -> bool {
        let marker = self.signatures.host_marker.to_ascii_lowercase();
        let normalized = normalize_scheme(url);
        match Url::parse(&normalized) {
            Ok(parsed) => parsed
                .host_str()
                .is_some_and(|host| host.to_ascii_lowercase().contains(&marker)),
            Err(_) => normalized.to_ascii_lowercase().contains(&marker),
        }
    }

    fn server_names_platform(&self, response: &HttpResponse) -> bool {
        let token = self.signatures.server_token.to_ascii_lowercase();
        response
            .server_header()
            .is_some_and(|server| server.to_ascii_lowercase().contains(&token))
    }

    fn body_names_platform(&self, response: &HttpResponse) -> bool {
        self.inspector
            .contains_any(&response.body, &self.platform_queries)
    }

    fn is_password_path(&self, final_url: &Url) -> bool {
        let gate = self.signatures.password_path.trim_end_matches('/');
        final_url.path().trim_end_matches('/').ends_with(gate)
    }

    fn degrade(&self, url: &str, stage: Stage, reason: String) -> StageOutcome {
        self.diagnostics.record(Diagnostic::StageDegraded {
            url: url.to_string(),
            stage,
            reason: reason.clone(),
        });
        StageOutcome::Unreachable(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::context::CollectingDiagnostics;
    use crate::probe::fetcher::{FetchError, RedirectMode};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, SERVER};
    use std::sync::Mutex;

    type Reply = Result<HttpResponse, FetchError>;

    /// Replays scripted replies in order and records every request
    struct ScriptedTransport {
        replies: Mutex<Vec<Reply>>,
        requests: Mutex<Vec<(String, FetchOptions)>>,
    }

    impl ScriptedTransport {
        fn new(mut replies: Vec<Reply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(String, FetchOptions)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch(&self, url: &str, options: &FetchOptions) -> Reply {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), *options));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| panic!("unexpected request to {}", url))
        }
    }

    fn response(status: StatusCode, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            final_url: Some(Url::parse("https://store.test/").unwrap()),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn shopify_server(mut response: HttpResponse) -> HttpResponse {
        response
            .headers
            .insert(SERVER, HeaderValue::from_static("Shopify"));
        response
    }

    fn at(mut response: HttpResponse, final_url: &str) -> HttpResponse {
        response.final_url = Some(Url::parse(final_url).unwrap());
        response
    }

    fn status_error(response: HttpResponse) -> FetchError {
        FetchError::Status {
            url: "https://store.test".to_string(),
            response: Box::new(response),
        }
    }

    fn classifier(transport: Arc<ScriptedTransport>) -> (Classifier, Arc<CollectingDiagnostics>) {
        let sink = Arc::new(CollectingDiagnostics::new());
        let classifier = Classifier::new(
            transport,
            Arc::new(ScraperInspector),
            PlatformSignatures::default(),
            sink.clone(),
        );
        (classifier, sink)
    }

    const PASSWORD_PAGE: &str =
        r#"<html><body><form action="/password"><input type="password" name="password"></form></body></html>"#;

    #[tokio::test]
    async fn test_host_marker_skips_platform_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(StatusCode::OK, "")),
            Ok(response(StatusCode::OK, "")),
        ]));
        let (classifier, _) = classifier(transport.clone());

        let result = classifier.classify("foo.myshopify.com").await;

        assert!(result.is_shopify);
        assert!(result.is_active);
        assert!(!result.is_password_protected);
        // Liveness and gate only; no platform request
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, FetchOptions::standard());
        assert_eq!(requests[1].1.redirect, RedirectMode::Limited);
    }

    #[tokio::test]
    async fn test_server_header_detects_platform() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, "<html></html>"))),
            Ok(response(StatusCode::OK, "")),
            Ok(response(StatusCode::OK, "")),
        ]));
        let (classifier, _) = classifier(transport);

        let detailed = classifier.classify_detailed("https://store.test").await;
        assert_eq!(detailed.platform, StageOutcome::Detected);
        assert_eq!(detailed.liveness, Some(StageOutcome::Detected));
        assert_eq!(detailed.password_gate, Some(StageOutcome::NotDetected));
    }

    #[tokio::test]
    async fn test_meta_tag_detects_platform() {
        let body = r#"<html><head><meta name="shopify-digital-wallet" content="x"></head></html>"#;
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(StatusCode::OK, body)),
            Ok(response(StatusCode::OK, "")),
            Ok(response(StatusCode::OK, "")),
        ]));
        let (classifier, _) = classifier(transport);

        assert!(classifier.classify("https://store.test").await.is_shopify);
    }

    #[tokio::test]
    async fn test_script_src_detects_platform() {
        let body = r#"<html><head><script src="//cdn.shopify.com/s/trekkie.js"></script></head></html>"#;
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(StatusCode::OK, body)),
            Ok(response(StatusCode::OK, "")),
            Ok(response(StatusCode::OK, "")),
        ]));
        let (classifier, _) = classifier(transport);

        assert!(classifier.classify("https://store.test").await.is_shopify);
    }

    #[tokio::test]
    async fn test_plain_site_is_not_platform() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            StatusCode::OK,
            "<html><head><title>Blog</title></head></html>",
        ))]));
        let (classifier, _) = classifier(transport.clone());

        let detailed = classifier.classify_detailed("https://blog.test").await;
        assert_eq!(detailed.platform, StageOutcome::NotDetected);
        assert_eq!(detailed.liveness, None);
        assert_eq!(detailed.result(), ProbeResult::default());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_platform() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(status_error(response(
            StatusCode::NOT_FOUND,
            "",
        )))]));
        let (classifier, sink) = classifier(transport.clone());

        let detailed = classifier.classify_detailed("https://gone.test").await;
        assert_eq!(
            detailed.platform,
            StageOutcome::Unreachable("not found".to_string())
        );
        assert_eq!(detailed.liveness, None);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(sink.degraded_count(), 1);
    }

    #[tokio::test]
    async fn test_error_response_with_platform_header() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(status_error(shopify_server(response(
                StatusCode::SERVICE_UNAVAILABLE,
                "",
            )))),
            Err(status_error(shopify_server(response(
                StatusCode::SERVICE_UNAVAILABLE,
                "",
            )))),
        ]));
        let (classifier, _) = classifier(transport);

        let result = classifier.classify("https://down.test").await;
        assert!(result.is_shopify);
        assert!(!result.is_active);
        assert!(!result.is_password_protected);
    }

    #[tokio::test]
    async fn test_network_failure_degrades() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(FetchError::Timeout {
            url: "https://slow.test".to_string(),
        })]));
        let (classifier, _) = classifier(transport);

        let detailed = classifier.classify_detailed("https://slow.test").await;
        assert!(matches!(detailed.platform, StageOutcome::Unreachable(_)));
        assert_eq!(detailed.result(), ProbeResult::default());
    }

    #[tokio::test]
    async fn test_non_200_success_is_not_active() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::NO_CONTENT, "")),
        ]));
        let (classifier, _) = classifier(transport);

        let detailed = classifier.classify_detailed("https://store.test").await;
        assert_eq!(detailed.liveness, Some(StageOutcome::NotDetected));
        assert_eq!(detailed.password_gate, None);
    }

    #[tokio::test]
    async fn test_password_gate_detected() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Ok(at(
                response(StatusCode::OK, PASSWORD_PAGE),
                "https://store.test/password",
            )),
        ]));
        let (classifier, _) = classifier(transport.clone());

        let result = classifier.classify("https://store.test").await;
        assert_eq!(
            result,
            ProbeResult {
                is_shopify: true,
                is_active: true,
                is_password_protected: true,
            }
        );
        assert_eq!(transport.requests()[2].1, FetchOptions::password_gate());
    }

    #[tokio::test]
    async fn test_gate_path_without_password_input() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Ok(at(
                response(StatusCode::OK, "<html><body>Opening soon</body></html>"),
                "https://store.test/password",
            )),
        ]));
        let (classifier, _) = classifier(transport);

        assert!(!classifier.classify("https://store.test").await.is_password_protected);
    }

    #[tokio::test]
    async fn test_password_input_without_gate_redirect() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Ok(at(
                response(StatusCode::OK, PASSWORD_PAGE),
                "https://store.test/account/login",
            )),
        ]));
        let (classifier, _) = classifier(transport);

        assert!(!classifier.classify("https://store.test").await.is_password_protected);
    }

    #[tokio::test]
    async fn test_url_already_on_gate_path_is_not_protected() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Ok(at(
                response(StatusCode::OK, PASSWORD_PAGE),
                "https://store.test/password",
            )),
        ]));
        let (classifier, _) = classifier(transport);

        let detailed = classifier
            .classify_detailed("https://store.test/password")
            .await;
        assert_eq!(detailed.password_gate, Some(StageOutcome::NotDetected));
        assert!(detailed.result().is_active);
        assert!(!detailed.result().is_password_protected);
    }

    #[tokio::test]
    async fn test_unknown_final_url_is_not_protected() {
        let mut gate = response(StatusCode::OK, PASSWORD_PAGE);
        gate.final_url = None;
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Ok(gate),
        ]));
        let (classifier, _) = classifier(transport);

        let detailed = classifier.classify_detailed("https://store.test").await;
        assert!(matches!(
            detailed.password_gate,
            Some(StageOutcome::Unreachable(_))
        ));
        assert!(!detailed.result().is_password_protected);
    }

    #[tokio::test]
    async fn test_redirect_failure_is_not_protected() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(shopify_server(response(StatusCode::OK, ""))),
            Ok(response(StatusCode::OK, "")),
            Err(FetchError::Redirect {
                url: "https://store.test".to_string(),
                message: "too many redirects".to_string(),
            }),
        ]));
        let (classifier, _) = classifier(transport);

        let result = classifier.classify("https://store.test").await;
        assert!(result.is_active);
        assert!(!result.is_password_protected);
    }

    #[test]
    fn test_result_invariants_hold_for_inconsistent_outcomes() {
        let classification = Classification {
            platform: StageOutcome::NotDetected,
            liveness: Some(StageOutcome::Detected),
            password_gate: Some(StageOutcome::Detected),
        };
        assert_eq!(classification.result(), ProbeResult::default());
    }

    #[test]
    fn test_probe_result_serializes_with_report_names() {
        let json = serde_json::to_value(ProbeResult {
            is_shopify: true,
            is_active: false,
            is_password_protected: false,
        })
        .unwrap();
        assert_eq!(json["isShopify"], true);
        assert_eq!(json["isActive"], false);
        assert_eq!(json["isPasswordProtected"], false);
    }
}
