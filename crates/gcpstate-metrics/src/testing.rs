//! Scripted resource client for refresh and collector tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gcpstate_compute::{BoxFuture, FetchError, FetchResult, ResourceClient};
use gcpstate_state::{ForwardingRule, ProjectScope, UrlMap};

/// Returns canned lists (or errors) and counts calls.
#[derive(Default)]
pub(crate) struct FakeClient {
    url_maps: Mutex<Option<Vec<UrlMap>>>,
    forwarding_rules: Mutex<Option<Vec<ForwardingRule>>>,
    delay: Duration,
    url_map_calls: AtomicUsize,
    forwarding_rule_calls: AtomicUsize,
}

impl FakeClient {
    /// Both kinds succeed with the given lists.
    pub fn new(url_maps: Vec<UrlMap>, forwarding_rules: Vec<ForwardingRule>) -> Self {
        Self {
            url_maps: Mutex::new(Some(url_maps)),
            forwarding_rules: Mutex::new(Some(forwarding_rules)),
            ..Default::default()
        }
    }

    /// Both kinds fail.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `None` makes the next fetches of that kind fail.
    pub fn set_url_maps(&self, maps: Option<Vec<UrlMap>>) {
        *self.url_maps.lock().unwrap() = maps;
    }

    pub fn set_forwarding_rules(&self, rules: Option<Vec<ForwardingRule>>) {
        *self.forwarding_rules.lock().unwrap() = rules;
    }

    pub fn url_map_calls(&self) -> usize {
        self.url_map_calls.load(Ordering::SeqCst)
    }

    pub fn forwarding_rule_calls(&self) -> usize {
        self.forwarding_rule_calls.load(Ordering::SeqCst)
    }
}

impl ResourceClient for FakeClient {
    fn list_url_maps<'a>(
        &'a self,
        _scope: &'a ProjectScope,
    ) -> BoxFuture<'a, FetchResult<Vec<UrlMap>>> {
        Box::pin(async move {
            self.url_map_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let maps = self.url_maps.lock().unwrap().clone();
            maps.ok_or_else(|| FetchError::Http("connection refused".to_string()))
        })
    }

    fn list_forwarding_rules<'a>(
        &'a self,
        _scope: &'a ProjectScope,
    ) -> BoxFuture<'a, FetchResult<Vec<ForwardingRule>>> {
        Box::pin(async move {
            self.forwarding_rule_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let rules = self.forwarding_rules.lock().unwrap().clone();
            rules.ok_or_else(|| FetchError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            })
        })
    }
}

pub(crate) fn url_map(name: &str) -> UrlMap {
    UrlMap {
        name: name.to_string(),
        ..Default::default()
    }
}

pub(crate) fn forwarding_rule(name: &str) -> ForwardingRule {
    ForwardingRule {
        name: name.to_string(),
        ..Default::default()
    }
}
