//! Fake network backend for deterministic tests
//!
//! ```rust,ignore
//! let backend = FakeNetworkBackend::builder()
//!     .interface("eth0", "UP")
//!     .gateway("192.168.1.1")
//!     .echo_replies("192.168.1.1", &[false, true])
//!     .dns("google.com", vec![DnsRecord::A("1.2.3.4".parse().unwrap())])
//!     .build();
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::backend::{
    BackendError, BackendResult, DnsRecord, HttpMethod, InterfaceStatus, NetworkBackend,
};

type Canned<T> = Result<T, BackendError>;

/// Backend that answers from pre-configured responses
pub struct FakeNetworkBackend {
    interfaces: Canned<Vec<InterfaceStatus>>,
    gateways: Canned<Vec<String>>,
    echo_replies: Mutex<HashMap<String, VecDeque<Canned<bool>>>>,
    texts: HashMap<String, Canned<String>>,
    dns: HashMap<String, Canned<Vec<DnsRecord>>>,
    http: HashMap<(HttpMethod, String), Canned<u16>>,
    /// Sleep this long before answering any call
    delay: Option<Duration>,
    panic_on_interfaces: bool,
    /// Track call counts for assertions
    call_counts: Mutex<HashMap<String, usize>>,
}

impl FakeNetworkBackend {
    pub fn builder() -> FakeNetworkBackendBuilder {
        FakeNetworkBackendBuilder::new()
    }

    /// Number of calls made for a key such as `"echo:192.168.1.1"` or `"GET:https://x"`
    pub fn call_count(&self, key: &str) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    async fn record(&self, key: String) {
        {
            let mut counts = self.call_counts.lock().unwrap();
            *counts.entry(key).or_insert(0) += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl NetworkBackend for FakeNetworkBackend {
    async fn interfaces(&self, _timeout: Duration) -> BackendResult<Vec<InterfaceStatus>> {
        self.record("interfaces".to_string()).await;
        if self.panic_on_interfaces {
            panic!("interface table unavailable");
        }
        self.interfaces.clone()
    }

    async fn default_gateways(&self, _timeout: Duration) -> BackendResult<Vec<String>> {
        self.record("gateways".to_string()).await;
        self.gateways.clone()
    }

    async fn echo(&self, host: &str, _timeout: Duration) -> BackendResult<bool> {
        self.record(format!("echo:{}", host)).await;
        self.echo_replies
            .lock()
            .unwrap()
            .get_mut(host)
            .and_then(|replies| replies.pop_front())
            .unwrap_or(Ok(false))
    }

    async fn fetch_text(&self, url: &str, _timeout: Duration) -> BackendResult<String> {
        self.record(format!("fetch:{}", url)).await;
        self.texts
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(BackendError::Http(format!("no route to {}", url))))
    }

    async fn resolve(&self, domain: &str, _timeout: Duration) -> BackendResult<Vec<DnsRecord>> {
        self.record(format!("resolve:{}", domain)).await;
        self.dns
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Err(BackendError::Resolve(format!("NXDOMAIN {}", domain))))
    }

    async fn http_status(
        &self,
        method: HttpMethod,
        url: &str,
        _timeout: Duration,
    ) -> BackendResult<u16> {
        self.record(format!("{}:{}", method, url)).await;
        self.http
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(BackendError::Http(format!("connection refused: {}", url))))
    }
}

/// Builder for FakeNetworkBackend
pub struct FakeNetworkBackendBuilder {
    interfaces: Canned<Vec<InterfaceStatus>>,
    gateways: Canned<Vec<String>>,
    echo_replies: HashMap<String, VecDeque<Canned<bool>>>,
    texts: HashMap<String, Canned<String>>,
    dns: HashMap<String, Canned<Vec<DnsRecord>>>,
    http: HashMap<(HttpMethod, String), Canned<u16>>,
    delay: Option<Duration>,
    panic_on_interfaces: bool,
}

impl FakeNetworkBackendBuilder {
    /// Empty network: no interfaces, no gateways, nothing answers
    pub fn new() -> Self {
        Self {
            interfaces: Ok(Vec::new()),
            gateways: Ok(Vec::new()),
            echo_replies: HashMap::new(),
            texts: HashMap::new(),
            dns: HashMap::new(),
            http: HashMap::new(),
            delay: None,
            panic_on_interfaces: false,
        }
    }

    pub fn interface(mut self, name: &str, state: &str) -> Self {
        if let Ok(list) = self.interfaces.as_mut() {
            list.push(InterfaceStatus::new(name, state));
        }
        self
    }

    pub fn interfaces_error(mut self, error: BackendError) -> Self {
        self.interfaces = Err(error);
        self
    }

    pub fn gateway(mut self, gateway: &str) -> Self {
        if let Ok(list) = self.gateways.as_mut() {
            list.push(gateway.to_string());
        }
        self
    }

    pub fn gateways_error(mut self, error: BackendError) -> Self {
        self.gateways = Err(error);
        self
    }

    /// Queue echo answers for a host, consumed in order. Unqueued echoes fail.
    pub fn echo_replies(mut self, host: &str, replies: &[bool]) -> Self {
        self.echo_replies
            .entry(host.to_string())
            .or_default()
            .extend(replies.iter().map(|r| Ok(*r)));
        self
    }

    pub fn echo_error(mut self, host: &str, error: BackendError) -> Self {
        self.echo_replies
            .entry(host.to_string())
            .or_default()
            .push_back(Err(error));
        self
    }

    pub fn text(mut self, url: &str, body: &str) -> Self {
        self.texts.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn text_error(mut self, url: &str, error: BackendError) -> Self {
        self.texts.insert(url.to_string(), Err(error));
        self
    }

    pub fn dns(mut self, domain: &str, records: Vec<DnsRecord>) -> Self {
        self.dns.insert(domain.to_string(), Ok(records));
        self
    }

    pub fn dns_error(mut self, domain: &str, error: BackendError) -> Self {
        self.dns.insert(domain.to_string(), Err(error));
        self
    }

    pub fn http(mut self, method: HttpMethod, url: &str, status: u16) -> Self {
        self.http.insert((method, url.to_string()), Ok(status));
        self
    }

    pub fn http_error(mut self, method: HttpMethod, url: &str, error: BackendError) -> Self {
        self.http.insert((method, url.to_string()), Err(error));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panic_on_interfaces(mut self) -> Self {
        self.panic_on_interfaces = true;
        self
    }

    pub fn build(self) -> FakeNetworkBackend {
        FakeNetworkBackend {
            interfaces: self.interfaces,
            gateways: self.gateways,
            echo_replies: Mutex::new(self.echo_replies),
            texts: self.texts,
            dns: self.dns,
            http: self.http,
            delay: self.delay,
            panic_on_interfaces: self.panic_on_interfaces,
            call_counts: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for FakeNetworkBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
