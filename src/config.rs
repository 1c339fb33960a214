//! Configuration - passed in by the caller, never read from global state

use std::time::Duration;

use crate::inscription::RetryPolicy;

pub const MAINNET_MEMPOOL_URL: &str = "https://mempool.fractalbitcoin.io";
/// Fractal's test network uses mainnet-format addresses (`1`, `3`, `bc1`), so
/// this service pairs with [`Network::Bitcoin`]. See [`FractalConfig::fractal_testnet`].
pub const TESTNET_MEMPOOL_URL: &str = "https://mempool-testnet.fractalbitcoin.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network { #[default] Bitcoin, Testnet }

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self { Network::Bitcoin => "bitcoin", Network::Testnet => "testnet" }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Some(Network::Bitcoin),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    pub fn to_bitcoin(&self) -> bitcoin::Network {
        match self { Network::Bitcoin => bitcoin::Network::Bitcoin, Network::Testnet => bitcoin::Network::Testnet }
    }

    pub fn default_mempool_url(&self) -> &'static str {
        match self { Network::Bitcoin => MAINNET_MEMPOOL_URL, Network::Testnet => TESTNET_MEMPOOL_URL }
    }
}

/// Settings for one client. Higher layers construct this.
#[derive(Debug, Clone)]
pub struct FractalConfig {
    pub network: Network,
    pub mempool_url: String,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for FractalConfig {
    fn default() -> Self { Self::new(Network::default()) }
}

impl FractalConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            mempool_url: network.default_mempool_url().into(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
    pub fn mainnet() -> Self { Self::new(Network::Bitcoin) }
    /// `tb1`/`m`/`n`/`2` addresses. The default URL is the Fractal test
    /// service, which lists mainnet-format addresses; point `with_mempool_url`
    /// at a service that indexes testnet-format addresses.
    pub fn testnet() -> Self { Self::new(Network::Testnet) }
    /// Fractal's test network: mainnet address prefixes against the test service.
    pub fn fractal_testnet() -> Self { Self::mainnet().with_mempool_url(TESTNET_MEMPOOL_URL) }
    pub fn with_mempool_url(mut self, url: impl Into<String>) -> Self { self.mempool_url = url.into(); self }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self { self.retry = retry; self }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self { self.request_timeout = timeout; self }

    /// Build from `FRACTAL_NETWORK` and `FRACTAL_MEMPOOL_URL`.
    pub fn from_env() -> Self {
        let network = std::env::var("FRACTAL_NETWORK")
            .ok()
            .and_then(|v| Network::from_str(&v))
            .unwrap_or_default();
        let config = Self::new(network);
        match std::env::var("FRACTAL_MEMPOOL_URL") {
            Ok(url) if !url.trim().is_empty() => config.with_mempool_url(url.trim()),
            _ => config,
        }
    }
}
