//! Client configuration: network selection, node endpoint pools, the target
//! blockchain and the backend API, plus the explicit [`ChainContext`] that
//! carries the active selection through the signing flows.

use std::{fmt, fs, path::Path, str::FromStr};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use syndic_data_model::transaction::BlockchainRid;
use url::Url;

/// Node endpoint pool offered by default on testnet.
pub const TESTNET_NODE_URLS: [&str; 4] = [
    "https://node0.testnet.chromia.com:7740",
    "https://node1.testnet.chromia.com:7740",
    "https://node2.testnet.chromia.com:7740",
    "https://node3.testnet.chromia.com:7740",
];

/// Node endpoint pool offered by default on mainnet.
pub const MAINNET_NODE_URLS: [&str; 2] = [
    "https://chromia-sp.bwarelabs.com:7740",
    "https://chromia-api.hashkey.cloud:7740",
];

/// Blockchain used when the configuration names none.
pub const DEFAULT_BLOCKCHAIN_RID: &str =
    "E592E9C2A048753CB39818B9926A1FD09F4BD02CD673648284356540BC9ADD4E";

const DEFAULT_BACKEND_API_URL: &str = "http://127.0.0.1:3000/api";
const ENV_PREFIX: &str = "SYNDIC_";

/// Ledger network the client talks to.
#[derive(
    Debug,
    derive_more::Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Public test network.
    #[default]
    #[display(fmt = "testnet")]
    Testnet,
    /// Production network.
    #[display(fmt = "mainnet")]
    Mainnet,
}

impl Network {
    /// Default node endpoint pool of this network.
    pub fn default_node_urls(self) -> Vec<Url> {
        let urls: &[&str] = match self {
            Self::Testnet => &TESTNET_NODE_URLS,
            Self::Mainnet => &MAINNET_NODE_URLS,
        };
        urls.iter()
            .map(|url| url.parse().expect("Default node urls are valid"))
            .collect()
    }
}

impl FromStr for Network {
    type Err = eyre::ErrReport;

    fn from_str(network: &str) -> Result<Self> {
        match network {
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(eyre::eyre!("Unknown network: `{other}`")),
        }
    }
}

/// Basic Authentication credentials for the backend API.
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
pub struct BasicAuth {
    /// Login for Basic Authentication.
    pub web_login: String,
    /// Password for Basic Authentication.
    pub password: String,
}

/// `Configuration` defines the client parameters persisted in the config
/// file. Loaded once at startup; the signing flows receive the derived
/// [`ChainContext`] rather than reading configuration ambiently.
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// Network to operate on.
    pub network: Network,
    /// Node endpoint pool; when empty, the network default pool applies.
    pub node_urls: Vec<Url>,
    /// Blockchain the signing flows are bound to.
    pub blockchain_rid: BlockchainRid,
    /// Base URL of the bookkeeping backend.
    pub backend_api_url: Url,
    /// Basic Authentication credentials for the backend.
    pub basic_auth: Option<BasicAuth>,
    /// `Logger` configuration.
    pub logger: syndic_logger::Configuration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            network: Network::default(),
            node_urls: Vec::new(),
            blockchain_rid: DEFAULT_BLOCKCHAIN_RID
                .parse()
                .expect("Default blockchain rid is valid"),
            backend_api_url: DEFAULT_BACKEND_API_URL
                .parse()
                .expect("Default backend url is valid"),
            basic_auth: None,
            logger: syndic_logger::Configuration::default(),
        }
    }
}

impl Configuration {
    /// Load configuration from a TOML file, then apply `SYNDIC_*`
    /// environment overrides.
    ///
    /// # Errors
    /// If the file cannot be read, is not valid TOML, or an override is
    /// malformed.
    pub fn from_path<P: AsRef<Path> + fmt::Debug>(path: P) -> Result<Self> {
        let payload = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read the config file {path:?}"))?;
        let configuration: Self =
            toml::from_str(&payload).wrap_err("Failed to deserialize toml from the config file")?;
        configuration.with_env_overrides()
    }

    /// Apply `SYNDIC_NETWORK`, `SYNDIC_BLOCKCHAIN_RID` and
    /// `SYNDIC_BACKEND_API_URL` overrides on top of `self`.
    ///
    /// # Errors
    /// If an override value fails to parse.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(network) = std::env::var(format!("{ENV_PREFIX}NETWORK")) {
            self.network = network.parse().wrap_err("Failed to parse SYNDIC_NETWORK")?;
        }
        if let Ok(rid) = std::env::var(format!("{ENV_PREFIX}BLOCKCHAIN_RID")) {
            self.blockchain_rid = rid
                .parse()
                .map_err(|err| eyre::eyre!("Failed to parse SYNDIC_BLOCKCHAIN_RID: {err}"))?;
        }
        if let Ok(url) = std::env::var(format!("{ENV_PREFIX}BACKEND_API_URL")) {
            self.backend_api_url = url
                .parse()
                .wrap_err("Failed to parse SYNDIC_BACKEND_API_URL")?;
        }
        Ok(self)
    }

    /// Node endpoint pool, falling back to the network default.
    pub fn node_urls(&self) -> Vec<Url> {
        if self.node_urls.is_empty() {
            self.network.default_node_urls()
        } else {
            self.node_urls.clone()
        }
    }
}

/// The active network/blockchain selection, passed explicitly to every
/// component that needs it.
///
/// Built once at application start from [`Configuration`]; a user-driven
/// network switch constructs a new value via [`ChainContext::switch_network`]
/// instead of mutating shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    /// Active network.
    pub network: Network,
    /// Blockchain the flows are bound to.
    pub blockchain_rid: BlockchainRid,
    /// Node endpoint pool for the active network.
    pub node_urls: Vec<Url>,
}

impl ChainContext {
    /// Derive the startup context from configuration.
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            network: configuration.network,
            blockchain_rid: configuration.blockchain_rid,
            node_urls: configuration.node_urls(),
        }
    }

    /// Produce the context for another network, keeping nothing from the old
    /// pool. `blockchain_rid` may pin a specific chain; otherwise the default
    /// rid applies until the chain list has been queried.
    pub fn switch_network(self, network: Network, blockchain_rid: Option<BlockchainRid>) -> Self {
        Self {
            network,
            blockchain_rid: blockchain_rid.unwrap_or_else(|| {
                DEFAULT_BLOCKCHAIN_RID
                    .parse()
                    .expect("Default blockchain rid is valid")
            }),
            node_urls: network.default_node_urls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults_are_testnet() {
        let configuration = Configuration::default();
        assert_eq!(configuration.network, Network::Testnet);
        assert_eq!(configuration.node_urls().len(), TESTNET_NODE_URLS.len());
    }

    #[test]
    fn from_path_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
network = "mainnet"
backend_api_url = "https://backend.example.com/api"

[logger]
max_log_level = "DEBUG"
"#,
        )
        .unwrap();

        let configuration = Configuration::from_path(file.path()).unwrap();
        assert_eq!(configuration.network, Network::Mainnet);
        assert_eq!(
            configuration.backend_api_url.as_str(),
            "https://backend.example.com/api"
        );
        assert_eq!(
            configuration.logger.max_log_level,
            syndic_logger::Level::DEBUG
        );
        assert_eq!(configuration.node_urls().len(), MAINNET_NODE_URLS.len());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a valid toml").unwrap();
        let _err = Configuration::from_path(file.path()).expect_err("should fail on toml parsing");
    }

    #[test]
    fn switching_network_replaces_pool_and_rid() {
        let context = ChainContext::from_configuration(&Configuration::default());
        let pinned: BlockchainRid = "AB".repeat(32).parse().unwrap();

        let switched = context.switch_network(Network::Mainnet, Some(pinned));
        assert_eq!(switched.network, Network::Mainnet);
        assert_eq!(switched.blockchain_rid, pinned);
        assert_eq!(switched.node_urls.len(), MAINNET_NODE_URLS.len());
    }
}
