//! TLD registry: authoritative nameservers per top-level domain.
//!
//! Loaded once per process from a JSON document keyed by TLD label (the
//! output of an IANA root-zone scrape); immutable afterwards and safe to
//! share. A starter data set covering common TLDs ships embedded so the
//! engine works without any external file.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

/// Embedded starter TLD data (IANA root-zone scrape excerpt).
const BUILTIN_ROOT_ZONE: &str = include_str!("../data/root_zone.json");

/// One authoritative nameserver of a TLD registry.
#[derive(Debug, Clone, Deserialize)]
pub struct TldNameserver {
    pub hostname: String,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
}

impl TldNameserver {
    /// The glue IPv4 address, if present and parseable.
    pub fn ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}

/// Registry data for one TLD. Unknown keys in the source document are
/// ignored; only the nameserver list matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct TldEntry {
    #[serde(default)]
    pub nserver: Vec<TldNameserver>,
}

/// Read-only index of TLD label → authoritative nameservers.
#[derive(Debug, Clone, Default)]
pub struct TldRegistry {
    entries: HashMap<String, TldEntry>,
}

impl TldRegistry {
    /// Parse a registry from a JSON document keyed by TLD label.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let entries: HashMap<String, TldEntry> = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("Could not parse TLD data: {e}")))?;
        Ok(Self { entries })
    }

    /// Load a registry from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Could not read TLD data {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// The embedded starter data set.
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_ROOT_ZONE).unwrap_or_else(|e| {
            log::error!("Embedded TLD data failed to parse: {e}");
            Self::default()
        })
    }

    /// An empty registry; every parent-delegation probe will degrade.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up the entry for a TLD label (without leading dot).
    pub fn get(&self, tld: &str) -> Option<&TldEntry> {
        self.entries.get(&tld.to_ascii_lowercase())
    }

    /// Pick one authoritative server of `tld` uniformly at random, among
    /// those carrying usable IPv4 glue.
    pub fn pick_authority(&self, tld: &str) -> Option<(String, Ipv4Addr)> {
        self.pick_authority_excluding(tld, None)
    }

    /// As [`pick_authority`](Self::pick_authority), but avoiding `exclude`
    /// when any alternative exists. Used for the one-server fallback after a
    /// timeout.
    pub fn pick_authority_excluding(
        &self,
        tld: &str,
        exclude: Option<Ipv4Addr>,
    ) -> Option<(String, Ipv4Addr)> {
        let entry = self.get(tld)?;
        let usable: Vec<(String, Ipv4Addr)> = entry
            .nserver
            .iter()
            .filter_map(|ns| ns.ipv4_addr().map(|ip| (ns.hostname.clone(), ip)))
            .collect();

        let preferred: Vec<&(String, Ipv4Addr)> = usable
            .iter()
            .filter(|(_, ip)| Some(*ip) != exclude)
            .collect();
        if let Some(picked) = preferred.choose(&mut rand::rng()) {
            return Some((*picked).clone());
        }
        usable.choose(&mut rand::rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
