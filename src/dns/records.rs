use crate::config::DnsConfig;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use tracing::warn;

/// The address of a fixed record. Entries whose configured value didn't parse are kept as
/// [`StoredAddress::Invalid`] so that querying them fails visibly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAddress {
    Valid(IpAddr),
    Invalid(String),
}

impl StoredAddress {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse() {
            Ok(ip) => StoredAddress::Valid(ip),
            Err(_) => StoredAddress::Invalid(raw.to_string()),
        }
    }
}

impl fmt::Display for StoredAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredAddress::Valid(ip) => write!(f, "{ip}"),
            StoredAddress::Invalid(raw) => write!(f, "invalid({raw:?})"),
        }
    }
}

/// Fixed records keyed by label (the part of a name before the base domain). Built once at
/// startup and never mutated while serving.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: HashMap<String, StoredAddress>,
}

impl RecordStore {
    /// Build the store from the configured fixed records, plus the self records pointing at
    /// `self_addr`. Self records win over fixed records with the same label.
    #[must_use]
    pub fn from_config(config: &DnsConfig, self_addr: Option<IpAddr>) -> Self {
        let mut store = RecordStore::default();
        for (label, raw) in &config.records {
            let addr = StoredAddress::parse(raw);
            if let StoredAddress::Invalid(_) = addr {
                warn!(label = %label, address = %raw, "fixed record has an invalid address");
            }
            store.insert(label, addr);
        }
        let self_addr = match self_addr {
            Some(ip) => StoredAddress::Valid(ip),
            None => StoredAddress::Invalid(String::new()),
        };
        for label in &config.self_records {
            store.insert(label, self_addr.clone());
        }
        store
    }

    pub fn insert(&mut self, label: &str, addr: StoredAddress) {
        self.records.insert(label.to_ascii_lowercase(), addr);
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&StoredAddress> {
        self.records.get(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
