use crate::config::DnsConfig;
use crate::dns::records::{RecordStore, StoredAddress};
use crate::error::Error;
use crate::ids::{self, Generator};
use std::net::{IpAddr, SocketAddr};
use trust_dns_server::client::rr::rdata::TXT;
use trust_dns_server::client::rr::{Name, RData, Record};

/// Labels answered with the caller's own IP address.
pub const CALLER_IP_ALIASES: [&str; 3] = ["ip", "my", "myip"];
/// Labels answered with a freshly generated short id.
pub const SHORT_ID_ALIASES: [&str; 3] = ["id", "key", "nanoid"];

/// Length of the ids served for [`SHORT_ID_ALIASES`].
pub const SHORT_ID_LENGTH: usize = 12;
/// TTL of the dynamic answers. They're specific to the caller, or unique per query.
pub const DYNAMIC_TTL: u32 = 1;

/// How a question name gets answered, in order of precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Fixed(&'a StoredAddress),
    CallerIp,
    ShortId,
    Unmatched,
}

/// Answers `A` questions under the base domain from the [`RecordStore`] and the dynamic aliases.
/// Stateless apart from the store snapshot it was built with.
pub struct Resolver {
    domain: String,
    ttl: u32,
    store: RecordStore,
    short_ids: Generator,
}

impl Resolver {
    pub fn new(config: &DnsConfig, store: RecordStore) -> Result<Self, Error> {
        Ok(Resolver {
            domain: config.domain.clone(),
            ttl: config.ttl,
            store,
            short_ids: ids::generator(SHORT_ID_LENGTH)?,
        })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The label of a fully qualified `name`, or `None` when it isn't below the base domain.
    #[must_use]
    pub fn label<'n>(&self, name: &'n str) -> Option<&'n str> {
        name.strip_suffix(self.domain.as_str())?
            .strip_suffix('.')
            .filter(|label| !label.is_empty())
    }

    #[must_use]
    pub fn classify(&self, name: &str) -> Resolution<'_> {
        let Some(label) = self.label(name) else {
            return Resolution::Unmatched;
        };
        if let Some(addr) = self.store.get(label) {
            Resolution::Fixed(addr)
        } else if CALLER_IP_ALIASES.contains(&label) {
            Resolution::CallerIp
        } else if SHORT_ID_ALIASES.contains(&label) {
            Resolution::ShortId
        } else {
            Resolution::Unmatched
        }
    }

    /// Answer an `A` question for `name` asked by `remote`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] or [`Error::NotIPv4`] when `name` is a fixed record whose
    /// address can't form an `A` answer.
    pub fn resolve(&self, name: &Name, remote: SocketAddr) -> Result<Option<Record>, Error> {
        let qname = name.to_ascii().to_ascii_lowercase();
        let record = match self.classify(&qname) {
            Resolution::Fixed(addr) => {
                let rdata = a_rdata(self.label(&qname).unwrap_or_default(), addr)?;
                Record::from_rdata(name.clone(), self.ttl, rdata)
            }
            Resolution::CallerIp => txt_record(name, remote.ip().to_string()),
            Resolution::ShortId => txt_record(name, (self.short_ids)()),
            Resolution::Unmatched => return Ok(None),
        };
        Ok(Some(record))
    }
}

fn a_rdata(label: &str, addr: &StoredAddress) -> Result<RData, Error> {
    match addr {
        StoredAddress::Valid(IpAddr::V4(ip)) => Ok(RData::A(*ip)),
        StoredAddress::Valid(IpAddr::V6(ip)) => Err(Error::NotIPv4(label.to_string(), *ip)),
        StoredAddress::Invalid(raw) => Err(Error::InvalidAddress {
            label: label.to_string(),
            raw: raw.clone(),
        }),
    }
}

fn txt_record(name: &Name, text: String) -> Record {
    Record::from_rdata(name.clone(), DYNAMIC_TTL, RData::TXT(TXT::new(vec![text])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::str::FromStr;
    use trust_dns_server::client::rr::RecordType;

    fn resolver() -> Resolver {
        let config = DnsConfig {
            domain: "example.com.".into(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ttl: 30,
            records: BTreeMap::from([
                ("shop".to_string(), "203.0.113.5".to_string()),
                ("ip".to_string(), "192.0.2.9".to_string()),
                ("v6".to_string(), "2001:db8::1".to_string()),
                ("broken".to_string(), "nope".to_string()),
            ]),
            self_records: vec![],
            self_addr: None,
        };
        let store = RecordStore::from_config(&config, None);
        Resolver::new(&config, store).unwrap()
    }

    fn peer() -> SocketAddr {
        "198.51.100.9:5353".parse().unwrap()
    }

    fn txt_of(record: &Record) -> String {
        match record.data() {
            Some(RData::TXT(txt)) => txt
                .txt_data()
                .iter()
                .map(|d| String::from_utf8_lossy(d).into_owned())
                .collect(),
            other => panic!("expected TXT, got {other:?}"),
        }
    }

    #[test]
    fn strips_base_domain() {
        let r = resolver();
        assert_eq!(r.label("shop.example.com."), Some("shop"));
        assert_eq!(r.label("a.b.example.com."), Some("a.b"));
        assert_eq!(r.label("example.com."), None);
        assert_eq!(r.label("shopexample.com."), None);
        assert_eq!(r.label("shop.example.org."), None);
    }

    #[test]
    fn classification_order() {
        let r = resolver();
        assert!(matches!(r.classify("shop.example.com."), Resolution::Fixed(_)));
        // a stored record shadows the alias of the same name
        assert!(matches!(r.classify("ip.example.com."), Resolution::Fixed(_)));
        assert_eq!(r.classify("my.example.com."), Resolution::CallerIp);
        assert_eq!(r.classify("myip.example.com."), Resolution::CallerIp);
        for alias in SHORT_ID_ALIASES {
            assert_eq!(r.classify(&format!("{alias}.example.com.")), Resolution::ShortId);
        }
        assert_eq!(r.classify("other.example.com."), Resolution::Unmatched);
        assert_eq!(r.classify("my.example.org."), Resolution::Unmatched);
    }

    #[test]
    fn fixed_record_answer() {
        let name = Name::from_str("shop.example.com.").unwrap();
        let record = resolver().resolve(&name, peer()).unwrap().unwrap();
        assert_eq!(record.record_type(), RecordType::A);
        assert_eq!(record.ttl(), 30);
        assert_eq!(record.name(), &name);
        assert_eq!(record.data(), Some(&RData::A("203.0.113.5".parse().unwrap())));
    }

    #[test]
    fn answer_keeps_question_case() {
        let name = Name::from_str("ShOp.Example.COM.").unwrap();
        let record = resolver().resolve(&name, peer()).unwrap().unwrap();
        assert_eq!(record.name().to_ascii(), "ShOp.Example.COM.");
        assert_eq!(record.data(), Some(&RData::A("203.0.113.5".parse().unwrap())));
    }

    #[test]
    fn caller_ip_answer_ignores_port() {
        let name = Name::from_str("myip.example.com.").unwrap();
        let r = resolver();
        let first = r.resolve(&name, peer()).unwrap().unwrap();
        let second = r
            .resolve(&name, "198.51.100.9:40000".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(first.ttl(), DYNAMIC_TTL);
        assert_eq!(txt_of(&first), "198.51.100.9");
        assert_eq!(txt_of(&second), "198.51.100.9");
    }

    #[test]
    fn caller_ip_answer_for_ipv6_peer() {
        let name = Name::from_str("ip.example.com.").unwrap();
        let mut r = resolver();
        r.store = RecordStore::default();
        let record = r
            .resolve(&name, "[2001:db8::7]:5353".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(txt_of(&record), "2001:db8::7");
    }

    #[test]
    fn short_id_answers_are_fresh() {
        let name = Name::from_str("nanoid.example.com.").unwrap();
        let r = resolver();
        let first = txt_of(&r.resolve(&name, peer()).unwrap().unwrap());
        let second = txt_of(&r.resolve(&name, peer()).unwrap().unwrap());
        assert_ne!(first, second);
        assert_eq!(first.len(), SHORT_ID_LENGTH);
        assert!(first.bytes().all(|b| ids::ALPHABET.contains(&b)));
    }

    #[test]
    fn unmatched_has_no_answer() {
        let name = Name::from_str("nothing.example.com.").unwrap();
        assert!(resolver().resolve(&name, peer()).unwrap().is_none());
    }

    #[test]
    fn unusable_fixed_records_fail() {
        let r = resolver();
        let broken = Name::from_str("broken.example.com.").unwrap();
        assert!(matches!(
            r.resolve(&broken, peer()),
            Err(Error::InvalidAddress { .. })
        ));
        let v6 = Name::from_str("v6.example.com.").unwrap();
        assert!(matches!(r.resolve(&v6, peer()), Err(Error::NotIPv4(_, _))));
    }
}
