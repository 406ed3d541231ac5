//! DNS responder for a single base domain.
//!
//! Only `A` questions below the configured base domain are answered. Messages must carry exactly
//! one question; others are answered FORMERR.
//! A question's name is stripped of the base domain and the remaining label is resolved, first
//! match wins:
//!
//! 1. **Fixed records**: labels configured with `--record name:address`, and the `--self`
//!    labels pointing at the server's own address. Answered with an `A` record and the configured
//!    TTL.
//! 2. **Caller IP**: `ip`, `my` and `myip` are answered with a `TXT` record holding the IP address
//!    the query came from.
//! 3. **Short id**: `id`, `key` and `nanoid` are answered with a `TXT` record holding a fresh
//!    12 symbol [id][crate::ids].
//!
//! Dynamic answers have a TTL of 1 second. Anything else gets a reply without answers.
//!
//! E.g. with `bekind dns -d example.com -r shop:203.0.113.5`:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 7353 +short shop.example.com
//! 203.0.113.5
//! ❯ dig @127.0.0.1 -p 7353 +short myip.example.com
//! "127.0.0.1"
//! ❯ dig @127.0.0.1 -p 7353 +short nanoid.example.com
//! "k3v9qzr-a2hw"
//! ```

mod handlers;
pub mod records;
pub mod resolver;
pub mod server;

pub use handlers::Handler;
pub use records::{RecordStore, StoredAddress};
pub use resolver::{Resolution, Resolver};
pub use server::DnsServer;
