//! `fsys` transactions: greeting and keep-alive.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::ServicesConfig;
use crate::protocol::{Class, Packet};
use crate::transactions::handler::{Reply, SessionContext, TransactionHandler};
use crate::transactions::{HELLO, MEMCHECK};

/// `curTime` rendering, e.g. `Oct-19-2026 14:03:11 UTC`.
const CUR_TIME_FORMAT: &str = "%b-%d-%Y %H:%M:%S UTC";

/// Capability and endpoint advertisement sent in answer to a greeting.
#[derive(Debug, Clone)]
pub struct HelloAdvertisement<'a> {
    pub services: &'a ServicesConfig,
    pub now: DateTime<Utc>,
}

impl HelloAdvertisement<'_> {
    pub fn into_packet(self) -> Packet {
        let services = self.services;
        Packet::builder(Class::FSYS, Packet::SERVER_ID)
            .field("domainPartition.domain", &services.domain)
            .field("messengerIp", &services.messenger_ip)
            .field("messengerPort", services.messenger_port)
            .field("domainPartition.subDomain", &services.sub_domain)
            .txn(HELLO)
            .field("activityTimeoutSecs", services.activity_timeout_secs)
            .field("curTime", self.now.format(CUR_TIME_FORMAT))
            .field("theaterIp", &services.theater_ip)
            .field("theaterPort", services.theater_port)
            .build()
    }
}

/// Server-issued liveness challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemCheckChallenge {
    pub salt: u32,
}

impl MemCheckChallenge {
    /// Challenge with a fresh random salt.
    pub fn random() -> Self {
        Self {
            salt: rand::thread_rng().gen(),
        }
    }

    pub fn into_packet(self) -> Packet {
        Packet::builder(Class::FSYS, Packet::SERVER_ID)
            .txn(MEMCHECK)
            .field("memcheck.[]", 0)
            .field("type", 0)
            .field("salt", self.salt)
            .build()
    }
}

/// Answers `fsys/Hello` and immediately opens the keep-alive cycle.
#[derive(Debug)]
pub struct HelloHandler {
    services: ServicesConfig,
}

impl HelloHandler {
    pub fn new(services: ServicesConfig) -> Self {
        Self { services }
    }
}

impl TransactionHandler for HelloHandler {
    fn handle(&self, _request: &Packet, session: &SessionContext) -> Reply {
        let advertisement = HelloAdvertisement {
            services: &self.services,
            now: session.now,
        };
        Reply::new(advertisement.into_packet()).with_follow_up(MemCheckChallenge::random().into_packet())
    }
}

/// Answers a client's keep-alive acknowledgement with a new challenge after
/// a fixed pause.
#[derive(Debug)]
pub struct MemCheckHandler {
    interval: Duration,
}

impl MemCheckHandler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl TransactionHandler for MemCheckHandler {
    fn handle(&self, _request: &Packet, _session: &SessionContext) -> Reply {
        Reply::after(self.interval, MemCheckChallenge::random().into_packet())
    }

    fn advances_ticket(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use chrono::TimeZone;

    fn session() -> SessionContext {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 14, 3, 11).unwrap();
        SessionContext::new(ConnectionId::new(), None, 1, now)
    }

    fn request(txn: &str) -> Packet {
        Packet::builder(Class::FSYS, 0xC000_0001).txn(txn).build()
    }

    #[test]
    fn hello_advertises_services_then_challenges() {
        let handler = HelloHandler::new(ServicesConfig::default());
        let reply = handler.handle(&request(HELLO), &session());

        assert_eq!(reply.pause(), None);
        let hello = reply.response();
        assert_eq!(hello.class(), Class::FSYS);
        assert_eq!(hello.id(), Packet::SERVER_ID);

        let keys: Vec<_> = hello.fields().iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "domainPartition.domain",
                "messengerIp",
                "messengerPort",
                "domainPartition.subDomain",
                "TXN",
                "activityTimeoutSecs",
                "curTime",
                "theaterIp",
                "theaterPort",
            ]
        );
        assert_eq!(hello.field("curTime"), Some("Oct-19-2026 14:03:11 UTC"));
        assert_eq!(hello.field("theaterPort"), Some("18236"));
        assert_eq!(hello.field("domainPartition.subDomain"), Some("BEACH"));

        assert_eq!(reply.follow_ups().len(), 1);
        assert_eq!(reply.follow_ups()[0].txn(), Some(MEMCHECK));
        assert!(handler.advances_ticket());
    }

    #[test]
    fn memcheck_pauses_and_is_ticket_exempt() {
        let handler = MemCheckHandler::new(Duration::from_millis(1000));
        let reply = handler.handle(&request(MEMCHECK), &session());

        assert_eq!(reply.pause(), Some(Duration::from_millis(1000)));
        assert!(reply.follow_ups().is_empty());
        assert!(!handler.advances_ticket());

        let challenge = reply.response();
        assert_eq!(challenge.field("memcheck.[]"), Some("0"));
        assert_eq!(challenge.field("type"), Some("0"));
        assert!(challenge.field("salt").unwrap().parse::<u32>().is_ok());
    }

    #[test]
    fn challenge_fields_are_ordered() {
        let packet = MemCheckChallenge { salt: 42 }.into_packet();
        let entries: Vec<_> = packet.fields().iter().collect();
        assert_eq!(
            entries,
            vec![("TXN", "MemCheck"), ("memcheck.[]", "0"), ("type", "0"), ("salt", "42")]
        );
    }
}
