//! `acct` transactions: terms of service, login and registration.
//!
//! There is no account store behind these handlers. Responses come from
//! [`AccountConfig`], and registration only acknowledges.

use crate::config::AccountConfig;
use crate::protocol::escape::escape_text;
use crate::protocol::{Class, Packet};
use crate::transactions::handler::{Reply, SessionContext, TransactionHandler};
use crate::transactions::{ADD_ACCOUNT, GET_TOS, LOGIN};

/// Error code for an unknown user.
pub const USER_NOT_FOUND_CODE: u32 = 101;
pub const USER_NOT_FOUND_MESSAGE: &str = "The user was not found";

/// Terms-of-service document as sent on the wire.
#[derive(Debug, Clone)]
pub struct TermsOfService<'a> {
    pub version: &'a str,
    /// Unescaped document body.
    pub text: &'a str,
}

impl TermsOfService<'_> {
    pub fn into_packet(self) -> Packet {
        Packet::builder(Class::ACCT, Packet::SERVER_ID)
            .txn(GET_TOS)
            .field("version", self.version)
            .field("tos", escape_text(self.text))
            .build()
    }
}

/// Named view over a login request.
#[derive(Debug, Clone, Copy)]
pub struct LoginRequest<'a> {
    pub class: Class,
    /// Accepted terms version, absent when the client has not accepted them.
    pub tos_version: Option<&'a str>,
    pub return_encrypted_info: Option<&'a str>,
}

impl<'a> LoginRequest<'a> {
    pub fn from_packet(packet: &'a Packet) -> Self {
        Self {
            class: packet.class(),
            tos_version: packet.field("tosVersion"),
            return_encrypted_info: packet.field("returnEncryptedInfo"),
        }
    }

    pub fn terms_accepted(&self) -> bool {
        self.tos_version.is_some_and(|v| !v.is_empty())
    }
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome<'a> {
    Accepted {
        login_key: &'a str,
        user_id: u64,
        persona_name: &'a str,
    },
    /// Terms not accepted. `echo_class` becomes the response's transaction
    /// name; clients expect the request class there, not `NuPS3Login`.
    UserNotFound { echo_class: Class },
}

impl LoginOutcome<'_> {
    pub fn into_packet(self) -> Packet {
        let builder = Packet::builder(Class::ACCT, Packet::SERVER_ID);
        match self {
            LoginOutcome::Accepted {
                login_key,
                user_id,
                persona_name,
            } => builder
                .field("lkey", login_key)
                .txn(LOGIN)
                .field("userId", user_id)
                .field("personaName", persona_name)
                .build(),
            LoginOutcome::UserNotFound { echo_class } => builder
                .txn(echo_class)
                .field("localizedMessage", USER_NOT_FOUND_MESSAGE)
                .field("errorContainer.[]", 0)
                .field("errorCode", USER_NOT_FOUND_CODE)
                .build(),
        }
    }
}

/// Named view over an account registration request.
#[derive(Debug, Clone, Copy)]
pub struct AddAccountRequest<'a> {
    pub nuid: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl<'a> AddAccountRequest<'a> {
    pub fn from_packet(packet: &'a Packet) -> Self {
        Self {
            nuid: packet.field("nuid"),
            password: packet.field("password"),
        }
    }
}

#[derive(Debug)]
pub struct GetTosHandler {
    account: AccountConfig,
}

impl GetTosHandler {
    pub fn new(account: AccountConfig) -> Self {
        Self { account }
    }
}

impl TransactionHandler for GetTosHandler {
    fn handle(&self, _request: &Packet, _session: &SessionContext) -> Reply {
        let tos = TermsOfService {
            version: &self.account.tos_version,
            text: &self.account.tos_text,
        };
        Reply::new(tos.into_packet())
    }
}

#[derive(Debug)]
pub struct LoginHandler {
    account: AccountConfig,
}

impl LoginHandler {
    pub fn new(account: AccountConfig) -> Self {
        Self { account }
    }
}

impl TransactionHandler for LoginHandler {
    fn handle(&self, request: &Packet, session: &SessionContext) -> Reply {
        let login = LoginRequest::from_packet(request);

        tracing::info!(
            connection_id = %session.connection_id,
            return_encrypted_info = ?login.return_encrypted_info,
            terms_accepted = login.terms_accepted(),
            "Login attempt"
        );

        let outcome = if login.terms_accepted() {
            LoginOutcome::Accepted {
                login_key: &self.account.login_key,
                user_id: self.account.user_id,
                persona_name: &self.account.persona_name,
            }
        } else {
            LoginOutcome::UserNotFound {
                echo_class: login.class,
            }
        };

        Reply::new(outcome.into_packet())
    }
}

/// Registration stub: acknowledges without storing anything.
#[derive(Debug, Default)]
pub struct AddAccountHandler;

impl TransactionHandler for AddAccountHandler {
    fn handle(&self, request: &Packet, session: &SessionContext) -> Reply {
        let candidate = AddAccountRequest::from_packet(request);

        tracing::info!(
            connection_id = %session.connection_id,
            nuid = candidate.nuid.unwrap_or_default(),
            password_supplied = candidate.password.is_some(),
            "Account registration requested"
        );

        Reply::new(Packet::builder(Class::ACCT, Packet::SERVER_ID).txn(ADD_ACCOUNT).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use chrono::Utc;

    fn session() -> SessionContext {
        SessionContext::new(ConnectionId::new(), None, 4, Utc::now())
    }

    fn login(tos_version: Option<&str>) -> Packet {
        let mut builder = Packet::builder(Class::ACCT, 0xC000_0003).txn(LOGIN);
        if let Some(version) = tos_version {
            builder = builder.field("tosVersion", version);
        }
        builder.build()
    }

    #[test]
    fn login_without_terms_is_user_not_found() {
        let handler = LoginHandler::new(AccountConfig::default());

        for request in [login(None), login(Some(""))] {
            let reply = handler.handle(&request, &session());
            let response = reply.response();
            assert_eq!(response.txn(), Some("acct"));
            assert_eq!(response.field("localizedMessage"), Some("The user was not found"));
            assert_eq!(response.field("errorContainer.[]"), Some("0"));
            assert_eq!(response.field("errorCode"), Some("101"));
            assert!(response.field("lkey").is_none());
        }
    }

    #[test]
    fn login_with_terms_issues_session() {
        let handler = LoginHandler::new(AccountConfig::default());
        let reply = handler.handle(&login(Some("20426_17.20426_17")), &session());
        let response = reply.response();

        assert_eq!(response.class(), Class::ACCT);
        assert_eq!(response.txn(), Some("NuPS3Login"));
        assert_eq!(response.field("lkey"), Some("W5NyZzxSaUr4131gCki6GQAAKDw."));
        assert_eq!(response.field("userId"), Some("1000000000000"));
        assert_eq!(response.field("personaName"), Some("faith"));
        assert!(response.field("errorCode").is_none());
    }

    #[test]
    fn login_policy_is_pluggable() {
        let account = AccountConfig {
            login_key: "custom-key".into(),
            persona_name: "hope".into(),
            user_id: 7,
            ..AccountConfig::default()
        };
        let reply = LoginHandler::new(account).handle(&login(Some("1")), &session());
        assert_eq!(reply.response().field("lkey"), Some("custom-key"));
        assert_eq!(reply.response().field("userId"), Some("7"));
        assert_eq!(reply.response().field("personaName"), Some("hope"));
    }

    #[test]
    fn terms_are_escaped_and_versioned() {
        let handler = GetTosHandler::new(AccountConfig::default());
        let request = Packet::builder(Class::ACCT, 0xC000_0002).txn(GET_TOS).build();
        let reply = handler.handle(&request, &session());
        let response = reply.response();

        assert_eq!(response.txn(), Some("NuGetTos"));
        assert_eq!(response.field("version"), Some("20426_17.20426_17"));
        assert_eq!(
            response.field("tos"),
            Some("Welcome to Arcadia!%0ABeware%2C here be dragons!")
        );
    }

    #[test]
    fn add_account_is_bare_acknowledgement() {
        let request = Packet::builder(Class::ACCT, 0xC000_0004)
            .txn(ADD_ACCOUNT)
            .field("nuid", "player@example.com")
            .field("password", "hunter2")
            .build();
        let reply = AddAccountHandler.handle(&request, &session());

        let entries: Vec<_> = reply.response().fields().iter().collect();
        assert_eq!(entries, vec![("TXN", "NuPS3AddAccount")]);
        assert!(reply.follow_ups().is_empty());
    }

    #[test]
    fn add_account_tolerates_missing_credentials() {
        let request = Packet::builder(Class::ACCT, 1).txn(ADD_ACCOUNT).build();
        let view = AddAccountRequest::from_packet(&request);
        assert!(view.nuid.is_none());
        assert!(view.password.is_none());
        assert_eq!(AddAccountHandler.handle(&request, &session()).response().txn(), Some(ADD_ACCOUNT));
    }
}
