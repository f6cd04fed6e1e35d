//! Transaction lookup and dispatch.
//!
//! # Responsibilities
//! - Store handlers keyed by (class, transaction name)
//! - Look up the handler for a decoded request
//! - Apply the unknown-transaction policy when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (shared across sessions without locks)
//! - O(1) lookup via HashMap
//! - Explicit Unrecognized route rather than a silent default

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::{FrontendConfig, UnknownTransactionPolicy};
use crate::observability::metrics;
use crate::protocol::{Class, Packet};
use crate::transactions::account::{AddAccountHandler, GetTosHandler, LoginHandler};
use crate::transactions::handler::{Reply, SessionContext, TransactionHandler};
use crate::transactions::system::{HelloHandler, MemCheckHandler};
use crate::transactions::{ADD_ACCOUNT, GET_TOS, HELLO, LOGIN, MEMCHECK};

/// Outcome of looking up a request.
#[derive(Debug, Clone, Copy)]
pub enum Route<'a> {
    Handler(&'a dyn TransactionHandler),
    Unrecognized,
}

impl Route<'_> {
    /// Unrecognized requests advance the ticket like any other request.
    pub fn advances_ticket(&self) -> bool {
        match self {
            Route::Handler(handler) => handler.advances_ticket(),
            Route::Unrecognized => true,
        }
    }
}

/// Dispatcher shared by every session, swapped whole on config reload.
pub type SharedDispatcher = Arc<ArcSwap<Dispatcher>>;

/// Routing table from (class, TXN) to handler.
#[derive(Debug, Default)]
pub struct Dispatcher {
    handlers: HashMap<(Class, String), Arc<dyn TransactionHandler>>,
    unknown: UnknownTransactionPolicy,
}

impl Dispatcher {
    /// Empty table with the given unknown-transaction policy.
    pub fn new(unknown: UnknownTransactionPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            unknown,
        }
    }

    /// Table with every supported transaction registered.
    pub fn from_config(config: &FrontendConfig) -> Self {
        let interval = Duration::from_millis(config.protocol.memcheck_interval_ms);

        let mut dispatcher = Self::new(config.protocol.unknown_transaction);
        dispatcher.register(Class::FSYS, HELLO, HelloHandler::new(config.services.clone()));
        dispatcher.register(Class::FSYS, MEMCHECK, MemCheckHandler::new(interval));
        dispatcher.register(Class::ACCT, GET_TOS, GetTosHandler::new(config.account.clone()));
        dispatcher.register(Class::ACCT, LOGIN, LoginHandler::new(config.account.clone()));
        dispatcher.register(Class::ACCT, ADD_ACCOUNT, AddAccountHandler);
        dispatcher
    }

    /// Wrap for sharing across sessions.
    pub fn into_shared(self) -> SharedDispatcher {
        Arc::new(ArcSwap::from_pointee(self))
    }

    /// Register (or replace) the handler for a transaction.
    pub fn register<H>(&mut self, class: Class, txn: &str, handler: H)
    where
        H: TransactionHandler + 'static,
    {
        self.handlers.insert((class, txn.to_string()), Arc::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Find the route for a request. A request without a TXN field never
    /// matches.
    pub fn route(&self, request: &Packet) -> Route<'_> {
        let Some(txn) = request.txn() else {
            return Route::Unrecognized;
        };
        match self.handlers.get(&(request.class(), txn.to_string())) {
            Some(handler) => Route::Handler(handler.as_ref()),
            None => Route::Unrecognized,
        }
    }

    /// Run an already computed route.
    pub fn run(&self, route: Route<'_>, request: &Packet, session: &SessionContext) -> Option<Reply> {
        match route {
            Route::Handler(handler) => Some(handler.handle(request, session)),
            Route::Unrecognized => self.unrecognized(request, session),
        }
    }

    /// Route and run in one step.
    pub fn dispatch(&self, request: &Packet, session: &SessionContext) -> Option<Reply> {
        self.run(self.route(request), request, session)
    }

    fn unrecognized(&self, request: &Packet, session: &SessionContext) -> Option<Reply> {
        let txn = request.txn().unwrap_or_default();

        tracing::warn!(
            connection_id = %session.connection_id,
            class = %request.class(),
            txn = %txn,
            "Unknown transaction"
        );
        metrics::record_unknown_transaction(request.class().as_str());

        match self.unknown {
            UnknownTransactionPolicy::Ignore => None,
            UnknownTransactionPolicy::Acknowledge => Some(Reply::new(
                Packet::builder(request.class(), Packet::SERVER_ID).txn(txn).build(),
            )),
        }
    }
}
