//! # Application State
//!
//! Everything a command needs: the database handle and the exchange-rate
//! service. Both are cheap to share; `Database` wraps a thread-safe pool.

use stockbook_db::Database;

use crate::rates::{BcvRateService, StaticRateProvider};

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    rates: BcvRateService<StaticRateProvider>,
}

impl AppState {
    pub fn new(db: Database, rates: BcvRateService<StaticRateProvider>) -> Self {
        AppState { db, rates }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn rates(&self) -> &BcvRateService<StaticRateProvider> {
        &self.rates
    }
}
