use sea_orm::DatabaseConnection;

use crate::{Money, ResultEngine};

mod audit;
mod cash;
mod employees;
mod items;
mod stock;
mod transactions;
mod units;

pub use audit::{ProjectionReport, StockDrift};
pub use stock::StockArrival;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    opening_balance: Money,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    opening_balance: Money,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Cash balance used when the balance row is first created.
    pub fn opening_balance(mut self, balance: impl Into<Money>) -> EngineBuilder {
        self.opening_balance = balance.into();
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            opening_balance: self.opening_balance,
        })
    }
}
