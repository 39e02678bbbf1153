use sqlx::PgPool;

use crate::app_error::PortError;

pub mod token_record;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }
}

impl From<sqlx::Error> for PortError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => PortError::Database("connection pool timed out".into()),
            sqlx::Error::Database(db_err) => {
                // Log the driver message, keep the code for the caller.
                tracing::error!(error = ?err, "Database error");
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                PortError::Database(format!("database rejected the operation (code {code})"))
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                PortError::Database("database operation failed".into())
            }
        }
    }
}
