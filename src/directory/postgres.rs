//! Relational user directory.
//!
//! Users live in `users`, their roles in `user_roles`. The DN comparison is
//! case-insensitive; the stored DN is returned.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::directory::{DirectoryError, ResolvedUser, UserDirectory};

const USER_QUERY: &str = "
    SELECT u.dn, u.given_name, u.surname, r.role_name
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
    WHERE LOWER(u.dn) = LOWER($1)
    ORDER BY r.role_name";

pub struct PostgresDirectory {
    pool: Pool,
}

impl PostgresDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Fold the joined rows (one per role) into a single user.
fn user_from_rows(rows: &[Row]) -> Option<ResolvedUser> {
    let first = rows.first()?;
    let roles = rows
        .iter()
        .filter_map(|row| row.get::<_, Option<String>>(3))
        .collect();

    Some(ResolvedUser {
        dn: first.get(0),
        given_name: first.get(1),
        surname: first.get(2),
        roles,
    })
}

#[async_trait]
impl UserDirectory for PostgresDirectory {
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError> {
        let client = self.pool.get().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to acquire database connection");
            DirectoryError::Unavailable(e.to_string())
        })?;

        let rows = client.query(USER_QUERY, &[&identity]).await.map_err(|e| {
            tracing::error!(error = %e, dn = %identity, "User query failed");
            DirectoryError::Unavailable(e.to_string())
        })?;

        match user_from_rows(&rows) {
            Some(user) => {
                tracing::debug!(dn = %user.dn, roles = ?user.roles, "Found user in database");
                Ok(user)
            }
            None => {
                tracing::debug!(dn = %identity, "User not found in database");
                Err(DirectoryError::UserNotFound(identity.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
