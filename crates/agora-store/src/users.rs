use agora_shared::UserId;
use rusqlite::{params, OptionalExtension};

use crate::database::{now, ts_column, ts_to_sql, Database};
use crate::error::Result;
use crate::models::UserStatus;

impl Database {
    /// Record a user's presence status, replacing any previous value.
    pub fn update_user_status(&self, user_id: UserId, status: &str) -> Result<UserStatus> {
        let last_seen = now();

        self.conn().execute(
            "INSERT INTO user_status (user_id, status, last_seen)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                status = excluded.status,
                last_seen = excluded.last_seen",
            params![user_id.to_hex(), status, ts_to_sql(&last_seen)],
        )?;

        Ok(UserStatus {
            user_id,
            status: status.to_string(),
            last_seen,
        })
    }

    pub fn get_user_status(&self, user_id: UserId) -> Result<Option<UserStatus>> {
        let status = self
            .conn()
            .query_row(
                "SELECT status, last_seen FROM user_status WHERE user_id = ?1",
                params![user_id.to_hex()],
                |row| {
                    Ok(UserStatus {
                        user_id,
                        status: row.get(0)?,
                        last_seen: ts_column(row, 1)?,
                    })
                },
            )
            .optional()?;
        Ok(status)
    }
}
