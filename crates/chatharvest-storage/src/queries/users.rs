// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use chatharvest_core::HarvestError;
use chatharvest_core::types::{NewUser, SupportSyncReport, User, UserLink};
use rusqlite::{params, Row};

use crate::database::Database;

const USER_COLUMNS: &str =
    "id, line_name, href, support, friend_registered_at, tags, friend_value";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        line_name: row.get(1)?,
        href: row.get(2)?,
        support: row.get(3)?,
        friend_registered_at: row.get(4)?,
        tags: row.get(5)?,
        friend_value: row.get(6)?,
    })
}

/// Insert a new user and return its id.
pub async fn insert_user(db: &Database, user: &NewUser) -> Result<i64, HarvestError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (line_name, href, friend_registered_at, support)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.line_name,
                    user.href,
                    user.friend_registered_at,
                    user.support
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All users as (id, href) pairs, ascending by id.
pub async fn list_user_links(db: &Database) -> Result<Vec<UserLink>, HarvestError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, href FROM users ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(UserLink {
                    id: row.get(0)?,
                    href: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every user row, ascending by id.
pub async fn list_users(db: &Database) -> Result<Vec<User>, HarvestError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;
            let rows = stmt.query_map([], user_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: i64) -> Result<Option<User>, HarvestError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the profile-panel JSON of a user.
pub async fn update_friend_value(
    db: &Database,
    id: i64,
    friend_value: &str,
) -> Result<(), HarvestError> {
    let friend_value = friend_value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET friend_value = ?1 WHERE id = ?2",
                params![friend_value, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the comma-joined tag list of a user.
pub async fn update_tags(db: &Database, id: i64, tags: &str) -> Result<(), HarvestError> {
    let tags = tags.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET tags = ?1 WHERE id = ?2",
                params![tags, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set `support` for every user whose `line_name` matches, in one transaction.
///
/// Several users can share a display name; all of them are updated, and
/// `updated` counts rows rather than mapping entries.
pub async fn apply_support_assignments(
    db: &Database,
    assignments: &[(String, String)],
) -> Result<SupportSyncReport, HarvestError> {
    let assignments = assignments.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;
            {
                let mut stmt = tx.prepare("UPDATE users SET support = ?1 WHERE line_name = ?2")?;
                for (line_name, support) in &assignments {
                    updated += stmt.execute(params![support, line_name])?;
                }
            }
            let total: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            tx.commit()?;
            Ok(SupportSyncReport {
                updated,
                total: total as usize,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_users(db: &Database) -> Result<i64, HarvestError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every message and user row, and restart the id sequences.
pub async fn reset(db: &Database) -> Result<(), HarvestError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages", [])?;
            tx.execute("DELETE FROM users", [])?;
            tx.execute(
                "DELETE FROM sqlite_sequence WHERE name IN ('users', 'messages')",
                [],
            )?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn new_user(name: &str, href: &str) -> NewUser {
        NewUser {
            line_name: name.to_string(),
            href: href.to_string(),
            friend_registered_at: Some("2025-03-01 10:15".to_string()),
            support: None,
        }
    }

    #[tokio::test]
    async fn insert_and_get_user() {
        let (db, _dir) = setup_db().await;
        let id = insert_user(&db, &new_user("Hanako", "/basic/friendlist/my_page/7"))
            .await
            .unwrap();

        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.line_name, "Hanako");
        assert_eq!(user.href, "/basic/friendlist/my_page/7");
        assert_eq!(user.friend_registered_at.as_deref(), Some("2025-03-01 10:15"));
        assert!(user.tags.is_none());
        assert!(get_user(&db, id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_links_are_in_id_order() {
        let (db, _dir) = setup_db().await;
        for i in 0..3 {
            insert_user(&db, &new_user(&format!("u{i}"), &format!("/p/{i}")))
                .await
                .unwrap();
        }
        let links = list_user_links(&db).await.unwrap();
        let ids: Vec<i64> = links.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(links[2].href, "/p/2");
    }

    #[tokio::test]
    async fn profile_and_tag_updates() {
        let (db, _dir) = setup_db().await;
        let id = insert_user(&db, &new_user("Taro", "/p/1")).await.unwrap();
        update_friend_value(&db, id, r#"{"年齢":"30"}"#).await.unwrap();
        update_tags(&db, id, "VIP,資料請求").await.unwrap();

        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.friend_value.as_deref(), Some(r#"{"年齢":"30"}"#));
        assert_eq!(user.tags.as_deref(), Some("VIP,資料請求"));
    }

    #[tokio::test]
    async fn support_assignments_match_on_line_name() {
        let (db, _dir) = setup_db().await;
        insert_user(&db, &new_user("Aki", "/p/1")).await.unwrap();
        insert_user(&db, &new_user("Aki", "/p/2")).await.unwrap();
        insert_user(&db, &new_user("Ren", "/p/3")).await.unwrap();

        let report = apply_support_assignments(
            &db,
            &[
                ("Aki".to_string(), "Sato".to_string()),
                ("Nobody".to_string(), "Sato".to_string()),
            ],
        )
        .await
        .unwrap();
        assert_eq!(report, SupportSyncReport { updated: 2, total: 3 });

        let users = list_users(&db).await.unwrap();
        assert_eq!(users[0].support.as_deref(), Some("Sato"));
        assert_eq!(users[1].support.as_deref(), Some("Sato"));
        assert!(users[2].support.is_none());
    }

    #[tokio::test]
    async fn reset_empties_table_and_restarts_ids() {
        let (db, _dir) = setup_db().await;
        insert_user(&db, &new_user("a", "/p/1")).await.unwrap();
        insert_user(&db, &new_user("b", "/p/2")).await.unwrap();
        assert_eq!(count_users(&db).await.unwrap(), 2);

        reset(&db).await.unwrap();
        assert_eq!(count_users(&db).await.unwrap(), 0);
        let id = insert_user(&db, &new_user("c", "/p/3")).await.unwrap();
        assert_eq!(id, 1);
    }
}
