use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{now_timestamp, parse_timestamp};
use crate::models::{CreateUserRequest, Role, User};

pub fn create_user(conn: &Connection, req: &CreateUserRequest) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, phone, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![req.name, req.email, req.phone, req.role.as_str(), now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let result = conn
        .query_row(
            "SELECT id, name, email, phone, role, created_at FROM users WHERE id = ?1",
            params![id],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let result = conn
        .query_row(
            "SELECT id, name, email, phone, role, created_at FROM users WHERE email = ?1",
            params![email],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;

    result.transpose()
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(4)?;
    let role = Role::parse(&role_str).ok_or_else(|| anyhow::anyhow!("invalid role: {role_str}"))?;
    let created_at: String = row.get(5)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role,
        created_at: parse_timestamp(&created_at)?,
    })
}
