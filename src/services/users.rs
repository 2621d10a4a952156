use rusqlite::Connection;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{CreateUserRequest, User};

pub fn create_user(conn: &Connection, req: &CreateUserRequest) -> AppResult<User> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("name is required"));
    }
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::validation("email is invalid"));
    }
    if queries::users::get_user_by_email(conn, &email)?.is_some() {
        return Err(AppError::conflict(format!("email {email} is already registered")));
    }

    let req = CreateUserRequest {
        email,
        ..req.clone()
    };
    let id = queries::users::create_user(conn, &req)?;
    tracing::info!(user_id = id, role = req.role.as_str(), "user created");
    get_user(conn, id)
}

pub fn get_user(conn: &Connection, id: i64) -> AppResult<User> {
    required(queries::users::get_user(conn, id)?, || format!("user {id}"))
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> AppResult<User> {
    let email = email.trim().to_lowercase();
    required(queries::users::get_user_by_email(conn, &email)?, || {
        format!("user with email {email}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Vo F".to_string(),
            email: email.to_string(),
            phone: Some("0944444444".to_string()),
            role: Role::Host,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let conn = db::init_db(":memory:").unwrap();
        let user = create_user(&conn, &request("Host@Example.com")).unwrap();
        assert_eq!(user.email, "host@example.com");
        assert_eq!(user.role, Role::Host);

        assert_eq!(get_user(&conn, user.id).unwrap().id, user.id);
        assert_eq!(get_user_by_email(&conn, "HOST@example.com").unwrap().id, user.id);
        assert!(matches!(get_user(&conn, user.id + 1), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_and_invalid_email() {
        let conn = db::init_db(":memory:").unwrap();
        create_user(&conn, &request("a@example.com")).unwrap();
        assert!(matches!(
            create_user(&conn, &request("a@example.com")),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            create_user(&conn, &request("not-an-email")),
            Err(AppError::Validation(_))
        ));
    }
}
