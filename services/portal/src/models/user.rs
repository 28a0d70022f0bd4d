//! User accounts as stored in the UserAccounts sheet

use common::{Cell, Row};
use serde::Serialize;
use std::collections::HashMap;

use super::fault::column_text;

pub const USER_ACCOUNTS_SHEET: &str = "UserAccounts";

/// Account that can be neither deleted nor disabled
pub const DIRECTOR_USERNAME: &str = "director";

/// UserAccounts column titles
pub mod columns {
    pub const USERNAME: &str = "Username";
    pub const PASSWORD_HASH: &str = "PasswordHash";
    pub const EMAIL: &str = "Email";
    pub const ROLE: &str = "Role";
    pub const NAME: &str = "Name";
    pub const CREATED_DATE: &str = "CreatedDate";
    pub const LAST_LOGIN: &str = "LastLogin";
    pub const IS_ACTIVE: &str = "IsActive";
    pub const LOGIN_ATTEMPTS: &str = "LoginAttempts";

    pub const ALL: [&str; 9] = [
        USERNAME,
        PASSWORD_HASH,
        EMAIL,
        ROLE,
        NAME,
        CREATED_DATE,
        LAST_LOGIN,
        IS_ACTIVE,
        LOGIN_ATTEMPTS,
    ];
}

/// Portal role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Director,
    Team,
    Committee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "Director",
            Role::Team => "Team",
            Role::Committee => "Committee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Director" => Some(Role::Director),
            "Team" => Some(Role::Team),
            "Committee" => Some(Role::Committee),
            _ => None,
        }
    }
}

/// One UserAccounts row
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: String,
    pub name: String,
    pub created_date: String,
    pub last_login: String,
    pub is_active: bool,
    pub login_attempts: u32,
}

impl UserAccount {
    pub fn from_row(row: &[Cell], map: &HashMap<String, usize>) -> Self {
        use self::columns as c;
        let cell = |title: &str| map.get(title).and_then(|idx| row.get(*idx));

        Self {
            username: column_text(row, map, c::USERNAME),
            password_hash: column_text(row, map, c::PASSWORD_HASH),
            email: column_text(row, map, c::EMAIL),
            role: column_text(row, map, c::ROLE),
            name: column_text(row, map, c::NAME),
            created_date: column_text(row, map, c::CREATED_DATE),
            last_login: column_text(row, map, c::LAST_LOGIN),
            is_active: cell(c::IS_ACTIVE).and_then(Cell::as_bool).unwrap_or(false),
            login_attempts: cell(c::LOGIN_ATTEMPTS)
                .and_then(Cell::as_number)
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(0),
        }
    }

    pub fn to_row(&self, header: &[Cell]) -> Row {
        use self::columns as c;
        header
            .iter()
            .map(|title| match title.trimmed().as_str() {
                c::USERNAME => Cell::from(&self.username),
                c::PASSWORD_HASH => Cell::from(&self.password_hash),
                c::EMAIL => Cell::from(&self.email),
                c::ROLE => Cell::from(&self.role),
                c::NAME => Cell::from(&self.name),
                c::CREATED_DATE => Cell::from(&self.created_date),
                c::LAST_LOGIN => Cell::from(&self.last_login),
                c::IS_ACTIVE => Cell::Bool(self.is_active),
                c::LOGIN_ATTEMPTS => Cell::Number(f64::from(self.login_attempts)),
                _ => Cell::Empty,
            })
            .collect()
    }

    /// Public view of the account, without the password hash
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            name: self.name.clone(),
            last_login: None,
            is_active: None,
            created_date: None,
        }
    }
}

/// Account as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub role: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl UserProfile {
    pub fn with_last_login(mut self, last_login: &str) -> Self {
        self.last_login = Some(last_login.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Row {
        columns::ALL.iter().map(|t| Cell::from(*t)).collect()
    }

    #[test]
    fn reads_checkbox_and_counter_cells() {
        let header = header();
        let map: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, c)| (c.text(), i))
            .collect();
        let row: Row = vec![
            "team1".into(),
            "$argon2id$...".into(),
            "team1@lakeillawong.com.au".into(),
            "Team".into(),
            "Team Member 1".into(),
            "2025-01-01T00:00:00+11:00".into(),
            Cell::Empty,
            "TRUE".into(),
            Cell::Number(3.0),
        ];

        let user = UserAccount::from_row(&row, &map);
        assert!(user.is_active);
        assert_eq!(user.login_attempts, 3);
        assert_eq!(user.to_row(&header)[7], Cell::Bool(true));
    }

    #[test]
    fn profile_omits_optional_fields() {
        let user = UserAccount {
            username: "committee".into(),
            password_hash: "hash".into(),
            email: "committee@lakeillawong.com.au".into(),
            role: "Committee".into(),
            name: "Residents Committee".into(),
            created_date: String::new(),
            last_login: String::new(),
            is_active: true,
            login_attempts: 0,
        };
        let value = serde_json::to_value(user.profile()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("lastLogin").is_none());
        assert_eq!(value["role"], "Committee");
    }

    #[test]
    fn roles_parse_exactly() {
        assert_eq!(Role::parse("Director"), Some(Role::Director));
        assert_eq!(Role::parse("admin"), None);
    }
}
