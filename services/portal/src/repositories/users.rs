//! User account repository backed by the UserAccounts sheet

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::{Table, Workbook};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SeedAccount;
use crate::error::PortalResult;
use crate::models::user::{USER_ACCOUNTS_SHEET, UserAccount, columns};
use crate::services::clock::Clock;

/// Result of a login attempt
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(UserAccount),
    Locked,
    Rejected,
}

/// Hash a password with Argon2 and a fresh salt
pub fn hash_password(password: &str) -> PortalResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored hash; unparsable hashes never match
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

/// User account repository
#[derive(Clone)]
pub struct UserRepository {
    workbook: Workbook,
    seeds: Arc<Vec<SeedAccount>>,
    clock: Clock,
}

impl UserRepository {
    pub fn new(workbook: Workbook, seeds: Vec<SeedAccount>, clock: Clock) -> Self {
        Self {
            workbook,
            seeds: Arc::new(seeds),
            clock,
        }
    }

    /// The UserAccounts sheet, created with the seed accounts on first use
    pub async fn sheet(&self) -> PortalResult<Table> {
        if let Some(table) = self.workbook.sheet(USER_ACCOUNTS_SHEET).await? {
            return Ok(table);
        }

        let mut table = self
            .workbook
            .sheet_or_create(USER_ACCOUNTS_SHEET, &columns::ALL)
            .await?;
        let created = self.clock.iso_now();
        for seed in self.seeds.iter() {
            let account = UserAccount {
                username: seed.username.clone(),
                password_hash: hash_password(&seed.password)?,
                email: seed.email.clone(),
                role: seed.role.clone(),
                name: seed.name.clone(),
                created_date: created.clone(),
                last_login: String::new(),
                is_active: true,
                login_attempts: 0,
            };
            let row = account.to_row(table.header());
            table.push_row(row);
        }
        self.workbook.save(&table).await?;

        info!("Created {} with {} seed accounts", USER_ACCOUNTS_SHEET, self.seeds.len());
        Ok(table)
    }

    fn accounts(table: &Table) -> impl Iterator<Item = (usize, UserAccount)> + '_ {
        let map = table.column_map();
        table
            .rows()
            .iter()
            .enumerate()
            .skip(1)
            .map(move |(idx, row)| (idx, UserAccount::from_row(row, &map)))
    }

    pub async fn list(&self) -> PortalResult<Vec<UserAccount>> {
        let table = self.sheet().await?;
        Ok(Self::accounts(&table).map(|(_, user)| user).collect())
    }

    pub async fn find(&self, username: &str) -> PortalResult<Option<UserAccount>> {
        let table = self.sheet().await?;
        Ok(Self::accounts(&table)
            .map(|(_, user)| user)
            .find(|user| user.username == username))
    }

    /// Add a new account row
    pub async fn insert(&self, account: &UserAccount) -> PortalResult<()> {
        let mut table = self.sheet().await?;
        let row = account.to_row(table.header());
        table.push_row(row);
        self.workbook.save(&table).await?;
        info!("Created user account: {}", account.username);
        Ok(())
    }

    /// Rewrite the row of `account.username`.
    ///
    /// Returns false when no such account exists.
    pub async fn update(&self, account: &UserAccount) -> PortalResult<bool> {
        let mut table = self.sheet().await?;
        let Some(idx) = Self::accounts(&table)
            .find(|(_, user)| user.username == account.username)
            .map(|(idx, _)| idx)
        else {
            return Ok(false);
        };

        let row = account.to_row(table.header());
        table.rows_mut()[idx] = row;
        self.workbook.save(&table).await?;
        Ok(true)
    }

    pub async fn delete(&self, username: &str) -> PortalResult<bool> {
        let mut table = self.sheet().await?;
        let Some(idx) = Self::accounts(&table)
            .find(|(_, user)| user.username == username)
            .map(|(idx, _)| idx)
        else {
            return Ok(false);
        };

        table.remove_row(idx);
        self.workbook.save(&table).await?;
        info!("Deleted user account: {}", username);
        Ok(true)
    }

    /// Check credentials against active accounts.
    ///
    /// A wrong password counts towards the lockout; a successful login
    /// resets the counter and stamps LastLogin.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        max_attempts: u32,
    ) -> PortalResult<LoginOutcome> {
        let mut table = self.sheet().await?;
        let Some((idx, mut account)) =
            Self::accounts(&table).find(|(_, user)| user.username == username && user.is_active)
        else {
            return Ok(LoginOutcome::Rejected);
        };

        if account.login_attempts >= max_attempts {
            warn!("Login refused for locked account {}", username);
            return Ok(LoginOutcome::Locked);
        }

        let outcome = if verify_password(&account.password_hash, password) {
            account.login_attempts = 0;
            account.last_login = self.clock.iso_now();
            info!("User {} authenticated", username);
            LoginOutcome::Authenticated(account.clone())
        } else {
            account.login_attempts += 1;
            warn!("Failed login for {} (attempt {})", username, account.login_attempts);
            LoginOutcome::Rejected
        };

        let row = account.to_row(table.header());
        table.rows_mut()[idx] = row;
        self.workbook.save(&table).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Cell;
    use common::workbook::memory::MemoryStore;

    fn header_cells() -> Vec<Cell> {
        columns::ALL.iter().map(|t| Cell::from(*t)).collect()
    }

    fn repository() -> UserRepository {
        let workbook = Workbook::new(Arc::new(MemoryStore::new()));
        let seeds = vec![SeedAccount {
            username: "director".into(),
            password: "maint2025".into(),
            email: "director@lakeillawong.com.au".into(),
            role: "Director".into(),
            name: "Director Account".into(),
        }];
        UserRepository::new(workbook, seeds, Clock::new(chrono_tz::Australia::Sydney))
    }

    #[test]
    fn hashes_verify_only_their_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password(&hash, "secret1"));
        assert!(!verify_password(&hash, "secret2"));
        assert!(!verify_password("not-a-hash", "secret1"));
    }

    #[tokio::test]
    async fn seeds_accounts_on_first_use() {
        let repo = repository();
        let table = repo.sheet().await.unwrap();
        assert_eq!(table.header(), header_cells().as_slice());

        let director = repo.find("director").await.unwrap().unwrap();
        assert!(director.is_active);
        assert!(verify_password(&director.password_hash, "maint2025"));
    }

    #[tokio::test]
    async fn login_stamps_last_login_from_the_clock() {
        let repo = repository();
        let clock = Clock::new(chrono_tz::Australia::Sydney);

        let outcome = repo.authenticate("director", "maint2025", 5).await.unwrap();
        let LoginOutcome::Authenticated(account) = outcome else {
            panic!("director should authenticate");
        };
        let stamped = clock.parse(&account.last_login).unwrap();
        assert!((clock.now() - stamped).num_seconds().abs() < 60);

        let director = repo.find("director").await.unwrap().unwrap();
        assert_eq!(director.last_login, account.last_login);
        assert!(clock.parse(&director.created_date).is_some());
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let repo = repository();
        for _ in 0..3 {
            let outcome = repo.authenticate("director", "wrong", 3).await.unwrap();
            assert!(matches!(outcome, LoginOutcome::Rejected));
        }

        let outcome = repo.authenticate("director", "maint2025", 3).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Locked));
    }
}
