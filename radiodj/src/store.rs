//! JSON file holding the user records
//!
//! Only the directory task touches a `UserStore`. Every mutation rewrites the
//! whole file through a temporary file renamed into place, so a crash never
//! leaves a truncated database behind.

use crate::error::{Error, Result};
use crate::password::{generate_password, generate_salt, hash_password};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Account that always exists and cannot be banned or demoted
pub const SUPERADMIN: &str = "superadmin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    fn new(username: &str, password: &str, admin: bool) -> Self {
        let salt = generate_salt();
        Self {
            username: username.to_string(),
            password_hash: hash_password(&salt, password),
            salt,
            banned: false,
            admin,
            created_at: Utc::now(),
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

/// Moderation flags of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Banned,
    Admin,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Banned => "banned",
            Flag::Admin => "admin",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "banned" => Ok(Flag::Banned),
            "admin" => Ok(Flag::Admin),
            other => Err(format!("unknown flag {:?}", other)),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
}

pub struct UserStore {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
}

impl UserStore {
    /// Opens the database, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file: UserFile = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UserFile::default(),
            Err(e) => return Err(e.into()),
        };

        let users = file
            .users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        Ok(Self { path, users })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `users` to disk, then makes it the current state
    ///
    /// On error the in-memory records are left as they were before the call.
    fn commit(&mut self, users: BTreeMap<String, UserRecord>) -> Result<()> {
        let file = UserFile {
            users: users.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(json.as_bytes())?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        self.users = users;
        Ok(())
    }

    /// Saves a modified copy of one record
    fn commit_record(&mut self, record: UserRecord) -> Result<()> {
        let mut users = self.users.clone();
        users.insert(record.username.clone(), record);
        self.commit(users)
    }

    fn record(&self, username: &str) -> Result<UserRecord> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| Error::UnknownUser(username.to_string()))
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn list(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    /// Creates a user and returns its generated password
    pub fn create_user(&mut self, username: &str) -> Result<String> {
        if self.users.contains_key(username) {
            return Err(Error::UserExists(username.to_string()));
        }
        let password = generate_password();
        self.commit_record(UserRecord::new(username, &password, false))?;
        info!(user = username, "user created");
        Ok(password)
    }

    /// Replaces the password of a user with a generated one
    pub fn set_password(&mut self, username: &str) -> Result<String> {
        let mut user = self.record(username)?;

        let password = generate_password();
        user.salt = generate_salt();
        user.password_hash = hash_password(&user.salt, &password);
        self.commit_record(user)?;
        info!(user = username, "password changed");
        Ok(password)
    }

    pub fn set_flag(&mut self, username: &str, flag: Flag, value: bool) -> Result<UserRecord> {
        // banning or demoting the superadmin would lock everybody out
        let protected = match flag {
            Flag::Banned => value,
            Flag::Admin => !value,
        };
        if username == SUPERADMIN && protected {
            return Err(Error::ProtectedUser {
                user: username.to_string(),
                flag: flag.as_str(),
            });
        }

        let mut user = self.record(username)?;
        match flag {
            Flag::Banned => user.banned = value,
            Flag::Admin => user.admin = value,
        }
        self.commit_record(user.clone())?;
        info!(user = username, flag = %flag, value, "user flag updated");
        Ok(user)
    }

    /// Whether `password` is valid for `username`; banned users never are
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|user| !user.banned && user.check_password(password))
    }

    /// Creates the superadmin if missing, returning its password only then
    pub fn ensure_superadmin(&mut self) -> Result<Option<String>> {
        if self.users.contains_key(SUPERADMIN) {
            return Ok(None);
        }
        let password = generate_password();
        self.commit_record(UserRecord::new(SUPERADMIN, &password, true))?;
        info!("superadmin account created");
        Ok(Some(password))
    }
}
