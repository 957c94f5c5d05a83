//! Handle to the task owning the user database
//!
//! Requests are serialized through an mpsc channel, each one carrying a
//! oneshot sender for its reply. The store does blocking file IO, so the
//! owning loop runs on the blocking pool.

use crate::error::{Error, Result};
use crate::store::{Flag, UserRecord, UserStore};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const REQUEST_QUEUE: usize = 32;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    Create { username: String, reply: Reply<String> },
    SetPassword { username: String, reply: Reply<String> },
    SetFlag { username: String, flag: Flag, value: bool, reply: Reply<UserRecord> },
    Get { username: String, reply: Reply<Option<UserRecord>> },
    List { reply: Reply<Vec<UserRecord>> },
    Verify { username: String, password: String, reply: Reply<bool> },
    EnsureSuperadmin { reply: Reply<Option<String>> },
}

impl Request {
    fn handle(self, store: &mut UserStore) {
        // a dropped receiver means the caller gave up waiting
        match self {
            Request::Create { username, reply } => {
                let _ = reply.send(store.create_user(&username));
            }
            Request::SetPassword { username, reply } => {
                let _ = reply.send(store.set_password(&username));
            }
            Request::SetFlag { username, flag, value, reply } => {
                let _ = reply.send(store.set_flag(&username, flag, value));
            }
            Request::Get { username, reply } => {
                let _ = reply.send(Ok(store.get(&username).cloned()));
            }
            Request::List { reply } => {
                let _ = reply.send(Ok(store.list()));
            }
            Request::Verify { username, password, reply } => {
                let _ = reply.send(Ok(store.verify(&username, &password)));
            }
            Request::EnsureSuperadmin { reply } => {
                let _ = reply.send(store.ensure_superadmin());
            }
        }
    }
}

/// Cloneable handle on the user directory
#[derive(Clone)]
pub struct UserDirectory {
    tx: mpsc::Sender<Request>,
}

impl UserDirectory {
    /// Opens the database at `path` and starts the owning task
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = tokio::task::spawn_blocking(move || UserStore::open(path))
            .await
            .map_err(|_| Error::Closed)??;
        Ok(Self::spawn(store))
    }

    /// Moves `store` into a task; it stops once every handle is dropped
    pub fn spawn(mut store: UserStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<Request>(REQUEST_QUEUE);
        tokio::task::spawn_blocking(move || {
            while let Some(request) = rx.blocking_recv() {
                request.handle(&mut store);
            }
            debug!(path = %store.path().display(), "user directory closed");
        });
        Self { tx }
    }

    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Creates a user and returns their generated password
    pub async fn create_user(&self, username: &str) -> Result<String> {
        let username = username.to_string();
        self.call(|reply| Request::Create { username, reply }).await
    }

    pub async fn set_password(&self, username: &str) -> Result<String> {
        let username = username.to_string();
        self.call(|reply| Request::SetPassword { username, reply }).await
    }

    pub async fn set_flag(&self, username: &str, flag: Flag, value: bool) -> Result<UserRecord> {
        let username = username.to_string();
        self.call(|reply| Request::SetFlag { username, flag, value, reply })
            .await
    }

    pub async fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        let username = username.to_string();
        self.call(|reply| Request::Get { username, reply }).await
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        self.call(|reply| Request::List { reply }).await
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let username = username.to_string();
        let password = password.to_string();
        self.call(|reply| Request::Verify { username, password, reply })
            .await
    }

    /// Returns the password of the superadmin when it had to be created
    pub async fn ensure_superadmin(&self) -> Result<Option<String>> {
        self.call(|reply| Request::EnsureSuperadmin { reply }).await
    }
}
