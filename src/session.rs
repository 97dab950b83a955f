use crate::models::{User, UserId};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

const STATE_TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub picture_url: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            picture_url: user.picture_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: Option<SessionUser>,
    pub state_token: Option<String>,
    pub access_token: Option<String>,
    pub flashes: Vec<String>,
    last_seen: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            user: None,
            state_token: None,
            access_token: None,
            flashes: Vec::new(),
            last_seen: Instant::now(),
        }
    }
}

/// Server-side session state keyed by the opaque token stored in the session cookie.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn open_session(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        self.purge_expired(&mut sessions);
        sessions.insert(token.clone(), SessionData::new());
        token
    }

    /// Returns a snapshot of the session and refreshes its idle timer.
    pub async fn get(&self, token: &str) -> Option<SessionData> {
        let mut sessions = self.sessions.lock().await;
        self.touch(&mut sessions, token).map(|session| session.clone())
    }

    pub async fn update<T>(&self, token: &str, apply: impl FnOnce(&mut SessionData) -> T) -> Option<T> {
        let mut sessions = self.sessions.lock().await;
        self.touch(&mut sessions, token).map(apply)
    }

    pub async fn issue_state_token(&self, token: &str) -> Option<String> {
        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_TOKEN_LEN)
            .map(char::from)
            .collect();
        self.update(token, |session| {
            session.state_token = Some(state.clone());
            state
        })
        .await
    }

    pub async fn push_flash(&self, token: &str, message: impl Into<String>) {
        let message = message.into();
        self.update(token, |session| session.flashes.push(message)).await;
    }

    pub async fn take_flashes(&self, token: &str) -> Vec<String> {
        self.update(token, |session| std::mem::take(&mut session.flashes))
            .await
            .unwrap_or_default()
    }

    /// Moves the session to a fresh token and invalidates the old one.
    pub async fn rotate(&self, token: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        self.touch(&mut sessions, token)?;
        let session = sessions.remove(token)?;
        let fresh = Uuid::new_v4().to_string();
        sessions.insert(fresh.clone(), session);
        Some(fresh)
    }

    pub async fn close_session(&self, token: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(token);
    }

    fn touch<'a>(&self, sessions: &'a mut HashMap<String, SessionData>, token: &str) -> Option<&'a mut SessionData> {
        let expired = sessions
            .get(token)
            .map(|session| session.last_seen.elapsed() > self.ttl)?;
        if expired {
            sessions.remove(token);
            return None;
        }
        let session = sessions.get_mut(token)?;
        session.last_seen = Instant::now();
        Some(session)
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, SessionData>) {
        let ttl = self.ttl;
        sessions.retain(|_, session| session.last_seen.elapsed() <= ttl);
    }
}
