use crate::*;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, TimeDelta, Utc};

use std::collections::{BTreeSet, HashMap, VecDeque};

pub const SESSION_COOKIE: &str = "recipe_session";
pub const RECENT_SEARCHES: usize = 5;

/// Favorite recipe ids. Iterates in ascending id order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FavoriteSet(BTreeSet<u64>);

impl FavoriteSet {
    /// Returns false if `id` was already a favorite.
    pub fn add(&mut self, id: u64) -> bool {
        self.0.insert(id)
    }

    /// Returns false if `id` was not a favorite.
    pub fn remove(&mut self, id: u64) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.0.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShoppingList(Vec<String>);

impl ShoppingList {
    /// Appends `item`; blank items are ignored.
    pub fn add(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() {
            return false;
        }
        self.0.push(item.to_string());
        true
    }

    /// Removes the item at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }
}

/// Most recent first, without duplicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecentSearches(VecDeque<String>);

impl RecentSearches {
    pub fn record(&mut self, ingredients: &str) {
        self.0.retain(|q| q != ingredients);
        self.0.push_front(ingredients.to_string());
        self.0.truncate(RECENT_SEARCHES);
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub favorites: FavoriteSet,
    pub shopping: ShoppingList,
    pub recent: RecentSearches,
    pub last_seen: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            favorites: FavoriteSet::default(),
            shopping: ShoppingList::default(),
            recent: RecentSearches::default(),
            last_seen: Utc::now(),
        }
    }
}

/// A change applied to one session while the store holds it exclusively.
pub type SessionChange = Box<dyn FnOnce(&mut Session) + Send>;

pub fn edit(f: impl FnOnce(&mut Session) + Send + 'static) -> SessionChange {
    Box::new(f)
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The live session for `id`, if any.
    async fn get(&self, id: &str) -> Option<Session>;
    /// Applies `change` to the session for `id` and returns the result. A missing
    /// or expired session starts fresh. Changes to one session never interleave.
    async fn update(&self, id: &str, change: SessionChange) -> Session;
    async fn remove(&self, id: &str);
}

/// Sessions kept in process memory; idle ones expire after `ttl`.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: TimeDelta,
}

impl MemorySessionStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_seen > self.ttl
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| !self.expired(s, Utc::now()))
            .cloned()
    }

    async fn update(&self, id: &str, change: SessionChange) -> Session {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(id) {
            let before = sessions.len();
            sessions.retain(|_, s| !self.expired(s, now));
            if sessions.len() < before {
                log::debug!("pruned {} idle sessions", before - sessions.len());
            }
        }
        let session = sessions.entry(id.to_string()).or_default();
        if self.expired(session, now) {
            *session = Session::default();
        }
        change(session);
        session.last_seen = now;
        session.clone()
    }

    async fn remove(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            log::debug!("dropped expired session");
        }
    }
}

/// Session id from the cookie jar, minting a new id and cookie when absent.
pub fn session_id(jar: CookieJar) -> (CookieJar, String) {
    if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        return (jar, id);
    }
    let id = uuid::Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), id)
}

/// Loads the caller's session, or a fresh one. Whatever the store still holds
/// under a cookie with no live session is dropped.
pub async fn checkout(store: &dyn SessionStore, jar: CookieJar) -> (CookieJar, String, Session) {
    let (jar, id) = session_id(jar);
    let session = match store.get(&id).await {
        Some(session) => session,
        None => {
            store.remove(&id).await;
            Session::default()
        }
    };
    (jar, id, session)
}
