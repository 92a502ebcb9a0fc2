use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::UserId;
use tokio::sync::{Mutex, RwLock};

use crate::models::DialogSession;

/// Диалоговые сессии живут в памяти процесса: сессия нужна только на время
/// одного многошагового диалога и переживать рестарт бота ей не требуется.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<UserId, Arc<Mutex<DialogSession>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Слот сессии пользователя. Mutex слота держится на всю обработку
    /// события, поэтому события одного пользователя обрабатываются строго
    /// по одному; разные пользователи друг другу не мешают.
    pub async fn entry(&self, user: UserId) -> Arc<Mutex<DialogSession>> {
        {
            let map = self.inner.read().await;
            if let Some(slot) = map.get(&user) {
                return slot.clone();
            }
        }

        let mut map = self.inner.write().await;
        map.entry(user).or_default().clone()
    }
}
