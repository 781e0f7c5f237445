//! Access-token broadcast.
//!
//! One owned publish/subscribe object carries the current access token to
//! every interested component. Lifecycle: constructed once at startup, kept
//! for the life of the process, never torn down. Subscribers hold a
//! [`TokenSubscription`] and call [`TokenSubscription::unsubscribe`] when they
//! are done.

use std::fmt;
use tokio::sync::watch;

/// Bearer token for the REST API. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Publisher side. Share it by reference or `Arc`.
#[derive(Debug)]
pub struct TokenBroadcast {
    tx: watch::Sender<Option<AccessToken>>,
}

impl Default for TokenBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBroadcast {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current token (`None` after sign-out) and wake subscribers.
    pub fn publish(&self, token: Option<AccessToken>) {
        let signed_in = token.is_some();
        self.tx.send_replace(token);
        tracing::debug!(signed_in, subscribers = self.tx.receiver_count(), "published access token");
    }

    pub fn current(&self) -> Option<AccessToken> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> TokenSubscription {
        TokenSubscription { rx: self.tx.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Subscriber side. Sees the latest token, and can wait for the next change.
#[derive(Debug)]
pub struct TokenSubscription {
    rx: watch::Receiver<Option<AccessToken>>,
}

impl TokenSubscription {
    pub fn current(&self) -> Option<AccessToken> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published token.
    ///
    /// Returns `None` only if the broadcast itself is gone.
    pub async fn changed(&mut self) -> Option<Option<AccessToken>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        drop(self.rx);
    }
}
