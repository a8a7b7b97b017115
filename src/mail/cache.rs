//! Expiry-aware bearer token cache.
//!
//! Wraps any [`TokenProvider`] and hands out the last token for the same
//! identity until `margin` before it expires. Concurrent misses may fetch
//! twice; the later token wins.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::RelayResult;
use crate::mail::token::{AccessToken, TokenProvider};

#[derive(Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: Instant,
}

/// A [`TokenProvider`] that reuses tokens until shortly before expiry.
pub struct CachedTokenProvider<P> {
    inner: P,
    tokens: DashMap<String, CachedToken>,
    margin: Duration,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P, margin: Duration) -> Self {
        Self {
            inner,
            tokens: DashMap::new(),
            margin,
        }
    }

    fn lookup(&self, key: &str, now: Instant) -> Option<AccessToken> {
        let entry = self.tokens.get(key)?;
        if now + self.margin < entry.expires_at {
            Some(entry.token.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachedTokenProvider<P> {
    async fn access_token(&self) -> RelayResult<AccessToken> {
        let key = self.inner.identity();
        if let Some(token) = self.lookup(&key, Instant::now()) {
            tracing::trace!(identity = %key, "Using cached access token");
            return Ok(token);
        }

        let token = self.inner.access_token().await?;
        let expires_at = Instant::now().checked_add(token.expires_in());
        match expires_at {
            Some(expires_at) if token.expires_in() > self.margin => {
                self.tokens.insert(
                    key,
                    CachedToken {
                        token: token.clone(),
                        expires_at,
                    },
                );
            }
            _ => {
                // Too short-lived, or a lifetime the clock cannot represent.
                self.tokens.remove(&key);
            }
        }
        Ok(token)
    }

    fn identity(&self) -> String {
        self.inner.identity()
    }

    /// Drop the cached token for this provider's identity.
    fn invalidate(&self) {
        self.tokens.remove(&self.inner.identity());
        self.inner.invalidate();
    }
}
