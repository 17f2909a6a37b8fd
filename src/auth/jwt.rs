use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, state::AppState, store::User};

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signing keys for both token kinds. Session and magic-link tokens use distinct secrets.
#[derive(Clone)]
pub struct JwtKeys {
    session: KeyPair,
    magic_link: KeyPair,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub magic_link_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            session: KeyPair::from_secret(&cfg.secret),
            magic_link: KeyPair::from_secret(&cfg.magic_link_secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: Duration::from_secs((cfg.session_ttl_minutes.max(0) as u64) * 60),
            magic_link_ttl: Duration::from_secs((cfg.magic_link_ttl_minutes.max(0) as u64) * 60),
        }
    }

    fn keys_for(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Session => &self.session,
            TokenKind::MagicLink => &self.magic_link,
        }
    }

    fn sign(&self, user: &User, kind: TokenKind, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            role: user.role,
            username: user.username.clone(),
            email: user.email.clone(),
            kind: Some(kind),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.keys_for(kind).encoding)?;
        debug!(user_id = %user.id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_session(&self, user: &User) -> anyhow::Result<String> {
        self.sign(user, TokenKind::Session, self.session_ttl)
    }

    pub fn sign_magic_link(&self, user: &User) -> anyhow::Result<String> {
        self.sign(user, TokenKind::MagicLink, self.magic_link_ttl)
    }

    /// Fails closed: any signature, shape, issuer, audience or expiry problem yields `None`.
    fn verify(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        match decode::<Claims>(token, &self.keys_for(kind).decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
                Some(data.claims)
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }

    pub fn verify_session(&self, token: &str) -> Option<Claims> {
        self.verify(token, TokenKind::Session)
            .filter(|c| c.kind != Some(TokenKind::MagicLink))
    }

    pub fn verify_magic_link(&self, token: &str) -> Option<Claims> {
        self.verify(token, TokenKind::MagicLink)
            .filter(|c| c.kind == Some(TokenKind::MagicLink))
    }
}
