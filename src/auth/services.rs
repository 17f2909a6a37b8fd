use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};

use super::jwt::JwtKeys;
use crate::{
    email::templates,
    error::{AppError, AppResult},
    state::AppState,
    store::{MagicLinkToken, NewUser, Store, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Short, log-safe prefix of a secret token.
pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

#[derive(Debug)]
pub struct MagicLinkSent {
    pub simulated: bool,
}

/// Looks up (or registers) the account for `email`, stores a single-use signed token
/// and mails the sign-in link.
pub async fn send_magic_link(state: &AppState, email: &str) -> AppResult<MagicLinkSent> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let user = match state.store.get_user_by_email(&email).await? {
        Some(u) => u,
        None => {
            let u = state.store.create_user(NewUser::student(&email)).await?;
            info!(user_id = %u.id, "new student registered via magic link");
            u
        }
    };

    let keys = JwtKeys::new(&state.config.jwt);
    let token = keys.sign_magic_link(&user)?;
    let expires_at = OffsetDateTime::now_utc()
        + TimeDuration::minutes(state.config.jwt.magic_link_ttl_minutes);
    state
        .store
        .create_magic_link_token(user.id, &token, expires_at)
        .await?;

    let url = format!("{}/auth/magic-link?token={}", state.config.app_url, token);
    let message = templates::magic_link(&user.email, &url, state.config.jwt.magic_link_ttl_minutes);
    state.mailer.send(&message).await.map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("sending magic link email"))
    })?;

    info!(user_id = %user.id, "magic link sent");
    Ok(MagicLinkSent {
        simulated: state.mailer.is_simulated(),
    })
}

async fn invalidate(store: &dyn Store, link: &MagicLinkToken) -> AppResult<()> {
    store.mark_magic_link_used(link.id, OffsetDateTime::now_utc()).await?;
    Ok(())
}

/// Consumes a magic-link token and returns the (verified) user plus a fresh session token.
///
/// Every failure is reported as the same 401 so callers learn nothing about which check
/// tripped. Tokens that fail a signature, type, subject or expiry check are burned.
pub async fn verify_magic_link(state: &AppState, token: &str) -> AppResult<(User, String)> {
    let rejected = || AppError::unauthorized("Invalid or expired token");
    let store = state.store.as_ref();
    let keys = JwtKeys::new(&state.config.jwt);

    let Some(link) = store.get_magic_link_token(token).await? else {
        warn!(token = %token_prefix(token), "magic link not found");
        return Err(rejected());
    };

    let Some(claims) = keys.verify_magic_link(token) else {
        warn!(link_id = %link.id, "magic link failed verification");
        invalidate(store, &link).await?;
        return Err(rejected());
    };

    if claims.sub != link.user_id {
        warn!(link_id = %link.id, "magic link subject mismatch");
        invalidate(store, &link).await?;
        return Err(rejected());
    }

    if link.used_at.is_some() {
        warn!(link_id = %link.id, "magic link already used");
        return Err(rejected());
    }

    let now = OffsetDateTime::now_utc();
    if now > link.expires_at {
        warn!(link_id = %link.id, "magic link expired");
        invalidate(store, &link).await?;
        return Err(rejected());
    }

    // A concurrent verification may have consumed it since the read above.
    if !store.mark_magic_link_used(link.id, now).await? {
        warn!(link_id = %link.id, "magic link consumed concurrently");
        return Err(rejected());
    }

    let Some(mut user) = store.get_user_by_id(claims.sub).await? else {
        warn!(user_id = %claims.sub, "magic link user no longer exists");
        return Err(rejected());
    };
    if !user.email_verified {
        let Some(verified) = store.mark_email_verified(user.id).await? else {
            warn!(user_id = %claims.sub, "magic link user no longer exists");
            return Err(rejected());
        };
        user = verified;
        info!(user_id = %user.id, "email verified");
    }

    let session = keys.sign_session(&user)?;
    info!(user_id = %user.id, role = %user.role, "user signed in");
    Ok((user, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn token_from(url_text: &str) -> String {
        url_text
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string()
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@example.com"));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn new_email_becomes_unverified_student_and_gets_mail() {
        let h = TestHarness::new();
        let sent = send_magic_link(&h.state, "  New@Example.com ").await.unwrap();
        assert!(!sent.simulated);

        let user = h.store.get_user_by_email("new@example.com").await.unwrap().unwrap();
        assert_eq!(user.role, crate::store::Role::Student);
        assert!(!user.email_verified);
        assert_eq!(user.username, "new");

        let mails = h.mailer.sent().await;
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "new@example.com");
        assert!(mails[0].text.contains("http://app.test/auth/magic-link?token="));
    }

    #[tokio::test]
    async fn verify_marks_used_and_verifies_email_once() {
        let h = TestHarness::new();
        send_magic_link(&h.state, "s@example.com").await.unwrap();
        let token = token_from(&h.mailer.sent().await[0].text);

        let (user, session) = verify_magic_link(&h.state, &token).await.unwrap();
        assert!(user.email_verified);
        let keys = JwtKeys::new(&h.state.config.jwt);
        assert_eq!(keys.verify_session(&session).unwrap().sub, user.id);

        let link = h.store.get_magic_link_token(&token).await.unwrap().unwrap();
        assert!(link.used_at.is_some());

        let err = verify_magic_link(&h.state, &token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn verification_keeps_slots_granted_after_link_was_sent() {
        let h = TestHarness::new();
        let teacher = h
            .store
            .create_user(NewUser {
                role: crate::store::Role::Teacher,
                ..NewUser::student("t@example.com")
            })
            .await
            .unwrap();
        send_magic_link(&h.state, "t@example.com").await.unwrap();
        let token = token_from(&h.mailer.sent().await[0].text);

        h.store.add_student_slots_to_teacher(teacher.id, 10).await.unwrap();
        let (user, _) = verify_magic_link(&h.state, &token).await.unwrap();
        assert!(user.email_verified);
        assert_eq!(user.student_slots_available, 10);

        let stored = h.store.get_user_by_id(teacher.id).await.unwrap().unwrap();
        assert_eq!(stored.student_slots_available, 10);
        assert!(stored.email_verified);
    }

    #[tokio::test]
    async fn unknown_or_foreign_tokens_fail() {
        let h = TestHarness::new();
        assert!(verify_magic_link(&h.state, "garbage").await.is_err());

        // A session token stored as a magic link still fails the type check and gets burned.
        let user = h.store.create_user(NewUser::student("x@example.com")).await.unwrap();
        let keys = JwtKeys::new(&h.state.config.jwt);
        let session = keys.sign_session(&user).unwrap();
        let exp = OffsetDateTime::now_utc() + TimeDuration::minutes(5);
        h.store.create_magic_link_token(user.id, &session, exp).await.unwrap();

        assert!(verify_magic_link(&h.state, &session).await.is_err());
        let link = h.store.get_magic_link_token(&session).await.unwrap().unwrap();
        assert!(link.used_at.is_some());
    }

    #[tokio::test]
    async fn expired_row_is_rejected_and_burned() {
        let h = TestHarness::new();
        let user = h.store.create_user(NewUser::student("x@example.com")).await.unwrap();
        let keys = JwtKeys::new(&h.state.config.jwt);
        let token = keys.sign_magic_link(&user).unwrap();
        let past = OffsetDateTime::now_utc() - TimeDuration::minutes(1);
        h.store.create_magic_link_token(user.id, &token, past).await.unwrap();

        assert!(verify_magic_link(&h.state, &token).await.is_err());
        let link = h.store.get_magic_link_token(&token).await.unwrap().unwrap();
        assert!(link.used_at.is_some());
        let user = h.store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(!user.email_verified);
    }

    #[tokio::test]
    async fn mail_failure_surfaces_as_server_error() {
        let h = TestHarness::new();
        h.mailer.fail_next(true).await;
        let err = send_magic_link(&h.state, "s@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
