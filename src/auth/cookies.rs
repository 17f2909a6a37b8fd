use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub const SESSION_COOKIE: &str = "jwt_token";

fn base(value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

pub fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    base(token, secure, max_age)
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    base(String::new(), secure, Duration::ZERO)
}
