// Authentication cookie helpers

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Build an HttpOnly, SameSite=Strict cookie scoped to the whole site
pub fn auth_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Add both session cookies to the jar
pub fn set_session_cookies(
    jar: CookieJar,
    access_token: String,
    access_max_age: i64,
    refresh_token: String,
    refresh_max_age: i64,
    secure: bool,
) -> CookieJar {
    jar.add(auth_cookie(ACCESS_TOKEN_COOKIE, access_token, access_max_age, secure))
        .add(auth_cookie(REFRESH_TOKEN_COOKIE, refresh_token, refresh_max_age, secure))
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new(), 0, secure);
    cookie.make_removal();
    cookie
}

/// Expire both session cookies, whether or not the client sent them
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, secure))
}
