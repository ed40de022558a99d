use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpMessage, HttpRequest};
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "visitor_id";

// One year, the cookie is meant to outlive browser sessions:
const COOKIE_MAX_AGE_DAYS: i64 = 365;

pub fn visitor_id(req: &HttpRequest) -> Option<String> {
  req.cookie(VISITOR_COOKIE)
    .map(|cookie| cookie.value().to_string())
}

pub fn new_visitor_id() -> String {
  Uuid::new_v4().to_string()
}

// HttpOnly + Lax on the root path, so the identity rides
// along on every API call but stays out of reach of page
// scripts.
pub fn visitor_cookie(visitor_id: &str) -> Cookie<'static> {
  Cookie::build(VISITOR_COOKIE, visitor_id.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS))
    .finish()
}
