use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

pub const CART_OWNER_COOKIE: &str = "cart_owner";

/// Anonymous cart identity. The cookie is minted on first touch; no
/// account or login is involved anywhere in the flow.
pub fn ensure_owner(jar: CookieJar) -> (CookieJar, Uuid) {
    if let Some(owner_id) = existing_owner(&jar) {
        return (jar, owner_id);
    }

    let owner_id = Uuid::new_v4();
    let cookie = Cookie::build((CART_OWNER_COOKIE, owner_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), owner_id)
}

pub fn existing_owner(jar: &CookieJar) -> Option<Uuid> {
    jar.get(CART_OWNER_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_an_owner_on_first_touch() {
        let (jar, owner_id) = ensure_owner(CookieJar::new());

        assert_eq!(existing_owner(&jar), Some(owner_id));
    }

    #[test]
    fn keeps_an_existing_owner() {
        let owner_id = Uuid::new_v4();
        let jar = CookieJar::new().add(Cookie::new(CART_OWNER_COOKIE, owner_id.to_string()));

        let (_, resolved) = ensure_owner(jar);

        assert_eq!(resolved, owner_id);
    }

    #[test]
    fn replaces_a_malformed_cookie() {
        let jar = CookieJar::new().add(Cookie::new(CART_OWNER_COOKIE, "not-a-uuid"));

        let (jar, owner_id) = ensure_owner(jar);

        assert_eq!(existing_owner(&jar), Some(owner_id));
    }
}
