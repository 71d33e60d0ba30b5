//! Environment capabilities consulted while building wire headers.
//!
//! - [`CookieJar`]: where the XSRF cookie is read from
//! - [`OriginResolver`]: whether a URL is same-origin with the caller
//!
//! The defaults ([`NoCookies`], [`CrossOrigin`]) make the XSRF step a no-op.

use std::sync::{PoisonError, RwLock};

use courier_core::{is_absolute_url, read_cookie};
use url::{Origin, Url};

/// Read access to cookies.
pub trait CookieJar: Send + Sync + 'static {
    /// The decoded value of the cookie `name`, if present.
    fn read(&self, name: &str) -> Option<String>;
}

/// Same-origin detection for request URLs.
pub trait OriginResolver: Send + Sync + 'static {
    fn is_same_origin(&self, url: &str) -> bool;
}

/// A cookie jar that holds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCookies;

impl CookieJar for NoCookies {
    fn read(&self, _name: &str) -> Option<String> {
        None
    }
}

/// A cookie jar over a `name=value; other=value` cookie string.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<String>,
}

impl MemoryCookieJar {
    pub fn new(cookies: impl Into<String>) -> Self {
        Self {
            cookies: RwLock::new(cookies.into()),
        }
    }

    /// Replace the whole cookie string.
    pub fn set_cookies(&self, cookies: impl Into<String>) {
        *self.cookies.write().unwrap_or_else(PoisonError::into_inner) = cookies.into();
    }
}

impl CookieJar for MemoryCookieJar {
    fn read(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        read_cookie(&cookies, name)
    }
}

/// Treats every URL as cross-origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossOrigin;

impl OriginResolver for CrossOrigin {
    fn is_same_origin(&self, _url: &str) -> bool {
        false
    }
}

/// Compares URLs against a fixed origin.
///
/// Relative URLs are resolved against the origin and therefore always match.
#[derive(Clone, Debug)]
pub struct FixedOrigin {
    base: Url,
    origin: Origin,
}

impl FixedOrigin {
    /// Parse `origin` (e.g. `https://app.example.com`).
    pub fn new(origin: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(origin)?;
        let origin = base.origin();
        Ok(Self { base, origin })
    }
}

impl OriginResolver for FixedOrigin {
    fn is_same_origin(&self, url: &str) -> bool {
        if !is_absolute_url(url) {
            return true;
        }
        match self.base.join(url) {
            Ok(resolved) => resolved.origin() == self.origin,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cookie_jar() {
        let jar = MemoryCookieJar::new("XSRF-TOKEN=abc%3D; other=1");
        assert_eq!(jar.read("XSRF-TOKEN").as_deref(), Some("abc="));
        assert_eq!(jar.read("missing"), None);

        jar.set_cookies("XSRF-TOKEN=new");
        assert_eq!(jar.read("XSRF-TOKEN").as_deref(), Some("new"));
    }

    #[test]
    fn test_defaults_are_inert() {
        assert_eq!(NoCookies.read("XSRF-TOKEN"), None);
        assert!(!CrossOrigin.is_same_origin("/relative"));
    }

    #[test]
    fn test_fixed_origin() {
        let origin = FixedOrigin::new("https://app.example.com").unwrap();
        assert!(origin.is_same_origin("/api/users"));
        assert!(origin.is_same_origin("https://app.example.com/api"));
        assert!(origin.is_same_origin("https://app.example.com:443/api"));
        assert!(origin.is_same_origin("//app.example.com/api"));
        assert!(!origin.is_same_origin("http://app.example.com/api"));
        assert!(!origin.is_same_origin("https://api.example.com/"));
        assert!(!origin.is_same_origin("//other.example.com/api"));
    }

    #[test]
    fn test_fixed_origin_invalid() {
        assert!(FixedOrigin::new("not a url").is_err());
    }
}
