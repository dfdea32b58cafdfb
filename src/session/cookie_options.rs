use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};

/// Thirty days, the default session lifetime.
pub const DEFAULT_MAX_AGE: i64 = 30 * 24 * 60 * 60;

/// Configuration options for session cookies.
///
/// The store keeps one set of defaults and every session gets its own copy, so changing
/// the options of one session never affects another.
///
/// A `max_age` of zero or less marks the session for deletion on the next save.
///
/// # Example
///
/// ```rust
/// use dossier::CookieOptions;
///
/// let cookie_options = CookieOptions::build()
///         .http_only(true)
///         .same_site(cookie::SameSite::Lax)
///         .secure(true)
///         .max_age(60 * 60)
///         .path("/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: DEFAULT_MAX_AGE,
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieOptions {
    /// Creates a new `CookieOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the session lifetime in seconds.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Whether saving a session with these options deletes it.
    pub fn is_deletion(&self) -> bool {
        self.max_age <= 0
    }

    /// Builds the cookie that carries `value` under `name`.
    pub(crate) fn to_cookie(&self, name: &str, value: String) -> Cookie<'static> {
        let cookie_builder = Cookie::build((name.to_owned(), value))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site)
            .max_age(Duration::seconds(self.max_age.max(0)));

        let cookie_builder = if let Some(domain) = &self.domain {
            cookie_builder.domain(domain.clone())
        } else {
            cookie_builder
        };

        cookie_builder.build()
    }

    /// Builds a cookie that makes the client drop `name`: empty value, zero max-age
    /// and an expiry in the past, with the same path and domain it was set under.
    pub(crate) fn to_removal_cookie(&self, name: &str) -> Cookie<'static> {
        let mut cookie = self.to_cookie(name, String::new());
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }
}
