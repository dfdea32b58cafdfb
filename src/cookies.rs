use cookie::Cookie;
use tower_cookies::Cookies;

use crate::CookieOptions;

/// Read and write access to the cookies of the current request/response pair.
///
/// Implemented for [`tower_cookies::Cookies`]; anything else that can look up a
/// request cookie and queue a `Set-Cookie` can implement it too.
pub trait CookieAccess {
    /// Value of the request cookie `name`, if present.
    fn get(&self, name: &str) -> Option<String>;

    /// Queues `cookie` on the response.
    fn add(&self, cookie: Cookie<'static>);

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        self.add(options.to_cookie(name, value.to_owned()));
    }

    /// Tells the client to drop `name`.
    fn clear(&self, name: &str, options: &CookieOptions) {
        self.add(options.to_removal_cookie(name));
    }
}

impl CookieAccess for Cookies {
    fn get(&self, name: &str) -> Option<String> {
        Cookies::get(self, name).map(|cookie| cookie.value().to_owned())
    }

    fn add(&self, cookie: Cookie<'static>) {
        Cookies::add(self, cookie);
    }
}
