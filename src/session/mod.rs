//! The in-memory session handed to request handlers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Error;
use crate::codec::{deserialize_value, serialize_value};

mod cookie_options;
mod id;

pub use cookie_options::{CookieOptions, DEFAULT_MAX_AGE};
pub use id::{ID_BYTES, ID_LEN, Id};
#[cfg(test)]
pub(crate) use id::test_rng;

/// The values held by a session.
///
/// Each value is kept in its encoded form and decoded on demand into whatever type
/// the caller asks for, so a session can hold values of unrelated types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionValues(HashMap<String, Vec<u8>>);

impl SessionValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the value stored under `key`.
    ///
    /// Fails with [`Error::Decode`] if the stored bytes cannot be read as a `T`. The
    /// default bincode encoding carries no type information, so a value whose bytes
    /// happen to be a valid `T` (a stored `1u8` read as `bool`) decodes without error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.0
            .get(key)
            .map(|bytes| deserialize_value(bytes))
            .transpose()
    }

    /// Encodes and stores `value` under `key`, replacing any previous value.
    ///
    /// On failure the map is left as it was.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), Error> {
        let bytes = serialize_value(value)?;
        self.0.insert(key.into(), bytes);
        Ok(())
    }

    /// Returns `true` if `key` was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Serializes the whole map into a storage payload.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        serialize_value(self)
    }

    /// Builds a map from a storage payload.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        deserialize_value(payload)
    }
}

/// A session as seen by a single request.
///
/// Obtained from [`SessionStore::new_session`](crate::SessionStore::new_session) or
/// [`SessionStore::get`](crate::SessionStore::get), mutated by the handler and
/// persisted with [`SessionStore::save`](crate::SessionStore::save). Nothing is written
/// to the store until then.
#[derive(Clone, Debug)]
pub struct Session {
    name: String,
    id: Option<Id>,
    values: SessionValues,
    options: CookieOptions,
    is_new: bool,
    // set when values or options change, cleared on save
    modified: bool,
}

impl Session {
    /// Creates an unbound session: no id, no values, `is_new` set.
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            id: None,
            values: SessionValues::new(),
            options,
            is_new: true,
            modified: false,
        }
    }

    /// The cookie name this session lives under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session id, `None` until the session is first saved.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// `true` unless the session was resumed from an existing record.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether the session changed since it was created, loaded or last saved.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Mutable access to this session's cookie options.
    ///
    /// Setting `max_age` to zero or less deletes the session on the next save.
    pub fn options_mut(&mut self) -> &mut CookieOptions {
        self.modified = true;
        &mut self.options
    }

    pub fn values(&self) -> &SessionValues {
        &self.values
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.values.get(key)
    }

    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), Error> {
        self.values.insert(key, value)?;
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key);
        self.modified |= removed;
        removed
    }

    /// Removes every value, keeping the id.
    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.modified = true;
        }
    }

    pub(crate) fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    pub(crate) fn set_values(&mut self, values: SessionValues) {
        self.values = values;
    }

    pub(crate) fn mark_resumed(&mut self) {
        self.is_new = false;
        self.modified = false;
    }

    pub(crate) fn mark_saved(&mut self) {
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip_through_payload() {
        let mut values = SessionValues::new();
        values.insert("user", &"ada").unwrap();
        values.insert("visits", &3u32).unwrap();
        values.insert("roles", &vec!["admin", "ops"]).unwrap();

        let decoded = SessionValues::decode(&values.encode().unwrap()).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(decoded.get::<String>("user").unwrap().as_deref(), Some("ada"));
        assert_eq!(decoded.get::<u32>("visits").unwrap(), Some(3));
        assert_eq!(
            decoded.get::<Vec<String>>("roles").unwrap(),
            Some(vec!["admin".to_string(), "ops".to_string()])
        );
        assert_eq!(decoded.get::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn test_unreadable_value_is_a_decode_error() {
        let mut values = SessionValues::new();
        values.insert("name", "ada").unwrap();
        values.insert("flag", &7u8).unwrap();

        assert!(matches!(values.get::<u32>("name"), Err(Error::Decode(_))));
        assert!(matches!(values.get::<bool>("flag"), Err(Error::Decode(_))));
        assert_eq!(values.get::<u8>("flag").unwrap(), Some(7));
    }

    #[test]
    fn test_malformed_payload_is_a_decode_error() {
        let result = SessionValues::decode(&[0xff, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_session_tracks_modification() {
        let mut session = Session::new("sess", CookieOptions::default());
        assert!(session.is_new());
        assert!(session.id().is_none());
        assert!(!session.is_modified());

        session.insert("key", &"value").unwrap();
        assert!(session.is_modified());

        session.mark_saved();
        assert!(!session.remove("absent"));
        assert!(!session.is_modified());

        session.options_mut().max_age = -1;
        assert!(session.is_modified());
    }

    #[test]
    fn test_options_are_copied_per_session() {
        let defaults = CookieOptions::default();
        let mut first = Session::new("sess", defaults.clone());
        let second = Session::new("sess", defaults.clone());

        first.options_mut().max_age = -1;
        assert_eq!(second.options().max_age, DEFAULT_MAX_AGE);
        assert_eq!(defaults.max_age, DEFAULT_MAX_AGE);
    }
}
