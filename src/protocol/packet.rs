//! Protocol message model.
//!
//! A [`Packet`] is a class tag, a correlation id and an ordered, flat map of
//! dotted string keys to string values. Packets are immutable once built;
//! handlers create a fresh one for every response through [`PacketBuilder`].

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Name of the field that selects the transaction inside a class.
pub const TXN_FIELD: &str = "TXN";

/// Four character message family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Class([u8; 4]);

impl Class {
    /// Session and system traffic (greeting, keep-alive).
    pub const FSYS: Class = Class(*b"fsys");
    /// Account traffic (login, terms, registration).
    pub const ACCT: Class = Class(*b"acct");

    /// Build a class from raw wire bytes.
    ///
    /// Returns `None` unless all four bytes are printable ASCII.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parse a class from a four character string.
    pub fn parse(tag: &str) -> Option<Self> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().ok()?;
        Self::from_bytes(bytes)
    }

    /// Raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Tag as text. Always ASCII by construction.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Class {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Ordered key/value map with unique keys.
///
/// Inserting an existing key replaces its value in place, so the first
/// position wins and the last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Integers and other `Display` values are
    /// stored as their text form.
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Equality that ignores entry order.
    pub fn same_entries(&self, other: &Fields) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Packet {
    class: Class,
    id: u32,
    fields: Fields,
}

impl Packet {
    /// Base id for messages this server originates.
    pub const SERVER_ID: u32 = 0x8000_0000;

    pub fn new(class: Class, id: u32, fields: Fields) -> Self {
        Self { class, id, fields }
    }

    /// Start building a packet.
    pub fn builder(class: Class, id: u32) -> PacketBuilder {
        PacketBuilder {
            class,
            id,
            fields: Fields::new(),
        }
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// Declared identifier. On a decoded response this already includes the
    /// ticket folded in by the sender.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Transaction name, if the packet carries one.
    pub fn txn(&self) -> Option<&str> {
        self.fields.get(TXN_FIELD)
    }
}

/// Builder used by handlers to assemble responses field by field.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    class: Class,
    id: u32,
    fields: Fields,
}

impl PacketBuilder {
    pub fn field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.insert(key, value);
        self
    }

    pub fn txn(self, name: impl fmt::Display) -> Self {
        self.field(TXN_FIELD, name)
    }

    pub fn build(self) -> Packet {
        Packet::new(self.class, self.id, self.fields)
    }
}
