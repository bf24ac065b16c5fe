//! Wallet records and the deduplicated collection they are merged into.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A wallet record: any JSON object carrying an `address` field.
///
/// Every other field is kept as-is, in its original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Wallet {
    fields: Map<String, Value>,
}

impl Wallet {
    /// Wraps a JSON value, or returns `None` if it is not an object with an `address`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) if fields.contains_key("address") => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn address(&self) -> &Value {
        &self.fields["address"]
    }

    /// Address as a string, if it is one.
    pub fn address_str(&self) -> Option<&str> {
        self.address().as_str()
    }

    /// Deduplication key, see [`address_key`].
    pub fn key(&self) -> String {
        address_key(self.address())
    }

    pub fn created_at(&self) -> Option<&str> {
        self.fields.get("created_at").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Key an address is deduplicated on: its JSON text.
///
/// `"1"` and `1` stay distinct, while integral floats fold into integers so
/// `1` and `1.0` collide. Object-valued addresses compare by their text, so
/// the same keys in a different order count as different addresses.
pub fn address_key(address: &Value) -> String {
    if let Value::Number(n) = address {
        if let Some(f) = n.as_f64().filter(|f| n.is_f64() && f.fract() == 0.0) {
            if f.abs() < 9.0e15 {
                return format!("{}", f as i64);
            }
        }
    }
    address.to_string()
}

/// Ordered wallets with no two sharing an address.
#[derive(Debug, Clone, Default)]
pub struct WalletCollection {
    wallets: Vec<Wallet>,
    seen: HashSet<String>,
}

impl WalletCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the wallet unless its address is already present.
    ///
    /// Returns `false` for a duplicate; the existing record is left untouched.
    pub fn insert(&mut self, wallet: Wallet) -> bool {
        if !self.seen.insert(wallet.key()) {
            return false;
        }
        self.wallets.push(wallet);
        true
    }

    pub fn contains(&self, address: &Value) -> bool {
        self.seen.contains(&address_key(address))
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Wallet> {
        self.wallets.iter()
    }

    pub fn as_slice(&self) -> &[Wallet] {
        &self.wallets
    }

    /// Stable ascending sort by `created_at`.
    ///
    /// All or nothing: if any wallet lacks a string `created_at` the order is
    /// left as inserted and `false` is returned.
    pub fn sort_by_created_at(&mut self) -> bool {
        if !self.wallets.iter().all(|w| w.created_at().is_some()) {
            return false;
        }
        self.wallets.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        true
    }
}

impl Serialize for WalletCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wallets.serialize(serializer)
    }
}
