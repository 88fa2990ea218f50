//! Payload codecs and key casing.
//!
//! # Design
//! The pipelines never touch serde directly; they go through a `Codec`, so
//! an application can swap the wire format. The key casing policy is an
//! explicit value passed on every encode and decode call rather than
//! something discovered from the payload type, which lets payloads with
//! different conventions share one client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Field-name transformation applied while encoding or decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCasing {
    /// Keys go over the wire exactly as the type declares them.
    #[default]
    UseDeclared,
    /// camelCase keys become snake_case on encode; snake_case keys become
    /// camelCase on decode.
    SnakeCase,
}

/// Converts payloads to bytes and response bodies to typed values.
pub trait Codec: Send + Sync + 'static {
    fn encode<P>(&self, payload: &P, casing: KeyCasing) -> Result<Vec<u8>, CodecError>
    where
        P: Serialize + ?Sized;

    fn decode<T>(&self, bytes: &[u8], casing: KeyCasing) -> Result<T, CodecError>
    where
        T: DeserializeOwned;

    /// Content type announced for encoded payloads.
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<P>(&self, payload: &P, casing: KeyCasing) -> Result<Vec<u8>, CodecError>
    where
        P: Serialize + ?Sized,
    {
        match casing {
            KeyCasing::UseDeclared => Ok(serde_json::to_vec(payload)?),
            KeyCasing::SnakeCase => {
                let value = rekey(serde_json::to_value(payload)?, to_snake_case);
                Ok(serde_json::to_vec(&value)?)
            }
        }
    }

    fn decode<T>(&self, bytes: &[u8], casing: KeyCasing) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        match casing {
            KeyCasing::UseDeclared => Ok(serde_json::from_slice(bytes)?),
            KeyCasing::SnakeCase => {
                let value: Value = serde_json::from_slice(bytes)?;
                Ok(serde_json::from_value(rekey(value, from_snake_case))?)
            }
        }
    }
}

fn rekey(value: Value, convert: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (convert(&key), rekey(value, convert)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| rekey(v, convert)).collect()),
        other => other,
    }
}

/// `myURLValue` -> `my_url_value`. Acronym runs stay one word.
pub(crate) fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `my_url_value` -> `myUrlValue`. Leading and trailing underscores are
/// kept; empty words from repeated underscores are dropped.
pub(crate) fn from_snake_case(key: &str) -> String {
    let body = key.trim_matches('_');
    if !body.contains('_') {
        return key.to_string();
    }
    let lead = key.len() - key.trim_start_matches('_').len();
    let trail = key.len() - key.trim_end_matches('_').len();

    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..lead]);
    for (i, word) in body.split('_').filter(|w| !w.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out.push_str(&key[key.len() - trail..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        display_name: String,
        follower_count: u32,
        linked_accounts: Vec<Account>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Account {
        account_url: String,
    }

    fn profile() -> Profile {
        Profile {
            display_name: "X".to_string(),
            follower_count: 1,
            linked_accounts: vec![Account {
                account_url: "http://example.com".to_string(),
            }],
        }
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("displayName"), "display_name");
        assert_eq!(to_snake_case("myURLValue"), "my_url_value");
        assert_eq!(to_snake_case("URL"), "url");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("version2Beta"), "version2_beta");
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(from_snake_case("display_name"), "displayName");
        assert_eq!(from_snake_case("my_url_value"), "myUrlValue");
        assert_eq!(from_snake_case("_private_key_"), "_privateKey_");
        assert_eq!(from_snake_case("a__b"), "aB");
        assert_eq!(from_snake_case("plain"), "plain");
        assert_eq!(from_snake_case("__"), "__");
    }

    #[test]
    fn declared_keys_are_untouched() {
        let bytes = JsonCodec.encode(&profile(), KeyCasing::UseDeclared).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["displayName"], "X");
        assert_eq!(value["linkedAccounts"][0]["accountUrl"], "http://example.com");
    }

    #[test]
    fn snake_case_encodes_nested_keys() {
        let bytes = JsonCodec.encode(&profile(), KeyCasing::SnakeCase).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["display_name"], "X");
        assert_eq!(value["follower_count"], 1);
        assert_eq!(value["linked_accounts"][0]["account_url"], "http://example.com");
    }

    #[test]
    fn snake_case_decodes_into_camel_case_type() {
        let body = br#"{"display_name":"X","follower_count":1,"linked_accounts":[{"account_url":"http://example.com"}]}"#;
        let decoded: Profile = JsonCodec.decode(body, KeyCasing::SnakeCase).unwrap();
        assert_eq!(decoded, profile());
        assert!(JsonCodec.decode::<Profile>(body, KeyCasing::UseDeclared).is_err());
    }
}
