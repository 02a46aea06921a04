use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    map: HashMap<String, String>,
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, String>::deserialize(deserializer)?;
        Ok(QueryParams { map })
    }
}

impl QueryParams {
    /// Parse a raw `a=1&b=two` query string. A leading `?` is ignored, `+`
    /// decodes to a space, and the first occurrence of a key wins.
    pub fn parse(raw: &str) -> Self {
        let mut map = HashMap::new();
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            if key.is_empty() {
                continue;
            }
            map.entry(key).or_insert_with(|| decode_component(value));
        }

        QueryParams { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        // First try to get the value the normal way.
        if let Some(val) = self.map.get(key) {
            return Some(val);
        }

        // Now uppercase the first letter and try again.
        let mut chars = key.chars();
        let first = chars.next()?;
        if first.is_ascii_lowercase() {
            let key2 = format!("{}{}", first.to_ascii_uppercase(), chars.as_str());
            return self.map.get(&key2).map(|x| x.as_str());
        }
        None
    }

    /// Like [`get`](Self::get), but treats blank values as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
