use std::collections::HashMap;

/// Request metadata as handed over by the transport collaborator.
///
/// The RPC/HTTP framework itself is out of scope for this core; whatever
/// serves the request flattens its headers or call metadata into this map
/// before asking for authentication. Keys are case-insensitive and stored
/// lowercased, values keep their order of appearance.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    entries: HashMap<String, Vec<String>>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from alternating key/value pairs.
    pub fn pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut md = Self::new();
        for (key, value) in pairs {
            md.append(key, value);
        }
        md
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_lowercase();
        self.entries.entry(key).or_default().push(value.into());
    }

    /// First value for the key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(|s| s.as_str())
    }

    /// All values for the key, in order of appearance.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }
}
