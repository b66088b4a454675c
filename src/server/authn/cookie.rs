/// Cookie carrying the session token between browser and server.
pub const AUTH_COOKIE_NAME: &str = "argocd.token";

/// Browsers reject cookies above ~4096 bytes; leave room for the name and
/// the `=` separator.
pub const MAX_COOKIE_VALUE_LENGTH: usize = 4093;

/// Splits a token across one or more same-named cookies and reassembles
/// them on read. A token that fits the per-cookie budget travels as one
/// cookie under the base name; larger tokens are chunked into
/// `<base>.0`, `<base>.1`, ... preserving order.
#[derive(Debug, Clone)]
pub struct CookieCodec {
    name: String,
    max_value_length: usize,
}

impl Default for CookieCodec {
    fn default() -> Self {
        Self::new(AUTH_COOKIE_NAME)
    }
}

impl CookieCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_value_length: MAX_COOKIE_VALUE_LENGTH,
        }
    }

    /// Renders the Set-Cookie header values for `token`.
    ///
    /// An empty token yields no headers at all, which callers use to mean
    /// "leave the session unchanged". Every cookie carries the fixed
    /// attributes `path=/; SameSite=lax; httpOnly`, plus `Secure` when the
    /// connection is served over TLS.
    pub fn encode(&self, token: &str, secure: bool) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }

        let attributes = if secure {
            "path=/; SameSite=lax; httpOnly; Secure"
        } else {
            "path=/; SameSite=lax; httpOnly"
        };

        let chunks = split_chunks(token, self.max_value_length);
        if chunks.len() == 1 {
            return vec![format!("{}={}; {attributes}", self.name, chunks[0])];
        }

        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("{}.{i}={chunk}; {attributes}", self.name))
            .collect()
    }

    /// Reassembles the token from Cookie header values.
    ///
    /// Indexed chunk cookies are concatenated in ascending index order and
    /// must form a contiguous run from 0; a missing or duplicated chunk
    /// yields None rather than a corrupt token. A bare base-name cookie is
    /// treated as a single unchunked token and only consulted when no
    /// indexed chunk is present. Returns None when no matching cookie
    /// exists; malformed cookie text never errors, it just yields nothing.
    pub fn decode(&self, cookie_headers: &[String]) -> Option<String> {
        let mut bare: Option<&str> = None;
        let mut chunks: Vec<(usize, &str)> = Vec::new();

        for header in cookie_headers {
            for cookie in header.split(';') {
                let Some((name, value)) = cookie.trim().split_once('=') else {
                    continue;
                };
                if name == self.name {
                    bare = Some(value);
                } else if let Some(index) = name.strip_prefix(&self.name) {
                    if let Ok(n) = index.strip_prefix('.').unwrap_or("").parse::<usize>() {
                        chunks.push((n, value));
                    }
                }
            }
        }

        if chunks.is_empty() {
            return bare.map(String::from);
        }

        chunks.sort_by_key(|(n, _)| *n);
        if chunks.iter().enumerate().any(|(i, (n, _))| i != *n) {
            return None;
        }
        Some(chunks.into_iter().map(|(_, chunk)| chunk).collect())
    }
}

fn split_chunks(value: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < value.len() {
        let mut end = usize::min(start + size, value.len());
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&value[start..end]);
        start = end;
    }
    chunks
}
