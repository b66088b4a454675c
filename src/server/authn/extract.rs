use crate::server::metadata::RequestMetadata;
use crate::types::claims::Claims;

use super::cookie::CookieCodec;

/// Metadata field the CLI and gRPC clients put the bearer token in.
pub const TOKEN_METADATA_KEY: &str = "token";

/// Cookie-bearing metadata entries, in lookup order. Requests arriving
/// through the gateway carry the browser's Cookie header under the first
/// key; plain HTTP requests under the second.
const COOKIE_METADATA_KEYS: [&str; 2] = ["grpcgateway-cookie", "cookie"];

const BEARER_PREFIX: &str = "Bearer ";

/// Locates a candidate bearer token among the request's transport locations.
///
/// Lookup order, first match wins: the dedicated `token` metadata field, the
/// `authorization` entry (only with a literal `Bearer ` prefix), then the
/// session cookie, reassembled from chunks if needed. Headers and cookies
/// routinely carry non-token content, so those two sources only surface
/// values with a decodable JWT shape; the dedicated field is taken as-is and
/// a garbage value there fails verification instead of degrading to
/// no-token. Nothing here ever errors; a request without a token simply
/// yields None.
#[derive(Debug, Clone, Default)]
pub struct TokenExtractor {
    codec: CookieCodec,
}

impl TokenExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, md: &RequestMetadata) -> Option<String> {
        if let Some(token) = md.get(TOKEN_METADATA_KEY) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }

        if let Some(auth) = md.get("authorization") {
            // Case-sensitive by contract; a present header without the
            // exact prefix yields nothing rather than an error.
            if let Some(token) = auth.strip_prefix(BEARER_PREFIX) {
                if is_jwt(token) {
                    return Some(token.to_string());
                }
            }
        }

        for key in COOKIE_METADATA_KEYS {
            let headers = md.get_all(key);
            if headers.is_empty() {
                continue;
            }
            if let Some(token) = self.codec.decode(headers) {
                if is_jwt(&token) {
                    return Some(token);
                }
            }
        }

        None
    }
}

fn is_jwt(token: &str) -> bool {
    Claims::parse_unverified(token).is_ok()
}
