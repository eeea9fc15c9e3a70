use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// `Authorization` value for HTTP basic auth: `Basic base64(user:password)`.
pub fn basic_auth_header(user: &str, password: &str) -> String {
    let credentials = format!("{user}:{password}");
    format!("Basic {}", STANDARD.encode(credentials))
}

pub fn bearer_auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
