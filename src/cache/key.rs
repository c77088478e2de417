//! Cache Key Module
//!
//! Derives the string that decides which requests share a stored response.

use axum::http::Method;

/// Separates the credential from the URL. Neither a method token nor a
/// parsed URI can contain it, so keys with and without a credential never
/// collide, even for an empty credential.
const CREDENTIAL_SEPARATOR: char = '\n';

// == Derive Key ==
/// Builds the cache key for a request.
///
/// The key is the method followed by the URL, plus the authorization value
/// when the request carries one. No other header takes part (no `Vary`
/// support), and the URL is used exactly as given.
pub fn derive_key(method: &Method, url: &str, authorization: Option<&str>) -> String {
    let mut key = String::with_capacity(
        method.as_str().len() + url.len() + authorization.map_or(0, |a| a.len() + 1),
    );
    key.push_str(method.as_str());
    key.push_str(url);
    if let Some(credential) = authorization {
        key.push(CREDENTIAL_SEPARATOR);
        key.push_str(credential);
    }
    key
}
