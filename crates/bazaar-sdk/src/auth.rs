//! Demo sign-in.
//!
//! There is no identity provider behind the CLI and tests. A user is whoever
//! claims an email address; the user id is derived from the normalized email
//! so the same address always maps to the same id.

use bazaar_types::{Session, UserId, UserProfile};

use crate::error::{SdkError, SdkResult};

/// Hex characters of the email hash kept in a derived user id.
const USER_ID_HASH_LEN: usize = 16;

/// The user id `email` signs in as.
pub fn user_id_for_email(email: &str) -> SdkResult<UserId> {
    let email = normalize_email(email)?;
    let hash = hex::encode(blake3::hash(email.as_bytes()).as_bytes());
    Ok(UserId::new(format!("u-{}", &hash[..USER_ID_HASH_LEN]))?)
}

/// Start a session for `email`. A blank `name` falls back to the part of the
/// address before the `@`.
pub fn sign_in(email: &str, name: &str) -> SdkResult<Session> {
    let email = normalize_email(email)?;
    let id = user_id_for_email(&email)?;
    let name = match name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        name => name.to_string(),
    };
    tracing::debug!(user = %id, "signed in");
    Ok(Session::user(UserProfile { id, name, email }))
}

pub fn guest() -> Session {
    Session::guest()
}

fn normalize_email(email: &str) -> SdkResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(SdkError::InvalidInput(format!("not an email address: {email:?}"))),
    }
}
