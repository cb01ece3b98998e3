use sha2::{Digest, Sha256};

/// Session key for a query
///
/// A non-empty caller-supplied id is used as-is. Otherwise the key is the
/// lowercase hex SHA-256 of the transport connection id, so every query on
/// the same connection lands in the same conversation.
pub fn resolve_session_key(caller_supplied: Option<&str>, connection_id: &str) -> String {
    match caller_supplied {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let mut hasher = Sha256::new();
            hasher.update(connection_id.as_bytes());
            format!("{:x}", hasher.finalize())
        },
    }
}
