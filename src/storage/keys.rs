//! Object key layout for uploaded audio.
//!
//! Every file lands at
//! `{prefix}/users/{user_id}/transcriptions/{transcription_id}/audio/youtube.mp3`.

use crate::{ExtractorError, Result};

const MAX_ID_LEN: usize = 128;
const AUDIO_FILE_NAME: &str = "youtube.mp3";

/// Reject identifiers that could escape their key segment
pub fn validate_id(field: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ExtractorError::InvalidRequest(format!("{} must not be empty", field)).into());
    }

    if id.len() > MAX_ID_LEN {
        return Err(ExtractorError::InvalidRequest(format!(
            "{} must be at most {} characters",
            field, MAX_ID_LEN
        ))
        .into());
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ExtractorError::InvalidRequest(format!(
            "{} may only contain letters, digits, '_' and '-'",
            field
        ))
        .into());
    }

    Ok(())
}

/// Build the object key for a transcription's source audio
pub fn object_key(prefix: &str, user_id: &str, transcription_id: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let tail = format!(
        "users/{}/transcriptions/{}/audio/{}",
        user_id, transcription_id, AUDIO_FILE_NAME
    );

    if prefix.is_empty() {
        tail
    } else {
        format!("{}/{}", prefix, tail)
    }
}

/// Join the bucket's public base URL and an object key
pub fn public_url(base: &str, key: &str) -> String {
    let encoded = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!("{}/{}", base.trim_end_matches('/'), encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key("fretwise", "usr_abc123", "txn_xyz789"),
            "fretwise/users/usr_abc123/transcriptions/txn_xyz789/audio/youtube.mp3"
        );
        assert_eq!(
            object_key("/tenant/", "u", "t"),
            "tenant/users/u/transcriptions/t/audio/youtube.mp3"
        );
        assert_eq!(object_key("", "u", "t"), "users/u/transcriptions/t/audio/youtube.mp3");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://pub-xxx.r2.dev/", "fretwise/users/u/a.mp3"),
            "https://pub-xxx.r2.dev/fretwise/users/u/a.mp3"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "a b/c"),
            "https://cdn.example.com/a%20b/c"
        );
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("user_id", "usr_abc-123").is_ok());
        assert!(validate_id("user_id", "").is_err());
        assert!(validate_id("user_id", "../etc").is_err());
        assert!(validate_id("user_id", "a/b").is_err());
        assert!(validate_id("user_id", &"x".repeat(129)).is_err());

        let err = validate_id("transcription_id", "a b").unwrap_err();
        assert!(err.to_string().contains("transcription_id"));
    }
}
