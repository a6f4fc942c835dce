//! Opaque resume tokens for `scan --limit`.
//!
//! A token is the JSON form of a [`ScanCursor`], base64url-encoded without
//! padding so it survives shells and URLs unquoted.

use base64::Engine;
use commitstore_core::CommitId;
use commitstore_store::{ScanCursor, SequenceStrategy};
use thiserror::Error;

/// A `--after` value that is not a token this store could have issued.
#[derive(Error, Debug)]
#[error("invalid resume token: {0}")]
pub struct InvalidToken(String);

/// Encodes `cursor` as a resume token.
pub fn encode(cursor: &ScanCursor) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(cursor)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a resume token issued under `strategy`.
pub fn decode(token: &str, strategy: SequenceStrategy) -> Result<ScanCursor, InvalidToken> {
    let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| InvalidToken(e.to_string()))?;
    let cursor: ScanCursor =
        serde_json::from_slice(&json).map_err(|e| InvalidToken(e.to_string()))?;

    let matches = matches!(
        (strategy, &cursor.commit_id),
        (SequenceStrategy::Counter, CommitId::Sequence(_))
            | (SequenceStrategy::Derived, CommitId::Derived(_))
    );
    if !matches {
        return Err(InvalidToken(format!(
            "commit id {} was not issued by the {} strategy",
            cursor.commit_id, strategy
        )));
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use commitstore_core::AggregateId;

    fn cursor(commit_id: CommitId) -> ScanCursor {
        ScanCursor {
            commit_id,
            aggregate_id: AggregateId::parse("order-1").unwrap(),
            version: 4,
        }
    }

    #[test]
    fn token_is_url_safe() {
        let token = encode(&cursor(CommitId::Derived("19700101000000000:order-1".into()))).unwrap();
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        let back = decode(&token, SequenceStrategy::Derived).unwrap();
        assert_eq!(back.version, 4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("not a token!", SequenceStrategy::Counter).is_err());
        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("{");
        assert!(decode(&not_json, SequenceStrategy::Counter).is_err());
    }

    #[test]
    fn rejects_token_from_the_other_strategy() {
        let token = encode(&cursor(CommitId::Sequence(3))).unwrap();
        assert!(decode(&token, SequenceStrategy::Counter).is_ok());
        let err = decode(&token, SequenceStrategy::Derived).unwrap_err();
        assert!(err.to_string().contains("derived"), "{err}");
    }
}
