//! The plaintext carried inside an identity token.

use crate::error::TokenError;

/// Field separator between subject and timestamp.
pub const SEPARATOR: char = '|';

/// Subject identifier plus issue time, serialized as `<subject>|<millis>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPayload {
    subject_id: String,
    issued_at_millis: i64,
}

impl IdentityPayload {
    /// Build a payload, rejecting subjects the wire format cannot carry.
    pub fn new(subject_id: impl Into<String>, issued_at_millis: i64) -> Result<Self, TokenError> {
        let subject_id = subject_id.into();
        validate_subject(&subject_id)?;
        Ok(Self {
            subject_id,
            issued_at_millis,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn issued_at_millis(&self) -> i64 {
        self.issued_at_millis
    }

    pub fn into_subject_id(self) -> String {
        self.subject_id
    }

    /// Serialize to the wire form.
    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.subject_id, SEPARATOR, self.issued_at_millis)
    }

    /// Parse the wire form.
    ///
    /// Splits on the first separator only; anything after it must be a
    /// signed decimal timestamp.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let (subject_id, issued_at) = raw.split_once(SEPARATOR).ok_or(TokenError::BadFormat)?;
        if subject_id.is_empty() {
            return Err(TokenError::BadFormat);
        }
        let issued_at_millis = issued_at
            .parse::<i64>()
            .map_err(|_| TokenError::BadFormat)?;
        Ok(Self {
            subject_id: subject_id.to_string(),
            issued_at_millis,
        })
    }
}

/// Check that a subject can be packed into a payload.
pub fn validate_subject(subject_id: &str) -> Result<(), TokenError> {
    if subject_id.is_empty() {
        return Err(TokenError::InvalidSubject("subject id is empty".to_string()));
    }
    if subject_id.contains(SEPARATOR) {
        return Err(TokenError::InvalidSubject(format!(
            "subject id must not contain '{SEPARATOR}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form() {
        let payload = IdentityPayload::new("100205", 1_700_000_000_123).unwrap();
        assert_eq!(payload.to_wire(), "100205|1700000000123");
        assert_eq!(IdentityPayload::parse(&payload.to_wire()).unwrap(), payload);
    }

    #[test]
    fn test_negative_timestamp_parses() {
        let payload = IdentityPayload::parse("u|-5").unwrap();
        assert_eq!(payload.issued_at_millis(), -5);
    }

    #[test]
    fn test_subject_with_separator_rejected() {
        assert!(matches!(
            IdentityPayload::new("a|b", 0),
            Err(TokenError::InvalidSubject(_))
        ));
        assert!(matches!(
            IdentityPayload::new("", 0),
            Err(TokenError::InvalidSubject(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for raw in [
            "BrokenPayloadNoSeparator",
            "|1700000000000",
            "user|",
            "user|12ab",
            "user|1|2",
            "user| 17",
        ] {
            assert!(
                matches!(IdentityPayload::parse(raw), Err(TokenError::BadFormat)),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_non_ascii_subject() {
        let payload = IdentityPayload::new("użytkownik-7", 9).unwrap();
        assert_eq!(IdentityPayload::parse(&payload.to_wire()).unwrap(), payload);
    }
}
