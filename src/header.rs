//! Parsing and formatting of the two L402 header forms:
//!
//! - the challenge `WWW-Authenticate: L402 macaroon="<b64>", invoice="<bolt11>"` (server -> client)
//! - the credential `Authorization: L402 <b64-macaroon>:<hex-preimage>` (client -> server)
//!
//! The older space-delimited `L402 version=0 macaroon=... invoice=...` grammar found in
//! an earlier draft of this protocol is not accepted here; only the quoted-comma form is.

use crate::error::{L402Error, Result};

pub const AUTH_SCHEME: &str = "L402";
pub const CHALLENGE_HEADER_NAME: &str = "WWW-Authenticate";
pub const CREDENTIAL_HEADER_NAME: &str = "Authorization";

/// The parsed contents of a `WWW-Authenticate` challenge. `preimage` is always `None`
/// here; it is filled in by the caller once a payment settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub macaroon: String,
    pub invoice: String,
}

/// Parse a `WWW-Authenticate` header value formatted as
/// `L402 macaroon="<b64>", invoice="<bolt11>"`.
pub fn parse_challenge(value: &str) -> Result<Challenge> {
    let value = value.trim();
    if !value
        .get(..AUTH_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(AUTH_SCHEME))
    {
        return Err(L402Error::MalformedChallenge(format!(
            "missing {AUTH_SCHEME} scheme: {value}"
        )));
    }

    let macaroon = extract_quoted(value, "macaroon").ok_or_else(|| {
        L402Error::MalformedChallenge(format!("missing macaroon parameter: {value}"))
    })?;
    let invoice = extract_quoted(value, "invoice").ok_or_else(|| {
        L402Error::MalformedChallenge(format!("missing invoice parameter: {value}"))
    })?;

    Ok(Challenge { macaroon, invoice })
}

/// Find `key="..."` in `value` and return the contents between the quotes. The value
/// inside the quotes must not itself contain a space, matching the protocol's
/// `macaroon="([^ ]+)"` / `invoice="([^ ]+)"` grammar.
fn extract_quoted(value: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = value.find(&needle)? + needle.len();
    let rest = &value[start..];
    let end = rest.find('"')?;
    let found = &rest[..end];
    if found.is_empty() || found.contains(' ') {
        return None;
    }
    Some(found.to_string())
}

/// Format a challenge header value: `L402 macaroon="<b64>", invoice="<bolt11>"`.
pub fn format_challenge(macaroon: &str, invoice: &str) -> String {
    format!("{AUTH_SCHEME} macaroon=\"{macaroon}\", invoice=\"{invoice}\"")
}

/// The parsed contents of an `Authorization: L402 ...` credential header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCredential {
    pub macaroon: String,
    pub preimage: String,
}

/// Parse `Authorization: L402 <b64-macaroon>:<hex-preimage>`.
pub fn parse_credential(value: &str) -> Result<ParsedCredential> {
    let value = value.trim();
    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let body = parts
        .next()
        .ok_or_else(|| L402Error::InvalidAuthHeader(format!("missing body: {value}")))?;

    if scheme != AUTH_SCHEME {
        return Err(L402Error::InvalidAuthHeader(format!(
            "expected scheme {AUTH_SCHEME}, got {scheme}"
        )));
    }

    let mut halves = body.splitn(2, ':');
    let macaroon = halves.next().unwrap_or_default().trim();
    let preimage = halves
        .next()
        .ok_or_else(|| L402Error::InvalidAuthHeader(format!("missing ':' separator: {body}")))?
        .trim();

    if body.matches(':').count() != 1 {
        return Err(L402Error::InvalidAuthHeader(format!(
            "expected exactly one ':' separator: {body}"
        )));
    }

    if macaroon.is_empty() || preimage.is_empty() {
        return Err(L402Error::InvalidAuthHeader(format!(
            "macaroon or preimage is empty: {body}"
        )));
    }

    Ok(ParsedCredential {
        macaroon: macaroon.to_string(),
        preimage: preimage.to_string(),
    })
}

/// Format `Authorization: L402 <b64-macaroon>:<hex-preimage>`.
pub fn format_credential(macaroon: &str, preimage: &str) -> String {
    format!("{AUTH_SCHEME} {macaroon}:{preimage}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_challenge() {
        let header = r#"L402 macaroon="AGIAJEbase64B", invoice="lnbc1u...""#;
        let challenge = parse_challenge(header).unwrap();
        assert_eq!(challenge.macaroon, "AGIAJEbase64B");
        assert_eq!(challenge.invoice, "lnbc1u...");
    }

    #[test]
    fn challenge_is_case_insensitive_on_scheme() {
        let header = r#"l402 macaroon="abc", invoice="lnbc1""#;
        let challenge = parse_challenge(header).unwrap();
        assert_eq!(challenge.macaroon, "abc");
    }

    #[test]
    fn rejects_missing_macaroon() {
        let header = r#"L402 invoice="lnbc1""#;
        assert!(matches!(
            parse_challenge(header),
            Err(L402Error::MalformedChallenge(_))
        ));
    }

    #[test]
    fn format_then_parse_round_trips() {
        let formatted = format_challenge("AGIAJEbase64", "lnbc1u1p...");
        let parsed = parse_challenge(&formatted).unwrap();
        assert_eq!(parsed.macaroon, "AGIAJEbase64");
        assert_eq!(parsed.invoice, "lnbc1u1p...");
    }

    #[test]
    fn parses_credential() {
        let parsed = parse_credential("L402 AGIAJE==:2f84e225deadbeef").unwrap();
        assert_eq!(parsed.macaroon, "AGIAJE==");
        assert_eq!(parsed.preimage, "2f84e225deadbeef");
    }

    #[test]
    fn rejects_wrong_scheme() {
        let err = parse_credential("Bearer abc:def").unwrap_err();
        assert!(matches!(err, L402Error::InvalidAuthHeader(_)));
    }

    #[test]
    fn rejects_multiple_colons() {
        let err = parse_credential("L402 abc:def:ghi").unwrap_err();
        assert!(matches!(err, L402Error::InvalidAuthHeader(_)));
    }

    #[test]
    fn rejects_empty_sides() {
        assert!(parse_credential("L402 :def").is_err());
        assert!(parse_credential("L402 abc:").is_err());
        assert!(parse_credential("L402  : ").is_err());
    }

    #[test]
    fn credential_format_then_parse_round_trips() {
        let formatted = format_credential("AGIAJE==", "2f84e225deadbeef");
        let parsed = parse_credential(&formatted).unwrap();
        assert_eq!(parsed.macaroon, "AGIAJE==");
        assert_eq!(parsed.preimage, "2f84e225deadbeef");
    }
}
