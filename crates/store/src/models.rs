use std::fmt::{Display, Formatter, Result as FmtResult};

/// A layer digest, split into its algorithm and encoded value.
///
/// Registries report layers as `type:value` strings (e.g. `sha256:0af2...`).
/// Anything without exactly one colon is malformed; both components are then
/// `None` rather than an error, and a malformed digest is still tracked like
/// any other (all malformed digests of one image collapse into one record).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Digest {
    pub kind: Option<String>,
    pub value: Option<String>,
}
impl Digest {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), value: Some(value.into()) }
    }

    /// Split a raw `type:value` digest string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((kind, value)) if !value.contains(':') => Self::new(kind, value),
            _ => Self::default(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.kind.is_none() && self.value.is_none()
    }
}
impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.kind, &self.value) {
            (Some(kind), Some(value)) => write!(f, "{kind}:{value}"),
            _ => f.write_str("<malformed>"),
        }
    }
}

/// A single "this digest was seen for this image" row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HashRecord {
    pub hash_type: Option<String>,
    pub hash: Option<String>,
    pub image: String,
}
impl HashRecord {
    pub fn digest(&self) -> Digest {
        Digest { kind: self.hash_type.clone(), value: self.hash.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sha256:aaa", Some("sha256"), Some("aaa"))]
    #[case("sha512:0af2e1", Some("sha512"), Some("0af2e1"))]
    #[case("sha256:", Some("sha256"), Some(""))]
    #[case(":aaa", Some(""), Some("aaa"))]
    #[case("nocolonhere", None, None)]
    #[case("", None, None)]
    #[case("sha256:aaa:bbb", None, None)]
    #[case("::", None, None)]
    fn test_parse(#[case] raw: &str, #[case] kind: Option<&str>, #[case] value: Option<&str>) {
        let digest = Digest::parse(raw);
        assert_eq!(digest.kind.as_deref(), kind);
        assert_eq!(digest.value.as_deref(), value);
    }

    #[test]
    fn test_malformed_digests_are_equal() {
        assert_eq!(Digest::parse("nocolonhere"), Digest::parse("a:b:c"));
        assert!(Digest::parse("nocolonhere").is_malformed());
        assert!(!Digest::parse("sha256:aaa").is_malformed());
    }

    #[test]
    fn test_display() {
        assert_eq!(Digest::parse("sha256:aaa").to_string(), "sha256:aaa");
        assert_eq!(Digest::parse("garbage").to_string(), "<malformed>");
    }

    #[test]
    fn test_record_digest() {
        let record = HashRecord {
            hash_type: Some("sha256".to_string()),
            hash: Some("aaa".to_string()),
            image: "app:1".to_string(),
        };
        assert_eq!(record.digest(), Digest::new("sha256", "aaa"));
    }
}
