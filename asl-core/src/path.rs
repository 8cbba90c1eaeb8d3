use serde::{Deserialize, Serialize};

/// One segment of a [`ReferencePath`]: a field access or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Field(String),
    Index(usize),
}

/// The restricted JSONPath subset ASL allows for write targets
/// (`ResultPath`, `ItemsPath`, intrinsic path arguments): `$` followed by
/// `.name` / `['name']` field accesses and `[k]` array indices. Filters,
/// wildcards, slices, and descendant search (`..`) are all rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePath {
    raw: String,
    tokens: Vec<PathToken>,
}

impl ReferencePath {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let tokens = parse_tokens(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    pub fn is_identity(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Serialize for ReferencePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ReferencePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ReferencePath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_tokens(raw: &str) -> Result<Vec<PathToken>, String> {
    let bytes = raw.as_bytes();
    if bytes.first() != Some(&b'$') {
        return Err(format!("reference path must start with '$': {raw}"));
    }
    let mut tokens = Vec::new();
    let mut i = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                if raw[i..].starts_with("..") {
                    return Err(format!("descendant search '..' is not allowed: {raw}"));
                }
                i += 1;
                let start = i;
                while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
                    i += 1;
                }
                if start == i {
                    return Err(format!("empty field name in reference path: {raw}"));
                }
                tokens.push(PathToken::Field(raw[start..i].to_string()));
            }
            b'[' => {
                i += 1;
                let start = i;
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(format!("unterminated '[' in reference path: {raw}"));
                }
                let inner = &raw[start..i];
                i += 1; // skip ']'
                if let Some(stripped) = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                {
                    if stripped.is_empty() {
                        return Err(format!("empty bracket field name: {raw}"));
                    }
                    tokens.push(PathToken::Field(stripped.to_string()));
                } else {
                    let idx: usize = inner
                        .parse()
                        .map_err(|_| format!("invalid array index '{inner}' in {raw}"))?;
                    tokens.push(PathToken::Index(idx));
                }
            }
            _ => {
                return Err(format!(
                    "unexpected character '{}' in reference path: {raw}",
                    bytes[i] as char
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_path_has_no_tokens() {
        let p = ReferencePath::parse("$").unwrap();
        assert!(p.is_identity());
    }

    #[test]
    fn dotted_and_bracket_fields_mix() {
        let p = ReferencePath::parse("$.a.b['c'][2]").unwrap();
        assert_eq!(
            p.tokens(),
            &[
                PathToken::Field("a".into()),
                PathToken::Field("b".into()),
                PathToken::Field("c".into()),
                PathToken::Index(2),
            ]
        );
    }

    #[test]
    fn rejects_descendant_search() {
        assert!(ReferencePath::parse("$..a").is_err());
    }

    #[test]
    fn rejects_wildcard() {
        assert!(ReferencePath::parse("$.a[*]").is_err());
    }
}
