use rand::Rng;
use serde::Deserialize;

use crate::codec::CodecError;
use crate::codec::base62::{self, ALPHABET};

/// Random symbols leading an anonymous token.
pub const SALT_LEN: usize = 5;
/// Random symbols leading an identity-bearing token.
pub const IDENTITY_SALT_LEN: usize = 10;
/// Width of one encoded 64-bit field, `ceil(log62(2^64))`.
pub const FIELD_LEN: usize = 11;

pub const TOKEN_LEN: usize = SALT_LEN + FIELD_LEN;
pub const IDENTITY_TOKEN_LEN: usize = IDENTITY_SALT_LEN + 2 * FIELD_LEN;

// marker symbols interleaved with the salt are ALPHABET[14 * i + offset]
const PRIMARY_MARKER: usize = 4;
const SECONDARY_MARKER: usize = 1;

/// Shape of the tokens a facade issues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Salt and one obfuscated identifier, [`TOKEN_LEN`] symbols.
    #[default]
    Anonymous,
    /// Salt, one obfuscated identifier and one obfuscated application id,
    /// [`IDENTITY_TOKEN_LEN`] symbols.
    Identity,
}

impl TokenKind {
    pub fn token_len(self) -> usize {
        match self {
            TokenKind::Anonymous => TOKEN_LEN,
            TokenKind::Identity => IDENTITY_TOKEN_LEN,
        }
    }
}

fn random_salt<const N: usize>() -> [u8; N] {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; N];
    for symbol in salt.iter_mut() {
        *symbol = ALPHABET[rng.gen_range(0..ALPHABET.len())];
    }
    salt
}

/// Numeric value of the salt symbols interleaved with fixed markers.
///
/// Five salt symbols give a ten symbol numeral, always below 2^60.
/// Callers must have checked that `salt` only holds alphabet symbols.
fn salt_value(salt: &[u8], marker: usize) -> u64 {
    salt.iter().enumerate().fold(0u64, |acc, (i, &symbol)| {
        let acc = acc * 62 + u64::from(base62::LOOKUP[symbol as usize]);
        acc * 62 + (14 * i + marker) as u64
    })
}

fn checked_symbols(token: &str, expected: usize) -> Result<&[u8], CodecError> {
    let bytes = token.as_bytes();
    if bytes.len() != expected {
        return Err(CodecError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    if let Some(&bad) = bytes.iter().find(|&&b| base62::value_of(b).is_none()) {
        return Err(CodecError::InvalidSymbol(bad as char));
    }
    Ok(bytes)
}

fn push_field(token: &mut String, value: u64) {
    token.push_str(&base62::encode_padded(value, FIELD_LEN));
}

/// Issues an anonymous token for `id`.
pub fn encode(id: u64) -> String {
    let salt = random_salt::<SALT_LEN>();

    let mut token = String::with_capacity(TOKEN_LEN);
    token.extend(salt.iter().map(|&b| b as char));
    push_field(&mut token, id ^ salt_value(&salt, PRIMARY_MARKER));
    token
}

/// Recovers the identifier of a token produced by [`encode`].
pub fn decode(token: &str) -> Result<u64, CodecError> {
    let bytes = checked_symbols(token, TOKEN_LEN)?;
    let (salt, field) = bytes.split_at(SALT_LEN);

    Ok(base62::decode_bytes(field)? ^ salt_value(salt, PRIMARY_MARKER))
}

/// Issues an identity-bearing token carrying both `id` and `app_id`.
pub fn encode_with_id(id: u64, app_id: u64) -> String {
    let salt = random_salt::<IDENTITY_SALT_LEN>();
    let (first, second) = salt.split_at(SALT_LEN);

    let mut token = String::with_capacity(IDENTITY_TOKEN_LEN);
    token.extend(salt.iter().map(|&b| b as char));
    push_field(&mut token, id ^ salt_value(first, PRIMARY_MARKER));
    push_field(&mut token, app_id ^ salt_value(second, SECONDARY_MARKER));
    token
}

/// Recovers `(id, app_id)` from a token produced by [`encode_with_id`].
pub fn decode_with_id(token: &str) -> Result<(u64, u64), CodecError> {
    let bytes = checked_symbols(token, IDENTITY_TOKEN_LEN)?;
    let (salt, fields) = bytes.split_at(IDENTITY_SALT_LEN);
    let (first, second) = salt.split_at(SALT_LEN);
    let (id_field, app_field) = fields.split_at(FIELD_LEN);

    let id = base62::decode_bytes(id_field)? ^ salt_value(first, PRIMARY_MARKER);
    let app_id = base62::decode_bytes(app_field)? ^ salt_value(second, SECONDARY_MARKER);
    Ok((id, app_id))
}

/// Whether `token` has the length and character set of either token shape.
pub fn is_well_formed(token: &str) -> bool {
    checked_symbols(token, TOKEN_LEN).is_ok() || checked_symbols(token, IDENTITY_TOKEN_LEN).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TRIALS: usize = 10_000;

    fn assert_shape(token: &str, len: usize) {
        assert_eq!(token.len(), len, "{token}");
        assert!(token.bytes().all(|b| ALPHABET.contains(&b)), "{token}");
    }

    #[test]
    fn test_round_trip() {
        let mut rng = rand::thread_rng();
        for n in [0, 1, 62, 1 << 63, u64::MAX] {
            assert_eq!(decode(&encode(n)).unwrap(), n);
        }
        for _ in 0..TRIALS {
            let n: u64 = rng.r#gen();
            let token = encode(n);
            assert_shape(&token, TOKEN_LEN);
            assert_eq!(decode(&token).unwrap(), n);
        }
    }

    #[test]
    fn test_round_trip_with_id() {
        let mut rng = rand::thread_rng();
        for (id, app_id) in [(0, 0), (0, u64::MAX), (u64::MAX, 0), (42, 7)] {
            assert_eq!(decode_with_id(&encode_with_id(id, app_id)).unwrap(), (id, app_id));
        }
        for _ in 0..TRIALS {
            let (id, app_id): (u64, u64) = (rng.r#gen(), rng.r#gen());
            let token = encode_with_id(id, app_id);
            assert_shape(&token, IDENTITY_TOKEN_LEN);
            assert_eq!(decode_with_id(&token).unwrap(), (id, app_id));
        }
    }

    #[test]
    fn test_same_id_gives_distinct_tokens() {
        let tokens: HashSet<String> = (0..TRIALS).map(|_| encode(42)).collect();
        // 62^5 possible salts, collisions in 10k draws are rare
        assert!(tokens.len() * 1000 >= TRIALS * 999);
        assert!(tokens.iter().all(|t| decode(t).unwrap() == 42));
    }

    #[test]
    fn test_fields_use_distinct_salts() {
        // with equal inputs the two fields must not encode identically every time
        let differing = (0..100)
            .map(|_| encode_with_id(0, 0))
            .filter(|t| t[IDENTITY_SALT_LEN..IDENTITY_SALT_LEN + FIELD_LEN] != t[IDENTITY_SALT_LEN + FIELD_LEN..])
            .count();
        assert!(differing > 90);
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert_eq!(
            decode("abc"),
            Err(CodecError::InvalidLength {
                expected: TOKEN_LEN,
                actual: 3
            })
        );
        assert_eq!(decode("abcde:0000000000"), Err(CodecError::InvalidSymbol(':')));
        assert_eq!(decode("abcdezzzzzzzzzzz"), Err(CodecError::Overflow));
        assert!(matches!(
            decode_with_id(&encode(1)),
            Err(CodecError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed(&encode(5)));
        assert!(is_well_formed(&encode_with_id(5, 6)));
        assert!(!is_well_formed("qwe"));
        assert!(!is_well_formed("abcde-0000000000"));
    }

    #[test]
    fn test_kind_len() {
        assert_eq!(TokenKind::Anonymous.token_len(), 16);
        assert_eq!(TokenKind::Identity.token_len(), 32);
    }
}
