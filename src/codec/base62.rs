use crate::codec::CodecError;

pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Symbol at position 0, used for left padding.
pub const ZERO: u8 = ALPHABET[0];

const INVALID: u8 = 0xFF;

pub(crate) const LOOKUP: [u8; 128] = lookup();

const fn lookup() -> [u8; 128] {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Value of a single symbol, if it belongs to the alphabet.
pub(crate) fn value_of(symbol: u8) -> Option<u8> {
    match LOOKUP.get(symbol as usize) {
        Some(&INVALID) | None => None,
        Some(&value) => Some(value),
    }
}

/// Minimal base-62 representation of `number`.
pub fn encode(mut number: u64) -> String {
    if number == 0 {
        return (ZERO as char).to_string();
    }

    let mut digits = Vec::with_capacity(11);
    while number > 0 {
        digits.push(ALPHABET[(number % 62) as usize]);
        number /= 62;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Like [`encode`], left-padded with the zero symbol to at least `width` symbols.
pub fn encode_padded(number: u64, width: usize) -> String {
    let encoded = encode(number);
    if encoded.len() >= width {
        return encoded;
    }

    let mut padded = String::with_capacity(width);
    padded.extend(std::iter::repeat_n(ZERO as char, width - encoded.len()));
    padded.push_str(&encoded);
    padded
}

/// Interprets `input` as a big-endian base-62 numeral.
///
/// Leading zero symbols are ignored and the empty string decodes to 0.
pub fn decode(input: &str) -> Result<u64, CodecError> {
    decode_bytes(input.as_bytes())
}

pub(crate) fn decode_bytes(input: &[u8]) -> Result<u64, CodecError> {
    input.iter().try_fold(0u64, |number, &symbol| {
        let value = value_of(symbol).ok_or(CodecError::InvalidSymbol(symbol as char))?;
        number
            .checked_mul(62)
            .and_then(|n| n.checked_add(u64::from(value)))
            .ok_or(CodecError::Overflow)
    })
}
