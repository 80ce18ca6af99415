/*
 * vlq.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Base64 VLQ, as used by the V3 `mappings` field.
 */

//! Base64 VLQ, as used by the V3 `mappings` field.

const BASE64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const BASE64_VALUES: [i8; 128] = {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < BASE64_CHARS.len() {
        table[BASE64_CHARS[i] as usize] = i as i8;
        i += 1;
    }
    table
};

/// Append the VLQ encoding of `value` to `out`.
pub(crate) fn encode(value: i64, out: &mut String) {
    // Sign goes in the least significant bit
    let mut unsigned: u64 = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (unsigned & 0x1F) as u8;
        unsigned >>= 5;
        if unsigned > 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if unsigned == 0 {
            break;
        }
    }
}

/// Decode every value of one comma-free segment.
pub(crate) fn decode_segment(segment: &str) -> Result<Vec<i64>, String> {
    let mut values = Vec::new();
    let mut accum: u64 = 0;
    let mut shift = 0u32;

    for c in segment.chars() {
        let digit = BASE64_VALUES
            .get(c as usize)
            .copied()
            .filter(|d| *d >= 0)
            .ok_or_else(|| format!("invalid base64 character {:?}", c))? as u64;
        if shift > 60 {
            return Err("value does not fit in 64 bits".to_string());
        }
        accum |= (digit & 0x1F) << shift;
        shift += 5;

        if digit & 0x20 == 0 {
            let magnitude = (accum >> 1) as i64;
            values.push(if accum & 1 == 1 { -magnitude } else { magnitude });
            accum = 0;
            shift = 0;
        }
    }

    if shift != 0 {
        return Err("truncated value".to_string());
    }
    Ok(values)
}
