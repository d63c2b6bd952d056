//! GBK detection and transcoding for plain-text input.

use encoding_rs::GBK;

/// Bytes examined when deciding whether text is GBK.
pub const SCAN_LIMIT: usize = 64 * 1024;

/// Returns true if `data` looks like GBK-encoded text.
///
/// Scans the first [`SCAN_LIMIT`] bytes. ASCII bytes stand alone; any other
/// byte must be a GBK lead byte (`0x81..=0xFE`) followed by a trail byte
/// (`0x40..=0xFE`). The first byte that fits neither pattern, including a
/// lead byte with nothing after it, means "not GBK". Pure ASCII is not GBK
/// either: there is nothing to transcode.
#[must_use]
pub fn is_gbk(data: &[u8]) -> bool {
    let limit = data.len().min(SCAN_LIMIT);
    let mut seen_pair = false;
    let mut i = 0;

    while i < limit {
        let lead = data[i];
        if lead <= 0x7F {
            i += 1;
            continue;
        }
        match data.get(i + 1) {
            Some(trail) if (0x81..=0xFE).contains(&lead) && (0x40..=0xFE).contains(trail) => {
                seen_pair = true;
                i += 2;
            }
            _ => return false,
        }
    }

    seen_pair
}

/// Transcodes GBK bytes to UTF-8.
///
/// Returns `None` if the input contains sequences GBK cannot map.
#[must_use]
pub fn gbk_to_utf8(data: &[u8]) -> Option<String> {
    GBK.decode_without_bom_handling_and_without_replacement(data)
        .map(std::borrow::Cow::into_owned)
}
