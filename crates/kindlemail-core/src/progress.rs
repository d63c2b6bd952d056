//! Human-readable sizes and transfer rates.

use kindlemail_smtp::TransferProgress;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Formats a byte count as `N Byte`, `x.xxx KB` or `x.xxx MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} Byte")
    } else if value < MIB {
        format!("{:.3} KB", value / KIB)
    } else {
        format!("{:.3} MB", value / MIB)
    }
}

/// Formats a rate as `(x.xxxByte/Sec)`, `(x.xxxKB/Sec)` or `(x.xxxMB/Sec)`.
#[must_use]
pub fn format_rate(bytes_per_second: f64) -> String {
    if bytes_per_second >= MIB {
        format!("({:.3}MB/Sec)", bytes_per_second / MIB)
    } else if bytes_per_second >= KIB {
        format!("({:.3}KB/Sec)", bytes_per_second / KIB)
    } else {
        format!("({bytes_per_second:.3}Byte/Sec)")
    }
}

/// Formats transfer progress as size followed by rate, e.g.
/// `1.500 MB(0.750MB/Sec)`.
#[must_use]
pub fn format_progress(progress: &TransferProgress) -> String {
    format!(
        "{}{}",
        format_size(progress.sent),
        format_rate(progress.bytes_per_second())
    )
}
