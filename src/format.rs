const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human readable size in base-1024 units, at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", round_half_up(bytes as f64 / scale as f64, 100.0));
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, UNITS[unit])
}

/// Percentage saved going from `original` to `result`, one decimal.
pub fn format_reduction(original: u64, result: u64) -> String {
    if original == 0 {
        return "0.0".to_string();
    }
    let percent = (1.0 - result as f64 / original as f64) * 100.0;
    format!("{:.1}", round_half_up(percent, 10.0))
}

/// `{:.N}` rounds exact ties to even; sizes shown to users round ties away from zero.
fn round_half_up(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}
