use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// `BarChart` only takes whole numbers, so hours are stored in hundredths.
pub const HOUR_SCALE: f64 = 100.0;

pub fn bar_value(hours: f64) -> u64 {
    (hours * HOUR_SCALE).round().max(0.0) as u64
}

/// Upper bound of the hours axis: the largest bar rounded up to a whole hour.
pub fn chart_max(max_hours: f64) -> u64 {
    bar_value(max_hours.ceil().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

pub fn format_hours(hours: f64) -> String {
    format!("{}h", format_label(hours))
}

/// Shorten `label` to at most `max_width` terminal columns, ending in `…` when cut.
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in label.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// `MM:SS`; minutes keep growing past 59 rather than rolling into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
