//! Column-name normalization.

/// Normalizes a header: trims it and collapses each whitespace run to `_`.
///
/// `"Reporting month"` becomes `"Reporting_month"`; characters other than
/// whitespace (such as `<`, `+`, `>=`) are kept as written.
pub fn normalize_column_name(value: &str) -> String {
    let trimmed = value.trim().trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(trimmed.len());
    let mut in_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_column_name("Reporting month"), "Reporting_month");
        assert_eq!(normalize_column_name("  Chest  Xlay "), "Chest_Xlay");
        assert_eq!(normalize_column_name("CD4<200"), "CD4<200");
        assert_eq!(normalize_column_name("CD4 >= 200"), "CD4_>=_200");
    }

    #[test]
    fn strips_byte_order_mark() {
        assert_eq!(normalize_column_name("\u{feff}Facility"), "Facility");
    }
}
