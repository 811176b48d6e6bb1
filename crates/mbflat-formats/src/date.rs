//! Release-date normalization.

/// Normalize a dump release date to `YYYY-MM-DD`.
///
/// The dump carries dates at year (`1997`), month (`1997-05`), or day
/// (`1997-05-21`) precision. Missing components are pinned to the first of
/// the period; anything else passes through unchanged.
pub fn normalize_release_date(date: &str) -> String {
    match date.len() {
        0 => String::new(),
        4 => format!("{date}-01-01"),
        7 => format!("{date}-01"),
        _ => date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_partial_dates_to_period_start() {
        assert_eq!(normalize_release_date("1997"), "1997-01-01");
        assert_eq!(normalize_release_date("1997-05"), "1997-05-01");
        assert_eq!(normalize_release_date("1997-05-21"), "1997-05-21");
        assert_eq!(normalize_release_date(""), "");
    }
}
