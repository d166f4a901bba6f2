/// Excel caps sheet names at 31 characters.
pub const MAX_SHEET_NAME_LEN: usize = 31;
pub const DEFAULT_OUTPUT_SHEET: &str = "AI_Analysis";

// Excel forbids []:*?/\ ; the rest would break the backing file name.
const FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\', '"', '<', '>', '|'];

pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();

    let capped: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    let capped = capped.trim_end();
    if capped.is_empty() {
        "Sheet".to_string()
    } else {
        capped.to_string()
    }
}

/// Returns `base` if no sheet uses it yet, otherwise `base_2`, `base_3`, ...
/// shortened so the result still fits. Names compare case-insensitively.
pub fn unique_sheet_name(base: &str, existing: &[String]) -> String {
    let base = sanitize_sheet_name(base);
    let taken = |candidate: &str| {
        let candidate = candidate.to_lowercase();
        existing.iter().any(|e| e.to_lowercase() == candidate)
    };

    if !taken(&base) {
        return base;
    }

    let mut n = 2usize;
    loop {
        let suffix = format!("_{}", n);
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        let stem: String = base.chars().take(keep).collect();
        let candidate = format!("{}{}", stem, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn timestamped_sheet_name(base: &str) -> String {
    format!(
        "{}_{}",
        base,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1Q2 draft");
        assert_eq!(sanitize_sheet_name("  'quoted'  "), "quoted");
        assert_eq!(sanitize_sheet_name("???"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn test_unique_name_free_base() {
        assert_eq!(unique_sheet_name("AI_Analysis", &names(&["Data"])), "AI_Analysis");
    }

    #[test]
    fn test_unique_name_adds_suffix() {
        let existing = names(&["Data", "AI_Analysis", "ai_analysis_2"]);
        assert_eq!(unique_sheet_name("AI_Analysis", &existing), "AI_Analysis_3");
    }

    #[test]
    fn test_unique_name_stays_within_limit() {
        let base = "A".repeat(31);
        let existing = vec![base.clone()];
        let name = unique_sheet_name(&base, &existing);
        assert_eq!(name.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(name.ends_with("_2"));
    }

    #[test]
    fn test_timestamped_name_fits() {
        let name = timestamped_sheet_name(DEFAULT_OUTPUT_SHEET);
        assert!(name.starts_with("AI_Analysis_"));
        assert!(name.chars().count() <= MAX_SHEET_NAME_LEN);
    }
}
