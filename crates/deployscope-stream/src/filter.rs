use regex::Regex;

use deployscope_types::LogLine;

/// Compiled display filter for the log view.
///
/// Patterns are treated as regular expressions; an invalid pattern falls
/// back to a literal substring match so typing `[` mid-expression never
/// blanks the view.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl CompiledFilter {
    pub fn new(pattern: &str) -> Self {
        let regex = Regex::new(pattern).ok();
        Self {
            pattern: pattern.to_string(),
            regex,
        }
    }

    pub fn new_case_insensitive(pattern: &str) -> Self {
        let regex = Regex::new(&format!("(?i){}", pattern)).ok();
        Self {
            pattern: pattern.to_string(),
            regex,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, line: &LogLine) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        match &self.regex {
            Some(re) => re.is_match(&line.message),
            None => line
                .message
                .to_lowercase()
                .contains(&self.pattern.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deployscope_types::LogLevel;

    fn line(msg: &str) -> LogLine {
        LogLine {
            id: "t".to_string(),
            timestamp: Utc::now(),
            message: msg.to_string(),
            source_tag: "all".to_string(),
            historical: false,
            level: LogLevel::Unknown,
        }
    }

    #[test]
    fn test_regex_match() {
        let filter = CompiledFilter::new("error|warn");
        assert!(filter.matches(&line("an error occurred")));
        assert!(filter.matches(&line("warn: low disk")));
        assert!(!filter.matches(&line("all good")));
    }

    #[test]
    fn test_case_insensitive() {
        let filter = CompiledFilter::new_case_insensitive("ERROR");
        assert!(filter.matches(&line("soft error here")));
    }

    #[test]
    fn test_invalid_pattern_falls_back_to_substring() {
        let filter = CompiledFilter::new("bad[regex");
        assert!(filter.matches(&line("contains bad[regex literally")));
        assert!(!filter.matches(&line("nothing relevant")));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let filter = CompiledFilter::new("");
        assert!(filter.matches(&line("anything")));
    }
}
