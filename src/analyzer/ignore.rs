//! In-source ignore directives.
//!
//! `php-compat-ignore` takes rule names, rule groups or error codes; without
//! arguments it silences the whole file, like `php-compat-ignore-file`.

const DIRECTIVE: &str = "php-compat-ignore";
const FILE_DIRECTIVE: &str = "php-compat-ignore-file";

/// Tracks the ignore directives declared in a file.
#[derive(Clone, Debug, Default)]
pub struct IgnoreState {
    ignore_all: bool,
    patterns: Vec<String>,
}

impl IgnoreState {
    /// Parses the ignore directives declared in the supplied source.
    pub fn from_source(source: &str) -> Self {
        let mut state = Self::default();

        for line in source.lines() {
            if state.ignore_all {
                break;
            }

            state.collect_from_line(line);
        }

        state
    }

    fn collect_from_line(&mut self, line: &str) {
        if let Some(idx) = line.find(FILE_DIRECTIVE) {
            self.ignore_all = true;
            self.apply_args(&line[idx + FILE_DIRECTIVE.len()..]);
            return;
        }

        if let Some(idx) = line.find(DIRECTIVE) {
            self.apply_args(&line[idx + DIRECTIVE.len()..]);
        }
    }

    fn apply_args(&mut self, tail: &str) {
        if self.ignore_all {
            return;
        }

        let mut args = trim_comment_tail(tail).trim_start();
        if let Some(stripped) = args.strip_prefix(':') {
            args = stripped.trim_start();
        }

        if args.is_empty() {
            self.ignore_all = true;
            return;
        }

        for token in args.split(|c: char| c == ',' || c.is_whitespace()) {
            let trimmed = token
                .trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                .trim_end_matches('/');
            if trimmed.is_empty() {
                continue;
            }

            let normalized = trimmed.to_ascii_lowercase();
            if ["*", "all", "file"].contains(&normalized.as_str()) {
                self.ignore_all = true;
                break;
            }

            self.patterns.push(normalized);
        }
    }

    /// Returns `true` if diagnostics emitted by `rule_name` should be suppressed.
    pub fn should_ignore(&self, rule_name: &str) -> bool {
        if self.ignore_all {
            return true;
        }

        let rule_lower = rule_name.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| {
            rule_lower == *pattern
                || rule_lower
                    .strip_prefix(pattern.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Returns `true` if a diagnostic with this rule or error code is suppressed.
    pub fn should_ignore_diagnostic(&self, rule_name: &str, code: &str) -> bool {
        if self.should_ignore(rule_name) {
            return true;
        }

        !code.is_empty() && self.patterns.iter().any(|pattern| code.eq_ignore_ascii_case(pattern))
    }

    /// Returns `true` if a file-level ignore directive was encountered.
    pub fn ignores_everything(&self) -> bool {
        self.ignore_all
    }
}

fn trim_comment_tail(value: &str) -> &str {
    let mut limit = value.len();

    for marker in ["//", "/*", "#", "*/"] {
        if let Some(idx) = value.find(marker) {
            limit = limit.min(idx);
        }
    }

    value[..limit].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_file_when_directive_has_no_tokens() {
        let state = IgnoreState::from_source("<?php\n// php-compat-ignore\n");
        assert!(state.ignores_everything());
        assert!(state.should_ignore("functions/new_functions"));
    }

    #[test]
    fn ignores_file_when_directive_is_file_alias() {
        let state = IgnoreState::from_source("/* php-compat-ignore-file */");
        assert!(state.ignores_everything());
    }

    #[test]
    fn parses_rule_and_group_tokens() {
        let source = "
            // php-compat-ignore: functions/new_functions parameters
            // php-compat-ignore syntax/named_arguments
        ";

        let state = IgnoreState::from_source(source);
        assert!(state.should_ignore("functions/new_functions"));
        assert!(state.should_ignore("parameters/required_to_optional"));
        assert!(state.should_ignore("syntax/named_arguments"));
        assert!(!state.should_ignore("functions/removed_functions"));
        assert!(!state.should_ignore("parameters_extra/anything"));
    }

    #[test]
    fn error_codes_are_matched_case_insensitively() {
        let state = IgnoreState::from_source("// php-compat-ignore: str_containsFound");
        assert!(state.should_ignore_diagnostic("functions/new_functions", "str_containsFound"));
        assert!(state.should_ignore_diagnostic("functions/new_functions", "STR_CONTAINSFOUND"));
        assert!(!state.should_ignore_diagnostic("functions/new_functions", "str_starts_withFound"));
    }

    #[test]
    fn stops_parsing_at_inline_comment_end() {
        let state = IgnoreState::from_source("// php-compat-ignore: functions // legacy code");
        assert!(state.should_ignore("functions/removed_functions"));
        assert!(!state.should_ignore("parameters/new_parameters"));
    }

    #[test]
    fn block_comment_does_not_become_a_wildcard() {
        let state = IgnoreState::from_source("/* php-compat-ignore: parameters */");
        assert!(!state.ignores_everything());
        assert!(state.should_ignore("parameters/removed_parameters"));
        assert!(!state.should_ignore("functions/new_functions"));
    }
}
