use tracing::warn;

use super::version::VersionRange;

const PREFIX: &str = "// php-compat-test:";

/// Per-file overrides read from `// php-compat-test:` comments at the top of
/// fixture files.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// If set, only run these rules (ignore all others)
    pub only_rules: Option<Vec<String>>,

    pub skip_rules: Vec<String>,

    /// Replaces the configured version range for this file.
    pub php_version: Option<VersionRange>,
}

impl TestConfig {
    /// Parse test configuration from the first 20 lines of `source`:
    ///
    /// ```text
    /// // php-compat-test: only-rules=functions/new_functions,parameters/new_parameters
    /// // php-compat-test: skip-rules=syntax/named_arguments
    /// // php-compat-test: php-version=5.6-7.4
    /// ```
    pub fn from_source(source: &str) -> Self {
        let mut config = TestConfig::default();

        for line in source.lines().take(20) {
            if let Some(directive) = line.trim().strip_prefix(PREFIX) {
                config.parse_directive(directive.trim());
            }
        }

        config
    }

    fn parse_directive(&mut self, directive: &str) {
        if let Some(rules_str) = directive.strip_prefix("only-rules=") {
            let rules = split_rules(rules_str);
            if !rules.is_empty() {
                self.only_rules = Some(rules);
            }
        } else if let Some(rules_str) = directive.strip_prefix("skip-rules=") {
            self.skip_rules.extend(split_rules(rules_str));
        } else if let Some(notation) = directive.strip_prefix("php-version=") {
            match VersionRange::parse(notation) {
                Ok(range) => self.php_version = Some(range),
                Err(err) => warn!(%err, "ignoring php-version test directive"),
            }
        }
    }

    /// Check if a rule should run based on this test config
    pub fn should_run_rule(&self, rule_name: &str) -> bool {
        if self.skip_rules.iter().any(|r| r == rule_name) {
            return false;
        }

        if let Some(ref only_rules) = self.only_rules {
            return only_rules.iter().any(|r| r == rule_name);
        }

        true
    }

    /// Check if this is a test file (has test config directives)
    pub fn is_test_file(&self) -> bool {
        self.only_rules.is_some() || !self.skip_rules.is_empty() || self.php_version.is_some()
    }
}

fn split_rules(rules: &str) -> Vec<String> {
    rules
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
