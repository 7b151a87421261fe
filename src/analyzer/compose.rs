//! Turns resolved lifecycle hits into a message, a severity and an error code.

use super::Severity;
use super::features::{ArityHit, IntroductionGap, RemovalHit};
use super::version::Version;

const NEW_FUNCTION: &str = "The function %1$s() is not present in PHP version %3$s or earlier";
const NEW_PARAMETER: &str =
    "The function %1$s() does not have a parameter \"%2$s\" in PHP version %3$s or earlier";
const NEW_FUNCTION_BEFORE: &str =
    "The function %1$s() is not present in PHP versions earlier than %3$s";
const NEW_PARAMETER_BEFORE: &str = "The function %1$s() does not have a parameter \"%2$s\" in PHP versions earlier than %3$s";
const FUNCTION_SUBJECT: &str = "Function %1$s()";
const PARAMETER_SUBJECT: &str = "The \"%2$s\" parameter for function %1$s()";
const DEPRECATED_CLAUSE: &str = " is deprecated since PHP %3$s";
const REMOVED_AFTER_DEPRECATION_CLAUSE: &str = " and is removed since PHP %4$s";
const REMOVED_CLAUSE: &str = " is removed since PHP %4$s";
const STILL_REQUIRED: &str = " is missing, but was required for PHP version %3$s and lower";
const NO_LONGER_OPTIONAL: &str = " is missing. Passing this parameter is no longer optional. The optional nature of the parameter is %4$s since PHP %3$s";
const RECOMMENDED: &str =
    " is missing. Passing this parameter is strongly recommended since PHP %3$s";
const NAMED_ARGUMENTS: &str = "Using named arguments in function calls is not supported in PHP %3$s or earlier. Found: \"%2$s\" passed to %1$s()";
const NAMED_ARGUMENTS_BEFORE: &str = "Using named arguments in function calls is not supported in PHP versions earlier than %3$s. Found: \"%2$s\" passed to %1$s()";
const ALTERNATIVE: &str = "; Use %s instead";

/// A finding ready to be anchored in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// What a finding is about.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    /// Function name as written at the call site.
    pub display: &'a str,
    /// Lowercase lookup key; error codes are built from it.
    pub key: &'a str,
    pub parameter: Option<&'a str>,
}

impl<'a> Subject<'a> {
    pub fn function(display: &'a str, key: &'a str) -> Self {
        Self {
            display,
            key,
            parameter: None,
        }
    }

    pub fn parameter(display: &'a str, key: &'a str, parameter: &'a str) -> Self {
        Self {
            display,
            key,
            parameter: Some(parameter),
        }
    }

    fn template(&self, function: &'static str, parameter: &'static str) -> &'static str {
        if self.parameter.is_some() { parameter } else { function }
    }
}

/// Which fact an error code stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSuffix {
    Found,
    Deprecated,
    Removed,
    DeprecatedRemoved,
    Missing,
    SoftRequired,
    HardRequired,
    SoftRecommended,
}

impl CodeSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "Found",
            Self::Deprecated => "Deprecated",
            Self::Removed => "Removed",
            Self::DeprecatedRemoved => "DeprecatedRemoved",
            Self::Missing => "Missing",
            Self::SoftRequired => "SoftRequired",
            Self::HardRequired => "HardRequired",
            Self::SoftRecommended => "SoftRecommended",
        }
    }
}

/// Expands `%s` (sequential) and `%N$s` (one-based indexed) placeholders.
/// Missing slots expand to nothing and `%%` is a literal percent sign.
pub fn fill_template(template: &str, slots: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut sequential = 0;
    let mut rest = template;

    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];

        if let Some(after) = tail.strip_prefix('s') {
            out.push_str(slots.get(sequential).copied().unwrap_or(""));
            sequential += 1;
            rest = after;
            continue;
        }

        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
            continue;
        }

        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && tail[digits..].starts_with("$s") {
            let slot = tail[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|slot| slot.checked_sub(1))
                .and_then(|idx| slots.get(idx))
                .copied()
                .unwrap_or("");
            out.push_str(slot);
            rest = &tail[digits + 2..];
        } else {
            out.push('%');
            rest = tail;
        }
    }

    out.push_str(rest);
    out
}

/// Builds a stable error code: sanitized function key, `_` and the sanitized
/// parameter name for parameter findings, then the suffix.
pub fn error_code(subject: &Subject<'_>, suffix: CodeSuffix) -> String {
    let mut code = sanitize(subject.key);
    if let Some(parameter) = subject.parameter {
        code.push('_');
        code.push_str(&sanitize(parameter));
    }
    code.push_str(suffix.as_str());
    code
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn slots<'a>(subject: &Subject<'a>, third: &'a str, fourth: &'a str) -> [&'a str; 4] {
    [subject.display, subject.parameter.unwrap_or(""), third, fourth]
}

fn with_alternative(mut message: String, alternative: Option<&str>) -> String {
    if let Some(alternative) = alternative.map(str::trim).filter(|alt| !alt.is_empty()) {
        message.push_str(&fill_template(ALTERNATIVE, &[alternative]));
    }
    message
}

pub fn compose_introduction(
    subject: &Subject<'_>,
    gap: &IntroductionGap<'_>,
    alternative: Option<&str>,
) -> Composed {
    let (template, version) = match gap {
        IntroductionGap::AbsentIn { version, .. } => {
            (subject.template(NEW_FUNCTION, NEW_PARAMETER), version.to_string())
        }
        IntroductionGap::Before(version) => (
            subject.template(NEW_FUNCTION_BEFORE, NEW_PARAMETER_BEFORE),
            version.to_string(),
        ),
    };
    let message = fill_template(template, &slots(subject, &version, ""));

    Composed {
        severity: Severity::Error,
        code: error_code(subject, CodeSuffix::Found),
        message: with_alternative(message, alternative),
    }
}

pub fn compose_removal(
    subject: &Subject<'_>,
    hit: &RemovalHit<'_>,
    alternative: Option<&str>,
) -> Composed {
    let deprecated = hit.deprecated_in.map(Version::to_string).unwrap_or_default();
    let removed = hit.removed_in.map(Version::to_string).unwrap_or_default();

    let mut template = subject
        .template(FUNCTION_SUBJECT, PARAMETER_SUBJECT)
        .to_owned();
    let suffix = match (hit.deprecated_in.is_some(), hit.removed_in.is_some()) {
        (true, true) => {
            template.push_str(DEPRECATED_CLAUSE);
            template.push_str(REMOVED_AFTER_DEPRECATION_CLAUSE);
            CodeSuffix::DeprecatedRemoved
        }
        (false, true) => {
            template.push_str(REMOVED_CLAUSE);
            CodeSuffix::Removed
        }
        _ => {
            template.push_str(DEPRECATED_CLAUSE);
            CodeSuffix::Deprecated
        }
    };

    let severity = if hit.is_removal() {
        Severity::Error
    } else {
        Severity::Warning
    };
    let message = fill_template(&template, &slots(subject, &deprecated, &removed));

    Composed {
        severity,
        code: error_code(subject, suffix),
        message: with_alternative(message, alternative),
    }
}

pub fn compose_arity(
    subject: &Subject<'_>,
    hit: ArityHit<'_>,
    alternative: Option<&str>,
) -> Composed {
    let (clause, nature, severity, suffix, version) = match hit {
        ArityHit::StillRequired(version) => (
            STILL_REQUIRED,
            "",
            Severity::Error,
            CodeSuffix::Missing,
            version,
        ),
        ArityHit::HardRequired(version) => (
            NO_LONGER_OPTIONAL,
            "removed",
            Severity::Error,
            CodeSuffix::HardRequired,
            version,
        ),
        ArityHit::SoftRequired(version) => (
            NO_LONGER_OPTIONAL,
            "deprecated",
            Severity::Warning,
            CodeSuffix::SoftRequired,
            version,
        ),
        ArityHit::Recommended(version) => (
            RECOMMENDED,
            "",
            Severity::Warning,
            CodeSuffix::SoftRecommended,
            version,
        ),
    };

    let version = version.to_string();
    let template = format!("{PARAMETER_SUBJECT}{clause}");
    let message = fill_template(&template, &slots(subject, &version, nature));

    Composed {
        severity,
        code: error_code(subject, suffix),
        message: with_alternative(message, alternative),
    }
}

/// `subject.parameter` holds the argument label as written.
pub fn compose_named_argument(subject: &Subject<'_>, gap: &IntroductionGap<'_>) -> Composed {
    let (template, version) = match gap {
        IntroductionGap::AbsentIn { version, .. } => (NAMED_ARGUMENTS, version.to_string()),
        IntroductionGap::Before(version) => (NAMED_ARGUMENTS_BEFORE, version.to_string()),
    };
    let message = fill_template(template, &slots(subject, &version, ""));

    Composed {
        severity: Severity::Error,
        code: format!("named_arguments{}", CodeSuffix::Found.as_str()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn fills_sequential_and_indexed_placeholders() {
        assert_eq!(fill_template("%s and %s", &["a", "b"]), "a and b");
        assert_eq!(fill_template("%2$s before %1$s", &["a", "b"]), "b before a");
        assert_eq!(fill_template("100%% of %3$s", &["a"]), "100% of ");
        assert_eq!(fill_template("trailing %", &[]), "trailing %");
        assert_eq!(fill_template("%d stays", &["x"]), "%d stays");
    }

    #[test]
    fn error_codes_are_sanitized() {
        let subject = Subject::parameter("Array_Filter", "array_filter", "mode");
        assert_eq!(error_code(&subject, CodeSuffix::Found), "array_filter_modeFound");

        let odd = Subject::function("my-func", "my-func");
        assert_eq!(error_code(&odd, CodeSuffix::Removed), "my_funcRemoved");
    }

    #[test]
    fn introduction_messages_name_the_symbol_and_parameter() {
        let absent = v("5.5");
        let present = v("5.6");
        let gap = IntroductionGap::AbsentIn {
            version: &absent,
            introduced_in: Some(&present),
        };

        let composed = compose_introduction(
            &Subject::parameter("array_filter", "array_filter", "mode"),
            &gap,
            None,
        );
        assert_eq!(composed.severity, Severity::Error);
        assert_eq!(
            composed.message,
            "The function array_filter() does not have a parameter \"mode\" in PHP version 5.5 or earlier"
        );

        let composed =
            compose_introduction(&Subject::function("Str_Contains", "str_contains"), &gap, None);
        assert_eq!(composed.code, "str_containsFound");
        assert!(composed.message.contains("Str_Contains()"));
    }

    #[test]
    fn gaps_known_only_by_their_introduction_read_earlier_than() {
        let present = v("8.0");
        let gap = IntroductionGap::Before(&present);

        let composed =
            compose_introduction(&Subject::function("str_contains", "str_contains"), &gap, None);
        assert_eq!(composed.code, "str_containsFound");
        assert_eq!(
            composed.message,
            "The function str_contains() is not present in PHP versions earlier than 8.0"
        );

        let composed = compose_introduction(
            &Subject::parameter("array_filter", "array_filter", "mode"),
            &gap,
            None,
        );
        assert_eq!(
            composed.message,
            "The function array_filter() does not have a parameter \"mode\" in PHP versions earlier than 8.0"
        );
    }

    #[test]
    fn removal_severity_and_clauses() {
        let deprecated = v("7.2");
        let removed = v("8.0");
        let subject = Subject::function("create_function", "create_function");

        let warning = compose_removal(
            &subject,
            &RemovalHit {
                deprecated_in: Some(&deprecated),
                removed_in: None,
            },
            Some("an anonymous function"),
        );
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.code, "create_functionDeprecated");
        assert_eq!(
            warning.message,
            "Function create_function() is deprecated since PHP 7.2; Use an anonymous function instead"
        );

        let error = compose_removal(
            &subject,
            &RemovalHit {
                deprecated_in: Some(&deprecated),
                removed_in: Some(&removed),
            },
            Some("an anonymous function"),
        );
        assert_eq!(error.severity, Severity::Error);
        assert_eq!(error.code, "create_functionDeprecatedRemoved");
        assert_eq!(
            error.message,
            "Function create_function() is deprecated since PHP 7.2 and is removed since PHP 8.0; Use an anonymous function instead"
        );

        let removed_only = compose_removal(
            &Subject::parameter("curl_version", "curl_version", "age"),
            &RemovalHit {
                deprecated_in: None,
                removed_in: Some(&removed),
            },
            Some("   "),
        );
        assert_eq!(removed_only.code, "curl_version_ageRemoved");
        assert_eq!(
            removed_only.message,
            "The \"age\" parameter for function curl_version() is removed since PHP 8.0"
        );
    }

    #[test]
    fn arity_findings_pick_their_own_wording() {
        let subject = Subject::parameter("crypt", "crypt", "salt");
        let version = v("8.0");

        let hard = compose_arity(&subject, ArityHit::HardRequired(&version), None);
        assert_eq!(hard.severity, Severity::Error);
        assert_eq!(hard.code, "crypt_saltHardRequired");
        assert!(hard.message.ends_with("is removed since PHP 8.0"));

        let soft = compose_arity(&subject, ArityHit::SoftRequired(&version), None);
        assert_eq!(soft.severity, Severity::Warning);
        assert!(soft.message.ends_with("is deprecated since PHP 8.0"));

        let recommended = compose_arity(&subject, ArityHit::Recommended(&version), None);
        assert_eq!(recommended.severity, Severity::Warning);
        assert_eq!(recommended.code, "crypt_saltSoftRecommended");

        let missing = compose_arity(
            &Subject::parameter("getenv", "getenv", "name"),
            ArityHit::StillRequired(&v("7.0")),
            None,
        );
        assert_eq!(
            missing.message,
            "The \"name\" parameter for function getenv() is missing, but was required for PHP version 7.0 and lower"
        );
    }

    #[test]
    fn named_argument_message() {
        let absent = v("7.4");
        let gap = IntroductionGap::AbsentIn {
            version: &absent,
            introduced_in: None,
        };
        let composed = compose_named_argument(&Subject::parameter("foo", "foo", "bar"), &gap);
        assert_eq!(composed.code, "named_argumentsFound");
        assert_eq!(
            composed.message,
            "Using named arguments in function calls is not supported in PHP 7.4 or earlier. Found: \"bar\" passed to foo()"
        );
    }
}
