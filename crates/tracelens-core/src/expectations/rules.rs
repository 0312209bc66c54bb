use super::Observation;
use crate::model::Severity;

/// A single configured rule. Each variant carries a fixed severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    MustNotInclude(Vec<String>),
    MustInclude(Vec<String>),
    MaxLatencyMs(u64),
    MinTokens(u64),
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::MustNotInclude(_) => "must_not_include",
            Rule::MustInclude(_) => "must_include",
            Rule::MaxLatencyMs(_) => "max_latency_ms",
            Rule::MinTokens(_) => "min_tokens",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Rule::MustNotInclude(_) => Severity::High,
            Rule::MustInclude(_) => Severity::Low,
            Rule::MaxLatencyMs(_) => Severity::Medium,
            Rule::MinTokens(_) => Severity::Low,
        }
    }

    /// Returns the violation message, or `None` if the rule holds.
    pub fn check(&self, obs: &Observation<'_>) -> Option<String> {
        match self {
            Rule::MustNotInclude(forbidden) => {
                let haystack = obs.text.to_lowercase();
                let found = matching(forbidden, |needle| haystack.contains(needle));
                (!found.is_empty()).then(|| format!("{}: found {}", self.name(), quoted(&found)))
            }
            Rule::MustInclude(required) => {
                let haystack = obs.text.to_lowercase();
                let missing = matching(required, |needle| !haystack.contains(needle));
                (!missing.is_empty())
                    .then(|| format!("{}: missing {}", self.name(), quoted(&missing)))
            }
            Rule::MaxLatencyMs(max) => (obs.latency_ms > *max).then(|| {
                format!(
                    "{}: latency {}ms exceeds max {}ms",
                    self.name(),
                    obs.latency_ms,
                    max
                )
            }),
            Rule::MinTokens(min) => (obs.token_count < *min).then(|| {
                format!(
                    "{}: response has {} tokens, expected at least {}",
                    self.name(),
                    obs.token_count,
                    min
                )
            }),
        }
    }
}

fn matching<'a>(entries: &'a [String], pred: impl Fn(&str) -> bool) -> Vec<&'a str> {
    entries
        .iter()
        .filter(|entry| pred(&entry.to_lowercase()))
        .map(String::as_str)
        .collect()
}

fn quoted(entries: &[&str]) -> String {
    entries
        .iter()
        .map(|e| format!("'{e}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
