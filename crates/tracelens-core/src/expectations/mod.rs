//! Deterministic expectation rules and the trace-level evaluator.
//!
//! Rules are declared as an [`ExpectationSpec`] (YAML/JSON) and validated
//! into [`Expectations`] up front. Evaluation is exhaustive: every configured
//! rule is checked and every failing rule contributes one violation.

mod rules;

pub use rules::Rule;

use crate::errors::ConfigError;
use crate::model::{TraceResponse, Verdict, VerdictStatus};
use serde::{Deserialize, Serialize};

/// Raw, unvalidated rule configuration as written by users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not_include: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tokens: Option<i64>,
}

/// What the evaluator looks at: the response text, its latency and its size.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub text: &'a str,
    pub latency_ms: u64,
    pub token_count: u64,
}

impl<'a> Observation<'a> {
    pub fn from_response(resp: &'a TraceResponse) -> Self {
        Self {
            text: &resp.text,
            latency_ms: resp.latency_ms,
            token_count: resp.token_count(),
        }
    }
}

/// Validated rule set. Rules are kept in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectations {
    rules: Vec<Rule>,
}

impl Expectations {
    pub fn from_spec(spec: &ExpectationSpec) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();

        if !spec.must_not_include.is_empty() {
            check_substrings("must_not_include", &spec.must_not_include)?;
            rules.push(Rule::MustNotInclude(spec.must_not_include.clone()));
        }
        if !spec.must_include.is_empty() {
            check_substrings("must_include", &spec.must_include)?;
            rules.push(Rule::MustInclude(spec.must_include.clone()));
        }
        if let Some(max) = spec.max_latency_ms {
            let max = u64::try_from(max).map_err(|_| ConfigError::NegativeLatencyBound(max))?;
            rules.push(Rule::MaxLatencyMs(max));
        }
        if let Some(min) = spec.min_tokens {
            let min = u64::try_from(min).map_err(|_| ConfigError::NegativeTokenBound(min))?;
            rules.push(Rule::MinTokens(min));
        }

        Ok(Self { rules })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let spec: ExpectationSpec =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_spec(&spec)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        let mut violations = Vec::new();
        let mut severity = None;

        for rule in &self.rules {
            if let Some(message) = rule.check(obs) {
                violations.push(message);
                severity = severity.max(Some(rule.severity()));
            }
        }

        if violations.is_empty() {
            return Verdict::pass();
        }
        Verdict {
            status: VerdictStatus::Fail,
            severity,
            violations,
        }
    }

    pub fn evaluate_response(&self, resp: &TraceResponse) -> Verdict {
        self.evaluate(&Observation::from_response(resp))
    }
}

fn check_substrings(rule: &'static str, entries: &[String]) -> Result<(), ConfigError> {
    match entries.iter().position(|s| s.is_empty()) {
        Some(index) => Err(ConfigError::EmptySubstring { rule, index }),
        None => Ok(()),
    }
}
