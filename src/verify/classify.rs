// SPDX-License-Identifier: PMPL-1.0-or-later

//! Verifier output classification
//!
//! Verdicts are recognised through an explicit table of whole phrases, each
//! anchored at the start of a line and terminated by a non-word character, so
//! a "NOT satisfied" line can never be read as "satisfied".

use super::{ExitKind, Invocation};
use crate::types::Outcome;
use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    NotSatisfied,
}

/// Phrases printed by verifypn and verifyta, one per query
pub const VERDICT_PHRASES: &[(&str, Verdict)] = &[
    ("Query is satisfied", Verdict::Satisfied),
    ("Query is NOT satisfied", Verdict::NotSatisfied),
    ("Formula is satisfied", Verdict::Satisfied),
    ("Formula is NOT satisfied", Verdict::NotSatisfied),
    ("Property is satisfied", Verdict::Satisfied),
    ("Property is NOT satisfied", Verdict::NotSatisfied),
];

/// Exit codes a wrapping `timeout` or a SIGKILL'd container report.
const TIMEOUT_EXIT_CODES: &[i32] = &[124, 137];
const SIGKILL: i32 = 9;

pub struct OutcomeClassifier {
    table: Vec<(Regex, Verdict)>,
}

impl OutcomeClassifier {
    pub fn new() -> Result<Self> {
        let table = VERDICT_PHRASES
            .iter()
            .map(|(phrase, verdict)| {
                let pattern = format!(r"(?m)^\s*{}(?:[^\w]|$)", regex::escape(phrase));
                Regex::new(&pattern)
                    .with_context(|| format!("compiling verdict pattern for '{}'", phrase))
                    .map(|re| (re, *verdict))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { table })
    }

    /// Every verdict reported in `output`, in no particular order.
    pub fn verdicts(&self, output: &str) -> Vec<Verdict> {
        let mut found = Vec::new();
        for (re, verdict) in &self.table {
            for _ in re.find_iter(output) {
                found.push(*verdict);
            }
        }
        found
    }

    /// Map one invocation to its terminal state.
    ///
    /// Timeouts win over everything; otherwise the verdict lines decide, and
    /// a run without any verdict is an error whatever its exit status.
    pub fn classify(&self, invocation: &Invocation) -> Outcome {
        match invocation.exit {
            ExitKind::TimedOut => return Outcome::Timeout,
            ExitKind::Exited(code) if TIMEOUT_EXIT_CODES.contains(&code) => {
                return Outcome::Timeout
            }
            ExitKind::Signaled(Some(SIGKILL)) => return Outcome::Timeout,
            ExitKind::SpawnFailed(_) => return Outcome::Error,
            _ => {}
        }

        let mut verdicts = self.verdicts(&invocation.stdout);
        verdicts.extend(self.verdicts(&invocation.stderr));

        if verdicts.is_empty() {
            Outcome::Error
        } else if verdicts.contains(&Verdict::NotSatisfied) {
            Outcome::Unsat
        } else {
            Outcome::Sat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn invocation(exit: ExitKind, stdout: &str) -> Invocation {
        Invocation {
            command: "verifyta".to_string(),
            exit,
            stdout: stdout.to_string(),
            stderr: String::new(),
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn test_satisfied_phrase() {
        let c = OutcomeClassifier::new().unwrap();
        let inv = invocation(ExitKind::Exited(0), "Verifying...\nQuery is satisfied.\n");
        assert_eq!(c.classify(&inv), Outcome::Sat);
    }

    #[test]
    fn test_not_satisfied_is_never_sat() {
        let c = OutcomeClassifier::new().unwrap();
        // verifypn exits 1 for a negative answer
        let inv = invocation(ExitKind::Exited(1), "Query is NOT satisfied\n");
        assert_eq!(c.classify(&inv), Outcome::Unsat);
        assert_eq!(c.verdicts("Query is NOT satisfied"), vec![Verdict::NotSatisfied]);
    }

    #[test]
    fn test_bare_word_is_not_a_verdict() {
        let c = OutcomeClassifier::new().unwrap();
        let inv = invocation(
            ExitKind::Exited(0),
            "constraints satisfied during parsing\nnot satisfied: trace unavailable\n",
        );
        assert_eq!(c.classify(&inv), Outcome::Error);
    }

    #[test]
    fn test_phrase_must_end_at_word_boundary() {
        let c = OutcomeClassifier::new().unwrap();
        assert!(c.verdicts("Query is satisfiedish").is_empty());
        assert_eq!(c.verdicts("  Formula is satisfied"), vec![Verdict::Satisfied]);
    }

    #[test]
    fn test_mixed_verdicts_are_unsat() {
        let c = OutcomeClassifier::new().unwrap();
        let inv = invocation(
            ExitKind::Exited(0),
            "Formula is satisfied.\nFormula is NOT satisfied.\nFormula is satisfied.\n",
        );
        assert_eq!(c.classify(&inv), Outcome::Unsat);
    }

    #[test]
    fn test_timeouts() {
        let c = OutcomeClassifier::new().unwrap();
        assert_eq!(c.classify(&invocation(ExitKind::TimedOut, "")), Outcome::Timeout);
        assert_eq!(c.classify(&invocation(ExitKind::Exited(124), "")), Outcome::Timeout);
        assert_eq!(c.classify(&invocation(ExitKind::Exited(137), "")), Outcome::Timeout);
        assert_eq!(
            c.classify(&invocation(ExitKind::Signaled(Some(9)), "")),
            Outcome::Timeout
        );
        // a deadline hit wins even if a verdict was already printed
        assert_eq!(
            c.classify(&invocation(ExitKind::TimedOut, "Query is satisfied")),
            Outcome::Timeout
        );
    }

    #[test]
    fn test_errors() {
        let c = OutcomeClassifier::new().unwrap();
        assert_eq!(
            c.classify(&invocation(ExitKind::SpawnFailed("no such file".into()), "")),
            Outcome::Error
        );
        assert_eq!(
            c.classify(&invocation(ExitKind::Exited(2), "parse error in model")),
            Outcome::Error
        );
        assert_eq!(
            c.classify(&invocation(ExitKind::Signaled(Some(11)), "")),
            Outcome::Error
        );
    }

    #[test]
    fn test_verdict_on_stderr_counts() {
        let c = OutcomeClassifier::new().unwrap();
        let mut inv = invocation(ExitKind::Exited(0), "");
        inv.stderr = "Query is satisfied\n".to_string();
        assert_eq!(c.classify(&inv), Outcome::Sat);
    }
}
