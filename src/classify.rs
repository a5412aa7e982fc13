//! Line classification and field extraction.
//!
//! Lines are classified in a single pass as they arrive. The verdict is a
//! mutable cell: every line matching the result pattern overwrites it, so the
//! last matching line decides the run.
use crate::record::{Field, RunExit, RunRecord, Verdict};
use regex::Regex;

/// A `[parse]` pattern with at least one named group.
#[derive(Debug, Clone)]
pub struct CapturePattern {
    pub key: String,
    regex: Regex,
    names: Vec<String>,
}

impl CapturePattern {
    /// Returns `None` when the pattern has no named group to extract.
    pub fn new(key: impl Into<String>, regex: Regex) -> Option<Self> {
        let names: Vec<String> = regex.capture_names().flatten().map(str::to_string).collect();
        if names.is_empty() {
            return None;
        }
        Some(Self {
            key: key.into(),
            regex,
            names,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn extract(&self, line: &str, fields: &mut Vec<Field>) {
        let Some(caps) = self.regex.captures(line) else {
            return;
        };
        for name in &self.names {
            if let Some(value) = caps.name(name) {
                fields.push(Field::new(name.as_str(), value.as_str()));
            }
        }
    }
}

/// Compiled patterns applied to every output line.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub result: Regex,
    pub outcome: Regex,
    pub captures: Vec<CapturePattern>,
}

/// Accumulates the verdict and fields for one run.
#[derive(Debug)]
pub struct LineClassifier<'a> {
    patterns: &'a PatternSet,
    verdict: Verdict,
    fields: Vec<Field>,
}

impl<'a> LineClassifier<'a> {
    pub fn new(patterns: &'a PatternSet) -> Self {
        Self {
            patterns,
            verdict: Verdict::Unknown,
            fields: Vec::new(),
        }
    }

    pub fn observe(&mut self, line: &str) {
        for capture in &self.patterns.captures {
            capture.extract(line, &mut self.fields);
        }
        if !self.patterns.result.is_match(line) {
            return;
        }
        self.verdict = if self.patterns.outcome.is_match(line) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
    }

    pub fn finish(self, index: usize, output: Vec<String>, exit: RunExit) -> RunRecord {
        RunRecord {
            index,
            verdict: self.verdict,
            output,
            fields: self.fields,
            exit,
        }
    }
}

/// Classify an already captured line sequence.
#[cfg(test)]
pub(crate) fn classify_output(
    patterns: &PatternSet,
    index: usize,
    output: Vec<String>,
    exit: RunExit,
) -> RunRecord {
    let mut classifier = LineClassifier::new(patterns);
    for line in &output {
        classifier.observe(line);
    }
    classifier.finish(index, output, exit)
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
