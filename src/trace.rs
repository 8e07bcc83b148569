//! Per-pass trace of an expansion, for debugging templates
use serde::{Deserialize, Serialize};

/// The rewrite passes the driver runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Comment stripping before the loop
    Comments,

    /// `$name=value`
    Assign,

    /// `$name.method`
    Use,

    /// `__name__`, `<name>` and inline functions
    Reference,

    /// `{a|b}`
    Choice,

    /// `[if trigger: a|b]`
    Conditional,

    /// Prefixes and suffixes of selected entries
    Affixes,

    /// `**text**`
    Negatives,

    /// Whitespace and comma cleanup
    Cleanup,

    /// `@@width=..@@`
    Settings,
}

/// Output of one pass that changed the text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub pass: Pass,

    /// Fixpoint iteration, starting at 1; 0 for passes outside the loop
    pub iteration: usize,

    pub output: String,
}

/// Collects trace steps when enabled
#[derive(Debug, Default)]
pub struct Tracer {
    enabled: bool,
    steps: Vec<TraceStep>,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Tracer {
            enabled,
            steps: Vec::new(),
        }
    }

    /// Record `output` if tracing is on and the pass changed `input`
    pub fn record(&mut self, pass: Pass, iteration: usize, input: &str, output: &str) {
        if !self.enabled || input == output {
            return;
        }
        self.steps.push(TraceStep {
            pass,
            iteration,
            output: output.to_string(),
        });
    }

    /// The recorded steps, or `None` when tracing was off
    pub fn finish(self) -> Option<Vec<TraceStep>> {
        self.enabled.then_some(self.steps)
    }
}
