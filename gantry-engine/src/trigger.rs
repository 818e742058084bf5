// Trigger Evaluation
// Decides whether a declaration runs for a delivered repository event

use crate::parser::models::{PipelineEvent, Trigger};

/// Gate for incoming repository events.
///
/// A pipeline only runs when the delivered event's kind appears in its
/// declared trigger set. A non-matching event skips the run entirely, so
/// no instances are expanded and no results are recorded for it.
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    /// Check whether the declared triggers admit the event
    pub fn should_run(trigger: &Trigger, event: &PipelineEvent) -> bool {
        trigger.declares(event.kind)
    }

    /// Human-readable reason for a skipped run
    pub fn skip_reason(trigger: &Trigger, event: &PipelineEvent) -> String {
        let declared: Vec<String> = trigger.kinds().iter().map(|k| k.to_string()).collect();
        format!(
            "event '{}' is not in the declared trigger set [{}]",
            event.kind,
            declared.join(", ")
        )
    }
}
