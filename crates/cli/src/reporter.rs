//! Console progress output for pipeline runs.

use lampoon_core::pipeline::{EventKind, PipelineEvent, Reporter};

/// Prints one line per interesting pipeline event
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    /// Also print gate and collision details
    pub detailed: bool,
}

impl ConsoleReporter {
    pub fn new(detailed: bool) -> Self {
        Self { detailed }
    }

    pub fn render(&self, event: &PipelineEvent) -> Option<String> {
        let message = event.message.as_deref().unwrap_or("");
        let line = match event.kind {
            EventKind::RunStarted => format!("🚀 {}", message),
            EventKind::RunResumed => format!("🔄 {}", message),
            EventKind::StepStarted => format!("▶️  {}", message),
            EventKind::StepCompleted => format!("   ✅ {}", message),
            EventKind::AgentFallback => format!("   ⚠️  {}", message),
            EventKind::KeyCollision if self.detailed => format!("   ⚠️  {}", message),
            EventKind::GateOpened if self.detailed => {
                format!("   👤 Waiting for confirmation on {}", step_name(event))
            }
            EventKind::GateResolved => format!("   👤 {}", message),
            EventKind::RunPaused => format!("⏸️  {}", message),
            EventKind::RunCancelled => format!("🛑 Cancelled at {}: {}", step_name(event), message),
            EventKind::RunFailed => format!("❌ {} failed: {}", step_name(event), message),
            EventKind::RunCompleted => format!("🎉 {}", message),
            _ => return None,
        };
        Some(line)
    }
}

fn step_name(event: &PipelineEvent) -> &str {
    event
        .label
        .as_deref()
        .or(event.step_id.as_deref())
        .unwrap_or("step")
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &PipelineEvent) {
        if let Some(line) = self.render(event) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampoon_core::state::StepSpec;

    #[test]
    fn test_render_step_events() {
        let reporter = ConsoleReporter::new(false);
        let step = StepSpec::new("editor").with_id("edit");

        let started = PipelineEvent::for_step(EventKind::StepStarted, 0, &step)
            .with_message("Step 1/1: edit");
        assert_eq!(reporter.render(&started).unwrap(), "▶️  Step 1/1: edit");

        let failed = PipelineEvent::for_step(EventKind::RunFailed, 0, &step)
            .with_message("disk on fire");
        assert_eq!(
            reporter.render(&failed).unwrap(),
            "❌ edit failed: disk on fire"
        );
    }

    #[test]
    fn test_detail_events_hidden_by_default() {
        let step = StepSpec::new("editor");
        let opened = PipelineEvent::for_step(EventKind::GateOpened, 0, &step);

        assert!(ConsoleReporter::new(false).render(&opened).is_none());
        assert!(ConsoleReporter::new(true)
            .render(&opened)
            .unwrap()
            .contains("editor"));
    }
}
