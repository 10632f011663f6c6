//! Two-step vision repair (4.I): a diagnosis model inspects the screenshot
//! and validation report, then a repair model rewrites the document per that
//! diagnosis, carrying forward a history of previously-failed attempts so it
//! doesn't repeat them. Used by the custom-layout pipeline (4.J) when
//! deterministic + LLM-patch repair doesn't suffice, or when a structural
//! rethink is needed rather than a surgical class/JS patch.

mod analyzer;
mod cleaner;
mod contracts;
mod line_annotator;
mod prompts;
mod repair;

pub use analyzer::VisionAnalyzer;
pub use contracts::{DiagnosisResult, ElementDiagnosis, RepairAttempt, RepairResult, VisionRepairContext};
pub use repair::VisionRepairer;

use provider::Provider;

/// Convenience orchestrator running Step 1 then Step 2 against the same
/// provider. The pipeline is free to use [`VisionAnalyzer`] / [`VisionRepairer`]
/// directly instead when it wants different providers per step.
pub struct VisionRepair<'a> {
    analyzer: VisionAnalyzer<'a>,
    repairer: VisionRepairer<'a>,
}

impl<'a> VisionRepair<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            analyzer: VisionAnalyzer::new(provider),
            repairer: VisionRepairer::new(provider),
        }
    }

    pub fn with_monitor(mut self, monitor: &'a monitor::Monitor) -> Self {
        self.analyzer = self.analyzer.with_monitor(monitor);
        self.repairer = self.repairer.with_monitor(monitor);
        self
    }

    /// Runs both steps and returns the final [`RepairResult`], along with the
    /// diagnosis that produced it (useful for diagnostics/logging upstream).
    pub async fn run(&self, request_id: &str, context: &VisionRepairContext) -> (DiagnosisResult, RepairResult) {
        let diagnosis = self.analyzer.analyze(request_id, context).await;
        let repair = self.repairer.repair(request_id, context, &diagnosis).await;
        (diagnosis, repair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ProviderTier;
    use provider::MockProvider;

    #[tokio::test]
    async fn end_to_end_diagnosis_then_repair() {
        let diagnosis_response = r#"[{"selector":"#go","line_number":1,"problem":"no feedback","concrete_fix":"add background-color: #1e90ff"}]"#;
        let repaired_doc = "<!DOCTYPE html><html><head></head><body><button id=\"go\" class=\"bg-[#1e90ff]\">Go</button></body></html>";
        let provider = MockProvider::with_sequence(ProviderTier::Reasoner, vec![diagnosis_response.to_string(), repaired_doc.to_string()]);

        let vision_repair = VisionRepair::new(&provider);
        let context = VisionRepairContext::new("<!DOCTYPE html><html><head></head><body><button id=\"go\">Go</button></body></html>");
        let (diagnosis, repair) = vision_repair.run("r1", &context).await;

        assert!(diagnosis.success);
        assert!(repair.success);
        assert!(repair.html.contains("bg-[#1e90ff]"));
    }
}
