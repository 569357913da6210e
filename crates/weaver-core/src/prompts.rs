//! Prompt builders for the report workflow
//!
//! One builder per workflow step. Every prompt embeds the shared data
//! context so each agent knows which datasets exist and how they were
//! produced.

/// Shared context describing the datasets behind every report
pub fn data_sources_context() -> String {
    "## Data context\n\
     The analysis covers a synthetic epidemiological corpus generated with \
     a seeded random number generator (seed 42) for reproducibility:\n\
     - Global screen-time trends, 2010-2024, by region\n\
     - Age-stratified vulnerability (children, adolescents, adults, seniors)\n\
     - Platform comparison (social, video, gaming, messaging)\n\
     - Causal mechanism indicators (sleep, mood, activity displacement)\n\
     - Disease-onset timelines for depression, anxiety, and sleep disorders\n\
     - Socioeconomic disparity measures\n\
     - Digital-detox recovery trajectories\n\
     All values follow research-based distributions with deliberate \
     non-linear dose-response patterns; treat them as illustrative, not \
     as primary evidence.\n"
        .to_string()
}

/// Step 1: research framework and hypotheses
pub fn initialization_prompt() -> String {
    format!(
        "{}\n\
         Lay out the research framework for a screen-time and health \
         analytics report. State the guiding questions, the hypotheses \
         worth testing against the datasets above, the confounders to \
         watch for, and the order in which the analysis should proceed. \
         Finish with the acceptance criteria for calling the analysis \
         complete.",
        data_sources_context()
    )
}

/// Step 2: statistical analysis of the datasets
pub fn analysis_prompt(data_summary: &str) -> String {
    format!(
        "{}\n\
         ## Dataset summary\n{}\n\n\
         Conduct the epidemiological analysis: dose-response relationships \
         between daily screen hours and each health outcome, age-group \
         vulnerability ranking, platform-level differences, and where the \
         non-linear thresholds sit. Quantify effect sizes, state \
         uncertainty plainly, and end with the five findings most relevant \
         to policy.",
        data_sources_context(),
        data_summary
    )
}

/// Step 3 (parallel): chart and dashboard design
pub fn visualization_prompt(analysis: &str) -> String {
    format!(
        "{}\n\
         ## Analysis findings\n{}\n\n\
         Design the visualization suite for these findings: for each \
         finding propose a chart type, the variables on each axis, the \
         annotations that carry the message, and an accessibility note. \
         Group the charts into dashboard tabs and explain the narrative \
         order a reader should follow.",
        data_sources_context(),
        analysis
    )
}

/// Step 4 (parallel): mechanism explanation
pub fn health_insights_prompt(analysis: &str) -> String {
    format!(
        "{}\n\
         ## Analysis findings\n{}\n\n\
         Explain the causal mechanisms plausibly behind these statistical \
         patterns: which pathways (sleep disruption, social comparison, \
         activity displacement, attention fragmentation) best account for \
         each finding, what the strength of evidence is for each, and \
         which findings remain correlational. Close with the open research \
         questions.",
        data_sources_context(),
        analysis
    )
}

/// Step 5: policy recommendations
pub fn policy_prompt(health_findings: &str) -> String {
    format!(
        "{}\n\
         ## Health findings\n{}\n\n\
         Draft policy recommendations grounded in these findings. For each \
         recommendation give the target population, the intervention, the \
         expected effect, the measurable evaluation criterion, and the \
         feasibility. Rank the list and mark any recommendation where the \
         evidence base is too weak to act on yet.",
        data_sources_context(),
        health_findings
    )
}

/// Step 6: final integrated report
pub fn report_prompt(analysis: &str, health_findings: &str, policy: &str) -> String {
    format!(
        "{}\n\
         ## Analysis summary\n{}\n\n\
         ## Health findings\n{}\n\n\
         ## Policy recommendations\n{}\n\n\
         Write the final integrated report: executive summary, key \
         findings with effect sizes, mechanism explanations, policy \
         recommendations, limitations of the synthetic data, and next \
         steps. Keep it self-contained so a reader needs no other \
         artifact.",
        data_sources_context(),
        analysis,
        health_findings,
        policy
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_substantive() {
        assert!(data_sources_context().len() > 500);
    }

    #[test]
    fn test_initialization_prompt_embeds_context() {
        let prompt = initialization_prompt();
        assert!(prompt.len() > 1000);
        assert!(prompt.contains("Data context"));
        assert!(prompt.contains("research framework"));
    }

    #[test]
    fn test_step_prompts_carry_their_inputs() {
        assert!(analysis_prompt("SUMMARY-MARKER").contains("SUMMARY-MARKER"));
        assert!(visualization_prompt("VIZ-MARKER").contains("VIZ-MARKER"));
        assert!(health_insights_prompt("HEALTH-MARKER").contains("HEALTH-MARKER"));
        assert!(policy_prompt("POLICY-MARKER").contains("POLICY-MARKER"));
        let report = report_prompt("A", "B", "C");
        assert!(report.contains("## Analysis summary\nA"));
        assert!(report.contains("## Health findings\nB"));
        assert!(report.contains("## Policy recommendations\nC"));
    }
}
