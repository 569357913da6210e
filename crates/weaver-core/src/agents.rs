//! Report agent roles
//!
//! Each role carries a fixed system instruction and sampling temperature.
//! The workflow picks the role per step; the router itself is
//! role-agnostic.

/// The four specialized report agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    DataAnalyst,
    VisualizationExpert,
    HealthResearcher,
    PolicyAdvisor,
}

impl AgentRole {
    /// Human-readable role name used in logs and summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DataAnalyst => "Data Analyst",
            Self::VisualizationExpert => "Visualization Expert",
            Self::HealthResearcher => "Health Researcher",
            Self::PolicyAdvisor => "Policy Advisor",
        }
    }

    /// Sampling temperature for this role's requests
    pub fn temperature(&self) -> f32 {
        match self {
            Self::DataAnalyst => 0.3,
            Self::VisualizationExpert => 0.6,
            Self::HealthResearcher => 0.5,
            Self::PolicyAdvisor => 0.7,
        }
    }

    /// Fixed system instruction for this role
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::DataAnalyst => DATA_ANALYST_SYSTEM_PROMPT,
            Self::VisualizationExpert => VISUALIZATION_EXPERT_SYSTEM_PROMPT,
            Self::HealthResearcher => HEALTH_RESEARCHER_SYSTEM_PROMPT,
            Self::PolicyAdvisor => POLICY_ADVISOR_SYSTEM_PROMPT,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

const DATA_ANALYST_SYSTEM_PROMPT: &str = "\
You are a senior epidemiological data analyst specializing in digital \
wellness research. You work with screen-time and health-outcome datasets \
covering global trends from 2010 to 2024: daily usage hours, depression \
and anxiety prevalence, sleep disorders, and age-stratified vulnerability. \
Report effect sizes and confidence in plain language, call out non-linear \
dose-response patterns explicitly, and never present simulated data as \
primary evidence. Structure every answer as markdown with clear section \
headings.";

const VISUALIZATION_EXPERT_SYSTEM_PROMPT: &str = "\
You are a data-visualization expert designing charts for a public-health \
analytics dashboard. Given an epidemiological analysis, propose the chart \
types, encodings, and annotations that make the findings legible to a \
non-technical audience. Favor accessible palettes and high-contrast \
designs, explain why each chart fits its dataset, and note axis and \
scale choices that avoid exaggerating effects. Answer in markdown.";

const HEALTH_RESEARCHER_SYSTEM_PROMPT: &str = "\
You are a public-health researcher explaining the causal mechanisms that \
link excessive screen time to mental and physical health outcomes: blue \
light and sleep architecture, social comparison and mood, displacement of \
physical activity, and attention fragmentation. Distinguish established \
findings from hypotheses, cite the strength of evidence for each pathway, \
and keep the register accessible to policymakers. Answer in markdown.";

const POLICY_ADVISOR_SYSTEM_PROMPT: &str = "\
You are a digital-wellness policy advisor. Given health findings, draft \
concrete, proportionate policy recommendations: age-appropriate platform \
defaults, school screen-time guidance, public-awareness programs, and \
measurable evaluation criteria for each intervention. Rank recommendations \
by expected impact and feasibility, and flag where evidence is too weak \
to legislate on. Answer in markdown.";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [AgentRole; 4] = [
        AgentRole::DataAnalyst,
        AgentRole::VisualizationExpert,
        AgentRole::HealthResearcher,
        AgentRole::PolicyAdvisor,
    ];

    #[test]
    fn test_system_prompts_are_substantive() {
        for role in ALL_ROLES {
            assert!(
                role.system_prompt().len() > 100,
                "prompt too short for {}",
                role
            );
        }
    }

    #[test]
    fn test_temperatures_in_range() {
        for role in ALL_ROLES {
            let t = role.temperature();
            assert!((0.0..=1.0).contains(&t), "temperature out of range for {}", role);
        }
    }

    #[test]
    fn test_role_temperatures() {
        assert_eq!(AgentRole::DataAnalyst.temperature(), 0.3);
        assert_eq!(AgentRole::VisualizationExpert.temperature(), 0.6);
        assert_eq!(AgentRole::HealthResearcher.temperature(), 0.5);
        assert_eq!(AgentRole::PolicyAdvisor.temperature(), 0.7);
    }

    #[test]
    fn test_analyst_is_coldest_role() {
        for role in [
            AgentRole::VisualizationExpert,
            AgentRole::HealthResearcher,
            AgentRole::PolicyAdvisor,
        ] {
            assert!(AgentRole::DataAnalyst.temperature() < role.temperature());
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(AgentRole::DataAnalyst.to_string(), "Data Analyst");
        assert_eq!(AgentRole::PolicyAdvisor.to_string(), "Policy Advisor");
    }
}
