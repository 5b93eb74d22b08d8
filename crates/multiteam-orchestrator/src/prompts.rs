use serde::{Deserialize, Serialize};

/// Instruction wording used at each pipeline step.
///
/// Every instruction is `<prefix><payload>`; the review instruction also
/// appends the attempted instruction and its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionTemplates {
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default = "default_breakdown")]
    pub breakdown: String,
    #[serde(default = "default_execute")]
    pub execute: String,
    #[serde(default = "default_review")]
    pub review: String,
    #[serde(default = "default_decompose")]
    pub decompose: String,
    #[serde(default = "default_consolidate")]
    pub consolidate: String,
}

fn default_plan() -> String {
    "produce a technical plan for: ".to_string()
}

fn default_breakdown() -> String {
    "break the following plan into concrete, assignable work items: ".to_string()
}

fn default_execute() -> String {
    "execute: ".to_string()
}

fn default_review() -> String {
    REVIEW_PROMPT.to_string()
}

fn default_decompose() -> String {
    "decompose for teams: ".to_string()
}

fn default_consolidate() -> String {
    "consolidate: ".to_string()
}

const REVIEW_PROMPT: &str = "review the work below. Reply with a JSON object \
{\"approved\": true|false, \"corrected_instruction\": \"<better instruction>\"|null}. ";

impl Default for InstructionTemplates {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            breakdown: default_breakdown(),
            execute: default_execute(),
            review: default_review(),
            decompose: default_decompose(),
            consolidate: default_consolidate(),
        }
    }
}

impl InstructionTemplates {
    /// Planner instruction for a team context.
    pub fn plan(&self, context: &str) -> String {
        format!("{}{context}", self.plan)
    }

    /// Manager instruction for a plan.
    pub fn breakdown(&self, plan: &str) -> String {
        format!("{}{plan}", self.breakdown)
    }

    /// Worker instruction for a task breakdown.
    pub fn execute(&self, tasks: &str) -> String {
        format!("{}{tasks}", self.execute)
    }

    /// Reviewer instruction for one attempt.
    pub fn review(&self, instruction: &str, output: &str) -> String {
        format!(
            "{}\ninstruction: {instruction}\nresult: {output}",
            self.review.trim_end()
        )
    }

    /// Global decomposition instruction for a project goal.
    pub fn decompose(&self, goal: &str) -> String {
        format!("{}{goal}", self.decompose)
    }

    /// Global consolidation instruction for a digest of team results.
    pub fn consolidate(&self, digest: &str) -> String {
        format!("{}{digest}", self.consolidate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wording() {
        let t = InstructionTemplates::default();
        assert_eq!(t.plan("a blog"), "produce a technical plan for: a blog");
        assert_eq!(
            t.breakdown("step 1"),
            "break the following plan into concrete, assignable work items: step 1"
        );
        assert_eq!(t.execute("task A"), "execute: task A");
        assert_eq!(t.decompose("ship it"), "decompose for teams: ship it");
        assert_eq!(t.consolidate("[]"), "consolidate: []");
    }

    #[test]
    fn test_review_includes_attempt() {
        let review = InstructionTemplates::default().review("write tests", "no tests");
        assert!(review.contains("\"approved\""));
        assert!(review.ends_with("instruction: write tests\nresult: no tests"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let t: InstructionTemplates = serde_json::from_str(r#"{"execute": "do: "}"#).unwrap();
        assert_eq!(t.execute("x"), "do: x");
        assert_eq!(t.plan("y"), "produce a technical plan for: y");
    }
}
