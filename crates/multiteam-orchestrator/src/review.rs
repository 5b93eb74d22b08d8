use crate::context::{dispatch, RunContext};
use crate::prompts::InstructionTemplates;
use crate::verdict::{parse_verdict, ReviewVerdict, UnparseablePolicy};
use multiteam_agent::Actor;
use multiteam_core::{ActOutcome, MultiteamError, MultiteamResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bounds and policy for a review loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Maximum number of worker dispatches, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// What to do with reviewer output that does not parse.
    #[serde(default)]
    pub on_unparseable: UnparseablePolicy,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            on_unparseable: UnparseablePolicy::default(),
        }
    }
}

impl ReviewConfig {
    /// Default policy with the given attempt cap.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Set the unparseable-output policy.
    pub fn with_policy(mut self, policy: UnparseablePolicy) -> Self {
        self.on_unparseable = policy;
        self
    }

    /// Reject an attempt cap of zero.
    pub fn validate(&self) -> MultiteamResult<()> {
        if self.max_attempts == 0 {
            return Err(MultiteamError::Config(
                "review max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a review loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// The reviewer approved.
    Accepted,
    /// The reviewer's output could not be parsed and the fail-open policy
    /// accepted the attempt anyway.
    AcceptedUnverified,
    /// The attempt cap was reached without approval.
    BudgetExceeded,
}

/// One generate-then-review round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAttempt {
    /// The worker's outcome.
    pub work: ActOutcome,
    /// The reviewer's raw outcome.
    pub review: ActOutcome,
    /// `None` when the reviewer's output did not parse.
    pub verdict: Option<ReviewVerdict>,
}

/// History and final status of a review loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// How the loop ended.
    pub status: ReviewStatus,
    /// Every round, oldest first.
    pub attempts: Vec<ReviewAttempt>,
}

impl ReviewReport {
    /// Number of worker dispatches made.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Final work plus the report of how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// The last worker outcome: the accepted one, or the last attempt when
    /// the budget ran out.
    pub outcome: ActOutcome,
    /// How the outcome was reached.
    pub report: ReviewReport,
}

impl ReviewOutcome {
    pub fn status(&self) -> ReviewStatus {
        self.report.status
    }

    /// The accepted outcome, or [`MultiteamError::ReviewBudgetExceeded`]
    /// carrying the last attempt.
    pub fn into_accepted(self) -> MultiteamResult<ActOutcome> {
        match self.report.status {
            ReviewStatus::BudgetExceeded => Err(MultiteamError::ReviewBudgetExceeded {
                attempts: self.report.attempt_count(),
                last: Box::new(self.outcome),
            }),
            _ => Ok(self.outcome),
        }
    }
}

enum ReviewState {
    Pending {
        instruction: String,
    },
    Executed {
        instruction: String,
        work: ActOutcome,
    },
    Reviewed {
        instruction: String,
        work: ActOutcome,
        review: ActOutcome,
        verdict: Option<ReviewVerdict>,
    },
    Retrying {
        instruction: String,
    },
}

/// Generate → review → accept or regenerate, bounded by
/// [`ReviewConfig::max_attempts`].
pub struct ReviewLoop {
    worker: Arc<dyn Actor>,
    reviewer: Arc<dyn Actor>,
    config: ReviewConfig,
    templates: InstructionTemplates,
}

impl ReviewLoop {
    pub fn new(worker: Arc<dyn Actor>, reviewer: Arc<dyn Actor>, config: ReviewConfig) -> Self {
        Self {
            worker,
            reviewer,
            config,
            templates: InstructionTemplates::default(),
        }
    }

    pub fn with_templates(mut self, templates: InstructionTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Run the loop for one instruction.
    ///
    /// Worker and reviewer invocation errors propagate unchanged. Running out
    /// of attempts is not an error: the outcome carries
    /// [`ReviewStatus::BudgetExceeded`] and the last attempt.
    pub async fn run(&self, instruction: &str, ctx: &RunContext) -> MultiteamResult<ReviewOutcome> {
        self.config.validate()?;

        let worker = self.worker.name().to_string();
        let mut attempts: Vec<ReviewAttempt> = Vec::new();
        let mut state = ReviewState::Pending {
            instruction: instruction.to_string(),
        };

        loop {
            state = match state {
                ReviewState::Pending { instruction } => {
                    debug!(worker = %worker, attempt = attempts.len() + 1, "Review: dispatching work");
                    let work = dispatch(self.worker.as_ref(), &instruction, ctx).await?;
                    ReviewState::Executed { instruction, work }
                }
                ReviewState::Executed { instruction, work } => {
                    let prompt = self.templates.review(&instruction, &work.output);
                    let review = dispatch(self.reviewer.as_ref(), &prompt, ctx).await?;
                    let verdict = match parse_verdict(&review.output) {
                        Ok(verdict) => Some(verdict),
                        Err(e) => {
                            warn!(
                                worker = %worker,
                                reviewer = %self.reviewer.name(),
                                error = %e,
                                policy = ?self.config.on_unparseable,
                                "Review: unparseable verdict"
                            );
                            None
                        }
                    };
                    ReviewState::Reviewed {
                        instruction,
                        work,
                        review,
                        verdict,
                    }
                }
                ReviewState::Reviewed {
                    instruction,
                    work,
                    review,
                    verdict,
                } => {
                    let approved = match &verdict {
                        Some(v) => v.approved,
                        None => self.config.on_unparseable == UnparseablePolicy::FailOpen,
                    };
                    let next_instruction = verdict
                        .as_ref()
                        .and_then(|v| v.corrected_instruction.clone())
                        .unwrap_or(instruction);
                    let unverified = verdict.is_none();
                    attempts.push(ReviewAttempt {
                        work: work.clone(),
                        review,
                        verdict,
                    });

                    if approved {
                        let status = if unverified {
                            warn!(worker = %worker, "Review: accepted without a readable verdict");
                            ReviewStatus::AcceptedUnverified
                        } else {
                            ReviewStatus::Accepted
                        };
                        info!(worker = %worker, attempts = attempts.len(), ?status, "Review: accepted");
                        return Ok(ReviewOutcome {
                            outcome: work,
                            report: ReviewReport { status, attempts },
                        });
                    }

                    if attempts.len() as u32 >= self.config.max_attempts {
                        warn!(
                            worker = %worker,
                            attempts = attempts.len(),
                            "Review: budget exceeded, surfacing last attempt"
                        );
                        return Ok(ReviewOutcome {
                            outcome: work,
                            report: ReviewReport {
                                status: ReviewStatus::BudgetExceeded,
                                attempts,
                            },
                        });
                    }

                    ReviewState::Retrying {
                        instruction: next_instruction,
                    }
                }
                ReviewState::Retrying { instruction } => {
                    debug!(worker = %worker, next = %instruction, "Review: retrying");
                    ReviewState::Pending { instruction }
                }
            };
        }
    }
}
