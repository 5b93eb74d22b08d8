use chrono::{DateTime, Utc};
use multiteam_agent::ProviderConfig;
use multiteam_core::{MultiteamError, MultiteamResult};
use multiteam_orchestrator::{ReviewConfig, UnparseablePolicy, WorkerMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// One actor: a name plus the provider behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub name: String,
    #[serde(flatten)]
    pub provider: ProviderConfig,
}

impl ActorRecord {
    pub fn new(name: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

/// Review settings of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Accept attempts whose review cannot be parsed.
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fail_open() -> bool {
    true
}

impl Default for ReviewRecord {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            fail_open: default_fail_open(),
        }
    }
}

impl ReviewRecord {
    pub fn to_config(&self) -> ReviewConfig {
        let policy = if self.fail_open {
            UnparseablePolicy::FailOpen
        } else {
            UnparseablePolicy::FailClosed
        };
        ReviewConfig::new(self.max_attempts).with_policy(policy)
    }
}

/// A team definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub planner: ActorRecord,
    pub manager: ActorRecord,
    #[serde(default)]
    pub workers: Vec<ActorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<ActorRecord>,
    #[serde(default)]
    pub review: ReviewRecord,
    /// Run workers one after another instead of concurrently.
    #[serde(default)]
    pub sequential: bool,
}

impl TeamRecord {
    pub fn worker_mode(&self) -> WorkerMode {
        if self.sequential {
            WorkerMode::Sequential
        } else {
            WorkerMode::Concurrent
        }
    }

    fn validate(&self) -> MultiteamResult<()> {
        require_name("team", &self.name)?;
        let actors = [&self.planner, &self.manager]
            .into_iter()
            .chain(self.workers.iter())
            .chain(self.reviewer.iter());
        for actor in actors {
            require_name(&format!("actor in team '{}'", self.name), &actor.name)?;
            require_name(
                &format!("provider of actor '{}'", actor.name),
                &actor.provider.provider,
            )?;
        }
        if self.review.max_attempts == 0 {
            return Err(MultiteamError::Config(format!(
                "team '{}': review max_attempts must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// A persisted project: an owner's set of teams plus an optional global actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<ActorRecord>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            name: name.into(),
            teams: Vec::new(),
            global: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_team(mut self, team: TeamRecord) -> Self {
        self.teams.push(team);
        self
    }

    pub fn with_global(mut self, global: ActorRecord) -> Self {
        self.global = Some(global);
        self
    }

    /// Parse and validate a human-authored TOML definition.
    ///
    /// `id`, `owner` and the timestamps may be omitted; fresh values are
    /// filled in.
    pub fn from_toml_str(s: &str) -> MultiteamResult<Self> {
        let record: Self = toml::from_str(s)
            .map_err(|e| MultiteamError::Config(format!("invalid project definition: {e}")))?;
        record.validate()?;
        Ok(record)
    }

    /// Check names, team uniqueness and review bounds.
    pub fn validate(&self) -> MultiteamResult<()> {
        require_name("project", &self.name)?;
        if let Some(global) = &self.global {
            require_name("global actor", &global.name)?;
        }
        let mut seen = HashSet::new();
        for team in &self.teams {
            team.validate()?;
            if !seen.insert(team.name.as_str()) {
                return Err(MultiteamError::Config(format!(
                    "duplicate team name '{}'",
                    team.name
                )));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            owner: self.owner.clone(),
            name: self.name.clone(),
            teams: self.teams.len(),
            global: self.global.is_some(),
            updated_at: self.updated_at,
        }
    }
}

/// Listing entry for a stored project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub teams: usize,
    pub global: bool,
    pub updated_at: DateTime<Utc>,
}

fn require_name(what: &str, value: &str) -> MultiteamResult<()> {
    if value.trim().is_empty() {
        return Err(MultiteamError::Config(format!("{what} name must not be empty")));
    }
    Ok(())
}
