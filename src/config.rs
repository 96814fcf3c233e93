use std::path::Path;

use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::error::{MigrationError, Stage};

pub const DEFAULT_CONFIG_FILE: &str = "migration.toml";

const MAX_PERIOD_LENGTH_DAYS: i64 = 366;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// First names that mark a header cell as a coach-identity cell.
    pub known_first_names: Vec<String>,
    /// Length of a tracking period when only the sheet name gives a date.
    pub period_length_days: i64,
    /// Year applied to `MM/DD` and `Month day` cells; current year if unset.
    pub default_year: Option<i32>,
    pub layout: RowLayout,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            known_first_names: Vec::new(),
            period_length_days: 14,
            default_year: None,
            layout: RowLayout::default(),
        }
    }
}

impl MigrationConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, MigrationError> {
        let path = match path {
            Some(path) => path,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    log::debug!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::input(
                Stage::LoadConfig,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let config = Self::from_toml(&raw).map_err(|e| match e {
            MigrationError::Input { detail, .. } => MigrationError::input(
                Stage::LoadConfig,
                format!("{}: {detail}", path.display()),
            ),
            other => other,
        })?;
        log::info!("loaded migration config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, MigrationError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| MigrationError::input(Stage::LoadConfig, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MigrationError> {
        if !(1..=MAX_PERIOD_LENGTH_DAYS).contains(&self.period_length_days) {
            return Err(MigrationError::input(
                Stage::LoadConfig,
                format!(
                    "period_length_days must be between 1 and {MAX_PERIOD_LENGTH_DAYS}, got {}",
                    self.period_length_days
                ),
            ));
        }
        if let Some(name) = self.known_first_names.iter().find(|n| n.trim().is_empty()) {
            return Err(MigrationError::input(
                Stage::LoadConfig,
                format!("known_first_names contains a blank entry: {name:?}"),
            ));
        }
        self.layout.validate()
    }

    pub fn year_for_partial_dates(&self) -> i32 {
        self.default_year.unwrap_or_else(|| Utc::now().year())
    }
}

/// Row offset of every per-coach field on a period sheet (row 0 = header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowLayout {
    pub travel_plans: usize,
    pub training_branch_location: usize,
    pub site_safety_evaluations: usize,
    pub forklift_evaluations: usize,
    pub office_audits: usize,
    pub investigations: usize,
    pub safety_report_date: usize,
    pub quarterly_report_date: usize,
    pub safety_meeting_date: usize,
    pub training_meeting_date: usize,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            travel_plans: 1,
            training_branch_location: 2,
            site_safety_evaluations: 3,
            forklift_evaluations: 4,
            office_audits: 5,
            investigations: 6,
            safety_report_date: 7,
            quarterly_report_date: 8,
            safety_meeting_date: 9,
            training_meeting_date: 10,
        }
    }
}

impl RowLayout {
    pub fn entries(&self) -> [(&'static str, usize); 10] {
        [
            ("travel_plans", self.travel_plans),
            ("training_branch_location", self.training_branch_location),
            ("site_safety_evaluations", self.site_safety_evaluations),
            ("forklift_evaluations", self.forklift_evaluations),
            ("office_audits", self.office_audits),
            ("investigations", self.investigations),
            ("safety_report_date", self.safety_report_date),
            ("quarterly_report_date", self.quarterly_report_date),
            ("safety_meeting_date", self.safety_meeting_date),
            ("training_meeting_date", self.training_meeting_date),
        ]
    }

    fn validate(&self) -> Result<(), MigrationError> {
        let entries = self.entries();
        for (idx, (field, row)) in entries.iter().enumerate() {
            if *row == 0 {
                return Err(MigrationError::input(
                    Stage::LoadConfig,
                    format!("layout.{field} points at the header row"),
                ));
            }
            if let Some((other, _)) = entries[..idx].iter().find(|(_, r)| r == row) {
                return Err(MigrationError::input(
                    Stage::LoadConfig,
                    format!("layout.{field} and layout.{other} share row {row}"),
                ));
            }
        }
        Ok(())
    }
}
