use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadConfig,
    OpenWorkbook,
    ReadSheet,
    EmitOperations,
    ApplyOperations,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoadConfig => "load config",
            Self::OpenWorkbook => "open workbook",
            Self::ReadSheet => "read sheet",
            Self::EmitOperations => "emit operations",
            Self::ApplyOperations => "apply operations",
        };
        f.write_str(label)
    }
}

/// Structural failures that abort a whole migration run.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("input error during {stage}: {detail}")]
    Input { stage: Stage, detail: String },

    #[error("consistency error during {stage}: {detail}")]
    Consistency { stage: Stage, detail: String },
}

impl MigrationError {
    pub fn input(stage: Stage, detail: impl Into<String>) -> Self {
        Self::Input {
            stage,
            detail: detail.into(),
        }
    }

    pub fn consistency(stage: Stage, detail: impl Into<String>) -> Self {
        Self::Consistency {
            stage,
            detail: detail.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Input { stage, .. } | Self::Consistency { stage, .. } => *stage,
        }
    }
}
