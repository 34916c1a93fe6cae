//! `files` questions: check that a submission contains the files it must.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use autograder_core::question::{ScoreQuestion, Scoresheet};
use autograder_core::submission::{AdditionalData, Submission};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesParams {
    /// Paths relative to the submission root.
    pub required: Vec<PathBuf>,
    /// Points deducted per missing file. Defaults to an even split of the
    /// question's points, at least 1.
    #[serde(default)]
    pub penalty_per_file: Option<u32>,
    /// Also fail files that exist but are empty.
    #[serde(default)]
    pub non_empty: bool,
}

pub struct FilesQuestion {
    params: FilesParams,
}

impl FilesQuestion {
    pub fn new(params: FilesParams) -> Result<Self> {
        anyhow::ensure!(!params.required.is_empty(), "'required' must list at least one file");
        for path in &params.required {
            anyhow::ensure!(
                is_contained(path),
                "required path '{}' must be relative and stay inside the submission",
                path.display()
            );
        }
        Ok(Self { params })
    }

    pub fn from_params(params: &toml::Table) -> Result<Arc<dyn ScoreQuestion>> {
        let params: FilesParams = toml::Value::Table(params.clone())
            .try_into()
            .context("invalid files question")?;
        Ok(Arc::new(Self::new(params)?))
    }

    fn penalty(&self, max_points: u32) -> u32 {
        self.params.penalty_per_file.unwrap_or_else(|| {
            let count = u32::try_from(self.params.required.len()).unwrap_or(u32::MAX);
            (max_points / count).max(1)
        })
    }
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl ScoreQuestion for FilesQuestion {
    async fn score_question(
        &self,
        submission: &Submission,
        _additional: &AdditionalData,
        sheet: &mut Scoresheet,
    ) -> Result<()> {
        sheet.full_credit();
        let penalty = -i64::from(self.penalty(sheet.max_points));

        for relative in &self.params.required {
            let path = submission.root().join(relative);
            match tokio::fs::metadata(&path).await {
                Ok(meta) if self.params.non_empty && meta.is_file() && meta.len() == 0 => {
                    sheet.add_message(&format!("File is empty: {}", relative.display()), penalty);
                }
                Ok(_) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                    ) =>
                {
                    sheet.add_message(&format!("Missing file: {}", relative.display()), penalty);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to inspect {}", path.display()))
                }
            }
        }

        Ok(())
    }
}
