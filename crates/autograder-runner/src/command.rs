//! `command` questions: run a program against the submission and check its
//! exit status and output.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use autograder_core::question::{ScoreQuestion, Scoresheet};
use autograder_core::submission::{AdditionalData, Submission};

use crate::sandbox::Sandbox;
use crate::RunnerSettings;

/// Kind-specific keys of a `command` question.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandParams {
    /// Program and arguments, run from the root of a submission copy.
    pub command: Vec<String>,
    /// Text written to the program's stdin.
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub expected_exit_code: i32,
    /// Expected stdout; unchecked when absent.
    #[serde(default)]
    pub expected_stdout: Option<String>,
    /// Points deducted for an output mismatch (default: all of them).
    #[serde(default)]
    pub stdout_penalty: Option<u32>,
    /// Ignore trailing whitespace on each line and trailing blank lines.
    #[serde(default = "default_true")]
    pub trim_output: bool,
}

fn default_true() -> bool {
    true
}

/// Runs one command in a sandboxed copy of the submission.
///
/// The child leads its own process group. When scoring ends, or is cancelled
/// at the deadline, the whole group is killed, including anything the
/// command left running in the background.
pub struct CommandQuestion {
    params: CommandParams,
    settings: RunnerSettings,
}

impl CommandQuestion {
    pub fn new(params: CommandParams, settings: RunnerSettings) -> Result<Self> {
        anyhow::ensure!(!params.command.is_empty(), "'command' must not be empty");
        Ok(Self { params, settings })
    }

    /// Build from the keys of a question entry in an assignment file.
    pub fn from_params(params: &toml::Table, settings: RunnerSettings) -> Result<Arc<dyn ScoreQuestion>> {
        let params: CommandParams = toml::Value::Table(params.clone())
            .try_into()
            .context("invalid command question")?;
        Ok(Arc::new(Self::new(params, settings)?))
    }
}

#[async_trait]
impl ScoreQuestion for CommandQuestion {
    async fn score_question(
        &self,
        submission: &Submission,
        _additional: &AdditionalData,
        sheet: &mut Scoresheet,
    ) -> Result<()> {
        let sandbox = Sandbox::from_submission(submission.root(), &self.settings.scrub_env).await?;

        let (program, args) = self
            .params
            .command
            .split_first()
            .context("'command' must not be empty")?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if self.params.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        sandbox.apply(&mut cmd);

        tracing::debug!(question = %sheet.name, "running {:?}", self.params.command);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start '{program}'"))?;
        let _group = ProcessGroup::led_by(child.id());

        let pipe = child.stdin.take();
        let input = self.params.stdin.clone();
        let feed = async move {
            if let (Some(mut pipe), Some(input)) = (pipe, input) {
                match pipe.write_all(input.as_bytes()).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };
        let (_, output) = tokio::try_join!(feed, child.wait_with_output())
            .with_context(|| format!("failed to run '{program}'"))?;

        sheet.full_credit();

        let limit = self.settings.max_output_bytes;
        if output.status.code() != Some(self.params.expected_exit_code) {
            sheet.fail(format!(
                "Command exited with {} (expected exit code {}).",
                output.status, self.params.expected_exit_code
            ));
            let stderr = excerpt(&output.stderr, limit);
            if !stderr.is_empty() {
                sheet.add_message("stderr:", 0);
                sheet.add_message(&stderr, 0);
            }
            return Ok(());
        }

        if let Some(expected) = &self.params.expected_stdout {
            let actual = String::from_utf8_lossy(&output.stdout);
            if let Some(mismatch) = compare_output(expected, &actual, self.params.trim_output) {
                let penalty = self.params.stdout_penalty.unwrap_or(sheet.max_points);
                sheet.add_message(&mismatch, -i64::from(penalty));
            }
        }

        Ok(())
    }
}

/// Kills a child's process group when dropped.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn led_by(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid.filter(|&pgid| pgid > 0) {
            // ESRCH once every member has exited.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
}

/// Describe the first difference between `expected` and `actual` output.
pub fn compare_output(expected: &str, actual: &str, trim: bool) -> Option<String> {
    let normalize = |text: &str| -> Vec<String> {
        let mut lines: Vec<String> = text
            .lines()
            .map(|l| if trim { l.trim_end().to_string() } else { l.to_string() })
            .collect();
        if trim {
            while lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
        }
        lines
    };

    let expected = normalize(expected);
    let actual = normalize(actual);

    let line_count = expected.len().max(actual.len());
    (0..line_count).find_map(|i| {
        let want = expected.get(i);
        let got = actual.get(i);
        (want != got).then(|| match (want, got) {
            (Some(w), Some(g)) => {
                format!("Output mismatch at line {}: expected {w:?}, got {g:?}.", i + 1)
            }
            (Some(w), None) => format!("Output ended early at line {}: expected {w:?}.", i + 1),
            (None, Some(g)) => format!("Unexpected extra output at line {}: {g:?}.", i + 1),
            (None, None) => unreachable!("index is below the longer length"),
        })
    })
}

/// Lossy UTF-8 text of `bytes`, cut to at most `limit` bytes.
pub fn excerpt(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.len() <= limit {
        return text.to_string();
    }

    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &text[..cut])
}
