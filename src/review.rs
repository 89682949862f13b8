//! Terminal reviewer — line-oriented approve/edit/regenerate/skip/cancel loop.
//!
//! Reads decisions from any async buffered reader so the same loop serves
//! stdin and tests.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::campaign::{CampaignReport, CampaignState, CampaignStatus, Orchestrator};
use crate::error::{CampaignError, Error};
use crate::generation::DraftEdit;

const HELP: &str = "[a]pprove  [e]dit  [r]egenerate  [s]kip  [c]ancel";

/// Ends a multi-line body entry.
const BODY_END: &str = ".";

pub struct Reviewer<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Reviewer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    async fn say(&mut self, text: &str) -> Result<(), Error> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn show(&mut self, status: &CampaignStatus) -> Result<(), Error> {
        let (Some(draft), Some(cursor)) = (&status.draft, status.cursor) else {
            return Ok(());
        };
        let who = status
            .recipient
            .as_ref()
            .map(|r| format!("{} ({})", r.name, r.company))
            .unwrap_or_default();
        let text = format!(
            "\n── Draft {}/{} ── {who}\nTo: {}\nSubject: {}\n\n{}\n",
            cursor + 1,
            status.total,
            draft.to,
            draft.subject,
            draft.body
        );
        self.say(&text).await?;
        if let Some(err) = &status.last_dispatch_error {
            self.say(&format!("Last send failed: {err}")).await?;
        }
        self.say(HELP).await
    }

    async fn read_edit(&mut self) -> Result<DraftEdit, Error> {
        self.say("New subject (blank keeps current):").await?;
        let subject = self
            .lines
            .next_line()
            .await?
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        self.say(&format!(
            "New body, end with a line containing only '{BODY_END}' (empty keeps current):"
        ))
        .await?;
        let mut body = Vec::new();
        while let Some(line) = self.lines.next_line().await? {
            if line.trim_end() == BODY_END {
                break;
            }
            body.push(line);
        }

        Ok(DraftEdit {
            subject,
            body: (!body.is_empty()).then(|| body.join("\n")),
        })
    }

    /// Review drafts until the run ends. End of input cancels the run.
    pub async fn run(
        &mut self,
        orchestrator: &mut Orchestrator,
    ) -> Result<Option<CampaignReport>, Error> {
        let mut status = orchestrator.status();
        let mut shown = true;
        self.show(&status).await?;

        while let CampaignState::AwaitingApproval(_) = status.state {
            if !shown {
                self.show(&status).await?;
            }
            shown = true;

            let Some(line) = self.lines.next_line().await? else {
                tracing::info!("Input closed; cancelling campaign");
                status = orchestrator.cancel()?;
                break;
            };

            let outcome = match line.trim().to_lowercase().as_str() {
                "a" | "approve" => orchestrator.approve().await,
                "e" | "edit" => {
                    let edit = self.read_edit().await?;
                    orchestrator.edit(edit)
                }
                "r" | "regenerate" => orchestrator.regenerate().await,
                "s" | "skip" => orchestrator.skip().await,
                "c" | "cancel" => orchestrator.cancel(),
                "" => continue,
                other => {
                    self.say(&format!("Unknown command '{other}'. {HELP}")).await?;
                    continue;
                }
            };

            match outcome {
                Ok(next) => status = next,
                Err(CampaignError::Dispatch(e)) => {
                    self.say(&format!("Send failed: {e}")).await?;
                    status = orchestrator.status();
                }
                Err(e) => return Err(e.into()),
            }
            shown = false;
        }

        let report = orchestrator.last_report().cloned();
        if let Some(report) = &report {
            self.say(&format!(
                "\nCampaign {}: {} sent, {} skipped, {} failed to generate, {} send failures",
                report.final_state,
                report.counts.sent,
                report.counts.skipped,
                report.counts.generation_failed,
                report.counts.dispatch_failures
            ))
            .await?;
        }
        Ok(report)
    }
}
