//! The `ask` command: runs one question through the coordinator.

use clap::Args;
use serde::Serialize;

use crate::output::{Output, OutputFormat};
use crate::runtime::Runtime;

#[derive(Args)]
pub struct AskArgs {
    /// The question to ask.
    pub question: String,

    /// Thread id scoping the session cache tier; omit for a one-off query.
    #[arg(short, long)]
    pub thread_id: Option<String>,

    /// Canned response the offline fake LLM returns for every call it
    /// makes while answering this question (plan generation, synthesis,
    /// and any thinking-engine calls all share it).
    #[arg(long, default_value = "no provider configured; this is a deterministic offline response")]
    pub llm_response: String,
}

#[derive(Debug, Serialize)]
pub struct AskResult {
    pub answer: String,
    pub complexity: f64,
    pub thinking_enabled: bool,
    pub tasks_completed: usize,
    pub tasks_errored: usize,
    pub tasks_skipped: usize,
    pub served_from_cache: bool,
    pub total_duration_ms: u128,
}

impl Output for AskResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{}", self.answer)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "complexity={:.2} thinking={} tasks(ok={} err={} skip={}) cache_hit={} elapsed={}ms",
            self.complexity,
            self.thinking_enabled,
            self.tasks_completed,
            self.tasks_errored,
            self.tasks_skipped,
            self.served_from_cache,
            self.total_duration_ms,
        )?;
        Ok(())
    }
}

pub async fn handle_ask_command(args: AskArgs, runtime: &Runtime, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = runtime
        .coordinator
        .process_query(&args.question, args.thread_id.as_deref())
        .await?;

    let result = AskResult {
        answer: outcome.answer,
        complexity: outcome.plan.complexity,
        thinking_enabled: outcome.thinking.is_some(),
        tasks_completed: outcome.metrics.tasks_completed,
        tasks_errored: outcome.metrics.tasks_errored,
        tasks_skipped: outcome.metrics.tasks_skipped,
        served_from_cache: outcome.metrics.served_from_cache,
        total_duration_ms: outcome.metrics.total_duration.as_millis(),
    };
    format.print(&result)
}
