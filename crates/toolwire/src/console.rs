//! Interactive terminal front end of the demos.
//!
//! Everything reads from a [`Prompter`], which pairs a line reader with an
//! output writer, so the same code serves stdin/stdout and in-memory
//! buffers.

use std::fmt::Display;
use std::io::{self, Stdout, Write};
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;
use toolwire_core::tool::Approval;
use toolwire_core::{AgentBuilder, AgentError, AgentExecutor, AgentStep};
use toolwire_model::ToolCallRequest;

const BAR_CHAR: &str = "▎";
const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Errors of the console helpers.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading input or writing output failed.
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
    /// Input ended while an answer was required.
    #[error("input ended before an answer was given")]
    InputClosed,
    /// The agent failed.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// A line reader paired with the writer its prompts go to.
pub struct Prompter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Prompter<BufReader<Stdin>, Stdout> {
    /// Reads stdin and writes stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter<R, W> {
    /// Creates a prompter.
    #[inline]
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    /// Prints `prompt` and reads one line, `None` at end of input.
    pub async fn read_line(
        &mut self,
        prompt: &str,
    ) -> Result<Option<String>, ConsoleError> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    /// Prints `prompt` on its own line and reads lines until an empty one.
    pub async fn read_block(
        &mut self,
        prompt: &str,
    ) -> Result<String, ConsoleError> {
        writeln!(self.out, "{prompt}")?;
        let mut block = vec![];
        while let Some(line) = self.read_line("").await? {
            if line.trim().is_empty() {
                break;
            }
            block.push(line);
        }
        Ok(block.join("\n"))
    }

    /// Reads one trimmed line, failing at end of input.
    pub async fn require_line(
        &mut self,
        prompt: &str,
    ) -> Result<String, ConsoleError> {
        let line = self
            .read_line(prompt)
            .await?
            .ok_or(ConsoleError::InputClosed)?;
        Ok(line.trim().to_owned())
    }

    /// Returns the output writer.
    #[inline]
    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Consumes the prompter, returning the output writer.
    #[inline]
    pub fn into_output(self) -> W {
        self.out
    }
}

/// Answers lines until `exit` (in any case) or end of input. Blank lines
/// are skipped and failures are printed without ending the chat.
pub async fn chat<R, W, F, E>(
    prompter: &mut Prompter<R, W>,
    you: &str,
    bot: &str,
    mut respond: F,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: AsyncFnMut(&str, &mut Prompter<R, W>) -> Result<String, E>,
    E: Display,
{
    while let Some(line) = prompter.read_line(you).await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        match respond(line, prompter).await {
            Ok(output) => {
                let bar = BAR_CHAR.bright_cyan();
                writeln!(prompter.out(), "{bar}{bot} {output}")?;
            }
            Err(err) => {
                writeln!(prompter.out(), "{} {err}", "error:".bright_red())?;
            }
        }
    }
    Ok(())
}

/// The entries of the QA menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QaTask {
    /// Turn a user story into a pytest test.
    TestCase,
    /// Fix broken Python code.
    FixCode,
    /// Explain an error log.
    AnalyzeError,
}

impl QaTask {
    /// Parses a menu choice, `1` to `3`.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(QaTask::TestCase),
            "2" => Some(QaTask::FixCode),
            "3" => Some(QaTask::AnalyzeError),
            _ => None,
        }
    }

    /// The heading printed above the agent's answer.
    pub fn header(self) -> &'static str {
        match self {
            QaTask::TestCase => "Generated Test Case:",
            QaTask::FixCode => "Fix and Explanation:",
            QaTask::AnalyzeError => "Analysis and Fix:",
        }
    }

    fn ask(self) -> &'static str {
        match self {
            QaTask::TestCase => "Enter the user story:",
            QaTask::FixCode => "Paste the broken Python code:",
            QaTask::AnalyzeError => "Paste the error message or traceback:",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            QaTask::TestCase => "Convert this user story to a pytest test: ",
            QaTask::FixCode => "Fix this broken code and explain the issue: ",
            QaTask::AnalyzeError => "Analyze this error and suggest a fix: ",
        }
    }
}

/// Shows the QA menu and reads the user's request.
///
/// `choice` skips the choice prompt. Returns the task with the agent input,
/// or `None` after reporting an invalid choice.
pub async fn read_qa_request<R, W>(
    prompter: &mut Prompter<R, W>,
    choice: Option<&str>,
) -> Result<Option<(QaTask, String)>, ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        prompter.out(),
        "Choose an option:\n\
         1. Convert user story to test case\n\
         2. Fix broken code\n\
         3. Analyze error log"
    )?;
    let choice = match choice {
        Some(choice) => choice.to_owned(),
        None => prompter.require_line("Enter your choice (1/2/3): ").await?,
    };
    let Some(task) = QaTask::from_choice(&choice) else {
        writeln!(prompter.out(), "Invalid option selected.")?;
        return Ok(None);
    };
    let body = prompter.read_block(task.ask()).await?;
    Ok(Some((task, format!("{}{body}", task.instruction()))))
}

enum AgentEvent {
    ToolCall(ToolCallRequest),
    Step(AgentStep),
    Approval(Approval),
}

/// An executor plus the receiving end of its callbacks.
pub struct Runner {
    executor: AgentExecutor,
    event_rx: mpsc::UnboundedReceiver<AgentEvent>,
    verbose: bool,
}

impl Runner {
    /// Builds the executor. Unless `auto_approve` is set, side-effecting
    /// tool calls are confirmed on the prompter.
    pub fn new(builder: AgentBuilder, auto_approve: bool) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut builder = builder
            .on_tool_call({
                let event_tx = event_tx.clone();
                move |req| {
                    event_tx.send(AgentEvent::ToolCall(req.clone())).ok();
                }
            })
            .on_step({
                let event_tx = event_tx.clone();
                move |step| {
                    event_tx.send(AgentEvent::Step(step.clone())).ok();
                }
            });
        // Without a hook every call is approved.
        if !auto_approve {
            builder = builder.on_approval(move |approval| {
                event_tx.send(AgentEvent::Approval(approval)).ok();
            });
        }
        Self {
            executor: builder.build(),
            event_rx,
            verbose: false,
        }
    }

    /// Prints every tool call and its observation.
    #[inline]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Answers `input` behind a spinner, handling callbacks as they come.
    ///
    /// Every event of this input is handled before it returns.
    pub async fn invoke<R, W>(
        &mut self,
        input: &str,
        prompter: &mut Prompter<R, W>,
    ) -> Result<String, ConsoleError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let Self {
            executor,
            event_rx,
            verbose,
        } = self;
        let mut invoke = pin!(executor.invoke(input));
        let mut progress_bar: Option<ProgressBar> = None;

        let result = loop {
            progress_bar.get_or_insert_with(spinner).inc(1);

            let event = select! {
                result = &mut invoke => break result,
                Some(event) = event_rx.recv() => event,
                _ = sleep(SPINNER_TICK) => continue,
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }
            handle_event(event, *verbose, prompter).await?;
        };
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }

        // Callbacks run inside the executor, the last ones can still be
        // queued when it resolves.
        while let Ok(event) = event_rx.try_recv() {
            handle_event(event, *verbose, prompter).await?;
        }
        Ok(result?.output)
    }
}

fn spinner() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style);
    progress_bar.set_message("🤔 Thinking...");
    progress_bar
}

async fn handle_event<R, W>(
    event: AgentEvent,
    verbose: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match event {
        AgentEvent::ToolCall(req) => {
            if verbose {
                writeln!(
                    prompter.out(),
                    "{}Invoking: `{}` with `{}`",
                    BAR_CHAR.bright_blue(),
                    req.name.bright_white().bold(),
                    req.arguments
                )?;
            }
        }
        AgentEvent::Step(step) => {
            if verbose {
                let bar = BAR_CHAR.bright_blue();
                writeln!(prompter.out(), "{bar}{}", step.observation)?;
            }
        }
        AgentEvent::Approval(approval) => {
            let bar = BAR_CHAR.bright_yellow();
            let out = prompter.out();
            writeln!(out, "\n{bar}⚠️  Agent wants to:")?;
            for line in approval.what().lines() {
                writeln!(out, "{bar}{}", line.bright_white().bold())?;
            }
            writeln!(out, "{bar}{}", approval.justification())?;

            let answer = prompter.read_line("Proceed? [Y/n]: ").await?;
            let approved = answer.as_deref().map(str::trim).is_some_and(
                |line| line.is_empty() || line.eq_ignore_ascii_case("y"),
            );
            if approved {
                approval.approve();
            } else {
                approval.reject(None);
            }
            writeln!(prompter.out())?;
        }
    }
    Ok(())
}
