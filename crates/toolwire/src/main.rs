//! `toolwire` command line: language-model agents wired to web services.

#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use toolwire::Session;
use toolwire::config::Config;
use toolwire::console::{self, Prompter, Runner};
use toolwire::core::{AgentBuilder, StopReason};
use toolwire::tools::post_to_slack;

const DEFAULT_ASK_PROMPT: &str = "What is the capital of France?";
const DEFAULT_NAVIGATE_QUERY: &str = "I am travelling from newyork to boston \
                                      by car, Based on travel time, should i \
                                      do WFH?";
const DEFAULT_GITHUB_QUERY: &str =
    "List latest commits from main branch of technoavengers/genaicoding";
const DEFAULT_POLICY_QUESTION: &str = "What is WFH Policy?";
const DEFAULT_TRIP_TASK: &str =
    "I want a 5-day vacation from delhi to Tokyo under $2500.";

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Approve side-effecting tool calls without asking.
    #[arg(short, long, global = true)]
    yes: bool,

    /// Print every tool call and its observation.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a single prompt to the model.
    Ask {
        /// Sampling temperature. Repeat to compare several.
        #[arg(short, long)]
        temperature: Vec<f32>,
        /// The prompt.
        prompt: Option<String>,
    },
    /// Translate English text with a prompt template.
    Translate {
        /// Target language.
        #[arg(short, long)]
        language: Option<String>,
        /// Text to translate.
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Look up the weather of a city.
    Weather {
        /// City name.
        #[arg(short, long)]
        city: Option<String>,
        /// Also post the agent's answer to Slack.
        #[arg(long)]
        post_summary: bool,
    },
    /// Generate pytest cases, fix code or analyze errors.
    Qa {
        /// Menu choice: 1, 2 or 3.
        #[arg(short, long)]
        choice: Option<String>,
    },
    /// Turn a Jira story into test cases and a pytest file.
    Jira {
        /// Jira issue ID.
        #[arg(short, long)]
        id: Option<String>,
        /// Spreadsheet holding the test cases.
        #[arg(short, long, default_value = "testcases.xlsx")]
        sheet: PathBuf,
    },
    /// Answer interview questions from a resume.
    Resume {
        /// The resume, PDF or plain text.
        #[arg(short, long, default_value = "my_resume.pdf")]
        document: PathBuf,
    },
    /// Ask for directions, travel times and weather.
    Navigate {
        /// One-shot query. Starts a chat when omitted.
        query: Option<String>,
    },
    /// Ask about commits of GitHub repositories.
    Github {
        /// The query.
        query: Option<String>,
    },
    /// Answer company policy questions from a policy document.
    Policy {
        /// The policy, PDF or plain text.
        #[arg(short, long, default_value = "company_policy.pdf")]
        document: PathBuf,
        /// One-shot question. Starts a chat when omitted.
        question: Option<String>,
    },
    /// Let planner, budget and activity agents draft a trip together.
    PlanTrip {
        /// The travel request.
        task: Option<String>,
        /// Number of agent messages before the chat ends.
        #[arg(long, default_value_t = 3)]
        max_turns: usize,
        /// Ends the chat once an agent says this phrase.
        #[arg(long)]
        until: Option<String>,
    },
}

impl Cli {
    fn runner(&self, builder: AgentBuilder) -> Runner {
        Runner::new(builder, self.yes).with_verbose(self.verbose)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Session::new(Config::from_env())
        .context("failed to set up the language model")?;
    let mut prompter = Prompter::stdio();

    match &cli.command {
        Command::Ask {
            temperature,
            prompt,
        } => {
            let prompt = prompt.as_deref().unwrap_or(DEFAULT_ASK_PROMPT);
            if temperature.is_empty() {
                println!("{}", session.ask(prompt, None).await?);
            }
            for &temperature in temperature {
                let answer = session.ask(prompt, Some(temperature)).await?;
                println!("Temperature {temperature}:\n{answer}\n");
            }
        }
        Command::Translate { language, text } => {
            let language = match language {
                Some(language) => language.clone(),
                None => prompter.require_line("Enter the language: ").await?,
            };
            let text = match text {
                Some(text) => text.clone(),
                None => prompter.require_line("Enter the text: ").await?,
            };
            println!("{}", session.translate(&language, &text).await?);
        }
        Command::Weather { city, post_summary } => {
            let city = match city {
                Some(city) => city.clone(),
                None => {
                    let prompt = "Enter a city name to get weather update: ";
                    prompter.require_line(prompt).await?
                }
            };
            let mut runner = cli.runner(session.weather_agent()?);
            let input = format!("What is the weather in {city}?");
            let output = runner.invoke(&input, &mut prompter).await?;
            println!("{output}");

            if *post_summary {
                let slack = session.config().slack()?;
                let text = format!("GenAI Agent Response:\n{output}");
                match post_to_slack(
                    session.http_client(),
                    &slack.webhook_url,
                    &text,
                )
                .await
                {
                    Ok(_) => {
                        println!("Weather update sent to Slack successfully.")
                    }
                    Err(err) => {
                        println!("Failed to send to Slack: {}", err.reason())
                    }
                }
            }
        }
        Command::Qa { choice } => {
            let request =
                console::read_qa_request(&mut prompter, choice.as_deref())
                    .await?;
            let Some((task, input)) = request else {
                return Ok(());
            };
            let mut runner = cli.runner(session.qa_agent()?);
            let output = runner.invoke(&input, &mut prompter).await?;
            println!("\n{}\n{output}", task.header());
        }
        Command::Jira { id, sheet } => {
            let id = match id {
                Some(id) => id.trim().to_owned(),
                None => prompter.require_line("Enter Jira issue ID: ").await?,
            };
            let mut runner = cli.runner(session.jira_agent(sheet)?);
            let input =
                format!("Generate test cases and pytest code for Jira ID {id}");
            let output = runner.invoke(&input, &mut prompter).await?;
            println!("Agent Output:\n{output}");
        }
        Command::Resume { document } => {
            let builder = session.resume_agent(document).await.with_context(
                || format!("failed to index {}", document.display()),
            )?;
            let mut runner = cli.runner(builder);
            println!(
                "Resume RAG Chatbot (Autonomous Agent). Type your interview \
                 question (or 'exit' to quit):"
            );
            console::chat(&mut prompter, "You: ", "Bot:", async |line, p| {
                runner.invoke(line, p).await
            })
            .await?;
        }
        Command::Navigate { query } => {
            let mut runner = cli.runner(session.navigate_agent()?);
            match query {
                Some(query) => {
                    println!("{}", runner.invoke(query, &mut prompter).await?);
                }
                None => {
                    println!(
                        "Weather and navigation assistant. Try \"{}\" \
                         (or 'exit' to quit):",
                        DEFAULT_NAVIGATE_QUERY
                    );
                    console::chat(
                        &mut prompter,
                        "You: ",
                        "Bot:",
                        async |line, p| runner.invoke(line, p).await,
                    )
                    .await?;
                }
            }
        }
        Command::Github { query } => {
            let query = query.as_deref().unwrap_or(DEFAULT_GITHUB_QUERY);
            let mut runner = cli.runner(session.github_agent());
            println!("{}", runner.invoke(query, &mut prompter).await?);
        }
        Command::Policy { document, question } => {
            let qa = session.policy_qa(document).await.with_context(|| {
                format!("failed to index {}", document.display())
            })?;
            match question {
                Some(question) => {
                    println!("Bot: {}", qa.answer(question).await?);
                }
                None => {
                    println!(
                        "Company policy assistant. Try \"{}\" \
                         (or 'exit' to quit):",
                        DEFAULT_POLICY_QUESTION
                    );
                    console::chat(
                        &mut prompter,
                        "You: ",
                        "Bot:",
                        async |question, _| qa.answer(question).await,
                    )
                    .await?;
                }
            }
        }
        Command::PlanTrip {
            task,
            max_turns,
            until,
        } => {
            let mut chat = session.trip_planner(*max_turns).on_message(|msg| {
                let rule = "----------".bright_black();
                let source = msg.source.bold();
                println!("{rule} {source} {rule}\n{}", msg.content);
            });
            if let Some(phrase) = until {
                chat = chat.with_termination(phrase.clone());
            }
            let task = task.as_deref().unwrap_or(DEFAULT_TRIP_TASK);
            let output = chat.run(task).await?;
            if output.stop_reason == StopReason::MaxTurns {
                info!("stopped after {max_turns} turns");
            }
        }
    }

    Ok(())
}
