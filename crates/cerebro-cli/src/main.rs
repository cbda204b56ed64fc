use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use cerebro_core::analytics::PlanStats;
use cerebro_core::client::PlanClient;
use cerebro_core::config::CerebroConfig;
use cerebro_core::model::*;
use cerebro_core::planner::PlanReply;
use cerebro_core::schedule::{self, ScheduleRequest};
use cerebro_core::session::{ConversationSession, SessionError};
use cerebro_core::store::AppStore;
use chrono::{Local, NaiveDate};
use clap::Parser;
use owo_colors::OwoColorize;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(name = "cerebro", about = "Cerebro: AI study planning", version)]
enum Cli {
    /// Plan a learning goal by chatting with the planning agent
    Chat {
        /// Bearer token issued by the identity service
        #[arg(long, env = "CEREBRO_TOKEN", hide_env_values = true)]
        token: String,
        /// API root of the server (default from config)
        #[arg(long)]
        server: Option<String>,
    },
    /// Generate a study schedule locally, without the planning agent
    Schedule {
        /// Plan name
        #[arg(short, long, default_value = "")]
        name: String,
        /// Exam date (YYYY-MM-DD), at most 366 days from today
        #[arg(long)]
        exam_date: NaiveDate,
        /// Subject to study (repeat for several, at most 8)
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,
        /// Hours available per day
        #[arg(long, default_value = "3")]
        daily_hours: f32,
        /// Seed for reproducible schedules
        #[arg(long)]
        seed: Option<u64>,
        /// Write the plan as JSON to this file
        #[arg(short, long)]
        output: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show progress statistics for a saved plan
    Stats {
        /// Plan JSON file
        #[arg(short, long)]
        file: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the status of one task in a saved plan
    Task {
        /// Plan JSON file
        #[arg(short, long)]
        file: String,
        /// Task ID
        id: String,
        /// New status: pending, completed, skipped
        #[arg(long)]
        status: String,
    },
    /// Write a sample plan with some history, for trying out `stats`
    Demo {
        /// Output file path
        #[arg(short, long, default_value = "cerebro-demo.json")]
        output: String,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = CerebroConfig::load_or_default(Some(&std::env::current_dir()?));

    run(cli, &config).await
}

async fn run(cli: Cli, config: &CerebroConfig) -> Result<()> {
    match cli {
        Cli::Chat { token, server } => {
            let client = match server {
                Some(url) => PlanClient::new(url),
                None => PlanClient::from_config(&config.client),
            };
            cmd_chat(&client, &token).await
        }
        Cli::Schedule {
            name,
            exam_date,
            subjects,
            daily_hours,
            seed,
            output,
            json,
        } => {
            let request = ScheduleRequest {
                name,
                exam_date,
                subjects,
                daily_hours,
            };
            cmd_schedule(&request, seed, output.as_deref(), json)
        }
        Cli::Stats { file, json } => cmd_stats(Path::new(&file), json),
        Cli::Task { file, id, status } => cmd_task(Path::new(&file), &id, &status),
        Cli::Demo { output, seed } => cmd_demo(Path::new(&output), seed),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn load_plan(path: &Path) -> Result<StudyPlan> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a study plan", path.display()))
}

fn save_plan(path: &Path, plan: &StudyPlan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// -- chat --

async fn cmd_chat(client: &PlanClient, token: &str) -> Result<()> {
    println!("{}", "Tell me what you want to learn.".bold());
    println!(
        "{}",
        "Commands: /plan, /start <step>, /done <step>, /quit".dimmed()
    );

    let mut session = ConversationSession::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if let Some(pending) = session.pending_input() {
            println!("{} {}", "Unsent:".dimmed(), pending.dimmed());
        }
        print!("{} ", ">".cyan());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) => break,
            ("/plan", _) => {
                match session.plan() {
                    Some(steps) => print_steps(steps),
                    None => println!("{}", "No plan yet.".dimmed()),
                }
                continue;
            }
            ("/start", id) => {
                report_step(session.start_step(id.trim()), id);
                continue;
            }
            ("/done", id) => {
                report_step(session.complete_step(id.trim()), id);
                continue;
            }
            _ => {}
        }

        let transcript = match session.begin_submit(input) {
            Ok(transcript) => transcript,
            Err(SessionError::EmptyInput) => continue,
            Err(e) => bail!(e),
        };

        match client.send(token, &transcript).await {
            Ok(reply) => {
                let is_plan = matches!(reply, PlanReply::Plan { .. });
                session.apply_reply(reply);
                if is_plan {
                    println!("{}", session.last_message().unwrap_or_default().green());
                    if let Some(steps) = session.plan() {
                        print_steps(steps);
                    }
                } else {
                    println!("{}", session.last_message().unwrap_or_default());
                }
            }
            Err(e) => {
                tracing::debug!("plan request failed: {e}");
                session.apply_failure();
                println!("{}", session.last_message().unwrap_or_default().red());
            }
        }
    }

    Ok(())
}

fn report_step(found: bool, id: &str) {
    if !found {
        println!("{} no step '{}' in the current plan", "Error:".red(), id.trim());
    }
}

fn print_steps(steps: &[PlanStep]) {
    for step in steps {
        let marker = match step.status {
            StepStatus::Completed => "[x]".green().to_string(),
            StepStatus::InProgress => "[~]".yellow().to_string(),
            StepStatus::Pending => "[ ]".dimmed().to_string(),
        };
        println!(
            "{marker} {} {} {}",
            format!("{}.", step.step_id).dimmed(),
            step.title.bold(),
            format!("({})", step.estimated_time).dimmed()
        );
        println!("      {}", step.description);
    }
}

// -- schedule --

fn cmd_schedule(
    request: &ScheduleRequest,
    seed: Option<u64>,
    output: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut rng = make_rng(seed);
    let generated = schedule::generate_plan(request, today(), &mut rng)?;
    let store = AppStore::new().apply_schedule(generated);
    let Some(plan) = store.plan.as_ref() else {
        bail!("no plan was generated");
    };

    if let Some(path) = output {
        save_plan(Path::new(path), plan)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        plan.name.bold(),
        "exam".dimmed(),
        plan.exam_date.to_string().cyan()
    );
    let mut current = None;
    for task in &plan.tasks {
        if current != Some(task.date) {
            current = Some(task.date);
            println!("\n{}", task.date.format("%a %Y-%m-%d").to_string().bold());
        }
        println!(
            "  {:<14} {:<22} {:>3}m  {}",
            task.subject,
            task.topic,
            task.duration,
            priority_label(task.priority)
        );
    }
    for feedback in &store.feedback {
        println!("\n{}", feedback.message.green());
    }
    if let Some(path) = output {
        println!("{} {path}", "Saved:".dimmed());
    }
    Ok(())
}

fn priority_label(priority: Priority) -> String {
    match priority {
        Priority::High => "high".red().to_string(),
        Priority::Medium => "medium".yellow().to_string(),
        Priority::Low => "low".dimmed().to_string(),
    }
}

// -- stats --

fn cmd_stats(path: &Path, json: bool) -> Result<()> {
    let plan = load_plan(path)?;
    let stats = PlanStats::compute(&plan);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", plan.name.bold());
    println!(
        "  {} {}/{} tasks ({}%)",
        "Completed:".dimmed(),
        stats.completed.to_string().green(),
        stats.total,
        stats.completion_rate
    );
    println!(
        "  {} {}  {} {}",
        "Skipped:".dimmed(),
        stats.skipped.to_string().yellow(),
        "Pending:".dimmed(),
        stats.pending
    );
    println!(
        "  {} {}h {}m",
        "Study time:".dimmed(),
        stats.completed_minutes / 60,
        stats.completed_minutes % 60
    );

    if !stats.weekly.is_empty() {
        println!("\n{}", "Weekly".bold());
        for week in &stats.weekly {
            println!(
                "  {}  {} done  {} skipped",
                week.week_start,
                week.completed.to_string().green(),
                week.skipped.to_string().yellow()
            );
        }
    }

    println!("\n{}", "Subjects".bold());
    for subject in &stats.subjects {
        println!(
            "  {:<16} {}/{}",
            subject.name, subject.completed, subject.total
        );
    }

    if !stats.daily.is_empty() {
        println!("\n{}", "Recent days".bold());
        for day in &stats.daily {
            println!("  {}  {}m", day.date, day.minutes);
        }
    }
    Ok(())
}

// -- task --

fn cmd_task(path: &Path, id: &str, status: &str) -> Result<()> {
    let status: TaskStatus = status.parse().map_err(anyhow::Error::msg)?;
    let plan = load_plan(path)?;
    if plan.task(id).is_none() {
        bail!("no task '{id}' in {}", path.display());
    }

    let store = AppStore::new()
        .set_plan(plan)
        .update_task_status(id, status);
    if let Some(plan) = store.plan.as_ref() {
        save_plan(path, plan)?;
    }
    println!("{} task {id} is now {status}", "Updated:".green());
    Ok(())
}

// -- demo --

fn cmd_demo(path: &Path, seed: Option<u64>) -> Result<()> {
    let store = AppStore::sample(today(), &mut make_rng(seed));
    let Some(plan) = store.plan.as_ref() else {
        bail!("sample state has no plan");
    };
    save_plan(path, plan)?;

    println!("{} {}", "Wrote sample plan to".green(), path.display());
    println!("  {} {} days", "Streak:".dimmed(), store.streak);
    for feedback in &store.feedback {
        println!("  {} {}", "-".dimmed(), feedback.message);
    }
    println!(
        "{} cerebro stats --file {}",
        "->".dimmed(),
        path.display()
    );
    Ok(())
}
