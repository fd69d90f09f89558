use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use tusk::config::Config;
use tusk::core::mermaid;
use tusk::core::{
    BlockerType, ClosedReason, Complexity, NewTask, Priority, RelationshipType, Task, TaskId, TaskStatus,
    TaskUpdate, Verdict,
};
use tusk::store::{CriterionSource, DuplicatePolicy, Store, TaskFilter};
use tusk::{tlog, tlog_error, Result};

/// Tusk - backlog engine for autonomous task execution
#[derive(Parser, Debug)]
#[command(name = "tusk")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TUSK_DEBUG=1    Enable debug logging (alternative to --debug)\n\n\
EXIT CODES:\n    0    Success, or no duplicate found\n    1    Constraint violated, or duplicate found\n    2    Inconclusive duplicate check, or internal error")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.tusk/tusk.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Path to tusk.toml (default: ~/.tusk/tusk.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the config file and database if missing
    Init,

    /// Add a task to the backlog
    Add {
        summary: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(short = 'p', long, default_value = "Medium")]
        priority: Priority,

        #[arg(long)]
        complexity: Option<Complexity>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        task_type: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        /// Insert even if an open task looks like a duplicate
        #[arg(long, short = 'f')]
        force: bool,

        /// Acceptance criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },

    /// Show a task with its dependencies and acceptance criteria
    Show { id: TaskId },

    /// List tasks, best score first
    List {
        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        /// Include Done tasks
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Edit task attributes
    Update {
        id: TaskId,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(short = 'p', long)]
        priority: Option<Priority>,

        #[arg(long)]
        complexity: Option<Complexity>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        task_type: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        /// Fields to unset
        #[arg(long, value_delimiter = ',')]
        clear: Vec<ClearField>,
    },

    /// Move a task to In Progress
    Start { id: TaskId },

    /// Close a task
    Done {
        id: TaskId,

        #[arg(long, default_value = "completed")]
        reason: ClosedReason,
    },

    /// Take a Done task back to To Do
    Reopen { id: TaskId },

    /// Manage dependencies
    #[command(subcommand)]
    Deps(DepsCommand),

    /// Open tasks whose dependencies are all Done
    Ready {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Open tasks waiting on unfinished dependencies
    Blocked,

    /// Recompute priority scores of all open tasks
    Score,

    /// Duplicate screening
    #[command(subcommand)]
    Dupes(DupesCommand),

    /// Manage acceptance criteria
    #[command(subcommand)]
    Criteria(CriteriaCommand),

    /// Manage external blockers
    #[command(subcommand)]
    Blocker(BlockerCommand),

    /// Print the dependency graph as Mermaid
    Dag {
        /// Include finished work
        #[arg(long, short = 'a')]
        all: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DepsCommand {
    /// TASK waits for DEPENDS_ON
    Add {
        task: TaskId,
        depends_on: TaskId,

        #[arg(long, short = 'r', default_value = "blocks")]
        relationship: RelationshipType,
    },
    Remove {
        task: TaskId,
        depends_on: TaskId,
    },
    /// Dependencies and dependents of a task
    List { task: TaskId },
    /// Every task that transitively depends on TASK
    Downstream { task: TaskId },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DupesCommand {
    /// Compare a summary against open tasks
    Check {
        summary: String,

        #[arg(long)]
        domain: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CriteriaCommand {
    Add {
        task: TaskId,
        text: String,

        #[arg(long, default_value = "original")]
        source: CriterionSource,
    },
    List { task: TaskId },
    Done { id: i64 },
    Reset { id: i64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum BlockerCommand {
    /// TASK cannot start until DESCRIPTION is resolved
    Add {
        task: TaskId,
        description: String,

        #[arg(long = "type", short = 't', default_value = "external")]
        blocker_type: BlockerType,
    },
    List { task: TaskId },
    Resolve { id: i64 },
    /// Put a resolved blocker back in force
    Unresolve { id: i64 },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearField {
    Description,
    Complexity,
    Domain,
    TaskType,
    Assignee,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tusk::log::init_with_debug(cli.debug);
    tlog!("tusk {:?}", cli.command);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tlog_error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = load_config(cli.config.as_ref())?;
    if cli.command == Command::Init {
        return run_init(cli.config, &config);
    }
    let store = Store::open(&config.db_path()?, &config)?;
    let json = cli.json;

    let code = match cli.command {
        Command::Init => 0,
        Command::Add {
            summary,
            description,
            priority,
            complexity,
            domain,
            task_type,
            assignee,
            force,
            criteria,
        } => {
            let new = NewTask {
                summary,
                description,
                priority,
                complexity,
                domain,
                task_type,
                assignee,
                criteria,
            };
            let policy = if force {
                DuplicatePolicy::Skip
            } else {
                DuplicatePolicy::Reject
            };
            let id = store.create_task(new, policy)?;
            let task = store.get_task(id)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Created task #{} (score {})", task.id, task.priority_score);
            }
            0
        }
        Command::Show { id } => {
            let detail = store.task_detail(id)?;
            let criteria = store.criteria(id)?;
            let blockers = store.blockers(id)?;
            if json {
                print_json(&serde_json::json!({
                    "task": detail.task,
                    "dependencies": detail.dependencies,
                    "dependents": detail.dependents,
                    "criteria": criteria,
                    "blockers": blockers,
                }))?;
            } else {
                print_task_detail(&detail.task);
                if !detail.dependencies.is_empty() {
                    let ids: Vec<String> = detail
                        .dependencies
                        .iter()
                        .map(|d| format!("#{} ({})", d.depends_on_id, d.relationship_type))
                        .collect();
                    println!("Depends on:  {}", ids.join(", "));
                }
                if !detail.dependents.is_empty() {
                    let ids: Vec<String> = detail
                        .dependents
                        .iter()
                        .map(|d| format!("#{}", d.task_id))
                        .collect();
                    println!("Blocks:      {}", ids.join(", "));
                }
                if !criteria.is_empty() {
                    let done = criteria.iter().filter(|c| c.is_completed).count();
                    println!("Criteria:    {}/{}", done, criteria.len());
                    for c in &criteria {
                        let marker = if c.is_completed { "[x]" } else { "[ ]" };
                        println!("  {} #{} {}", marker, c.id, c.criterion);
                    }
                }
                for b in blockers.iter().filter(|b| b.is_open()) {
                    println!("Blocker:     #{} {}: {}", b.id, b.blocker_type, b.description);
                }
            }
            0
        }
        Command::List {
            status,
            domain,
            assignee,
            all,
        } => {
            let filter = TaskFilter {
                status,
                domain,
                assignee,
                open_only: !all,
            };
            let tasks = store.list_tasks(&filter)?;
            if json {
                print_json(&tasks)?;
            } else {
                print_task_table(&tasks);
            }
            0
        }
        Command::Update {
            id,
            summary,
            description,
            priority,
            complexity,
            domain,
            task_type,
            assignee,
            clear,
        } => {
            let update = TaskUpdate {
                summary,
                description: edit(description, &clear, ClearField::Description),
                priority,
                complexity: edit(complexity, &clear, ClearField::Complexity),
                domain: edit(domain, &clear, ClearField::Domain),
                task_type: edit(task_type, &clear, ClearField::TaskType),
                assignee: edit(assignee, &clear, ClearField::Assignee),
            };
            let task = store.update_task(id, update)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Updated task #{} (score {})", task.id, task.priority_score);
            }
            0
        }
        Command::Start { id } => {
            let task = store.start_task(id)?;
            print_status_change(&task, json)?;
            0
        }
        Command::Done { id, reason } => {
            let task = store.close_task(id, reason)?;
            print_status_change(&task, json)?;
            0
        }
        Command::Reopen { id } => {
            let task = store.reopen_task(id)?;
            print_status_change(&task, json)?;
            0
        }
        Command::Deps(cmd) => run_deps(&store, cmd, json)?,
        Command::Ready { limit } => {
            let mut ready = store.ready()?;
            if let Some(limit) = limit {
                ready.truncate(limit);
            }
            if json {
                print_json(&ready)?;
            } else {
                print_task_table(&ready);
            }
            0
        }
        Command::Blocked => {
            let blocked = store.blocked()?;
            if json {
                print_json(&blocked)?;
            } else if blocked.is_empty() {
                println!("No blocked tasks");
            } else {
                println!("{:<6} {:<6} {:<14} Summary", "ID", "Score", "Waiting on");
                println!("{}", "-".repeat(70));
                for b in &blocked {
                    let waiting: Vec<String> = b
                        .waiting_on
                        .iter()
                        .map(|id| format!("#{id}"))
                        .chain(b.blocked_by.iter().map(|id| format!("B{id}")))
                        .collect();
                    println!(
                        "{:<6} {:<6} {:<14} {}",
                        b.task.id,
                        b.task.priority_score,
                        waiting.join(","),
                        b.task.summary
                    );
                }
            }
            0
        }
        Command::Score => {
            let report = store.recompute_scores()?;
            if json {
                print_json(&report)?;
            } else {
                println!("Rescored {} task(s)", report.updated);
                for failure in &report.failures {
                    eprintln!("  task #{}: {}", failure.task_id, failure.reason);
                }
            }
            0
        }
        Command::Dupes(DupesCommand::Check { summary, domain }) => {
            let verdict = store.check_duplicate(&summary, domain.as_deref())?;
            if json {
                print_json(&verdict)?;
            } else {
                print_verdict(&store, &verdict)?;
            }
            verdict.exit_code() as u8
        }
        Command::Criteria(cmd) => run_criteria(&store, cmd, json)?,
        Command::Blocker(cmd) => run_blocker(&store, cmd, json)?,
        Command::Dag { all } => {
            let snapshot = store.snapshot()?;
            println!("{}", mermaid::build_mermaid(&snapshot, all));
            0
        }
    };

    store.close()?;
    Ok(code)
}

/// A new value wins over `--clear`.
fn edit<T>(value: Option<T>, clear: &[ClearField], field: ClearField) -> Option<Option<T>> {
    match value {
        Some(v) => Some(Some(v)),
        None if clear.contains(&field) => Some(None),
        None => None,
    }
}

fn run_init(config_path: Option<PathBuf>, config: &Config) -> Result<u8> {
    let config_path = match config_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    if !config_path.exists() {
        config.save_to(&config_path)?;
        println!("Wrote {}", config_path.display());
    }
    let db_path = config.db_path()?;
    Store::open(&db_path, config)?.close()?;
    println!("Database ready at {}", db_path.display());
    tlog!("Initialized backlog at {}", db_path.display());
    Ok(0)
}

fn run_deps(store: &Store, cmd: DepsCommand, json: bool) -> Result<u8> {
    match cmd {
        DepsCommand::Add {
            task,
            depends_on,
            relationship,
        } => {
            if store.add_dependency_with(task, depends_on, relationship)? {
                println!("Task #{} now depends on #{} ({})", task, depends_on, relationship);
            } else {
                println!("Task #{} already depends on #{}", task, depends_on);
            }
        }
        DepsCommand::Remove { task, depends_on } => {
            store.remove_dependency(task, depends_on)?;
            println!("Removed dependency #{} -> #{}", task, depends_on);
        }
        DepsCommand::List { task } => {
            let dependencies = store.dependencies(task)?;
            let dependents = store.dependents(task)?;
            if json {
                print_json(&serde_json::json!({
                    "dependencies": dependencies,
                    "dependents": dependents,
                }))?;
            } else {
                println!("Task #{} depends on:", task);
                for d in &dependencies {
                    println!("  #{} ({})", d.depends_on_id, d.relationship_type);
                }
                println!("Tasks depending on #{}:", task);
                for d in &dependents {
                    println!("  #{} ({})", d.task_id, d.relationship_type);
                }
            }
        }
        DepsCommand::Downstream { task } => {
            let scope = store.downstream_scope(task)?;
            if json {
                print_json(&scope)?;
            } else if scope.is_empty() {
                println!("Nothing depends on #{}", task);
            } else {
                let ids: Vec<String> = scope.iter().map(|id| format!("#{id}")).collect();
                println!("{}", ids.join(" "));
            }
        }
    }
    Ok(0)
}

fn run_criteria(store: &Store, cmd: CriteriaCommand, json: bool) -> Result<u8> {
    match cmd {
        CriteriaCommand::Add { task, text, source } => {
            let id = store.add_criterion(task, &text, source)?;
            println!("Added criterion #{} to task #{}", id, task);
        }
        CriteriaCommand::List { task } => {
            let criteria = store.criteria(task)?;
            if json {
                print_json(&criteria)?;
            } else if criteria.is_empty() {
                println!("No acceptance criteria for task #{}", task);
            } else {
                println!("{:<6} {:<6} {:<14} Criterion", "ID", "Done", "Source");
                println!("{}", "-".repeat(70));
                for c in &criteria {
                    let marker = if c.is_completed { "[x]" } else { "[ ]" };
                    println!("{:<6} {:<6} {:<14} {}", c.id, marker, c.source, c.criterion);
                }
                let done = criteria.iter().filter(|c| c.is_completed).count();
                println!("\nProgress: {}/{}", done, criteria.len());
            }
        }
        CriteriaCommand::Done { id } => {
            if store.complete_criterion(id)? {
                println!("Criterion #{} marked done", id);
            } else {
                println!("Criterion #{} is already completed", id);
            }
        }
        CriteriaCommand::Reset { id } => {
            if store.reset_criterion(id)? {
                println!("Criterion #{} reset to incomplete", id);
            } else {
                println!("Criterion #{} is already incomplete", id);
            }
        }
    }
    Ok(0)
}

fn run_blocker(store: &Store, cmd: BlockerCommand, json: bool) -> Result<u8> {
    match cmd {
        BlockerCommand::Add {
            task,
            description,
            blocker_type,
        } => {
            let id = store.add_blocker(task, &description, blocker_type)?;
            println!("Added {} blocker B{} to task #{}", blocker_type, id, task);
        }
        BlockerCommand::List { task } => {
            let blockers = store.blockers(task)?;
            if json {
                print_json(&blockers)?;
            } else if blockers.is_empty() {
                println!("No blockers for task #{}", task);
            } else {
                println!("{:<6} {:<10} {:<10} Description", "ID", "Type", "Status");
                println!("{}", "-".repeat(70));
                for b in &blockers {
                    let status = if b.is_resolved { "resolved" } else { "open" };
                    println!("B{:<5} {:<10} {:<10} {}", b.id, b.blocker_type, status, b.description);
                }
            }
        }
        BlockerCommand::Resolve { id } => {
            if store.resolve_blocker(id)? {
                println!("Blocker B{} resolved", id);
            } else {
                println!("Blocker B{} is already resolved", id);
            }
        }
        BlockerCommand::Unresolve { id } => {
            if store.unresolve_blocker(id)? {
                println!("Blocker B{} is open again", id);
            } else {
                println!("Blocker B{} is already open", id);
            }
        }
    }
    Ok(0)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status_change(task: &Task, json: bool) -> Result<()> {
    if json {
        return print_json(task);
    }
    match task.closed_reason {
        Some(reason) => println!("Task #{}: {} ({})", task.id, task.status, reason),
        None => println!("Task #{}: {}", task.id, task.status),
    }
    Ok(())
}

fn print_task_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    println!(
        "{:<6} {:<6} {:<12} {:<8} {:<4} Summary",
        "ID", "Score", "Status", "Priority", "Size"
    );
    println!("{}", "-".repeat(70));
    for t in tasks {
        println!(
            "{:<6} {:<6} {:<12} {:<8} {:<4} {}",
            t.id,
            t.priority_score,
            t.status,
            t.priority,
            t.complexity.map(|c| c.as_str()).unwrap_or("-"),
            t.summary
        );
    }
}

fn print_task_detail(task: &Task) {
    println!("#{}: {}", task.id, task.summary);
    println!("Status:      {}", task.status);
    if let Some(reason) = task.closed_reason {
        println!("Closed:      {}", reason);
    }
    println!("Priority:    {}", task.priority);
    println!(
        "Complexity:  {}",
        task.complexity.map(|c| c.as_str()).unwrap_or("unset")
    );
    println!("Score:       {}", task.priority_score);
    for (label, value) in [
        ("Domain:     ", &task.domain),
        ("Type:       ", &task.task_type),
        ("Assignee:   ", &task.assignee),
    ] {
        if let Some(value) = value {
            println!("{} {}", label, value);
        }
    }
    if let Some(description) = &task.description {
        println!("\n{}", description);
    }
}

fn print_verdict(store: &Store, verdict: &Verdict) -> Result<()> {
    println!("{}", verdict);
    let closest = match verdict {
        Verdict::Match { task_id, .. } => Some(*task_id),
        Verdict::Inconclusive { task_id, .. } => *task_id,
        Verdict::NoMatch => None,
    };
    if let Some(id) = closest {
        println!("  #{}: {}", id, store.get_task(id)?.summary);
    }
    Ok(())
}
