use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::oneshot;
use tudo::capture::CaptureSession;
use tudo::config::Config;
use tudo::logging;
use tudo::prompt::{PromptError, Prompter};
use tudo::query::ProjectTasks;
use tudo::{
    CaptureId, CleanScope, ContextId, Database, GtdService, Item, ItemId, NewTask, ProjectId,
    ReadView, SomedayId, Task, TaskId, TudoError, ValidationError, WaitingId,
};

/// tudo - a personal GTD task manager
#[derive(Parser)]
#[command(name = "tudo")]
#[command(about = "A personal command-line task manager")]
#[command(version)]
struct Cli {
    /// Database file (defaults to $TUDO_DB, then ~/.tudo/tudo.db)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Print listings as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Without a command, shows what to do today
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new item
    #[command(subcommand)]
    New(NewCommand),

    /// Mark an item as done
    #[command(subcommand)]
    Done(DoneCommand),

    /// List the inbox
    In,
    /// List waiting-for items
    Waiting,
    /// List someday/maybe items
    Someday,
    /// List next actions
    Next,
    /// List active projects
    Projects,
    /// List contexts
    Contexts,

    /// Show every open task, or every open task of one project
    All {
        #[arg(value_name = "PROJECT")]
        project: Vec<String>,
    },

    /// Show a project's tasks for today
    Project {
        #[arg(value_name = "NAME", required = true)]
        name: Vec<String>,
    },

    /// List things to read
    Read,

    /// Mark every open item in the standard lists as done
    Clean {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,

        /// Also clean waiting-for and someday items
        #[arg(long)]
        all: bool,
    },

    /// Reopen the most recently completed item
    Undo {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Weekly review of the last seven days
    Review,
}

#[derive(Subcommand)]
enum NewCommand {
    /// Capture free text until Ctrl-C or end of input
    In,
    /// Create a next action
    Next,
    /// Create a task under a project
    Task {
        #[arg(value_name = "PROJECT", required = true)]
        project: Vec<String>,
    },
    /// Create a project
    Project,
    /// Create a context
    Context,
    /// Create a waiting-for item
    Wait,
    /// Create a someday/maybe item
    Someday,
}

#[derive(Subcommand)]
enum DoneCommand {
    /// Mark a capture as done
    In { id: String },
    /// Mark a task as done
    Task {
        id: String,

        /// Only complete the task if it belongs to this project
        #[arg(long, value_name = "NAME")]
        project: Option<String>,
    },
    /// Mark a waiting-for item as done
    Waiting { id: String },
    /// Mark a someday item as done, optionally turning it into a project
    Someday {
        id: String,

        /// Create a project from the item without asking
        #[arg(long)]
        promote: bool,

        /// Name for the promoted project (implies --promote)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
    /// Mark a project as done
    Project {
        #[arg(value_name = "NAME", required = true)]
        name: Vec<String>,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _logger = logging::init_logging(cli.verbose)
        .map_err(|e| eprintln!("Warning: failed to initialise logging: {e}"))
        .ok();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", user_message(&e));
        std::process::exit(exit_code(&e));
    }
}

/// Joins the error chain into one line, stopping before the first SQLite
/// error. The raw storage message only goes to the debug log.
fn user_message(error: &anyhow::Error) -> String {
    let mut parts = Vec::new();
    for cause in error.chain() {
        if let Some(source) = cause.downcast_ref::<rusqlite::Error>() {
            debug!("storage failure: {source}");
            break;
        }
        parts.push(cause.to_string());
    }
    parts.join(": ")
}

/// 1 for mistakes the user can fix, 2 for failures of the tool itself.
fn exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<TudoError>() {
            return if err.is_fatal() { 2 } else { 1 };
        }
        if let Some(PromptError::InvalidAnswer(_)) = cause.downcast_ref::<PromptError>() {
            return 1;
        }
    }
    2
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::resolve(cli.db.as_deref())?;
    config.ensure_database_directory()?;
    debug!("using database {}", config.database_path.display());

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database_path.display()
        )
    })?;
    let service = GtdService::new(db);

    let mut ui = Prompter::new(io::stdin().lock(), io::stdout().lock());
    execute(cli.command.as_ref(), cli.json, &service, &mut ui)
}

/// Runs one command against `service`, reading answers from and writing
/// output to `ui`.
fn execute<R: BufRead, W: Write>(
    command: Option<&Commands>,
    json: bool,
    service: &GtdService,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    let Some(command) = command else {
        return show_today(service, json, ui.output());
    };

    match command {
        Commands::New(new) => handle_new(new, service, ui),
        Commands::Done(done) => handle_done(done, service, ui),
        Commands::In => list_items::<CaptureId, _>(service, json, ui.output(), "Inbox is empty"),
        Commands::Waiting => {
            list_items::<WaitingId, _>(service, json, ui.output(), "Nothing to wait for")
        }
        Commands::Someday => {
            list_items::<SomedayId, _>(service, json, ui.output(), "No someday items")
        }
        Commands::Projects => {
            list_items::<ProjectId, _>(service, json, ui.output(), "No active projects")
        }
        Commands::Next => {
            let tasks = service.next_actions()?;
            let out = ui.output();
            if json {
                return write_json(out, &tasks);
            }
            if tasks.is_empty() {
                writeln!(out, "No next actions for now")?;
            }
            write_tasks(out, service, &tasks, false)
        }
        Commands::Contexts => {
            let contexts = service.contexts()?;
            let out = ui.output();
            if json {
                return write_json(out, &contexts);
            }
            if contexts.is_empty() {
                writeln!(out, "No contexts")?;
            }
            for context in &contexts {
                writeln!(out, "- [{}] {}", context.id, context.name)?;
            }
            Ok(())
        }
        Commands::All { project } if project.is_empty() => show_all(service, json, ui.output()),
        Commands::All { project } => show_project(service, &project.join(" "), true, json, ui),
        Commands::Project { name } => show_project(service, &name.join(" "), false, json, ui),
        Commands::Read => show_read(service, json, ui.output()),
        Commands::Clean { yes, all } => handle_clean(service, *yes, *all, ui),
        Commands::Undo { yes } => handle_undo(service, *yes, ui),
        Commands::Review => show_review(service, json, ui.output()),
    }
}

fn handle_new<R: BufRead, W: Write>(
    command: &NewCommand,
    service: &GtdService,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    match command {
        NewCommand::In => {
            let cancel = spawn_interrupt_watcher()?;
            writeln!(
                ui.output(),
                "Capture started (Ctrl-C then Enter, or Ctrl-D, to finish)"
            )?;
            let text = CaptureSession::new(ui.input(), cancel)
                .run()
                .context("failed to read capture")?;
            let id = service.capture(&text)?;
            writeln!(ui.output(), "Created capture {id}")?;
        }
        NewCommand::Next => {
            let content = ui.line("New next action: ")?;
            let due = ask_due_date(service, ui)?;
            let context = ask_context(service, ui)?;
            let id = service.add_next_action(&content, due, context)?;
            writeln!(ui.output(), "Created next action {id}")?;
        }
        NewCommand::Task { project } => {
            let name = project.join(" ");
            // Fail before asking anything if the project is not there.
            service.active_project(&name)?;

            let content = ui.line(&format!("New task for `{name}`: "))?;
            let mut task = NewTask::new(content);
            task.due = ask_due_date(service, ui)?;
            task.context = ask_context(service, ui)?;
            let id = service.add_project_task(&name, task)?;
            writeln!(ui.output(), "Created task {id} for `{name}`")?;
        }
        NewCommand::Project => {
            let name = ui.line("New project name: ")?;
            service.add_project(&name)?;
            writeln!(ui.output(), "Project `{}` has been created", name.trim())?;
        }
        NewCommand::Context => {
            let contexts = service.contexts()?;
            if !contexts.is_empty() {
                writeln!(ui.output(), "Existing contexts:")?;
                for context in &contexts {
                    writeln!(ui.output(), "  {}", context.name)?;
                }
            }
            let name = ui.line("New context: ")?;
            service.add_context(&name)?;
            writeln!(ui.output(), "Created context `{}`", name.trim())?;
        }
        NewCommand::Wait => {
            let content = ui.line("Waiting for: ")?;
            let id = service.add_waiting(&content)?;
            writeln!(ui.output(), "Created waiting item {id}")?;
        }
        NewCommand::Someday => {
            let content = ui.line("Someday/maybe: ")?;
            let id = service.add_someday(&content)?;
            writeln!(ui.output(), "Created someday item {id}")?;
        }
    }
    Ok(())
}

fn ask_due_date<R: BufRead, W: Write>(
    service: &GtdService,
    ui: &mut Prompter<R, W>,
) -> Result<Option<time::Date>> {
    let answer = ui.optional("Due date (YYYY-MM-DD, Enter for none): ")?;
    let due = answer
        .map(|input| service.parse_due_date(&input))
        .transpose()
        .map_err(TudoError::from)?;
    Ok(due)
}

fn ask_context<R: BufRead, W: Write>(
    service: &GtdService,
    ui: &mut Prompter<R, W>,
) -> Result<Option<ContextId>> {
    let contexts = service.contexts()?;
    if contexts.is_empty() {
        return Ok(None);
    }

    for context in &contexts {
        writeln!(ui.output(), "  {}. {}", context.id, context.name)?;
    }
    let Some(answer) = ui.optional("Context (Enter for none): ")? else {
        return Ok(None);
    };
    Ok(Some(ContextId::new(parse_id(&answer)?)))
}

/// Parses a positive row id typed by the user.
fn parse_id(input: &str) -> Result<i64, TudoError> {
    input
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ValidationError::MalformedId(input.trim().to_string()).into())
}

fn handle_done<R: BufRead, W: Write>(
    command: &DoneCommand,
    service: &GtdService,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    match command {
        DoneCommand::In { id } => {
            let id = CaptureId::new(parse_id(id)?);
            service.complete(id)?;
            writeln!(ui.output(), "Marked capture item {id} as done")?;
        }
        DoneCommand::Task { id, project } => {
            let id = TaskId::new(parse_id(id)?);
            let task = match project {
                Some(project) => service.complete_project_task(project, id)?,
                None => {
                    service.complete(id)?;
                    service.task(id)?
                }
            };
            writeln!(ui.output(), "Finished task {id}: {}", task.content)?;
        }
        DoneCommand::Waiting { id } => {
            let id = WaitingId::new(parse_id(id)?);
            service.complete(id)?;
            writeln!(ui.output(), "Marked waiting item {id} as done")?;
        }
        DoneCommand::Someday { id, promote, name } => {
            let id = SomedayId::new(parse_id(id)?);
            service.complete(id)?;
            writeln!(ui.output(), "Marked someday item {id} as done")?;
            promote_someday(service, id, *promote, name.as_deref(), ui)?;
        }
        DoneCommand::Project { name } => {
            let project = service.complete_project(&name.join(" "))?;
            writeln!(ui.output(), "Finished project `{}`", project.content)?;
        }
    }
    Ok(())
}

fn promote_someday<R: BufRead, W: Write>(
    service: &GtdService,
    id: SomedayId,
    promote: bool,
    name: Option<&str>,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    let name = if promote || name.is_some() {
        name.map(str::to_string)
    } else {
        if !ui.confirm("Create a project from it?")? {
            return Ok(());
        }
        if ui.confirm("Use the item as the project name?")? {
            None
        } else {
            Some(ui.line("Project name: ")?)
        }
    };

    let project = service.promote_someday(id, name.as_deref())?;
    let project = service.item(project)?;
    writeln!(
        ui.output(),
        "Project `{}` has been created",
        project.content
    )?;
    Ok(())
}

fn handle_clean<R: BufRead, W: Write>(
    service: &GtdService,
    yes: bool,
    all: bool,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    let scopes: &[CleanScope] = if all {
        &CleanScope::ALL
    } else {
        &CleanScope::DEFAULT
    };

    let mut cleaned_any = false;
    for &scope in scopes {
        let count = service.clean_count(scope)?;
        if count == 0 {
            continue;
        }
        let question = format!(
            "You will be cleaning out {count} {}. Continue?",
            scope.label()
        );
        if yes || ui.confirm(&question)? {
            let cleaned = service.clean(scope)?;
            writeln!(ui.output(), "Cleaned {cleaned} {}", scope.label())?;
            cleaned_any = true;
        }
    }

    if !cleaned_any {
        writeln!(ui.output(), "Nothing was cleaned")?;
    }
    Ok(())
}

fn handle_undo<R: BufRead, W: Write>(
    service: &GtdService,
    yes: bool,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    let entry = service.last_action()?.ok_or(TudoError::NothingToUndo)?;
    let label = match service.content_of(entry.target) {
        Ok(content) => format!("{} `{content}`", entry.target),
        Err(e) => {
            warn!("could not read {}: {e}", entry.target);
            entry.target.to_string()
        }
    };

    let question = format!("You will be marking {label} as undone. Continue?");
    if !yes && !ui.confirm(&question)? {
        return Ok(());
    }

    let undone = service.undo()?;
    writeln!(ui.output(), "Marked {} as undone", undone.target)?;
    Ok(())
}

/// Listens for Ctrl-C on its own thread and fires the returned channel once.
fn spawn_interrupt_watcher() -> Result<oneshot::Receiver<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;
    let (tx, rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        let _ = tx.send(());
                    }
                    Err(e) => warn!("could not listen for Ctrl-C: {e}"),
                }
            });
        })
        .context("failed to spawn interrupt watcher")?;

    Ok(rx)
}

fn show_today<W: Write>(service: &GtdService, json: bool, out: &mut W) -> Result<()> {
    let view = service.today_view()?;
    if json {
        return write_json(out, &view);
    }
    if view.is_empty() {
        writeln!(out, "No tasks for now")?;
        return Ok(());
    }

    writeln!(out, "CALENDAR")?;
    write_tasks(out, service, &view.calendar, false)?;
    writeln!(out, "\nNEXT ACTIONS")?;
    write_tasks(out, service, &view.next_actions, false)?;
    writeln!(out, "\nPROJECTS")?;
    write_project_tasks(out, service, &view.projects)?;
    writeln!(out, "\nWAITING")?;
    write_items(out, &view.waiting)
}

fn show_all<W: Write>(service: &GtdService, json: bool, out: &mut W) -> Result<()> {
    let view = service.all_view()?;
    if json {
        return write_json(out, &view);
    }
    if view.is_empty() {
        writeln!(out, "No tasks for now")?;
        return Ok(());
    }

    writeln!(out, "CALENDAR")?;
    write_tasks(out, service, &view.calendar, true)?;
    writeln!(out, "\nNEXT ACTIONS")?;
    write_tasks(out, service, &view.next_actions, false)?;
    writeln!(out, "\nPROJECTS")?;
    write_project_tasks(out, service, &view.projects)?;
    writeln!(out, "\nWAITING")?;
    write_items(out, &view.waiting)
}

fn show_project<R: BufRead, W: Write>(
    service: &GtdService,
    name: &str,
    all: bool,
    json: bool,
    ui: &mut Prompter<R, W>,
) -> Result<()> {
    let view = service.project_view(name, all)?;
    let out = ui.output();
    if json {
        return write_json(out, &view);
    }
    if view.is_empty() {
        let when = if all { "" } else { " today" };
        writeln!(out, "No tasks for project `{}`{when}", view.project.content)?;
        return Ok(());
    }

    write_tasks(out, service, &view.dated, false)?;
    write_tasks(out, service, &view.undated, false)
}

fn show_read<W: Write>(service: &GtdService, json: bool, out: &mut W) -> Result<()> {
    let view = service.read_view()?;
    if json {
        return write_json(out, &view);
    }
    match &view {
        _ if view.is_empty() => writeln!(out, "Nothing to read for now")?,
        ReadView::Tasks(tasks) => write_tasks(out, service, tasks, true)?,
        ReadView::Someday(items) => write_items(out, items)?,
    }
    Ok(())
}

fn show_review<W: Write>(service: &GtdService, json: bool, out: &mut W) -> Result<()> {
    let review = service.review()?;
    if json {
        return write_json(out, &review);
    }

    writeln!(out, "FINISHED PROJECTS")?;
    write_items(out, &review.finished_projects)?;
    writeln!(out, "\nACTIVE PROJECTS")?;
    write_items(out, &review.active_projects)?;
    writeln!(out, "\nUPCOMING CALENDAR TASKS")?;
    write_tasks(out, service, &review.calendar.pending, true)?;
    writeln!(out, "\nMISSED CALENDAR TASKS")?;
    write_tasks(out, service, &review.missed, true)?;
    writeln!(out, "\nOPEN NEXT ACTIONS")?;
    write_tasks(out, service, &review.next_actions.pending, false)?;
    writeln!(out, "\nOPEN WAITING ITEMS")?;
    write_items(out, &review.waiting.pending)?;

    writeln!(out, "\nFINISHED TASKS")?;
    for (day, finished) in review.finished_by_day() {
        writeln!(out, "Date: {day}")?;
        write_tasks(out, service, &finished.tasks, true)?;
        write_items(out, &finished.waiting)?;
    }
    Ok(())
}

fn list_items<I: ItemId + Serialize, W: Write>(
    service: &GtdService,
    json: bool,
    out: &mut W,
    empty: &str,
) -> Result<()> {
    let items = service.active::<I>()?;
    if json {
        return write_json(out, &items);
    }
    if items.is_empty() {
        writeln!(out, "{empty}")?;
    }
    write_items(out, &items)
}

fn write_json<W: Write>(out: &mut W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode JSON")?;
    writeln!(out)?;
    Ok(())
}

fn write_items<I: ItemId, W: Write>(out: &mut W, items: &[Item<I>]) -> Result<()> {
    for item in items {
        writeln!(out, "- [{}] {}", item.id, item.content)?;
    }
    Ok(())
}

fn write_project_tasks<W: Write>(
    out: &mut W,
    service: &GtdService,
    projects: &[ProjectTasks],
) -> Result<()> {
    for entry in projects {
        writeln!(out, "{}", entry.project.content)?;
        write_tasks(out, service, &entry.tasks, false)?;
    }
    Ok(())
}

fn write_tasks<W: Write>(
    out: &mut W,
    service: &GtdService,
    tasks: &[Task],
    show_project: bool,
) -> Result<()> {
    for task in tasks {
        writeln!(out, "- [{}] {}", task.id, task.content)?;
        if let Some(due) = task.due {
            writeln!(out, "    due: {due}")?;
        }
        if show_project && let Some(project) = task.project_id {
            writeln!(out, "    project: {}", service.item(project)?.content)?;
        }
        if let Some(context) = task.context_id {
            writeln!(out, "    context: {}", service.context(context)?.name)?;
        }
    }
    Ok(())
}
