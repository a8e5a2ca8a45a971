use std::error::Error;
use std::process::ExitCode;

use vivi::capture::{self, Captured};
use vivi::config::Config;
use vivi::core::task::{Task, TaskPatch, TaskStatus, sort_for_list};
use vivi::health;
use vivi::links::display::{DEFAULT_MAX_LEN, link_type_label, shorten_url};
use vivi::links::library::LinkLibrary;
use vivi::links::{HttpTitleFetcher, LinkRegistry, TitleResolver};
use vivi::parse::interpret_now;
use vivi::store::{JsonStore, RecordStore};

const USAGE: &str = "\
Usage: vivi <command> [args]

  add <text...>       Add a task; #h/#l/#m/#i, dates and links are read from the text
  parse <text...>     Show how the text would be read, without saving
  prep [lines...]     Add a \"Prep for\" task per meeting (one per line, read from stdin without args)
  list [status]       List tasks (todo, completed, someday)
  done <id>           Mark a task completed
  someday <id>        Move a task to someday
  links [query]       Show the link library, optionally filtered
  scan                Catalog links from every stored task
  health              Flag stale tasks and list them";

type CliResult = Result<(), Box<dyn Error>>;

fn init_logging() {
    // Journal first (`journalctl --user -t vivi -f`): vivi at info/debug, everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("vivi") {
                let max = if vivi::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    let journal = systemd_journal_logger::JournalLog::new()
        .map(|j| j.with_syslog_identifier("vivi".to_string()));
    let installed = match journal {
        Ok(inner) => log::set_boxed_logger(Box::new(FilteredJournal { inner })).is_ok(),
        Err(_) => false,
    };
    if installed {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        let level = if vivi::debug_logging() { "debug" } else { "info" };
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(format!("warn,vivi={}", level)),
        )
        .try_init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vivi: {}, using defaults", e);
            Config::default()
        }
    };
    vivi::set_debug_logging(config.debug_logging);
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    };

    match run(&config, command, rest).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vivi: {}", e);
            if command == "add" && !rest.is_empty() {
                eprintln!("Not saved: {}", rest.join(" "));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, command: &str, args: &[String]) -> CliResult {
    match command {
        "parse" => {
            let parsed = interpret_now(&args.join(" "));
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(())
        }
        "add" => {
            let registry = registry(config)?;
            let mut store = open_store(config)?;
            let now = chrono::Local::now().naive_local();
            let captured = capture::add_task(&mut store, &registry, &args.join(" "), now).await?;
            report(&captured);
            Ok(())
        }
        "prep" => {
            let meetings = if args.is_empty() {
                std::io::read_to_string(std::io::stdin())?
            } else {
                args.join("\n")
            };
            let registry = registry(config)?;
            let mut store = open_store(config)?;
            let now = chrono::Local::now().naive_local();
            let captured = capture::import_meeting_prep(&mut store, &registry, &meetings, now).await?;
            if captured.is_empty() {
                println!("No meetings found");
            }
            captured.iter().for_each(report);
            Ok(())
        }
        "list" => {
            let store = open_store(config)?;
            let mut tasks = match args.first() {
                Some(s) => {
                    let status = TaskStatus::from_keyword(s).ok_or_else(|| format!("Unknown status '{}'", s))?;
                    store.tasks_with_status(&[status])?
                }
                None => store.tasks()?,
            };
            sort_for_list(&mut tasks);
            tasks.iter().for_each(print_task);
            Ok(())
        }
        "done" => {
            let mut store = open_store(config)?;
            let id = find_task(&store, args.first())?;
            store.update_task(id, TaskPatch::complete(chrono::Local::now().naive_local()))?;
            Ok(())
        }
        "someday" => {
            let mut store = open_store(config)?;
            let id = find_task(&store, args.first())?;
            health::move_to_someday(&mut store, id)?;
            Ok(())
        }
        "links" => {
            let store = open_store(config)?;
            print_library(&LinkLibrary::load(&store, &args.join(" "))?);
            Ok(())
        }
        "scan" => {
            let mut store = open_store(config)?;
            let summary = registry(config)?.scan_tasks(&mut store).await?;
            println!(
                "Scanned {} tasks: {} new links, {} reused titles, {} retitled",
                summary.tasks_scanned, summary.inserted, summary.reused, summary.retitled
            );
            Ok(())
        }
        "health" => {
            let mut store = open_store(config)?;
            let now = chrono::Local::now().naive_local();
            health::check_task_health(&mut store, now, config.stale_after_days)?;
            let stale = health::stale_tasks(&store)?;
            if stale.is_empty() {
                println!("No stale tasks");
            }
            stale.iter().for_each(print_task);
            Ok(())
        }
        "help" | "-h" | "--help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => Err(format!("Unknown command '{}'\n\n{}", other, USAGE).into()),
    }
}

/// Print a stored task. A link catalog failure is reported on its own: the task is saved.
fn report(captured: &Captured) {
    print_task(&captured.task);
    if let Some(e) = &captured.link_error {
        eprintln!("vivi: task saved, but its links were not cataloged ({}); run `vivi scan` to retry", e);
    }
}

fn open_store(config: &Config) -> Result<JsonStore, Box<dyn Error>> {
    config.ensure_dirs()?;
    Ok(JsonStore::open(config.store_path())?)
}

fn registry(config: &Config) -> Result<LinkRegistry<HttpTitleFetcher>, Box<dyn Error>> {
    let fetcher = HttpTitleFetcher::new(config.fetch_timeout(), &config.user_agent)?;
    Ok(LinkRegistry::new(TitleResolver::new(fetcher, config.fetch_timeout()))
        .refresh_fallback_titles(config.refresh_fallback_titles))
}

/// Accepts a full id or any unambiguous prefix of one.
fn find_task(store: &JsonStore, arg: Option<&String>) -> Result<uuid::Uuid, Box<dyn Error>> {
    let arg = arg.ok_or("Missing task id")?.to_ascii_lowercase();
    let matches: Vec<_> = store
        .tasks()?
        .into_iter()
        .filter(|t| t.id.to_string().starts_with(&arg))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id),
        [] => Err(format!("No task matches '{}'", arg).into()),
        _ => Err(format!("'{}' matches {} tasks", arg, matches.len()).into()),
    }
}

fn print_task(task: &Task) {
    let id = task.id.to_string();
    let mut line = format!(
        "{} [{}] {} ({})",
        &id[..8],
        task.status.as_keyword(),
        task.title,
        task.priority.as_keyword()
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%a %b %-d %H:%M")));
    }
    if task.is_stale {
        line.push_str(" stale");
    }
    println!("{}", line);
    for link in &task.links {
        println!("    {}", shorten_url(link, DEFAULT_MAX_LEN));
    }
}

fn print_library(library: &LinkLibrary) {
    if library.is_empty() {
        println!("No links");
        return;
    }
    for (heading, groups) in [("Active", &library.active), ("Archived", &library.archived)] {
        if groups.is_empty() {
            continue;
        }
        println!("{}", heading);
        for group in groups {
            println!("  {}", group.domain);
            for link in &group.links {
                println!(
                    "    {} [{}] {}",
                    link.title,
                    link_type_label(&link.url),
                    shorten_url(&link.url, DEFAULT_MAX_LEN)
                );
            }
        }
    }
}
