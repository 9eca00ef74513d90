//! Print period and WBS reports for the tasks in a snapshot directory
//!
//! Run with: cargo run --bin fabtrack-report -- [filters] [day|week|month|year] [data-path]
//!       or: cargo run --bin fabtrack-report -- watch <task-name> [data-path]
//!
//! Filters: --project <id>, --assignee <name>, --status <status>

use std::process::ExitCode;

use chrono::Utc;
use env_logger::Env;
use serde_json::json;

use fabtrack_lib::tracking::{
    aggregate_by_period, aggregate_wbs, compute_live_elapsed, load_all_tasks, load_config,
    AppConfig, Granularity, LiveElapsedTracker, Task, TaskFilter, TaskStatus,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let (args, filter) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.first().map(String::as_str) == Some("watch") {
        let Some(task_name) = args.get(1) else {
            eprintln!("usage: fabtrack-report watch <task-name> [data-path]");
            return ExitCode::FAILURE;
        };
        return watch(task_name, args.get(2).map(String::as_str)).await;
    }

    let data_path = args.get(1).map(String::as_str);
    let (config, tasks) = match load(data_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let granularity = match args.first() {
        Some(raw) => raw.parse::<Granularity>().unwrap_or_else(|e| {
            log::warn!("{}, using {}", e, config.default_granularity);
            config.default_granularity
        }),
        None => config.default_granularity,
    };

    let total = tasks.len();
    let tasks: Vec<Task> = tasks.into_iter().filter(|task| filter.matches(task)).collect();
    if tasks.len() != total {
        log::info!("{} of {} tasks match the filters", tasks.len(), total);
    }

    let now = Utc::now();
    let periods = aggregate_by_period(&tasks, granularity, now);
    let wbs = aggregate_wbs(&tasks);
    let active: Vec<_> = tasks
        .iter()
        .filter(|task| task.is_in_progress())
        .map(|task| {
            json!({
                "name": task.name,
                "elapsed": compute_live_elapsed(task, now),
            })
        })
        .collect();

    let output = json!({
        "periods": periods,
        "wbs": wbs,
        "wbsTotals": wbs.totals(),
        "activeTasks": active,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Split `--project`, `--assignee` and `--status` options from the
/// positional arguments.
fn parse_args<I>(args: I) -> Result<(Vec<String>, TaskFilter), String>
where
    I: IntoIterator<Item = String>,
{
    let mut positional = Vec::new();
    let mut project = None;
    let mut assignee = None;
    let mut status = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--project" => &mut project,
            "--assignee" => &mut assignee,
            "--status" => &mut status,
            _ => {
                positional.push(arg);
                continue;
            }
        };
        match args.next() {
            Some(value) => *slot = Some(value),
            None => return Err(format!("{} needs a value", arg)),
        }
    }

    let filter = TaskFilter::new()
        .with_project(project)
        .with_assignee(assignee)
        .with_status(status.as_deref().map(TaskStatus::from_key));
    Ok((positional, filter))
}

fn load(data_path: Option<&str>) -> Result<(AppConfig, Vec<Task>), ExitCode> {
    let config = load_config(data_path).map_err(|e| {
        eprintln!("Error: failed to load config: {}", e);
        ExitCode::FAILURE
    })?;

    let tasks = load_all_tasks(config.data_path.as_deref().or(data_path)).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    })?;

    log::info!("Loaded {} tasks", tasks.len());
    Ok((config, tasks))
}

/// Print the live elapsed time of one task on every tick until it stops.
async fn watch(task_name: &str, data_path: Option<&str>) -> ExitCode {
    let (config, tasks) = match load(data_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let Some(task) = tasks
        .iter()
        .find(|task| task.name.as_deref() == Some(task_name))
    else {
        eprintln!("Error: no task named {:?}", task_name);
        return ExitCode::FAILURE;
    };

    let mut tracker = LiveElapsedTracker::from_config(&config);
    let mut rx = tracker.subscribe();
    tracker.observe(task);

    loop {
        let value = rx.borrow_and_update().clone();
        println!("{}  {}", value.formatted_time, if value.is_active { "active" } else { "idle" });

        if !tracker.is_ticking() || rx.changed().await.is_err() {
            break;
        }
    }

    ExitCode::SUCCESS
}
