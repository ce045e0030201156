use std::cell::RefCell;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::settings_io;
use crate::io::transaction_io;
use crate::model::config::{StatusCycleConfig, StatusSettings};
use crate::model::document::Text;
use crate::model::transaction::{Transaction, TransactionSpec};
use crate::ops::completion::CompletionMonitor;
use crate::ops::filter::{StatusCycler, StatusHost, TaskCompleted, TransactionFilter};
use crate::ops::rewrite::Filtered;
use crate::ops::switcher;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Settings and plugin state as seen from the command line
struct CliHost {
    settings: StatusSettings,
    tasks_plugin: bool,
    completed: RefCell<Vec<TaskCompleted>>,
}

impl StatusHost for CliHost {
    fn settings(&self) -> StatusSettings {
        self.settings.clone()
    }

    fn tasks_api_available(&self) -> bool {
        self.tasks_plugin
    }

    fn task_completed(&self, event: &TaskCompleted) {
        self.completed.borrow_mut().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let settings = settings_io::load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Filter(args) => cmd_filter(args, settings, cli.tasks_plugin, json),
        Commands::Cycle(args) => cmd_cycle(args, &settings, json),
        Commands::Set(args) => cmd_set(args, &settings, json),
        Commands::Config => cmd_config(&settings, json),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_filter(args: FilterArgs, settings: StatusSettings, tasks_plugin: bool, json: bool) -> CmdResult {
    let tr = if args.transaction.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        transaction_io::parse_transaction(&text)?
    } else {
        transaction_io::read_transaction(&args.transaction)?
    };

    // Running the filter explicitly does not depend on enableCycleCompleteStatus
    let host = CliHost {
        settings,
        tasks_plugin,
        completed: RefCell::new(Vec::new()),
    };
    let cycler = StatusCycler::new(&host);
    let result = cycler.filter(&tr);
    if result.is_pass_through() {
        // Completions typed by hand go through unchanged but are still reported
        CompletionMonitor::new(&host).filter(&tr);
    }

    let doc = match &result {
        Filtered::PassThrough(_) => tr.new_doc.clone(),
        Filtered::Rewrite(spec) => Transaction::from_spec(tr.start_doc.clone(), spec)?.new_doc,
    };

    if json {
        let completed = host.completed.borrow();
        let out = filter_to_json(&result, &completed, doc.to_string());
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match &result {
        Filtered::PassThrough(reason) => println!("pass: {}", reason),
        Filtered::Rewrite(spec) => {
            println!("rewrite:");
            for change in &spec.changes {
                println!("  {}", format_change(change));
            }
        }
    }
    for event in host.completed.borrow().iter() {
        println!("completed: line {}", event.line_number);
    }
    println!();
    print!("{}", doc);
    if !doc.as_str().ends_with('\n') {
        println!();
    }
    Ok(())
}

fn cmd_cycle(args: CycleArgs, settings: &StatusSettings, json: bool) -> CmdResult {
    let config = StatusCycleConfig::for_switcher(settings);
    let doc = read_doc(&args.file)?;
    let task = switcher::task_span_at_line(&doc, args.line)
        .ok_or_else(|| format!("line {} is not a task", args.line))?;

    let spec = if args.jump {
        switcher::jump_task_state(&doc, task.span.clone(), &config)
    } else {
        switcher::cycle_task_state(&doc, task.span.clone(), &config)
    }
    .ok_or("no state to move to: every state is excluded from the cycle")?;

    finish_state_change(&args.file, args.line, &task.mark, &doc, &spec, &config, args.in_place, json)
}

fn cmd_set(args: SetArgs, settings: &StatusSettings, json: bool) -> CmdResult {
    let config = StatusCycleConfig::for_switcher(settings);
    if !config.cycle.contains(&args.state) {
        return Err(format!(
            "unknown state: {} (expected one of: {})",
            args.state,
            config.cycle.join(", ")
        )
        .into());
    }

    let doc = read_doc(&args.file)?;
    let task = switcher::task_span_at_line(&doc, args.line)
        .ok_or_else(|| format!("line {} is not a task", args.line))?;
    let spec = switcher::set_task_state(&doc, task.span.clone(), &args.state, &config)
        .ok_or_else(|| format!("line {} has no checkbox", args.line))?;

    finish_state_change(&args.file, args.line, &task.mark, &doc, &spec, &config, args.in_place, json)
}

fn cmd_config(settings: &StatusSettings, json: bool) -> CmdResult {
    let cycler = StatusCycleConfig::from_settings(settings);
    let switcher = StatusCycleConfig::for_switcher(settings);

    if json {
        let out = ConfigJson {
            enable_cycle_complete_status: settings.enable_cycle_complete_status,
            enable_task_status_switcher: settings.enable_task_status_switcher,
            respect_manual_marks: settings.respect_manual_marks,
            cycler: cycle_to_json(&cycler),
            switcher: cycle_to_json(&switcher),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let on_off = |b: bool| if b { "on" } else { "off" };
    println!("cycle:    {}", format_cycle(&cycler));
    println!("switcher: {}", format_cycle(&switcher));
    println!(
        "cycle complete status: {}",
        on_off(settings.enable_cycle_complete_status)
    );
    println!(
        "task status switcher:  {}",
        on_off(settings.enable_task_status_switcher)
    );
    println!("respect manual marks:  {}", on_off(settings.respect_manual_marks));
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_doc(path: &Path) -> Result<Text, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {}", path.display(), e))?;
    Ok(Text::new(content))
}

#[allow(clippy::too_many_arguments)]
fn finish_state_change(
    path: &Path,
    line: usize,
    old_mark: &str,
    doc: &Text,
    spec: &TransactionSpec,
    config: &StatusCycleConfig,
    in_place: bool,
    json: bool,
) -> CmdResult {
    let new_doc = spec.apply_to(doc)?;
    let new_mark = switcher::task_span_at_line(&new_doc, line)
        .map(|t| t.mark)
        .unwrap_or_default();
    let from_state = switcher::task_state_of(old_mark, config);
    let to_state = switcher::task_state_of(&new_mark, config);

    if in_place {
        fs::write(path, new_doc.as_str())
            .map_err(|e| format!("could not write {}: {}", path.display(), e))?;
    }

    if json {
        let out = StateChangeJson {
            line,
            from_mark: old_mark.to_string(),
            to_mark: new_mark.clone(),
            from_state: from_state.map(String::from),
            to_state: to_state.map(String::from),
            doc: new_doc.to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if in_place {
        println!(
            "line {}: {} → {}",
            line,
            from_state.unwrap_or(old_mark),
            to_state.unwrap_or(&new_mark)
        );
    } else {
        print!("{}", new_doc);
    }
    Ok(())
}
