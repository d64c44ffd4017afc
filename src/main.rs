use anyhow::Result;
use clap::{Arg, Command};
use colored::*;
use std::sync::Arc;

use gpumon::core::process_control::{CriticalProcessGuard, ProcessControlExecutor};
use gpumon::core::process_monitor::query;
use gpumon::core::process_monitor::types::{
    ControlOperation, ControlResult, GpuProcess, ProcessFilter, ProcessQuery, ProcessSort,
};
use gpumon::core::process_monitor::MonitorRuntime;
use gpumon::platform::{get_gpu_process_provider, SystemProcessActions};
use gpumon::MonitorConfig;

#[tokio::main]
async fn main() -> Result<()> {
    gpumon::init_logging();

    let matches = Command::new("gpumon")
        .version("0.1.0")
        .about("GPU process monitoring and control")
        .subcommand(
            Command::new("watch")
                .about("Continuously monitor GPU processes and print update batches"),
        )
        .subcommand(
            Command::new("list")
                .about("List GPU processes once")
                .arg(
                    Arg::new("min-usage")
                        .long("min-usage")
                        .value_name("PERCENT")
                        .help("Only show processes at or above this GPU usage"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_name("N")
                        .help("Show at most N processes"),
                ),
        )
        .subcommand(
            Command::new("kill")
                .about("Terminate a GPU process")
                .arg(Arg::new("pid").required(true)),
        )
        .subcommand(
            Command::new("suspend")
                .about("Suspend a GPU process")
                .arg(Arg::new("pid").required(true)),
        )
        .subcommand(
            Command::new("resume")
                .about("Resume a suspended GPU process")
                .arg(Arg::new("pid").required(true)),
        )
        .subcommand(
            Command::new("priority")
                .about("Change a process scheduling priority")
                .arg(Arg::new("pid").required(true))
                .arg(
                    Arg::new("level")
                        .required(true)
                        .help("low, below_normal, normal, above_normal, high, realtime"),
                ),
        )
        .subcommand(
            Command::new("critical").about("Show the critical-process protection table"),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("watch", _)) => watch().await,
        Some(("list", sub)) => {
            let min_usage: f32 = sub
                .get_one::<String>("min-usage")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(0.0);
            let limit: Option<usize> = sub
                .get_one::<String>("limit")
                .map(|s| s.parse())
                .transpose()?;
            list(min_usage, limit)
        }
        Some(("kill", sub)) => control(sub, ControlOperation::Kill, None),
        Some(("suspend", sub)) => control(sub, ControlOperation::Suspend, None),
        Some(("resume", sub)) => control(sub, ControlOperation::Resume, None),
        Some(("priority", sub)) => {
            let level = sub
                .get_one::<String>("level")
                .map(String::as_str)
                .unwrap_or_default()
                .to_string();
            control(sub, ControlOperation::Priority, Some(level))
        }
        Some(("critical", _)) => {
            show_critical();
            Ok(())
        }
        _ => {
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}

async fn watch() -> Result<()> {
    let config = MonitorConfig::load()?;
    let runtime = MonitorRuntime::new(&config)?;
    runtime.start()?;

    let service = runtime.service();
    let mut batches = service.subscribe_batches();

    println!(
        "{}",
        "Watching GPU processes (Ctrl-C to stop)...".bold()
    );

    while let Ok(batch) = batches.recv().await {
        println!(
            "{} {} update(s)",
            chrono::Local::now().format("%H:%M:%S"),
            batch.len()
        );
        print_table(&batch);
    }

    runtime.shutdown();
    Ok(())
}

fn list(min_usage: f32, limit: Option<usize>) -> Result<()> {
    let mut provider = get_gpu_process_provider()?;
    let processes = provider.snapshot()?;

    let request = ProcessQuery {
        filter: Some(ProcessFilter {
            usage_threshold: min_usage,
            ..Default::default()
        }),
        sort: Some(ProcessSort::default()),
        max_items: limit,
        offset: 0,
    };
    let result = query::evaluate(processes, &request, 0.0);

    print_table(&result.processes);
    println!(
        "{} of {} process(es) shown",
        result.processes.len(),
        result.total_count
    );
    Ok(())
}

fn control(
    sub: &clap::ArgMatches,
    operation: ControlOperation,
    priority: Option<String>,
) -> Result<()> {
    let pid: i32 = sub
        .get_one::<String>("pid")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()?;

    let executor = ProcessControlExecutor::new(
        Arc::new(SystemProcessActions::new()),
        Arc::new(CriticalProcessGuard::for_current_platform()),
    );

    let result = executor.execute(pid, operation, priority.as_deref());
    print_result(&result);
    Ok(())
}

fn show_critical() {
    let guard = CriticalProcessGuard::for_current_platform();
    println!("{}", "Protected processes:".bold());
    for entry in guard.entries() {
        println!("  {:<30} {:?}", entry.pattern, entry.level);
    }
}

fn print_table(processes: &[GpuProcess]) {
    if processes.is_empty() {
        println!("  (no GPU processes)");
        return;
    }

    println!(
        "  {:<8} {:<24} {:>7} {:>10}  {:<8} {}",
        "PID".bold(),
        "NAME".bold(),
        "GPU%".bold(),
        "MEM (MB)".bold(),
        "TYPE".bold(),
        "STATUS".bold()
    );
    for proc in processes {
        println!(
            "  {:<8} {:<24} {:>7.1} {:>10.1}  {:<8} {:?}",
            proc.pid,
            truncate(&proc.name, 24),
            proc.gpu_usage_percent,
            proc.gpu_memory_mb,
            format!("{:?}", proc.process_type).to_lowercase(),
            proc.status
        );
    }
}

fn print_result(result: &ControlResult) {
    if result.success {
        println!(
            "{} PID {}: {}",
            "OK".green().bold(),
            result.pid,
            result.message
        );
    } else {
        println!(
            "{} PID {}: {}",
            "FAILED".red().bold(),
            result.pid,
            result.message
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
