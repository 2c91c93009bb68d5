use std::process::ExitCode;

use jarward::{Error, RestartOutcome, StartOutcome, StatusReport, StopReport};
use owo_colors::OwoColorize;

pub fn start(name: &str, result: Result<StartOutcome, Error>) -> ExitCode {
	match result {
		Ok(outcome) => {
			print_start(name, &outcome);
			ExitCode::SUCCESS
		}
		Err(e) => failure(name, &e),
	}
}

pub fn stop(name: &str, result: Result<StopReport, Error>) -> ExitCode {
	match result {
		Ok(report) => {
			print_stop(name, &report);
			ExitCode::SUCCESS
		}
		Err(e) => failure(name, &e),
	}
}

pub fn restart(name: &str, result: Result<RestartOutcome, Error>) -> ExitCode {
	match result {
		Ok(outcome) => {
			match &outcome.stop {
				Ok(report) => print_stop(name, report),
				Err(e) => eprintln!("{}: {} {}", name, "stop failed:".yellow(), e),
			}
			print_start(name, &outcome.start);
			if old_instance_survived(&outcome) {
				eprintln!("{} {}: previous instance is still running", "✗".red(), name);
				ExitCode::FAILURE
			} else {
				ExitCode::SUCCESS
			}
		}
		Err(e) => failure(name, &e),
	}
}

/// The stop half failed and the start found the old process still up.
fn old_instance_survived(outcome: &RestartOutcome) -> bool {
	outcome.stop.is_err() && matches!(outcome.start, StartOutcome::AlreadyRunning { .. })
}

pub fn status(report: &StatusReport, json: bool) -> ExitCode {
	if json {
		match serde_json::to_string_pretty(report) {
			Ok(s) => println!("{}", s),
			Err(e) => eprintln!("error: {}", e),
		}
	} else {
		print_status(report);
	}

	if report.is_running() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

fn print_start(name: &str, outcome: &StartOutcome) {
	match outcome {
		StartOutcome::Started { pid, log_path, gc_log_path } => {
			println!("{} {}: {} (pid {})", "●".green(), name, "started".green(), pid);
			println!("  log     {}", log_path.display());
			println!("  gc log  {}", gc_log_path.display());
		}
		StartOutcome::AlreadyRunning { pid } => {
			println!("{} {}: already running (pid {})", "●".green(), name, pid);
		}
	}
}

fn print_stop(name: &str, report: &StopReport) {
	match report {
		StopReport::NotRunning => println!("{} {}: not running", "○".dimmed(), name),
		StopReport::Stopped { pid, forced: false } => {
			println!("{} {}: stopped gracefully (pid {})", "●".red(), name, pid)
		}
		StopReport::Stopped { pid, forced: true } => println!(
			"{} {}: stopped ({}, pid {})",
			"●".red(),
			name,
			"forced".yellow(),
			pid
		),
	}
}

fn print_status(report: &StatusReport) {
	let Some(pid) = report.pid.filter(|_| report.is_running()) else {
		println!("{} {}: {}", "●".red(), report.name, "not running".red());
		return;
	};

	let ports = if report.ports.is_empty() {
		String::new()
	} else {
		format!(" {}", report.ports.iter().map(|p| format!(":{}", p)).collect::<Vec<_>>().join(","))
	};
	println!("{} {}: {} (pid {}){}", "●".green(), report.name, "running".green(), pid, ports);

	if let Some(info) = &report.process {
		println!("  uptime  {}", format_uptime(info.uptime_secs));
		println!("  cpu     {:.1}%", info.cpu_percent);
		println!(
			"  memory  {} rss, {} virtual",
			format_bytes(info.memory_bytes),
			format_bytes(info.virtual_memory_bytes)
		);
		if !info.command.is_empty() {
			println!("  command {}", info.command.join(" ").dimmed());
		}
	}
	println!("  log     {}", report.log_path.display());
}

fn failure(name: &str, error: &Error) -> ExitCode {
	eprintln!("{} {}: {}", "✗".red(), name, error);
	if let Error::StartupFailed { log_path, log_tail, .. } = error {
		if !log_tail.is_empty() {
			eprintln!("{}", format!("--- last lines of {} ---", log_path.display()).dimmed());
			for line in log_tail {
				eprintln!("{}", line);
			}
		}
	}
	ExitCode::FAILURE
}

fn format_uptime(secs: u64) -> String {
	if secs < 60 {
		format!("{}s", secs)
	} else if secs < 3600 {
		let m = secs / 60;
		let s = secs % 60;
		if s == 0 { format!("{}m", m) } else { format!("{}m{}s", m, s) }
	} else if secs < 86400 {
		let h = secs / 3600;
		let m = (secs % 3600) / 60;
		if m == 0 { format!("{}h", h) } else { format!("{}h{}m", h, m) }
	} else {
		let d = secs / 86400;
		let h = (secs % 86400) / 3600;
		if h == 0 { format!("{}d", d) } else { format!("{}d{}h", d, h) }
	}
}

fn format_bytes(bytes: u64) -> String {
	const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
	let mut value = bytes as f64;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	if unit == 0 {
		format!("{} {}", bytes, UNITS[0])
	} else {
		format!("{:.1} {}", value, UNITS[unit])
	}
}
