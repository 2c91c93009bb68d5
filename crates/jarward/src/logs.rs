use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

pub fn ensure_log_dir(dir: &Path) -> Result<()> {
	fs::create_dir_all(dir).map_err(|source| Error::LogDir {
		path: dir.to_path_buf(),
		source,
	})
}

/// The log sink: created if absent, always appended to.
pub fn open_sink(path: &Path) -> io::Result<File> {
	OpenOptions::new().create(true).append(true).open(path)
}

/// Rotate `path` aside when it has grown past `max_size`, then drop the
/// oldest rotated siblings beyond `max_files`. Returns the rotated path.
pub fn rotate_if_oversized(path: &Path, max_size: u64, max_files: u32) -> Option<PathBuf> {
	let len = fs::metadata(path).map(|m| m.len()).ok()?;
	if max_size == 0 || len < max_size {
		return None;
	}

	let dir = path.parent()?;
	let stem = path.file_stem()?.to_string_lossy().into_owned();
	let ext = path
		.extension()
		.map(|e| e.to_string_lossy().into_owned())
		.unwrap_or_default();

	let rotated = dir.join(rotated_name(dir, &stem, &ext, now_secs()));
	if let Err(e) = fs::rename(path, &rotated) {
		tracing::warn!("failed to rotate {}: {}", path.display(), e);
		return None;
	}
	tracing::info!("rotated {} ({} bytes) to {}", path.display(), len, rotated.display());

	expire_rotated(dir, &stem, &ext, max_files);
	Some(rotated)
}

/// `application 26-0214 09.out`, then `application 26-0214 09.47.out` when the
/// hourly name is taken, then `application 26-0214 09.47-2.out` and upwards.
pub fn rotated_name(dir: &Path, stem: &str, ext: &str, secs: u64) -> String {
	let (year, month, day, hour, minute) = secs_to_datetime(secs);
	let date = format!("{:02}-{:02}{:02}", year % 100, month, day);
	let hourly = format!("{} {} {:02}.{}", stem, date, hour, ext);
	if !dir.join(&hourly).exists() {
		return hourly;
	}

	let minutely = format!("{} {} {:02}.{:02}", stem, date, hour, minute);
	let mut candidate = format!("{}.{}", minutely, ext);
	let mut n = 2;
	while dir.join(&candidate).exists() {
		candidate = format!("{}-{}.{}", minutely, n, ext);
		n += 1;
	}
	candidate
}

fn expire_rotated(dir: &Path, stem: &str, ext: &str, max_files: u32) {
	if max_files == 0 {
		return;
	}
	let Ok(entries) = fs::read_dir(dir) else {
		return;
	};

	let prefix = format!("{} ", stem);
	let suffix = format!(".{}", ext);
	let mut rotated: Vec<(PathBuf, Option<SystemTime>)> = entries
		.flatten()
		.map(|e| e.path())
		.filter(|p| {
			p.file_name()
				.map(|n| n.to_string_lossy())
				.is_some_and(|n| n.starts_with(&prefix) && n.ends_with(&suffix))
		})
		.map(|p| {
			let modified = p.metadata().and_then(|m| m.modified()).ok();
			(p, modified)
		})
		.collect();

	if rotated.len() <= max_files as usize {
		return;
	}
	rotated.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
	let excess = rotated.len() - max_files as usize;
	for (path, _) in rotated.into_iter().take(excess) {
		let _ = fs::remove_file(path);
	}
}

/// Last `lines` lines of the file; empty when it cannot be read.
pub fn tail(path: &Path, lines: usize) -> Vec<String> {
	let Ok(file) = File::open(path) else {
		return Vec::new();
	};
	let mut ring = VecDeque::with_capacity(lines.min(1024));
	// Runtime output is not guaranteed to be UTF-8.
	for raw in BufReader::new(file).split(b'\n') {
		let Ok(raw) = raw else { break };
		if lines == 0 {
			continue;
		}
		if ring.len() == lines {
			ring.pop_front();
		}
		let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
		ring.push_back(String::from_utf8_lossy(raw).into_owned());
	}
	ring.into()
}

pub fn secs_to_datetime(secs: u64) -> (u32, u32, u32, u32, u32) {
	let days = (secs / 86400) as i64;
	let time_of_day = secs % 86400;
	let hour = (time_of_day / 3600) as u32;
	let minute = ((time_of_day % 3600) / 60) as u32;

	// Civil-from-days over 400-year eras.
	let z = days + 719468;
	let era = z.div_euclid(146097);
	let doe = (z - era * 146097) as u32;
	let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let day = doy - (153 * mp + 2) / 5 + 1;
	let month = if mp < 10 { mp + 3 } else { mp - 9 };
	let year = yoe as i64 + era * 400 + i64::from(month <= 2);

	(year as u32, month, day, hour, minute)
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
