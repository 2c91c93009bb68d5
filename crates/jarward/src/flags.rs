use std::path::Path;

use serde::Deserialize;

// ── Flag catalog ─────────────────────────────────────────────────────────────
//
// Each group is an ordered list of JVM options. A group set in the config
// replaces its default list entirely. Values may use `{name}`, `{log_dir}` and
// `{gc_log}`, expanded when the launch command is assembled.

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlagsConfig {
	#[serde(default = "default_base")]
	pub base: Vec<String>,
	#[serde(default = "default_heap")]
	pub heap: Vec<String>,
	#[serde(default = "default_metaspace")]
	pub metaspace: Vec<String>,
	#[serde(default = "default_direct_memory")]
	pub direct_memory: Vec<String>,
	#[serde(default = "default_code_cache")]
	pub code_cache: Vec<String>,
	#[serde(default = "default_gc")]
	pub gc: Vec<String>,
	#[serde(default = "default_gc_log")]
	pub gc_log: Vec<String>,
	#[serde(default = "default_error_dump")]
	pub error_dump: Vec<String>,
	#[serde(default = "default_app")]
	pub app: Vec<String>,
}

impl Default for FlagsConfig {
	fn default() -> Self {
		Self {
			base: default_base(),
			heap: default_heap(),
			metaspace: default_metaspace(),
			direct_memory: default_direct_memory(),
			code_cache: default_code_cache(),
			gc: default_gc(),
			gc_log: default_gc_log(),
			error_dump: default_error_dump(),
			app: default_app(),
		}
	}
}

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

fn default_base() -> Vec<String> {
	strings(&["-server", "-Dfile.encoding=UTF-8", "-Djava.awt.headless=true"])
}
fn default_heap() -> Vec<String> {
	strings(&["-Xms1g", "-Xmx1g"])
}
fn default_metaspace() -> Vec<String> {
	strings(&["-XX:MetaspaceSize=128m", "-XX:MaxMetaspaceSize=256m"])
}
fn default_direct_memory() -> Vec<String> {
	strings(&["-XX:MaxDirectMemorySize=512m"])
}
fn default_code_cache() -> Vec<String> {
	strings(&["-XX:ReservedCodeCacheSize=240m"])
}
fn default_gc() -> Vec<String> {
	strings(&["-XX:+UseG1GC", "-XX:MaxGCPauseMillis=200"])
}
fn default_gc_log() -> Vec<String> {
	strings(&["-Xlog:gc*:file={gc_log}:time,uptime,level,tags:filecount=5,filesize=20m"])
}
fn default_error_dump() -> Vec<String> {
	strings(&[
		"-XX:+HeapDumpOnOutOfMemoryError",
		"-XX:HeapDumpPath={log_dir}",
		"-XX:ErrorFile={log_dir}/hs_err_pid%p.log",
	])
}
fn default_app() -> Vec<String> {
	strings(&["-Dspring.profiles.active=prod", "-Dserver.port=8080"])
}

/// Values substituted into flag templates.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
	pub name: &'a str,
	pub log_dir: &'a Path,
	pub gc_log: &'a Path,
}

impl FlagsConfig {
	/// Groups in launch order.
	pub fn groups(&self) -> [(&'static str, &[String]); 9] {
		[
			("base", self.base.as_slice()),
			("heap", self.heap.as_slice()),
			("metaspace", self.metaspace.as_slice()),
			("direct_memory", self.direct_memory.as_slice()),
			("code_cache", self.code_cache.as_slice()),
			("gc", self.gc.as_slice()),
			("gc_log", self.gc_log.as_slice()),
			("error_dump", self.error_dump.as_slice()),
			("app", self.app.as_slice()),
		]
	}

	/// Every flag, in launch order, with placeholders expanded.
	pub fn assemble(&self, ctx: &FlagContext<'_>) -> Vec<String> {
		self.groups()
			.into_iter()
			.flat_map(|(_, flags)| flags.iter())
			.map(|flag| expand(flag, ctx))
			.collect()
	}
}

fn expand(flag: &str, ctx: &FlagContext<'_>) -> String {
	flag.replace("{name}", ctx.name)
		.replace("{log_dir}", &ctx.log_dir.to_string_lossy())
		.replace("{gc_log}", &ctx.gc_log.to_string_lossy())
}
