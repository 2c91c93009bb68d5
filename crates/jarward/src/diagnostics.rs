use std::collections::{HashMap, HashSet};

use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::types::ProcessInfo;

/// Command line, memory, CPU and uptime of `pid`. Best effort.
pub async fn process_info(pid: u32) -> Option<ProcessInfo> {
	let target = Pid::from_u32(pid);
	let kind = ProcessRefreshKind::new()
		.with_cpu()
		.with_memory()
		.with_cmd(UpdateKind::OnlyIfNotSet);

	let mut system = System::new();
	system.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);
	// CPU usage is a delta between two refreshes.
	tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
	system.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);

	let process = system.process(target)?;
	Some(ProcessInfo {
		command: process
			.cmd()
			.iter()
			.map(|arg| arg.to_string_lossy().into_owned())
			.collect(),
		memory_bytes: process.memory(),
		virtual_memory_bytes: process.virtual_memory(),
		cpu_percent: process.cpu_usage(),
		uptime_secs: process.run_time(),
	})
}

/// Listening TCP ports owned by `pid` or any of its descendants, sorted.
pub fn listening_ports(pid: u32) -> Vec<u16> {
	let af = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
	let sockets = match get_sockets_info(af, ProtocolFlags::TCP) {
		Ok(s) => s,
		Err(e) => {
			tracing::warn!("cannot list sockets: {}", e);
			return Vec::new();
		}
	};

	let family = process_tree(pid);
	let mut ports: Vec<u16> = sockets
		.iter()
		.filter_map(|si| match &si.protocol_socket_info {
			ProtocolSocketInfo::Tcp(tcp) if tcp.state == TcpState::Listen => Some((tcp.local_port, &si.associated_pids)),
			_ => None,
		})
		.filter(|(_, pids)| pids.iter().any(|p| family.contains(p)))
		.map(|(port, _)| port)
		.collect();
	ports.sort_unstable();
	ports.dedup();
	ports
}

/// `root` and every live descendant of it.
fn process_tree(root: u32) -> HashSet<u32> {
	let mut system = System::new();
	system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());

	let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
	for (pid, process) in system.processes() {
		if let Some(parent) = process.parent() {
			children.entry(parent.as_u32()).or_default().push(pid.as_u32());
		}
	}

	let mut tree = HashSet::from([root]);
	let mut pending = vec![root];
	while let Some(pid) = pending.pop() {
		for &child in children.get(&pid).into_iter().flatten() {
			if tree.insert(child) {
				pending.push(child);
			}
		}
	}
	tree
}
