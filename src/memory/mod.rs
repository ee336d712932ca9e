//! Resident-memory polling used to decide when to clear the resume cache.

use sysinfo::{Pid, System};

/// Reports the current process's resident memory in megabytes.
pub trait MemoryMonitor: Send + Sync {
    /// Current resident set size, in megabytes.
    fn resident_mb(&self) -> u64;
}

/// A `MemoryMonitor` backed by `sysinfo`, scoped to the current process.
pub struct SysinfoMemoryMonitor {
    system: std::sync::Mutex<System>,
    pid: Pid,
}

impl SysinfoMemoryMonitor {
    /// Build a monitor for the current process.
    pub fn new() -> Self {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_process(pid);
        Self {
            system: std::sync::Mutex::new(system),
            pid,
        }
    }
}

impl Default for SysinfoMemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMonitor for SysinfoMemoryMonitor {
    fn resident_mb(&self) -> u64 {
        let mut system = self.system.lock().expect("sysinfo mutex poisoned");
        system.refresh_process(self.pid);
        system.process(self.pid).map_or(0, |p| p.memory() / 1024 / 1024)
    }
}

/// A scripted test double returning a fixed sequence of readings, then
/// repeating the last one once exhausted.
pub struct ScriptedMemoryMonitor {
    readings: Vec<u64>,
    index: std::sync::atomic::AtomicUsize,
}

impl ScriptedMemoryMonitor {
    /// Build a monitor that yields each of `readings` in order.
    pub fn new(readings: Vec<u64>) -> Self {
        assert!(!readings.is_empty(), "ScriptedMemoryMonitor needs at least one reading");
        Self {
            readings,
            index: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl MemoryMonitor for ScriptedMemoryMonitor {
    fn resident_mb(&self) -> u64 {
        use std::sync::atomic::Ordering;
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.readings[i.min(self.readings.len() - 1)]
    }
}
