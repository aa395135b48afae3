//! Scraper child processes: scoped ownership plus a process-wide registry
//! swept at exit, so a driver left behind by a hard failure is still killed.
//!
//! On unix every scraper leads its own process group, and kills go to the
//! whole group so a browser driver the scraper started goes down with it.
//! A group stays registered until it is confirmed gone.

use std::collections::BTreeSet;
use std::io;
use std::process::{Child, Command, ExitStatus};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a drop waits for a killed group to disappear before leaving it
/// to the exit sweep.
const GROUP_GRACE: Duration = Duration::from_millis(500);

fn registry() -> MutexGuard<'static, BTreeSet<u32>> {
    static LIVE: OnceLock<Mutex<BTreeSet<u32>>> = OnceLock::new();
    // A poisoned lock only means another scrape thread panicked; the set is still usable.
    LIVE.get_or_init(|| Mutex::new(BTreeSet::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process groups (unix) or PIDs (elsewhere) not yet confirmed gone.
pub fn live_pids() -> Vec<u32> {
    registry().iter().copied().collect()
}

/// Kill every still-registered group. Returns how many were signalled.
pub fn sweep() -> usize {
    let ids: Vec<u32> = std::mem::take(&mut *registry()).into_iter().collect();
    ids.into_iter().filter(|&id| kill_registered(id)).count()
}

fn kill_registered(id: u32) -> bool {
    registry().remove(&id);
    let killed = kill_group(id);
    if killed {
        log::warn!("killed orphaned scraper process group {id}");
    }
    killed
}

/// A spawned child that is always reaped: on drop its group is killed,
/// the child waited on, and the registry entry cleared once nothing in the
/// group is left.
pub struct TrackedChild {
    child: Child,
    pid: u32,
    reaped: bool,
}

impl TrackedChild {
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let child = command.spawn()?;
        let pid = child.id();
        registry().insert(pid);
        log::debug!("spawned scraper process {pid}");
        Ok(Self { child, pid, reaped: false })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Wait up to `timeout`. `Ok(None)` means the child was still running
    /// and its group has now been killed.
    pub fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                self.terminate();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn terminate(&mut self) {
        // Leftovers in the group die even when the scraper itself exited.
        if cfg!(unix) && group_alive(self.pid) && !kill_group(self.pid) {
            log::debug!("kill group {}: {}", self.pid, io::Error::last_os_error());
        }
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::debug!("kill {}: {e}", self.pid);
        }
        if let Err(e) = self.child.wait() {
            log::warn!("could not reap scraper process {}: {e}", self.pid);
        }
        self.reaped = true;
    }
}

impl Drop for TrackedChild {
    fn drop(&mut self) {
        self.terminate();
        let deadline = Instant::now() + GROUP_GRACE;
        while group_alive(self.pid) && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if group_alive(self.pid) {
            log::debug!("scraper process group {} still present; left for exit sweep", self.pid);
        } else {
            registry().remove(&self.pid);
        }
    }
}

/// Whether any process of the group still exists.
fn group_alive(id: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::killpg(id as libc::pid_t, 0) == 0 }
    }

    // No group tracking here; the reaped child is all there was.
    #[cfg(not(unix))]
    {
        let _ = id;
        false
    }
}

fn kill_group(id: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::killpg(id as libc::pid_t, libc::SIGKILL) == 0 }
    }

    #[cfg(windows)]
    {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, id);
            if handle.is_null() {
                return false;
            }
            let ok = TerminateProcess(handle, 1) != 0;
            CloseHandle(handle);
            ok
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = id;
        false
    }
}

/// Running, as opposed to gone or a zombie waiting for its new parent.
#[cfg(all(test, unix))]
fn running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| rest.trim_start().chars().next() != Some('Z'))
            .unwrap_or(false),
        Err(_) => unsafe { libc::kill(pid as libc::pid_t, 0) == 0 },
    }
}

/// Poll for up to five seconds until `pid` is no longer running.
#[cfg(all(test, unix))]
pub(crate) fn wait_until_gone(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while running(pid) {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finished_child_is_reaped_and_untracked() {
        let mut child = TrackedChild::spawn(Command::new("true").stdout(std::process::Stdio::null())).unwrap();
        let pid = child.pid();
        let status = child.wait_timeout(Duration::from_secs(10)).unwrap();
        assert!(status.unwrap().success());
        drop(child);
        assert!(!live_pids().contains(&pid));
    }

    #[test]
    fn slow_child_is_killed_on_timeout() {
        let mut child = TrackedChild::spawn(&mut Command::new("sleep").arg("30")).unwrap();
        let pid = child.pid();
        assert!(live_pids().contains(&pid));
        let started = Instant::now();
        assert!(child.wait_timeout(Duration::from_millis(200)).unwrap().is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(child);
        assert!(!live_pids().contains(&pid));
    }

    #[test]
    fn dropping_unwaited_child_kills_it() {
        let child = TrackedChild::spawn(&mut Command::new("sleep").arg("30")).unwrap();
        let pid = child.pid();
        drop(child);
        assert!(!live_pids().contains(&pid));
        assert!(wait_until_gone(pid));
    }

    #[test]
    fn backgrounded_grandchild_dies_with_its_scraper() {
        let dir = tempdir().unwrap();
        let pidfile = dir.path().join("driver.pid");
        let script = format!("sleep 60 & echo $! > {}; wait", pidfile.display());
        let mut child = TrackedChild::spawn(Command::new("sh").arg("-c").arg(&script)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let driver = loop {
            if let Some(pid) = fs::read_to_string(&pidfile).ok().and_then(|s| s.trim().parse::<u32>().ok()) {
                break pid;
            }
            assert!(Instant::now() < deadline, "driver never started");
            thread::sleep(POLL_INTERVAL);
        };

        assert!(child.wait_timeout(Duration::from_millis(300)).unwrap().is_none());
        drop(child);
        assert!(wait_until_gone(driver), "driver {driver} outlived its scraper");
    }

    #[test]
    fn leaked_group_is_swept() {
        let child = TrackedChild::spawn(&mut Command::new("sleep").arg("30")).unwrap();
        let pid = child.pid();
        // Skips Drop, as a hard failure would.
        std::mem::forget(child);
        assert!(live_pids().contains(&pid));
        assert!(kill_registered(pid));
        assert!(!live_pids().contains(&pid));
        assert!(wait_until_gone(pid));
    }
}
