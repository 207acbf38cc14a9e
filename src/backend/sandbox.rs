use tokio::process::Command;

/// Hard CPU cap; a runaway loop dies here even if the supervisor's
/// wall-clock timer were to miss it.
#[cfg(unix)]
const CPU_SECONDS: libc::rlim_t = 10;
#[cfg(unix)]
const FILE_SIZE_BYTES: libc::rlim_t = 8 * 1024 * 1024;
#[cfg(unix)]
const RESIDENT_SET_BYTES: libc::rlim_t = 512 * 1024 * 1024;
#[cfg(unix)]
const OPEN_FILES: libc::rlim_t = 256;

/// Resource containment for one sandboxed child, applied between fork and
/// exec. RLIMIT_RSS rather than RLIMIT_AS because V8 reserves large virtual
/// ranges at startup.
#[cfg(unix)]
pub fn apply_rlimits(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            set_rlimits();
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn apply_rlimits(_cmd: &mut Command) {}

/// Best effort: a refused limit must not abort the execution itself.
#[cfg(unix)]
fn set_rlimits() {
    fn rlim(value: libc::rlim_t) -> libc::rlimit {
        libc::rlimit {
            rlim_cur: value,
            rlim_max: value,
        }
    }

    unsafe {
        if libc::setrlimit(libc::RLIMIT_CPU, &rlim(CPU_SECONDS)) != 0 {}
        if libc::setrlimit(libc::RLIMIT_FSIZE, &rlim(FILE_SIZE_BYTES)) != 0 {}
        if libc::setrlimit(libc::RLIMIT_RSS, &rlim(RESIDENT_SET_BYTES)) != 0 {}
        if libc::setrlimit(libc::RLIMIT_NOFILE, &rlim(OPEN_FILES)) != 0 {}
        if libc::setrlimit(libc::RLIMIT_CORE, &rlim(0)) != 0 {}
    }
}
