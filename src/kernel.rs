//! Kernel Context
//!
//! Ties the collaborators together and owns the process lifecycle paths
//! that surround syscalls: starting a child, tearing a process down, and
//! killing it on a fault.
//!
//! # Termination
//! Every way out of a process (the `exit` call, a trust violation, a user
//! fault) funnels through [`Kernel::exit_process`], which runs once per
//! process and:
//! 1. prints `"<name>: exit(<status>)"` on the console
//! 2. closes every descriptor and the executable under the Filesystem Lock
//! 3. drops the links to its own children
//! 4. publishes the exit status to its parent

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;

use crate::console::Console;
use crate::fs::{FileSystem, FsLock};
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::{process_name, ChildLink, LoadOutcome, Pid, Process, KILLED_STATUS};
use crate::sync::Scheduler;
use crate::syscall::TrapExit;

/// Process creation and machine control collaborator.
pub trait ProcessHost: Send + Sync {
    /// Start a new kernel thread that will run `cmdline` as a user process.
    ///
    /// The new thread must eventually either hand `link` to
    /// [`Kernel::start_process`] or drop it. Returns `None` if no thread
    /// could be created (in which case `link` has been dropped).
    ///
    /// Once `start_process` returns a process, the thread must not let go
    /// of it until a trap or fault has ended in [`TrapExit::Terminated`]
    /// (or it has called [`Kernel::exit_process`] itself). Teardown is the
    /// only place open files are returned to the filesystem.
    fn spawn(&self, cmdline: &str, link: ChildLink) -> Option<Pid>;

    /// Power the machine off.
    fn power_off(&self);
}

/// What a successful load leaves behind.
pub struct LoadedImage<H> {
    /// The running executable, held open until the process exits.
    pub executable: H,
    /// The freshly built user address space.
    pub space: Box<dyn AddressSpace>,
}

/// Executable loader collaborator.
///
/// Runs on the child's thread with the Filesystem Lock held.
pub trait Loader<F: FileSystem> {
    fn load(&self, fs: &mut F, program: &str, cmdline: &str) -> Option<LoadedImage<F::File>>;
}

/// The syscall layer's view of the running kernel.
pub struct Kernel<F: FileSystem> {
    pub(crate) fs: FsLock<F>,
    pub(crate) console: Arc<dyn Console>,
    pub(crate) host: Arc<dyn ProcessHost>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<F: FileSystem> Kernel<F> {
    pub fn new(
        fs: F,
        console: Arc<dyn Console>,
        host: Arc<dyn ProcessHost>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            fs: FsLock::new(fs),
            console,
            host,
            scheduler,
        }
    }

    /// The global Filesystem Lock.
    pub fn fs(&self) -> &FsLock<F> {
        &self.fs
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Child side of `exec`: load the program and report the outcome.
    ///
    /// Called on the new thread with the link its parent created. Returns
    /// the process ready to enter user mode, or `None` if loading failed
    /// (the parent has been told either way).
    pub fn start_process<L>(&self, pid: Pid, cmdline: &str, link: ChildLink, loader: &L) -> Option<Process<F::File>>
    where
        L: Loader<F> + ?Sized,
    {
        let program = process_name(cmdline);
        let image = self.fs.with(|fs| loader.load(fs, program, cmdline));

        let Some(image) = image else {
            log::debug!("{} [{}]: load failed", program, pid);
            link.report_load(LoadOutcome::Failed);
            return None;
        };

        let mut process = Process::new(pid, cmdline, image.space, None);
        process.files.set_executable(image.executable);
        link.report_load(LoadOutcome::Loaded);
        process.parent = Some(link);
        log::debug!("{} [{}]: loaded", process.name, pid);
        Some(process)
    }

    /// Tear `process` down with `status`.
    ///
    /// Idempotent: only the first call has any effect, and every call
    /// returns the status recorded by the first.
    pub fn exit_process(&self, process: &mut Process<F::File>, status: i32) -> TrapExit {
        if let Some(recorded) = process.exit_status {
            return TrapExit::Terminated(recorded);
        }
        process.exit_status = Some(status);

        let message = format!("{}: exit({})\n", process.name, status);
        self.console.putbuf(message.as_bytes());

        self.fs.with(|fs| process.files.close_all(fs));
        process.children.clear();
        if let Some(parent) = process.parent.take() {
            parent.report_exit(status);
        }

        log::debug!("{} [{}]: exited with {}", process.name, process.pid, status);
        TrapExit::Terminated(status)
    }

    /// A user-mode fault at `addr` the memory subsystem could not resolve.
    pub fn handle_fault(&self, process: &mut Process<F::File>, addr: VirtAddr) -> TrapExit {
        log::warn!("{} [{}]: page fault at {}, killing", process.name, process.pid, addr);
        self.exit_process(process, KILLED_STATUS)
    }
}
