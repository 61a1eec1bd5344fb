//! System Call Handler
//!
//! Decodes a trap, dispatches it, and writes the result back.
//!
//! # Security Considerations
//! - The call number's own address is validated before it is read
//! - Every argument slot is validated before it is read
//! - Pointer arguments are validated and translated before use
//! - Any violation kills the caller; no handler continues past one
//! - Unknown call numbers are ignored and leave the return register alone
//!
//! # Return values
//! | call      | failure value          |
//! |-----------|------------------------|
//! | exec      | -1 (load failure)      |
//! | wait      | -1 (not a live child)  |
//! | create    | 0 (false)              |
//! | remove    | 0 (false)              |
//! | open      | -1                     |
//! | filesize  | -1 (bad descriptor)    |
//! | read      | -1 (bad descriptor)    |
//! | write     | 0 (bad descriptor)     |
//! | tell      | -1 (bad descriptor)    |
//!
//! halt, exit, seek and close return nothing.

use alloc::string::String;
use alloc::sync::Arc;

use crate::fs::{Fd, FileSystem};
use crate::kernel::Kernel;
use crate::mm::VirtAddr;
use crate::process::{LoadOutcome, Pid, Process, ProcessLink, KILLED_STATUS};

use super::frame::{TrapExit, TrapFrame};
use super::request::Request;
use super::validate::{copy_in_string, validate_user_read, validate_user_write, Violation};

impl<F: FileSystem> Kernel<F> {
    /// Handle a system call trap from `process`.
    ///
    /// On [`TrapExit::Resume`] the frame's return register holds the
    /// result (or is untouched for calls without one).
    pub fn handle_trap(&self, process: &mut Process<F::File>, frame: &mut TrapFrame) -> TrapExit {
        if let Some(status) = process.exit_status {
            return TrapExit::Terminated(status);
        }
        match self.dispatch(process, frame) {
            Ok(exit) => exit,
            Err(violation) => {
                log::warn!("{} [{}]: {}, killing", process.name, process.pid, violation);
                self.exit_process(process, KILLED_STATUS)
            }
        }
    }

    fn dispatch(&self, process: &mut Process<F::File>, frame: &mut TrapFrame) -> Result<TrapExit, Violation> {
        let request = Request::decode(&*process.space, VirtAddr::from_word(frame.esp))?;
        log::debug!("{} [{}]: {:?}", process.name, process.pid, request);

        let result = match request {
            Request::Halt => return Ok(self.sys_halt()),
            Request::Exit { status } => return Ok(self.exit_process(process, status)),
            Request::Exec { cmdline } => Some(self.sys_exec(process, cmdline)?),
            Request::Wait { pid } => Some(self.sys_wait(process, Pid(pid))),
            Request::Create { path, initial_size } => Some(self.sys_create(process, path, initial_size)? as i32),
            Request::Remove { path } => Some(self.sys_remove(process, path)? as i32),
            Request::Open { path } => Some(self.sys_open(process, path)?),
            Request::Filesize { fd } => Some(self.sys_filesize(process, fd)),
            Request::Read { fd, buf, len } => Some(self.sys_read(process, fd, buf, len)?),
            Request::Write { fd, buf, len } => Some(self.sys_write(process, fd, buf, len)?),
            Request::Seek { fd, position } => {
                self.sys_seek(process, fd, position);
                None
            }
            Request::Tell { fd } => Some(self.sys_tell(process, fd)),
            Request::Close { fd } => {
                self.sys_close(process, fd);
                None
            }
            Request::Unrecognized(number) => {
                log::debug!("{} [{}]: unknown syscall {}", process.name, process.pid, number);
                None
            }
        };

        if let Some(value) = result {
            frame.set_return(value);
        }
        Ok(TrapExit::Resume)
    }

    /// Copy a path or command line in. `None` if it is not valid UTF-8.
    fn copy_in_name(process: &Process<F::File>, addr: VirtAddr) -> Result<Option<String>, Violation> {
        let bytes = copy_in_string(&*process.space, addr)?;
        Ok(String::from_utf8(bytes).ok())
    }

    fn sys_halt(&self) -> TrapExit {
        log::info!("halt requested, powering off");
        self.host.power_off();
        TrapExit::Halted
    }

    /// Start a child and block until it has loaded (or failed to).
    fn sys_exec(&self, process: &mut Process<F::File>, cmdline: VirtAddr) -> Result<i32, Violation> {
        let Some(cmdline) = Self::copy_in_name(process, cmdline)? else {
            return Ok(-1);
        };

        let (link, child) = ProcessLink::pair(Arc::clone(&self.scheduler));
        let Some(pid) = self.host.spawn(&cmdline, child) else {
            return Ok(-1);
        };

        match link.wait_load(&*self.scheduler) {
            LoadOutcome::Loaded => {
                process.children.insert(pid, link);
                Ok(pid.0)
            }
            LoadOutcome::Failed => Ok(-1),
        }
    }

    /// Reap a child. A given child can be waited for once.
    fn sys_wait(&self, process: &mut Process<F::File>, pid: Pid) -> i32 {
        match process.children.take(pid) {
            Some(link) => link.wait_exit(&*self.scheduler),
            None => -1,
        }
    }

    fn sys_create(&self, process: &Process<F::File>, path: VirtAddr, initial_size: u32) -> Result<bool, Violation> {
        let Some(path) = Self::copy_in_name(process, path)? else {
            return Ok(false);
        };
        Ok(self.fs.lock().create(&path, initial_size))
    }

    fn sys_remove(&self, process: &Process<F::File>, path: VirtAddr) -> Result<bool, Violation> {
        let Some(path) = Self::copy_in_name(process, path)? else {
            return Ok(false);
        };
        Ok(self.fs.lock().remove(&path))
    }

    fn sys_open(&self, process: &mut Process<F::File>, path: VirtAddr) -> Result<i32, Violation> {
        let Some(path) = Self::copy_in_name(process, path)? else {
            return Ok(-1);
        };

        let mut fs = self.fs.lock();
        let Some(file) = fs.open(&path) else {
            return Ok(-1);
        };
        match process.files.allocate(file) {
            Ok(fd) => Ok(fd.as_i32()),
            Err(file) => {
                log::warn!("{} [{}]: out of descriptors", process.name, process.pid);
                fs.close(file);
                Ok(-1)
            }
        }
    }

    fn sys_filesize(&self, process: &Process<F::File>, fd: Fd) -> i32 {
        let mut fs = self.fs.lock();
        match process.files.lookup(fd) {
            Some(file) => fs.length(file) as i32,
            None => -1,
        }
    }

    fn sys_read(&self, process: &mut Process<F::File>, fd: Fd, buf: VirtAddr, len: u32) -> Result<i32, Violation> {
        let mut dst = validate_user_write(&*process.space, buf, len as usize)?;

        if fd == Fd::STDIN {
            let n = dst.fill(|chunk| {
                for byte in chunk.iter_mut() {
                    *byte = self.console.getc();
                }
                chunk.len()
            });
            return Ok(n as i32);
        }

        let mut fs = self.fs.lock();
        let Some(file) = process.files.lookup_mut(fd) else {
            return Ok(-1);
        };
        Ok(dst.fill(|chunk| fs.read(&mut *file, chunk)) as i32)
    }

    fn sys_write(&self, process: &mut Process<F::File>, fd: Fd, buf: VirtAddr, len: u32) -> Result<i32, Violation> {
        let src = validate_user_read(&*process.space, buf, len as usize)?;

        if fd == Fd::STDOUT {
            self.console.putbuf(&src.to_vec());
            return Ok(len as i32);
        }

        let mut fs = self.fs.lock();
        let Some(file) = process.files.lookup_mut(fd) else {
            return Ok(0);
        };
        Ok(src.drain(|chunk| fs.write(&mut *file, chunk)) as i32)
    }

    fn sys_seek(&self, process: &mut Process<F::File>, fd: Fd, position: u32) {
        let mut fs = self.fs.lock();
        if let Some(file) = process.files.lookup_mut(fd) {
            fs.seek(file, position);
        }
    }

    fn sys_tell(&self, process: &Process<F::File>, fd: Fd) -> i32 {
        let mut fs = self.fs.lock();
        match process.files.lookup(fd) {
            Some(file) => fs.tell(file) as i32,
            None => -1,
        }
    }

    fn sys_close(&self, process: &mut Process<F::File>, fd: Fd) {
        let mut fs = self.fs.lock();
        process.files.close(fd, &mut *fs);
    }
}
