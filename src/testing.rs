//! Simulated collaborators for host tests.

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Weak};
use std::thread::{self, JoinHandle, Thread};

use spin::{Mutex, Once};

use crate::console::Console;
use crate::fs::FileSystem;
use crate::kernel::{Kernel, LoadedImage, Loader, ProcessHost};
use crate::mm::{AddressSpace, Mapping, PageFlags, VirtAddr, PAGE_SIZE, PHYS_BASE, USER_BASE, WORD_SIZE};
use crate::process::{process_name, ChildLink, Pid, Process};
use crate::sync::{Scheduler, ThreadId};
use crate::syscall::{Syscall, TrapFrame};

// ── Scheduler ────────────────────────────────────────────────────────────────

static NEXT_THREAD: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
}

/// Blocks with `thread::park`, whose token gives the pending-wakeup
/// behavior the scheduler contract asks for.
pub struct StdScheduler {
    threads: Mutex<BTreeMap<u64, Thread>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Scheduler for StdScheduler {
    fn current(&self) -> ThreadId {
        let id = THREAD_ID.with(|id| *id);
        self.threads.lock().entry(id).or_insert_with(thread::current);
        ThreadId(id)
    }

    fn block(&self) {
        thread::park();
    }

    fn unblock(&self, thread: ThreadId) {
        if let Some(t) = self.threads.lock().get(&thread.0) {
            t.unpark();
        }
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// Handle and concurrency accounting shared with the test.
#[derive(Default)]
pub struct FsStats {
    open: AtomicUsize,
    closes: AtomicUsize,
    inside: AtomicUsize,
    max_inside: AtomicUsize,
}

impl FsStats {
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Most calls ever observed inside the filesystem at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_inside.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Inside<'_> {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now, Ordering::SeqCst);
        thread::yield_now();
        Inside(self)
    }
}

struct Inside<'a>(&'a FsStats);

impl Drop for Inside<'_> {
    fn drop(&mut self) {
        self.0.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct RamFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
}

/// In-memory filesystem. Files grow on write past the end.
pub struct RamFs {
    files: BTreeMap<String, Arc<Mutex<Vec<u8>>>>,
    stats: Arc<FsStats>,
}

impl RamFs {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            stats: Arc::new(FsStats::default()),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let mut fs = Self::new();
        for (name, contents) in files {
            fs.files
                .insert(name.to_string(), Arc::new(Mutex::new(contents.as_bytes().to_vec())));
        }
        fs
    }

    pub fn stats(&self) -> Arc<FsStats> {
        Arc::clone(&self.stats)
    }

    pub fn open_handles(&self) -> usize {
        self.stats.open_handles()
    }

    pub fn closes(&self) -> usize {
        self.stats.closes()
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).map(|d| d.lock().clone())
    }
}

impl FileSystem for RamFs {
    type File = RamFile;

    fn create(&mut self, path: &str, initial_size: u32) -> bool {
        let _in = self.stats.enter();
        if path.is_empty() || self.files.contains_key(path) {
            return false;
        }
        let data = std::vec![0u8; initial_size as usize];
        self.files.insert(path.to_string(), Arc::new(Mutex::new(data)));
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        let _in = self.stats.enter();
        self.files.remove(path).is_some()
    }

    fn open(&mut self, path: &str) -> Option<RamFile> {
        let _in = self.stats.enter();
        let data = Arc::clone(self.files.get(path)?);
        self.stats.open.fetch_add(1, Ordering::SeqCst);
        Some(RamFile { data, pos: 0 })
    }

    fn read(&mut self, file: &mut RamFile, buf: &mut [u8]) -> usize {
        let _in = self.stats.enter();
        let data = file.data.lock();
        let start = file.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n;
        n
    }

    fn write(&mut self, file: &mut RamFile, buf: &[u8]) -> usize {
        let _in = self.stats.enter();
        let mut data = file.data.lock();
        let end = file.pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[file.pos..end].copy_from_slice(buf);
        file.pos = end;
        buf.len()
    }

    fn seek(&mut self, file: &mut RamFile, position: u32) {
        let _in = self.stats.enter();
        file.pos = position as usize;
    }

    fn tell(&mut self, file: &RamFile) -> u32 {
        let _in = self.stats.enter();
        file.pos as u32
    }

    fn length(&mut self, file: &RamFile) -> u32 {
        let _in = self.stats.enter();
        file.data.lock().len() as u32
    }

    fn close(&mut self, file: RamFile) {
        let _in = self.stats.enter();
        drop(file);
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Address space ────────────────────────────────────────────────────────────

struct Page {
    frame: NonNull<u8>,
    flags: PageFlags,
}

// SAFETY: a page frame is plain heap memory owned by the map
unsafe impl Send for Page {}

impl Drop for Page {
    fn drop(&mut self) {
        // SAFETY: frame came from Box::into_raw of a [u8; PAGE_SIZE]
        unsafe { drop(Box::from_raw(self.frame.as_ptr().cast::<[u8; PAGE_SIZE]>())) };
    }
}

/// Paged memory backed by heap frames. Clones share the same pages.
#[derive(Clone)]
pub struct SimSpace {
    pages: Arc<Mutex<BTreeMap<usize, Page>>>,
}

impl SimSpace {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Map the page containing `addr` (zero-filled), or change its flags.
    pub fn map(&self, addr: usize, flags: PageFlags) {
        let number = addr / PAGE_SIZE;
        let mut pages = self.pages.lock();
        if let Some(page) = pages.get_mut(&number) {
            page.flags = flags;
            return;
        }
        let frame = Box::into_raw(Box::new([0u8; PAGE_SIZE])).cast::<u8>();
        pages.insert(
            number,
            Page {
                frame: NonNull::new(frame).unwrap(),
                flags,
            },
        );
    }

    /// Store bytes regardless of page permissions. Panics if unmapped.
    pub fn write(&self, addr: usize, bytes: &[u8]) {
        poke(self, addr, bytes);
    }

    pub fn read(&self, addr: usize, len: usize) -> Vec<u8> {
        peek(self, addr, len)
    }
}

impl AddressSpace for SimSpace {
    fn lookup(&self, addr: VirtAddr) -> Option<Mapping> {
        let pages = self.pages.lock();
        let page = pages.get(&addr.page_number())?;
        // SAFETY: offset is below PAGE_SIZE, inside the frame
        let kernel = unsafe { NonNull::new_unchecked(page.frame.as_ptr().add(addr.page_offset())) };
        Some(Mapping {
            kernel,
            flags: page.flags,
        })
    }
}

/// Write into any mapped user memory, ignoring permissions.
pub fn poke(space: &dyn AddressSpace, addr: usize, bytes: &[u8]) {
    for (i, byte) in bytes.iter().enumerate() {
        let m = space.lookup(VirtAddr::new(addr + i)).expect("poke: unmapped");
        // SAFETY: mapping points at one byte of a live frame
        unsafe { m.kernel.as_ptr().write(*byte) };
    }
}

/// Read any mapped user memory.
pub fn peek(space: &dyn AddressSpace, addr: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            let m = space.lookup(VirtAddr::new(addr + i)).expect("peek: unmapped");
            // SAFETY: as in poke
            unsafe { m.kernel.as_ptr().read() }
        })
        .collect()
}

/// Read-write data pages start here.
pub const DATA: usize = USER_BASE;
/// Read-only page (code).
pub const RODATA: usize = USER_BASE + 2 * PAGE_SIZE;
/// First unmapped page above the data.
pub const GUARD: usize = USER_BASE + 3 * PAGE_SIZE;
/// The single stack page.
pub const STACK: usize = PHYS_BASE - PAGE_SIZE;
/// Where test frames put the call number.
pub const ESP: usize = PHYS_BASE - 64;

/// A fresh user address space: two data pages, one read-only page, one
/// stack page.
pub fn user_space() -> SimSpace {
    let space = SimSpace::new();
    space.map(DATA, PageFlags::USER_DATA);
    space.map(DATA + PAGE_SIZE, PageFlags::USER_DATA);
    space.map(RODATA, PageFlags::USER_RODATA);
    space.map(STACK, PageFlags::USER_DATA);
    space
}

/// Lay out a call at [`ESP`] and return the trap frame for it.
pub fn push_call(space: &dyn AddressSpace, number: u32, args: &[u32]) -> TrapFrame {
    poke(space, ESP, &number.to_le_bytes());
    for (i, arg) in args.iter().enumerate() {
        poke(space, ESP + (i + 1) * WORD_SIZE, &arg.to_le_bytes());
    }
    TrapFrame::new(ESP as u32)
}

/// A user address space plus a bump allocator over its data pages.
pub struct UserStack {
    space: SimSpace,
    cursor: Cell<usize>,
}

impl UserStack {
    pub fn new() -> Self {
        Self {
            space: user_space(),
            cursor: Cell::new(DATA),
        }
    }

    pub fn space(&self) -> &SimSpace {
        &self.space
    }

    /// A second handle on the same memory, for handing to a process.
    pub fn boxed(&self) -> Box<dyn AddressSpace> {
        Box::new(self.space.clone())
    }

    /// Write a call and its arguments at [`ESP`].
    pub fn push_call(&self, number: u32, args: &[u32]) -> VirtAddr {
        push_call(&self.space, number, args);
        VirtAddr::new(ESP)
    }

    pub fn frame(&self, call: Syscall, args: &[u32]) -> TrapFrame {
        push_call(&self.space, call.number(), args)
    }

    /// Copy bytes into the data pages; returns their user address.
    pub fn put_bytes(&self, bytes: &[u8]) -> u32 {
        let at = self.cursor.get();
        self.space.write(at, bytes);
        self.cursor.set(at + bytes.len());
        at as u32
    }

    /// Copy a NUL-terminated string into the data pages.
    pub fn put_str(&self, s: &str) -> u32 {
        let at = self.put_bytes(s.as_bytes());
        self.put_bytes(&[0]);
        at
    }

    /// Reserve a zeroed region in the data pages.
    pub fn buffer(&self, len: usize) -> u32 {
        self.put_bytes(&std::vec![0u8; len])
    }

    pub fn read(&self, addr: u32, len: usize) -> Vec<u8> {
        self.space.read(addr as usize, len)
    }
}

// ── Console ──────────────────────────────────────────────────────────────────

pub struct BufferConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
}

impl BufferConsole {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Mutex::new(input.iter().copied().collect()),
            output: Mutex::new(Vec::new()),
        }
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }
}

impl Console for BufferConsole {
    fn getc(&self) -> u8 {
        self.input.lock().pop_front().unwrap_or(0)
    }

    fn putbuf(&self, bytes: &[u8]) {
        self.output.lock().extend_from_slice(bytes);
    }
}

// ── Loader and process host ──────────────────────────────────────────────────

/// Loads a program iff a file by that name exists.
pub struct SimLoader;

impl Loader<RamFs> for SimLoader {
    fn load(&self, fs: &mut RamFs, program: &str, _cmdline: &str) -> Option<LoadedImage<RamFile>> {
        let executable = fs.open(program)?;
        Some(LoadedImage {
            executable,
            space: Box::new(user_space()),
        })
    }
}

/// What a spawned child does once it is running.
#[derive(Clone)]
pub enum Script {
    /// Call exit(status).
    Exit(i32),
    /// Take an unrecoverable page fault.
    Fault,
    /// Die before ever reaching the loader.
    CrashBeforeLoad,
    /// Wait at the barrier, then call exit(status).
    ExitAfter(i32, Arc<Barrier>),
}

/// Runs each child on its own std thread.
pub struct ThreadHost {
    kernel: Once<Weak<Kernel<RamFs>>>,
    scripts: Mutex<BTreeMap<String, Script>>,
    next_pid: AtomicI32,
    threads: Mutex<Vec<JoinHandle<()>>>,
    refuse: AtomicBool,
    powered_off: AtomicBool,
}

impl ThreadHost {
    pub fn new() -> Self {
        Self {
            kernel: Once::new(),
            scripts: Mutex::new(BTreeMap::new()),
            next_pid: AtomicI32::new(100),
            threads: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
            powered_off: AtomicBool::new(false),
        }
    }

    pub fn attach(&self, kernel: &Arc<Kernel<RamFs>>) {
        self.kernel.call_once(|| Arc::downgrade(kernel));
    }

    pub fn script(&self, program: &str, script: Script) {
        self.scripts.lock().insert(program.to_string(), script);
    }

    /// Make every later spawn fail as if no thread could be created.
    pub fn refuse_spawns(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn powered_off(&self) -> bool {
        self.powered_off.load(Ordering::SeqCst)
    }

    pub fn join_all(&self) {
        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

fn run_child(kernel: &Kernel<RamFs>, pid: Pid, cmdline: &str, link: ChildLink, script: Script) {
    if let Script::CrashBeforeLoad = script {
        drop(link);
        return;
    }
    let Some(mut process) = kernel.start_process(pid, cmdline, link, &SimLoader) else {
        return;
    };
    match script {
        Script::Exit(status) => {
            let mut frame = push_call(process.space(), Syscall::Exit.number(), &[status as u32]);
            kernel.handle_trap(&mut process, &mut frame);
        }
        Script::Fault => {
            kernel.handle_fault(&mut process, VirtAddr::new(0x10));
        }
        Script::ExitAfter(status, barrier) => {
            barrier.wait();
            let mut frame = push_call(process.space(), Syscall::Exit.number(), &[status as u32]);
            kernel.handle_trap(&mut process, &mut frame);
        }
        Script::CrashBeforeLoad => {}
    }
}

impl ProcessHost for ThreadHost {
    fn spawn(&self, cmdline: &str, link: ChildLink) -> Option<Pid> {
        if self.refuse.load(Ordering::SeqCst) {
            return None;
        }
        let kernel = self.kernel.get()?.upgrade()?;
        let pid = Pid(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let script = self
            .scripts
            .lock()
            .get(process_name(cmdline))
            .cloned()
            .unwrap_or(Script::Exit(0));
        let cmdline = cmdline.to_string();

        let handle = thread::spawn(move || run_child(&kernel, pid, &cmdline, link, script));
        self.threads.lock().push(handle);
        Some(pid)
    }

    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }
}

// ── Whole kernel ─────────────────────────────────────────────────────────────

pub struct TestKernel {
    pub kernel: Arc<Kernel<RamFs>>,
    pub host: Arc<ThreadHost>,
    pub console: Arc<BufferConsole>,
    pub stats: Arc<FsStats>,
}

impl TestKernel {
    pub fn boot(files: &[(&str, &str)], input: &[u8]) -> Self {
        let fs = RamFs::with_files(files);
        let stats = fs.stats();
        let console = Arc::new(BufferConsole::new(input));
        let host = Arc::new(ThreadHost::new());
        let scheduler: Arc<dyn Scheduler> = Arc::new(StdScheduler::new());
        let kernel = Arc::new(Kernel::new(
            fs,
            Arc::clone(&console) as Arc<dyn Console>,
            Arc::clone(&host) as Arc<dyn ProcessHost>,
            scheduler,
        ));
        host.attach(&kernel);
        Self {
            kernel,
            host,
            console,
            stats,
        }
    }

    /// An initial (parentless) process and a handle on its memory.
    pub fn process(&self, pid: i32, name: &str) -> (Process<RamFile>, UserStack) {
        let stack = UserStack::new();
        let process = Process::new(Pid(pid), name, stack.boxed(), None);
        (process, stack)
    }

    /// Trap into the kernel with `call(args)` and return the frame.
    pub fn call(
        &self,
        process: &mut Process<RamFile>,
        stack: &UserStack,
        call: Syscall,
        args: &[u32],
    ) -> (crate::syscall::TrapExit, TrapFrame) {
        let mut frame = stack.frame(call, args);
        let exit = self.kernel.handle_trap(process, &mut frame);
        (exit, frame)
    }
}
