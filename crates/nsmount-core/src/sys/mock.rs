//! In-memory [`SysOps`] that records every call and tracks open handles.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use super::{FileKind, SysOps};

#[derive(Debug)]
struct Entry {
    kind: FileKind,
    uid: u32,
    gid: u32,
}

#[derive(Debug, Default)]
struct State {
    next_fd: i32,
    open: BTreeMap<i32, PathBuf>,
    max_open: usize,
    entries: BTreeMap<PathBuf, Entry>,
    calls: Vec<String>,
    failures: BTreeMap<(&'static str, PathBuf), Errno>,
}

/// Handle returned by [`MockSys`]; dropping it records a `close`.
pub(crate) struct MockFd {
    fd: i32,
    state: Rc<RefCell<State>>,
}

impl fmt::Debug for MockFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MockFd").field(&self.fd).finish()
    }
}

impl Drop for MockFd {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        let _ = state.open.remove(&self.fd);
        state.calls.push(format!("close {}", self.fd));
    }
}

/// Fake kernel with a flat map of absolute paths. Only `/` exists initially,
/// owned by root.
#[derive(Debug)]
pub(crate) struct MockSys {
    state: Rc<RefCell<State>>,
}

impl MockSys {
    pub(crate) fn new() -> Self {
        let mut state = State {
            next_fd: 3,
            ..State::default()
        };
        let _ = state.entries.insert(
            PathBuf::from("/"),
            Entry {
                kind: FileKind::Directory,
                uid: 0,
                gid: 0,
            },
        );
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Adds a pre-existing entry owned by `uid`.
    pub(crate) fn with_entry(self, path: &str, kind: FileKind, uid: u32) -> Self {
        let _ = self.state.borrow_mut().entries.insert(
            PathBuf::from(path),
            Entry {
                kind,
                uid,
                gid: uid,
            },
        );
        self
    }

    /// Makes `op` fail with `errno` when applied to `path`.
    pub(crate) fn failing(self, op: &'static str, path: &str, errno: Errno) -> Self {
        let _ = self
            .state
            .borrow_mut()
            .failures
            .insert((op, PathBuf::from(path)), errno);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn open_handles(&self) -> usize {
        self.state.borrow().open.len()
    }

    pub(crate) fn max_open_handles(&self) -> usize {
        self.state.borrow().max_open
    }

    pub(crate) fn kind(&self, path: &str) -> Option<FileKind> {
        self.state.borrow().entries.get(Path::new(path)).map(|e| e.kind)
    }

    pub(crate) fn owner(&self, path: &str) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .entries
            .get(Path::new(path))
            .map(|e| (e.uid, e.gid))
    }

    fn path_of(&self, fd: &MockFd) -> PathBuf {
        self.state.borrow().open.get(&fd.fd).cloned().unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn injected(&self, op: &'static str, path: &Path) -> nix::Result<()> {
        match self.state.borrow().failures.get(&(op, path.to_path_buf())) {
            Some(errno) => Err(*errno),
            None => Ok(()),
        }
    }

    fn allocate(&self, path: PathBuf) -> MockFd {
        let mut state = self.state.borrow_mut();
        let fd = state.next_fd;
        state.next_fd += 1;
        let _ = state.open.insert(fd, path);
        state.max_open = state.max_open.max(state.open.len());
        MockFd {
            fd,
            state: Rc::clone(&self.state),
        }
    }

    fn create(&self, path: PathBuf, kind: FileKind) {
        let _ = self.state.borrow_mut().entries.insert(
            path,
            Entry {
                kind,
                uid: 0,
                gid: 0,
            },
        );
    }

    fn chown_entry(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        let entry = state.entries.get_mut(path).ok_or(Errno::ENOENT)?;
        if let Some(uid) = uid {
            entry.uid = uid;
        }
        if let Some(gid) = gid {
            entry.gid = gid;
        }
        Ok(())
    }

    fn lookup(&self, path: &Path) -> Option<FileKind> {
        self.state.borrow().entries.get(path).map(|e| e.kind)
    }
}

fn describe_flags(flags: OFlag) -> String {
    let names = [
        (OFlag::O_CREAT, "O_CREAT"),
        (OFlag::O_EXCL, "O_EXCL"),
        (OFlag::O_WRONLY, "O_WRONLY"),
        (OFlag::O_PATH, "O_PATH"),
        (OFlag::O_NOFOLLOW, "O_NOFOLLOW"),
        (OFlag::O_CLOEXEC, "O_CLOEXEC"),
        (OFlag::O_DIRECTORY, "O_DIRECTORY"),
    ];
    names
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("|")
}

fn id(value: Option<u32>) -> i64 {
    value.map_or(-1, i64::from)
}

impl SysOps for MockSys {
    type Fd = MockFd;

    fn open(&self, path: &Path, flags: OFlag) -> nix::Result<MockFd> {
        self.record(format!("open {} {}", path.display(), describe_flags(flags)));
        self.injected("open", path)?;
        match self.lookup(path) {
            None => Err(Errno::ENOENT),
            Some(FileKind::Directory) => Ok(self.allocate(path.to_path_buf())),
            Some(_) => Err(Errno::ENOTDIR),
        }
    }

    fn openat(&self, dir: &MockFd, name: &OsStr, flags: OFlag, mode: Mode) -> nix::Result<MockFd> {
        self.record(format!(
            "openat {} {:?} {} {:#o}",
            dir.fd,
            name,
            describe_flags(flags),
            mode.bits()
        ));
        let path = self.path_of(dir).join(name);
        self.injected("openat", &path)?;
        match self.lookup(&path) {
            None if flags.contains(OFlag::O_CREAT) => {
                self.create(path.clone(), FileKind::RegularFile);
                Ok(self.allocate(path))
            }
            None => Err(Errno::ENOENT),
            Some(_) if flags.contains(OFlag::O_CREAT | OFlag::O_EXCL) => Err(Errno::EEXIST),
            Some(FileKind::Symlink) if flags.contains(OFlag::O_PATH) => Ok(self.allocate(path)),
            Some(FileKind::Symlink) if flags.contains(OFlag::O_NOFOLLOW) => Err(Errno::ELOOP),
            Some(kind) if flags.contains(OFlag::O_DIRECTORY) && kind != FileKind::Directory => {
                Err(Errno::ENOTDIR)
            }
            Some(_) => Ok(self.allocate(path)),
        }
    }

    fn mkdirat(&self, dir: &MockFd, name: &OsStr, mode: Mode) -> nix::Result<()> {
        self.record(format!("mkdirat {} {:?} {:#o}", dir.fd, name, mode.bits()));
        let path = self.path_of(dir).join(name);
        self.injected("mkdirat", &path)?;
        if self.lookup(&path).is_some() {
            return Err(Errno::EEXIST);
        }
        self.create(path, FileKind::Directory);
        Ok(())
    }

    fn fchown(&self, fd: &MockFd, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()> {
        self.record(format!("fchown {} {} {}", fd.fd, id(uid), id(gid)));
        let path = self.path_of(fd);
        self.injected("fchown", &path)?;
        self.chown_entry(&path, uid, gid)
    }

    fn symlinkat(&self, target: &Path, dir: &MockFd, name: &OsStr) -> nix::Result<()> {
        self.record(format!("symlinkat {:?} {} {:?}", target, dir.fd, name));
        let path = self.path_of(dir).join(name);
        self.injected("symlinkat", &path)?;
        if self.lookup(&path).is_some() {
            return Err(Errno::EEXIST);
        }
        self.create(path, FileKind::Symlink);
        Ok(())
    }

    fn lchownat(
        &self,
        dir: &MockFd,
        name: &OsStr,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> nix::Result<()> {
        self.record(format!("lchownat {} {:?} {} {}", dir.fd, name, id(uid), id(gid)));
        let path = self.path_of(dir).join(name);
        self.injected("lchownat", &path)?;
        self.chown_entry(&path, uid, gid)
    }

    fn fstat_kind(&self, fd: &MockFd) -> nix::Result<FileKind> {
        self.record(format!("fstat {}", fd.fd));
        let path = self.path_of(fd);
        self.injected("fstat", &path)?;
        self.lookup(&path).ok_or(Errno::EBADF)
    }

    fn lstat(&self, path: &Path) -> nix::Result<FileKind> {
        self.record(format!("lstat {}", path.display()));
        self.injected("lstat", path)?;
        self.lookup(path).ok_or(Errno::ENOENT)
    }
}
