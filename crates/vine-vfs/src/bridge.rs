//! Blocking call surface over the asynchronous filesystem.
//!
//! A filesystem driver calls in from its own threads and expects every call
//! to block until it has a result. Each call is boxed as a job and sent over
//! a bounded channel to a pump task on the runtime, which spawns it so that
//! calls from different threads interleave. The calling thread waits on a
//! oneshot for the job's result.
//!
//! Errors with an errno are returned as that errno. Any other error means
//! the stored state can no longer be trusted: it is logged and the process
//! exits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::dispatcher::{split_path, FileSystem};
use crate::error::FsResult;
use crate::{Attr, MergedEntry};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Errno-returning, blocking access to a [`FileSystem`].
///
/// Must not be called from within the runtime it schedules onto.
pub struct Bridge {
    fs: Arc<FileSystem>,
    jobs: mpsc::Sender<Job>,
}

impl Bridge {
    /// Start the pump task on `handle`. `capacity` bounds the number of
    /// calls queued but not yet spawned.
    pub fn new(fs: Arc<FileSystem>, handle: &Handle, capacity: usize) -> Self {
        let (jobs, mut queue) = mpsc::channel::<Job>(capacity.max(1));
        handle.spawn(async move {
            while let Some(job) = queue.recv().await {
                tokio::spawn(job);
            }
            debug!("bridge queue closed");
        });
        Self { fs, jobs }
    }

    pub fn filesystem(&self) -> &Arc<FileSystem> {
        &self.fs
    }

    pub fn get_attr(&self, path: &str) -> Result<Attr, i32> {
        let path = split_path(path);
        self.call("getattr", |fs| async move { fs.get_attr(&path).await })
    }

    /// Directory entries, starting with `.` and `..`.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, i32> {
        let path = split_path(path);
        let names = self.call("readdir", |fs| async move { fs.readdir(&path).await })?;
        Ok([".".to_string(), "..".to_string()]
            .into_iter()
            .chain(names)
            .collect())
    }

    /// Read into `buf` from `offset`, returning the number of bytes read.
    pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize, i32> {
        let path = split_path(path);
        let size = buf.len();
        let data = self.call("read", |fs| async move { fs.read(&path, size, offset).await })?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    pub fn write(&self, path: &str, buf: &[u8], offset: u64) -> Result<usize, i32> {
        let path = split_path(path);
        let bytes = buf.to_vec();
        self.call("write", |fs| async move { fs.write(&path, &bytes, offset).await })
    }

    pub fn create_file(&self, path: &str, mode: u32) -> Result<(), i32> {
        let path = split_path(path);
        self.call("mknod", |fs| async move { fs.create_file(&path, mode).await })
    }

    /// Create a directory. Permission bits are not stored.
    pub fn create_directory(&self, path: &str, _mode: u32) -> Result<(), i32> {
        let path = split_path(path);
        self.call("mkdir", |fs| async move { fs.mkdir(&path).await })
    }

    pub fn remove_file(&self, path: &str) -> Result<(), i32> {
        let path = split_path(path);
        self.call("unlink", |fs| async move { fs.remove_file(&path).await })
    }

    pub fn remove_directory(&self, path: &str) -> Result<(), i32> {
        let path = split_path(path);
        self.call("rmdir", |fs| async move { fs.remove_directory(&path).await })
    }

    pub fn truncate(&self, path: &str, size: u64) -> Result<u64, i32> {
        let path = split_path(path);
        self.call("truncate", |fs| async move { fs.truncate(&path, size).await })
    }

    pub fn fork(&self, path: &str) -> Result<bool, i32> {
        let path = split_path(path);
        self.call("fork", |fs| async move { fs.fork(&path).await })
    }

    pub fn merged_readdir(&self, path: &str) -> Result<Vec<MergedEntry>, i32> {
        let path = split_path(path);
        self.call("merged_readdir", |fs| async move { fs.merged_readdir(&path).await })
    }

    pub fn merged_read(&self, path: &str, size: usize, offset: u64) -> Result<Vec<u8>, i32> {
        let path = split_path(path);
        self.call("merged_read", |fs| async move {
            fs.merged_read(&path, size, offset).await
        })
    }

    /// Run one operation on the runtime and block until it completes.
    fn call<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, i32>
    where
        F: FnOnce(Arc<FileSystem>) -> Fut,
        Fut: Future<Output = FsResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        let work = f(self.fs.clone());
        let job: Job = Box::pin(async move {
            // The caller only goes away if the process is exiting.
            let _ = done.send(work.await);
        });

        if self.jobs.blocking_send(job).is_err() {
            fatal(op, &"bridge queue is closed");
        }
        let outcome = match result.blocking_recv() {
            Ok(outcome) => outcome,
            Err(_) => fatal(op, &"job dropped before completing"),
        };

        outcome.map_err(|err| match err.errno() {
            Some(code) => {
                debug!(op, error = %err, code, "operation failed");
                code
            }
            None => fatal(op, &err),
        })
    }
}

fn fatal(op: &str, err: &dyn fmt::Display) -> ! {
    error!(op, error = %err, "unrecoverable filesystem error, exiting");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio::runtime::Runtime;
    use vine_refs::InMemoryRootStore;
    use vine_store::InMemoryObjectStore;
    use vine_types::UserId;

    fn bridge() -> (Runtime, Arc<Bridge>, String) {
        let rt = Runtime::new().unwrap();
        let me = UserId::from_bytes([1; 16]);
        let fs = FileSystem::new(
            me,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRootStore::new()),
        )
        .unwrap();
        let bridge = Bridge::new(Arc::new(fs), rt.handle(), 4);
        (rt, Arc::new(bridge), format!("/{me}"))
    }

    #[test]
    fn blocking_calls_roundtrip() {
        let (_rt, bridge, home) = bridge();

        bridge.create_directory(&format!("{home}/dir"), 0o755).unwrap();
        let file = format!("{home}/dir/file");
        assert_eq!(bridge.write(&file, b"hello world", 0).unwrap(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(bridge.read(&file, &mut buf, 6).unwrap(), 5);
        assert_eq!(&buf, b"world");

        assert_eq!(bridge.get_attr(&file).unwrap(), Attr::File { size: 11 });
        assert_eq!(bridge.truncate(&file, 5).unwrap(), 5);
        assert_eq!(
            bridge.readdir(&format!("{home}/dir")).unwrap(),
            [".", "..", "file"]
        );

        bridge.remove_file(&file).unwrap();
        bridge.remove_directory(&format!("{home}/dir")).unwrap();
        assert_eq!(bridge.readdir(&home).unwrap(), [".", ".."]);
    }

    #[test]
    fn root_listing_includes_dot_entries() {
        let (_rt, bridge, home) = bridge();
        assert_eq!(bridge.readdir("/").unwrap(), [".", "..", &home[1..]]);
        assert_eq!(bridge.get_attr("/").unwrap(), Attr::Directory);
    }

    #[test]
    fn errors_become_errno() {
        let (_rt, bridge, home) = bridge();
        assert_eq!(bridge.get_attr("/not-a-user"), Err(libc::EINVAL));
        assert_eq!(bridge.create_directory("/", 0o755), Err(libc::EPERM));
        assert_eq!(bridge.get_attr(&format!("{home}/missing")), Err(libc::ENOENT));
        assert_eq!(bridge.truncate(&home, 0), Err(libc::EISDIR));

        bridge.create_directory(&format!("{home}/d"), 0o755).unwrap();
        bridge.create_file(&format!("{home}/d/f"), 0o644).unwrap();
        assert_eq!(bridge.remove_directory(&format!("{home}/d")), Err(libc::ENOTEMPTY));
        assert_eq!(bridge.create_directory(&format!("{home}/d"), 0o755), Err(libc::EEXIST));
    }

    #[test]
    fn oversized_file_growth_is_einval() {
        let (_rt, bridge, home) = bridge();
        let file = format!("{home}/f");
        bridge.create_file(&file, 0o100644).unwrap();

        assert_eq!(bridge.truncate(&file, 1 << 50), Err(libc::EINVAL));
        assert_eq!(bridge.write(&file, b"x", 1 << 50), Err(libc::EINVAL));
        assert_eq!(bridge.get_attr(&file).unwrap(), Attr::File { size: 0 });
    }

    #[test]
    fn concurrent_callers_all_complete() {
        let (_rt, bridge, home) = bridge();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bridge = bridge.clone();
                let path = format!("{home}/file-{i}");
                thread::spawn(move || {
                    for round in 0..4u64 {
                        bridge.write(&path, &[i as u8], round).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let names = bridge.readdir(&home).unwrap();
        assert_eq!(names.len(), 2 + 8);
        for i in 0..8u8 {
            let mut buf = [0u8; 8];
            let n = bridge.read(&format!("{home}/file-{i}"), &mut buf, 0).unwrap();
            assert_eq!(&buf[..n], &[i; 4]);
        }
    }
}
