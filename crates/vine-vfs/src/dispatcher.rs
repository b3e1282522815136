//! Path dispatch across branches.
//!
//! The root directory is reserved for branches: it lists the user id of
//! every known branch and cannot be written. The first component of any
//! other path names a branch and the remainder is handed to it.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;
use vine_branch::{display_path, Attr, Branch};
use vine_merge::{MergedEntry, MultiDir};
use vine_refs::{FileRootStore, RootStore};
use vine_store::{Blob, DiskObjectStore, Object, ObjectStore};
use vine_types::UserId;

use crate::config::VineConfig;
use crate::error::{FsError, FsResult};

/// Split a driver path such as `/a/b/` into its components.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|component| !component.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every branch of one Vine filesystem behind a single namespace.
pub struct FileSystem {
    local_user: UserId,
    store: Arc<dyn ObjectStore>,
    roots: Arc<dyn RootStore>,
    branches: RwLock<BTreeMap<UserId, Arc<Branch>>>,
}

impl FileSystem {
    /// Load every persisted branch, plus the local user's branch (created if
    /// it does not exist yet).
    pub fn new(
        local_user: UserId,
        store: Arc<dyn ObjectStore>,
        roots: Arc<dyn RootStore>,
    ) -> FsResult<Self> {
        let mut users = roots.list_users()?;
        if !users.contains(&local_user) {
            users.push(local_user);
        }

        let mut branches = BTreeMap::new();
        for user in users {
            let branch = Branch::load_or_create(user, store.clone(), roots.clone())?;
            branches.insert(user, Arc::new(branch));
        }

        Ok(Self {
            local_user,
            store,
            roots,
            branches: RwLock::new(branches),
        })
    }

    /// Open the on-disk filesystem described by `config`.
    pub fn open(config: &VineConfig) -> FsResult<Self> {
        let local_user = UserId::load_or_create(&config.user_id_file())?;
        let store = DiskObjectStore::open(config.object_dir())?;
        let roots = FileRootStore::open(config.branch_dir())?;
        let fs = Self::new(local_user, Arc::new(store), Arc::new(roots))?;
        info!(
            base = %config.base_dir.display(),
            user = %local_user,
            branches = fs.branches().len(),
            "opened filesystem"
        );
        Ok(fs)
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    /// Make `user`'s branch known, loading or creating it. Returns the
    /// existing branch if it is already open.
    pub fn open_branch(&self, user: UserId) -> FsResult<Arc<Branch>> {
        let mut branches = self.branches.write().expect("branch map lock poisoned");
        if let Some(branch) = branches.get(&user) {
            return Ok(branch.clone());
        }
        let branch = Arc::new(Branch::load_or_create(
            user,
            self.store.clone(),
            self.roots.clone(),
        )?);
        branches.insert(user, branch.clone());
        Ok(branch)
    }

    /// Every open branch, in user order.
    pub fn branches(&self) -> Vec<Arc<Branch>> {
        self.branches
            .read()
            .expect("branch map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub async fn get_attr<S: AsRef<str>>(&self, path: &[S]) -> FsResult<Attr> {
        if path.is_empty() {
            return Ok(Attr::Directory);
        }
        let (branch, rest) = self.find_branch(path)?;
        Ok(branch.get_attr(rest).await?)
    }

    /// Entry names under `path`. The root lists every branch's user id.
    pub async fn readdir<S: AsRef<str>>(&self, path: &[S]) -> FsResult<Vec<String>> {
        if path.is_empty() {
            return Ok(self
                .branches
                .read()
                .expect("branch map lock poisoned")
                .keys()
                .map(UserId::to_string)
                .collect());
        }
        let (branch, rest) = self.find_branch(path)?;
        Ok(branch
            .readdir(rest)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    pub async fn read<S: AsRef<str>>(
        &self,
        path: &[S],
        size: usize,
        offset: u64,
    ) -> FsResult<Vec<u8>> {
        let (branch, rest) = self.find_file(path)?;
        Ok(branch.read(rest, size, offset).await?)
    }

    pub async fn write<S: AsRef<str>>(
        &self,
        path: &[S],
        bytes: &[u8],
        offset: u64,
    ) -> FsResult<usize> {
        let (branch, rest) = self.find_file(path)?;
        Ok(branch.write(rest, bytes, offset).await?)
    }

    /// Create an empty file. FIFOs are not supported.
    pub async fn create_file<S: AsRef<str>>(&self, path: &[S], mode: u32) -> FsResult<()> {
        if (mode & libc::S_IFMT as u32) == libc::S_IFIFO as u32 {
            return Err(FsError::InvalidArgument(format!(
                "{}: fifos are not supported",
                display_path(path)
            )));
        }
        let (branch, rest) = self.find_file(path)?;
        branch.store(rest, Object::Blob(Blob::default())).await?;
        Ok(())
    }

    pub async fn mkdir<S: AsRef<str>>(&self, path: &[S]) -> FsResult<()> {
        if path.is_empty() {
            return Err(FsError::PermissionDenied(
                "the root directory is reserved for branches".into(),
            ));
        }
        let (branch, rest) = self.find_branch(path)?;
        Ok(branch.mkdir(rest).await?)
    }

    pub async fn remove_file<S: AsRef<str>>(&self, path: &[S]) -> FsResult<()> {
        let (branch, rest) = self.find_branch_content(path)?;
        Ok(branch.remove(rest).await?)
    }

    pub async fn remove_directory<S: AsRef<str>>(&self, path: &[S]) -> FsResult<()> {
        let (branch, rest) = self.find_branch_content(path)?;
        Ok(branch.rmdir(rest).await?)
    }

    pub async fn truncate<S: AsRef<str>>(&self, path: &[S], size: u64) -> FsResult<u64> {
        if path.is_empty() {
            return Err(FsError::IsADirectory(display_path(path)));
        }
        let (branch, rest) = self.find_branch(path)?;
        if rest.is_empty() {
            return Err(FsError::IsADirectory(display_path(path)));
        }
        Ok(branch.truncate(rest, size).await?)
    }

    /// Give the local branch its own copy of the directory at `path`, a
    /// path relative to the branch roots (no user id component).
    ///
    /// Walks the merged view level by level. At the first level the local
    /// branch has no version of, the fork point chosen by the merge engine
    /// is grafted into the local branch. Returns `false` when the local
    /// branch already has every level.
    pub async fn fork<S: AsRef<str>>(&self, path: &[S]) -> FsResult<bool> {
        let path: Vec<&str> = path.iter().map(|name| name.as_ref()).collect();
        let local = self.open_branch(self.local_user)?;
        let mut dir = self.root_versions();

        for depth in 0..path.len() {
            let name = path[depth];
            let here = &path[..=depth];
            let picked = dir
                .pick_subdirectory_to_edit(self.local_user, name)?
                .ok_or_else(|| FsError::NotFound(display_path(here)))?;

            if picked.user != self.local_user {
                local.graft(here, &picked.version).await?;
                info!(
                    user = %self.local_user,
                    from = %picked.user,
                    path = %display_path(here),
                    "forked directory"
                );
                return Ok(true);
            }
            dir = dir.cd_into(name)?;
        }
        Ok(false)
    }

    /// Merged listing of `path` (relative to the branch roots) across every
    /// branch.
    pub async fn merged_readdir<S: AsRef<str>>(&self, path: &[S]) -> FsResult<Vec<MergedEntry>> {
        Ok(self.root_versions().cd_into_path(path)?.entries()?)
    }

    /// Read a file through the merged view of every branch.
    pub async fn merged_read<S: AsRef<str>>(
        &self,
        path: &[S],
        size: usize,
        offset: u64,
    ) -> FsResult<Vec<u8>> {
        let (name, parents) = path
            .split_last()
            .ok_or_else(|| FsError::IsADirectory(display_path(path)))?;
        let id = self.root_versions().cd_into_path(parents)?.file(name.as_ref())?;
        match self.store.get(&id)? {
            Object::Blob(blob) => Ok(blob.read_at(size, offset).to_vec()),
            other => Err(FsError::Corrupt(format!(
                "{} resolved to a {}",
                display_path(path),
                other.kind()
            ))),
        }
    }

    fn root_versions(&self) -> MultiDir {
        let versions = self
            .branches
            .read()
            .expect("branch map lock poisoned")
            .iter()
            .map(|(user, branch)| (*user, branch.root()))
            .collect();
        MultiDir::new(versions, self.store.clone())
    }

    /// The branch named by the first component, and the rest of the path.
    fn find_branch<'a, S: AsRef<str>>(&self, path: &'a [S]) -> FsResult<(Arc<Branch>, &'a [S])> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| FsError::InvalidArgument("path names no branch".into()))?;
        let first = first.as_ref();
        let user = UserId::parse(first)
            .ok_or_else(|| FsError::InvalidArgument(format!("{first:?} is not a user id")))?;
        let branch = self
            .branches
            .read()
            .expect("branch map lock poisoned")
            .get(&user)
            .cloned()
            .ok_or_else(|| FsError::InvalidArgument(format!("no branch for {user}")))?;
        Ok((branch, rest))
    }

    /// Like [`find_branch`](Self::find_branch) for operations on a file:
    /// the root is invalid and a bare branch is a directory.
    fn find_file<'a, S: AsRef<str>>(&self, path: &'a [S]) -> FsResult<(Arc<Branch>, &'a [S])> {
        if path.is_empty() {
            return Err(FsError::InvalidArgument("the root is not a file".into()));
        }
        let (branch, rest) = self.find_branch(path)?;
        if rest.is_empty() {
            return Err(FsError::IsADirectory(display_path(path)));
        }
        Ok((branch, rest))
    }

    /// For removals: neither the root nor a whole branch can be removed.
    fn find_branch_content<'a, S: AsRef<str>>(
        &self,
        path: &'a [S],
    ) -> FsResult<(Arc<Branch>, &'a [S])> {
        if path.is_empty() {
            return Err(FsError::PermissionDenied(
                "the root directory cannot be removed".into(),
            ));
        }
        let (branch, rest) = self.find_branch(path)?;
        if rest.is_empty() {
            return Err(FsError::PermissionDenied(format!(
                "branch {} cannot be removed",
                branch.owner()
            )));
        }
        Ok((branch, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vine_merge::EntryKind;
    use vine_refs::InMemoryRootStore;
    use vine_store::InMemoryObjectStore;

    const ROOT: &[&str] = &[];

    fn user(n: u8) -> UserId {
        UserId::from_bytes([n; 16])
    }

    /// Filesystem local to user 1 with a second branch for user 2.
    fn two_branches() -> (FileSystem, String, String) {
        let fs = FileSystem::new(
            user(1),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRootStore::new()),
        )
        .unwrap();
        fs.open_branch(user(2)).unwrap();
        (fs, user(1).to_string(), user(2).to_string())
    }

    #[test]
    fn split_path_drops_empty_components() {
        assert!(split_path("/").is_empty());
        assert!(split_path("").is_empty());
        assert_eq!(split_path("/a//b/"), ["a", "b"]);
    }

    #[tokio::test]
    async fn root_lists_every_branch() {
        let (fs, a, b) = two_branches();
        assert_eq!(fs.get_attr(ROOT).await.unwrap(), Attr::Directory);
        assert_eq!(fs.readdir(ROOT).await.unwrap(), vec![a.clone(), b]);
        assert_eq!(fs.get_attr(&[a]).await.unwrap(), Attr::Directory);
        assert_eq!(fs.local_user(), user(1));
        assert_eq!(fs.branches().len(), 2);
    }

    #[tokio::test]
    async fn routing_errors() {
        let (fs, a, _) = two_branches();
        assert!(matches!(
            fs.get_attr(&["nonexistent-user"]).await,
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.get_attr(&[user(9).to_string()]).await,
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(fs.mkdir(ROOT).await, Err(FsError::PermissionDenied(_))));
        assert!(matches!(
            fs.get_attr(&[a.as_str(), "missing.txt"]).await,
            Err(FsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn file_operations_at_root_and_branch_level() {
        let (fs, a, _) = two_branches();
        assert!(matches!(fs.read(ROOT, 1, 0).await, Err(FsError::InvalidArgument(_))));
        assert!(matches!(fs.write(ROOT, b"x", 0).await, Err(FsError::InvalidArgument(_))));
        assert!(matches!(fs.create_file(ROOT, 0o644).await, Err(FsError::InvalidArgument(_))));
        assert!(matches!(fs.truncate(ROOT, 0).await, Err(FsError::IsADirectory(_))));

        let bare = [a.as_str()];
        assert!(matches!(fs.read(&bare, 1, 0).await, Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.write(&bare, b"x", 0).await, Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.create_file(&bare, 0o644).await, Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.truncate(&bare, 0).await, Err(FsError::IsADirectory(_))));
    }

    #[tokio::test]
    async fn branches_and_root_cannot_be_removed() {
        let (fs, a, _) = two_branches();
        assert!(matches!(fs.remove_file(ROOT).await, Err(FsError::PermissionDenied(_))));
        assert!(matches!(fs.remove_directory(ROOT).await, Err(FsError::PermissionDenied(_))));
        assert!(matches!(fs.remove_file(&[&a]).await, Err(FsError::PermissionDenied(_))));
        assert!(matches!(fs.remove_directory(&[&a]).await, Err(FsError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn operations_reach_the_named_branch() {
        let (fs, a, b) = two_branches();
        fs.mkdir(&[a.as_str(), "docs"]).await.unwrap();
        fs.write(&[a.as_str(), "docs", "note"], b"hello", 0).await.unwrap();
        fs.create_file(&[b.as_str(), "empty"], 0o100644).await.unwrap();

        assert_eq!(fs.read(&[a.as_str(), "docs", "note"], 16, 0).await.unwrap(), b"hello");
        assert_eq!(
            fs.get_attr(&[b.as_str(), "empty"]).await.unwrap(),
            Attr::File { size: 0 }
        );
        assert_eq!(fs.readdir(&[a.as_str()]).await.unwrap(), ["docs"]);
        assert_eq!(fs.readdir(&[b.as_str()]).await.unwrap(), ["empty"]);

        assert_eq!(fs.truncate(&[a.as_str(), "docs", "note"], 2).await.unwrap(), 2);
        assert_eq!(fs.read(&[a.as_str(), "docs", "note"], 16, 0).await.unwrap(), b"he");

        fs.remove_file(&[a.as_str(), "docs", "note"]).await.unwrap();
        fs.remove_directory(&[a.as_str(), "docs"]).await.unwrap();
        assert!(fs.readdir(&[a.as_str()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fifo_creation_is_rejected() {
        let (fs, a, _) = two_branches();
        let fifo = libc::S_IFIFO as u32 | 0o644;
        assert!(matches!(
            fs.create_file(&[a.as_str(), "pipe"], fifo).await,
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn fork_grafts_foreign_directory_once() {
        let (fs, a, b) = two_branches();
        fs.mkdir(&[b.as_str(), "shared"]).await.unwrap();
        fs.mkdir(&[b.as_str(), "shared", "sub"]).await.unwrap();
        fs.write(&[b.as_str(), "shared", "sub", "f"], b"from b", 0).await.unwrap();

        assert!(fs.fork(&["shared"]).await.unwrap());
        assert_eq!(
            fs.read(&[a.as_str(), "shared", "sub", "f"], 16, 0).await.unwrap(),
            b"from b"
        );

        let local = fs.open_branch(user(1)).unwrap();
        assert_eq!(local.root().versions.get(&user(1)), 1);
        assert_eq!(local.root().versions.get(&user(2)), 3);

        assert!(!fs.fork(&["shared"]).await.unwrap());
        assert!(!fs.fork(&["shared", "sub"]).await.unwrap());
        assert!(matches!(fs.fork(&["absent"]).await, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn fork_of_concurrent_versions_conflicts() {
        let (fs, _, b) = two_branches();
        let c = user(3).to_string();
        fs.open_branch(user(3)).unwrap();
        for (owner, content) in [(&b, b"b"), (&c, b"c")] {
            fs.mkdir(&[owner.as_str(), "shared"]).await.unwrap();
            fs.write(&[owner.as_str(), "shared", "f"], content, 0).await.unwrap();
        }

        let err = fs.fork(&["shared"]).await.unwrap_err();
        assert!(matches!(err, FsError::Conflict(_)));
        assert_eq!(err.errno(), Some(libc::EIO));
    }

    #[tokio::test]
    async fn merged_view_spans_branches() {
        let (fs, a, b) = two_branches();
        fs.write(&[a.as_str(), "mine"], b"a", 0).await.unwrap();
        fs.mkdir(&[b.as_str(), "theirs"]).await.unwrap();
        fs.write(&[b.as_str(), "theirs", "f"], b"b's file", 0).await.unwrap();

        let entries = fs.merged_readdir(ROOT).await.unwrap();
        let summary: Vec<(&str, EntryKind, usize)> = entries
            .iter()
            .map(|e| (e.name.as_str(), e.kind, e.users.len()))
            .collect();
        assert_eq!(
            summary,
            [("mine", EntryKind::File, 1), ("theirs", EntryKind::Directory, 1)]
        );

        assert_eq!(fs.merged_read(&["theirs", "f"], 3, 4).await.unwrap(), b"fil");
        assert!(matches!(fs.merged_read(&["theirs"], 3, 0).await, Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.merged_read(ROOT, 3, 0).await, Err(FsError::IsADirectory(_))));
    }

    #[tokio::test]
    async fn open_persists_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let config = VineConfig::from_base_dir(dir.path());

        let user = {
            let fs = FileSystem::open(&config).unwrap();
            let me = fs.local_user().to_string();
            fs.mkdir(&[me.as_str(), "d"]).await.unwrap();
            fs.write(&[me.as_str(), "d", "f"], b"kept", 0).await.unwrap();
            fs.local_user()
        };

        let fs = FileSystem::open(&config).unwrap();
        assert_eq!(fs.local_user(), user);
        let me = user.to_string();
        assert_eq!(fs.read(&[me.as_str(), "d", "f"], 16, 0).await.unwrap(), b"kept");
        assert_eq!(fs.readdir(ROOT).await.unwrap(), [me]);
    }
}
