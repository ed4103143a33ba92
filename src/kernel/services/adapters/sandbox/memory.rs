use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::kernel::services::ports::{
    MountEntry, MountTree, SandboxBooter, SandboxError, SandboxInstance,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    Mount,
    Mkdir(String),
    WriteFile { path: String, contents: String },
    Rename { from: String, to: String },
    Remove(String),
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(String),
    Dir,
}

#[derive(Default)]
struct Switches {
    fail_boots: AtomicBool,
    fail_writes: AtomicBool,
}

/// In-memory sandbox. Boots are counted and every instance is kept so callers can inspect the
/// calls it received.
#[derive(Clone, Default)]
pub struct MemorySandbox {
    switches: Arc<Switches>,
    boots: Arc<AtomicUsize>,
    boot_delay: Arc<Mutex<Option<Duration>>>,
    instances: Arc<Mutex<Vec<Arc<MemoryInstance>>>>,
}

impl MemorySandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_boots(&self, fail: bool) {
        self.switches.fail_boots.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.switches.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_boot_delay(&self, delay: Duration) {
        *self.boot_delay.lock() = Some(delay);
    }

    pub fn boot_count(&self) -> usize {
        self.boots.load(Ordering::SeqCst)
    }

    pub fn instances(&self) -> Vec<Arc<MemoryInstance>> {
        self.instances.lock().clone()
    }

    pub fn last_instance(&self) -> Option<Arc<MemoryInstance>> {
        self.instances.lock().last().cloned()
    }
}

#[async_trait]
impl SandboxBooter for MemorySandbox {
    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>, SandboxError> {
        self.boots.fetch_add(1, Ordering::SeqCst);
        let delay = *self.boot_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.switches.fail_boots.load(Ordering::SeqCst) {
            return Err(SandboxError::Boot("injected boot failure".into()));
        }
        let instance = Arc::new(MemoryInstance {
            switches: Arc::clone(&self.switches),
            fs: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        });
        self.instances.lock().push(Arc::clone(&instance));
        Ok(instance)
    }
}

pub struct MemoryInstance {
    switches: Arc<Switches>,
    fs: Mutex<BTreeMap<String, Entry>>,
    calls: Mutex<Vec<SandboxCall>>,
    torn_down: AtomicBool,
}

fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

impl MemoryInstance {
    pub fn calls(&self) -> Vec<SandboxCall> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SandboxCall::WriteFile { path, contents } => Some((path.clone(), contents.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        match self.fs.lock().get(path) {
            Some(Entry::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.fs.lock().get(path), Some(Entry::Dir))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.fs.lock().contains_key(path)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn record(&self, call: SandboxCall) -> Result<(), SandboxError> {
        if self.is_torn_down() {
            return Err(SandboxError::TornDown);
        }
        self.calls.lock().push(call);
        Ok(())
    }

    fn check_writable(&self, path: &str) -> Result<(), SandboxError> {
        if self.switches.fail_writes.load(Ordering::SeqCst) {
            return Err(SandboxError::Io {
                path: path.to_string(),
                message: "injected write failure".into(),
            });
        }
        Ok(())
    }

    fn parent_exists(fs: &BTreeMap<String, Entry>, path: &str) -> bool {
        match parent_of(path) {
            Some(parent) => matches!(fs.get(parent), Some(Entry::Dir)),
            None => true,
        }
    }

    fn mount_into(fs: &mut BTreeMap<String, Entry>, prefix: &str, tree: &MountTree) {
        for (name, entry) in tree {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            match entry {
                MountEntry::File { contents } => {
                    fs.insert(path, Entry::File(contents.clone()));
                }
                MountEntry::Directory(children) => {
                    fs.insert(path.clone(), Entry::Dir);
                    Self::mount_into(fs, &path, children);
                }
            }
        }
    }
}

#[async_trait]
impl SandboxInstance for MemoryInstance {
    async fn mount(&self, tree: &MountTree) -> Result<(), SandboxError> {
        self.record(SandboxCall::Mount)?;
        self.check_writable("")?;
        Self::mount_into(&mut self.fs.lock(), "", tree);
        Ok(())
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        self.record(SandboxCall::Mkdir(path.to_string()))?;
        self.check_writable(path)?;
        let mut fs = self.fs.lock();
        if let Some(Entry::File(_)) = fs.get(path) {
            return Err(SandboxError::Io {
                path: path.to_string(),
                message: "a file exists at this path".into(),
            });
        }
        if !recursive && !Self::parent_exists(&fs, path) {
            return Err(SandboxError::NotFound(path.to_string()));
        }
        let mut current = String::new();
        for seg in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(seg);
            fs.entry(current.clone()).or_insert(Entry::Dir);
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), SandboxError> {
        self.record(SandboxCall::WriteFile {
            path: path.to_string(),
            contents: contents.to_string(),
        })?;
        self.check_writable(path)?;
        let mut fs = self.fs.lock();
        if !Self::parent_exists(&fs, path) {
            return Err(SandboxError::NotFound(path.to_string()));
        }
        if let Some(Entry::Dir) = fs.get(path) {
            return Err(SandboxError::Io {
                path: path.to_string(),
                message: "a directory exists at this path".into(),
            });
        }
        fs.insert(path.to_string(), Entry::File(contents.to_string()));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), SandboxError> {
        self.record(SandboxCall::Rename {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        self.check_writable(to)?;
        let mut fs = self.fs.lock();
        let Some(entry) = fs.remove(from) else {
            return Err(SandboxError::NotFound(from.to_string()));
        };
        let moved: Vec<String> = fs
            .keys()
            .filter(|path| is_descendant(path, from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(child) = fs.remove(&old) {
                fs.insert(format!("{to}{}", &old[from.len()..]), child);
            }
        }
        fs.insert(to.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        self.record(SandboxCall::Remove(path.to_string()))?;
        self.check_writable(path)?;
        let mut fs = self.fs.lock();
        if !fs.contains_key(path) {
            return Err(SandboxError::NotFound(path.to_string()));
        }
        let children: Vec<String> = fs
            .keys()
            .filter(|p| is_descendant(p, path))
            .cloned()
            .collect();
        if !children.is_empty() && !recursive {
            return Err(SandboxError::Io {
                path: path.to_string(),
                message: "directory not empty".into(),
            });
        }
        for child in children {
            fs.remove(&child);
        }
        fs.remove(path);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), SandboxError> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.calls.lock().push(SandboxCall::Teardown);
        self.fs.lock().clear();
        Ok(())
    }
}
