//! Shared fixtures: in-memory dax sources and connections with togglable
//! failure points and an operation log.

#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use daxbase::{DaxConn, DaxError, DaxSrc, ErrReason};

pub type OpLog = Arc<Mutex<Vec<String>>>;

pub fn op_log() -> OpLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// The failure reason raised by the probe fixtures.
#[derive(Debug)]
pub struct InvalidDaxConn;

impl ErrReason for InvalidDaxConn {
    fn name(&self) -> &'static str {
        "InvalidDaxConn"
    }

    fn module(&self) -> &'static str {
        module_path!()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A source whose create/commit behavior can be flipped per test, recording
/// every connection operation into a shared log.
pub struct ProbeDaxSrc {
    pub label: &'static str,
    pub log: OpLog,
    pub fail_on_create: Arc<AtomicBool>,
    pub fail_on_commit: Arc<AtomicBool>,
    pub created: Arc<AtomicUsize>,
}

impl ProbeDaxSrc {
    pub fn new(label: &'static str, log: OpLog) -> Self {
        Self {
            label,
            log,
            fail_on_create: Arc::new(AtomicBool::new(false)),
            fail_on_commit: Arc::new(AtomicBool::new(false)),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DaxSrc for ProbeDaxSrc {
    fn create_dax_conn(&self) -> Result<Box<dyn DaxConn>, DaxError> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(DaxError::new(InvalidDaxConn));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ProbeDaxConn {
            label: self.label,
            log: self.log.clone(),
            fail_on_commit: self.fail_on_commit.clone(),
        }))
    }
}

pub struct ProbeDaxConn {
    pub label: &'static str,
    log: OpLog,
    fail_on_commit: Arc<AtomicBool>,
}

impl ProbeDaxConn {
    fn record(&self, op: &str) {
        self.log.lock().unwrap().push(format!("{}#{}", self.label, op));
    }
}

impl DaxConn for ProbeDaxConn {
    fn commit(&mut self) -> Result<(), DaxError> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(DaxError::new(InvalidDaxConn));
        }
        self.record("commit");
        Ok(())
    }

    fn rollback(&mut self) {
        self.record("rollback");
    }

    fn close(&mut self) {
        self.record("close");
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A key-value source whose connections stage writes locally and publish
/// them to the shared store only on commit.
pub struct KvDaxSrc {
    pub store: Arc<Mutex<HashMap<String, String>>>,
}

impl KvDaxSrc {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl DaxSrc for KvDaxSrc {
    fn create_dax_conn(&self) -> Result<Box<dyn DaxConn>, DaxError> {
        Ok(Box::new(KvDaxConn {
            staged: HashMap::new(),
            store: self.store.clone(),
        }))
    }
}

pub struct KvDaxConn {
    staged: HashMap<String, String>,
    store: Arc<Mutex<HashMap<String, String>>>,
}

impl KvDaxConn {
    pub fn put(&mut self, key: &str, value: &str) {
        self.staged.insert(key.to_string(), value.to_string());
    }
}

impl DaxConn for KvDaxConn {
    fn commit(&mut self) -> Result<(), DaxError> {
        let mut store = self.store.lock().unwrap();
        for (key, value) in self.staged.drain() {
            store.insert(key, value);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }

    fn close(&mut self) {}

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
