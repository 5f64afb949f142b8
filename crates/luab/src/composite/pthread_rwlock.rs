//! `pthread_rwlock_t`
//!
//! The lock lives on the heap behind a shared handle, so it never moves once
//! initialized. An explicitly initialized lock is destroyed on collection.

use crate::core::{add_module_methods, Module, ModuleInfo};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use nix::errno::Errno;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::os::raw::c_int;
use std::ptr;
use std::rc::Rc;

struct RwlockCell {
    lock: UnsafeCell<libc::pthread_rwlock_t>,
    initialized: Cell<bool>,
}

impl Drop for RwlockCell {
    fn drop(&mut self) {
        if self.initialized.get() {
            // SAFETY: the lock was initialized and nothing else refers to it.
            unsafe { libc::pthread_rwlock_destroy(self.lock.get()) };
        }
    }
}

/// Shared handle to a read/write lock.
#[derive(Clone)]
pub struct RwlockHandle(Rc<RwlockCell>);

impl Default for RwlockHandle {
    fn default() -> Self {
        Self(Rc::new(RwlockCell {
            lock: UnsafeCell::new(libc::PTHREAD_RWLOCK_INITIALIZER),
            initialized: Cell::new(false),
        }))
    }
}

impl fmt::Debug for RwlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwlockHandle")
            .field("initialized", &self.0.initialized.get())
            .finish()
    }
}

/// pthread functions report failure through their return value.
fn check_rc(rc: c_int) -> Result<(), Errno> {
    match rc {
        0 => Ok(()),
        e => Err(Errno::from_raw(e)),
    }
}

impl RwlockHandle {
    fn as_ptr(&self) -> *mut libc::pthread_rwlock_t {
        self.0.lock.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.0.initialized.get()
    }

    pub fn init(&self) -> Result<(), Errno> {
        if self.is_initialized() {
            return Err(Errno::EBUSY);
        }
        // SAFETY: the pointer refers to heap storage owned by this handle.
        check_rc(unsafe { libc::pthread_rwlock_init(self.as_ptr(), ptr::null()) })?;
        self.0.initialized.set(true);
        Ok(())
    }

    pub fn destroy(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_destroy(self.as_ptr()) })?;
        self.0.initialized.set(false);
        Ok(())
    }

    pub fn rdlock(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_rdlock(self.as_ptr()) })
    }

    pub fn tryrdlock(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_tryrdlock(self.as_ptr()) })
    }

    pub fn wrlock(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_wrlock(self.as_ptr()) })
    }

    pub fn trywrlock(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_trywrlock(self.as_ptr()) })
    }

    pub fn unlock(&self) -> Result<(), Errno> {
        // SAFETY: see init
        check_rc(unsafe { libc::pthread_rwlock_unlock(self.as_ptr()) })
    }
}

/// `pthread_rwlock_t`
#[derive(Debug, Default)]
pub struct PthreadRwlock {
    lock: RwlockHandle,
}

impl Module for PthreadRwlock {
    type Payload = RwlockHandle;

    const INFO: ModuleInfo =
        ModuleInfo::new::<libc::pthread_rwlock_t>(0x2d40_1f14, "PTHREAD_RWLOCK*");

    fn payload(&self) -> &RwlockHandle {
        &self.lock
    }

    fn payload_mut(&mut self) -> &mut RwlockHandle {
        &mut self.lock
    }

    fn to_table(lua: &Lua, payload: &RwlockHandle) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("initialized", payload.is_initialized())?;
        Ok(t)
    }

    fn check_arg(_lua: &Lua, _value: &Value, fname: &str) -> mlua::Result<RwlockHandle> {
        Err(arg_error(fname, 1, "PTHREAD_RWLOCK* cannot be copied"))
    }
}

impl UserData for PthreadRwlock {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_cycle() {
        let lock = RwlockHandle::default();
        lock.init().unwrap();
        assert_eq!(lock.init(), Err(Errno::EBUSY));
        lock.rdlock().unwrap();
        assert_eq!(lock.trywrlock(), Err(Errno::EBUSY));
        lock.unlock().unwrap();
        lock.wrlock().unwrap();
        assert_eq!(lock.tryrdlock(), Err(Errno::EBUSY));
        lock.unlock().unwrap();
        lock.destroy().unwrap();
        assert!(!lock.is_initialized());
    }

    #[test]
    fn test_get_table_reports_state() {
        let lua = Lua::new();
        let ud = PthreadRwlock::create(&lua, None).unwrap();
        ud.borrow::<PthreadRwlock>().unwrap().payload().init().unwrap();
        lua.globals().set("rw", ud).unwrap();
        let init: bool = lua.load("return rw:get_table().initialized").eval().unwrap();
        assert!(init);
    }
}
