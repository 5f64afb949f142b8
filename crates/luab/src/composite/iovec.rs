//! `struct iovec` with an owned, shareable buffer
//!
//! The buffer lives behind a reference-counted handle so that containers
//! (`sf_hdtr`, `dbt`) and in-flight calls can share it with the Lua object.
//! It is zero-filled and freed when the last handle goes away.
//!
//! ```lua
//! local iov = bsd.core.composite.create_iovec(64)
//! iov:copy_in("hello")
//! iov:get_len()      -- 5
//! iov:copy_out()     -- "hello"
//! ```

use crate::core::{add_module_methods, check_integer, Module, ModuleInfo};
use crate::error::{arg_error, SysRet};
use bitflags::bitflags;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use nix::errno::Errno;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Buffer state bits, as reported by `get_flags()`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IovFlags: u32 {
        /// A buffer is allocated
        const BUFF = 0x0001;
        /// Claimed by a container
        const LOCK = 0x0002;
        /// Reserved for buffers borrowed from elsewhere
        const PROXY = 0x0004;
    }
}

pub(crate) struct IovBuf {
    data: Vec<u8>,
    len: usize,
    flags: IovFlags,
}

impl IovBuf {
    fn with_capacity(max_len: usize) -> Self {
        let flags = if max_len > 0 {
            IovFlags::BUFF
        } else {
            IovFlags::empty()
        };
        Self {
            data: vec![0; max_len],
            len: max_len,
            flags,
        }
    }

    fn check_unlocked(&self) -> Result<(), Errno> {
        if self.flags.contains(IovFlags::LOCK) {
            Err(Errno::EBUSY)
        } else {
            Ok(())
        }
    }
}

impl Drop for IovBuf {
    fn drop(&mut self) {
        self.data.fill(0);
        tracing::trace!(max_len = self.data.len(), "iovec buffer released");
    }
}

/// Shared handle to an iovec buffer.
///
/// Cloning shares the buffer; [`IovecHandle::deep_clone`] copies it.
#[derive(Clone)]
pub struct IovecHandle(Arc<Mutex<IovBuf>>);

impl Default for IovecHandle {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for IovecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buf = self.0.lock();
        f.debug_struct("IovecHandle")
            .field("len", &buf.len)
            .field("max_len", &buf.data.len())
            .field("flags", &buf.flags)
            .finish()
    }
}

impl IovecHandle {
    /// Zeroed buffer of `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self(Arc::new(Mutex::new(IovBuf::with_capacity(max_len))))
    }

    /// Buffer holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = IovBuf::with_capacity(bytes.len());
        buf.data.copy_from_slice(bytes);
        Self(Arc::new(Mutex::new(buf)))
    }

    /// Independent copy with its own buffer; the lock bit is not carried over.
    pub fn deep_clone(&self) -> Self {
        let src = self.0.lock();
        let mut buf = IovBuf::with_capacity(src.data.len());
        buf.data.copy_from_slice(&src.data);
        buf.len = src.len;
        buf.flags = src.flags - IovFlags::LOCK;
        Self(Arc::new(Mutex::new(buf)))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_len(&self) -> usize {
        self.0.lock().data.len()
    }

    pub fn flags(&self) -> IovFlags {
        self.0.lock().flags
    }

    pub fn copy_in(&self, bytes: &[u8]) -> Result<usize, Errno> {
        let mut buf = self.try_guard()?;
        buf.0.check_unlocked()?;
        if bytes.len() > buf.0.data.len() {
            return Err(Errno::ERANGE);
        }
        buf.0.data[..bytes.len()].copy_from_slice(bytes);
        buf.0.len = bytes.len();
        Ok(bytes.len())
    }

    pub fn copy_out(&self) -> Vec<u8> {
        let buf = self.0.lock();
        buf.data[..buf.len].to_vec()
    }

    /// Zero the buffer and reset the length to zero.
    pub fn clear(&self) -> Result<(), Errno> {
        let mut buf = self.try_guard()?;
        buf.0.check_unlocked()?;
        buf.0.data.fill(0);
        buf.0.len = 0;
        Ok(())
    }

    /// Change the capacity, truncating the contents if needed.
    pub fn resize(&self, max_len: usize) -> Result<usize, Errno> {
        let mut buf = self.try_guard()?;
        buf.0.check_unlocked()?;
        if max_len < buf.0.data.len() {
            buf.0.data[max_len..].fill(0);
        }
        buf.0.data.resize(max_len, 0);
        buf.0.len = buf.0.len.min(max_len);
        buf.0.flags.set(IovFlags::BUFF, max_len > 0);
        Ok(max_len)
    }

    /// Mark the buffer as held by a container.
    pub fn claim(&self) -> Result<(), Errno> {
        let mut buf = self.try_guard()?;
        buf.0.check_unlocked()?;
        buf.0.flags.insert(IovFlags::LOCK);
        Ok(())
    }

    pub fn release(&self) {
        self.0.lock().flags.remove(IovFlags::LOCK);
    }

    /// Exclusive access for the duration of a call.
    ///
    /// Fails with `EBUSY` when the buffer is already borrowed, e.g. because
    /// the same iovec appears twice in one vector.
    pub fn try_guard(&self) -> Result<IovGuard<'_>, Errno> {
        self.0.try_lock().map(IovGuard).ok_or(Errno::EBUSY)
    }

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> std::sync::Weak<Mutex<IovBuf>> {
        Arc::downgrade(&self.0)
    }
}

/// Borrowed buffer, handed to the C side while a call is in flight.
pub struct IovGuard<'a>(MutexGuard<'a, IovBuf>);

impl IovGuard<'_> {
    pub fn len(&self) -> usize {
        self.0.len
    }

    pub fn is_empty(&self) -> bool {
        self.0.len == 0
    }

    pub fn max_len(&self) -> usize {
        self.0.data.len()
    }

    /// Held by a container; the contents must not change.
    pub fn is_claimed(&self) -> bool {
        self.0.flags.contains(IovFlags::LOCK)
    }

    /// Record how many bytes the call produced.
    pub fn set_len(&mut self, len: usize) {
        self.0.len = len.min(self.0.data.len());
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.0.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.data.as_mut_ptr()
    }

    /// `struct iovec` covering the first `len` bytes.
    pub fn to_iovec(&mut self, len: usize) -> Result<libc::iovec, Errno> {
        if len > self.max_len() {
            return Err(Errno::ERANGE);
        }
        Ok(libc::iovec {
            iov_base: self.as_mut_ptr().cast(),
            iov_len: len,
        })
    }
}

/// `struct iovec`
#[derive(Debug, Clone, Default)]
pub struct Iovec {
    iov: IovecHandle,
}

impl Iovec {
    pub fn handle(&self) -> &IovecHandle {
        &self.iov
    }
}

fn check_size(value: &Value, fname: &str, narg: usize) -> mlua::Result<usize> {
    let n = check_integer(value, fname, narg)?;
    usize::try_from(n).map_err(|_| arg_error(fname, narg, format!("invalid size {n}")))
}

impl Module for Iovec {
    type Payload = IovecHandle;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::iovec>(0x2d40_1f11, "IOVEC*");

    fn payload(&self) -> &IovecHandle {
        &self.iov
    }

    fn payload_mut(&mut self) -> &mut IovecHandle {
        &mut self.iov
    }

    fn to_table(lua: &Lua, payload: &IovecHandle) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("iov_base", lua.create_string(payload.copy_out())?)?;
        t.set("iov_len", payload.len())?;
        t.set("max_len", payload.max_len())?;
        t.set("flags", payload.flags().bits())?;
        Ok(t)
    }

    /// `create_iovec(n)` allocates, `create_iovec(s)` copies a string and
    /// `create_iovec(iov)` deep-copies another iovec.
    fn check_arg(_lua: &Lua, value: &Value, fname: &str) -> mlua::Result<IovecHandle> {
        match value {
            Value::String(s) => Ok(IovecHandle::from_bytes(&s.as_bytes())),
            Value::UserData(_) => Ok(Self::get(value, fname, 1)?.deep_clone()),
            _ => Ok(IovecHandle::new(check_size(value, fname, 1)?)),
        }
    }
}

impl UserData for Iovec {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method("copy_in", |_, this, value: Value| {
            let Value::String(s) = &value else {
                return Err(arg_error(
                    "copy_in",
                    2,
                    format!("string expected, got {}", value.type_name()),
                ));
            };
            Ok(SysRet::from(this.iov.copy_in(&s.as_bytes())))
        });

        methods.add_method("copy_out", |lua, this, ()| {
            lua.create_string(this.iov.copy_out())
        });

        methods.add_method("clear", |_, this, ()| {
            Ok(SysRet::from(this.iov.clear().map(|()| 0)))
        });

        methods.add_method("resize", |_, this, n: Value| {
            let n = check_size(&n, "resize", 2)?;
            Ok(SysRet::from(this.iov.resize(n)))
        });

        methods.add_method("clone", |lua, this, ()| {
            Self::create(lua, Some(this.iov.deep_clone()))
        });

        methods.add_method("get_len", |_, this, ()| Ok(this.iov.len()));
        methods.add_method("get_max_len", |_, this, ()| Ok(this.iov.max_len()));
        methods.add_method("get_flags", |_, this, ()| Ok(this.iov.flags().bits()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        let ns = lua.create_table().unwrap();
        install_constructor::<Iovec>(&lua, &ns, "create_iovec").unwrap();
        lua.globals().set("c", ns).unwrap();
        lua
    }

    #[test]
    fn test_copy_in_out() {
        let lua = create_lua();
        let (s, len, max): (String, usize, usize) = lua
            .load(
                r#"
                local iov = c.create_iovec(16)
                iov:copy_in("hello")
                return iov:copy_out(), iov:get_len(), iov:get_max_len()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((s.as_str(), len, max), ("hello", 5, 16));
    }

    #[test]
    fn test_copy_in_too_long_is_erange() {
        let lua = create_lua();
        let (v, errno): (Value, i32) = lua
            .load(r#"local iov = c.create_iovec(4); return iov:copy_in("hello")"#)
            .eval()
            .unwrap();
        assert!(v.is_nil());
        assert_eq!(errno, libc::ERANGE);
    }

    #[test]
    fn test_locked_buffer_is_busy() {
        let iov = IovecHandle::new(8);
        iov.claim().unwrap();
        assert_eq!(iov.copy_in(b"x"), Err(Errno::EBUSY));
        assert_eq!(iov.resize(4), Err(Errno::EBUSY));
        assert_eq!(iov.clear(), Err(Errno::EBUSY));
        assert_eq!(iov.claim(), Err(Errno::EBUSY));
        iov.release();
        assert_eq!(iov.copy_in(b"x"), Ok(1));
    }

    #[test]
    fn test_guard_excludes_second_borrow() {
        let iov = IovecHandle::new(8);
        let alias = iov.clone();
        let _guard = iov.try_guard().unwrap();
        assert!(matches!(alias.try_guard(), Err(Errno::EBUSY)));
    }

    #[test]
    fn test_clone_is_independent() {
        let lua = create_lua();
        let (a, b): (String, String) = lua
            .load(
                r#"
                local iov = c.create_iovec(8)
                iov:copy_in("abc")
                local copy = iov:clone()
                copy:copy_in("xyz")
                return iov:copy_out(), copy:copy_out()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("abc", "xyz"));
    }

    #[test]
    fn test_resize_truncates() {
        let iov = IovecHandle::from_bytes(b"abcdef");
        assert_eq!(iov.resize(3), Ok(3));
        assert_eq!(iov.copy_out(), b"abc");
        assert_eq!(iov.resize(0), Ok(0));
        assert!(!iov.flags().contains(IovFlags::BUFF));
    }

    #[test]
    fn test_buffer_released_once_after_clone() {
        let lua = create_lua();
        let ud = Iovec::create(&lua, Some(IovecHandle::new(32))).unwrap();
        let weak = ud.borrow::<Iovec>().unwrap().handle().downgrade();
        lua.globals().set("iov", ud).unwrap();
        lua.load("local copy = iov:clone(); copy = nil").exec().unwrap();
        lua.gc_collect().unwrap();
        assert!(weak.upgrade().is_some());

        lua.load("iov = nil").exec().unwrap();
        lua.gc_collect().unwrap();
        lua.gc_collect().unwrap();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_create_from_string() {
        let lua = create_lua();
        let s: String = lua
            .load(r#"return c.create_iovec("payload"):copy_out()"#)
            .eval()
            .unwrap();
        assert_eq!(s, "payload");
        assert!(lua.load("c.create_iovec(-1)").exec().is_err());
    }
}
