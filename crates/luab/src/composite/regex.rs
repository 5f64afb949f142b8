//! `regex_t` and `regmatch_t`
//!
//! A compiled pattern is released with `regfree(3)` either explicitly or
//! when the last handle is collected.

use crate::core::{add_module_methods, Module, ModuleInfo};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::cell::{Cell, UnsafeCell};
use std::ffi::CStr;
use std::fmt;
use std::mem;
use std::os::raw::c_int;
use std::rc::Rc;

/// Leading fields of `regex_t`, up to and including `re_nsub`.
///
/// The libc crate keeps the fields of `regex_t` private.
#[allow(dead_code, unused_imports)]
mod ffi {
    use std::os::raw::{c_char, c_int, c_ulong, c_void};

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[repr(C)]
    pub(super) struct RegexPrefix {
        buffer: *mut c_void,
        allocated: usize,
        used: usize,
        syntax: c_ulong,
        fastmap: *mut c_char,
        translate: *mut c_char,
        pub(super) re_nsub: usize,
    }

    #[cfg(all(target_os = "linux", not(target_env = "gnu")))]
    #[repr(C)]
    pub(super) struct RegexPrefix {
        pub(super) re_nsub: usize,
    }

    #[cfg(not(target_os = "linux"))]
    #[repr(C)]
    pub(super) struct RegexPrefix {
        re_magic: c_int,
        pub(super) re_nsub: usize,
    }

    const _: () = assert!(
        std::mem::size_of::<RegexPrefix>() <= std::mem::size_of::<libc::regex_t>()
    );
}

struct RegexCell {
    re: UnsafeCell<libc::regex_t>,
    compiled: Cell<bool>,
}

impl Drop for RegexCell {
    fn drop(&mut self) {
        if self.compiled.get() {
            // SAFETY: the pattern was compiled and nothing else refers to it.
            unsafe { libc::regfree(self.re.get()) };
        }
    }
}

/// Shared handle to a pattern buffer.
#[derive(Clone)]
pub struct RegexHandle(Rc<RegexCell>);

impl Default for RegexHandle {
    fn default() -> Self {
        Self(Rc::new(RegexCell {
            // SAFETY: regex_t is plain old data until regcomp fills it in.
            re: UnsafeCell::new(unsafe { mem::zeroed() }),
            compiled: Cell::new(false),
        }))
    }
}

impl fmt::Debug for RegexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexHandle")
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

impl RegexHandle {
    pub fn is_compiled(&self) -> bool {
        self.0.compiled.get()
    }

    /// Number of parenthesized subexpressions, zero before compilation.
    pub fn re_nsub(&self) -> usize {
        if !self.is_compiled() {
            return 0;
        }
        // SAFETY: re_nsub is set by a successful regcomp and every mirror
        // below is a layout prefix of the platform's regex_t.
        unsafe { (*self.0.re.get().cast::<ffi::RegexPrefix>()).re_nsub }
    }

    /// `regcomp(3)`; returns its result code, 0 on success.
    pub fn compile(&self, pattern: &CStr, cflags: c_int) -> c_int {
        self.free();
        // SAFETY: the buffer is owned by this handle and not compiled.
        let rc = unsafe { libc::regcomp(self.0.re.get(), pattern.as_ptr(), cflags) };
        self.0.compiled.set(rc == 0);
        rc
    }

    /// `regexec(3)` filling `pmatch`; returns the result code.
    pub fn exec(&self, s: &CStr, pmatch: &mut [RegmatchData], eflags: c_int) -> c_int {
        if !self.is_compiled() {
            return libc::REG_BADPAT;
        }
        // SAFETY: regmatch_t is plain old data.
        let mut raw: Vec<libc::regmatch_t> = vec![unsafe { mem::zeroed() }; pmatch.len()];
        // SAFETY: compiled pattern, raw holds pmatch.len() entries.
        let rc = unsafe {
            libc::regexec(
                self.0.re.get(),
                s.as_ptr(),
                raw.len(),
                raw.as_mut_ptr(),
                eflags,
            )
        };
        for (dst, src) in pmatch.iter_mut().zip(&raw) {
            *dst = RegmatchData {
                rm_so: src.rm_so,
                rm_eo: src.rm_eo,
            };
        }
        rc
    }

    /// `regerror(3)` message for `code`.
    pub fn error_message(&self, code: c_int) -> String {
        let re: *const libc::regex_t = if self.is_compiled() {
            self.0.re.get()
        } else {
            std::ptr::null()
        };
        let mut buf = [0u8; 256];
        // SAFETY: buf is writable for its full length; regerror truncates.
        unsafe { libc::regerror(code, re, buf.as_mut_ptr().cast(), buf.len()) };
        String::from_utf8_lossy(super::cstr_bytes(&buf)).into_owned()
    }

    pub fn free(&self) {
        if self.0.compiled.replace(false) {
            // SAFETY: compiled until just now
            unsafe { libc::regfree(self.0.re.get()) };
        }
    }
}

/// `regex_t`
#[derive(Debug, Default)]
pub struct Regex {
    re: RegexHandle,
}

impl Module for Regex {
    type Payload = RegexHandle;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::regex_t>(0x2d40_1f15, "REGEX*");

    fn payload(&self) -> &RegexHandle {
        &self.re
    }

    fn payload_mut(&mut self) -> &mut RegexHandle {
        &mut self.re
    }

    fn to_table(lua: &Lua, payload: &RegexHandle) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("re_nsub", payload.re_nsub())?;
        t.set("compiled", payload.is_compiled())?;
        Ok(t)
    }

    fn check_arg(_lua: &Lua, _value: &Value, fname: &str) -> mlua::Result<RegexHandle> {
        Err(arg_error(fname, 1, "REGEX* cannot be copied"))
    }
}

impl UserData for Regex {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        methods.add_method("get_re_nsub", |_, this, ()| Ok(this.re.re_nsub()));
        methods.add_method("get_compiled", |_, this, ()| Ok(this.re.is_compiled()));
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegmatchData {
    pub rm_so: libc::regoff_t,
    pub rm_eo: libc::regoff_t,
}

/// `regmatch_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Regmatch {
    rm: RegmatchData,
}

impl Module for Regmatch {
    type Payload = RegmatchData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::regmatch_t>(0x2d40_1f16, "REGMATCH*");

    fn payload(&self) -> &RegmatchData {
        &self.rm
    }

    fn payload_mut(&mut self) -> &mut RegmatchData {
        &mut self.rm
    }

    fn to_table(lua: &Lua, payload: &RegmatchData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, rm_so, rm_eo)
    }
}

impl UserData for Regmatch {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, rm_so: libc::regoff_t, rm_eo: libc::regoff_t);
    }
}
