//! Syscall-surface bindings, one sub-namespace of `bsd` per header
//!
//! Every function follows the errno convention: the result on success,
//! `nil, errno, strerror(errno)` on failure. Argument type errors are raised.

pub mod fcntl;
pub mod grp;
#[cfg(target_os = "freebsd")]
pub mod jail;
pub mod pthread;
pub mod regex;
pub mod signal;
pub mod stdlib;
pub mod sys_stat;
pub mod sys_time;
pub mod sys_uio;
pub mod time;
pub mod unistd;

use crate::error::{sysret, LuabResult};
use mlua::{FromLuaMulti, Function, IntoLuaMulti, Lua, Table};
use nix::errno::Errno;
use std::ffi::CString;

/// `("NAME", libc::NAME)` pairs for [`crate::lua_util::set_constants`].
macro_rules! libc_constants {
    ($($name:ident),+ $(,)?) => {
        &[$((stringify!($name), libc::$name as i64)),+]
    };
}

pub(crate) use libc_constants;

/// Builds the table of one sub-namespace.
pub type RegisterFn = fn(&Lua) -> mlua::Result<Table>;

/// Sub-namespaces below the root table, by dotted path
pub static SYSCALL_MODULES: &[(&str, RegisterFn)] = &[
    ("fcntl", fcntl::register_fcntl_module),
    ("grp", grp::register_grp_module),
    ("pthread", pthread::register_pthread_module),
    ("regex", regex::register_regex_module),
    ("stdlib", stdlib::register_stdlib_module),
    #[cfg(target_os = "freebsd")]
    ("sys.jail", jail::register_jail_module),
    ("sys.stat", sys_stat::register_stat_module),
    ("sys.time", sys_time::register_sys_time_module),
    ("sys.uio", sys_uio::register_uio_module),
    ("time", time::register_time_module),
    ("unistd", unistd::register_unistd_module),
];

/// A Lua string as a C path; interior NUL bytes yield `EINVAL`.
pub(crate) fn path_cstring(path: &mlua::String) -> Result<CString, Errno> {
    CString::new(path.as_bytes().to_vec()).map_err(|_| Errno::EINVAL)
}

/// Lua function around a binding body following the errno convention.
pub(crate) fn sys_function<A, R, F>(lua: &Lua, f: F) -> mlua::Result<Function>
where
    A: FromLuaMulti,
    R: IntoLuaMulti,
    F: Fn(&Lua, A) -> LuabResult<R> + 'static,
{
    lua.create_function(move |lua, args: A| sysret(f(lua, args)))
}
