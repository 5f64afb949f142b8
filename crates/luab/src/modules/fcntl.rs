//! `<fcntl.h>`, exported as `bsd.fcntl`
//!
//! ```lua
//! local fcntl = bsd.fcntl
//! local fd = fcntl.open("/tmp/x", fcntl.O_WRONLY | fcntl.O_CREAT, 420)
//! fcntl.fcntl(fd, fcntl.F_SETFD, fcntl.FD_CLOEXEC)
//! ```

use super::{libc_constants, path_cstring, sys_function};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{Lua, Table};
use nix::errno::Errno;
use std::os::raw::{c_int, c_uint};

fn open(path: &mlua::String, flags: c_int, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated; mode is promoted as the variadic ABI expects.
    let fd = unsafe { libc::open(path.as_ptr(), flags, mode as c_uint) };
    Ok(Errno::result(fd)?)
}

fn openat(dirfd: c_int, path: &mlua::String, flags: c_int, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: see open
    let fd = unsafe { libc::openat(dirfd, path.as_ptr(), flags, mode as c_uint) };
    Ok(Errno::result(fd)?)
}

fn creat(path: &mlua::String, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    let fd = unsafe { libc::creat(path.as_ptr(), mode) };
    Ok(Errno::result(fd)?)
}

/// Only the integer-argument commands are supported.
fn fcntl(fd: c_int, cmd: c_int, arg: c_int) -> LuabResult<c_int> {
    // SAFETY: integer argument commands do not dereference arg
    let ret = unsafe { libc::fcntl(fd, cmd, arg) };
    Ok(Errno::result(ret)?)
}

/// Register `fcntl` functions and constants
pub fn register_fcntl_module(lua: &Lua) -> mlua::Result<Table> {
    let fcntl_table = lua.create_table()?;

    // fcntl.open(path, flags[, mode]) -> fd
    fcntl_table.set(
        "open",
        sys_function(
            lua,
            |_, (path, flags, mode): (mlua::String, c_int, Option<libc::mode_t>)| {
                open(&path, flags, mode.unwrap_or(0))
            },
        )?,
    )?;

    // fcntl.openat(dirfd, path, flags[, mode]) -> fd
    fcntl_table.set(
        "openat",
        sys_function(
            lua,
            |_, (dirfd, path, flags, mode): (c_int, mlua::String, c_int, Option<libc::mode_t>)| {
                openat(dirfd, &path, flags, mode.unwrap_or(0))
            },
        )?,
    )?;

    // fcntl.creat(path, mode) -> fd
    fcntl_table.set(
        "creat",
        sys_function(lua, |_, (path, mode): (mlua::String, libc::mode_t)| {
            creat(&path, mode)
        })?,
    )?;

    // fcntl.fcntl(fd, cmd[, arg]) -> value
    fcntl_table.set(
        "fcntl",
        sys_function(lua, |_, (fd, cmd, arg): (c_int, c_int, Option<c_int>)| {
            fcntl(fd, cmd, arg.unwrap_or(0))
        })?,
    )?;

    set_constants(
        &fcntl_table,
        libc_constants![
            O_RDONLY, O_WRONLY, O_RDWR, O_ACCMODE, O_NONBLOCK, O_APPEND, O_CREAT, O_TRUNC,
            O_EXCL, O_NOCTTY, O_NOFOLLOW, O_DIRECTORY, O_CLOEXEC, O_SYNC,
            F_DUPFD, F_DUPFD_CLOEXEC, F_GETFD, F_SETFD, F_GETFL, F_SETFL, F_GETOWN, F_SETOWN,
            F_GETLK, F_SETLK, F_SETLKW, F_RDLCK, F_UNLCK, F_WRLCK,
            FD_CLOEXEC, AT_FDCWD, AT_SYMLINK_NOFOLLOW, AT_SYMLINK_FOLLOW, AT_REMOVEDIR,
        ],
    )?;

    Ok(fcntl_table)
}
