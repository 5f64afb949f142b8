//! `<unistd.h>`, exported as `bsd.unistd`
//!
//! ```lua
//! local unistd = bsd.unistd
//! local iov = bsd.core.composite.create_iovec(128)
//! local fds = { 0, 0 }
//! unistd.pipe(fds)
//! iov:copy_in("ping")
//! unistd.write(fds[2], iov, iov:get_len())
//! unistd.read(fds[1], iov, 4)
//! ```

use super::{libc_constants, path_cstring, signal, sys_function};
use crate::atomic::Gid;
use crate::composite::{Iovec, IovecHandle};
use crate::core::{check_card, LuabTable, Module};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{Function, Lua, Table, Value};
use nix::errno::Errno;
use std::ffi::CStr;
use std::os::raw::{c_int, c_uint};
use std::ptr;

fn access(path: &mlua::String, mode: c_int) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::access(path.as_ptr(), mode) })?)
}

fn chdir(path: &mlua::String) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::chdir(path.as_ptr()) })?)
}

fn rmdir(path: &mlua::String) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::rmdir(path.as_ptr()) })?)
}

fn unlink(path: &mlua::String) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::unlink(path.as_ptr()) })?)
}

fn link(from: &mlua::String, to: &mlua::String) -> LuabResult<c_int> {
    let (from, to) = (path_cstring(from)?, path_cstring(to)?);
    // SAFETY: both paths are NUL terminated
    Ok(Errno::result(unsafe { libc::link(from.as_ptr(), to.as_ptr()) })?)
}

fn symlink(target: &mlua::String, path: &mlua::String) -> LuabResult<c_int> {
    let (target, path) = (path_cstring(target)?, path_cstring(path)?);
    // SAFETY: both paths are NUL terminated
    Ok(Errno::result(unsafe { libc::symlink(target.as_ptr(), path.as_ptr()) })?)
}

fn readlink(path: &mlua::String) -> LuabResult<Vec<u8>> {
    let path = path_cstring(path)?;
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    // SAFETY: buf is writable for its full length
    let n = unsafe { libc::readlink(path.as_ptr(), buf.as_mut_ptr().cast(), buf.len()) };
    buf.truncate(Errno::result(n)? as usize);
    Ok(buf)
}

fn getcwd() -> LuabResult<Vec<u8>> {
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    // SAFETY: buf is writable for its full length
    let p = unsafe { libc::getcwd(buf.as_mut_ptr().cast(), buf.len()) };
    if p.is_null() {
        return Err(Errno::last().into());
    }
    // SAFETY: getcwd returned a NUL terminated string inside buf
    Ok(unsafe { CStr::from_ptr(p) }.to_bytes().to_vec())
}

fn getgroups() -> LuabResult<Vec<libc::gid_t>> {
    // SAFETY: a zero size only queries the count
    let n = Errno::result(unsafe { libc::getgroups(0, ptr::null_mut()) })?;
    let mut gids: Vec<libc::gid_t> = vec![0; n as usize];
    // SAFETY: gids holds n entries
    let n = Errno::result(unsafe { libc::getgroups(n, gids.as_mut_ptr()) })?;
    gids.truncate(n as usize);
    Ok(gids)
}

fn pipe(t: &Table) -> LuabResult<c_int> {
    check_card(t, Some(2))?;
    let mut fds: [c_int; 2] = [-1; 2];
    // SAFETY: fds holds two descriptors
    Errno::result(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    t.raw_set(1, fds[0])?;
    t.raw_set(2, fds[1])?;
    Ok(0)
}

fn isatty(fd: c_int) -> LuabResult<c_int> {
    // SAFETY: plain integer argument
    match unsafe { libc::isatty(fd) } {
        1 => Ok(1),
        _ => Err(Errno::last().into()),
    }
}

/// `read(2)`/`pread(2)` into the iovec buffer; the iovec length becomes the
/// byte count.
fn read_into(fd: c_int, iov: &IovecHandle, n: usize, offset: Option<libc::off_t>) -> LuabResult<isize> {
    let mut buf = iov.try_guard()?;
    if buf.is_claimed() {
        return Err(Errno::EBUSY.into());
    }
    if n > buf.max_len() {
        return Err(Errno::ERANGE.into());
    }
    let p = buf.as_mut_ptr().cast();
    // SAFETY: the buffer is exclusively borrowed and holds at least n bytes
    let ret = unsafe {
        match offset {
            Some(off) => libc::pread(fd, p, n, off),
            None => libc::read(fd, p, n),
        }
    };
    let ret = Errno::result(ret)?;
    buf.set_len(ret as usize);
    Ok(ret)
}

/// `write(2)`/`pwrite(2)` of the first `n` bytes of the iovec.
fn write_from(fd: c_int, iov: &IovecHandle, n: usize, offset: Option<libc::off_t>) -> LuabResult<isize> {
    let buf = iov.try_guard()?;
    if n > buf.len() {
        return Err(Errno::ERANGE.into());
    }
    let p = buf.as_ptr().cast();
    // SAFETY: the buffer is borrowed and holds at least n initialized bytes
    let ret = unsafe {
        match offset {
            Some(off) => libc::pwrite(fd, p, n, off),
            None => libc::write(fd, p, n),
        }
    };
    Ok(Errno::result(ret)?)
}

/// Register `unistd` functions and constants
pub fn register_unistd_module(lua: &Lua) -> mlua::Result<Table> {
    let unistd = lua.create_table()?;

    // unistd.access(path, mode) -> 0
    unistd.set(
        "access",
        sys_function(lua, |_, (path, mode): (mlua::String, c_int)| access(&path, mode))?,
    )?;

    // unistd.alarm(seconds[, fn]) -> seconds left on the previous alarm
    unistd.set(
        "alarm",
        sys_function(lua, |lua, (seconds, callback): (c_uint, Option<Function>)| {
            let callback = callback.filter(|_| seconds > 0);
            if callback.is_some() {
                signal::prepare()?;
            }
            // SAFETY: alarm cannot fail
            let left = unsafe { libc::alarm(seconds) };
            match callback {
                Some(callback) => signal::arm(lua, callback)?,
                None => signal::disarm(lua)?,
            }
            Ok(left)
        })?,
    )?;

    // unistd.chdir(path) -> 0
    unistd.set("chdir", sys_function(lua, |_, path: mlua::String| chdir(&path))?)?;

    // unistd.close(fd) -> 0
    unistd.set(
        "close",
        sys_function(lua, |_, fd: c_int| {
            // SAFETY: plain integer argument
            Ok(Errno::result(unsafe { libc::close(fd) })?)
        })?,
    )?;

    // unistd.dup(fd) -> fd
    unistd.set(
        "dup",
        sys_function(lua, |_, fd: c_int| {
            // SAFETY: plain integer argument
            Ok(Errno::result(unsafe { libc::dup(fd) })?)
        })?,
    )?;

    // unistd.dup2(fd, fd2) -> fd2
    unistd.set(
        "dup2",
        sys_function(lua, |_, (fd, fd2): (c_int, c_int)| {
            // SAFETY: plain integer arguments
            Ok(Errno::result(unsafe { libc::dup2(fd, fd2) })?)
        })?,
    )?;

    // unistd.fsync(fd) -> 0
    unistd.set(
        "fsync",
        sys_function(lua, |_, fd: c_int| {
            // SAFETY: plain integer argument
            Ok(Errno::result(unsafe { libc::fsync(fd) })?)
        })?,
    )?;

    // unistd.getcwd() -> path
    unistd.set(
        "getcwd",
        sys_function(lua, |lua, ()| Ok(lua.create_string(getcwd()?)?))?,
    )?;

    // SAFETY (all identity queries below): these calls cannot fail
    unistd.set("getegid", lua.create_function(|_, ()| Ok(unsafe { libc::getegid() }))?)?;
    unistd.set("geteuid", lua.create_function(|_, ()| Ok(unsafe { libc::geteuid() }))?)?;
    unistd.set("getgid", lua.create_function(|_, ()| Ok(unsafe { libc::getgid() }))?)?;
    unistd.set("getuid", lua.create_function(|_, ()| Ok(unsafe { libc::getuid() }))?)?;
    unistd.set("getpid", lua.create_function(|_, ()| Ok(unsafe { libc::getpid() }))?)?;
    unistd.set("getppid", lua.create_function(|_, ()| Ok(unsafe { libc::getppid() }))?)?;

    // unistd.getgroups() -> { gid, ... }
    unistd.set(
        "getgroups",
        sys_function(lua, |lua, ()| {
            let gids = LuabTable::new(getgroups()?);
            Ok(Gid::push_table(lua, &gids, None)?)
        })?,
    )?;

    // unistd.isatty(fd) -> 1
    unistd.set("isatty", sys_function(lua, |_, fd: c_int| isatty(fd))?)?;

    // unistd.link(from, to) -> 0
    unistd.set(
        "link",
        sys_function(lua, |_, (from, to): (mlua::String, mlua::String)| link(&from, &to))?,
    )?;

    // unistd.lseek(fd, offset, whence) -> offset
    unistd.set(
        "lseek",
        sys_function(lua, |_, (fd, offset, whence): (c_int, libc::off_t, c_int)| {
            // SAFETY: plain integer arguments
            Ok(Errno::result(unsafe { libc::lseek(fd, offset, whence) })?)
        })?,
    )?;

    // unistd.pipe(t) -> 0, t[1] read end, t[2] write end
    unistd.set("pipe", sys_function(lua, |_, t: Table| pipe(&t))?)?;

    // unistd.read(fd, iovec, n) -> bytes read
    unistd.set(
        "read",
        sys_function(lua, |_, (fd, iov, n): (c_int, Value, usize)| {
            read_into(fd, &Iovec::get(&iov, "read", 2)?, n, None)
        })?,
    )?;

    // unistd.pread(fd, iovec, n, offset) -> bytes read
    unistd.set(
        "pread",
        sys_function(lua, |_, (fd, iov, n, off): (c_int, Value, usize, libc::off_t)| {
            read_into(fd, &Iovec::get(&iov, "pread", 2)?, n, Some(off))
        })?,
    )?;

    // unistd.write(fd, iovec, n) -> bytes written
    unistd.set(
        "write",
        sys_function(lua, |_, (fd, iov, n): (c_int, Value, usize)| {
            write_from(fd, &Iovec::get(&iov, "write", 2)?, n, None)
        })?,
    )?;

    // unistd.pwrite(fd, iovec, n, offset) -> bytes written
    unistd.set(
        "pwrite",
        sys_function(lua, |_, (fd, iov, n, off): (c_int, Value, usize, libc::off_t)| {
            write_from(fd, &Iovec::get(&iov, "pwrite", 2)?, n, Some(off))
        })?,
    )?;

    // unistd.readlink(path) -> target
    unistd.set(
        "readlink",
        sys_function(lua, |lua, path: mlua::String| {
            Ok(lua.create_string(readlink(&path)?)?)
        })?,
    )?;

    // unistd.rmdir(path) -> 0
    unistd.set("rmdir", sys_function(lua, |_, path: mlua::String| rmdir(&path))?)?;

    // unistd.symlink(target, path) -> 0
    unistd.set(
        "symlink",
        sys_function(lua, |_, (target, path): (mlua::String, mlua::String)| {
            symlink(&target, &path)
        })?,
    )?;

    // unistd.unlink(path) -> 0
    unistd.set("unlink", sys_function(lua, |_, path: mlua::String| unlink(&path))?)?;

    set_constants(
        &unistd,
        libc_constants![
            F_OK, R_OK, W_OK, X_OK, SEEK_SET, SEEK_CUR, SEEK_END,
            STDIN_FILENO, STDOUT_FILENO, STDERR_FILENO,
        ],
    )?;

    Ok(unistd)
}
