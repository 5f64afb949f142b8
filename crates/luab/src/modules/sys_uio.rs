//! `<sys/uio.h>`, exported as `bsd.sys.uio`
//!
//! Scatter/gather I/O over a table of `IOVEC*`. Every buffer is borrowed
//! for the duration of the call; listing the same iovec twice yields
//! `EBUSY`.

use super::sys_function;
use crate::composite::{IovGuard, Iovec, IovecHandle};
use crate::core::Module;
use crate::error::LuabResult;
use mlua::{Lua, Table};
use nix::errno::Errno;
use std::os::raw::c_int;

/// Iovec table with exactly `iovcnt` entries.
pub(super) fn check_iov(t: &Table, iovcnt: c_int, fname: &str) -> LuabResult<Vec<IovecHandle>> {
    let card = usize::try_from(iovcnt).map_err(|_| Errno::EINVAL)?;
    Ok(Iovec::check_table(t, Some(card), fname, 2)?.into_vec())
}

pub(super) fn borrow_all(handles: &[IovecHandle]) -> Result<Vec<IovGuard<'_>>, Errno> {
    handles.iter().map(IovecHandle::try_guard).collect()
}

/// Like [`borrow_all`], for calls that write into the buffers: a buffer
/// held by a container is `EBUSY`.
pub(super) fn borrow_writable(handles: &[IovecHandle]) -> Result<Vec<IovGuard<'_>>, Errno> {
    let guards = borrow_all(handles)?;
    if guards.iter().any(IovGuard::is_claimed) {
        return Err(Errno::EBUSY);
    }
    Ok(guards)
}

fn readv(fd: c_int, t: &Table, iovcnt: c_int, offset: Option<libc::off_t>) -> LuabResult<isize> {
    let handles = check_iov(t, iovcnt, "readv")?;
    let mut guards = borrow_writable(&handles)?;
    let iov = guards
        .iter_mut()
        .map(|g| {
            let n = g.max_len();
            g.to_iovec(n)
        })
        .collect::<Result<Vec<_>, Errno>>()?;
    // SAFETY: every iovec points into a buffer borrowed above
    let ret = unsafe {
        match offset {
            Some(off) => libc::preadv(fd, iov.as_ptr(), iovcnt, off),
            None => libc::readv(fd, iov.as_ptr(), iovcnt),
        }
    };
    let ret = Errno::result(ret)?;

    let mut left = ret as usize;
    for g in guards.iter_mut() {
        let n = left.min(g.max_len());
        g.set_len(n);
        left -= n;
    }
    Ok(ret)
}

fn writev(fd: c_int, t: &Table, iovcnt: c_int, offset: Option<libc::off_t>) -> LuabResult<isize> {
    let handles = check_iov(t, iovcnt, "writev")?;
    let mut guards = borrow_all(&handles)?;
    let iov = guards
        .iter_mut()
        .map(|g| {
            let n = g.len();
            g.to_iovec(n)
        })
        .collect::<Result<Vec<_>, Errno>>()?;
    // SAFETY: every iovec points into a buffer borrowed above
    let ret = unsafe {
        match offset {
            Some(off) => libc::pwritev(fd, iov.as_ptr(), iovcnt, off),
            None => libc::writev(fd, iov.as_ptr(), iovcnt),
        }
    };
    Ok(Errno::result(ret)?)
}

/// Register `sys/uio` functions
pub fn register_uio_module(lua: &Lua) -> mlua::Result<Table> {
    let uio = lua.create_table()?;

    // uio.readv(fd, iov, iovcnt) -> bytes read
    uio.set(
        "readv",
        sys_function(lua, |_, (fd, t, iovcnt): (c_int, Table, c_int)| {
            readv(fd, &t, iovcnt, None)
        })?,
    )?;

    // uio.writev(fd, iov, iovcnt) -> bytes written
    uio.set(
        "writev",
        sys_function(lua, |_, (fd, t, iovcnt): (c_int, Table, c_int)| {
            writev(fd, &t, iovcnt, None)
        })?,
    )?;

    // uio.preadv(fd, iov, iovcnt, offset) -> bytes read
    uio.set(
        "preadv",
        sys_function(
            lua,
            |_, (fd, t, iovcnt, off): (c_int, Table, c_int, libc::off_t)| {
                readv(fd, &t, iovcnt, Some(off))
            },
        )?,
    )?;

    // uio.pwritev(fd, iov, iovcnt, offset) -> bytes written
    uio.set(
        "pwritev",
        sys_function(
            lua,
            |_, (fd, t, iovcnt, off): (c_int, Table, c_int, libc::off_t)| {
                writev(fd, &t, iovcnt, Some(off))
            },
        )?,
    )?;

    Ok(uio)
}
