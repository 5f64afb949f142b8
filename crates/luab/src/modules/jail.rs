//! `<sys/jail.h>`, exported as `bsd.sys.jail`
//!
//! Parameters are passed as a flat table of `IOVEC*` name/value pairs, the
//! way `jail_get(2)` and `jail_set(2)` take them. `jail_get` writes the
//! returned value lengths back into the value iovecs.

use super::sys_uio::{borrow_all, borrow_writable, check_iov};
use super::{libc_constants, sys_function};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{Lua, Table};
use nix::errno::Errno;
use std::os::raw::{c_int, c_uint};

fn jail_get(t: &Table, niov: c_int, flags: c_int) -> LuabResult<c_int> {
    let handles = check_iov(t, niov, "jail_get")?;
    let mut guards = borrow_writable(&handles)?;
    let mut iov = guards
        .iter_mut()
        .enumerate()
        .map(|(i, g)| {
            // names carry their length, values offer the whole buffer
            let n = if i % 2 == 0 { g.len() } else { g.max_len() };
            g.to_iovec(n)
        })
        .collect::<Result<Vec<_>, Errno>>()?;
    // SAFETY: every iovec points into a buffer borrowed above
    let jid = unsafe { libc::jail_get(iov.as_mut_ptr(), niov as c_uint, flags) };
    let jid = Errno::result(jid)?;
    for (g, v) in guards.iter_mut().zip(&iov).skip(1).step_by(2) {
        g.set_len(v.iov_len);
    }
    Ok(jid)
}

fn jail_set(t: &Table, niov: c_int, flags: c_int) -> LuabResult<c_int> {
    let handles = check_iov(t, niov, "jail_set")?;
    let mut guards = borrow_all(&handles)?;
    let mut iov = guards
        .iter_mut()
        .map(|g| {
            let n = g.len();
            g.to_iovec(n)
        })
        .collect::<Result<Vec<_>, Errno>>()?;
    // SAFETY: every iovec points into a buffer borrowed above
    let jid = unsafe { libc::jail_set(iov.as_mut_ptr(), niov as c_uint, flags) };
    Ok(Errno::result(jid)?)
}

/// Register `sys/jail` functions and constants
pub fn register_jail_module(lua: &Lua) -> mlua::Result<Table> {
    let jail = lua.create_table()?;

    // jail.jail_get(iov, niov, flags) -> jid
    jail.set(
        "jail_get",
        sys_function(lua, |_, (t, niov, flags): (Table, c_int, c_int)| {
            jail_get(&t, niov, flags)
        })?,
    )?;

    // jail.jail_set(iov, niov, flags) -> jid
    jail.set(
        "jail_set",
        sys_function(lua, |_, (t, niov, flags): (Table, c_int, c_int)| {
            jail_set(&t, niov, flags)
        })?,
    )?;

    // jail.jail_attach(jid) -> 0
    jail.set(
        "jail_attach",
        sys_function(lua, |_, jid: c_int| {
            // SAFETY: plain syscall
            Ok(Errno::result(unsafe { libc::jail_attach(jid) })?)
        })?,
    )?;

    // jail.jail_remove(jid) -> 0
    jail.set(
        "jail_remove",
        sys_function(lua, |_, jid: c_int| {
            // SAFETY: plain syscall
            Ok(Errno::result(unsafe { libc::jail_remove(jid) })?)
        })?,
    )?;

    set_constants(
        &jail,
        libc_constants![
            JAIL_API_VERSION, JAIL_CREATE, JAIL_UPDATE, JAIL_ATTACH, JAIL_DYING,
            JAIL_SET_MASK, JAIL_GET_MASK, JAIL_SYS_DISABLE, JAIL_SYS_NEW, JAIL_SYS_INHERIT,
        ],
    )?;

    Ok(jail)
}
