//! `<grp.h>`, exported as `bsd.grp`
//!
//! Lookups go through the reentrant `getgr*_r(3)` calls and copy the record
//! into a `GROUP*` userdata. An unknown group yields `nil`.

use super::{path_cstring, sys_function};
use crate::atomic::Gid;
use crate::composite::{Group, GroupData};
use crate::core::Module;
use crate::error::LuabResult;
use mlua::{AnyUserData, Lua, Table, Value};
use nix::errno::Errno;
use std::mem::MaybeUninit;
use std::os::raw::{c_char, c_int};
use std::ptr;

const INITIAL_BUFSIZE: usize = 1024;
const MAX_BUFSIZE: usize = 1 << 20;

/// Run a `getgr*_r` call, growing the scratch buffer while it reports `ERANGE`.
fn lookup<F>(mut call: F) -> Result<Option<GroupData>, Errno>
where
    F: FnMut(*mut libc::group, *mut c_char, usize, *mut *mut libc::group) -> c_int,
{
    let mut buf: Vec<c_char> = vec![0; INITIAL_BUFSIZE];
    loop {
        let mut grp = MaybeUninit::<libc::group>::zeroed();
        let mut result: *mut libc::group = ptr::null_mut();
        let rc = call(grp.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &mut result);
        match rc {
            0 if result.is_null() => return Ok(None),
            // SAFETY: on success `result` points at `grp`, whose strings live in `buf`.
            0 => return Ok(Some(unsafe { GroupData::from_raw(result) })),
            libc::ERANGE if buf.len() < MAX_BUFSIZE => buf.resize(buf.len() * 2, 0),
            rc => return Err(Errno::from_raw(rc)),
        }
    }
}

fn push_group(lua: &Lua, grp: Option<GroupData>) -> LuabResult<Option<AnyUserData>> {
    Ok(grp.map(|g| Group::create(lua, Some(g))).transpose()?)
}

/// Register `grp` functions
pub fn register_grp_module(lua: &Lua) -> mlua::Result<Table> {
    let grp = lua.create_table()?;

    // grp.getgrgid(gid) -> GROUP* | nil
    grp.set(
        "getgrgid",
        sys_function(lua, |lua, gid: Value| {
            let gid = Gid::check_element(&gid, "getgrgid", 1)?;
            let found = lookup(|g, buf, len, res| {
                // SAFETY: all pointers are valid for the duration of the call.
                unsafe { libc::getgrgid_r(gid, g, buf, len, res) }
            })?;
            push_group(lua, found)
        })?,
    )?;

    // grp.getgrnam(name) -> GROUP* | nil
    grp.set(
        "getgrnam",
        sys_function(lua, |lua, name: mlua::String| {
            let name = path_cstring(&name)?;
            let found = lookup(|g, buf, len, res| {
                // SAFETY: all pointers are valid for the duration of the call.
                unsafe { libc::getgrnam_r(name.as_ptr(), g, buf, len, res) }
            })?;
            push_group(lua, found)
        })?,
    )?;

    Ok(grp)
}
