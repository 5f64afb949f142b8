//! `struct sf_hdtr`, the header and trailer vectors of `sendfile(2)`
//!
//! The container shares each attached iovec and holds its `IOV_LOCK` bit
//! until the vector is replaced or the container is collected.

use super::iovec::{Iovec, IovecHandle};
use crate::core::{add_module_methods, LuabTable, Module, ModuleInfo};
use crate::error::{arg_error, sysret, LuabResult};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use nix::errno::Errno;
use std::os::raw::c_int;

/// Layout of the C struct, used for sizing only.
#[allow(dead_code)]
#[repr(C)]
struct RawSfHdtr {
    headers: *mut libc::iovec,
    hdr_cnt: c_int,
    trailers: *mut libc::iovec,
    trl_cnt: c_int,
}

#[derive(Debug, Clone, Default)]
pub struct SfHdtrData {
    pub headers: Vec<IovecHandle>,
    pub trailers: Vec<IovecHandle>,
}

/// Claim every handle, or none of them.
fn claim_all(handles: &[IovecHandle]) -> Result<(), Errno> {
    for (i, iov) in handles.iter().enumerate() {
        if let Err(e) = iov.claim() {
            handles[..i].iter().for_each(IovecHandle::release);
            return Err(e);
        }
    }
    Ok(())
}

/// Swap the vector in `slot` for the iovecs of `t`.
fn attach(slot: &mut Vec<IovecHandle>, t: &Table, fname: &str) -> LuabResult<usize> {
    let new = Iovec::check_table(t, None, fname, 2)?.into_vec();
    slot.iter().for_each(IovecHandle::release);
    if let Err(e) = claim_all(&new) {
        // the old vector was ours a moment ago, it cannot be contended
        let _ = claim_all(slot);
        return Err(e.into());
    }
    *slot = new;
    Ok(slot.len())
}

/// `struct sf_hdtr`
#[derive(Debug, Default)]
pub struct SfHdtr {
    hdtr: SfHdtrData,
}

impl Drop for SfHdtr {
    fn drop(&mut self) {
        self.hdtr
            .headers
            .iter()
            .chain(&self.hdtr.trailers)
            .for_each(IovecHandle::release);
    }
}

impl Module for SfHdtr {
    type Payload = SfHdtrData;

    const INFO: ModuleInfo = ModuleInfo::new::<RawSfHdtr>(0x2d40_1f12, "SF_HDTR*");

    fn payload(&self) -> &SfHdtrData {
        &self.hdtr
    }

    fn payload_mut(&mut self) -> &mut SfHdtrData {
        &mut self.hdtr
    }

    fn to_table(lua: &Lua, payload: &SfHdtrData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("headers", push_iovecs(lua, &payload.headers)?)?;
        t.set("hdr_cnt", payload.headers.len())?;
        t.set("trailers", push_iovecs(lua, &payload.trailers)?)?;
        t.set("trl_cnt", payload.trailers.len())?;
        Ok(t)
    }

    fn check_arg(_lua: &Lua, _value: &Value, fname: &str) -> mlua::Result<SfHdtrData> {
        Err(arg_error(fname, 1, "SF_HDTR* cannot be copied"))
    }
}

fn push_iovecs(lua: &Lua, handles: &[IovecHandle]) -> mlua::Result<Table> {
    Iovec::push_table(lua, &LuabTable::new(handles.to_vec()), None)
}

impl UserData for SfHdtr {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_headers", |_, this, t: Table| {
            sysret(attach(&mut this.hdtr.headers, &t, "set_headers"))
        });
        methods.add_method("get_headers", |lua, this, ()| {
            push_iovecs(lua, &this.hdtr.headers)
        });
        methods.add_method("get_hdr_cnt", |_, this, ()| Ok(this.hdtr.headers.len()));

        methods.add_method_mut("set_trailers", |_, this, t: Table| {
            sysret(attach(&mut this.hdtr.trailers, &t, "set_trailers"))
        });
        methods.add_method("get_trailers", |lua, this, ()| {
            push_iovecs(lua, &this.hdtr.trailers)
        });
        methods.add_method("get_trl_cnt", |_, this, ()| Ok(this.hdtr.trailers.len()));
    }
}
