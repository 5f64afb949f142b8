//! `struct fid`, a file system specific file id

use crate::core::{add_module_methods, check_lstring, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use nix::errno::Errno;
use std::os::raw::c_ushort;

use crate::error::SysRet;

pub const MAXFIDSZ: usize = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FidData {
    pub fid_len: c_ushort,
    pub fid_data0: c_ushort,
    pub fid_data: [u8; MAXFIDSZ],
}

impl FidData {
    /// The first `fid_len` bytes of `fid_data`, clamped to `MAXFIDSZ`.
    pub fn data(&self) -> &[u8] {
        let end = usize::from(self.fid_len).min(MAXFIDSZ);
        &self.fid_data[..end]
    }
}

/// `struct fid`
#[derive(Debug, Clone, Copy, Default)]
pub struct Fid {
    fid: FidData,
}

impl Module for Fid {
    type Payload = FidData;

    const INFO: ModuleInfo = ModuleInfo::new::<FidData>(0x2d40_1f09, "FID*");

    fn payload(&self) -> &FidData {
        &self.fid
    }

    fn payload_mut(&mut self) -> &mut FidData {
        &mut self.fid
    }

    fn to_table(lua: &Lua, payload: &FidData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("fid_len", payload.fid_len)?;
        t.set("fid_data0", payload.fid_data0)?;
        t.set("fid_data", lua.create_string(payload.data())?)?;
        Ok(t)
    }
}

impl UserData for Fid {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, fid_len: c_ushort, fid_data0: c_ushort);

        methods.add_method_mut("set_fid_data", |_, this, value: Value| {
            let res = match check_lstring(&value, MAXFIDSZ, "set_fid_data", 2)? {
                Some(bytes) => {
                    this.fid.fid_data = [0; MAXFIDSZ];
                    this.fid.fid_data[..bytes.len()].copy_from_slice(&bytes);
                    this.fid.fid_len = bytes.len() as c_ushort;
                    Ok(value)
                }
                None => Err(Errno::ERANGE),
            };
            Ok(SysRet::from(res))
        });

        methods.add_method("get_fid_data", |lua, this, ()| {
            lua.create_string(this.fid.data())
        });
    }
}
