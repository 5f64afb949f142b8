//! `struct crypt_data` for `crypt_r(3)`

use super::{cstr_bytes, set_cstr};
use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::os::raw::c_int;

const CRYPT_BUF_LEN: usize = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptDataData {
    pub initialized: c_int,
    pub buf: [u8; CRYPT_BUF_LEN],
}

impl Default for CryptDataData {
    fn default() -> Self {
        Self {
            initialized: 0,
            buf: [0; CRYPT_BUF_LEN],
        }
    }
}

/// `struct crypt_data`
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptData {
    cd: CryptDataData,
}

impl Module for CryptData {
    type Payload = CryptDataData;

    const INFO: ModuleInfo = ModuleInfo::new::<CryptDataData>(0x2d40_1f0b, "CRYPT_DATA*");

    fn payload(&self) -> &CryptDataData {
        &self.cd
    }

    fn payload_mut(&mut self) -> &mut CryptDataData {
        &mut self.cd
    }

    fn to_table(lua: &Lua, payload: &CryptDataData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("initialized", payload.initialized)?;
        t.set("buf", lua.create_string(cstr_bytes(&payload.buf))?)?;
        Ok(t)
    }
}

impl UserData for CryptData {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, initialized: c_int);

        methods.add_method_mut("set_buf", |_, this, value: Value| {
            set_cstr(&mut this.cd.buf, &value, "set_buf")
        });
        methods.add_method("get_buf", |lua, this, ()| {
            lua.create_string(cstr_bytes(&this.cd.buf))
        });
    }
}
