//! `struct accept_filter_arg` for `SO_ACCEPTFILTER`

use super::{cstr_bytes, set_cstr};
use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};

const AF_NAME_LEN: usize = 16;
const AF_ARG_LEN: usize = 256 - AF_NAME_LEN;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptFilterArgData {
    pub af_name: [u8; AF_NAME_LEN],
    pub af_arg: [u8; AF_ARG_LEN],
}

impl Default for AcceptFilterArgData {
    fn default() -> Self {
        Self {
            af_name: [0; AF_NAME_LEN],
            af_arg: [0; AF_ARG_LEN],
        }
    }
}

/// `struct accept_filter_arg`
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptFilterArg {
    afa: AcceptFilterArgData,
}

impl Module for AcceptFilterArg {
    type Payload = AcceptFilterArgData;

    const INFO: ModuleInfo =
        ModuleInfo::new::<AcceptFilterArgData>(0x2d40_1f0a, "ACCEPT_FILTER_ARG*");

    fn payload(&self) -> &AcceptFilterArgData {
        &self.afa
    }

    fn payload_mut(&mut self) -> &mut AcceptFilterArgData {
        &mut self.afa
    }

    fn to_table(lua: &Lua, payload: &AcceptFilterArgData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("af_name", lua.create_string(cstr_bytes(&payload.af_name))?)?;
        t.set("af_arg", lua.create_string(cstr_bytes(&payload.af_arg))?)?;
        Ok(t)
    }
}

impl UserData for AcceptFilterArg {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_af_name", |_, this, value: Value| {
            set_cstr(&mut this.afa.af_name, &value, "set_af_name")
        });
        methods.add_method("get_af_name", |lua, this, ()| {
            lua.create_string(cstr_bytes(&this.afa.af_name))
        });

        methods.add_method_mut("set_af_arg", |_, this, value: Value| {
            set_cstr(&mut this.afa.af_arg, &value, "set_af_arg")
        });
        methods.add_method("get_af_arg", |lua, this, ()| {
            lua.create_string(cstr_bytes(&this.afa.af_arg))
        });
    }
}
