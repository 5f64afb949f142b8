//! `struct __sbuf`, the stdio buffer descriptor

use crate::core::{add_module_methods, Module, ModuleInfo};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::os::raw::c_int;

/// Layout of the C struct, used for sizing only.
#[allow(dead_code)]
#[repr(C)]
struct RawSbuf {
    _base: *mut u8,
    _size: c_int,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SbufData {
    pub base: Vec<u8>,
    pub size: c_int,
}

/// `struct __sbuf`
#[derive(Debug, Clone, Default)]
pub struct Sbuf {
    sb: SbufData,
}

impl Module for Sbuf {
    type Payload = SbufData;

    const INFO: ModuleInfo = ModuleInfo::new::<RawSbuf>(0x2d40_1f0c, "__SBUF*");

    fn payload(&self) -> &SbufData {
        &self.sb
    }

    fn payload_mut(&mut self) -> &mut SbufData {
        &mut self.sb
    }

    fn to_table(lua: &Lua, payload: &SbufData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("_base", lua.create_string(&payload.base)?)?;
        t.set("_size", payload.size)?;
        Ok(t)
    }
}

impl UserData for Sbuf {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_base", |_, this, value: Value| {
            let Value::String(s) = &value else {
                return Err(arg_error(
                    "set_base",
                    2,
                    format!("string expected, got {}", value.type_name()),
                ));
            };
            let base = s.as_bytes().to_vec();
            this.sb.size = c_int::try_from(base.len())
                .map_err(|_| arg_error("set_base", 2, "string too long"))?;
            this.sb.base = base;
            Ok(value)
        });

        methods.add_method("get_base", |lua, this, ()| lua.create_string(&this.sb.base));
        methods.add_method("get_size", |_, this, ()| Ok(this.sb.size));
    }
}
