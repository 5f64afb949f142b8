//! `caddr_t`, a byte string owned by the binding

use crate::core::{add_module_methods, Module, ModuleInfo};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};

/// `caddr_t`
#[derive(Debug, Clone, Default)]
pub struct LuabString {
    buf: Vec<u8>,
}

impl Module for LuabString {
    type Payload = Vec<u8>;

    const INFO: ModuleInfo = ModuleInfo::new::<*mut libc::c_char>(0x2d40_1f0e, "CADDR*");

    fn payload(&self) -> &Vec<u8> {
        &self.buf
    }

    fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    fn to_table(lua: &Lua, payload: &Vec<u8>) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("value", lua.create_string(payload)?)?;
        t.set("len", payload.len())?;
        Ok(t)
    }

    fn check_element(value: &Value, fname: &str, narg: usize) -> mlua::Result<Vec<u8>> {
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::UserData(_) => Self::get(value, fname, narg),
            other => Err(arg_error(
                fname,
                narg,
                format!("string expected, got {}", other.type_name()),
            )),
        }
    }

    fn push_element(lua: &Lua, payload: Vec<u8>) -> mlua::Result<Value> {
        Ok(Value::String(lua.create_string(payload)?))
    }
}

impl UserData for LuabString {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_value", |_, this, value: Value| {
            this.buf = Self::check_element(&value, "set_value", 2)?;
            Ok(value)
        });

        methods.add_method("get_value", |lua, this, ()| lua.create_string(&this.buf));
        methods.add_method("get_len", |_, this, ()| Ok(this.buf.len()));
    }
}
