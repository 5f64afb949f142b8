//! `locale_t` binding
//!
//! A locale is an opaque pointer. Lua sees it as light userdata, the boxed
//! value keeps the address only; it never frees the locale it refers to.

use crate::core::{add_module_methods, Module, ModuleInfo};
use crate::error::arg_error;
use mlua::{LightUserData, Lua, Table, UserData, UserDataMethods, Value};
use std::ffi::c_void;

/// `locale_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Locale {
    addr: usize,
}

impl Locale {
    pub fn as_ptr(&self) -> *mut c_void {
        self.addr as *mut c_void
    }
}

fn to_light(addr: usize) -> Value {
    if addr == 0 {
        Value::Nil
    } else {
        Value::LightUserData(LightUserData(addr as *mut c_void))
    }
}

fn check_light(value: &Value, fname: &str, narg: usize) -> mlua::Result<usize> {
    match value {
        Value::Nil => Ok(0),
        Value::LightUserData(ptr) => Ok(ptr.0 as usize),
        other => Err(arg_error(
            fname,
            narg,
            format!("light userdata expected, got {}", other.type_name()),
        )),
    }
}

impl Module for Locale {
    type Payload = usize;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::locale_t>(0x1cf1_ae13, "LOCALE*");

    fn payload(&self) -> &usize {
        &self.addr
    }

    fn payload_mut(&mut self) -> &mut usize {
        &mut self.addr
    }

    fn to_table(lua: &Lua, payload: &usize) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("value", to_light(*payload))?;
        Ok(t)
    }

    fn check_element(value: &Value, fname: &str, narg: usize) -> mlua::Result<usize> {
        match value {
            Value::UserData(_) => Self::get(value, fname, narg),
            _ => check_light(value, fname, narg),
        }
    }

    fn push_element(_lua: &Lua, payload: usize) -> mlua::Result<Value> {
        Ok(to_light(payload))
    }
}

impl UserData for Locale {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_value", |_, this, value: Value| {
            this.addr = check_light(&value, "set_value", 2)?;
            Ok(to_light(this.addr))
        });

        methods.add_method("get_value", |_, this, ()| Ok(to_light(this.addr)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_locale_is_nil() {
        let lua = Lua::new();
        lua.globals()
            .set("loc", Locale::create(&lua, None).unwrap())
            .unwrap();
        let v: Value = lua.load("return loc:get_value()").eval().unwrap();
        assert!(v.is_nil());
    }

    #[test]
    fn test_light_userdata_round_trip() {
        let lua = Lua::new();
        let mut marker = 0u8;
        let ptr = LightUserData(&mut marker as *mut u8 as *mut c_void);
        lua.globals()
            .set("loc", Locale::create(&lua, None).unwrap())
            .unwrap();
        lua.globals().set("ptr", ptr).unwrap();
        let same: bool = lua
            .load("loc:set_value(ptr); return loc:get_value() == ptr")
            .eval()
            .unwrap();
        assert!(same);
    }

    #[test]
    fn test_rejects_numbers() {
        let lua = Lua::new();
        lua.globals()
            .set("loc", Locale::create(&lua, None).unwrap())
            .unwrap();
        assert!(lua.load("loc:set_value(42)").exec().is_err());
    }
}
