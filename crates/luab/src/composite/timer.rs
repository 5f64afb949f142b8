//! `timer_t`, an opaque POSIX timer handle
//!
//! Created by `bsd.time.timer_create`; the handle is only a value and does
//! not delete the timer when collected.

use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{LightUserData, Lua, Table, UserData, UserDataMethods, Value};
use std::ffi::c_void;

/// `timer_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer {
    id: usize,
}

impl Timer {
    pub fn as_raw(&self) -> libc::timer_t {
        self.id as libc::timer_t
    }
}

fn light(id: usize) -> Value {
    Value::LightUserData(LightUserData(id as *mut c_void))
}

impl Module for Timer {
    type Payload = usize;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::timer_t>(0x2d40_1f0f, "TIMER*");

    fn payload(&self) -> &usize {
        &self.id
    }

    fn payload_mut(&mut self) -> &mut usize {
        &mut self.id
    }

    fn to_table(lua: &Lua, payload: &usize) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("value", light(*payload))?;
        Ok(t)
    }
}

impl UserData for Timer {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        methods.add_method("get_value", |_, this, ()| Ok(light(this.id)));
    }
}
