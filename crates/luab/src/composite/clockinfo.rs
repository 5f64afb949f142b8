//! `struct clockinfo` from `<sys/time.h>`, as reported by `kern.clockrate`

use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods};
use std::os::raw::c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockinfoData {
    pub hz: c_int,
    pub tick: c_int,
    pub spare: c_int,
    pub stathz: c_int,
    pub profhz: c_int,
}

/// `struct clockinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct Clockinfo {
    info: ClockinfoData,
}

impl Module for Clockinfo {
    type Payload = ClockinfoData;

    const INFO: ModuleInfo = ModuleInfo::new::<ClockinfoData>(0x2d40_1f04, "CLOCKINFO*");

    fn payload(&self) -> &ClockinfoData {
        &self.info
    }

    fn payload_mut(&mut self) -> &mut ClockinfoData {
        &mut self.info
    }

    fn to_table(lua: &Lua, payload: &ClockinfoData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, hz, tick, spare, stathz, profhz)
    }
}

impl UserData for Clockinfo {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(
            methods,
            hz: c_int,
            tick: c_int,
            spare: c_int,
            stathz: c_int,
            profhz: c_int,
        );
    }
}
