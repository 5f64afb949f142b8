//! `div_t` and `lldiv_t`, the results of `div(3)` and `lldiv(3)`

use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods};
use std::os::raw::{c_int, c_longlong};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DivData {
    pub quot: c_int,
    pub rem: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LldivData {
    pub quot: c_longlong,
    pub rem: c_longlong,
}

/// `div_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Div {
    div: DivData,
}

impl Module for Div {
    type Payload = DivData;

    const INFO: ModuleInfo = ModuleInfo::new::<DivData>(0x2d40_1f06, "DIV*");

    fn payload(&self) -> &DivData {
        &self.div
    }

    fn payload_mut(&mut self) -> &mut DivData {
        &mut self.div
    }

    fn to_table(lua: &Lua, payload: &DivData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, quot, rem)
    }
}

impl UserData for Div {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, quot: c_int, rem: c_int);
    }
}

/// `lldiv_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Lldiv {
    div: LldivData,
}

impl Module for Lldiv {
    type Payload = LldivData;

    const INFO: ModuleInfo = ModuleInfo::new::<LldivData>(0x2d40_1f07, "LLDIV*");

    fn payload(&self) -> &LldivData {
        &self.div
    }

    fn payload_mut(&mut self) -> &mut LldivData {
        &mut self.div
    }

    fn to_table(lua: &Lua, payload: &LldivData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, quot, rem)
    }
}

impl UserData for Lldiv {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, quot: c_longlong, rem: c_longlong);
    }
}
