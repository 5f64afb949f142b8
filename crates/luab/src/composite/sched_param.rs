//! `struct sched_param`

use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods};
use std::os::raw::c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedParamData {
    pub sched_priority: c_int,
}

impl From<SchedParamData> for libc::sched_param {
    fn from(sp: SchedParamData) -> Self {
        // SAFETY: sched_param is plain old data, all-zero is a valid value.
        let mut raw: libc::sched_param = unsafe { std::mem::zeroed() };
        raw.sched_priority = sp.sched_priority;
        raw
    }
}

/// `struct sched_param`
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedParam {
    sp: SchedParamData,
}

impl Module for SchedParam {
    type Payload = SchedParamData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::sched_param>(0x2d40_1f05, "SCHED_PARAM*");

    fn payload(&self) -> &SchedParamData {
        &self.sp
    }

    fn payload_mut(&mut self) -> &mut SchedParamData {
        &mut self.sp
    }

    fn to_table(lua: &Lua, payload: &SchedParamData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, sched_priority)
    }
}

impl UserData for SchedParam {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, sched_priority: c_int);
    }
}
