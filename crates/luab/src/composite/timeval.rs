//! `struct timeval`

use crate::core::{add_module_methods, Module, ModuleInfo, Scalar};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::mem;

const USEC_PER_SEC: libc::suseconds_t = 1_000_000;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimevalData {
    pub tv_sec: libc::time_t,
    pub tv_usec: libc::suseconds_t,
}

impl From<TimevalData> for libc::timeval {
    fn from(tv: TimevalData) -> Self {
        // SAFETY: timeval is plain old data, all-zero is a valid value.
        let mut raw: libc::timeval = unsafe { mem::zeroed() };
        raw.tv_sec = tv.tv_sec;
        raw.tv_usec = tv.tv_usec;
        raw
    }
}

impl From<libc::timeval> for TimevalData {
    fn from(raw: libc::timeval) -> Self {
        Self {
            tv_sec: raw.tv_sec,
            tv_usec: raw.tv_usec,
        }
    }
}

/// `struct timeval`
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeval {
    tv: TimevalData,
}

impl Module for Timeval {
    type Payload = TimevalData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::timeval>(0x2d40_1f02, "TIMEVAL*");

    fn payload(&self) -> &TimevalData {
        &self.tv
    }

    fn payload_mut(&mut self) -> &mut TimevalData {
        &mut self.tv
    }

    fn to_table(lua: &Lua, payload: &TimevalData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, tv_sec, tv_usec)
    }
}

impl UserData for Timeval {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, tv_sec: libc::time_t);

        methods.add_method_mut("set_tv_usec", |_, this, value: Value| {
            let usec = libc::suseconds_t::check(&value, "set_tv_usec", 2)?;
            if !(0..USEC_PER_SEC).contains(&usec) {
                return Err(arg_error("set_tv_usec", 2, "tv_usec out of range"));
            }
            this.tv.tv_usec = usec;
            Ok(usec.into_value())
        });

        methods.add_method("get_tv_usec", |_, this, ()| Ok(this.tv.tv_usec.into_value()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_bounds() {
        let lua = Lua::new();
        lua.globals()
            .set("tv", Timeval::create(&lua, None).unwrap())
            .unwrap();
        let (sec, usec): (i64, i64) = lua
            .load("tv:set_tv_usec(250000); tv:set_tv_sec(-2); return tv:get_tv_sec(), tv:get_tv_usec()")
            .eval()
            .unwrap();
        assert_eq!((sec, usec), (-2, 250000));
        assert!(lua.load("tv:set_tv_usec(1000000)").exec().is_err());
    }
}
