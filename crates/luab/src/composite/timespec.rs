//! `struct timespec`

use crate::core::{add_module_methods, Module, ModuleInfo, Scalar};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::mem;
use std::os::raw::c_long;

const NSEC_PER_SEC: c_long = 1_000_000_000;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimespecData {
    pub tv_sec: libc::time_t,
    pub tv_nsec: c_long,
}

impl From<TimespecData> for libc::timespec {
    fn from(ts: TimespecData) -> Self {
        // SAFETY: timespec is plain old data, all-zero is a valid value.
        let mut raw: libc::timespec = unsafe { mem::zeroed() };
        raw.tv_sec = ts.tv_sec;
        raw.tv_nsec = ts.tv_nsec as _;
        raw
    }
}

impl From<libc::timespec> for TimespecData {
    fn from(raw: libc::timespec) -> Self {
        Self {
            tv_sec: raw.tv_sec,
            tv_nsec: raw.tv_nsec as c_long,
        }
    }
}

/// `struct timespec`
#[derive(Debug, Clone, Copy, Default)]
pub struct Timespec {
    ts: TimespecData,
}

impl Module for Timespec {
    type Payload = TimespecData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::timespec>(0x2d40_1f01, "TIMESPEC*");

    fn payload(&self) -> &TimespecData {
        &self.ts
    }

    fn payload_mut(&mut self) -> &mut TimespecData {
        &mut self.ts
    }

    fn to_table(lua: &Lua, payload: &TimespecData) -> mlua::Result<Table> {
        scalar_table!(lua, payload, tv_sec, tv_nsec)
    }
}

impl UserData for Timespec {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, tv_sec: libc::time_t);

        methods.add_method_mut("set_tv_nsec", |_, this, value: Value| {
            let nsec = c_long::check(&value, "set_tv_nsec", 2)?;
            if !(0..NSEC_PER_SEC).contains(&nsec) {
                return Err(arg_error("set_tv_nsec", 2, "tv_nsec out of range"));
            }
            this.ts.tv_nsec = nsec;
            Ok(nsec)
        });

        methods.add_method("get_tv_nsec", |_, this, ()| Ok(this.ts.tv_nsec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals()
            .set("ts", Timespec::create(&lua, None).unwrap())
            .unwrap();
        lua
    }

    #[test]
    fn test_fields_are_isolated() {
        let lua = create_lua();
        let (sec, nsec): (i64, i64) = lua
            .load(
                r#"
                ts:set_tv_sec(10)
                ts:set_tv_nsec(500)
                ts:set_tv_sec(11)
                return ts:get_tv_sec(), ts:get_tv_nsec()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((sec, nsec), (11, 500));
    }

    #[test]
    fn test_nsec_bounds() {
        let lua = create_lua();
        assert!(lua.load("ts:set_tv_nsec(999999999)").exec().is_ok());
        assert!(lua.load("ts:set_tv_nsec(1000000000)").exec().is_err());
        assert!(lua.load("ts:set_tv_nsec(-1)").exec().is_err());
    }

    #[test]
    fn test_get_table() {
        let lua = create_lua();
        let t: Table = lua
            .load("ts:set_tv_sec(3); ts:set_tv_nsec(4); return ts:get_table()")
            .eval()
            .unwrap();
        assert_eq!(t.get::<i64>("tv_sec").unwrap(), 3);
        assert_eq!(t.get::<i64>("tv_nsec").unwrap(), 4);
    }

    #[test]
    fn test_libc_conversion() {
        let ts = TimespecData {
            tv_sec: 5,
            tv_nsec: 6,
        };
        let raw = libc::timespec::from(ts);
        assert_eq!(TimespecData::from(raw), ts);
    }
}
