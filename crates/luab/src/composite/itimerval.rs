//! `struct itimerval`, two embedded `timeval`s
//!
//! The embedded values are copied in and out as `TIMEVAL*` userdata; the
//! returned objects do not alias the itimerval.

use super::timeval::{Timeval, TimevalData};
use crate::core::{add_module_methods, Module, ModuleInfo};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::mem;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItimervalData {
    pub it_interval: TimevalData,
    pub it_value: TimevalData,
}

impl From<ItimervalData> for libc::itimerval {
    fn from(itv: ItimervalData) -> Self {
        // SAFETY: itimerval is plain old data, all-zero is a valid value.
        let mut raw: libc::itimerval = unsafe { mem::zeroed() };
        raw.it_interval = itv.it_interval.into();
        raw.it_value = itv.it_value.into();
        raw
    }
}

impl From<libc::itimerval> for ItimervalData {
    fn from(raw: libc::itimerval) -> Self {
        Self {
            it_interval: raw.it_interval.into(),
            it_value: raw.it_value.into(),
        }
    }
}

/// `struct itimerval`
#[derive(Debug, Clone, Copy, Default)]
pub struct Itimerval {
    itv: ItimervalData,
}

impl Module for Itimerval {
    type Payload = ItimervalData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::itimerval>(0x2d40_1f03, "ITIMERVAL*");

    fn payload(&self) -> &ItimervalData {
        &self.itv
    }

    fn payload_mut(&mut self) -> &mut ItimervalData {
        &mut self.itv
    }

    fn to_table(lua: &Lua, payload: &ItimervalData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("it_interval", Timeval::create(lua, Some(payload.it_interval))?)?;
        t.set("it_value", Timeval::create(lua, Some(payload.it_value))?)?;
        Ok(t)
    }
}

impl UserData for Itimerval {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_it_interval", |_, this, tv: Value| {
            this.itv.it_interval = Timeval::get(&tv, "set_it_interval", 2)?;
            Ok(tv)
        });

        methods.add_method("get_it_interval", |lua, this, ()| {
            Timeval::create(lua, Some(this.itv.it_interval))
        });

        methods.add_method_mut("set_it_value", |_, this, tv: Value| {
            this.itv.it_value = Timeval::get(&tv, "set_it_value", 2)?;
            Ok(tv)
        });

        methods.add_method("get_it_value", |lua, this, ()| {
            Timeval::create(lua, Some(this.itv.it_value))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;

    #[test]
    fn test_embedded_timevals_are_copies() {
        let lua = Lua::new();
        let ns = lua.create_table().unwrap();
        install_constructor::<Timeval>(&lua, &ns, "create_timeval").unwrap();
        install_constructor::<Itimerval>(&lua, &ns, "create_itimerval").unwrap();
        lua.globals().set("c", ns).unwrap();

        let (interval, value): (i64, i64) = lua
            .load(
                r#"
                local itv = c.create_itimerval()
                local tv = c.create_timeval()
                tv:set_tv_sec(5)
                itv:set_it_interval(tv)
                tv:set_tv_sec(7)
                itv:set_it_value(tv)
                tv:set_tv_sec(9)
                return itv:get_it_interval():get_tv_sec(), itv:get_it_value():get_tv_sec()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((interval, value), (5, 7));
    }

    #[test]
    fn test_get_table_nests_timeval_userdata() {
        let lua = Lua::new();
        let itv = Itimerval::create(&lua, None).unwrap();
        lua.globals().set("itv", itv).unwrap();
        let t: Table = lua.load("return itv:get_table()").eval().unwrap();
        let v: Value = t.get("it_value").unwrap();
        assert!(matches!(v, Value::UserData(ref ud) if ud.is::<Timeval>()));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let lua = Lua::new();
        let itv = Itimerval::create(&lua, None).unwrap();
        lua.globals().set("itv", itv).unwrap();
        assert!(lua.load("itv:set_it_value(1)").exec().is_err());
    }

    #[test]
    fn test_setters_leave_other_timeval() {
        let lua = Lua::new();
        let ns = lua.create_table().unwrap();
        install_constructor::<Timeval>(&lua, &ns, "create_timeval").unwrap();
        install_constructor::<Itimerval>(&lua, &ns, "create_itimerval").unwrap();
        lua.globals().set("c", ns).unwrap();

        let (isec, iusec, vsec): (i64, i64, i64) = lua
            .load(
                r#"
                local itv = c.create_itimerval()
                local tv = c.create_timeval()
                tv:set_tv_sec(1); tv:set_tv_usec(250)
                itv:set_it_interval(tv)
                tv:set_tv_sec(2); tv:set_tv_usec(0)
                itv:set_it_value(tv)
                tv:set_tv_sec(3)
                itv:set_it_value(tv)
                local i = itv:get_it_interval()
                return i:get_tv_sec(), i:get_tv_usec(), itv:get_it_value():get_tv_sec()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((isec, iusec, vsec), (1, 250, 3));
    }
}
