//! `<sys/time.h>`, exported as `bsd.sys.time`
//!
//! `setitimer(ITIMER_REAL, itv, fn)` registers `fn` with the signal bridge;
//! it runs on the Lua thread once the timer fires.

use super::{libc_constants, signal, sys_function};
use crate::composite::{Itimerval, ItimervalData, Timeval};
use crate::core::{check_udata, Module};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{AnyUserData, Function, Lua, Table, Value, Variadic};
use nix::errno::Errno;
use std::mem::MaybeUninit;
use std::os::raw::c_int;
use std::ptr;

fn gettimeofday(tv: &AnyUserData) -> LuabResult<c_int> {
    let mut raw = MaybeUninit::<libc::timeval>::uninit();
    // SAFETY: raw is only read after a successful call; no timezone
    Errno::result(unsafe { libc::gettimeofday(raw.as_mut_ptr(), ptr::null_mut()) })?;
    // SAFETY: the call succeeded
    *tv.borrow_mut::<Timeval>()?.payload_mut() = unsafe { raw.assume_init() }.into();
    Ok(0)
}

fn getitimer(which: c_int) -> Result<ItimervalData, Errno> {
    let mut raw = MaybeUninit::<libc::itimerval>::uninit();
    // SAFETY: raw is only read after a successful call
    Errno::result(unsafe { libc::getitimer(which as _, raw.as_mut_ptr()) })?;
    // SAFETY: the call succeeded
    Ok(unsafe { raw.assume_init() }.into())
}

/// Optional trailing arguments of `setitimer`: an `ITIMERVAL*` for the old
/// value and/or a callback.
fn split_setitimer_args(
    rest: Variadic<Value>,
) -> mlua::Result<(Option<AnyUserData>, Option<Function>)> {
    let mut ovalue = None;
    let mut callback = None;
    for (i, value) in rest.into_iter().enumerate() {
        let narg = i + 3;
        match value {
            Value::Nil => {}
            Value::Function(f) => callback = Some(f),
            v => ovalue = Some(check_udata::<Itimerval>(&v, "setitimer", narg)?),
        }
    }
    Ok((ovalue, callback))
}

fn setitimer(lua: &Lua, which: c_int, itv: &Value, rest: Variadic<Value>) -> LuabResult<c_int> {
    let new = Itimerval::get(itv, "setitimer", 2)?;
    let (ovalue, callback) = split_setitimer_args(rest)?;
    let arming = new.it_value != Default::default();

    let callback = match callback {
        Some(_) if which != libc::ITIMER_REAL => return Err(Errno::EINVAL.into()),
        Some(callback) if arming => {
            signal::prepare()?;
            Some(callback)
        }
        _ => None,
    };

    let raw = libc::itimerval::from(new);
    let mut old = MaybeUninit::<libc::itimerval>::uninit();
    // SAFETY: raw is a valid itimerval; old is only read after success
    Errno::result(unsafe { libc::setitimer(which as _, &raw, old.as_mut_ptr()) })?;

    match callback {
        Some(callback) => signal::arm(lua, callback)?,
        None if which == libc::ITIMER_REAL => signal::disarm(lua)?,
        None => {}
    }
    if let Some(ud) = ovalue {
        // SAFETY: the call succeeded
        *ud.borrow_mut::<Itimerval>()?.payload_mut() = unsafe { old.assume_init() }.into();
    }
    Ok(0)
}

/// Register `sys/time` functions and constants
pub fn register_sys_time_module(lua: &Lua) -> mlua::Result<Table> {
    let sys_time = lua.create_table()?;

    // sys.time.gettimeofday(tv) -> 0
    sys_time.set(
        "gettimeofday",
        sys_function(lua, |_, tv: Value| {
            let tv = check_udata::<Timeval>(&tv, "gettimeofday", 1)?;
            gettimeofday(&tv)
        })?,
    )?;

    // sys.time.getitimer(which, itv) -> 0
    sys_time.set(
        "getitimer",
        sys_function(lua, |_, (which, itv): (c_int, Value)| {
            let itv = check_udata::<Itimerval>(&itv, "getitimer", 2)?;
            let data = getitimer(which)?;
            *itv.borrow_mut::<Itimerval>()?.payload_mut() = data;
            Ok(0)
        })?,
    )?;

    // sys.time.setitimer(which, itv[, ovalue][, fn]) -> 0
    sys_time.set(
        "setitimer",
        sys_function(
            lua,
            |lua, (which, itv, rest): (c_int, Value, Variadic<Value>)| {
                setitimer(lua, which, &itv, rest)
            },
        )?,
    )?;

    set_constants(&sys_time, libc_constants![ITIMER_REAL, ITIMER_VIRTUAL, ITIMER_PROF])?;

    Ok(sys_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;
    use serial_test::serial;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals()
            .set("systime", register_sys_time_module(&lua).unwrap())
            .unwrap();
        let ns = lua.create_table().unwrap();
        install_constructor::<Timeval>(&lua, &ns, "create_timeval").unwrap();
        install_constructor::<Itimerval>(&lua, &ns, "create_itimerval").unwrap();
        lua.globals().set("c", ns).unwrap();
        lua
    }

    #[test]
    fn test_gettimeofday() {
        let lua = create_lua();
        let (sec, usec): (i64, i64) = lua
            .load(
                r#"
                local tv = c.create_timeval()
                assert(systime.gettimeofday(tv) == 0)
                return tv:get_tv_sec(), tv:get_tv_usec()
                "#,
            )
            .eval()
            .unwrap();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        assert!((now - sec).abs() <= 1);
        assert!((0..1_000_000).contains(&usec));
    }

    #[test]
    #[serial]
    fn test_failed_setitimer_leaves_callback_unarmed() {
        let lua = create_lua();
        let errno: i32 = lua
            .load(
                r#"
                local tv = c.create_timeval()
                tv:set_tv_sec(-1)
                local itv = c.create_itimerval()
                itv:set_it_value(tv)
                local _, e = systime.setitimer(systime.ITIMER_REAL, itv, function() end)
                return e
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(errno, libc::EINVAL);
        assert!(!signal::is_armed(&lua));
    }

    #[test]
    fn test_invalid_which_is_einval() {
        let lua = create_lua();
        let errno: i32 = lua
            .load("local _, e = systime.getitimer(-1, c.create_itimerval()); return e")
            .eval()
            .unwrap();
        assert_eq!(errno, libc::EINVAL);
    }

    #[test]
    #[serial]
    fn test_setitimer_callback_runs_on_lua_thread() {
        let lua = create_lua();
        let (fired, remaining): (bool, i64) = lua
            .load(
                r#"
                local fired = false
                local tv = c.create_timeval()
                tv:set_tv_usec(20000)
                local itv = c.create_itimerval()
                itv:set_it_value(tv)
                local old = c.create_itimerval()
                assert(systime.setitimer(systime.ITIMER_REAL, itv, old, function()
                    fired = true
                end) == 0)
                local deadline = os.clock() + 5
                while not fired and os.clock() < deadline do end
                local now = c.create_itimerval()
                systime.getitimer(systime.ITIMER_REAL, now)
                return fired, now:get_it_value():get_tv_usec()
                "#,
            )
            .eval()
            .unwrap();
        assert!(fired);
        assert_eq!(remaining, 0);
    }

    #[test]
    #[serial]
    fn test_callback_rejected_for_other_timers() {
        let lua = create_lua();
        let errno: i32 = lua
            .load(
                r#"
                local _, e = systime.setitimer(systime.ITIMER_PROF, c.create_itimerval(), function() end)
                return e
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(errno, libc::EINVAL);
    }
}
