//! `<time.h>`, exported as `bsd.time`

use super::{libc_constants, sys_function};
use crate::composite::{Timer, Timespec, TimespecData};
use crate::core::{check_opt_udata, check_udata, Module};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{AnyUserData, Lua, Table, Value};
use nix::errno::Errno;
use std::mem::{self, MaybeUninit};
use std::ptr;

extern "C" {
    // not exported by the libc crate
    fn clock() -> libc::clock_t;
}

fn clock_query(
    clock_id: libc::clockid_t,
    ts: &AnyUserData,
    f: unsafe extern "C" fn(libc::clockid_t, *mut libc::timespec) -> libc::c_int,
) -> LuabResult<libc::c_int> {
    let mut raw = MaybeUninit::<libc::timespec>::uninit();
    // SAFETY: raw is only read after a successful call
    Errno::result(unsafe { f(clock_id, raw.as_mut_ptr()) })?;
    let data = TimespecData::from(unsafe { raw.assume_init() });
    *ts.borrow_mut::<Timespec>()?.payload_mut() = data;
    Ok(0)
}

fn nanosleep(rqtp: &Value, rmtp: &Value) -> LuabResult<libc::c_int> {
    let rq = libc::timespec::from(Timespec::get(rqtp, "nanosleep", 1)?);
    let rm_ud = check_opt_udata::<Timespec>(rmtp, "nanosleep", 2)?;
    // SAFETY: timespec is plain old data
    let mut rm: libc::timespec = unsafe { mem::zeroed() };
    // SAFETY: both pointers refer to live locals
    let ret = unsafe { libc::nanosleep(&rq, &mut rm) };
    if let Err(e) = Errno::result(ret) {
        if let (Errno::EINTR, Some(ud)) = (e, rm_ud) {
            *ud.borrow_mut::<Timespec>()?.payload_mut() = rm.into();
        }
        return Err(e.into());
    }
    Ok(0)
}

fn timer_create(lua: &Lua, clock_id: libc::clockid_t) -> LuabResult<AnyUserData> {
    // SAFETY: timer_t is an opaque handle, filled in by the call
    let mut id: libc::timer_t = unsafe { mem::zeroed() };
    // SAFETY: a null sigevent requests the default SIGALRM notification
    Errno::result(unsafe { libc::timer_create(clock_id, ptr::null_mut(), &mut id) })?;
    Ok(Timer::create(lua, Some(id as usize))?)
}

fn timer_delete(timer: &Value) -> LuabResult<libc::c_int> {
    let ud = check_udata::<Timer>(timer, "timer_delete", 1)?;
    let id = ud.borrow::<Timer>()?.as_raw();
    // SAFETY: id came from timer_create
    Ok(Errno::result(unsafe { libc::timer_delete(id) })?)
}

/// Register `time` functions and constants
pub fn register_time_module(lua: &Lua) -> mlua::Result<Table> {
    let time = lua.create_table()?;

    // time.time() -> seconds since the epoch
    time.set(
        "time",
        sys_function(lua, |_, ()| {
            // SAFETY: a null argument is allowed
            Ok(Errno::result(unsafe { libc::time(ptr::null_mut()) })?)
        })?,
    )?;

    // time.clock() -> processor time used
    time.set(
        "clock",
        sys_function(lua, |_, ()| {
            // SAFETY: no arguments
            Ok(Errno::result(unsafe { clock() })?)
        })?,
    )?;

    // time.clock_gettime(id, ts) -> 0
    time.set(
        "clock_gettime",
        sys_function(lua, |_, (id, ts): (libc::clockid_t, Value)| {
            let ts = check_udata::<Timespec>(&ts, "clock_gettime", 2)?;
            clock_query(id, &ts, libc::clock_gettime)
        })?,
    )?;

    // time.clock_getres(id, ts) -> 0
    time.set(
        "clock_getres",
        sys_function(lua, |_, (id, ts): (libc::clockid_t, Value)| {
            let ts = check_udata::<Timespec>(&ts, "clock_getres", 2)?;
            clock_query(id, &ts, libc::clock_getres)
        })?,
    )?;

    // time.nanosleep(rqtp[, rmtp]) -> 0
    time.set(
        "nanosleep",
        sys_function(lua, |_, (rqtp, rmtp): (Value, Value)| nanosleep(&rqtp, &rmtp))?,
    )?;

    // time.timer_create(id) -> TIMER*
    time.set(
        "timer_create",
        sys_function(lua, |lua, id: libc::clockid_t| timer_create(lua, id))?,
    )?;

    // time.timer_delete(timer) -> 0
    time.set(
        "timer_delete",
        sys_function(lua, |_, timer: Value| timer_delete(&timer))?,
    )?;

    set_constants(
        &time,
        libc_constants![
            CLOCK_REALTIME, CLOCK_MONOTONIC, CLOCK_PROCESS_CPUTIME_ID, CLOCK_THREAD_CPUTIME_ID,
        ],
    )?;

    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals().set("time", register_time_module(&lua).unwrap()).unwrap();
        let ns = lua.create_table().unwrap();
        install_constructor::<Timespec>(&lua, &ns, "create_timespec").unwrap();
        lua.globals().set("c", ns).unwrap();
        lua
    }

    #[test]
    fn test_time_and_clock_gettime_agree() {
        let lua = create_lua();
        let (now, sec): (i64, i64) = lua
            .load(
                r#"
                local ts = c.create_timespec()
                assert(time.clock_gettime(time.CLOCK_REALTIME, ts) == 0)
                return time.time(), ts:get_tv_sec()
                "#,
            )
            .eval()
            .unwrap();
        assert!((now - sec).abs() <= 1);
    }

    #[test]
    fn test_clock_getres_is_positive() {
        let lua = create_lua();
        let (sec, nsec): (i64, i64) = lua
            .load(
                r#"
                local ts = c.create_timespec()
                time.clock_getres(time.CLOCK_MONOTONIC, ts)
                return ts:get_tv_sec(), ts:get_tv_nsec()
                "#,
            )
            .eval()
            .unwrap();
        assert!(sec > 0 || nsec > 0);
    }

    #[test]
    fn test_clock_is_monotone() {
        let lua = create_lua();
        let (a, b): (i64, i64) = lua
            .load(
                r#"
                local a = time.clock()
                local x = 0
                for i = 1, 100000 do x = x + i end
                return a, time.clock()
                "#,
            )
            .eval()
            .unwrap();
        assert!(a >= 0);
        assert!(b >= a);
    }

    #[test]
    fn test_nanosleep_short() {
        let lua = create_lua();
        let rc: i64 = lua
            .load(
                r#"
                local ts = c.create_timespec()
                ts:set_tv_nsec(1000000)
                return time.nanosleep(ts)
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(rc, 0);
    }

    #[test]
    fn test_invalid_clock_is_einval() {
        let lua = create_lua();
        let errno: i32 = lua
            .load("local _, e = time.clock_gettime(-42, c.create_timespec()); return e")
            .eval()
            .unwrap();
        assert_eq!(errno, libc::EINVAL);
    }

    #[test]
    fn test_timer_create_delete() {
        let lua = create_lua();
        let rc: i64 = lua
            .load(
                r#"
                local t = time.timer_create(time.CLOCK_MONOTONIC)
                return time.timer_delete(t)
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(rc, 0);
    }
}
