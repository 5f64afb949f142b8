//! `<stdlib.h>` integer division, exported as `bsd.stdlib`
//!
//! ```lua
//! local d = bsd.stdlib.div(7, -2)
//! print(d:get_quot(), d:get_rem())   -- -3  1
//! ```

use super::sys_function;
use crate::composite::{Div, DivData, Lldiv, LldivData};
use crate::core::{Module, Scalar};
use crate::error::LuabResult;
use mlua::{Lua, Table, Value};
use nix::errno::Errno;
use std::os::raw::{c_int, c_longlong};

/// Quotient and remainder truncated toward zero.
///
/// A zero divisor yields `EDOM`; `MIN / -1` yields `ERANGE`.
fn quot_rem<T>(num: T, denom: T) -> Result<(T, T), Errno>
where
    T: Copy + PartialEq + Default + CheckedDiv,
{
    if denom == T::default() {
        return Err(Errno::EDOM);
    }
    match (num.checked_div(denom), num.checked_rem(denom)) {
        (Some(q), Some(r)) => Ok((q, r)),
        _ => Err(Errno::ERANGE),
    }
}

trait CheckedDiv: Sized {
    fn checked_div(self, rhs: Self) -> Option<Self>;
    fn checked_rem(self, rhs: Self) -> Option<Self>;
}

macro_rules! checked_div {
    ($($t:ty),+) => {$(
        impl CheckedDiv for $t {
            fn checked_div(self, rhs: Self) -> Option<Self> {
                <$t>::checked_div(self, rhs)
            }

            fn checked_rem(self, rhs: Self) -> Option<Self> {
                <$t>::checked_rem(self, rhs)
            }
        }
    )+};
}

checked_div!(c_int, c_longlong);

fn div(lua: &Lua, num: &Value, denom: &Value) -> LuabResult<mlua::AnyUserData> {
    let num = c_int::check(num, "div", 1)?;
    let denom = c_int::check(denom, "div", 2)?;
    let (quot, rem) = quot_rem(num, denom)?;
    Ok(Div::create(lua, Some(DivData { quot, rem }))?)
}

fn lldiv(lua: &Lua, num: &Value, denom: &Value) -> LuabResult<mlua::AnyUserData> {
    let num = c_longlong::check(num, "lldiv", 1)?;
    let denom = c_longlong::check(denom, "lldiv", 2)?;
    let (quot, rem) = quot_rem(num, denom)?;
    Ok(Lldiv::create(lua, Some(LldivData { quot, rem }))?)
}

/// Register `stdlib` functions
pub fn register_stdlib_module(lua: &Lua) -> mlua::Result<Table> {
    let stdlib = lua.create_table()?;

    // stdlib.div(num, denom) -> DIV*
    stdlib.set(
        "div",
        sys_function(lua, |lua, (num, denom): (Value, Value)| div(lua, &num, &denom))?,
    )?;

    // stdlib.lldiv(num, denom) -> LLDIV*
    stdlib.set(
        "lldiv",
        sys_function(lua, |lua, (num, denom): (Value, Value)| lldiv(lua, &num, &denom))?,
    )?;

    Ok(stdlib)
}
