//! Composite struct bindings, exported under `bsd.core.composite`
//!
//! Each type mirrors one C struct with a `#[repr(C)]` payload and exposes a
//! `set_<field>`/`get_<field>` pair per field plus `get_table()`.
//!
//! ```lua
//! local ts = bsd.core.composite.create_timespec()
//! ts:set_tv_sec(10)
//! ts:set_tv_nsec(500)
//! local t = ts:get_table()   -- { tv_sec = 10, tv_nsec = 500 }
//! ```

/// `set_<field>`/`get_<field>` pairs for scalar fields of the payload.
macro_rules! scalar_fields {
    ($methods:ident, $($field:ident : $t:ty),+ $(,)?) => {
        $(
            $methods.add_method_mut(
                concat!("set_", stringify!($field)),
                |_, this, value: mlua::Value| {
                    let x = <$t as $crate::core::Scalar>::check(
                        &value,
                        concat!("set_", stringify!($field)),
                        2,
                    )?;
                    this.payload_mut().$field = x;
                    Ok($crate::core::Scalar::into_value(x))
                },
            );
            $methods.add_method(concat!("get_", stringify!($field)), |_, this, ()| {
                Ok($crate::core::Scalar::into_value(this.payload().$field))
            });
        )+
    };
}

/// Flatten scalar fields of a payload into a new table.
macro_rules! scalar_table {
    ($lua:expr, $payload:expr, $($field:ident),+ $(,)?) => {{
        let t = $lua.create_table()?;
        $(
            t.set(
                stringify!($field),
                $crate::core::Scalar::into_value($payload.$field),
            )?;
        )+
        Ok(t)
    }};
}

mod accept_filter_arg;
mod clockinfo;
mod crypt_data;
mod dbt;
mod div;
mod fid;
mod fsid;
mod group;
mod integer;
pub mod iovec;
mod itimerval;
mod pthread_rwlock;
pub mod regex;
mod sbuf;
mod sched_param;
mod sf_hdtr;
mod string;
mod timer;
mod timespec;
mod timeval;

pub use accept_filter_arg::{AcceptFilterArg, AcceptFilterArgData};
pub use clockinfo::{Clockinfo, ClockinfoData};
pub use crypt_data::{CryptData, CryptDataData};
pub use dbt::{Dbt, DbtData};
pub use div::{Div, DivData, Lldiv, LldivData};
pub use fid::{Fid, FidData, MAXFIDSZ};
pub use fsid::{Fsid, FsidData};
pub use group::{Group, GroupData};
pub use integer::{Integer, IntegerData};
pub use iovec::{IovFlags, IovGuard, Iovec, IovecHandle};
pub use itimerval::{Itimerval, ItimervalData};
pub use pthread_rwlock::{PthreadRwlock, RwlockHandle};
pub use regex::{Regex, RegexHandle, Regmatch, RegmatchData};
pub use sbuf::{Sbuf, SbufData};
pub use sched_param::{SchedParam, SchedParamData};
pub use sf_hdtr::{SfHdtr, SfHdtrData};
pub use string::LuabString;
pub use timer::Timer;
pub use timespec::{Timespec, TimespecData};
pub use timeval::{Timeval, TimevalData};

/// Copy `src` into a fixed C char array, NUL terminated.
///
/// Fails with `ERANGE` when `src` plus the terminator does not fit.
pub(crate) fn copy_cstr(dst: &mut [u8], src: &[u8]) -> Result<(), nix::errno::Errno> {
    if src.len() >= dst.len() {
        return Err(nix::errno::Errno::ERANGE);
    }
    dst.fill(0);
    dst[..src.len()].copy_from_slice(src);
    Ok(())
}

/// `set_<field>(s)` body for a fixed C char array.
///
/// Over-long strings leave `dst` untouched and yield `ERANGE`.
pub(crate) fn set_cstr(
    dst: &mut [u8],
    value: &mlua::Value,
    fname: &str,
) -> mlua::Result<crate::error::SysRet<mlua::Value>> {
    let max_len = dst.len().saturating_sub(1);
    let res = match crate::core::check_lstring(value, max_len, fname, 2)? {
        Some(bytes) => copy_cstr(dst, &bytes).map(|()| value.clone()),
        None => Err(nix::errno::Errno::ERANGE),
    };
    Ok(res.into())
}

/// Bytes of a fixed C char array up to the first NUL.
pub(crate) fn cstr_bytes(src: &[u8]) -> &[u8] {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    &src[..end]
}
