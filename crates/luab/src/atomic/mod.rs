//! Scalar type bindings, exported under `bsd.core.atomic`
//!
//! Every scalar module boxes one C value and offers the same surface:
//!
//! ```lua
//! local gid = bsd.core.atomic.create_gid(0)
//! gid:set_value(1001)
//! print(gid:get_value())        -- 1001
//! print(gid:get_table().value)  -- 1001
//! print(#gid, tostring(gid))    -- 4   GID* (0x...)
//! ```

mod locale;

pub use locale::Locale;

use crate::core::{add_module_methods, Module, ModuleInfo, Scalar};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::os::raw::{c_long, c_uint, c_ulong};

/// `vm_offset_t` is pointer sized on every supported architecture.
#[allow(non_camel_case_types)]
pub type vm_offset_t = usize;

macro_rules! atomic_module {
    ($(
        $(#[$doc:meta])*
        $ty:ident($payload:ty) = $id:expr, $name:literal;
    )+) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $ty {
                value: $payload,
            }

            impl Module for $ty {
                type Payload = $payload;

                const INFO: ModuleInfo = ModuleInfo::new::<$payload>($id, $name);

                fn payload(&self) -> &$payload {
                    &self.value
                }

                fn payload_mut(&mut self) -> &mut $payload {
                    &mut self.value
                }

                fn to_table(lua: &Lua, payload: &$payload) -> mlua::Result<Table> {
                    let t = lua.create_table()?;
                    t.set("value", payload.into_value())?;
                    Ok(t)
                }

                fn check_element(value: &Value, fname: &str, narg: usize) -> mlua::Result<$payload> {
                    match value {
                        Value::UserData(_) => Self::get(value, fname, narg),
                        _ => <$payload as Scalar>::check(value, fname, narg),
                    }
                }

                fn push_element(_lua: &Lua, payload: $payload) -> mlua::Result<Value> {
                    Ok(payload.into_value())
                }
            }

            impl UserData for $ty {
                fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
                    add_module_methods(methods);

                    methods.add_method_mut("set_value", |_, this, value: Value| {
                        this.value = <$payload as Scalar>::check(&value, "set_value", 2)?;
                        Ok(this.value.into_value())
                    });

                    methods.add_method("get_value", |_, this, ()| Ok(this.value.into_value()));
                }
            }
        )+
    };
}

atomic_module! {
    /// `double`
    Double(f64) = 0x1cf1_ae01, "DOUBLE*";
    /// `clock_t`
    Clock(libc::clock_t) = 0x1cf1_ae02, "CLOCK*";
    /// `gid_t`
    Gid(libc::gid_t) = 0x1cf1_ae03, "GID*";
    /// `ino_t`
    Ino(libc::ino_t) = 0x1cf1_ae04, "INO*";
    /// `long`
    Long(c_long) = 0x1cf1_ae05, "LONG*";
    /// `nl_item`
    NlItem(libc::nl_item) = 0x1cf1_ae06, "NL_ITEM*";
    /// `nlink_t`
    Nlink(libc::nlink_t) = 0x1cf1_ae07, "NLINK*";
    /// `off_t`
    Off(libc::off_t) = 0x1cf1_ae08, "OFF*";
    /// `pid_t`
    Pid(libc::pid_t) = 0x1cf1_ae09, "PID*";
    /// `ssize_t`
    Ssize(libc::ssize_t) = 0x1cf1_ae0a, "SSIZE*";
    /// `time_t`
    Time(libc::time_t) = 0x1cf1_ae0b, "TIME*";
    /// `uid_t`
    Uid(libc::uid_t) = 0x1cf1_ae0c, "UID*";
    /// `uint32_t`
    Uint32(u32) = 0x1cf1_ae0d, "UINT32*";
    /// `u_int`
    Uint(c_uint) = 0x1cf1_ae0e, "UINT*";
    /// `uintmax_t`
    Uintmax(u64) = 0x1cf1_ae0f, "UINTMAX*";
    /// `u_long`
    Ulong(c_ulong) = 0x1cf1_ae10, "ULONG*";
    /// `useconds_t`
    Useconds(libc::useconds_t) = 0x1cf1_ae11, "USECONDS*";
    /// `vm_offset_t`
    VmOffset(vm_offset_t) = 0x1cf1_ae12, "VM_OFFSET*";
}
