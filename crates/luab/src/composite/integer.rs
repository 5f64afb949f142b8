//! Integer union, one storage viewed at every C integer width
//!
//! Every setter rewrites the whole union; every getter reinterprets the
//! low-order storage at its own width, so
//!
//! ```lua
//! local n = bsd.core.composite.create_integer()
//! n:set_int(-1)
//! n:get_uint8()   -- 255
//! ```

use crate::core::{add_module_methods, Module, ModuleInfo, Scalar};
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::mem;
use std::os::raw::{c_char, c_int, c_long, c_short};

const STORAGE: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerData {
    bytes: [u8; STORAGE],
}

/// Read and write access at one width.
trait Width: Scalar {
    fn store(self, bytes: &mut [u8; STORAGE]);
    fn load(bytes: &[u8; STORAGE]) -> Self;
}

macro_rules! impl_width {
    ($($t:ty),+) => {
        $(
            impl Width for $t {
                fn store(self, bytes: &mut [u8; STORAGE]) {
                    *bytes = [0; STORAGE];
                    bytes[..mem::size_of::<$t>()].copy_from_slice(&self.to_ne_bytes());
                }

                fn load(bytes: &[u8; STORAGE]) -> Self {
                    let mut raw = [0u8; mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..mem::size_of::<$t>()]);
                    <$t>::from_ne_bytes(raw)
                }
            }
        )+
    };
}

impl_width!(i8, i16, i32, i64, u8, u16, u32, u64);

impl IntegerData {
    fn get<T: Width>(&self) -> T {
        T::load(&self.bytes)
    }

    fn set<T: Width>(&mut self, x: T) {
        x.store(&mut self.bytes);
    }
}

/// Integer union
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer {
    un: IntegerData,
}

impl Module for Integer {
    type Payload = IntegerData;

    const INFO: ModuleInfo = ModuleInfo::new::<IntegerData>(0x2d40_1f0d, "INTEGER*");

    fn payload(&self) -> &IntegerData {
        &self.un
    }

    fn payload_mut(&mut self) -> &mut IntegerData {
        &mut self.un
    }

    fn to_table(lua: &Lua, payload: &IntegerData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("int64", payload.get::<i64>())?;
        t.set("uint64", payload.get::<u64>().into_value())?;
        Ok(t)
    }
}

macro_rules! width_accessors {
    ($methods:ident, $($name:ident : $t:ty),+ $(,)?) => {
        $(
            $methods.add_method_mut(
                concat!("set_", stringify!($name)),
                |_, this, value: Value| {
                    let x = <$t>::check(&value, concat!("set_", stringify!($name)), 2)?;
                    this.un.set(x);
                    Ok(x.into_value())
                },
            );
            $methods.add_method(concat!("get_", stringify!($name)), |_, this, ()| {
                Ok(this.un.get::<$t>().into_value())
            });
        )+
    };
}

impl UserData for Integer {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        width_accessors!(
            methods,
            char: c_char,
            short: c_short,
            int: c_int,
            long: c_long,
            int8: i8,
            int16: i16,
            int32: i32,
            int64: i64,
            uint8: u8,
            uint16: u16,
            uint32: u32,
            uint64: u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals()
            .set("n", Integer::create(&lua, None).unwrap())
            .unwrap();
        lua
    }

    #[test]
    fn test_same_width_round_trip() {
        let lua = create_lua();
        let (a, b, c): (i64, i64, i64) = lua
            .load(
                r#"
                n:set_int16(-300)
                local a = n:get_int16()
                n:set_uint32(4000000000)
                local b = n:get_uint32()
                n:set_int64(-5)
                return a, b, n:get_int64()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((a, b, c), (-300, 4_000_000_000, -5));
    }

    #[test]
    fn test_setter_rewrites_whole_union() {
        let lua = create_lua();
        let v: i64 = lua
            .load("n:set_int64(-1); n:set_uint8(1); return n:get_int64()")
            .eval()
            .unwrap();
        assert_eq!(v, 1);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_narrow_view_of_wide_value() {
        let lua = create_lua();
        let v: i64 = lua.load("n:set_int(-1); return n:get_uint8()").eval().unwrap();
        assert_eq!(v, 255);
    }

    #[test]
    fn test_out_of_range_for_width() {
        let lua = create_lua();
        assert!(lua.load("n:set_int8(200)").exec().is_err());
        assert!(lua.load("n:set_uint16(-1)").exec().is_err());
    }
}
