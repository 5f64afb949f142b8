//! `struct group` from `<grp.h>`
//!
//! The binding owns copies of the strings; [`GroupData::from_raw`] copies a
//! record returned by `getgrgid(3)`/`getgrnam(3)`.

use crate::core::{add_module_methods, table::push_table_of, Module, ModuleInfo, Scalar};
use crate::error::arg_error;
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::ffi::CStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    pub gr_name: Vec<u8>,
    pub gr_passwd: Vec<u8>,
    pub gr_gid: libc::gid_t,
    pub gr_mem: Vec<Vec<u8>>,
}

impl GroupData {
    /// Copy a C group record.
    ///
    /// # Safety
    ///
    /// `grp` must point to a valid `struct group` whose strings and member
    /// list are NUL terminated.
    pub unsafe fn from_raw(grp: *const libc::group) -> Self {
        let grp = &*grp;
        let str_of = |p: *const libc::c_char| {
            if p.is_null() {
                Vec::new()
            } else {
                CStr::from_ptr(p).to_bytes().to_vec()
            }
        };
        let mut gr_mem = Vec::new();
        if !grp.gr_mem.is_null() {
            let mut p = grp.gr_mem;
            while !(*p).is_null() {
                gr_mem.push(str_of(*p));
                p = p.add(1);
            }
        }
        Self {
            gr_name: str_of(grp.gr_name),
            gr_passwd: str_of(grp.gr_passwd),
            gr_gid: grp.gr_gid,
            gr_mem,
        }
    }
}

/// `struct group`
#[derive(Debug, Clone, Default)]
pub struct Group {
    grp: GroupData,
}

fn check_bytes(value: &Value, fname: &str, narg: usize) -> mlua::Result<Vec<u8>> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        other => Err(arg_error(
            fname,
            narg,
            format!("string expected, got {}", other.type_name()),
        )),
    }
}

fn push_members(lua: &Lua, members: &[Vec<u8>]) -> mlua::Result<Table> {
    let strings = members
        .iter()
        .map(|m| lua.create_string(m))
        .collect::<mlua::Result<Vec<_>>>()?;
    push_table_of(lua, &strings)
}

impl Module for Group {
    type Payload = GroupData;

    const INFO: ModuleInfo = ModuleInfo::new::<libc::group>(0x2d40_1f10, "GROUP*");

    fn payload(&self) -> &GroupData {
        &self.grp
    }

    fn payload_mut(&mut self) -> &mut GroupData {
        &mut self.grp
    }

    fn to_table(lua: &Lua, payload: &GroupData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("gr_name", lua.create_string(&payload.gr_name)?)?;
        t.set("gr_passwd", lua.create_string(&payload.gr_passwd)?)?;
        t.set("gr_gid", payload.gr_gid.into_value())?;
        t.set("gr_mem", push_members(lua, &payload.gr_mem)?)?;
        Ok(t)
    }
}

impl UserData for Group {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);
        scalar_fields!(methods, gr_gid: libc::gid_t);

        methods.add_method_mut("set_gr_name", |_, this, value: Value| {
            this.grp.gr_name = check_bytes(&value, "set_gr_name", 2)?;
            Ok(value)
        });
        methods.add_method("get_gr_name", |lua, this, ()| lua.create_string(&this.grp.gr_name));

        methods.add_method_mut("set_gr_passwd", |_, this, value: Value| {
            this.grp.gr_passwd = check_bytes(&value, "set_gr_passwd", 2)?;
            Ok(value)
        });
        methods.add_method("get_gr_passwd", |lua, this, ()| {
            lua.create_string(&this.grp.gr_passwd)
        });

        methods.add_method_mut("set_gr_mem", |_, this, t: Table| {
            let mut members = Vec::with_capacity(t.raw_len());
            for i in 1..=t.raw_len() {
                let v: Value = t.raw_get(i)?;
                members.push(check_bytes(&v, "set_gr_mem", 2)?);
            }
            this.grp.gr_mem = members;
            Ok(t)
        });
        methods.add_method("get_gr_mem", |lua, this, ()| push_members(lua, &this.grp.gr_mem));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_members_round_trip() {
        let lua = Lua::new();
        lua.globals().set("g", Group::create(&lua, None).unwrap()).unwrap();
        let (name, gid, n, second): (String, u32, usize, String) = lua
            .load(
                r#"
                g:set_gr_name("wheel")
                g:set_gr_gid(0)
                g:set_gr_mem({ "root", "toor" })
                local m = g:get_gr_mem()
                return g:get_gr_name(), g:get_gr_gid(), #m, m[2]
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((name.as_str(), gid, n, second.as_str()), ("wheel", 0, 2, "toor"));
    }

    #[test]
    fn test_from_raw_copies_strings() {
        let name = CString::new("staff").unwrap();
        let passwd = CString::new("*").unwrap();
        let m1 = CString::new("alice").unwrap();
        let mut mem = [m1.as_ptr() as *mut libc::c_char, std::ptr::null_mut()];
        // SAFETY: group is plain old data, all-zero is a valid value.
        let mut raw: libc::group = unsafe { std::mem::zeroed() };
        raw.gr_name = name.as_ptr() as *mut _;
        raw.gr_passwd = passwd.as_ptr() as *mut _;
        raw.gr_gid = 20;
        raw.gr_mem = mem.as_mut_ptr();
        let grp = unsafe { GroupData::from_raw(&raw) };
        assert_eq!(grp.gr_name, b"staff");
        assert_eq!(grp.gr_gid, 20);
        assert_eq!(grp.gr_mem, vec![b"alice".to_vec()]);
    }

    #[test]
    fn test_setters_leave_other_fields() {
        let lua = Lua::new();
        lua.globals().set("g", Group::create(&lua, None).unwrap()).unwrap();
        let (name, passwd, gid, n): (String, String, u32, usize) = lua
            .load(
                r#"
                g:set_gr_name("wheel")
                g:set_gr_passwd("*")
                g:set_gr_gid(0)
                g:set_gr_mem({ "root" })
                g:set_gr_gid(5)
                g:set_gr_name("operator")
                return g:get_gr_name(), g:get_gr_passwd(), g:get_gr_gid(), #g:get_gr_mem()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((name.as_str(), passwd.as_str(), gid, n), ("operator", "*", 5, 1));
    }
}
