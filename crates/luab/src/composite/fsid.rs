//! `fsid_t`, the file system id pair

use crate::core::{add_module_methods, table::check_table_of, table::push_table_of, Module, ModuleInfo};
use crate::error::{sysret, LuabResult};
use mlua::{Lua, Table, UserData, UserDataMethods};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsidData {
    pub val: [i32; 2],
}

/// `fsid_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct Fsid {
    fsid: FsidData,
}

impl Module for Fsid {
    type Payload = FsidData;

    const INFO: ModuleInfo = ModuleInfo::new::<FsidData>(0x2d40_1f08, "FSID*");

    fn payload(&self) -> &FsidData {
        &self.fsid
    }

    fn payload_mut(&mut self) -> &mut FsidData {
        &mut self.fsid
    }

    fn to_table(lua: &Lua, payload: &FsidData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("val", push_table_of(lua, &payload.val)?)?;
        Ok(t)
    }
}

impl UserData for Fsid {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_val", |lua, this, t: Table| {
            let res: LuabResult<()> = (|| {
                let val = check_table_of::<i32>(lua, &t, Some(2))?;
                this.fsid.val.copy_from_slice(val.as_slice());
                Ok(())
            })();
            sysret(res.map(|()| 0))
        });

        methods.add_method("get_val", |lua, this, ()| push_table_of(lua, &this.fsid.val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Value;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals()
            .set("fsid", Fsid::create(&lua, None).unwrap())
            .unwrap();
        lua
    }

    #[test]
    fn test_val_round_trip() {
        let lua = create_lua();
        let (a, b): (i32, i32) = lua
            .load("fsid:set_val({ 7, -9 }); local v = fsid:get_val(); return v[1], v[2]")
            .eval()
            .unwrap();
        assert_eq!((a, b), (7, -9));
    }

    #[test]
    fn test_wrong_cardinality_is_erange() {
        let lua = create_lua();
        let (v, errno): (Value, i32) = lua
            .load("return fsid:set_val({ 1, 2, 3 })")
            .eval()
            .unwrap();
        assert!(v.is_nil());
        assert_eq!(errno, libc::ERANGE);
        let first: i32 = lua.load("return fsid:get_val()[1]").eval().unwrap();
        assert_eq!(first, 0);
    }

    #[test]
    fn test_set_val_replaces_both_words() {
        let lua = create_lua();
        let (a, b, n): (i32, i32, usize) = lua
            .load(
                r#"
                fsid:set_val({ 1, 2 })
                fsid:set_val({ 3, 4 })
                pcall(fsid.set_val, fsid, { 5, "x" })
                local v = fsid:get_val()
                return v[1], v[2], #v
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((a, b, n), (3, 4, 2));
    }
}
