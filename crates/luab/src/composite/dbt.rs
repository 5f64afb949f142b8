//! `DBT`, the key/data thang of `db(3)`
//!
//! `set_data(iov)` points the record at an iovec's buffer and locks it for as
//! long as the record refers to it. [`Module::get`] yields the bare record.

use super::iovec::{Iovec, IovecHandle};
use crate::core::{add_module_methods, check_udata, Module, ModuleInfo};
use crate::error::{arg_error, sysret, LuabResult};
use mlua::{AnyUserData, Lua, Table, UserData, UserDataMethods, Value};

/// Bare `DBT`: buffer address and size
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbtData {
    pub data: usize,
    pub size: usize,
}

/// `DBT`
#[derive(Debug, Default)]
pub struct Dbt {
    dbt: DbtData,
    iov: Option<IovecHandle>,
}

impl Dbt {
    /// Point the record at `iov`. On failure the record and its previous
    /// iovec are left as they were.
    fn attach(&mut self, iov: IovecHandle) -> LuabResult<usize> {
        let same = self.iov.as_ref().is_some_and(|cur| cur.ptr_eq(&iov));
        if !same {
            iov.claim()?;
        }
        let (data, size) = match iov.try_guard() {
            Ok(guard) => (guard.as_ptr() as usize, guard.len()),
            Err(e) => {
                if !same {
                    iov.release();
                }
                return Err(e.into());
            }
        };
        if let Some(old) = self.iov.replace(iov) {
            if !same {
                old.release();
            }
        }
        self.dbt = DbtData { data, size };
        Ok(size)
    }
}

impl Drop for Dbt {
    fn drop(&mut self) {
        if let Some(iov) = self.iov.take() {
            iov.release();
        }
    }
}

impl Module for Dbt {
    type Payload = DbtData;

    const INFO: ModuleInfo = ModuleInfo::new::<DbtData>(0x2d40_1f13, "DBT*");

    fn payload(&self) -> &DbtData {
        &self.dbt
    }

    fn payload_mut(&mut self) -> &mut DbtData {
        &mut self.dbt
    }

    fn to_table(lua: &Lua, payload: &DbtData) -> mlua::Result<Table> {
        let t = lua.create_table()?;
        t.set("size", payload.size)?;
        Ok(t)
    }

    fn check_arg(_lua: &Lua, _value: &Value, fname: &str) -> mlua::Result<DbtData> {
        Err(arg_error(fname, 1, "DBT* cannot be copied"))
    }
}

impl UserData for Dbt {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_module_methods(methods);

        methods.add_method_mut("set_data", |_, this, value: Value| {
            let ud: AnyUserData = check_udata::<Iovec>(&value, "set_data", 2)?;
            let iov = ud.borrow::<Iovec>()?.handle().clone();
            sysret(this.attach(iov))
        });

        methods.add_method("get_data", |lua, this, ()| match &this.iov {
            Some(iov) => Ok(Value::UserData(Iovec::create(lua, Some(iov.clone()))?)),
            None => Ok(Value::Nil),
        });

        methods.add_method("get_size", |_, this, ()| Ok(this.dbt.size));
    }
}
