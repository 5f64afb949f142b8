//! Module dispatch: the descriptor every bound C type instantiates
//!
//! A bound type is a Rust struct implementing [`Module`] and [`mlua::UserData`].
//! The descriptor carries the metatable tag, the payload size and the hooks
//! used by constructors, accessors and table marshalling:
//!
//! | hook | role |
//! |---|---|
//! | [`Module::create`] | allocate a zeroed instance, apply `init`, box it |
//! | [`Module::init`] | copy an initial payload into a fresh instance |
//! | [`Module::get`] | check the userdata tag and unbox the payload |
//! | [`Module::check_table`] | Lua array table -> vector of payloads |
//! | [`Module::push_table`] | vector of payloads -> Lua array table |
//! | [`Module::alloc_table`] | zeroed vector of payloads |

pub mod check;
pub mod registry;
pub mod table;

use crate::error::{arg_error, LuabResult};
use mlua::{AnyUserData, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};
use std::mem;

pub use check::{check_integer, check_lstring, check_number, check_xinteger, Scalar};
pub use registry::{install_namespace, lookup_module, lookup_module_id, ModuleEntry, Namespace, MODULES};
pub use table::{check_card, LuabTable};

/// Static description of a bound C type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Identifying cookie, unique across all modules
    pub id: u32,
    /// Metatable tag, e.g. `GID*`
    pub name: &'static str,
    /// Size of the wrapped C type
    pub len: usize,
    /// Size of one element when packed into a vector
    pub sz: usize,
}

impl ModuleInfo {
    /// Describe a module wrapping the C type `T`.
    pub const fn new<T>(id: u32, name: &'static str) -> Self {
        Self {
            id,
            name,
            len: mem::size_of::<T>(),
            sz: mem::size_of::<T>(),
        }
    }
}

/// A C type bound as Lua userdata.
///
/// `Default` is the zero-filled instance `create` starts from.
pub trait Module: UserData + Default + 'static {
    /// The wrapped value handed out by `get` and carried in tables
    type Payload: Clone + Default;

    const INFO: ModuleInfo;

    fn payload(&self) -> &Self::Payload;

    fn payload_mut(&mut self) -> &mut Self::Payload;

    /// Flatten a payload into a Lua table (`get_table()`).
    fn to_table(lua: &Lua, payload: &Self::Payload) -> mlua::Result<Table>;

    /// Field initializer applied by `create` when an argument is present.
    fn init(&mut self, arg: Self::Payload) {
        *self.payload_mut() = arg;
    }

    /// Allocate, zero, initialize and box a new instance.
    fn create(lua: &Lua, arg: Option<Self::Payload>) -> mlua::Result<AnyUserData> {
        let mut data = Self::default();
        if let Some(arg) = arg {
            data.init(arg);
        }
        lua.create_userdata(data)
    }

    /// Check that `value` is userdata of this module and copy its payload.
    fn get(value: &Value, fname: &str, narg: usize) -> mlua::Result<Self::Payload> {
        let ud = check_udata::<Self>(value, fname, narg)?;
        let data = ud.borrow::<Self>()?;
        Ok(data.payload().clone())
    }

    /// Convert a table element or constructor argument into a payload.
    ///
    /// Composite types only accept their own userdata; scalar types also
    /// accept plain numbers.
    fn check_element(value: &Value, fname: &str, narg: usize) -> mlua::Result<Self::Payload> {
        Self::get(value, fname, narg)
    }

    /// Convert the argument of `create_<name>(arg)`.
    fn check_arg(_lua: &Lua, value: &Value, fname: &str) -> mlua::Result<Self::Payload> {
        Self::check_element(value, fname, 1)
    }

    /// Convert a payload into the Lua value stored in a table slot.
    fn push_element(lua: &Lua, payload: Self::Payload) -> mlua::Result<Value> {
        Ok(Value::UserData(Self::create(lua, Some(payload))?))
    }

    fn alloc_table(card: usize) -> LuabTable<Self::Payload> {
        LuabTable::alloc(card)
    }

    /// Lua array table -> vector of payloads.
    ///
    /// `card` is the cardinality the caller expects; a mismatch yields `ERANGE`.
    fn check_table(
        table: &Table,
        card: Option<usize>,
        fname: &str,
        narg: usize,
    ) -> LuabResult<LuabTable<Self::Payload>> {
        let n = check_card(table, card)?;
        let mut vec = Vec::with_capacity(n);
        for i in 1..=n {
            let value: Value = table.raw_get(i)?;
            vec.push(Self::check_element(&value, fname, narg)?);
        }
        Ok(LuabTable::new(vec))
    }

    /// Vector of payloads -> Lua array table.
    ///
    /// Refills `target` when given (dropping any surplus slots), otherwise
    /// creates a new table.
    fn push_table(
        lua: &Lua,
        tbl: &LuabTable<Self::Payload>,
        target: Option<Table>,
    ) -> mlua::Result<Table> {
        let table = match target {
            Some(t) => {
                for i in (tbl.card() + 1)..=t.raw_len() {
                    t.raw_set(i, Value::Nil)?;
                }
                t
            }
            None => lua.create_table_with_capacity(tbl.card(), 0)?,
        };
        for (i, payload) in tbl.iter().enumerate() {
            table.raw_set(i + 1, Self::push_element(lua, payload.clone())?)?;
        }
        Ok(table)
    }
}

/// Validate that `value` holds userdata tagged as module `T`.
pub fn check_udata<T: Module>(value: &Value, fname: &str, narg: usize) -> mlua::Result<AnyUserData> {
    match value {
        Value::UserData(ud) if ud.is::<T>() => Ok(ud.clone()),
        other => Err(arg_error(
            fname,
            narg,
            format!("{} expected, got {}", T::INFO.name, other.type_name()),
        )),
    }
}

/// Like [`check_udata`] but `nil` is allowed.
pub fn check_opt_udata<T: Module>(
    value: &Value,
    fname: &str,
    narg: usize,
) -> mlua::Result<Option<AnyUserData>> {
    match value {
        Value::Nil => Ok(None),
        v => check_udata::<T>(v, fname, narg).map(Some),
    }
}

/// Methods shared by every module: `get_table`, `dump`, `__len`, `__tostring`.
///
/// `__gc` is the type's `Drop`.
pub fn add_module_methods<T: Module, M: UserDataMethods<T>>(methods: &mut M) {
    methods.add_method("get_table", |lua, this, ()| T::to_table(lua, this.payload()));
    methods.add_method("dump", |_, _, ()| Ok(Value::Nil));
    methods.add_meta_method(MetaMethod::Len, |_, _, ()| Ok(T::INFO.len));
    methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
        Ok(format!("{} ({:p})", T::INFO.name, this.payload()))
    });
}

/// Export `create_<name>([arg])` for module `T` into `ns`.
pub fn install_constructor<T: Module>(lua: &Lua, ns: &Table, ctor: &'static str) -> mlua::Result<()> {
    let create = lua.create_function(move |lua, arg: Value| {
        let payload = match arg {
            Value::Nil => None,
            v => Some(T::check_arg(lua, &v, ctor)?),
        };
        T::create(lua, payload)
    })?;
    ns.set(ctor, create)
}
