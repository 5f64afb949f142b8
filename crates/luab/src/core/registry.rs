//! Static registry of every bound type
//!
//! One [`ModuleEntry`] per descriptor; registration walks this list to
//! install the `create_<name>` constructors, and scripts or Rust callers can
//! look descriptors up by metatable tag or id.

use super::{install_constructor, Module, ModuleInfo};
use crate::atomic::{
    Clock, Double, Gid, Ino, Locale, Long, NlItem, Nlink, Off, Pid, Ssize, Time, Uid, Uint,
    Uint32, Uintmax, Ulong, Useconds, VmOffset,
};
use crate::composite::{
    AcceptFilterArg, Clockinfo, CryptData, Dbt, Div, Fid, Fsid, Group, Integer, Iovec, Itimerval,
    Lldiv, LuabString, PthreadRwlock, Regex, Regmatch, Sbuf, SchedParam, SfHdtr, Timer, Timespec,
    Timeval,
};
use mlua::{Lua, Table};
use std::fmt;

/// Namespace a constructor is exported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `bsd.core.atomic`
    Atomic,
    /// `bsd.core.composite`
    Composite,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Composite => "composite",
        }
    }
}

type InstallFn = fn(&Lua, &Table, &'static str) -> mlua::Result<()>;

/// A descriptor together with its constructor
pub struct ModuleEntry {
    pub info: &'static ModuleInfo,
    pub namespace: Namespace,
    /// Name of the exported constructor, e.g. `create_gid`
    pub ctor: &'static str,
    install: InstallFn,
}

impl ModuleEntry {
    /// Export the constructor into `ns`.
    pub fn install(&self, lua: &Lua, ns: &Table) -> mlua::Result<()> {
        (self.install)(lua, ns, self.ctor)
    }
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("info", self.info)
            .field("namespace", &self.namespace)
            .field("ctor", &self.ctor)
            .finish()
    }
}

macro_rules! entries {
    ($($ns:ident => [$($ty:ty = $ctor:literal),+ $(,)?]),+ $(,)?) => {
        &[$($(
            ModuleEntry {
                info: &<$ty as Module>::INFO,
                namespace: Namespace::$ns,
                ctor: $ctor,
                install: install_constructor::<$ty>,
            },
        )+)+]
    };
}

/// Every bound type, in export order
pub static MODULES: &[ModuleEntry] = entries! {
    Atomic => [
        Double = "create_double",
        Clock = "create_clock",
        Gid = "create_gid",
        Ino = "create_ino",
        Long = "create_long",
        NlItem = "create_nl_item",
        Nlink = "create_nlink",
        Off = "create_off",
        Pid = "create_pid",
        Ssize = "create_ssize",
        Time = "create_time",
        Uid = "create_uid",
        Uint32 = "create_uint32",
        Uint = "create_uint",
        Uintmax = "create_uintmax",
        Ulong = "create_ulong",
        Useconds = "create_useconds",
        VmOffset = "create_vm_offset",
        Locale = "create_locale",
    ],
    Composite => [
        Sbuf = "create_sbuf",
        AcceptFilterArg = "create_accept_filter_arg",
        Clockinfo = "create_clockinfo",
        CryptData = "create_crypt_data",
        Dbt = "create_dbt",
        Div = "create_div",
        Lldiv = "create_lldiv",
        Fid = "create_fid",
        Fsid = "create_fsid",
        Group = "create_group",
        Integer = "create_integer",
        Iovec = "create_iovec",
        Itimerval = "create_itimerval",
        PthreadRwlock = "create_pthread_rwlock",
        Regex = "create_regex",
        Regmatch = "create_regmatch",
        SchedParam = "create_sched_param",
        SfHdtr = "create_sf_hdtr",
        LuabString = "create_string",
        Timer = "create_timer",
        Timespec = "create_timespec",
        Timeval = "create_timeval",
    ],
};

/// Find a descriptor by its metatable tag, e.g. `GID*`.
pub fn lookup_module(name: &str) -> Option<&'static ModuleEntry> {
    MODULES.iter().find(|e| e.info.name == name)
}

/// Find a descriptor by its cookie.
pub fn lookup_module_id(id: u32) -> Option<&'static ModuleEntry> {
    MODULES.iter().find(|e| e.info.id == id)
}

/// Install every constructor of `namespace` into `ns`.
pub fn install_namespace(lua: &Lua, ns: &Table, namespace: Namespace) -> mlua::Result<usize> {
    let mut count = 0;
    for entry in MODULES.iter().filter(|e| e.namespace == namespace) {
        entry.install(lua, ns)?;
        count += 1;
    }
    Ok(count)
}
