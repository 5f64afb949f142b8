//! Lua 5.4 bindings for the BSD system interface
//!
//! The crate exposes two layers to Lua:
//! - **C types**: scalar (`bsd.core.atomic`) and struct (`bsd.core.composite`)
//!   bindings, each a userdata with `set_*`/`get_*` accessors and `get_table()`
//! - **Syscalls**: one sub-namespace per header (`bsd.unistd`, `bsd.sys.stat`,
//!   ...), following the errno convention `nil, errno, strerror`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use luab::{register_bsd_module, LuabConfig};
//!
//! let lua = mlua::Lua::new();
//! register_bsd_module(&lua, &LuabConfig::default())?;
//! lua.load(r#"
//!     local bsd = require("bsd")
//!     local fd, errno, msg = bsd.fcntl.open("/etc/passwd", bsd.fcntl.O_RDONLY)
//!     local buf = bsd.core.composite.create_iovec(512)
//!     print(bsd.unistd.read(fd, buf, 512), buf:copy_out())
//! "#).exec()?;
//! ```
//!
//! ## Namespaces
//!
//! | table | contents |
//! |---|---|
//! | `core.atomic` | `create_<scalar>` constructors (`create_gid`, `create_double`, ...) |
//! | `core.composite` | `create_<struct>` constructors (`create_timespec`, `create_iovec`, ...) |
//! | `fcntl`, `unistd`, `sys.stat`, ... | syscall wrappers and their constants |

pub mod atomic;
pub mod composite;
pub mod config;
pub mod core;
pub mod error;
pub mod lua_util;
pub mod modules;

pub use crate::core::{
    install_constructor, lookup_module, lookup_module_id, LuabTable, Module, ModuleEntry,
    ModuleInfo, Namespace, Scalar,
};
pub use config::LuabConfig;
pub use error::{LuabError, LuabResult, SysRet};

use mlua::{Function, Lua, Table};
use modules::signal::HookInterval;
use tracing::{debug, warn};

/// Sub-namespace holding the type constructors
const CORE: &str = "core";

/// Build the root table and install it as configured.
///
/// Returns the root table whether or not it was also exported.
pub fn register_bsd_module(lua: &Lua, config: &LuabConfig) -> LuabResult<Table> {
    config.validate()?;
    warn_unknown_modules(config);
    lua.set_app_data(HookInterval(config.hook_interval));

    let root = lua.create_table()?;

    for namespace in [Namespace::Atomic, Namespace::Composite] {
        let path = format!("{CORE}.{}", namespace.as_str());
        if !config.wants(&path) {
            continue;
        }
        let ns = lua_util::nested_table(lua, &root, &path)?;
        let n = crate::core::install_namespace(lua, &ns, namespace)?;
        debug!("Registered {} {} types", n, namespace.as_str());
    }

    for &(path, register) in modules::SYSCALL_MODULES {
        if !config.wants(path) {
            continue;
        }
        let parent = match path.rsplit_once('.') {
            Some((parent, _)) => lua_util::nested_table(lua, &root, parent)?,
            None => root.clone(),
        };
        let leaf = path.rsplit('.').next().unwrap_or(path);
        parent.raw_set(leaf, register(lua)?)?;
        debug!("Registered {}.{}", config.namespace, path);
    }

    if config.global {
        lua.globals().set(config.namespace.as_str(), root.clone())?;
    }
    if config.preload {
        install_preload(lua, &config.namespace, &root)?;
    }

    Ok(root)
}

/// `package.preload[name]` returning `root`, so `require(name)` works.
fn install_preload(lua: &Lua, name: &str, root: &Table) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let preload: Table = package.get("preload")?;
    let root = root.clone();
    let loader: Function = lua.create_function(move |_, ()| Ok(root.clone()))?;
    preload.set(name, loader)
}

/// Log configured module names that select nothing.
fn warn_unknown_modules(config: &LuabConfig) {
    let known = |m: &str| {
        let selects = |path: &str| {
            path == m
                || path
                    .strip_prefix(m)
                    .is_some_and(|rest| rest.starts_with('.'))
        };
        selects("core.atomic")
            || selects("core.composite")
            || modules::SYSCALL_MODULES.iter().any(|&(path, _)| selects(path))
    };
    for m in config.modules.iter().filter(|m| !known(m.as_str())) {
        warn!("Unknown luab module '{}', ignoring", m);
    }
}
