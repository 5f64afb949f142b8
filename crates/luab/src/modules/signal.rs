//! `SIGALRM` to Lua callback bridge
//!
//! The signal handler only raises a flag. A count hook installed on the Lua
//! state polls the flag every `hook_interval` instructions; when it is set
//! the hook removes itself and calls the registered function on the Lua
//! thread.
//!
//! The flag and the signal disposition are process-wide. The callback and
//! the hook belong to one Lua state, but `disarm` on any state restores the
//! default `SIGALRM` disposition for the whole process.

use crate::error::LuabResult;
use mlua::{Function, HookTriggers, Lua, VmState};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

const CALLBACK_KEY: &str = "luab.sigalrm.callback";

/// Instructions between checks when no interval was configured
pub const DEFAULT_HOOK_INTERVAL: u32 = 1000;

/// Set by the handler, shared by every Lua state in the process.
static PENDING: AtomicBool = AtomicBool::new(false);
/// Whether `on_sigalrm` is the process's `SIGALRM` disposition.
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Per-state polling interval, stored as app data at registration.
#[derive(Debug, Clone, Copy)]
pub struct HookInterval(pub u32);

extern "C" fn on_sigalrm(_signo: c_int) {
    PENDING.store(true, Ordering::SeqCst);
}

fn set_disposition(handler: SigHandler) -> LuabResult<()> {
    let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
    // SAFETY: the handler only stores to an atomic
    unsafe { sigaction(Signal::SIGALRM, &action) }?;
    Ok(())
}

fn ensure_installed() -> LuabResult<()> {
    if !INSTALLED.swap(true, Ordering::SeqCst) {
        if let Err(e) = set_disposition(SigHandler::Handler(on_sigalrm)) {
            INSTALLED.store(false, Ordering::SeqCst);
            return Err(e);
        }
    }
    Ok(())
}

/// Catch `SIGALRM` ahead of starting a timer and drop any stale delivery.
///
/// A timer started before the handler is in place could kill the process.
pub fn prepare() -> LuabResult<()> {
    PENDING.store(false, Ordering::SeqCst);
    ensure_installed()
}

/// Register `callback` to run once the next `SIGALRM` arrives.
///
/// A delivery flagged since the last [`prepare`] is kept, so a short timer
/// that fired before this call still runs the callback.
pub fn arm(lua: &Lua, callback: Function) -> LuabResult<()> {
    let interval = lua
        .app_data_ref::<HookInterval>()
        .map_or(DEFAULT_HOOK_INTERVAL, |i| i.0);
    ensure_installed()?;
    lua.set_named_registry_value(CALLBACK_KEY, callback)?;

    let triggers = HookTriggers {
        every_nth_instruction: Some(interval),
        ..Default::default()
    };
    lua.set_hook(triggers, |lua, _debug| {
        if PENDING.swap(false, Ordering::SeqCst) {
            lua.remove_hook();
            let callback: Option<Function> = lua.named_registry_value(CALLBACK_KEY)?;
            lua.unset_named_registry_value(CALLBACK_KEY)?;
            if let Some(callback) = callback {
                debug!("SIGALRM delivered, running callback");
                callback.call::<()>(())?;
            }
        }
        Ok(VmState::Continue)
    })?;
    debug!(interval, "SIGALRM callback armed");
    Ok(())
}

/// Drop any pending callback and restore the default disposition.
pub fn disarm(lua: &Lua) -> LuabResult<()> {
    lua.remove_hook();
    lua.unset_named_registry_value(CALLBACK_KEY)?;
    PENDING.store(false, Ordering::SeqCst);
    if INSTALLED.swap(false, Ordering::SeqCst) {
        set_disposition(SigHandler::SigDfl)?;
        debug!("SIGALRM callback disarmed");
    }
    Ok(())
}

/// Whether a callback is registered and not yet delivered.
pub fn is_armed(lua: &Lua) -> bool {
    matches!(
        lua.named_registry_value::<Option<Function>>(CALLBACK_KEY),
        Ok(Some(_))
    )
}
