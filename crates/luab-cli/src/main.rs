use anyhow::{anyhow, Context, Result};
use clap::Parser;
use luab::{register_bsd_module, LuabConfig};
use mlua::{Lua, MultiValue, Value};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = format!("luab={},luab_cli={}", log_level, log_level);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => LuabConfig::load(path)
            .map_err(|e| anyhow!("Failed to load config from {}: {e}", path.display()))?,
        None => LuabConfig::default(),
    };

    let lua = Lua::new();
    register_bsd_module(&lua, &config)
        .map_err(|e| anyhow!("Failed to register bindings: {e}"))?;

    for (i, chunk) in cli.exec.iter().enumerate() {
        lua.load(chunk.as_str())
            .set_name(format!("=(command line {})", i + 1))
            .exec()
            .map_err(lua_err)?;
    }

    match &cli.script {
        Some(script) => run_script(&lua, script, &cli.args),
        None if cli.exec.is_empty() => repl(&lua),
        None => Ok(()),
    }
}

/// Run `script` with `arg[0]` set to its path and `arg[1..]` to `args`.
fn run_script(lua: &Lua, script: &Path, args: &[String]) -> Result<()> {
    let source = std::fs::read(script)
        .with_context(|| format!("Failed to read {}", script.display()))?;

    let arg = lua.create_table().map_err(lua_err)?;
    arg.raw_set(0, script.display().to_string()).map_err(lua_err)?;
    for (i, a) in args.iter().enumerate() {
        arg.raw_set(i + 1, a.as_str()).map_err(lua_err)?;
    }
    lua.globals().set("arg", arg).map_err(lua_err)?;

    debug!("Running {}", script.display());
    lua.load(source)
        .set_name(format!("@{}", script.display()))
        .exec()
        .map_err(lua_err)
}

/// `mlua::Error` is not `Send + Sync`, so it cannot be wrapped directly.
fn lua_err(e: mlua::Error) -> anyhow::Error {
    anyhow!("{e}")
}

/// Line-oriented read-eval-print loop on stdin.
///
/// Each line is tried as an expression first, then as a statement.
fn repl(lua: &Lua) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let result = lua
            .load(format!("return {input}"))
            .set_name("=stdin")
            .eval::<MultiValue>()
            .or_else(|_| lua.load(input).set_name("=stdin").eval::<MultiValue>());
        match result {
            Ok(values) if !values.is_empty() => {
                let shown = values
                    .iter()
                    .map(|v| display(lua, v))
                    .collect::<Vec<_>>()
                    .join("\t");
                writeln!(stdout, "{shown}")?;
            }
            Ok(_) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
}

fn display(lua: &Lua, value: &Value) -> String {
    let tostring: Option<mlua::Function> = lua.globals().get("tostring").ok();
    tostring
        .and_then(|f| f.call::<String>(value.clone()).ok())
        .unwrap_or_else(|| format!("{value:?}"))
}
