use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "luab")]
#[command(about = "luab - Lua 5.4 with the BSD system interface preloaded")]
#[command(version)]
pub struct Cli {
    /// Registration settings (TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Execute a chunk before the script (can be repeated)
    #[arg(short = 'e', value_name = "CHUNK")]
    pub exec: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Script to run; without a script or chunk, start a REPL
    pub script: Option<PathBuf>,

    /// Arguments exposed to the script as `arg[1..]`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_args_pass_through() {
        let cli = Cli::parse_from(["luab", "-v", "run.lua", "-x", "y"]);
        assert!(cli.verbose);
        assert_eq!(cli.script, Some(PathBuf::from("run.lua")));
        assert_eq!(cli.args, vec!["-x", "y"]);
    }

    #[test]
    fn test_repeated_chunks() {
        let cli = Cli::parse_from(["luab", "-e", "a = 1", "-e", "print(a)"]);
        assert_eq!(cli.exec.len(), 2);
        assert!(cli.script.is_none());
    }
}
