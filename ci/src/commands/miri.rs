use argh::FromArgs;
use xshell::cmd;

use crate::Flag;
use crate::Prepare;
use crate::PreparedCommand;

/// Runs the library unit tests and the miri test suite under miri.
#[derive(FromArgs, Default)]
#[argh(subcommand, name = "miri")]
pub struct MiriCommand {}

impl Prepare for MiriCommand {
    fn prepare<'a>(&self, sh: &'a xshell::Shell, _flags: Flag) -> Vec<PreparedCommand<'a>> {
        vec![PreparedCommand::new::<Self>(
            cmd!(sh, "cargo +nightly miri test --lib --test miri"),
            "Please fix undefined behavior reported in output above.",
        )
        .with_env_var("MIRIFLAGS", "-Zmiri-many-seeds=0..4")]
    }
}
