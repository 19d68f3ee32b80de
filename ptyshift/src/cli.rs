use clap::{ArgAction, Parser, crate_version};
use std::ffi::OsString;

pub const AUTHOR_LINE: &str = " by the ptyshift developers";
pub const PROJECT_URL: &str = "https://github.com/ptyshift/ptyshift";

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(
    name = "ptyshift",
    color = clap::ColorChoice::Auto,
    disable_version_flag = true,
    disable_help_flag = true,
    dont_delimit_trailing_values = true,
    override_usage = "ptyshift [-s] [-T] [-V] PID\n       ptyshift -l|-L [COMMAND [ARGS]]",
    about = format!("ptyshift {}: reparent a running program to a new terminal", crate_version!())
)]
pub struct Cli {
    #[arg(
        short = 'l',
        help = "Create a new pty pair and print the name of the slave.",
        long_help = "Create a new pty pair and print the name of the slave. \
                     If there are command-line arguments after -l they are executed \
                     with PTYSHIFT_PTY set to the path of the pty."
    )]
    pub create: bool,

    #[arg(short = 'L', help = "Like -l, but also redirect the child's stdio to the slave.")]
    pub create_redirected: bool,

    #[arg(short = 's', help = "Attach fds 0-2 on the target, even if it is not attached to a tty.")]
    pub force_stdio: bool,

    #[arg(
        short = 'T',
        help = "Steal the entire terminal session of the target.",
        long_help = "Steal the entire terminal session of the target. [experimental] \
                     May be more reliable, and will attach all processes running on the terminal."
    )]
    pub steal: bool,

    #[arg(short = 'v', help = "Print the version number and exit.")]
    pub version: bool,

    #[arg(short = 'V', help = "Print verbose debug output.")]
    pub verbose: bool,

    #[arg(short = 'h', action = ArgAction::Help, help = "Print this help message and exit.")]
    pub help: Option<bool>,

    /// PID to attach to, or with -l/-L the command to launch.
    #[arg(
        value_name = "PID | COMMAND",
        trailing_var_arg = true,
        allow_negative_numbers = true,
        num_args = 0..
    )]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse `argv`, where `-l` or `-L` ends option parsing.
    ///
    /// Everything after the first `-l`/`-L` (alone or closing a cluster such
    /// as `-sL`) is the command to launch, even if it looks like a flag.
    pub fn try_parse_args<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        match command_split(&argv) {
            Some(at) => {
                let mut cli = Self::try_parse_from(&argv[..at])?;
                cli.args = argv[at..]
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect();
                Ok(cli)
            }
            None => Self::try_parse_from(argv),
        }
    }
}

/// Index of the first command word, if a creation flag ends the options.
fn command_split(argv: &[OsString]) -> Option<usize> {
    for (index, arg) in argv.iter().enumerate().skip(1) {
        let arg = arg.to_str()?;
        if arg == "--" {
            return None;
        }
        let Some(cluster) = arg.strip_prefix('-') else {
            // First positional: a pid, so nothing is launched.
            return None;
        };
        if cluster.is_empty() {
            return None;
        }
        if cluster.ends_with(['l', 'L']) {
            return Some(index + 1);
        }
    }
    None
}

pub fn version_text() -> String {
    format!(
        "This is ptyshift version {}.\n{AUTHOR_LINE}\n{PROJECT_URL}\n",
        crate_version!()
    )
}
