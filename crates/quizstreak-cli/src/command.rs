use anyhow::{anyhow, bail, Context, Result};
use quizstreak_core::Surface;

pub const USAGE: &str = "\
Usage: quizstreak <command>

Commands:
  login <token>                     Store a session token and verify it
  logout                            Forget the session token
  status                            Verify the stored session
  goal [n]                          Show or set the daily question goal
  scroll [pyq|pyqreel]              Count one practiced question
  answer <correct|wrong> [surface]  Record an answer
  stats                             Print today's combined stats as JSON
  watch                             Keep the session refreshed until Ctrl-C";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Status,
    Goal(Option<u32>),
    Scroll(Surface),
    Answer { correct: bool, surface: Surface },
    Stats,
    Watch,
    Help,
}

fn surface_arg(arg: Option<String>) -> Result<Surface> {
    match arg {
        Some(s) => Ok(s.parse()?),
        None => Ok(Surface::default()),
    }
}

impl Command {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "login" => {
                let token = args.next().ok_or_else(|| anyhow!("login needs a token"))?;
                Command::Login(token)
            }
            "logout" => Command::Logout,
            "status" => Command::Status,
            "goal" => match args.next() {
                Some(n) => Command::Goal(Some(
                    n.parse().with_context(|| format!("'{}' is not a number", n))?,
                )),
                None => Command::Goal(None),
            },
            "scroll" => Command::Scroll(surface_arg(args.next())?),
            "answer" => {
                let correct = match args.next().as_deref() {
                    Some("correct") | Some("right") => true,
                    Some("wrong") | Some("incorrect") => false,
                    _ => bail!("answer needs 'correct' or 'wrong'"),
                };
                Command::Answer {
                    correct,
                    surface: surface_arg(args.next())?,
                }
            }
            "stats" => Command::Stats,
            "watch" => Command::Watch,
            "help" | "-h" | "--help" => Command::Help,
            other => bail!("unknown command '{}'", other),
        };

        if let Some(extra) = args.next() {
            bail!("unexpected argument '{}'", extra);
        }
        Ok(command)
    }
}
