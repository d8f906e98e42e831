use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use debugger::{Action, ClientConfig, Session, SessionHandle};
use tracing_subscriber::filter::EnvFilter;
use transport::{DEFAULT_DAP_PORT, io::TcpTransport, types::Source};

mod console;

use console::ConsoleRenderer;

const HELP: &str = "\
commands:
  start                 connect to the adapter and launch the program
  stop                  end the debug session
  restart               stop and start again
  n, next               step over on the current thread
  c, continue           resume the current thread
  b, break <line>       toggle a breakpoint in the current file
  open <reference>      expand a variable
  close <reference>     collapse a variable
  file <path>           change the current file
  q, quit               exit";

#[derive(Debug, Parser)]
#[command(version, about = "Drive a debug adapter from the terminal")]
struct Args {
    /// Host the debug adapter listens on
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    #[clap(short, long, default_value_t = DEFAULT_DAP_PORT)]
    port: u16,

    /// Client configuration, defaults to the per-user config file if present
    #[clap(long)]
    config: Option<PathBuf>,

    /// Program to launch, overriding `program` in the launch arguments
    #[clap(long)]
    program: Option<PathBuf>,

    /// File breakpoint lines refer to
    #[clap(short, long)]
    file: Option<PathBuf>,

    /// Breakpoint lines in the current file
    #[clap(short, long = "breakpoint")]
    breakpoints: Vec<i64>,

    #[clap(long, default_value = "dap-client.log")]
    log_file: PathBuf,
}

#[derive(Debug, PartialEq)]
enum Input {
    Action(Action),
    File(PathBuf),
    Help,
    Quit,
    Empty,
}

fn parse_number(command: &str, arg: Option<&str>) -> eyre::Result<i64> {
    let arg = arg.ok_or_else(|| eyre::eyre!("{command} needs a number"))?;
    arg.parse()
        .wrap_err_with(|| format!("invalid number for {command}: '{arg}'"))
}

fn parse_input(line: &str) -> eyre::Result<Input> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Input::Empty);
    };
    let arg = words.next();

    let input = match command {
        "start" => Input::Action(Action::Start),
        "stop" => Input::Action(Action::Stop),
        "restart" => Input::Action(Action::Restart),
        "n" | "next" => Input::Action(Action::StepOver),
        "c" | "continue" => Input::Action(Action::Continue),
        "b" | "break" => Input::Action(Action::Breakpoint {
            line: parse_number(command, arg)?,
        }),
        "open" => Input::Action(Action::OpenVariable {
            reference: parse_number(command, arg)?,
        }),
        "close" => Input::Action(Action::CloseVariable {
            reference: parse_number(command, arg)?,
        }),
        "file" => {
            let path = arg.ok_or_else(|| eyre::eyre!("file needs a path"))?;
            Input::File(PathBuf::from(path))
        }
        "h" | "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        other => eyre::bail!("unknown command '{other}', try 'help'"),
    };
    Ok(input)
}

/// Forward stdin commands to the session until quit or end of input.
fn read_commands(handle: SessionHandle) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "reading stdin");
                break;
            }
        };
        let delivered = match parse_input(&line) {
            Ok(Input::Action(action)) => handle.dispatch(action),
            Ok(Input::File(path)) => handle.change_file(Source::from_path(path)),
            Ok(Input::Help) => {
                println!("{HELP}");
                true
            }
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => true,
            Err(e) => {
                eprintln!("{e}");
                true
            }
        };
        if !delivered {
            tracing::debug!("session has shut down");
            return;
        }
    }
    handle.shutdown();
}

fn load_config(path: Option<&PathBuf>) -> eyre::Result<ClientConfig> {
    if let Some(path) = path {
        return ClientConfig::from_path(path);
    }
    match ClientConfig::default_path().filter(|p| p.is_file()) {
        Some(path) => ClientConfig::from_path(path),
        None => Ok(ClientConfig::default()),
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install().wrap_err("installing color_eyre")?;
    let args = Args::parse();

    let log_file = std::fs::File::create(&args.log_file)
        .wrap_err_with(|| format!("creating log file {}", args.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(log_file))
        .init();
    tracing::debug!(?args, "parsed command line arguments");

    let mut config = load_config(args.config.as_ref()).wrap_err("loading configuration")?;
    if let Some(program) = &args.program {
        match config.launch.as_object_mut() {
            Some(launch) => {
                launch.insert("program".to_string(), serde_json::json!(program));
            }
            None => eyre::bail!("launch arguments in the configuration must be an object"),
        }
    }

    let current_file = args
        .file
        .clone()
        .or_else(|| args.program.clone())
        .map(Source::from_path)
        .unwrap_or_default();
    let transport = TcpTransport::new(format!("{}:{}", args.address, args.port));
    let mut session = Session::new(transport, ConsoleRenderer, config, current_file);
    for line in args.breakpoints {
        session.dispatch(Action::Breakpoint { line });
    }

    let handle = session.handle();
    std::thread::spawn(move || read_commands(handle));

    println!("{HELP}");
    session.run();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_actions() {
        assert_eq!(parse_input("start").unwrap(), Input::Action(Action::Start));
        assert_eq!(parse_input(" n ").unwrap(), Input::Action(Action::StepOver));
        assert_eq!(
            parse_input("break 12").unwrap(),
            Input::Action(Action::Breakpoint { line: 12 })
        );
        assert_eq!(
            parse_input("open 33").unwrap(),
            Input::Action(Action::OpenVariable { reference: 33 })
        );
        assert_eq!(
            parse_input("file /tmp/app.py").unwrap(),
            Input::File(PathBuf::from("/tmp/app.py"))
        );
        assert_eq!(parse_input("").unwrap(), Input::Empty);
        assert_eq!(parse_input("q").unwrap(), Input::Quit);
    }

    #[test]
    fn reject_bad_input() {
        assert!(parse_input("b").is_err());
        assert!(parse_input("b twelve").is_err());
        assert!(parse_input("jump 3").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "dap-client",
            "--port",
            "5679",
            "--file",
            "main.py",
            "-b",
            "3",
            "-b",
            "10",
        ])
        .unwrap();
        assert_eq!(args.port, 5679);
        assert_eq!(args.breakpoints, vec![3, 10]);
        assert_eq!(args.address, "127.0.0.1");
    }
}
