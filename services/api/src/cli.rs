use crate::demo::{run_demo, DemoArgs};
use crate::server;
use campaign_desk::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Campaign Desk",
    about = "Run the creator campaign coordinator or walk through a scripted demo",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run an end-to-end CLI demo of a campaign from intake to verified upload
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Do not start the chat room reaper in this process
    #[arg(long)]
    pub(crate) no_reaper: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["campaign-desk"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_overrides_parse() {
        let cli = Cli::try_parse_from([
            "campaign-desk",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--no-reaper",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
                assert!(args.no_reaper);
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }

    #[test]
    fn demo_accepts_inventory_override() {
        let cli = Cli::try_parse_from(["campaign-desk", "demo", "--inventory", "3"])
            .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert_eq!(args.inventory, 3),
            other => panic!("expected demo command, got {other:?}"),
        }
    }
}
