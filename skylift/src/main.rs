use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use skylift_transfer::{model::TransferState, settings::Settings};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization error")]
    Initialization,
}

#[tokio::main]
async fn main() -> ExitCode {
    let logpath = match get_logging_path() {
        Ok(it) => it,
        Err(_) => return ExitCode::FAILURE,
    };

    let logfile = tracing_appender::rolling::daily(logpath, "log");
    tracing_subscriber::fmt()
        .compact()
        .with_writer(logfile)
        .init();

    debug!("starting application");

    let mut settings = Settings::default();
    map_args_to_settings(&cli().get_matches(), &mut settings);

    match skylift_transfer::run(settings).await {
        Ok(report) => {
            debug!("closing application with report: {:?}", report);

            let failed = report.failed();
            if failed > 0 {
                eprintln!("{} of {} items failed", failed, report.states.len());
                ExitCode::FAILURE
            } else if !report.is_completed() {
                eprintln!(
                    "upload stopped, {} items cancelled",
                    report.count(TransferState::Cancelled)
                );
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!("closing application with error: {:?}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command {
    Command::new("skylift")
        .about("skylift - upload files and folders into a bucket via presigned urls")
        .args([
            // NOTE: arguments
            Arg::new("paths")
                .action(ArgAction::Append)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("files and folders to upload"),
            // NOTE: options
            Arg::new("endpoint")
                .long("endpoint")
                .short('e')
                .action(ArgAction::Set)
                .help("base url of the backend issuing upload urls"),
            Arg::new("folder")
                .long("folder")
                .short('f')
                .action(ArgAction::Set)
                .help("destination folder inside the bucket"),
            Arg::new("flat")
                .long("flat")
                .action(ArgAction::SetTrue)
                .default_value("false")
                .help("upload paths as given without descending into folders"),
            Arg::new("settle-delay")
                .long("settle-delay")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64))
                .help("milliseconds to wait after the last transfer before completing"),
        ])
}

fn map_args_to_settings(args: &ArgMatches, settings: &mut Settings) {
    settings.flat = args.get_flag("flat");
    settings.sources = args
        .get_many::<PathBuf>("paths")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    if let Some(endpoint) = args.get_one::<String>("endpoint") {
        settings.endpoint = endpoint.to_owned();
    }

    if let Some(folder) = args.get_one::<String>("folder") {
        settings.destination_folder = folder.to_owned();
    }

    if let Some(delay) = args.get_one::<u64>("settle-delay") {
        settings.batch.settle_delay = Duration::from_millis(*delay);
    }
}

fn get_logging_path() -> Result<String, Error> {
    let cache_dir = match dirs::cache_dir() {
        Some(cache_dir) => match cache_dir.to_str() {
            Some(cache_dir_string) => cache_dir_string.to_string(),
            None => return Err(Error::Initialization),
        },
        None => return Err(Error::Initialization),
    };

    Ok(format!("{}{}", cache_dir, "/skylift/logs"))
}
