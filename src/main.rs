use chrono::Utc;
use clap::{crate_version, App, AppSettings, Arg, SubCommand};
use postlist::build::build_site;
use postlist::config::Config;
use postlist::logging;
use postlist::post::parse_publish_date;
use std::error::Error;
use std::path::PathBuf;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let matches = App::new("postlist")
        .version(crate_version!())
        .about("Builds a static blog from markdown posts")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Lists published posts and renders the site")
                .arg(
                    Arg::with_name("project")
                        .short("p")
                        .long("project")
                        .takes_value(true)
                        .help("Directory to search (with its parents) for postlist.yaml [default: .]"),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .help("Output directory [default: ./_output]"),
                )
                .arg(
                    Arg::with_name("now")
                        .long("now")
                        .takes_value(true)
                        .help("List posts published before this time instead of the current time"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("build") {
        let cwd = std::env::current_dir()?;
        let project = match matches.value_of("project") {
            Some(dir) => PathBuf::from(dir),
            None => cwd.clone(),
        };
        let output = match matches.value_of("output") {
            Some(dir) => PathBuf::from(dir),
            None => cwd.join("_output"),
        };
        let now = match matches.value_of("now") {
            Some(now) => parse_publish_date(now)?,
            None => Utc::now(),
        };

        let config = Config::from_directory(&project, &output)?;
        logging::init(&config.log_level)?;
        tracing::info!(
            title = %config.title,
            output = %output.display(),
            now = %now.to_rfc3339(),
            "Building site"
        );
        build_site(config, now)?;
    }
    Ok(())
}
