use clap::{crate_version, App, Arg, ArgMatches};
use log::{info, LevelFilter};
use std::io::Write;
use std::path::Path;
use webgen::build::build_site;
use webgen::config::Descriptor;

const DEFAULT_DESCRIPTOR: &str = "descriptor.yaml";

fn app() -> App<'static, 'static> {
    App::new("webgen")
        .version(crate_version!())
        .about("Generates a static site from a YAML descriptor")
        .arg(
            Arg::with_name("descriptor-file")
                .long("descriptor-file")
                .value_name("PATH")
                .help("Path to a file describing how to generate the site")
                .default_value(DEFAULT_DESCRIPTOR)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log-level")
                .short("L")
                .long("log-level")
                .possible_values(&["error", "warn", "info", "debug", "trace", "off"])
                .help("Log level [default: info]")
                .takes_value(true),
        )
}

fn log_level(matches: &ArgMatches) -> LevelFilter {
    match matches.value_of("log-level") {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    // `default_value` guarantees a value
    let path = Path::new(matches.value_of("descriptor-file").unwrap_or(DEFAULT_DESCRIPTOR));
    let descriptor = Descriptor::load(path)?;
    let summary = build_site(&descriptor)?;
    info!(
        "Built {} page(s) and copied {} file(s) into `{}`",
        summary.pages,
        summary.files,
        descriptor.site_directory.display()
    );
    Ok(())
}

fn main() {
    let matches = app().get_matches();

    env_logger::Builder::new()
        .format(|buf, record| {
            let level = format!("[{}]", record.level()).to_lowercase();
            writeln!(buf, "{:8} {}", level, record.args())
        })
        .filter_level(log_level(&matches))
        .init();

    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
