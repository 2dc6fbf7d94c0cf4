use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use phish_sentry::config::EngineConfig;
use phish_sentry::config_loader::write_default_rules;
use phish_sentry::report::Reportable;
use phish_sentry::{EmailInput, Engine, SmsInput};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

fn main() {
    let matches = Command::new("phish-sentry")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Heuristic phishing risk scoring for URLs, emails and SMS messages")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("URL to analyze")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("email-sender")
                .long("email-sender")
                .value_name("ADDRESS")
                .help("Sender address of an email to analyze")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("email-subject")
                .long("email-subject")
                .value_name("TEXT")
                .help("Subject line of the email")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("email-body")
                .long("email-body")
                .value_name("TEXT")
                .help("Body text of the email")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("attachment")
                .long("attachment")
                .value_name("FILENAME")
                .help("Attachment filename (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("sms-sender")
                .long("sms-sender")
                .value_name("LABEL")
                .help("Sender label of an SMS to analyze")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("sms-number")
                .long("sms-number")
                .value_name("NUMBER")
                .help("Sender phone number of the SMS")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("sms-body")
                .long("sms-body")
                .value_name("TEXT")
                .help("Message text of the SMS")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("rules-dir")
                .short('r')
                .long("rules-dir")
                .value_name("DIR")
                .help("Directory containing url_rules.json, email_rules.json and sms_rules.json")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (defaults to ./phish-sentry.toml if present)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-rules")
                .long("generate-rules")
                .value_name("DIR")
                .help("Write the built-in rule files to DIR and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("record")
                .long("record")
                .help("Print the scan record handed to storage instead of the full analysis")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.logging.level_filter()
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if let Some(dir) = matches.get_one::<String>("generate-rules") {
        match write_default_rules(&PathBuf::from(dir)) {
            Ok(paths) => {
                for path in paths {
                    println!("Default rules written to: {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Error writing rule files: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let rules_dir = matches
        .get_one::<String>("rules-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.rules.dir.clone());
    log::debug!("Using rules directory {}", rules_dir.display());
    let engine = Engine::from_rules_dir(rules_dir);
    let as_record = matches.get_flag("record");
    let mut analyzed = false;

    if let Some(url) = matches.get_one::<String>("url") {
        emit(&engine.analyze_url(url), as_record);
        analyzed = true;
    }

    if let Some(input) = email_input(&matches) {
        emit(&engine.analyze_email(&input), as_record);
        analyzed = true;
    }

    if let Some(input) = sms_input(&matches) {
        emit(&engine.analyze_sms(&input), as_record);
        analyzed = true;
    }

    if !analyzed {
        eprintln!("Nothing to analyze: pass --url, --email-* or --sms-* (see --help)");
        process::exit(2);
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<EngineConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::load_or_default(EngineConfig::default_path()),
    }
}

fn text_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn email_input(matches: &ArgMatches) -> Option<EmailInput> {
    let attachments: Vec<String> = matches
        .get_many::<String>("attachment")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let sender = text_arg(matches, "email-sender");
    let subject = text_arg(matches, "email-subject");
    let body = text_arg(matches, "email-body");

    if sender.is_none() && subject.is_none() && body.is_none() && attachments.is_empty() {
        return None;
    }

    Some(EmailInput {
        sender: sender.unwrap_or_default(),
        subject: subject.unwrap_or_default(),
        body: body.unwrap_or_default(),
        attachments,
    })
}

fn sms_input(matches: &ArgMatches) -> Option<SmsInput> {
    let sender = text_arg(matches, "sms-sender");
    let number = text_arg(matches, "sms-number");
    let content = text_arg(matches, "sms-body");

    if sender.is_none() && number.is_none() && content.is_none() {
        return None;
    }

    Some(SmsInput {
        sender: sender.unwrap_or_default(),
        number: number.unwrap_or_default(),
        content: content.unwrap_or_default(),
    })
}

fn emit<T: Serialize + Reportable>(analysis: &T, as_record: bool) {
    let rendered = if as_record {
        serde_json::to_string_pretty(&analysis.to_record())
    } else {
        serde_json::to_string_pretty(analysis)
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing result: {e}");
            process::exit(1);
        }
    }
}
