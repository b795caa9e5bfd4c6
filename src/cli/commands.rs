use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("atesto")
        .about("Credential issuance and bearer token service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ATESTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("signing-key")
                .short('k')
                .long("signing-key")
                .help("Symmetric key used to sign and verify bearer tokens")
                .env("ATESTO_SIGNING_KEY")
                .required(true),
        )
        .arg(
            Arg::new("token-ttl")
                .long("token-ttl")
                .help("Bearer token lifetime in seconds")
                .default_value("3600")
                .env("ATESTO_TOKEN_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("cache-ttl")
                .long("cache-ttl")
                .help("Verification cache entry lifetime in seconds")
                .default_value("30")
                .env("ATESTO_CACHE_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("deferred-hashing")
                .long("deferred-hashing")
                .help(
                    "Hash registration secrets on a background worker pool; \
                     the account becomes visible once its worker commits",
                )
                .env("ATESTO_DEFERRED_HASHING")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("hash-workers")
                .long("hash-workers")
                .help("Hashing worker threads, 0 = available parallelism")
                .default_value("0")
                .env("ATESTO_HASH_WORKERS")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("queue-depth")
                .long("queue-depth")
                .help("Bounded depth of the deferred hashing queue")
                .default_value("1024")
                .env("ATESTO_QUEUE_DEPTH")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ATESTO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
