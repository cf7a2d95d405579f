use std::{error::Error, fs, path::PathBuf, time::Duration};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use der::{pem::LineEnding, EncodePem};
use pretty_hex::simple_hex;
use tracing_subscriber::EnvFilter;
use tsclient::{
    config::VERSION,
    nonce,
    utils::parse_hex,
    ClientConfig, ClientIdentity, DigestAlgorithm, HttpCredentials, Request, TimeStampClient,
    TimestampToken, TspError, TspErrorKind, UserCredentials,
};

fn cli() -> Command {
    Command::new("tsclient")
        .version(VERSION)
        .about("Requests an RFC 3161 time-stamp token for a file.")
        .arg(
            Arg::new("file")
                .long("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("File to time-stamp"),
        )
        .arg(
            Arg::new("tsa")
                .long("tsa")
                .required(true)
                .help("TSA address (http://, https:// or tcp://)"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Where to write the token"),
        )
        .arg(
            Arg::new("hash")
                .long("hash")
                .default_value("sha256")
                .value_parser(["md5", "sha1", "sha256", "sha512"])
                .ignore_case(true)
                .help("Digest algorithm"),
        )
        .arg(Arg::new("policy").long("policy").help("Requested TSA policy OID"))
        .arg(
            Arg::new("nonce")
                .long("nonce")
                .help("Nonce as a hex string, e.g. 1234567890ABCDEF"),
        )
        .arg(
            Arg::new("random-nonce")
                .long("random-nonce")
                .action(ArgAction::SetTrue)
                .conflicts_with("nonce")
                .help("Send a freshly generated random nonce"),
        )
        .arg(
            Arg::new("cert-req")
                .long("cert-req")
                .action(ArgAction::SetTrue)
                .help("Ask the TSA to embed its certificate"),
        )
        .arg(
            Arg::new("ssl-client-cert-file")
                .long("ssl-client-cert-file")
                .value_parser(value_parser!(PathBuf))
                .requires("ssl-client-cert-pass")
                .help("PKCS#12 client certificate for TLS"),
        )
        .arg(
            Arg::new("ssl-client-cert-pass")
                .long("ssl-client-cert-pass")
                .help("Password of the client certificate"),
        )
        .arg(
            Arg::new("http-auth-login")
                .long("http-auth-login")
                .requires("http-auth-pass")
                .help("HTTP basic authentication user"),
        )
        .arg(
            Arg::new("http-auth-pass")
                .long("http-auth-pass")
                .help("HTTP basic authentication password"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .help("Timeout in seconds"),
        )
        .arg(
            Arg::new("pem")
                .long("pem")
                .action(ArgAction::SetTrue)
                .help("Write the token PEM encoded instead of DER"),
        )
}

fn credentials(matches: &ArgMatches) -> Result<Option<UserCredentials>, Box<dyn Error>> {
    let mut credentials = UserCredentials::default();

    if let Some(path) = matches.get_one::<PathBuf>("ssl-client-cert-file") {
        let password = matches
            .get_one::<String>("ssl-client-cert-pass")
            .cloned()
            .unwrap_or_default();
        credentials = credentials.with_client_identity(ClientIdentity::from_file(path, password)?);
    }

    if let Some(login) = matches.get_one::<String>("http-auth-login") {
        let password = matches
            .get_one::<String>("http-auth-pass")
            .cloned()
            .unwrap_or_default();
        credentials = credentials.with_http(HttpCredentials::new(login, password));
    }

    Ok((!credentials.is_empty()).then_some(credentials))
}

fn print_token(token: &TimestampToken) {
    let imprint = token.message_imprint();

    println!("serial:    {}", simple_hex(&token.serial_number()));
    println!("gen time:  {}", token.gen_time().to_rfc3339());
    println!("policy:    {}", token.policy_oid());
    let algorithm = imprint
        .algorithm()
        .map_or_else(|| imprint.hash_algorithm_oid(), |algorithm| algorithm.to_string());
    println!("imprint:   {} {}", algorithm, simple_hex(&imprint.hashed_message()));
    if let Some(nonce) = token.nonce() {
        println!("nonce:     {}", simple_hex(&nonce));
    }
    if let Some(accuracy) = token.accuracy() {
        println!("accuracy:  {:?}", accuracy.to_duration());
    }
    println!("ordering:  {}", token.ordering());
    if let Some(tsa_name) = token.tsa_name() {
        println!("tsa name:  {}", tsa_name);
    }

    let identity = token.tsa_identity();
    if !identity.issuer_name.is_empty() {
        println!("issuer:    {}", identity.issuer_name);
        println!("cert sn:   {}", simple_hex(&identity.serial_number));
    }
    if let Some(key_id) = &identity.subject_key_identifier {
        println!("key id:    {}", simple_hex(key_id));
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let file = matches
        .get_one::<PathBuf>("file")
        .ok_or("--file is required")?;
    let out = matches.get_one::<PathBuf>("out").ok_or("--out is required")?;
    let tsa = matches.get_one::<String>("tsa").ok_or("--tsa is required")?;
    let algorithm: DigestAlgorithm = matches
        .get_one::<String>("hash")
        .map(|name| name.parse())
        .transpose()?
        .unwrap_or_default();
    let nonce = match matches.get_one::<String>("nonce") {
        Some(nonce) => Some(parse_hex(nonce)?),
        None if matches.get_flag("random-nonce") => Some(nonce::generate()),
        None => None,
    };

    let digest = tsclient::digest_file(file, algorithm)?;
    let request = Request::build(
        &digest,
        algorithm,
        nonce.as_deref(),
        matches.get_one::<String>("policy").map(String::as_str),
        matches.get_flag("cert-req"),
    )?;

    let mut config = ClientConfig::default();
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*seconds));
    }
    let mut client = TimeStampClient::new(tsa.as_str()).with_config(config);
    if let Some(credentials) = credentials(matches)? {
        client = client.with_credentials(credentials);
    }

    let token = client.request(&request)?;

    if matches.get_flag("pem") {
        fs::write(out, token.to_pem(LineEnding::LF)?)?;
    } else {
        fs::write(out, token.to_bytes()?)?;
    }

    print_token(&token);
    println!("token written to {}", out.display());

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    if let Err(err) = run(&matches) {
        let kind = err.downcast_ref::<TspError>().map(|err| &err.kind);
        if let Some(TspErrorKind::RejectedStatus {
            status_string,
            failure_info,
            ..
        }) = kind
        {
            if let Some(status_string) = status_string {
                eprintln!("status string: {}", status_string);
            }
            if let Some(failure_info) = failure_info {
                eprintln!("failure info:  {}", failure_info);
            }
        }
        return Err(err);
    }

    Ok(())
}
