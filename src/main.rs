use romdump::dump;
use romdump::rom::RomClass;

use clap::{App, Arg};
use std::fs;
use std::io;

fn main() -> Result<(), dump::Error> {
    env_logger::init();

    let matches = App::new("ROM class dumper")
        .version("0.1.0")
        .about("Dumps and queries the byte layout of ROM class images")
        .arg(
            Arg::with_name("xml")
                .long("xml")
                .help("Emit an XML document instead of the linear dump"),
        )
        .arg(
            Arg::with_name("threshold")
                .long("threshold")
                .short("t")
                .value_name("DEPTH")
                .help("Section nesting depth beyond which the linear dump collapses")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("query")
                .long("query")
                .short("q")
                .value_name("QUERIES")
                .help("Comma-separated /name[index] path queries instead of a full dump")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("base address")
                .long("base-address")
                .value_name("ADDR")
                .help("Display addresses relative to this base (0x-prefixed hex, or decimal)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("ROM class image file to read")
                .required(true)
                .index(1),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let base_address = match matches.value_of("base address") {
        Some(text) => parse_address(text).ok_or_else(|| invalid(format!("invalid base address '{}'", text)))?,
        None => 0,
    };
    let threshold: u32 = match matches.value_of("threshold") {
        Some(text) => text
            .parse()
            .map_err(|_| invalid(format!("invalid threshold '{}'", text)))?,
        None => 1,
    };

    log::info!("Reading '{}'", input);
    let bytes = fs::read(input).map_err(dump::Error::Io)?;
    let class = RomClass::new(&bytes).map_err(|err| invalid(err.to_string()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(queries) = matches.value_of("query") {
        dump::query_batch(&class, base_address, queries, &(), &mut out)
    } else if matches.is_present("xml") {
        dump::xml(&class, &(), &mut out)
    } else {
        dump::linear(&class, base_address, threshold, &(), &mut out)
    }
}

fn invalid(message: String) -> dump::Error {
    dump::Error::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}

fn parse_address(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
