use std::io::{self, Write};
use std::time::Instant;

use file_response::config::{Config, DEFAULT_CONFIG_PATH};
use file_response::http::{RequestHeaders, ResponseWriter};
use file_response::logger::{self, AccessLogEntry};
use file_response::{BufferedResponse, Error, FileResource, HeaderSet, Metadata, ResponseHandler};
use hyper::{Method, StatusCode};

const USAGE: &str = "\
Usage: file-response [OPTIONS] <FILE>

Writes the HTTP/1.1 response for FILE to stdout.

Options:
  -c, --config <PATH>        Config file (default: file-response.toml)
  -X, --method <METHOD>      Request method (default: GET)
  -H, --header <NAME:VALUE>  Request header, repeatable
      --inline               Never send Content-Disposition: attachment
  -h, --help                 Show this help";

/// Parsed command line
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    config: Option<String>,
    method: Option<String>,
    headers: Vec<(String, String)>,
    inline: bool,
    help: bool,
    file: Option<String>,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().ok_or_else(|| format!("{flag} needs a value"));
            match arg.as_str() {
                "-c" | "--config" => parsed.config = Some(value(&arg)?),
                "-X" | "--method" => parsed.method = Some(value(&arg)?),
                "-H" | "--header" => {
                    let header = value(&arg)?;
                    let (name, val) = header
                        .split_once(':')
                        .ok_or_else(|| format!("header {header:?} is not NAME:VALUE"))?;
                    parsed
                        .headers
                        .push((name.trim().to_string(), val.trim().to_string()));
                }
                "--inline" => parsed.inline = true,
                "-h" | "--help" => parsed.help = true,
                flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
                _ if parsed.file.is_some() => return Err(format!("unexpected argument {arg}")),
                _ => parsed.file = Some(arg),
            }
        }

        Ok(parsed)
    }

    fn request_headers(&self) -> Result<HeaderSet, String> {
        let method = self
            .method
            .as_deref()
            .unwrap_or("GET")
            .parse::<Method>()
            .map_err(|e| format!("invalid method: {e}"))?;

        let mut headers = HeaderSet::new().with_method(method);
        for (name, value) in &self.headers {
            if !headers.insert(name, value) {
                return Err(format!("invalid header {name}: {value}"));
            }
        }
        Ok(headers)
    }
}

/// Serialize a buffered response as raw HTTP/1.1
fn write_http(out: &mut impl Write, response: &BufferedResponse) -> io::Result<()> {
    let status = response.status();
    write!(
        out,
        "HTTP/1.1 {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in response.headers() {
        write!(out, "{name}: ")?;
        out.write_all(value.as_bytes())?;
        out.write_all(b"\r\n")?;
    }
    out.write_all(b"\r\n")?;
    out.write_all(response.body_bytes())?;
    out.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) if args.help => {
            println!("{USAGE}");
            return Ok(());
        }
        Ok(CliArgs { file: None, .. }) => {
            eprintln!("missing FILE\n\n{USAGE}");
            std::process::exit(2);
        }
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    let headers = match args.request_headers() {
        Ok(headers) => headers,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let cfg = Config::load_from(args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH))?;
    logger::init(&cfg.logging)?;
    logger::log_debug(&format!("Loaded configuration: {:?}", cfg.response));

    let started = Instant::now();
    let path = args.file.unwrap_or_default();
    let resource = FileResource::new(&path)?
        .with_chunk_size(cfg.response.chunk_size)
        .with_content_tag(cfg.response.content_tag)?
        .with_metadata(Metadata::new().with_max_age(cfg.response.max_age));

    let mut response = BufferedResponse::new();
    let attach = cfg.response.attach && !args.inline;
    match ResponseHandler::new(&headers).send(&resource, &mut response, attach) {
        Ok(_) => {}
        Err(Error::UndefinedResult(msg)) => {
            logger::log_warning(&format!("{path}: {msg}"));
            response = BufferedResponse::new();
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Err(e) => {
            logger::log_error(&format!("{path}: {e}"));
            return Err(e.into());
        }
    }

    write_http(&mut io::stdout().lock(), &response)?;

    if cfg.logging.access_log {
        let mut entry = AccessLogEntry::new(
            headers.method().unwrap_or("GET").to_string(),
            path,
        );
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body_bytes().len() as u64;
        entry.range = headers.get("range").map(str::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &cfg.logging.access_log_format);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        CliArgs::parse(args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&["-X", "HEAD", "-H", "Range: bytes=0-9", "--inline", "video.mp4"]).unwrap();
        assert_eq!(args.method.as_deref(), Some("HEAD"));
        assert_eq!(args.headers, [("Range".to_string(), "bytes=0-9".to_string())]);
        assert!(args.inline);
        assert_eq!(args.file.as_deref(), Some("video.mp4"));

        let headers = args.request_headers().unwrap();
        assert_eq!(headers.method(), Some("HEAD"));
        assert_eq!(headers.get("range"), Some("bytes=0-9"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["-H", "no-colon", "a"]).is_err());
        assert!(parse(&["--verbose", "a"]).is_err());
        assert!(parse(&["a", "b"]).is_err());

        let args = parse(&["-X", "BAD METHOD", "a"]).unwrap();
        assert!(args.request_headers().is_err());
    }

    #[test]
    fn test_write_http() {
        let mut response = BufferedResponse::new();
        response.set_status(StatusCode::RANGE_NOT_SATISFIABLE);
        response.set_header(hyper::header::CONTENT_RANGE, "bytes */200");

        let mut out = Vec::new();
        write_http(&mut out, &response).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 416 Range Not Satisfiable\r\ncontent-range: bytes */200\r\n\r\n"
        );
    }
}
