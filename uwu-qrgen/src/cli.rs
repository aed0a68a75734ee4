use crate::error::QrgenError;
use crate::page::{self, StructuredAppend};
use clap::Parser;
use log::debug;
use std::ffi::OsString;
use std::path::PathBuf;

const USAGE_NOTES: &str = "\
Usage:
  1. Arguments except for flags are joined by \" \" and used to generate QR code.
     Default output is STDOUT, pipe to imagemagick command \"display\" to display
     on any X server.

       uwu-qrgen hello word | display

  2. Save to file if \"display\" not available:

       uwu-qrgen \"homepage: https://example.com\" > out.png
";

#[derive(Parser, Debug)]
#[command(name = "uwu-qrgen")]
#[command(about = "🌸 「simple and cute qr code generator」 🌸")]
#[command(after_help = USAGE_NOTES)]
struct Cli {
    #[arg(
        short = 'o',
        long,
        value_name = "PREFIX",
        default_value = "",
        allow_hyphen_values = true,
        help = "out PNG file prefix, empty for stdout"
    )]
    output: String,

    #[arg(
        short = 's',
        long,
        value_name = "PIXELS",
        default_value_t = 256,
        allow_negative_numbers = true,
        help = "image size (pixel), negative for pixels per module"
    )]
    size: i32,

    #[arg(short = 't', long, help = "print as text-art on stdout")]
    text_art: bool,

    #[arg(short = 'i', long, help = "invert black and white")]
    invert: bool,

    #[arg(
        short = 'p',
        long,
        value_name = "CURRENT/LAST:PARITY",
        default_value = "",
        allow_hyphen_values = true,
        help = "structured append mode, e.g. '2/3:0x11'. current and last must be 1 to 16, \
                parity can be decimal or hex (with 0x prefix), 0 to 255"
    )]
    page: String,

    // flag parsing stops at the first word, the rest is all content
    #[arg(value_name = "CONTENT", required = true, num_args = 1.., trailing_var_arg = true)]
    content: Vec<String>,
}

/// What to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub content: String,
    pub page: Option<StructuredAppend>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn from_prefix(prefix: &str) -> Self {
        if prefix.is_empty() {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(format!("{}.png", prefix)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub text_art: bool,
    pub invert: bool,
    pub size: i32,
}

/// Everything one run of the tool needs, built from its argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub request: RenderRequest,
    pub target: OutputTarget,
    pub options: RenderOptions,
}

impl Invocation {
    pub fn from_args<I, T>(args: I) -> Result<Self, QrgenError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        debug!("parsed command line: {:?}", cli);

        let request = RenderRequest {
            content: cli.content.join(" "),
            page: page::parse_page(&cli.page)?,
        };

        Ok(Self {
            request,
            target: OutputTarget::from_prefix(&cli.output),
            options: RenderOptions {
                text_art: cli.text_art,
                invert: cli.invert,
                size: cli.size,
            },
        })
    }
}
