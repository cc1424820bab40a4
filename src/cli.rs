use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use xray_db::TextCodec;

#[derive(Parser, Debug)]
#[command(
    name = "xray-db",
    version,
    about = "Build e-reader X-Ray databases from book analysis bundles"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Write(WriteArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Analysis bundle JSON.
    #[arg(long)]
    pub bundle: PathBuf,

    #[arg(long)]
    pub asin: String,

    #[arg(long, default_value = "xray")]
    pub output_dir: PathBuf,

    /// Overrides the bundle's `source_url`.
    #[arg(long)]
    pub source_url: Option<String>,

    /// Overrides the bundle's text codec.
    #[arg(long)]
    pub codec: Option<TextCodec>,

    #[arg(long, default_value_t = false)]
    pub replace: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub db_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands};
    use xray_db::TextCodec;

    #[test]
    fn write_args_parse_codec_override_and_defaults() {
        let cli = Cli::try_parse_from([
            "xray-db",
            "write",
            "--bundle",
            "book.json",
            "--asin",
            "B00ABCDEFG",
            "--codec",
            "cp1252",
        ])
        .expect("write args should parse");

        let Commands::Write(args) = cli.command else {
            panic!("expected write subcommand");
        };
        assert_eq!(args.codec, Some(TextCodec::Cp1252));
        assert_eq!(args.output_dir, std::path::PathBuf::from("xray"));
        assert!(!args.replace);
        assert!(!args.dry_run);
        assert!(args.manifest_path.is_none());
    }

    #[test]
    fn unknown_codec_is_a_usage_error() {
        let result = Cli::try_parse_from([
            "xray-db", "write", "--bundle", "b.json", "--asin", "B00ABCDEFG", "--codec", "koi8",
        ]);
        assert!(result.is_err());
    }
}
