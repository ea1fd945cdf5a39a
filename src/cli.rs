use std::path::PathBuf;

use anyhow::{bail, Result};

#[derive(Debug, PartialEq)]
pub enum Command {
    Run {
        config: Option<PathBuf>,
        image: Option<PathBuf>,
    },
    Version,
    Help,
}

pub const USAGE: &str = "Usage: clicktally [--config <settings.json>] [--version] [image]";

/// Parses `argv`, program name included.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut config = None;
    let mut image = None;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--config" | "-c" => match rest.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config needs a file argument"),
            },
            other if other.starts_with('-') => bail!("unknown option {other}"),
            other => {
                if image.is_some() {
                    bail!("only one image can be opened at a time");
                }
                image = Some(PathBuf::from(other));
            }
        }
    }
    Ok(Command::Run { config, image })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("clicktally")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_arguments_asks_for_an_image() {
        assert_eq!(
            parse_args(&argv(&[])).unwrap(),
            Command::Run {
                config: None,
                image: None
            }
        );
    }

    #[test]
    fn image_and_config() {
        assert_eq!(
            parse_args(&argv(&["--config", "tally.json", "cells.png"])).unwrap(),
            Command::Run {
                config: Some(PathBuf::from("tally.json")),
                image: Some(PathBuf::from("cells.png")),
            }
        );
    }

    #[test]
    fn version_wins() {
        assert_eq!(parse_args(&argv(&["a.png", "--version"])).unwrap(), Command::Version);
    }

    #[test]
    fn bad_arguments() {
        assert!(parse_args(&argv(&["--config"])).is_err());
        assert!(parse_args(&argv(&["--frobnicate"])).is_err());
        assert!(parse_args(&argv(&["a.png", "b.png"])).is_err());
    }
}
