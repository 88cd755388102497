//! The interactive command loop.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use anyhow::Result;
use ascii_density::{
    ActiveCharset, AsciiError, ConversionPipeline, PixelGrid, ResolutionBounds, RoundingPolicy,
    FIRST_PRINTABLE, LAST_PRINTABLE,
};
use log::{debug, warn};

use crate::config::ShellConfig;
use crate::output::{render_console, HtmlOutput, OutputMethod};

pub const PROMPT: &str = ">>> ";

/// Characters named by an `add` or `remove` argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CharsetSpec {
    All,
    Single(char),
    /// Inclusive, bounds in either order.
    Range(char, char),
}

impl FromStr for CharsetSpec {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => return Ok(CharsetSpec::All),
            "space" => return Ok(CharsetSpec::Single(' ')),
            _ => (),
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(c), None, ..) => Ok(CharsetSpec::Single(c)),
            (Some(a), Some('-'), Some(b), None) => Ok(CharsetSpec::Range(a, b)),
            _ => Err(()),
        }
    }
}

impl CharsetSpec {
    /// The named characters in ascending order.
    pub fn chars(self) -> Vec<char> {
        match self {
            CharsetSpec::All => (FIRST_PRINTABLE..=LAST_PRINTABLE).map(char::from).collect(),
            CharsetSpec::Single(c) => vec![c],
            CharsetSpec::Range(a, b) => (a.min(b)..=a.max(b)).collect(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolutionChange {
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Chars,
    Add(CharsetSpec),
    Remove(CharsetSpec),
    /// `None` only reports the current resolution.
    Resolution(Option<ResolutionChange>),
    Round(RoundingPolicy),
    Output(OutputMethod),
    AsciiArt,
}

/// A command that was rejected; the display text is what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Did not execute due to incorrect command.")]
    UnknownCommand,
    #[error("Did not add due to incorrect format.")]
    AddFormat,
    #[error("Did not remove due to incorrect format.")]
    RemoveFormat,
    #[error("Did not change resolution due to incorrect format.")]
    ResolutionFormat,
    #[error("Did not change resolution due to exceeding boundaries.")]
    ResolutionBoundaries,
    #[error("Did not change rounding method due to incorrect format.")]
    RoundFormat,
    #[error("Did not change output method due to incorrect format.")]
    OutputFormat,
    #[error("Did not execute. Charset is too small.")]
    CharsetTooSmall,
    #[error("Did not execute. Resolution does not fit the image.")]
    ResolutionMismatch,
    #[error("Did not execute. Unable to write output: {0}")]
    Output(#[source] io::Error),
    #[error("Did not execute. {0}")]
    Conversion(#[source] AsciiError),
}

impl From<AsciiError> for CommandError {
    fn from(err: AsciiError) -> Self {
        match err {
            AsciiError::CharsetTooSmall { .. } => CommandError::CharsetTooSmall,
            AsciiError::ResolutionNotDivisible { .. } | AsciiError::TileExceedsHeight { .. } => {
                CommandError::ResolutionMismatch
            },
            AsciiError::ResolutionOutOfBounds { .. } => CommandError::ResolutionBoundaries,
            err => CommandError::Conversion(err),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let args: Vec<&str> = line.split(' ').collect();
        match args[0] {
            "exit" => Ok(Command::Exit),
            "chars" => Ok(Command::Chars),
            "add" => charset_arg(&args).map(Command::Add).ok_or(CommandError::AddFormat),
            "remove" => charset_arg(&args).map(Command::Remove).ok_or(CommandError::RemoveFormat),
            "res" => match args.get(1) {
                None => Ok(Command::Resolution(None)),
                Some(&"up") => Ok(Command::Resolution(Some(ResolutionChange::Up))),
                Some(&"down") => Ok(Command::Resolution(Some(ResolutionChange::Down))),
                Some(_) => Err(CommandError::ResolutionFormat),
            },
            "round" => match args.get(1) {
                Some(&"abs") => Ok(Command::Round(RoundingPolicy::Abs)),
                Some(&"up") => Ok(Command::Round(RoundingPolicy::Up)),
                Some(&"down") => Ok(Command::Round(RoundingPolicy::Down)),
                _ => Err(CommandError::RoundFormat),
            },
            "output" => match args[..] {
                [_, method] => {
                    method.parse().map(Command::Output).map_err(|_| CommandError::OutputFormat)
                },
                _ => Err(CommandError::OutputFormat),
            },
            "asciiArt" => Ok(Command::AsciiArt),
            _ => Err(CommandError::UnknownCommand),
        }
    }
}

fn charset_arg(args: &[&str]) -> Option<CharsetSpec> {
    args.get(1).and_then(|arg| arg.parse().ok())
}

/// What the loop should do after a command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Session state for one loaded image.
#[derive(Debug)]
pub struct Shell {
    image: PixelGrid,
    bounds: ResolutionBounds,
    resolution: u32,
    charset: ActiveCharset,
    pipeline: ConversionPipeline,
    output: OutputMethod,
    html: HtmlOutput,
}

impl Shell {
    pub fn new(image: PixelGrid, config: &ShellConfig) -> Result<Self> {
        let bounds = ResolutionBounds::for_grid(&image);
        let mut resolution = config.resolution;
        if !bounds.contains(resolution) {
            let clamped = resolution.clamp(bounds.min, bounds.max);
            warn!(
                "resolution {resolution} outside [{}, {}] for this image, using {clamped}",
                bounds.min, bounds.max
            );
            resolution = clamped;
        }

        let mut charset = ActiveCharset::new(config.charset_spec()?.chars())?;
        charset.set_rounding_policy(config.rounding_policy()?);

        Ok(Self {
            image,
            bounds,
            resolution,
            charset,
            pipeline: ConversionPipeline::new(),
            output: config.output,
            html: HtmlOutput::new(config.html_path.clone(), config.font.clone()),
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn charset(&self) -> &ActiveCharset {
        &self.charset
    }

    pub fn output(&self) -> OutputMethod {
        self.output
    }

    /// Read commands until `exit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }

            let request = line.trim_end_matches(['\n', '\r']);
            let outcome = request.parse().and_then(|command| self.execute(command, &mut out));
            match outcome {
                Ok(Flow::Exit) => return Ok(()),
                Ok(Flow::Continue) => (),
                Err(err) => {
                    debug!("rejected {request:?}: {err:?}");
                    writeln!(out, "{err}")?;
                },
            }
        }
    }

    pub fn execute<W: Write>(
        &mut self,
        command: Command,
        out: &mut W,
    ) -> Result<Flow, CommandError> {
        debug!("executing {command:?}");
        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::Chars => {
                let listing: Vec<String> = self.charset.iter().map(String::from).collect();
                writeln!(out, "{}", listing.join(" ")).map_err(CommandError::Output)?;
            },
            Command::Add(spec) => {
                self.apply(spec, true).map_err(|_| CommandError::AddFormat)?;
            },
            Command::Remove(spec) => {
                self.apply(spec, false).map_err(|_| CommandError::RemoveFormat)?;
            },
            Command::Resolution(change) => {
                self.resolution = match change {
                    None => self.resolution,
                    Some(ResolutionChange::Up) => self.bounds.increase(self.resolution)?,
                    Some(ResolutionChange::Down) => self.bounds.decrease(self.resolution)?,
                };
                writeln!(out, "Resolution set to {}", self.resolution)
                    .map_err(CommandError::Output)?;
            },
            Command::Round(policy) => self.charset.set_rounding_policy(policy),
            Command::Output(method) => self.output = method,
            Command::AsciiArt => {
                let art =
                    self.pipeline.convert_active(&self.image, self.resolution, &self.charset)?;
                match self.output {
                    OutputMethod::Console => render_console(&art, out),
                    OutputMethod::Html => self.html.write(&art),
                }
                .map_err(CommandError::Output)?;
            },
        }
        Ok(Flow::Continue)
    }

    fn apply(&mut self, spec: CharsetSpec, add: bool) -> Result<usize, AsciiError> {
        let charset = &mut self.charset;
        let changed = match spec {
            CharsetSpec::All if add => charset.add_all(),
            CharsetSpec::All => charset.remove_all(),
            CharsetSpec::Single(c) if add => usize::from(charset.add(c)?),
            CharsetSpec::Single(c) => usize::from(charset.remove(c)?),
            CharsetSpec::Range(a, b) if add => charset.add_range(a, b)?,
            CharsetSpec::Range(a, b) => charset.remove_range(a, b)?,
        };
        let verb = if add { "added" } else { "removed" };
        debug!("{verb} {changed} characters, {} active", charset.len());
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use ascii_density::Rgb;
    use pretty_assertions::assert_eq;

    use super::*;

    /// 8x4 pixels, black on the left half and white on the right.
    fn split_image() -> PixelGrid {
        PixelGrid::from_fn(8, 4, |_, col| if col < 4 { Rgb::BLACK } else { Rgb::WHITE }).unwrap()
    }

    fn session(image: PixelGrid, config: &ShellConfig, input: &str) -> (Shell, String) {
        let mut shell = Shell::new(image, config).unwrap();
        let mut out = Vec::new();
        shell.run(input.as_bytes(), &mut out).unwrap();
        (shell, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_charset_arguments() {
        assert_eq!("all".parse::<CharsetSpec>(), Ok(CharsetSpec::All));
        assert_eq!("space".parse::<CharsetSpec>(), Ok(CharsetSpec::Single(' ')));
        assert_eq!("-".parse::<CharsetSpec>(), Ok(CharsetSpec::Single('-')));
        assert_eq!("z-a".parse::<CharsetSpec>(), Ok(CharsetSpec::Range('z', 'a')));
        assert_eq!("ab".parse::<CharsetSpec>(), Err(()));
        assert_eq!("a-".parse::<CharsetSpec>(), Err(()));
        assert_eq!("a-bc".parse::<CharsetSpec>(), Err(()));
        assert_eq!("".parse::<CharsetSpec>(), Err(()));
    }

    #[test]
    fn charset_ranges_expand_in_order() {
        assert_eq!(CharsetSpec::Range('c', 'a').chars(), vec!['a', 'b', 'c']);
        assert_eq!(CharsetSpec::All.chars().len(), 95);
    }

    #[test]
    fn parses_commands() {
        let parse = |line: &str| line.parse::<Command>();
        assert!(matches!(parse("exit"), Ok(Command::Exit)));
        assert!(matches!(parse("add a-z"), Ok(Command::Add(CharsetSpec::Range('a', 'z')))));
        assert!(matches!(parse("remove space"), Ok(Command::Remove(CharsetSpec::Single(' ')))));
        assert!(matches!(parse("res"), Ok(Command::Resolution(None))));
        assert!(matches!(
            parse("res down"),
            Ok(Command::Resolution(Some(ResolutionChange::Down)))
        ));
        assert!(matches!(parse("round up"), Ok(Command::Round(RoundingPolicy::Up))));
        assert!(matches!(parse("output html"), Ok(Command::Output(OutputMethod::Html))));
        assert!(matches!(parse("asciiArt"), Ok(Command::AsciiArt)));

        assert!(matches!(parse("add"), Err(CommandError::AddFormat)));
        assert!(matches!(parse("remove abc"), Err(CommandError::RemoveFormat)));
        assert!(matches!(parse("res sideways"), Err(CommandError::ResolutionFormat)));
        assert!(matches!(parse("round"), Err(CommandError::RoundFormat)));
        assert!(matches!(parse("round UP"), Err(CommandError::RoundFormat)));
        assert!(matches!(parse("round Abs"), Err(CommandError::RoundFormat)));
        assert!(matches!(parse("output html now"), Err(CommandError::OutputFormat)));
        assert!(matches!(parse("output"), Err(CommandError::OutputFormat)));
        assert!(matches!(parse(""), Err(CommandError::UnknownCommand)));
        assert!(matches!(parse("asciiart"), Err(CommandError::UnknownCommand)));
    }

    #[test]
    fn session_reports_state_and_rejections() {
        let input = "chars\nadd a-c\nchars\nremove all\nasciiArt\nres\nres up\nres up\nres up\n\
                     bogus\nexit\nchars\n";
        let (shell, out) = session(split_image(), &ShellConfig::default(), input);

        let expected = [
            ">>> 0 1 2 3 4 5 6 7 8 9",
            ">>> >>> 0 1 2 3 4 5 6 7 8 9 a b c",
            ">>> >>> Did not execute. Charset is too small.",
            ">>> Resolution set to 2",
            ">>> Resolution set to 4",
            ">>> Resolution set to 8",
            ">>> Did not change resolution due to exceeding boundaries.",
            ">>> Did not execute due to incorrect command.",
            ">>> ",
        ]
        .join("\n");
        assert_eq!(out, expected);
        assert_eq!(shell.resolution(), 8);
        assert!(shell.charset().is_empty());
    }

    #[test]
    fn ascii_art_prints_to_console() {
        let input = "remove all\nadd space\nadd @\nres up\nasciiArt\nexit\n";
        let (_, out) = session(split_image(), &ShellConfig::default(), input);
        assert!(out.ends_with(">>> Resolution set to 4\n>>>   @@\n  @@\n>>> "), "{out}");
    }

    #[test]
    fn ascii_art_writes_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShellConfig {
            html_path: dir.path().join("art.html"),
            output: OutputMethod::Html,
            ..ShellConfig::default()
        };
        let (shell, out) = session(split_image(), &config, "asciiArt\n");

        assert_eq!(shell.output(), OutputMethod::Html);
        assert_eq!(out, ">>> >>> \n");
        let html = std::fs::read_to_string(dir.path().join("art.html")).unwrap();
        assert!(html.contains("<pre"));
    }

    #[test]
    fn non_dividing_resolution_is_reported() {
        let image = PixelGrid::filled(6, 3, Rgb::WHITE).unwrap();
        let (_, out) = session(image, &ShellConfig::default(), "res up\nasciiArt\n");
        assert!(out.contains("Did not execute. Resolution does not fit the image."), "{out}");
    }

    #[test]
    fn output_and_rounding_can_be_switched() {
        let (shell, out) = session(
            split_image(),
            &ShellConfig::default(),
            "output html\nround down\nround diagonal\n",
        );
        assert_eq!(shell.output(), OutputMethod::Html);
        assert_eq!(shell.charset().matcher().rounding_policy(), RoundingPolicy::Down);
        assert!(out.contains("Did not change rounding method due to incorrect format."));
    }

    #[test]
    fn out_of_bounds_start_resolution_is_clamped() {
        let config = ShellConfig { resolution: 100, ..ShellConfig::default() };
        let shell = Shell::new(split_image(), &config).unwrap();
        assert_eq!(shell.resolution(), 8);
    }

    #[test]
    fn non_printable_characters_are_a_format_error() {
        let (shell, out) = session(split_image(), &ShellConfig::default(), "add é\n");
        assert!(out.contains("Did not add due to incorrect format."));
        assert_eq!(shell.charset().len(), 10);
    }
}
